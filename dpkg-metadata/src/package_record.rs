// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Binary package records.

A [PackageRecord] is the metadata of one binary package: the `control` file of a
`.deb`, a paragraph of the dpkg status database, or an entry of a `Packages` index.
*/

use {
    crate::{
        control::ControlParagraph,
        error::{DpkgError, Result},
        io::{digest_path, ChecksumType},
        package_version::PackageVersion,
    },
    log::warn,
    std::{
        io::Write,
        ops::{Deref, DerefMut},
        path::Path,
    },
};

/// Fields emitted first, in this order, when writing a `Packages` index entry.
///
/// Fields not in this list follow in their original order.
pub const INDEX_FIELD_ORDER: &[&str] = &[
    "Package",
    "Source",
    "Version",
    "Installed-Size",
    "Maintainer",
    "Architecture",
    "Depends",
    "Recommends",
    "Suggests",
    "Homepage",
    "Section",
    "Priority",
    "Provides",
    "Description",
    "Size",
    "Filename",
    "MD5",
    "SHA256",
    "SHA1",
];

/// A Debian binary package record.
///
/// This type is a thin wrapper around an inner [ControlParagraph]. [Deref] and
/// [DerefMut] can be used to operate on the inner [ControlParagraph]. [From] is
/// implemented in both directions.
///
/// No field is guaranteed to be present. `Package` has a getter returning [Result];
/// everything else returns [Option].
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PackageRecord {
    paragraph: ControlParagraph,
}

impl Deref for PackageRecord {
    type Target = ControlParagraph;

    fn deref(&self) -> &Self::Target {
        &self.paragraph
    }
}

impl DerefMut for PackageRecord {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.paragraph
    }
}

impl From<ControlParagraph> for PackageRecord {
    fn from(paragraph: ControlParagraph) -> Self {
        Self { paragraph }
    }
}

impl From<PackageRecord> for ControlParagraph {
    fn from(record: PackageRecord) -> Self {
        record.paragraph
    }
}

impl PackageRecord {
    /// Parse a record from the raw bytes of a single paragraph.
    pub fn parse_bytes(data: &[u8]) -> Self {
        ControlParagraph::parse_bytes(data).into()
    }

    /// The `Package` field value.
    pub fn package(&self) -> Result<&str> {
        self.field_str("Package")
            .ok_or(DpkgError::ControlRequiredFieldMissing("Package"))
    }

    /// The `Version` field as its original string.
    pub fn version_str(&self) -> Option<&str> {
        self.field_str("Version")
    }

    /// The `Version` field parsed into a [PackageVersion].
    ///
    /// A missing `Version` parses as the empty version, which sorts before any other.
    pub fn version(&self) -> PackageVersion {
        PackageVersion::parse(self.version_str().unwrap_or(""))
    }

    /// The `Architecture` field.
    pub fn architecture(&self) -> Option<&str> {
        self.field_str("Architecture")
    }

    /// The `Maintainer` field.
    pub fn maintainer(&self) -> Option<&str> {
        self.field_str("Maintainer")
    }

    /// The `Status` field.
    pub fn status(&self) -> Option<&str> {
        self.field_str("Status")
    }

    /// The `Description` field, including all lines.
    pub fn description(&self) -> Option<&str> {
        self.field_str("Description")
    }

    /// The first line of the `Description` field.
    pub fn short_description(&self) -> Option<&str> {
        self.field_iter_value_lines("Description")
            .and_then(|mut lines| lines.next())
    }

    /// Obtain the items of a comma delimited field.
    ///
    /// Items are trimmed and empty items are dropped. Returns [None] if the field
    /// isn't present.
    pub fn field_list(&self, name: &str) -> Option<Vec<&str>> {
        self.field_str(name).map(|value| {
            value
                .split(',')
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .collect()
        })
    }

    /// The items of the `Depends` field.
    pub fn depends(&self) -> Option<Vec<&str>> {
        self.field_list("Depends")
    }

    /// The items of the `Pre-Depends` field.
    pub fn pre_depends(&self) -> Option<Vec<&str>> {
        self.field_list("Pre-Depends")
    }

    /// The items of the `Provides` field.
    pub fn provides(&self) -> Option<Vec<&str>> {
        self.field_list("Provides")
    }

    /// The items of the `Recommends` field.
    pub fn recommends(&self) -> Option<Vec<&str>> {
        self.field_list("Recommends")
    }

    /// The items of the `Suggests` field.
    pub fn suggests(&self) -> Option<Vec<&str>> {
        self.field_list("Suggests")
    }

    /// The items of the `Breaks` field.
    pub fn breaks(&self) -> Option<Vec<&str>> {
        self.field_list("Breaks")
    }

    /// The items of the `Conflicts` field.
    pub fn conflicts(&self) -> Option<Vec<&str>> {
        self.field_list("Conflicts")
    }

    /// The items of the `Enhances` field.
    pub fn enhances(&self) -> Option<Vec<&str>> {
        self.field_list("Enhances")
    }

    /// The items of the `Replaces` field.
    pub fn replaces(&self) -> Option<Vec<&str>> {
        self.field_list("Replaces")
    }

    /// Render the `Status` field as the abbreviation printed by `dpkg -l`.
    ///
    /// The first character is the desired action, the second the package state. A
    /// third `R` is appended when the package requires reinstallation. Unrecognized
    /// words render as `?`. Returns [None] if there is no `Status` field.
    pub fn status_abbreviation(&self) -> Option<String> {
        let mut words = self.status()?.split_ascii_whitespace();

        let want = match words.next() {
            Some("unknown") => 'u',
            Some("install") => 'i',
            Some("hold") => 'h',
            Some("deinstall") => 'r',
            Some("purge") => 'p',
            _ => '?',
        };
        let flag = words.next();
        let state = match words.next() {
            Some("not-installed") => 'n',
            Some("config-files") => 'c',
            Some("half-installed") => 'H',
            Some("unpacked") => 'U',
            Some("half-configured") => 'F',
            Some("triggers-awaited") => 'W',
            Some("triggers-pending") => 't',
            Some("installed") => 'i',
            _ => '?',
        };

        let mut res = String::from_iter([want, state]);
        if flag == Some("reinst-required") {
            res.push('R');
        }

        Some(res)
    }

    /// Populate the fields describing the package file at `path`.
    ///
    /// Sets `Size` to the file length and a hex digest field for each requested
    /// checksum. A failure to stat the file records a `Size` of `0`. A failure to
    /// read the file leaves the digest fields unset. Both are logged and neither is
    /// an error.
    pub fn set_file_fields(&mut self, path: &Path, checksums: &[ChecksumType]) {
        let size = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("unable to stat {}: {}", path.display(), e);
                0
            }
        };
        self.set_field_from_string("Size", size);

        if checksums.is_empty() {
            return;
        }

        match digest_path(path, checksums.iter().copied()) {
            Ok(digests) => {
                for digest in digests {
                    self.set_field_from_string(
                        digest.checksum_type().field_name(),
                        digest.digest_hex(),
                    );
                }
            }
            Err(e) => {
                warn!("unable to compute digests of {}: {}", path.display(), e);
            }
        }
    }

    /// Write this record as a `Packages` index entry.
    ///
    /// Fields in [INDEX_FIELD_ORDER] come first, in that order. Remaining fields follow
    /// in their original order. The entry is terminated by an empty line.
    pub fn write_index_entry<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for name in INDEX_FIELD_ORDER {
            if let Some(field) = self.field(name) {
                field.write(writer)?;
            }
        }

        for field in self
            .iter_fields()
            .filter(|field| !INDEX_FIELD_ORDER.contains(&field.name()))
        {
            field.write(writer)?;
        }

        writer.write_all(b"\n")
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc, std::io::Write};

    #[test]
    fn accessors() -> Result<()> {
        let record = PackageRecord::parse_bytes(
            indoc! {"
                Package: libc6
                Version: 2.36-9
                Architecture: amd64
                Depends: libgcc-s1, libcrypt1 (>= 1:4.4.10-10~),,
                Pre-Depends:
                Description: GNU C Library: Shared libraries
                 Contains the standard libraries.
            "}
            .as_bytes(),
        );

        assert_eq!(record.package()?, "libc6");
        assert_eq!(record.version_str(), Some("2.36-9"));
        assert_eq!(record.version().debian_revision(), Some("9"));
        assert_eq!(record.architecture(), Some("amd64"));
        assert_eq!(
            record.depends(),
            Some(vec!["libgcc-s1", "libcrypt1 (>= 1:4.4.10-10~)"])
        );
        assert_eq!(record.pre_depends(), Some(vec![]));
        assert_eq!(record.provides(), None);
        assert_eq!(
            record.short_description(),
            Some("GNU C Library: Shared libraries")
        );
        assert_eq!(
            record.description(),
            Some("GNU C Library: Shared libraries\nContains the standard libraries.")
        );

        Ok(())
    }

    #[test]
    fn missing_fields() {
        let record = PackageRecord::default();

        assert!(matches!(
            record.package(),
            Err(DpkgError::ControlRequiredFieldMissing("Package"))
        ));
        assert_eq!(record.version().to_string(), "");
        assert_eq!(record.short_description(), None);
        assert_eq!(record.status_abbreviation(), None);
    }

    #[test]
    fn status_abbreviation() {
        let mut record = PackageRecord::default();

        for (status, expected) in [
            ("install ok installed", "ii"),
            ("deinstall ok config-files", "rc"),
            ("hold ok installed", "hi"),
            ("purge ok not-installed", "pn"),
            ("install reinst-required half-installed", "iHR"),
            ("bogus", "??"),
        ] {
            record.set_field_from_string("Status", status);
            assert_eq!(record.status_abbreviation().as_deref(), Some(expected));
        }
    }

    #[test]
    fn index_entry_field_order() -> Result<()> {
        let mut record = PackageRecord::from(ControlParagraph::parse_str(indoc! {"
            X-Custom: one
            Description: a package
             with more text
            Version: 1.0-1
            Filename: pool/foo_1.0-1_amd64.deb
            Package: foo
            Multi-Arch: same
            Architecture: amd64
        "}));
        record.set_field_from_string("SHA1", "abc");
        record.set_field_from_string("MD5", "def");

        let mut buffer = vec![];
        record.write_index_entry(&mut buffer)?;

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            indoc! {"
                Package: foo
                Version: 1.0-1
                Architecture: amd64
                Description: a package
                 with more text
                Filename: pool/foo_1.0-1_amd64.deb
                MD5: def
                SHA1: abc
                X-Custom: one
                Multi-Arch: same

            "}
        );

        Ok(())
    }

    #[test]
    fn file_fields() -> Result<()> {
        let mut fh = tempfile::NamedTempFile::new()?;
        fh.write_all(b"hello world")?;
        fh.flush()?;

        let mut record = PackageRecord::default();
        record.set_file_fields(fh.path(), &[ChecksumType::Md5, ChecksumType::Sha256]);

        assert_eq!(record.field_str("Size"), Some("11"));
        assert_eq!(
            record.field_str("MD5"),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        assert_eq!(
            record.field_str("SHA256"),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
        assert!(!record.has_field("SHA1"));

        Ok(())
    }

    #[test]
    fn file_fields_missing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;

        let mut record = PackageRecord::default();
        record.set_file_fields(&dir.path().join("missing.deb"), &[ChecksumType::Sha1]);

        assert_eq!(record.field_str("Size"), Some("0"));
        assert!(!record.has_field("SHA1"));

        Ok(())
    }
}

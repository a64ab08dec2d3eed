// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Building `Packages` indices from directory trees of `.deb` files.

This is the functionality of `dpkg-scanpackages`. A [PackageScanner] walks a
directory tree, reads the `control` file of every package file it finds, keeps the
newest version of each package and emits the resulting index with file sizes and
content digests added.
*/

use {
    crate::{
        deb::read_deb_path,
        error::Result,
        io::ChecksumType,
        package_index::{InsertOutcome, PackageIndex},
    },
    log::{debug, warn},
    regex::Regex,
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

fn default_package_type() -> String {
    "deb".to_string()
}

fn default_checksums() -> Vec<String> {
    vec!["md5".to_string(), "sha1".to_string(), "sha256".to_string()]
}

/// Configuration of a [PackageScanner].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageScannerConfig {
    /// Directory to scan recursively.
    pub root_dir: PathBuf,

    /// Only consider packages for this architecture, plus `all`.
    #[serde(default)]
    pub architecture: Option<String>,

    /// Filename extension of package files.
    #[serde(default = "default_package_type")]
    pub package_type: String,

    /// Names of digests to emit. Any of `md5`, `sha1`, `sha256`.
    #[serde(default = "default_checksums")]
    pub checksums: Vec<String>,

    /// Retain every version of a package instead of only the newest.
    #[serde(default)]
    pub multiversion: bool,
}

impl PackageScannerConfig {
    /// Construct a config scanning `root_dir` with default settings.
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            architecture: None,
            package_type: default_package_type(),
            checksums: default_checksums(),
            multiversion: false,
        }
    }
}

/// Scans a directory tree for package files.
#[derive(Clone, Debug)]
pub struct PackageScanner {
    root_dir: PathBuf,
    filename_filter: Regex,
    checksums: Vec<ChecksumType>,
    multiversion: bool,
}

impl PackageScanner {
    /// Construct an instance from config.
    ///
    /// Fails if a checksum name is unknown.
    pub fn new(config: PackageScannerConfig) -> Result<Self> {
        let checksums = ChecksumType::parse_list(&config.checksums)?;

        let package_type = regex::escape(&config.package_type);
        let pattern = match &config.architecture {
            Some(arch) => format!(r"_(?:all|{})\.{}$", regex::escape(arch), package_type),
            None => format!(r"\.{}$", package_type),
        };

        Ok(Self {
            root_dir: config.root_dir,
            filename_filter: Regex::new(&pattern)?,
            checksums,
            multiversion: config.multiversion,
        })
    }

    /// The checksums that will be emitted.
    pub fn checksums(&self) -> &[ChecksumType] {
        &self.checksums
    }

    /// Whether a filename is a candidate package file.
    pub fn matches_filename(&self, filename: &str) -> bool {
        self.filename_filter.is_match(filename)
    }

    /// Find candidate package files, in discovery order.
    ///
    /// Directory entries are visited sorted by file name. Every entry that isn't a
    /// directory is a candidate, including symlinks. Symlinks to directories are not
    /// descended into.
    pub fn find_package_files(&self) -> Result<Vec<PathBuf>> {
        let mut res = vec![];

        for entry in walkdir::WalkDir::new(&self.root_dir)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = entry?;

            if entry.file_type().is_dir() {
                continue;
            }

            if self.matches_filename(&entry.file_name().to_string_lossy()) {
                debug!("found package file {}", entry.path().display());
                res.push(entry.into_path());
            }
        }

        Ok(res)
    }

    /// Scan the directory tree into a [PackageIndex].
    ///
    /// Files that can't be read as packages are logged and skipped. `Size` and digest
    /// fields are populated for every retained record.
    pub fn scan_index(&self) -> Result<PackageIndex> {
        let mut index = PackageIndex::new(self.multiversion);

        for path in self.find_package_files()? {
            let mut record = match read_deb_path(&path) {
                Ok(record) => record,
                Err(e) if e.is_archive_error() => {
                    warn!("skipping {}: not a valid package: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    warn!("skipping {}: unable to read: {}", path.display(), e);
                    continue;
                }
            };

            record.set_field_from_string("Filename", path.display());

            match index.insert(record) {
                Ok(InsertOutcome::Discarded(version)) => {
                    debug!("discarded {} version {}", path.display(), version);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                }
            }
        }

        index.set_file_fields(&self.checksums);

        Ok(index)
    }

    /// Scan the directory tree and serialize the result as a `Packages` file.
    pub fn scan(&self) -> Result<Vec<u8>> {
        Ok(self.scan_index()?.to_bytes()?)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            control::ControlParagraph,
            error::DpkgError,
            testutil::{deb_with_control, write_deb, MemberCompression},
        },
        indoc::indoc,
    };

    #[test]
    fn config_yaml() -> Result<()> {
        let config: PackageScannerConfig = serde_yaml::from_str("root_dir: /srv/pool\n").unwrap();
        assert_eq!(config, PackageScannerConfig::new("/srv/pool"));

        let config: PackageScannerConfig = serde_yaml::from_str(indoc! {"
            root_dir: pool
            architecture: arm64
            package_type: udeb
            checksums: [SHA256]
            multiversion: true
        "})
        .unwrap();
        assert_eq!(config.architecture.as_deref(), Some("arm64"));
        assert_eq!(config.package_type, "udeb");
        assert!(config.multiversion);

        let scanner = PackageScanner::new(config)?;
        assert_eq!(scanner.checksums(), &[ChecksumType::Sha256]);

        assert!(serde_yaml::from_str::<PackageScannerConfig>("root_dir: x\nhashes: [md5]\n").is_err());

        Ok(())
    }

    #[test]
    fn unknown_checksum() {
        let mut config = PackageScannerConfig::new("pool");
        config.checksums = vec!["md5".into(), "sha512".into()];

        assert!(matches!(
            PackageScanner::new(config),
            Err(DpkgError::UnknownChecksum(name)) if name == "sha512"
        ));
    }

    #[test]
    fn filename_filter() -> Result<()> {
        let scanner = PackageScanner::new(PackageScannerConfig::new("pool"))?;
        assert!(scanner.matches_filename("foo_1.0-1_amd64.deb"));
        assert!(scanner.matches_filename("foo.deb"));
        assert!(!scanner.matches_filename("foo_1.0-1_amd64.udeb.txt"));
        assert!(!scanner.matches_filename("foo_1.0-1_amd64.udeb"));

        let mut config = PackageScannerConfig::new("pool");
        config.architecture = Some("amd64".into());
        let scanner = PackageScanner::new(config)?;
        assert!(scanner.matches_filename("foo_1.0-1_amd64.deb"));
        assert!(scanner.matches_filename("foo_1.0-1_all.deb"));
        assert!(!scanner.matches_filename("foo_1.0-1_arm64.deb"));
        assert!(!scanner.matches_filename("foo.deb"));

        let mut config = PackageScannerConfig::new("pool");
        config.package_type = "udeb".into();
        let scanner = PackageScanner::new(config)?;
        assert!(scanner.matches_filename("foo_1.0-1_amd64.udeb"));
        assert!(!scanner.matches_filename("foo_1.0-1_amd64.deb"));

        Ok(())
    }

    #[test]
    fn newest_version_wins() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_deb(dir.path(), "foo_1.0-1_amd64.deb", "foo", "1.0-1", "amd64");
        write_deb(
            &dir.path().join("sub"),
            "foo_1.0-2_amd64.deb",
            "foo",
            "1.0-2",
            "amd64",
        );
        write_deb(dir.path(), "bar_2.0_all.deb", "bar", "2.0", "all");
        std::fs::write(dir.path().join("README"), b"not a package")?;

        let scanner = PackageScanner::new(PackageScannerConfig::new(dir.path()))?;
        assert_eq!(scanner.find_package_files()?.len(), 3);

        let index = scanner.scan_index()?;
        assert_eq!(index.len(), 2);

        let foo = index.get("foo").unwrap();
        assert_eq!(foo.version_str(), Some("1.0-2"));
        let path = dir.path().join("sub").join("foo_1.0-2_amd64.deb");
        assert_eq!(
            foo.field_str("Filename"),
            Some(format!("{}", path.display()).as_str())
        );
        assert_eq!(
            foo.field_str("Size"),
            Some(format!("{}", std::fs::metadata(&path)?.len()).as_str())
        );
        for field in ["MD5", "SHA1", "SHA256"] {
            assert!(foo.has_field(field), "{}", field);
        }
        assert_eq!(foo.field_str("SHA256").unwrap().len(), 64);

        let data = String::from_utf8(scanner.scan()?).unwrap();
        assert!(data.starts_with("Package: bar\nVersion: 2.0\n"));
        assert!(data.contains("\n\nPackage: foo\nVersion: 1.0-2\n"));
        assert!(data.ends_with("\n\n"));
        assert!(!data.contains("Version: 1.0-1\n"));

        Ok(())
    }

    #[test]
    fn multiversion() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_deb(dir.path(), "foo_1.0-1_amd64.deb", "foo", "1.0-1", "amd64");
        write_deb(dir.path(), "foo_1.0-2_amd64.deb", "foo", "1.0-2", "amd64");
        write_deb(dir.path(), "foo_1.0-2_arm64.deb", "foo", "1.0-2", "arm64");

        let mut config = PackageScannerConfig::new(dir.path());
        config.multiversion = true;
        config.checksums = vec!["sha1".into()];
        let index = PackageScanner::new(config)?.scan_index()?;

        assert_eq!(
            index
                .iter()
                .map(|(_, record)| record.version_str().unwrap())
                .collect::<Vec<_>>(),
            vec!["1.0-1", "1.0-2"]
        );
        // The first file discovered with a given version is kept.
        assert!(index
            .iter()
            .all(|(_, record)| record.field_str("Filename").unwrap().ends_with("_amd64.deb")));
        assert!(index.iter().all(|(_, record)| record.has_field("SHA1")
            && !record.has_field("MD5")
            && !record.has_field("SHA256")));

        Ok(())
    }

    #[test]
    fn architecture_filter() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_deb(dir.path(), "foo_1.0_amd64.deb", "foo", "1.0", "amd64");
        write_deb(dir.path(), "foo_1.1_arm64.deb", "foo", "1.1", "arm64");
        write_deb(dir.path(), "common_1_all.deb", "common", "1", "all");

        let mut config = PackageScannerConfig::new(dir.path());
        config.architecture = Some("amd64".into());
        let index = PackageScanner::new(config)?.scan_index()?;

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("foo").unwrap().version_str(), Some("1.0"));
        assert!(index.get("common").is_some());

        Ok(())
    }

    #[test]
    fn unreadable_files_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_deb(dir.path(), "good_1_all.deb", "good", "1", "all");
        std::fs::write(dir.path().join("corrupt_1_all.deb"), b"garbage")?;
        std::fs::write(
            dir.path().join("nameless_1_all.deb"),
            deb_with_control("Version: 1\n", MemberCompression::Xz),
        )?;

        let index = PackageScanner::new(PackageScannerConfig::new(dir.path()))?.scan_index()?;
        assert_eq!(index.len(), 1);
        assert!(index.get("good").is_some());

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_packages() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("store");
        let pool = dir.path().join("pool");
        write_deb(&store, "foo.bin", "foo", "1.0", "all");
        std::fs::create_dir_all(&pool)?;
        std::os::unix::fs::symlink(store.join("foo.bin"), pool.join("foo_1.0_all.deb"))?;
        std::os::unix::fs::symlink(store.join("gone.bin"), pool.join("gone_1_all.deb"))?;

        let scanner = PackageScanner::new(PackageScannerConfig::new(&pool))?;
        assert_eq!(
            scanner.find_package_files()?,
            vec![pool.join("foo_1.0_all.deb"), pool.join("gone_1_all.deb")]
        );

        let index = scanner.scan_index()?;
        assert_eq!(index.len(), 1);
        let foo = index.get("foo").unwrap();
        assert_eq!(
            foo.field_str("Size"),
            Some(format!("{}", std::fs::metadata(store.join("foo.bin"))?.len()).as_str())
        );

        Ok(())
    }

    #[test]
    fn missing_root() {
        let scanner =
            PackageScanner::new(PackageScannerConfig::new("/nonexistent/package/pool")).unwrap();

        assert!(matches!(scanner.scan(), Err(DpkgError::WalkDir(_))));
    }

    #[test]
    fn index_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_deb(dir.path(), "foo_1.0_all.deb", "foo", "1.0", "all");

        let data = PackageScanner::new(PackageScannerConfig::new(dir.path()))?.scan()?;
        let text = String::from_utf8(data).unwrap();

        let paragraph = ControlParagraph::parse_str(&text);
        let index = PackageScanner::new(PackageScannerConfig::new(dir.path()))?.scan_index()?;
        let record = index.get("foo").unwrap();

        assert_eq!(paragraph.as_str_hash_map(), record.as_str_hash_map());

        Ok(())
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! I/O helpers. */

use {
    crate::error::{DpkgError, Result},
    digest::DynDigest,
    std::{
        fmt::Formatter,
        io::{BufReader, Read},
        path::Path,
        str::FromStr,
    },
    strum::{EnumIter, IntoEnumIterator},
};

/// A content checksum flavor recorded in `Packages` indices.
#[derive(Clone, Copy, Debug, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ChecksumType {
    /// MD5.
    Md5,

    /// SHA-1.
    Sha1,

    /// SHA-256.
    Sha256,
}

impl ChecksumType {
    /// Name of the control field in `Packages` files holding this variant type.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }

    /// Obtain a new hasher for this checksum flavor.
    pub fn new_hasher(&self) -> Box<dyn DynDigest + Send> {
        match self {
            Self::Md5 => Box::new(md5::Md5::default()),
            Self::Sha1 => Box::new(sha1::Sha1::default()),
            Self::Sha256 => Box::new(sha2::Sha256::default()),
        }
    }

    /// Resolve a list of checksum names into distinct [ChecksumType].
    ///
    /// Names are matched case-insensitively. Any unknown name is an error. Duplicates are
    /// collapsed and the result is ordered `MD5`, `SHA1`, `SHA256`.
    pub fn parse_list<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Result<Vec<Self>> {
        let mut checksums = names
            .into_iter()
            .map(|name| Self::from_str(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        checksums.sort();
        checksums.dedup();

        Ok(checksums)
    }
}

impl FromStr for ChecksumType {
    type Err = DpkgError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();

        Self::iter()
            .find(|checksum| checksum.field_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DpkgError::UnknownChecksum(s.to_string()))
    }
}

/// Represents a content digest.
#[derive(Clone, Eq, PartialEq, PartialOrd)]
pub enum ContentDigest {
    /// An MD5 digest.
    Md5(Vec<u8>),
    /// A SHA-1 digest.
    Sha1(Vec<u8>),
    /// A SHA-256 digest.
    Sha256(Vec<u8>),
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5(data) => write!(f, "Md5({})", hex::encode(data)),
            Self::Sha1(data) => write!(f, "Sha1({})", hex::encode(data)),
            Self::Sha256(data) => write!(f, "Sha256({})", hex::encode(data)),
        }
    }
}

impl ContentDigest {
    fn new(checksum: ChecksumType, digest: Vec<u8>) -> Self {
        match checksum {
            ChecksumType::Md5 => Self::Md5(digest),
            ChecksumType::Sha1 => Self::Sha1(digest),
            ChecksumType::Sha256 => Self::Sha256(digest),
        }
    }

    /// Obtain the digest bytes for this content digest.
    pub fn digest_bytes(&self) -> &[u8] {
        match self {
            Self::Md5(x) => x,
            Self::Sha1(x) => x,
            Self::Sha256(x) => x,
        }
    }

    /// Obtain the hex encoded content digest.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest_bytes())
    }

    /// Obtain the [ChecksumType] for this digest.
    pub fn checksum_type(&self) -> ChecksumType {
        match self {
            Self::Md5(_) => ChecksumType::Md5,
            Self::Sha1(_) => ChecksumType::Sha1,
            Self::Sha256(_) => ChecksumType::Sha256,
        }
    }
}

/// A content digester that simultaneously computes multiple digest types.
pub struct MultiDigester {
    hashers: Vec<(ChecksumType, Box<dyn DynDigest + Send>)>,
}

impl Default for MultiDigester {
    fn default() -> Self {
        Self::new(ChecksumType::iter())
    }
}

impl MultiDigester {
    /// Construct an instance computing the given checksum flavors.
    pub fn new(checksums: impl IntoIterator<Item = ChecksumType>) -> Self {
        Self {
            hashers: checksums
                .into_iter()
                .map(|checksum| (checksum, checksum.new_hasher()))
                .collect(),
        }
    }

    /// Write content into the digesters.
    pub fn update(&mut self, data: &[u8]) {
        for (_, hasher) in self.hashers.iter_mut() {
            hasher.update(data);
        }
    }

    /// Feed the entire content of a reader into the digesters.
    pub fn update_from_reader(&mut self, reader: &mut impl Read) -> std::io::Result<u64> {
        let mut buffer = [0; 32768];
        let mut total = 0;

        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }

            self.update(&buffer[0..read]);
            total += read as u64;
        }

        Ok(total)
    }

    /// Finish digesting content.
    ///
    /// Consumes the instance and returns a [ContentDigest] per requested flavor, in the
    /// order they were requested.
    pub fn finish(self) -> Vec<ContentDigest> {
        self.hashers
            .into_iter()
            .map(|(checksum, hasher)| ContentDigest::new(checksum, hasher.finalize().to_vec()))
            .collect()
    }
}

/// Compute digests of the file at the given path.
pub fn digest_path(
    path: impl AsRef<Path>,
    checksums: impl IntoIterator<Item = ChecksumType>,
) -> Result<Vec<ContentDigest>> {
    let path = path.as_ref();

    let fh = std::fs::File::open(path)
        .map_err(|e| DpkgError::IoPath(format!("{}", path.display()), e))?;
    let mut reader = BufReader::new(fh);

    let mut digester = MultiDigester::new(checksums);
    digester
        .update_from_reader(&mut reader)
        .map_err(|e| DpkgError::IoPath(format!("{}", path.display()), e))?;

    Ok(digester.finish())
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    #[test]
    fn checksum_names() -> Result<()> {
        assert_eq!(ChecksumType::from_str("md5")?, ChecksumType::Md5);
        assert_eq!(ChecksumType::from_str("SHA1")?, ChecksumType::Sha1);
        assert_eq!(ChecksumType::from_str(" Sha256 ")?, ChecksumType::Sha256);
        assert!(matches!(
            ChecksumType::from_str("sha512"),
            Err(DpkgError::UnknownChecksum(name)) if name == "sha512"
        ));

        assert_eq!(
            ChecksumType::parse_list(["sha256", "md5", "SHA256"])?,
            vec![ChecksumType::Md5, ChecksumType::Sha256]
        );
        assert!(ChecksumType::parse_list(["md5", "crc32"]).is_err());

        Ok(())
    }

    #[test]
    fn multi_digester() {
        let mut digester = MultiDigester::default();
        digester.update(b"hello");
        digester.update(b" world");

        let digests = digester.finish();
        assert_eq!(digests.len(), 3);
        assert_eq!(
            digests[0].digest_hex(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
        assert_eq!(
            digests[1].digest_hex(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
        assert_eq!(
            digests[2].digest_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(digests[2].checksum_type(), ChecksumType::Sha256);
    }

    #[test]
    fn digest_file() -> Result<()> {
        let mut fh = tempfile::NamedTempFile::new()?;
        fh.write_all(b"hello world")?;
        fh.flush()?;

        let digests = digest_path(fh.path(), [ChecksumType::Sha1])?;
        assert_eq!(
            digests,
            vec![ContentDigest::Sha1(
                hex::decode("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed").unwrap()
            )]
        );

        assert!(matches!(
            digest_path(fh.path().with_extension("missing"), [ChecksumType::Md5]),
            Err(DpkgError::IoPath(_, _))
        ));

        Ok(())
    }
}

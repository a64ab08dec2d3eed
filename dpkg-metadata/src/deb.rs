// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading metadata out of `.deb` files.

The .deb file specification lives at <https://manpages.debian.org/unstable/dpkg-dev/deb.5.en.html>.

A .deb binary package file is an ar archive whose first member is `debian-binary`.
Package metadata lives in the `control` file of the `control.tar[.<ext>]` member.
Only that member is read: `data.tar` is never decompressed.
*/

use {
    crate::{
        error::{DpkgError, Result},
        package_record::PackageRecord,
    },
    std::{
        io::{Cursor, Read},
        path::Path,
    },
};

/// Leading bytes of every .deb file.
///
/// The ar global header followed by the identifier of the first member.
pub const DEB_SIGNATURE: &[u8; 21] = b"!<arch>\ndebian-binary";

/// Compression of the `control.tar` member, derived from its filename.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControlCompression {
    /// `control.tar`.
    Uncompressed,
    /// `control.tar.gz`.
    Gzip,
    /// `control.tar.xz`.
    Xz,
}

impl ControlCompression {
    /// Resolve the compression from the member name suffix following `control.tar`.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension {
            "" => Ok(Self::Uncompressed),
            ".gz" => Ok(Self::Gzip),
            ".xz" => Ok(Self::Xz),
            _ => Err(DpkgError::DebUnknownCompression(extension.to_string())),
        }
    }

    /// Decompress member data in full.
    fn decompress(&self, data: Vec<u8>) -> std::io::Result<Vec<u8>> {
        let mut reader: Box<dyn Read> = match self {
            Self::Uncompressed => return Ok(data),
            Self::Gzip => Box::new(libflate::gzip::Decoder::new(Cursor::new(data))?),
            Self::Xz => Box::new(xz2::read::XzDecoder::new(Cursor::new(data))),
        };

        let mut buffer = vec![];
        reader.read_to_end(&mut buffer)?;

        Ok(buffer)
    }
}

/// Read the signature of a .deb from a reader.
///
/// Returns the reader with the signature bytes put back in front of it.
fn verify_signature<R: Read>(mut reader: R) -> Result<impl Read> {
    let mut signature = [0u8; DEB_SIGNATURE.len()];

    match reader.read_exact(&mut signature) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(DpkgError::DebBadSignature);
        }
        Err(e) => return Err(e.into()),
    }

    if &signature != DEB_SIGNATURE {
        return Err(DpkgError::DebBadSignature);
    }

    Ok(Cursor::new(signature).chain(reader))
}

/// Whether a reader begins with the .deb signature.
///
/// At most [DEB_SIGNATURE] bytes are consumed. Read failures count as a mismatch.
pub fn has_deb_signature(reader: impl Read) -> bool {
    verify_signature(reader).is_ok()
}

/// Whether the file at `path` begins with the .deb signature.
pub fn is_deb_file(path: impl AsRef<Path>) -> bool {
    match std::fs::File::open(path.as_ref()) {
        Ok(fh) => has_deb_signature(fh),
        Err(_) => false,
    }
}

/// Obtain the raw bytes of the `control` file within a .deb.
///
/// The signature is verified before anything else is parsed.
pub fn resolve_control_bytes(reader: impl Read) -> Result<Vec<u8>> {
    let mut archive = ar::Archive::new(verify_signature(reader)?);

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry?;

        // Member names should be ASCII. Lossy conversion is fine for matching.
        let filename = String::from_utf8_lossy(entry.header().identifier()).to_string();

        if let Some(tail) = filename.strip_prefix("control.tar") {
            let compression = ControlCompression::from_extension(tail)?;

            let mut data = vec![];
            entry.read_to_end(&mut data)?;

            let data = compression
                .decompress(data)
                .map_err(|e| DpkgError::DebDecompression(filename.clone(), e))?;

            return find_control_in_tar(&data);
        }
    }

    Err(DpkgError::DebControlMemberNotFound)
}

fn find_control_in_tar(data: &[u8]) -> Result<Vec<u8>> {
    let mut archive = tar::Archive::new(Cursor::new(data));

    for entry in archive.entries().map_err(DpkgError::ControlTarRead)? {
        let mut entry = entry.map_err(DpkgError::ControlTarRead)?;

        if matches!(entry.path_bytes().as_ref(), b"control" | b"./control") {
            let mut control = vec![];
            entry
                .read_to_end(&mut control)
                .map_err(DpkgError::ControlTarRead)?;

            return Ok(control);
        }
    }

    Err(DpkgError::ControlFileNotFound)
}

/// Resolve the `control` file from the `control.tar` file within a `.deb` archive.
pub fn resolve_control_file(reader: impl Read) -> Result<PackageRecord> {
    Ok(PackageRecord::parse_bytes(&resolve_control_bytes(reader)?))
}

/// Read the `control` file of the .deb at `path`.
pub fn read_deb_path(path: impl AsRef<Path>) -> Result<PackageRecord> {
    let path = path.as_ref();

    let fh = std::fs::File::open(path)
        .map_err(|e| DpkgError::IoPath(format!("{}", path.display()), e))?;

    resolve_control_file(std::io::BufReader::new(fh))
}

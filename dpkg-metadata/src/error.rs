// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum DpkgError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("invalid package filename filter: {0}")]
    Regex(#[from] regex::Error),

    #[error("not a Debian binary package (ar signature mismatch)")]
    DebBadSignature,

    #[error("control.tar member not found in deb archive")]
    DebControlMemberNotFound,

    #[error("unknown compression in deb archive member: {0}")]
    DebUnknownCompression(String),

    #[error("error decompressing deb archive member {0}: {1:?}")]
    DebDecompression(String, std::io::Error),

    #[error("error reading control.tar archive: {0:?}")]
    ControlTarRead(std::io::Error),

    #[error("control file not found in control.tar archive")]
    ControlFileNotFound,

    #[error("required field missing in control paragraph: {0}")]
    ControlRequiredFieldMissing(&'static str),

    #[error("unknown checksum type: {0}")]
    UnknownChecksum(String),

    #[error("failed to read status database {0}: {1:?}")]
    StatusDatabase(String, std::io::Error),
}

impl DpkgError {
    /// Whether this error describes a malformed or unreadable package archive.
    ///
    /// These errors are confined to a single `.deb` file. Directory scans skip the
    /// offending file and continue.
    pub fn is_archive_error(&self) -> bool {
        matches!(
            self,
            Self::DebBadSignature
                | Self::DebControlMemberNotFound
                | Self::DebUnknownCompression(_)
                | Self::DebDecompression(_, _)
                | Self::ControlTarRead(_)
                | Self::ControlFileNotFound
        )
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, DpkgError>;

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The dpkg status database.

dpkg records installed packages in a single file of control paragraphs separated by
empty lines, normally `/var/lib/dpkg/status`.
*/

use {
    crate::{
        control::ControlParagraph,
        error::{DpkgError, Result},
        package_record::PackageRecord,
    },
    log::debug,
    std::{
        io::{BufRead, BufReader},
        path::{Path, PathBuf},
    },
};

/// Default location of the dpkg status database.
pub const DEFAULT_STATUS_PATH: &str = "/var/lib/dpkg/status";

/// Split a multi paragraph file into the raw text of each paragraph.
///
/// An empty line ends the current paragraph. A line holding only whitespace is a
/// continuation line and stays in the paragraph. Runs of empty lines don't produce
/// empty paragraphs. Lines keep their line breaks.
///
/// Bytes that aren't valid UTF-8 are replaced with U+FFFD.
pub fn split_blocks(mut reader: impl BufRead) -> std::io::Result<Vec<String>> {
    let mut blocks = vec![];
    let mut current = String::new();
    let mut line = vec![];

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        let content = line
            .strip_suffix(b"\n")
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .unwrap_or(&line[..]);

        if content.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(&String::from_utf8_lossy(content));
            current.push('\n');
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    Ok(blocks)
}

/// Obtain the records whose `Package` contains `pattern`.
///
/// Order is preserved. Records without a `Package` never match.
pub fn filter_by_name<'a>(
    records: &'a [PackageRecord],
    pattern: &str,
) -> impl Iterator<Item = &'a PackageRecord> + 'a {
    let pattern = pattern.to_string();

    records.iter().filter(move |record| {
        record
            .package()
            .map(|name| name.contains(&pattern))
            .unwrap_or(false)
    })
}

/// A dpkg status database at a filesystem path.
#[derive(Clone, Debug)]
pub struct StatusDatabase {
    path: PathBuf,
}

impl Default for StatusDatabase {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_PATH)
    }
}

impl StatusDatabase {
    /// Construct an instance reading from the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: std::io::Error) -> DpkgError {
        DpkgError::StatusDatabase(format!("{}", self.path.display()), e)
    }

    /// Parse every paragraph of the database, in file order.
    pub fn packages(&self) -> Result<Vec<PackageRecord>> {
        let fh = std::fs::File::open(&self.path).map_err(|e| self.io_error(e))?;
        let blocks = split_blocks(BufReader::new(fh)).map_err(|e| self.io_error(e))?;

        debug!(
            "read {} paragraphs from {}",
            blocks.len(),
            self.path.display()
        );

        Ok(blocks
            .iter()
            .map(|block| PackageRecord::from(ControlParagraph::parse_str(block)))
            .collect())
    }

    /// Parse the database and keep records whose `Package` contains `pattern`.
    pub fn packages_matching(&self, pattern: &str) -> Result<Vec<PackageRecord>> {
        let records = self.packages()?;

        Ok(filter_by_name(&records, pattern).cloned().collect())
    }
}

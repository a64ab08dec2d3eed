// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! `Packages` index construction.

An index holds at most one record per package name. In multiversion mode it holds one
record per distinct package name and version pair instead.
*/

use {
    crate::{
        error::Result,
        io::ChecksumType,
        package_record::PackageRecord,
    },
    log::info,
    std::{collections::BTreeMap, io::Write, path::PathBuf},
};

/// Key of a record in a [PackageIndex].
///
/// The version component is only populated in multiversion mode.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct IndexKey {
    pub package: String,
    pub version: Option<String>,
}

/// The outcome of offering a record to a [PackageIndex].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    /// No record held the key. The record was added.
    Added,
    /// A record with the same package name but different version was added alongside.
    AddedVersion,
    /// The record is newer and replaced the one holding the key, whose version is
    /// returned.
    Replaced(String),
    /// The record isn't newer than the one holding the key and was discarded. The
    /// version of the discarded record is returned.
    Discarded(String),
}

/// A collection of package records keyed for a `Packages` file.
///
/// Iteration and serialization are ordered by key.
#[derive(Clone, Debug, Default)]
pub struct PackageIndex {
    multiversion: bool,
    records: BTreeMap<IndexKey, PackageRecord>,
}

impl PackageIndex {
    /// Construct an empty index.
    pub fn new(multiversion: bool) -> Self {
        Self {
            multiversion,
            records: BTreeMap::new(),
        }
    }

    /// Whether multiple versions of a package are retained.
    pub fn multiversion(&self) -> bool {
        self.multiversion
    }

    /// Number of records in the index.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&IndexKey, &PackageRecord)> {
        self.records.iter()
    }

    /// Iterate over mutable records in key order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&IndexKey, &mut PackageRecord)> {
        self.records.iter_mut()
    }

    /// Obtain the record for a package name.
    ///
    /// In multiversion mode, returns the first version present in key order.
    pub fn get(&self, package: &str) -> Option<&PackageRecord> {
        let first = IndexKey {
            package: package.to_string(),
            version: None,
        };

        self.records
            .range(first..)
            .next()
            .filter(|(key, _)| key.package == package)
            .map(|(_, record)| record)
    }

    /// Offer a record to the index.
    ///
    /// Without multiversion, a record replaces an existing record of the same package
    /// only if its version is strictly newer. With multiversion, a record is discarded
    /// only if its exact version is already present. Records lacking `Package` are
    /// rejected.
    pub fn insert(&mut self, record: PackageRecord) -> Result<InsertOutcome> {
        let package = record.package()?.to_string();
        let version = record.version_str().unwrap_or("").to_string();

        if self.multiversion {
            let key = IndexKey {
                package: package.clone(),
                version: Some(version.clone()),
            };

            if self.records.contains_key(&key) {
                info!(
                    "package {} version {} is repeat; ignored",
                    package, version
                );
                return Ok(InsertOutcome::Discarded(version));
            }

            let outcome = if self.get(&package).is_some() {
                info!(
                    "multiversion enabled; adding repeated package {} version {}",
                    package, version
                );
                InsertOutcome::AddedVersion
            } else {
                InsertOutcome::Added
            };

            self.records.insert(key, record);

            return Ok(outcome);
        }

        let key = IndexKey {
            package: package.clone(),
            version: None,
        };

        match self.records.get(&key) {
            None => {
                self.records.insert(key, record);
                Ok(InsertOutcome::Added)
            }
            Some(existing) if record.version() > existing.version() => {
                let old = existing.version_str().unwrap_or("").to_string();
                info!(
                    "package {} version {} is repeat but newer version; ignored version {}",
                    package, version, old
                );
                self.records.insert(key, record);

                Ok(InsertOutcome::Replaced(old))
            }
            Some(existing) => {
                info!(
                    "package {} version {} is repeat but older or equal to version {}; ignored",
                    package,
                    version,
                    existing.version_str().unwrap_or("")
                );

                Ok(InsertOutcome::Discarded(version))
            }
        }
    }

    /// Populate `Size` and digest fields of every record.
    ///
    /// The file of each record is located by its `Filename` field. Records without a
    /// `Filename` are left alone.
    pub fn set_file_fields(&mut self, checksums: &[ChecksumType]) {
        for record in self.records.values_mut() {
            let path = match record.field_str("Filename") {
                Some(filename) => PathBuf::from(filename),
                None => continue,
            };

            record.set_file_fields(&path, checksums);
        }
    }

    /// Write the index in `Packages` format.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for record in self.records.values() {
            record.write_index_entry(writer)?;
        }

        Ok(())
    }

    /// Serialize the index to bytes in `Packages` format.
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut buffer = vec![];
        self.write(&mut buffer)?;

        Ok(buffer)
    }
}

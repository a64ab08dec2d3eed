// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian binary package metadata.

This crate reads, compares, and indexes the metadata of Debian binary packages. It
covers the ground of `dpkg --info`, `dpkg -l`, and `dpkg-scanpackages` without calling
out to any of them.

# A Tour of Functionality

Package metadata is expressed as *control paragraphs*: ordered `Key: value` fields
with optional continuation lines. [control::ControlParagraph] parses and writes them.
[package_record::PackageRecord] wraps a paragraph with accessors for the fields of a
binary package.

A `.deb` file is an ar archive holding a `control.tar[.gz|.xz]` member whose `control`
file is the package metadata. [deb::resolve_control_file()] extracts it from any
reader and [deb::read_deb_path()] from a file.

[package_version::PackageVersion] parses `[epoch:]upstream[-revision]` version strings
and orders them.

[status::StatusDatabase] reads the dpkg database of installed packages.

[scanner::PackageScanner] walks a directory tree of `.deb` files and produces a
[package_index::PackageIndex], which serializes to a `Packages` file. Content digests
are computed with the types in [io].

# Logging

This crate emits messages through the [log] crate. Files skipped during a scan are
reported at `warn` level and resolution of duplicate packages at `info`.
*/

pub mod control;
pub mod deb;
pub mod error;
pub mod io;
pub mod package_index;
pub mod package_record;
pub mod package_version;
pub mod scanner;
pub mod status;

#[cfg(test)]
mod testutil;

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helpers for assembling `.deb` archives in tests.

use std::{
    io::{Read, Write},
    path::Path,
};

/// Compression applied to the `control.tar` member.
#[derive(Clone, Copy, Debug)]
pub enum MemberCompression {
    Uncompressed,
    Gzip,
    Xz,
    Zstandard,
}

impl MemberCompression {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Uncompressed => "",
            Self::Gzip => ".gz",
            Self::Xz => ".xz",
            Self::Zstandard => ".zst",
        }
    }

    /// Compress data. Zstandard content is passed through unmodified.
    pub fn compress(&self, mut data: &[u8]) -> Vec<u8> {
        let mut buffer = vec![];

        match self {
            Self::Uncompressed | Self::Zstandard => {
                buffer.extend_from_slice(data);
            }
            Self::Gzip => {
                let mut encoder = libflate::gzip::Encoder::new(&mut buffer).unwrap();
                std::io::copy(&mut data, &mut encoder).unwrap();
                encoder.finish().into_result().unwrap();
            }
            Self::Xz => {
                let mut encoder = xz2::write::XzEncoder::new(buffer, 6);
                std::io::copy(&mut data, &mut encoder).unwrap();
                buffer = encoder.finish().unwrap();
            }
        }

        buffer
    }
}

/// Build a tar archive from `(path, content)` pairs.
///
/// Paths are written verbatim so `./` prefixes are preserved.
pub fn tar_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(vec![]);

    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        let name_buffer = &mut header.as_old_mut().name;
        name_buffer[0..path.len()].copy_from_slice(path.as_bytes());
        header.set_mode(0o644);
        header.set_size(data.len() as _);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }

    builder.into_inner().unwrap()
}

/// Build an ar archive from `(name, content)` members.
pub fn ar_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = vec![];
    let mut builder = ar::Builder::new(&mut buffer);

    for (name, data) in members {
        let mut header = ar::Header::new(name.as_bytes().to_vec(), data.len() as _);
        header.set_mode(0o644);
        builder.append(&header, *data).unwrap();
    }

    drop(builder);
    buffer
}

/// Build a `.deb` whose `control.tar` holds a `./control` file with the given content.
pub fn deb_with_control(control: &str, compression: MemberCompression) -> Vec<u8> {
    deb_with_control_tar(
        &tar_archive(&[("./control", control.as_bytes())]),
        compression,
    )
}

/// Build a `.deb` around an already assembled `control.tar`.
pub fn deb_with_control_tar(control_tar: &[u8], compression: MemberCompression) -> Vec<u8> {
    let member_name = format!("control.tar{}", compression.extension());
    let control_tar = compression.compress(control_tar);
    let data_tar = tar_archive(&[("./usr/share/doc/README", &b"hello"[..])]);

    ar_archive(&[
        ("debian-binary", &b"2.0\n"[..]),
        (member_name.as_str(), control_tar.as_slice()),
        ("data.tar", data_tar.as_slice()),
    ])
}

/// Write a `.deb` with a minimal control file for `package` to `dir`.
pub fn write_deb(dir: &Path, filename: &str, package: &str, version: &str, arch: &str) {
    let control = format!(
        "Package: {}\nVersion: {}\nArchitecture: {}\nMaintainer: Someone <someone@example.com>\nDescription: test package {}\n",
        package, version, arch, package
    );

    std::fs::create_dir_all(dir).unwrap();
    let mut fh = std::fs::File::create(dir.join(filename)).unwrap();
    fh.write_all(&deb_with_control(&control, MemberCompression::Gzip))
        .unwrap();
}

/// A reader that fails the test if read past `limit` bytes.
pub struct LimitedReader<R> {
    inner: R,
    remaining: usize,
}

impl<R: Read> LimitedReader<R> {
    pub fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        assert!(self.remaining > 0 || buf.is_empty(), "read past limit");
        let len = std::cmp::min(buf.len(), self.remaining);
        let read = self.inner.read(&mut buf[0..len])?;
        self.remaining -= read;

        Ok(read)
    }
}

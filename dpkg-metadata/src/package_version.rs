// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian package version string handling.

Versions have the form `[epoch:]upstream_version[-debian_revision]`. The
semantics are described at
<https://www.debian.org/doc/debian-policy/ch-controlfields.html#version>.

Comparison here splits each component into *runs*: a run of consecutive ASCII
digits forms one run and every other character is a run of its own. Runs are
compared position by position, numerically when both are digit runs and by
character code otherwise. A missing run sorts before any present run.

This differs from the full algorithm used by `dpkg`, which groups consecutive
non-digit characters and sorts `~` before everything. For example `1.0~rc1` sorts
*after* `1.0` here. Parsing and comparison never fail: malformed input is
ordered by whatever runs it produces.
*/

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

/// A Debian package version.
///
/// Equality follows [Ord]: `1.01` and `1.1` are equal versions even though their
/// string forms differ.
#[derive(Clone, Debug)]
pub struct PackageVersion {
    epoch: Option<u64>,
    upstream_version: String,
    debian_revision: Option<String>,
}

impl PackageVersion {
    /// Construct an instance by parsing a version string.
    ///
    /// An epoch is only recognized when everything before the first `:` is a
    /// non-empty run of digits. The debian revision is everything after the last `-`.
    pub fn parse(s: &str) -> Self {
        let (epoch, remainder) = match s.split_once(':') {
            Some((epoch, remainder))
                if !epoch.is_empty() && epoch.chars().all(|c| c.is_ascii_digit()) =>
            {
                // Only absurdly long epochs fail to parse. Saturate rather than fail.
                (Some(epoch.parse::<u64>().unwrap_or(u64::MAX)), remainder)
            }
            _ => (None, s),
        };

        let (upstream, debian) = match remainder.rsplit_once('-') {
            Some((upstream, debian)) => (upstream, Some(debian)),
            None => (remainder, None),
        };

        Self {
            epoch,
            upstream_version: upstream.to_string(),
            debian_revision: debian.map(|x| x.to_string()),
        }
    }

    /// The `epoch` component of the version string.
    ///
    /// Only `Some` if present or defined explicitly.
    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Assumed value of `epoch` component.
    ///
    /// If the component isn't explicitly defined, a default of `0` will be assumed.
    pub fn epoch_assumed(&self) -> u64 {
        self.epoch.unwrap_or(0)
    }

    /// `upstream` component of the version string.
    pub fn upstream_version(&self) -> &str {
        &self.upstream_version
    }

    /// `debian_revision` component of the version string.
    ///
    /// `None` if the version has no `-`. `Some("")` if it ends with one.
    pub fn debian_revision(&self) -> Option<&str> {
        self.debian_revision.as_deref()
    }
}

impl Display for PackageVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }

        f.write_str(&self.upstream_version)?;

        if let Some(revision) = &self.debian_revision {
            write!(f, "-{}", revision)?;
        }

        Ok(())
    }
}

impl From<&str> for PackageVersion {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Split a version component into runs.
///
/// Consecutive ASCII digits form a single run. Every other character is its own run.
fn version_runs(s: &str) -> Vec<&str> {
    let mut runs = vec![];
    let mut digits_start = None;

    for (pos, c) in s.char_indices() {
        if c.is_ascii_digit() {
            digits_start.get_or_insert(pos);
            continue;
        }

        if let Some(start) = digits_start.take() {
            runs.push(&s[start..pos]);
        }

        runs.push(&s[pos..pos + c.len_utf8()]);
    }

    if let Some(start) = digits_start {
        runs.push(&s[start..]);
    }

    runs
}

fn is_digit_run(run: &str) -> bool {
    !run.is_empty() && run.bytes().all(|b| b.is_ascii_digit())
}

/// Compare two strings of ASCII digits by numeric value, without overflow.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');

    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_run(a: &str, b: &str) -> Ordering {
    if is_digit_run(a) && is_digit_run(b) {
        compare_numeric(a, b)
    } else {
        a.cmp(b)
    }
}

/// Compare a version component string run by run.
fn compare_component(a: &str, b: &str) -> Ordering {
    let a_runs = version_runs(a);
    let b_runs = version_runs(b);

    for pos in 0..std::cmp::max(a_runs.len(), b_runs.len()) {
        let a_run = a_runs.get(pos).copied().unwrap_or("");
        let b_run = b_runs.get(pos).copied().unwrap_or("");

        match compare_run(a_run, b_run) {
            Ordering::Equal => {}
            res => {
                return res;
            }
        }
    }

    Ordering::Equal
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl PartialOrd<Self> for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Epoch is compared numerically. Then upstream and debian components are compared
        // run by run. A missing debian revision is equivalent to an empty one.
        self.epoch_assumed()
            .cmp(&other.epoch_assumed())
            .then_with(|| compare_component(&self.upstream_version, &other.upstream_version))
            .then_with(|| {
                compare_component(
                    self.debian_revision.as_deref().unwrap_or(""),
                    other.debian_revision.as_deref().unwrap_or(""),
                )
            })
    }
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    PackageVersion::parse(a).cmp(&PackageVersion::parse(b))
}

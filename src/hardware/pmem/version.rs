//! Version Gate
//!
//! Some `ipmctl` releases emit corrupted region XML that still parses. The
//! gate reads the tool banner and refuses to continue on a known-bad release.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::runner::CommandRunner;
use crate::error::{Error, Result};

/// Command printing the tool banner
pub const CMD_SHOW_VERSION: &str = "ipmctl version";

/// Releases that corrupt `show -region` output
const DEFECTIVE_RELEASES: [SemVer; 3] = [
    SemVer::new(2, 0, 0, 3809),
    SemVer::new(2, 0, 0, 3814),
    SemVer::new(2, 0, 0, 3816),
];

// =============================================================================
// SemVer
// =============================================================================

/// Four-component tool version, printed as `AA.BB.CC.DDDD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemVer {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl SemVer {
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Find the first version-shaped token in free-form banner text
    ///
    /// Punctuation glued to the token (`Version=`, parentheses, a trailing
    /// full stop) is ignored.
    pub fn find_in(text: &str) -> Option<Self> {
        text.split_whitespace()
            .map(|tok| tok.trim_matches(|c: char| !c.is_ascii_digit()))
            .find_map(|tok| tok.parse().ok())
    }
}

impl FromStr for SemVer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Config(format!("invalid version '{}'", s));

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4
            || parts
                .iter()
                .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(bad());
        }

        let num = |p: &str| p.parse::<u32>().map_err(|_| bad());
        Ok(Self::new(
            num(parts[0])?,
            num(parts[1])?,
            num(parts[2])?,
            num(parts[3])?,
        ))
    }
}

impl TryFrom<String> for SemVer {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SemVer> for String {
    fn from(v: SemVer) -> Self {
        v.to_string()
    }
}

impl std::fmt::Display for SemVer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}.{:02}.{:02}.{:04}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

// =============================================================================
// Version Gate
// =============================================================================

/// Rejects tool releases listed in its bad-version table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionGate {
    bad_versions: Vec<SemVer>,
}

impl Default for VersionGate {
    fn default() -> Self {
        Self::new(DEFECTIVE_RELEASES.to_vec())
    }
}

impl VersionGate {
    /// Create a gate over the given bad-version table
    pub fn new(bad_versions: Vec<SemVer>) -> Self {
        Self { bad_versions }
    }

    /// Known-defective releases
    pub fn known_defective() -> &'static [SemVer] {
        &DEFECTIVE_RELEASES
    }

    pub fn bad_versions(&self) -> &[SemVer] {
        &self.bad_versions
    }

    /// Check a banner against the table, returning the version it names
    pub fn check_banner(&self, banner: &str) -> Result<SemVer> {
        let version = SemVer::find_in(banner).ok_or_else(|| Error::NoVersionFound {
            output: banner.to_string(),
        })?;

        if self.bad_versions.contains(&version) {
            return Err(Error::BadVersion(version));
        }

        Ok(version)
    }

    /// Run the version command and check its banner
    #[instrument(skip(self, runner))]
    pub fn check_tool_version<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<SemVer> {
        let banner = runner.run(CMD_SHOW_VERSION)?;
        let version = self.check_banner(&banner)?;
        debug!("ipmctl version {} accepted", version);
        Ok(version)
    }
}

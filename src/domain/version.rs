use crate::error::{Result, TapReleaseError};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Version every project starts from before its first release.
pub const INITIAL_VERSION: Version = Version::new(0, 0, 0);

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v([0-9]+)\.([0-9]+)\.([0-9]+)$").expect("version pattern is valid")
    })
}

/// Semantic version as released by this tool, always rendered as `vX.Y.Z`.
///
/// Field order matters: the derived `Ord` compares major, then minor, then
/// patch, numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a `vMAJOR.MINOR.PATCH` string.
    ///
    /// Unlike tag discovery, this never guesses: a missing `v`, a missing or
    /// extra component, or anything non-numeric is an error.
    pub fn parse(input: &str) -> Result<Self> {
        if !input.starts_with('v') {
            return Err(TapReleaseError::parse(input, "must start with 'v'"));
        }

        let captures = version_pattern()
            .captures(input)
            .ok_or_else(|| TapReleaseError::parse(input, "expected vMAJOR.MINOR.PATCH"))?;

        let component = |index: usize, name: &str| -> Result<u32> {
            captures[index]
                .parse::<u32>()
                .map_err(|_| TapReleaseError::parse(input, format!("{} component out of range", name)))
        };

        Ok(Version {
            major: component(1, "major")?,
            minor: component(2, "minor")?,
            patch: component(3, "patch")?,
        })
    }

    /// Compute the next version for the given bump kind.
    pub fn bump(&self, kind: VersionBump) -> Result<Self> {
        let overflow = || TapReleaseError::parse(self.to_string(), format!("cannot bump {}: overflow", kind));

        let next = match kind {
            VersionBump::Major => Version::new(self.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
            VersionBump::Minor => {
                Version::new(self.major, self.minor.checked_add(1).ok_or_else(overflow)?, 0)
            }
            VersionBump::Patch => Version::new(
                self.major,
                self.minor,
                self.patch.checked_add(1).ok_or_else(overflow)?,
            ),
        };

        Ok(next)
    }
}

impl Default for Version {
    fn default() -> Self {
        INITIAL_VERSION
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = TapReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

/// Which component of the version a release increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionBump {
    Major,
    Minor,
    #[default]
    Patch,
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VersionBump::Major => "major",
            VersionBump::Minor => "minor",
            VersionBump::Patch => "patch",
        };
        f.write_str(name)
    }
}

/// Compare two version strings numerically.
///
/// Both sides must parse; `v1.10.0` is greater than `v1.9.0`.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

/// Highest well-formed version among a set of tag names.
///
/// Tags that are not strict `vX.Y.Z` (e.g. `nightly`, `v2.0.0-rc1`) are skipped.
pub fn latest_version_tag<'a, I>(tags: I) -> Option<Version>
where
    I: IntoIterator<Item = &'a str>,
{
    tags.into_iter()
        .filter_map(|tag| Version::parse(tag).ok())
        .max()
}

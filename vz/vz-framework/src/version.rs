use core::fmt;
use core::str::FromStr;

/// A host operating system version, e.g. `13.4.1`.
///
/// Ordering compares `major`, then `minor`, then `patch`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl OsVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Shorthand for `major.0.0`.
    #[must_use]
    pub const fn major(major: u32) -> Self {
        Self::new(major, 0, 0)
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for OsVersion {
    type Err = ParseOsVersionError;

    /// Parses `major[.minor[.patch]]`; missing components are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseOsVersionError::Empty);
        }

        let mut parts = [0u32; 3];
        for (i, component) in s.split('.').enumerate() {
            let Some(slot) = parts.get_mut(i) else {
                return Err(ParseOsVersionError::TooManyComponents);
            };
            *slot = component
                .parse()
                .map_err(|_| ParseOsVersionError::InvalidComponent(component.to_owned()))?;
        }

        let [major, minor, patch] = parts;
        Ok(Self::new(major, minor, patch))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseOsVersionError {
    #[error("empty version string")]
    Empty,
    #[error("invalid version component {0:?}")]
    InvalidComponent(String),
    #[error("a version has at most three components")]
    TooManyComponents,
}

//! Platforms and platform availability sets.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A native platform that can contribute a schema fragment.
///
/// The declaration order here is also the fixed precedence order used
/// by the linker when one value must be chosen among platforms (enum
/// underlying integers): Android before iOS before Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    /// Android (Java/Kotlin sources).
    Android,
    /// iOS (Objective-C/Swift sources).
    Ios,
    /// Windows (CLR sources).
    Windows,
}

impl Platform {
    /// All platforms in precedence order.
    pub const PRECEDENCE: [Self; 3] = [Self::Android, Self::Ios, Self::Windows];

    /// Canonical lower-case name used in manifests and on the CLI.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            "windows" => Ok(Self::Windows),
            other => Err(ModelError::UnknownPlatform(other.to_string())),
        }
    }
}

bitflags! {
    /// Set of platforms implementing a type or member.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PlatformSet: u8 {
        /// Android is present.
        const ANDROID = 1;
        /// iOS is present.
        const IOS = 1 << 1;
        /// Windows is present.
        const WINDOWS = 1 << 2;
    }
}

impl PlatformSet {
    /// The platforms in this set, in precedence order.
    #[must_use]
    pub fn platforms(self) -> Vec<Platform> {
        Platform::PRECEDENCE.into_iter().filter(|p| self.contains((*p).into())).collect()
    }

    /// Number of platforms in the set.
    #[must_use]
    pub fn count(self) -> usize {
        self.bits().count_ones() as usize
    }

    /// Comma-separated canonical names, precedence order
    /// (`android,ios`), as written to the manifest `platforms`
    /// attribute.
    #[must_use]
    pub fn names(self) -> String {
        let names: Vec<&str> = self.platforms().iter().map(|p| p.as_str()).collect();
        names.join(",")
    }

    /// Parse a comma-separated `platforms` attribute value.
    pub fn parse_names(value: &str) -> Result<Self, ModelError> {
        let mut set = Self::empty();
        for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            set |= name.parse::<Platform>()?.into();
        }
        Ok(set)
    }
}

impl From<Platform> for PlatformSet {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Android => Self::ANDROID,
            Platform::Ios => Self::IOS,
            Platform::Windows => Self::WINDOWS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        let set = PlatformSet::ANDROID | PlatformSet::WINDOWS;
        assert_eq!(set.names(), "android,windows");
        assert_eq!(PlatformSet::parse_names("android,windows"), Ok(set));
        assert_eq!(PlatformSet::parse_names("windows, android"), Ok(set));
    }

    #[test]
    fn unknown_platform_rejected() {
        assert!(PlatformSet::parse_names("android,blackberry").is_err());
        assert!("Android".parse::<Platform>().is_err());
    }

    #[test]
    fn precedence_order() {
        let set = PlatformSet::all();
        assert_eq!(set.platforms(), vec![Platform::Android, Platform::Ios, Platform::Windows]);
        assert_eq!(set.count(), 3);
    }

    #[test]
    fn default_is_the_empty_set() {
        assert_eq!(PlatformSet::default(), PlatformSet::empty());
        assert_eq!(PlatformSet::default().count(), 0);
    }
}

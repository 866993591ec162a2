//! Host version compatibility gate.
//!
//! The engine reaches into host internals that are only verified against a
//! known range of host versions. Outside that range the engine starts
//! disabled and asks for confirmation, which the user can persist as a skip.
//! A skip is keyed to the host's (major, minor), so the question comes back
//! after the host advances to the next minor.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::settings::VersionSkip;

/// Host application version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl AppVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for AppVersion {
    type Err = anyhow::Error;

    /// Parse "major.minor" or "major.minor.patch".
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            bail!("version must be major.minor[.patch], got '{}'", s);
        }
        let parse = |p: &str| -> Result<u64> {
            p.parse::<u64>()
                .with_context(|| format!("bad version component '{}' in '{}'", p, s))
        };
        Ok(Self {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: if parts.len() == 3 { parse(parts[2])? } else { 0 },
        })
    }
}

/// Outcome of the gate check at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Version is verified (or skipped); run normally.
    Enabled,
    /// Version is outside the verified range and no valid skip exists.
    /// The engine stays inactive until the user confirms.
    NeedsConfirmation,
}

/// Half-open range of verified host versions.
#[derive(Debug, Clone, Copy)]
pub struct VersionGate {
    /// Oldest version the current engine has been verified against
    pub older_verified: AppVersion,
    /// First version NOT yet verified
    pub yet_verified: AppVersion,
}

impl Default for VersionGate {
    fn default() -> Self {
        Self {
            older_verified: AppVersion::new(4, 40, 0),
            yet_verified: AppVersion::new(4, 45, 0),
        }
    }
}

impl VersionGate {
    pub fn in_range(&self, version: AppVersion) -> bool {
        self.older_verified <= version && version < self.yet_verified
    }

    /// Decide whether the engine may activate under `version`.
    ///
    /// A stored skip only counts when it names exactly this (major, minor);
    /// any advance invalidates it and the question is asked again.
    pub fn evaluate(&self, version: AppVersion, skip: Option<VersionSkip>) -> GateDecision {
        if self.in_range(version) {
            return GateDecision::Enabled;
        }
        match skip {
            Some(s) if s.major == version.major && s.minor == version.minor => {
                log::info!(
                    "host {} outside verified range, previously confirmed by user",
                    version
                );
                GateDecision::Enabled
            }
            _ => {
                log::warn!(
                    "host {} outside verified range [{}, {}), confirmation required",
                    version,
                    self.older_verified,
                    self.yet_verified
                );
                GateDecision::NeedsConfirmation
            }
        }
    }

    /// The skip to persist when the user confirms running under `version`.
    pub fn skip_for(version: AppVersion) -> VersionSkip {
        VersionSkip {
            major: version.major,
            minor: version.minor,
        }
    }
}

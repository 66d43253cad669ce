//! Resolution of the stored schedule timezone into a calendar clock.
//!
//! Resolution never fails: an empty or unknown identifier falls back to UTC,
//! and the fallback carries the reason so callers can log or report it.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;

/// Why a requested timezone identifier could not be used
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// Identifier was empty or whitespace
    Empty,
    /// Identifier is not in the timezone database
    Unknown(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Empty => write!(f, "timezone identifier is empty"),
            FallbackReason::Unknown(msg) => write!(f, "unknown timezone: {}", msg),
        }
    }
}

/// Outcome of resolving a timezone identifier
#[derive(Debug, Clone, PartialEq)]
pub enum TimezoneResolution {
    /// The requested zone was found
    Resolved { name: String, tz: Tz },
    /// The requested zone was unusable and UTC is used instead
    Fallback {
        requested: String,
        reason: FallbackReason,
    },
}

impl TimezoneResolution {
    /// Normalized identifier of the clock actually in use
    pub fn name(&self) -> &str {
        match self {
            TimezoneResolution::Resolved { name, .. } => name,
            TimezoneResolution::Fallback { .. } => "UTC",
        }
    }

    pub fn clock(&self) -> Tz {
        match self {
            TimezoneResolution::Resolved { tz, .. } => *tz,
            TimezoneResolution::Fallback { .. } => Tz::UTC,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TimezoneResolution::Fallback { .. })
    }

    /// Current instant on this resolution's clock
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.clock())
    }
}

/// Map a timezone identifier to a usable clock, falling back to UTC
pub fn resolve(identifier: &str) -> TimezoneResolution {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return TimezoneResolution::Fallback {
            requested: identifier.to_string(),
            reason: FallbackReason::Empty,
        };
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => TimezoneResolution::Resolved {
            name: trimmed.to_string(),
            tz,
        },
        Err(e) => TimezoneResolution::Fallback {
            requested: trimmed.to_string(),
            reason: FallbackReason::Unknown(e.to_string()),
        },
    }
}

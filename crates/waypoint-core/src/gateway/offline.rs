//! Offline gate
//!
//! When the configured port is negative every operation resolves locally:
//! load queries return empty results, mutations echo their input, tag
//! mutations apply the add/remove to the caller's tag list, and location and
//! version return placeholder values. No network I/O, no timeouts.

use crate::models::{Location, VersionInfo};

/// Kind of a short-circuited call, as reported in generic events
pub(super) fn kind(kind: &str) -> String {
    format!("{} (offline)", kind)
}

/// Location reported when the backend is disabled
pub(super) fn location() -> Location {
    Location {
        lat: 0.0,
        lon: 0.0,
        accuracy_m: 0.0,
    }
}

/// Version reported when the backend is disabled
pub(super) fn version() -> VersionInfo {
    VersionInfo::offline()
}

//! Tracks metadata for a filter-building session.

use crate::log;

/// Metadata for a filter-building session.
///
/// A [`crate::instance::FilterInstance`] is created once per paint or bounds query, and
/// there is no longer-lived context where the crate could keep track of things like the
/// logging switch.  The caller creates a `Session` and passes it along; it is cheap to
/// clone.
#[derive(Clone, Debug)]
pub struct Session {
    log_enabled: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            log_enabled: log::log_enabled(),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with an explicit logging switch, independent of the environment.
    pub fn new_with_logging(log_enabled: bool) -> Self {
        Self { log_enabled }
    }

    pub fn log_enabled(&self) -> bool {
        self.log_enabled
    }
}

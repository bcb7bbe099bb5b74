use std::fmt;

use serde::Serialize;

/// Why a drain did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    NoToken,
    AlreadyRunning,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offline => "offline",
            Self::NoToken => "not signed in",
            Self::AlreadyRunning => "another drain is in progress",
        })
    }
}

/// Outcome of one pass over the sync queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Entries sent to the server
    pub attempted: usize,
    pub confirmed: usize,
    /// Transient failures, kept for the next drain
    pub failed: usize,
    /// Entries held back behind an earlier failure for the same note
    pub deferred: usize,
    /// Entries the server rejected permanently and that were dropped
    pub abandoned: usize,
    /// Entries still queued when the pass ended
    pub remaining: usize,
    pub skipped: Option<SkipReason>,
}

impl DrainReport {
    pub(crate) fn skipped(reason: SkipReason, remaining: usize) -> Self {
        Self {
            remaining,
            skipped: Some(reason),
            ..Self::default()
        }
    }

    /// True when the queue was fully drained
    pub const fn is_complete(&self) -> bool {
        self.skipped.is_none() && self.remaining == 0
    }
}

impl fmt::Display for DrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = self.skipped {
            return write!(
                f,
                "sync skipped ({reason}), {} change(s) pending",
                self.remaining
            );
        }
        write!(
            f,
            "{} synced, {} failed, {} deferred, {} abandoned, {} pending",
            self.confirmed, self.failed, self.deferred, self.abandoned, self.remaining
        )
    }
}

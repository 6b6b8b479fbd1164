pub mod cross;
pub mod lookup;
pub mod reconcile;
pub mod remove;

use std::io::Write;

use crate::error::SyncError;

pub use cross::{sync_cards_to_issues, sync_issues_to_cards};
pub use lookup::ListLookup;
pub use reconcile::{prepare_labels, reconcile};
pub use remove::remove_all;

/// Outcome of one reconciliation or removal pass.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Keys that were created (or removed).
    pub applied: Vec<String>,
    /// Keys already present on the remote, or already gone when removing.
    pub skipped: Vec<String>,
    pub failures: Vec<(String, SyncError)>,
}

impl PassReport {
    pub fn total(&self) -> usize {
        self.applied.len() + self.skipped.len() + self.failures.len()
    }

    pub fn merge(&mut self, other: PassReport) {
        self.applied.extend(other.applied);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }

    /// Print the failure summary and fail when anything went wrong.
    pub fn finish<W: Write>(self, out: &mut W) -> Result<(), SyncError> {
        if self.failures.is_empty() {
            return Ok(());
        }
        writeln!(out, "{} failed:", self.failures.len())?;
        for (key, err) in &self.failures {
            writeln!(out, "  \"{key}\": {err}")?;
        }
        Err(SyncError::PassFailed {
            failed: self.failures.len(),
            total: self.total(),
        })
    }
}

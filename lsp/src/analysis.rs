//! The contract between the dispatcher and an analysis engine.

use std::sync::Arc;

use vigil_core::{DiagnosticsByFile, SourceSnapshot, StateHash, StateHashes};
use vigil_types::FileId;

/// The fast path cannot answer for this change set; run the slow path.
///
/// Not a failure. The dispatcher treats it as a routing signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fast path infeasible: {reason}")]
pub struct Infeasible {
    pub reason: String,
}

impl Infeasible {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Files handed to an engine run, keyed by their workspace id.
pub type FileSet = [(FileId, Arc<SourceSnapshot>)];

/// An analysis engine.
///
/// Engines receive immutable snapshots and never see the workspace table.
/// The slow path runs on a blocking worker, hence `Send + Sync`.
pub trait AnalysisEngine: Send + Sync {
    /// Fingerprint used to decide fast-path eligibility. Two snapshots with
    /// equal hashes must be interchangeable for every file except the one
    /// they belong to.
    fn state_hash(&self, snapshot: &SourceSnapshot) -> StateHash {
        StateHash::of(snapshot.text().as_bytes())
    }

    /// Analyze only `changed`, given the hashes recorded after the last
    /// full run. Must return a (possibly empty) entry for every changed file.
    fn run_fast_path(
        &self,
        changed: &FileSet,
        hashes: &StateHashes,
    ) -> Result<DiagnosticsByFile, Infeasible>;

    /// Analyze the whole workspace. Must return an entry for every file.
    fn run_slow_path(&self, files: &FileSet) -> DiagnosticsByFile;
}

//! Immutable source snapshots and the arithmetic around them.
//!
//! A [`SourceSnapshot`] is never mutated. Edits go through [`patch`] and
//! produce a new snapshot; [`Location`]s point into a specific snapshot by
//! identity and convert byte offsets to 1-based positions on demand.

mod diagnostic;
mod error;
mod file_table;
mod hashes;
mod location;
pub mod patch;
mod snapshot;

pub use diagnostic::{
    Diagnostic, DiagnosticsByFile, ErrorClass, ErrorLine, ErrorSection, SuggestedFix,
};
pub use error::CoreError;
pub use file_table::FileTable;
pub use hashes::{StateHash, StateHashes};
pub use location::{Location, offset_to_position, position_to_offset};
pub use snapshot::SourceSnapshot;

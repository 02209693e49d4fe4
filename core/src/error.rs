use thiserror::Error;

use vigil_types::Position;

/// Precondition violations in location and patch arithmetic.
///
/// These indicate a caller bug. The current operation is aborted; no state
/// has been modified when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("offset {offset} is past the end of {path} ({len} bytes)")]
    OffsetOutOfBounds { path: String, offset: u32, len: u32 },
    #[error("invalid position {}:{} (lines and columns start at 1)", .position.line, .position.column)]
    InvalidPosition { position: Position },
    #[error("range {begin}..{end} is inverted")]
    InvertedRange { begin: u32, end: u32 },
    #[error("cannot join locations from different snapshots ({left} and {right})")]
    ForeignLocation { left: String, right: String },
}

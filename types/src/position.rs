//! Line/column coordinates.
//!
//! Two conventions meet here: the model counts lines and columns from 1,
//! while the editor transport counts both from 0. [`WirePosition`] is the
//! transport form; [`WirePosition::to_model`] is the only crossing point.

use serde::{Deserialize, Serialize};

/// 1-based line and column within a source snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Convert back to the 0-based transport convention.
    #[must_use]
    pub const fn to_wire(self) -> WirePosition {
        WirePosition {
            line: self.line.saturating_sub(1),
            character: self.column.saturating_sub(1),
        }
    }
}

/// 0-based `{line, character}` as sent by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WirePosition {
    pub line: u32,
    pub character: u32,
}

impl WirePosition {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    #[must_use]
    pub const fn to_model(self) -> Position {
        Position {
            line: self.line.saturating_add(1),
            column: self.character.saturating_add(1),
        }
    }
}

/// Transport range: 0-based, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeRange {
    pub start: WirePosition,
    pub end: WirePosition,
}

impl ChangeRange {
    #[must_use]
    pub const fn new(start: WirePosition, end: WirePosition) -> Self {
        Self { start, end }
    }
}

/// One entry of a document change batch.
///
/// An absent `range` replaces the whole document with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<ChangeRange>,
    pub text: String,
}

impl ContentChange {
    #[must_use]
    pub fn replace_all(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn replace_range(range: ChangeRange, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }
}

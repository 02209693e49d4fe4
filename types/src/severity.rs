use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity level for a diagnostic, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown diagnostic severity {0}")]
pub struct UnknownSeverity(pub u8);

impl DiagnosticSeverity {
    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

impl From<DiagnosticSeverity> for u8 {
    fn from(value: DiagnosticSeverity) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for DiagnosticSeverity {
    type Error = UnknownSeverity;

    fn try_from(value: u8) -> Result<Self, UnknownSeverity> {
        match value {
            1 => Ok(Self::Error),
            2 => Ok(Self::Warning),
            3 => Ok(Self::Information),
            4 => Ok(Self::Hint),
            other => Err(UnknownSeverity(other)),
        }
    }
}

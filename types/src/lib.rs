//! Core domain types for Vigil.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the service.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod ids;
mod position;
mod severity;

pub use ids::{Epoch, FileId};
pub use position::{ChangeRange, ContentChange, Position, WirePosition};
pub use severity::{DiagnosticSeverity, UnknownSeverity};

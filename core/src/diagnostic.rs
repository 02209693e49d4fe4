//! Analysis results as produced by an engine, before any wire conversion.

use std::collections::BTreeMap;

use vigil_types::{DiagnosticSeverity, FileId};

use crate::location::Location;

/// Per-file diagnostics from one analysis run, in file-id order.
pub type DiagnosticsByFile = BTreeMap<FileId, Vec<Diagnostic>>;

/// Stable error code plus the severity it is reported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorClass {
    pub code: u16,
    pub severity: DiagnosticSeverity,
}

impl ErrorClass {
    #[must_use]
    pub const fn new(code: u16, severity: DiagnosticSeverity) -> Self {
        Self { code, severity }
    }

    #[must_use]
    pub const fn error(code: u16) -> Self {
        Self::new(code, DiagnosticSeverity::Error)
    }
}

/// One line of supporting detail inside an [`ErrorSection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLine {
    pub location: Location,
    /// May be empty, in which case the section header stands in for it.
    pub message: String,
}

impl ErrorLine {
    #[must_use]
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSection {
    pub header: String,
    pub lines: Vec<ErrorLine>,
}

impl ErrorSection {
    #[must_use]
    pub fn new(header: impl Into<String>, lines: Vec<ErrorLine>) -> Self {
        Self {
            header: header.into(),
            lines,
        }
    }
}

/// A replacement the engine proposes for part of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedFix {
    pub title: String,
    pub location: Location,
    pub replacement: String,
}

impl SuggestedFix {
    #[must_use]
    pub fn new(title: impl Into<String>, location: Location, replacement: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            location,
            replacement: replacement.into(),
        }
    }
}

/// A single finding.
///
/// Fields are private; construction goes through [`Diagnostic::new`] and the
/// `with_*` builders, consumers read through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    location: Location,
    class: ErrorClass,
    header: String,
    sections: Vec<ErrorSection>,
    suggested_fixes: Vec<SuggestedFix>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(location: Location, class: ErrorClass, header: impl Into<String>) -> Self {
        Self {
            location,
            class,
            header: header.into(),
            sections: Vec::new(),
            suggested_fixes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_section(mut self, section: ErrorSection) -> Self {
        self.sections.push(section);
        self
    }

    #[must_use]
    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.suggested_fixes.push(fix);
        self
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        self.class
    }

    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    #[must_use]
    pub fn sections(&self) -> &[ErrorSection] {
        &self.sections
    }

    #[must_use]
    pub fn suggested_fixes(&self) -> &[SuggestedFix] {
        &self.suggested_fixes
    }

    /// Format as `path:line:col: severity: [code] header` (1-based), with the
    /// source excerpt underneath when the location is known.
    #[must_use]
    pub fn render(&self) -> String {
        let Some((source, (begin, _))) = self.location.source().zip(self.location.position())
        else {
            return format!(
                "{}: [{}] {}",
                self.class.severity.label(),
                self.class.code,
                self.header
            );
        };
        format!(
            "{}:{}:{}: {}: [{}] {}\n{}",
            source.path(),
            begin.line,
            begin.column,
            self.class.severity.label(),
            self.class.code,
            self.header,
            self.location.render_excerpt(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SourceSnapshot;
    use std::sync::Arc;
    use vigil_types::Epoch;

    #[test]
    fn test_render_with_location() {
        let snap = Arc::new(SourceSnapshot::new("lib/a.rb", "x = foo(\n", Epoch::new(1)));
        let diag = Diagnostic::new(
            Location::new(&snap, 7, 8).unwrap(),
            ErrorClass::error(1002),
            "unclosed `(`",
        );
        assert_eq!(
            diag.render(),
            "lib/a.rb:1:8: error: [1002] unclosed `(`\n  x = foo(\n         ^"
        );
    }

    #[test]
    fn test_render_without_location() {
        let diag = Diagnostic::new(
            Location::none(),
            ErrorClass::new(7, DiagnosticSeverity::Warning),
            "something",
        );
        assert_eq!(diag.render(), "warning: [7] something");
    }

    #[test]
    fn test_builders_accumulate() {
        let diag = Diagnostic::new(Location::none(), ErrorClass::error(1), "h")
            .with_section(ErrorSection::new("s", vec![]))
            .with_fix(SuggestedFix::new("t", Location::none(), "r"));
        assert_eq!(diag.sections().len(), 1);
        assert_eq!(diag.suggested_fixes().len(), 1);
    }
}

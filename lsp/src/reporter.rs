//! Epoch-ordered diagnostic publication.
//!
//! The reporter decides, per file, whether a batch of diagnostics goes out
//! to the client. Batches tagged with an epoch older than the last one
//! reported for the file are dropped whole: a slow analysis that started
//! before a fast-path update must never overwrite it. Files that had no
//! errors and still have none are not re-announced.

use tracing::debug;

use vigil_core::{Diagnostic, Location, SourceSnapshot};
use vigil_types::{Epoch, FileId};

use crate::protocol::{
    LspDiagnostic, LspFix, LspLocation, LspRange, LspTextEdit, PublishDiagnosticsParams,
    RelatedInformation, WorkspaceRoot,
};

const DIAGNOSTIC_SOURCE: &str = "vigil";
const DOC_LINK_MESSAGE: &str = "Click for more information on this error.";

/// What the client last saw for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileErrorStatus {
    /// `Epoch::NEVER` until the first batch is processed.
    pub last_reported_epoch: Epoch,
    pub has_errors: bool,
}

#[derive(Debug)]
pub struct ErrorReporter {
    root: WorkspaceRoot,
    error_url_base: Option<String>,
    statuses: Vec<FileErrorStatus>,
}

impl ErrorReporter {
    #[must_use]
    pub fn new(root: WorkspaceRoot, error_url_base: Option<String>) -> Self {
        Self {
            root,
            error_url_base,
            statuses: Vec::new(),
        }
    }

    /// Record `diagnostics` as the result for `file` at `epoch`.
    ///
    /// Returns the notification to send, if any. State is updated whenever
    /// the batch is not stale, including when nothing is sent.
    pub fn push_diagnostics(
        &mut self,
        epoch: Epoch,
        file: FileId,
        path: &str,
        diagnostics: &[Diagnostic],
    ) -> Option<PublishDiagnosticsParams> {
        let status = self.status_mut(file);
        if epoch < status.last_reported_epoch {
            debug!(%file, %epoch, last = %status.last_reported_epoch, "Dropping stale diagnostics");
            return None;
        }

        let had_errors = status.has_errors;
        let has_errors = !diagnostics.is_empty();
        *status = FileErrorStatus {
            last_reported_epoch: epoch,
            has_errors,
        };
        if !has_errors && !had_errors {
            return None;
        }

        let uri = self.root.to_remote(path);
        debug!(%uri, %epoch, count = diagnostics.len(), "Publishing diagnostics");
        Some(PublishDiagnosticsParams {
            diagnostics: diagnostics
                .iter()
                .filter_map(|d| self.to_lsp(d))
                .collect(),
            uri,
        })
    }

    /// Like [`push_diagnostics`](Self::push_diagnostics), but also drops the
    /// batch when `snapshot` (the file's current version) is newer than
    /// `epoch`. The file was edited after the run started, and the edit's
    /// own analysis has yet to report.
    pub fn push_snapshot_diagnostics(
        &mut self,
        epoch: Epoch,
        file: FileId,
        snapshot: &SourceSnapshot,
        diagnostics: &[Diagnostic],
    ) -> Option<PublishDiagnosticsParams> {
        if snapshot.epoch() > epoch {
            debug!(%file, %epoch, file_epoch = %snapshot.epoch(), "File changed since run started");
            return None;
        }
        self.push_diagnostics(epoch, file, snapshot.path(), diagnostics)
    }

    /// Every file whose last processed batch had an epoch of at least
    /// `epoch`, whether or not that batch was sent. Ascending by id.
    #[must_use]
    pub fn files_updated_since(&self, epoch: Epoch) -> Vec<FileId> {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| s.last_reported_epoch >= epoch)
            .map(|(i, _)| FileId::new(i as u32))
            .collect()
    }

    #[must_use]
    pub fn file_error_statuses(&self) -> &[FileErrorStatus] {
        &self.statuses
    }

    fn status_mut(&mut self, file: FileId) -> &mut FileErrorStatus {
        if file.index() >= self.statuses.len() {
            self.statuses
                .resize(file.index() + 1, FileErrorStatus::default());
        }
        &mut self.statuses[file.index()]
    }

    fn to_lsp(&self, diagnostic: &Diagnostic) -> Option<LspDiagnostic> {
        let range = range_of(diagnostic.location())?;
        let class = diagnostic.class();

        let mut related_information = Vec::new();
        for section in diagnostic.sections() {
            for line in &section.lines {
                let Some(location) = self.location_of(&line.location) else {
                    continue;
                };
                let message = if line.message.is_empty() {
                    section.header.clone()
                } else {
                    line.message.clone()
                };
                related_information.push(RelatedInformation { location, message });
            }
            if let Some(base) = &self.error_url_base {
                related_information.push(RelatedInformation {
                    location: LspLocation {
                        uri: format!("{base}{}", class.code),
                        range: LspRange::default(),
                    },
                    message: DOC_LINK_MESSAGE.to_string(),
                });
            }
        }

        let data = diagnostic
            .suggested_fixes()
            .iter()
            .filter_map(|fix| {
                Some(LspFix {
                    title: fix.title.clone(),
                    edit: LspTextEdit {
                        range: range_of(&fix.location)?,
                        new_text: fix.replacement.clone(),
                    },
                })
            })
            .collect();

        Some(LspDiagnostic {
            range,
            severity: class.severity,
            code: class.code,
            source: DIAGNOSTIC_SOURCE.to_string(),
            message: diagnostic.header().to_string(),
            related_information,
            data,
        })
    }

    fn location_of(&self, location: &Location) -> Option<LspLocation> {
        let source = location.source()?;
        Some(LspLocation {
            uri: self.root.to_remote(source.path()),
            range: range_of(location)?,
        })
    }
}

fn range_of(location: &Location) -> Option<LspRange> {
    let (begin, end) = location.position()?;
    Some(LspRange {
        start: begin.to_wire(),
        end: end.to_wire(),
    })
}

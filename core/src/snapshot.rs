use std::fmt;

use vigil_types::Epoch;

/// An immutable copy of one file's contents at a given epoch.
///
/// The line-break index is computed once at construction and always matches
/// `text`. There are no setters: producing different contents means building
/// a new snapshot (see [`crate::patch`]).
pub struct SourceSnapshot {
    path: String,
    text: String,
    /// Byte offset of every `\n`, strictly increasing.
    line_breaks: Vec<u32>,
    epoch: Epoch,
}

impl SourceSnapshot {
    #[must_use]
    pub fn new(path: impl Into<String>, text: impl Into<String>, epoch: Epoch) -> Self {
        let text = text.into();
        let line_breaks = compute_line_breaks(&text);
        Self {
            path: path.into(),
            text,
            line_breaks,
            epoch,
        }
    }

    /// Base used when an edit names a file the workspace has never seen.
    #[must_use]
    pub fn empty(path: impl Into<String>, epoch: Epoch) -> Self {
        Self::new(path, String::new(), epoch)
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn line_breaks(&self) -> &[u32] {
        &self.line_breaks
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Length of the text in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines, counting a trailing empty line after a final newline.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        self.line_breaks.len() as u32 + 1
    }

    /// Byte offset at which 1-based `line` starts, or `None` past the last line.
    #[must_use]
    pub fn line_start(&self, line: u32) -> Option<u32> {
        match line {
            0 => None,
            1 => Some(0),
            n => self.line_breaks.get(n as usize - 2).map(|b| b + 1),
        }
    }

    /// Byte offset of the newline ending 1-based `line`, or the file length for the last line.
    #[must_use]
    pub fn line_end(&self, line: u32) -> u32 {
        line.checked_sub(1)
            .and_then(|idx| self.line_breaks.get(idx as usize).copied())
            .unwrap_or_else(|| self.len())
    }
}

impl fmt::Debug for SourceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSnapshot")
            .field("path", &self.path)
            .field("epoch", &self.epoch)
            .field("len", &self.text.len())
            .field("lines", &self.line_count())
            .finish_non_exhaustive()
    }
}

pub(crate) fn compute_line_breaks(text: &str) -> Vec<u32> {
    text.match_indices('\n').map(|(i, _)| i as u32).collect()
}

//! Byte offsets ⇄ 1-based positions, and source excerpts.

use std::fmt;
use std::sync::Arc;

use vigil_types::Position;

use crate::error::CoreError;
use crate::snapshot::SourceSnapshot;

/// Map a byte offset to a 1-based position.
///
/// A newline byte belongs to the line it terminates, so the position of
/// `offset` is measured from the last line break strictly before it.
pub fn offset_to_position(snapshot: &SourceSnapshot, offset: u32) -> Result<Position, CoreError> {
    if offset > snapshot.len() {
        return Err(CoreError::OffsetOutOfBounds {
            path: snapshot.path().to_string(),
            offset,
            len: snapshot.len(),
        });
    }
    Ok(locate(snapshot.line_breaks(), offset))
}

fn locate(line_breaks: &[u32], offset: u32) -> Position {
    let before = line_breaks.partition_point(|&b| b < offset);
    match before.checked_sub(1) {
        None => Position::new(1, offset + 1),
        Some(idx) => Position::new(idx as u32 + 2, offset - line_breaks[idx]),
    }
}

/// Map a 1-based position back to a byte offset.
///
/// Lines past the end of the file resolve against the last line, and columns
/// past the end of their line clamp to the line end, so the end of the file
/// is always reachable.
pub fn position_to_offset(snapshot: &SourceSnapshot, position: Position) -> Result<u32, CoreError> {
    if position.line == 0 || position.column == 0 {
        return Err(CoreError::InvalidPosition { position });
    }
    let line = position.line.min(snapshot.line_count());
    let start = snapshot.line_start(line).unwrap_or_default();
    let end = snapshot.line_end(line);
    Ok(start.saturating_add(position.column - 1).min(end))
}

/// A half-open byte range inside one specific snapshot, or nothing at all.
///
/// The snapshot is held by identity: two locations over snapshots with equal
/// text are still different locations.
#[derive(Clone, Default)]
pub struct Location {
    source: Option<Arc<SourceSnapshot>>,
    begin: u32,
    end: u32,
}

impl Location {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(source: &Arc<SourceSnapshot>, begin: u32, end: u32) -> Result<Self, CoreError> {
        if begin > end {
            return Err(CoreError::InvertedRange { begin, end });
        }
        if end > source.len() {
            return Err(CoreError::OffsetOutOfBounds {
                path: source.path().to_string(),
                offset: end,
                len: source.len(),
            });
        }
        Ok(Self {
            source: Some(Arc::clone(source)),
            begin,
            end,
        })
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.source.is_none()
    }

    #[must_use]
    pub fn source(&self) -> Option<&Arc<SourceSnapshot>> {
        self.source.as_ref()
    }

    #[must_use]
    pub fn begin_offset(&self) -> u32 {
        self.begin
    }

    #[must_use]
    pub fn end_offset(&self) -> u32 {
        self.end
    }

    /// The spanned text, or `None` for `none` or a span that splits a
    /// multi-byte character.
    #[must_use]
    pub fn source_text(&self) -> Option<&str> {
        self.source
            .as_ref()?
            .text()
            .get(self.begin as usize..self.end as usize)
    }

    /// Smallest location covering both. `none` is the identity.
    pub fn join(&self, other: &Location) -> Result<Location, CoreError> {
        let (Some(left), Some(right)) = (&self.source, &other.source) else {
            return Ok(if self.is_none() {
                other.clone()
            } else {
                self.clone()
            });
        };
        if !Arc::ptr_eq(left, right) {
            return Err(CoreError::ForeignLocation {
                left: left.path().to_string(),
                right: right.path().to_string(),
            });
        }
        Ok(Location {
            source: Some(Arc::clone(left)),
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        })
    }

    /// Begin and end positions, or `None` for the `none` location.
    #[must_use]
    pub fn position(&self) -> Option<(Position, Position)> {
        let source = self.source.as_ref()?;
        let breaks = source.line_breaks();
        Some((locate(breaks, self.begin), locate(breaks, self.end)))
    }

    /// The spanned source lines, with a caret line under single-line spans.
    ///
    /// The excerpt and the caret line each start with two spaces per `tabs`.
    /// Lines after the first keep their own leading whitespace only.
    #[must_use]
    pub fn render_excerpt(&self, tabs: usize) -> String {
        let (Some(source), Some((begin, end))) = (&self.source, self.position()) else {
            return String::new();
        };
        let bytes = source.text().as_bytes();
        let first = bytes[..self.begin as usize]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let last = bytes[self.end as usize..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |i| self.end as usize + i);
        let excerpt = String::from_utf8_lossy(&bytes[first..last]);

        let indent = "  ".repeat(tabs);
        let mut out = format!("{indent}{excerpt}");

        if begin.line == end.line {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(&" ".repeat(begin.column as usize - 1));
            out.push_str(&"^".repeat((end.column - begin.column) as usize));
        }
        out
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        let same_source = match (&self.source, &other.source) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_source && self.begin == other.begin && self.end == other.end
    }
}

impl Eq for Location {}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            None => f.write_str("Location(none)"),
            Some(source) => write!(f, "Location({}:{}..{})", source.path(), self.begin, self.end),
        }
    }
}

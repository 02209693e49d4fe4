//! Building new snapshots from edits.
//!
//! Nothing here mutates its input. Range edits in one batch are applied in
//! order, each against the text produced by the edits before it.

use vigil_types::{ContentChange, Epoch, Position};

use crate::error::CoreError;
use crate::snapshot::SourceSnapshot;

/// Replace the whole text, keeping the path.
#[must_use]
pub fn apply_full_replace(
    old: &SourceSnapshot,
    new_text: impl Into<String>,
    epoch: Epoch,
) -> SourceSnapshot {
    SourceSnapshot::new(old.path(), new_text, epoch)
}

/// Apply a batch of changes sequentially.
///
/// Each ranged change has its 0-based transport coordinates shifted to the
/// 1-based model and resolved against the intermediate text left by the
/// previous change. A change without a range replaces everything. The line
/// index of the result is computed once, at the end.
pub fn apply_range_edits(
    old: &SourceSnapshot,
    edits: &[ContentChange],
    epoch: Epoch,
) -> Result<SourceSnapshot, CoreError> {
    let mut text = old.text().to_string();
    for edit in edits {
        match edit.range {
            None => text.clone_from(&edit.text),
            Some(range) => {
                let start = offset_in_text(&text, range.start.to_model())?;
                let end = offset_in_text(&text, range.end.to_model())?;
                if start > end {
                    return Err(CoreError::InvertedRange {
                        begin: start as u32,
                        end: end as u32,
                    });
                }
                text.replace_range(start..end, &edit.text);
            }
        }
    }
    Ok(SourceSnapshot::new(old.path(), text, epoch))
}

/// Apply `changes` to `base`, or to an empty file at `path` when the
/// workspace has never seen it.
pub fn apply_changes(
    base: Option<&SourceSnapshot>,
    path: &str,
    changes: &[ContentChange],
    epoch: Epoch,
) -> Result<SourceSnapshot, CoreError> {
    match base {
        Some(base) => apply_range_edits(base, changes, epoch),
        None => {
            tracing::debug!(path, "Edit for unknown file, starting from empty text");
            apply_range_edits(&SourceSnapshot::empty(path, epoch), changes, epoch)
        }
    }
}

/// Resolve a 1-based position against raw text, with the same clamping as
/// [`crate::position_to_offset`]. The result is snapped back to a char boundary.
fn offset_in_text(text: &str, position: Position) -> Result<usize, CoreError> {
    if position.line == 0 || position.column == 0 {
        return Err(CoreError::InvalidPosition { position });
    }
    let line_start = if position.line == 1 {
        0
    } else {
        match text.match_indices('\n').nth(position.line as usize - 2) {
            Some((idx, _)) => idx + 1,
            None => text.rfind('\n').map_or(0, |i| i + 1),
        }
    };
    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |i| line_start + i);
    let mut offset = line_start
        .saturating_add(position.column as usize - 1)
        .min(line_end);
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    Ok(offset)
}

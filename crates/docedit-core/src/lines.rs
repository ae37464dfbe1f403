//! Line buffer: the line-addressed view of a document's content.
//!
//! Content is split on `'\n'` only, without trimming, so
//! `join_lines(&read_lines(s)) == s` for every string. An empty document is
//! a single empty line. Line numbers are 1-indexed and purely positional.
//!
//! # Splice semantics
//!
//! | Kind | Effect |
//! |------|--------|
//! | insert | replacement goes *after* line `start`; `end` is ignored |
//! | replace | lines `start..=end` are swapped for the replacement |
//! | delete | lines `start..=end` are removed |
//!
//! The buffer never clamps. Out-of-range positions are a caller bug, and
//! [`crate::apply::validate_range`] exists to rule them out first.

use crate::models::EditKind;

/// Splits content into its line view.
pub fn read_lines(content: &str) -> Vec<&str> {
    content.split('\n').collect()
}

/// Rejoins a line view into a content blob.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.as_ref());
    }
    out
}

/// Applies one edit to a line view and returns the new view.
///
/// `end` defaults to `start` for replace and delete. For delete the
/// `replacement` is ignored.
///
/// # Panics
///
/// Panics when `start`/`end` fall outside the view (see module docs).
pub fn splice<'a>(
    lines: &[&'a str],
    start: usize,
    end: Option<usize>,
    replacement: &[&'a str],
    kind: EditKind,
) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(lines.len() + replacement.len());
    match kind {
        EditKind::Insert => {
            out.extend_from_slice(&lines[..start]);
            out.extend_from_slice(replacement);
            out.extend_from_slice(&lines[start..]);
        }
        EditKind::Replace | EditKind::Delete => {
            let end = end.unwrap_or(start);
            assert!(
                start >= 1 && end >= start && end <= lines.len(),
                "splice range {}..={} outside 1..={}",
                start,
                end,
                lines.len()
            );
            out.extend_from_slice(&lines[..start - 1]);
            if kind == EditKind::Replace {
                out.extend_from_slice(replacement);
            }
            out.extend_from_slice(&lines[end..]);
        }
    }
    out
}

/// Renders content as `"{n}: {text}"` lines, the shape the intent prompt uses.
pub fn number_lines(content: &str) -> String {
    read_lines(content)
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}: {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The lines within `radius` of `line_start`, joined back into text.
///
/// Clamped to the view; a `line_start` past the end yields an empty window.
pub fn context_window(lines: &[&str], line_start: usize, radius: usize) -> String {
    let center = line_start.saturating_sub(1);
    let from = center.saturating_sub(radius).min(lines.len());
    let to = center
        .saturating_add(radius)
        .saturating_add(1)
        .min(lines.len())
        .max(from);
    join_lines(&lines[from..to])
}

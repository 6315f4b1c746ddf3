//! Rewriting report text with resolved symbols.
//!
//! A resolved frame line gets the symbol in place of its load address (or
//! symbolic target) and a `>>>> ` marker in front of its address:
//!
//! ```text
//! 1   MyApp      0x0000000104c8f1d0 0x104c8c000 + 12752
//! 1   MyApp >>>> 0x0000000104c8f1d0 main (in MyApp) (main.swift:3) + 12752
//! ```

use crate::report::parser::FrameTokens;
use crate::types::{ReportProcess, StackFrame};

/// Prefix marking a symbolicated frame.
pub const MARKER: &str = ">>>> ";

const MARKER_PADDING: &str = "     ";

/// The rewritten form of `frame`'s line with `symbol` substituted.
pub fn symbolicate_line(frame: &StackFrame, symbol: &str) -> String
{
    let line = frame.original_line();
    let Some(tokens) = FrameTokens::find(line) else {
        return symbolicate_loose_line(frame, symbol);
    };

    let before_address = &line[..tokens.address.start];
    let mut rewritten = String::with_capacity(line.len() + symbol.len() + MARKER.len());
    rewritten.push_str(before_address.strip_suffix(MARKER_PADDING).unwrap_or(before_address));
    rewritten.push_str(MARKER);
    rewritten.push_str(&line[tokens.address.start..tokens.target.start]);
    rewritten.push_str(symbol);
    rewritten.push_str(&line[tokens.target.end..]);
    rewritten
}

/// Fallback for frames whose line does not have the full frame shape.
fn symbolicate_loose_line(frame: &StackFrame, symbol: &str) -> String
{
    let address = frame.cryptic_address();
    let replaced = frame.original_line().replace(&frame.binary_image().load_address, symbol);

    let padded = format!("{MARKER_PADDING}{address}");
    if replaced.contains(&padded) {
        replaced.replacen(&padded, &format!("{MARKER}{address}"), 1)
    } else {
        replaced.replacen(address, &format!("{MARKER}{address}"), 1)
    }
}

/// One pending substitution against the original text.
#[derive(Debug)]
struct Edit
{
    start: usize,
    end: usize,
    replacement: String,
}

/// Apply every resolved frame of `processes` to `content`.
///
/// Frames are matched to whole lines of `content`, in order: the Nth frame with
/// a given line text maps to the Nth such line. Substitutions are applied in
/// increasing position, each shifted by the length change of those before it.
pub fn rewrite_content(content: &str, processes: &[ReportProcess]) -> String
{
    let mut edits = Vec::new();
    let mut cursor = 0;

    for frame in processes.iter().flat_map(|process| &process.stack_frames) {
        let line = frame.original_line();
        let Some(start) = find_line(content, line, cursor).or_else(|| find_line(content, line, 0)) else {
            tracing::debug!(line, "frame line not found in report");
            continue;
        };
        // Unresolved frames still claim their line.
        cursor = start + line.len();

        let Some(symbol) = frame.resolved_symbol() else {
            continue;
        };
        edits.push(Edit {
            start,
            end: start + line.len(),
            replacement: symbolicate_line(frame, symbol),
        });
    }

    apply_edits(content, edits)
}

#[allow(clippy::cast_possible_wrap)]
fn apply_edits(content: &str, mut edits: Vec<Edit>) -> String
{
    edits.sort_by_key(|edit| edit.start);

    let mut output = content.to_string();
    let mut delta: isize = 0;
    let mut last_end = 0;

    for edit in edits {
        if edit.start < last_end {
            continue;
        }
        let (Some(start), Some(end)) = (edit.start.checked_add_signed(delta), edit.end.checked_add_signed(delta)) else {
            continue;
        };
        output.replace_range(start..end, &edit.replacement);
        delta += edit.replacement.len() as isize - (edit.end - edit.start) as isize;
        last_end = edit.end;
    }

    output
}

/// Byte offset of the first whole-line occurrence of `line` at or after `from`.
fn find_line(content: &str, line: &str, from: usize) -> Option<usize>
{
    if line.is_empty() {
        return None;
    }

    let mut search_from = from;
    while let Some(found) = content.get(search_from..)?.find(line) {
        let start = search_from + found;
        let end = start + line.len();
        let starts_line = start == 0 || content.as_bytes()[start - 1] == b'\n';
        let ends_line = end == content.len() || content.as_bytes()[end] == b'\n';
        if starts_line && ends_line {
            return Some(start);
        }
        search_from = start + 1;
        while !content.is_char_boundary(search_from) {
            search_from += 1;
        }
    }
    None
}

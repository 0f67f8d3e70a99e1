//! Truncation Repair Engine — rebuilds a complete JSON document from output
//! cut off mid-generation.
//!
//! A token budget can stop generation mid-structure, leaving text that is a
//! prefix of valid JSON. A plain parse fails outright; the engine instead
//! finds the longest prefix that is already a complete, validly-nested value
//! and closes whatever containers are still open:
//!
//! 1. Trim to the first `{` or `[`.
//! 2. Walk the text tracking in-string state (escapes honored) and a stack of
//!    open containers.
//! 3. Each time a container closes outside a string, record a candidate:
//!    the offset just past the closer plus a snapshot of the still-open stack.
//! 4. Try candidates newest first, appending the closers for the snapshot in
//!    reverse; the first clean parse wins.
//!
//! A winning candidate is structurally valid by construction. Known
//! limitation: truncation inside a scalar that still reads as complete (a
//! cut-off number, for instance) can repair to a semantically wrong value.

use serde_json::Value;
use tracing::debug;

use super::ExtractionError;

/// A point where a container just closed, and the containers still open
/// there. Lives only for the duration of one repair.
#[derive(Debug, Clone)]
struct RepairCandidate {
    /// Byte offset just past the closing bracket.
    end: usize,
    /// Containers still open at `end`, outermost first.
    open: Vec<char>,
}

/// Rebuilds a complete JSON value from truncated model output.
pub fn repair_truncated_json(text: &str) -> Result<Value, ExtractionError> {
    let Some(start) = text.find(|c| c == '{' || c == '[') else {
        return Err(ExtractionError::NoJsonValue);
    };
    let body = &text[start..];

    let candidates = collect_candidates(body);
    debug!(
        candidates = candidates.len(),
        "scanning truncated output for repair points"
    );

    for candidate in candidates.iter().rev() {
        let mut attempt = body[..candidate.end].to_string();
        for opener in candidate.open.iter().rev() {
            attempt.push(closer_for(*opener));
        }
        if let Ok(value) = serde_json::from_str::<Value>(&attempt) {
            debug!(
                kept_bytes = candidate.end,
                closers_appended = candidate.open.len(),
                "repaired truncated output"
            );
            return Ok(value);
        }
    }

    Err(ExtractionError::Unrepairable)
}

/// First balanced `{...}` or `[...]` span in the text, honoring strings.
/// Shares the candidate scanner so extraction and repair agree on structure.
pub(super) fn first_balanced_span(text: &str) -> Option<&str> {
    let start = text.find(|c| c == '{' || c == '[')?;
    let body = &text[start..];
    collect_candidates(body)
        .into_iter()
        .find(|candidate| candidate.open.is_empty())
        .map(|candidate| &body[..candidate.end])
}

/// Walks `text` recording a candidate at every container close reached
/// outside a string. `text` must start at an opening bracket.
fn collect_candidates(text: &str) -> Vec<RepairCandidate> {
    let mut candidates = Vec::new();
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => open.push(ch),
            '}' | ']' => {
                let opener = if ch == '}' { '{' } else { '[' };
                if open.last() == Some(&opener) {
                    open.pop();
                }
                candidates.push(RepairCandidate {
                    end: idx + ch.len_utf8(),
                    open: open.clone(),
                });
            }
            _ => {}
        }
    }

    candidates
}

fn closer_for(opener: char) -> char {
    if opener == '{' {
        '}'
    } else {
        ']'
    }
}

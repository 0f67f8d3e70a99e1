//! Response Recovery — pulling structured JSON out of free-form model output.
//!
//! Extraction tries, in order: a fenced code block, the first balanced
//! `{...}`/`[...]` span, the whole text. Each stage is parse-or-fail with no
//! partial results; salvaging truncated output is the separate job of the
//! repair engine, composed in by [`recover_json`].

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

mod repair;

pub use repair::repair_truncated_json;

/// No stage of recovery produced a parseable value.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("output contains no JSON object or array")]
    NoJsonValue,

    #[error("no parseable JSON in model output")]
    Unparseable(#[source] serde_json::Error),

    #[error("truncated output could not be repaired into a complete value")]
    Unrepairable,
}

/// Extracts a JSON value from model output.
///
/// Well-formed input passes through unchanged: a text that is already valid
/// JSON parses to exactly `serde_json::from_str` of itself.
pub fn extract_json(text: &str) -> Result<Value, ExtractionError> {
    let trimmed = text.trim();

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(inner) {
            return Ok(value);
        }
        debug!("fenced block present but not parseable, trying bracket span");
    }

    if let Some(span) = repair::first_balanced_span(trimmed) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(source) => {
            if trimmed.contains(|c| c == '{' || c == '[') {
                Err(ExtractionError::Unparseable(source))
            } else {
                Err(ExtractionError::NoJsonValue)
            }
        }
    }
}

/// Extraction first, truncation repair second. The composed entry point the
/// invoker uses for structured calls.
pub fn recover_json(text: &str) -> Result<Value, ExtractionError> {
    match extract_json(text) {
        Ok(value) => Ok(value),
        Err(extract_err) => match repair_truncated_json(text) {
            Ok(value) => {
                debug!("extraction failed but truncation repair salvaged a value");
                Ok(value)
            }
            Err(_) => Err(extract_err),
        },
    }
}

/// Interior of the first ``` fence, tolerating a `json` language tag after
/// the opening backticks.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let mut body = &text[open + 3..];
    if let Some(rest) = body.strip_prefix("json") {
        body = rest;
    }
    let close = body.find("```")?;
    Some(body[..close].trim())
}

//! Invocation outcomes — what a completed call hands back.
//!
//! Exactly one variant holds at completion. Faults never escape as errors
//! from the retry loop; callers pattern-match these sum types instead.

use serde::Serialize;
use serde_json::Value;

use super::classify::ErrorKind;
use super::fallback::FallbackPayload;

/// Terminal state of one logical invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The endpoint returned a completion.
    Success { raw_text: String },
    /// Retries exhausted or cut short; a catalog payload stands in.
    FallbackUsed {
        payload: FallbackPayload,
        last_error: ErrorKind,
    },
    /// Retries exhausted or cut short and no fallback was admissible.
    Failed { last_error: ErrorKind },
}

impl InvocationOutcome {
    /// Completion text when the call genuinely succeeded.
    pub fn text(&self) -> Option<&str> {
        match self {
            InvocationOutcome::Success { raw_text } => Some(raw_text),
            _ => None,
        }
    }

    /// True when a canned payload was substituted for real output.
    pub fn is_fallback(&self) -> bool {
        matches!(self, InvocationOutcome::FallbackUsed { .. })
    }
}

/// Terminal state of one structured invocation (completion recovered into a
/// JSON value).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StructuredOutcome {
    /// A JSON value recovered from the completion.
    Structured { value: Value },
    /// Retries exhausted, or the completion was unrecoverable; a catalog
    /// payload stands in.
    FallbackUsed {
        payload: FallbackPayload,
        last_error: ErrorKind,
    },
    /// No usable output and no admissible fallback.
    Failed { last_error: ErrorKind },
}

impl StructuredOutcome {
    /// The recovered value when the call genuinely succeeded.
    pub fn value(&self) -> Option<&Value> {
        match self {
            StructuredOutcome::Structured { value } => Some(value),
            _ => None,
        }
    }

    /// True when a canned payload was substituted for real output.
    pub fn is_fallback(&self) -> bool {
        matches!(self, StructuredOutcome::FallbackUsed { .. })
    }
}

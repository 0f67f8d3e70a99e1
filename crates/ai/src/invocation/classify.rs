//! Error Classifier — maps a transport fault to an [`ErrorKind`].
//!
//! Classification is substring matching over the fault's rendered message,
//! checked in priority order, with structured hints (HTTP status, timeout
//! flags) deciding when no signal matches. The matching heuristics live here
//! and nowhere else, so they can move to structured fault codes without
//! touching the controller.

use serde::{Deserialize, Serialize};

use crate::transport::EndpointFault;

const RATE_LIMIT_SIGNALS: &[&str] = &["rate limit", "throttl", "too many requests"];
const OVERSIZE_SIGNALS: &[&str] = &[
    "token limit",
    "too large",
    "context length",
    "prompt is too long",
];
const POLICY_SIGNALS: &[&str] = &["content filter", "blocked", "safety", "access denied"];
const UNAVAILABLE_SIGNALS: &[&str] = &["service unavailable", "overloaded", "internal error"];
const TIMEOUT_SIGNALS: &[&str] = &["timeout", "timed out", "connection"];

/// Every way a classified attempt can have gone wrong.
///
/// Each kind carries fixed retry and fallback flags; the pairing is an
/// invariant of the classifier, never a runtime decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream throttling; a later retry is expected to succeed.
    RateLimited,
    /// Input exceeded a size or context limit; the same input cannot succeed.
    OversizedInput,
    /// Content refused or filtered by upstream policy.
    PolicyRejected,
    /// The upstream service is down or failing internally.
    Unavailable,
    /// Network timeout or connection failure.
    Timeout,
    /// A response arrived but could not be decoded.
    MalformedResponse,
    /// Catch-all keeping classification total.
    Unknown,
}

impl ErrorKind {
    /// Whether another attempt has a realistic chance of succeeding.
    pub const fn retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::Unavailable | ErrorKind::Timeout | ErrorKind::Unknown
        )
    }

    /// Whether a canned catalog payload is an acceptable substitute once
    /// retries are exhausted. Rate limiting is deliberately excluded:
    /// sustained throttling surfaces as a hard failure.
    pub const fn fallback_eligible(self) -> bool {
        matches!(
            self,
            ErrorKind::OversizedInput
                | ErrorKind::PolicyRejected
                | ErrorKind::MalformedResponse
                | ErrorKind::Unknown
        )
    }

    /// Stable snake_case name used in logs and fallback annotations.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::OversizedInput => "oversized_input",
            ErrorKind::PolicyRejected => "policy_rejected",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a transport fault. Total: every fault lands in exactly one
/// kind, with [`ErrorKind::Unknown`] as the catch-all.
pub fn classify(fault: &EndpointFault) -> ErrorKind {
    let message = fault.to_string().to_lowercase();

    if matches_any(&message, RATE_LIMIT_SIGNALS) {
        return ErrorKind::RateLimited;
    }
    if matches_any(&message, OVERSIZE_SIGNALS) {
        return ErrorKind::OversizedInput;
    }
    if matches_any(&message, POLICY_SIGNALS) {
        return ErrorKind::PolicyRejected;
    }
    if matches_any(&message, UNAVAILABLE_SIGNALS) {
        return ErrorKind::Unavailable;
    }
    if matches_any(&message, TIMEOUT_SIGNALS) {
        return ErrorKind::Timeout;
    }

    // No signal matched; fall back to what the fault's structure says.
    match fault {
        EndpointFault::Api { status, .. } => match *status {
            429 => ErrorKind::RateLimited,
            413 => ErrorKind::OversizedInput,
            403 => ErrorKind::PolicyRejected,
            500..=599 => ErrorKind::Unavailable,
            _ => ErrorKind::Unknown,
        },
        EndpointFault::Http(e) if e.is_timeout() || e.is_connect() => ErrorKind::Timeout,
        EndpointFault::Decode(_) | EndpointFault::EmptyCompletion => ErrorKind::MalformedResponse,
        _ => ErrorKind::Unknown,
    }
}

fn matches_any(message: &str, signals: &[&str]) -> bool {
    signals.iter().any(|signal| message.contains(signal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_fault(status: u16, message: &str) -> EndpointFault {
        EndpointFault::Api {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_throttling_signals_classify_rate_limited() {
        let messages = [
            "Rate limit exceeded, retry later",
            "ThrottlingException: request rejected",
            "Too Many Requests",
        ];
        for message in messages {
            let kind = classify(&api_fault(400, message));
            assert_eq!(kind, ErrorKind::RateLimited, "message: {message}");
            assert!(kind.retryable());
            assert!(!kind.fallback_eligible());
        }
    }

    #[test]
    fn test_oversize_signals_classify_oversized_input() {
        let messages = [
            "prompt is too long: 214891 tokens > 200000 maximum",
            "input too large for model",
            "maximum context length exceeded",
        ];
        for message in messages {
            assert_eq!(
                classify(&api_fault(400, message)),
                ErrorKind::OversizedInput,
                "message: {message}"
            );
        }
    }

    #[test]
    fn test_policy_signals_classify_policy_rejected() {
        assert_eq!(
            classify(&api_fault(400, "Output blocked by content filtering policy")),
            ErrorKind::PolicyRejected
        );
        assert_eq!(
            classify(&api_fault(401, "Access denied for this resource")),
            ErrorKind::PolicyRejected
        );
    }

    #[test]
    fn test_unavailable_signals_classify_unavailable() {
        assert_eq!(
            classify(&api_fault(529, "Overloaded")),
            ErrorKind::Unavailable
        );
        assert_eq!(
            classify(&api_fault(503, "Service Unavailable")),
            ErrorKind::Unavailable
        );
    }

    #[test]
    fn test_timeout_signals_classify_timeout() {
        assert_eq!(
            classify(&api_fault(504, "upstream request timed out")),
            ErrorKind::Timeout
        );
        assert_eq!(
            classify(&api_fault(502, "connection reset by peer")),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn test_status_decides_when_message_is_opaque() {
        assert_eq!(classify(&api_fault(429, "")), ErrorKind::RateLimited);
        assert_eq!(classify(&api_fault(413, "")), ErrorKind::OversizedInput);
        assert_eq!(classify(&api_fault(403, "Forbidden")), ErrorKind::PolicyRejected);
        assert_eq!(classify(&api_fault(500, "")), ErrorKind::Unavailable);
        assert_eq!(classify(&api_fault(418, "I'm a teapot")), ErrorKind::Unknown);
    }

    #[test]
    fn test_signal_match_outranks_status() {
        // A 500 whose body names throttling is throttling, not unavailability.
        assert_eq!(
            classify(&api_fault(500, "Rate limit exceeded")),
            ErrorKind::RateLimited
        );
    }

    #[test]
    fn test_decode_fault_is_malformed_response() {
        let decode_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let kind = classify(&EndpointFault::Decode(decode_err));
        assert_eq!(kind, ErrorKind::MalformedResponse);
        assert!(!kind.retryable());
        assert!(kind.fallback_eligible());
    }

    #[test]
    fn test_empty_completion_is_malformed_response() {
        assert_eq!(
            classify(&EndpointFault::EmptyCompletion),
            ErrorKind::MalformedResponse
        );
    }

    #[test]
    fn test_unknown_is_retryable_and_fallback_eligible() {
        let kind = classify(&api_fault(400, "something nobody anticipated"));
        assert_eq!(kind, ErrorKind::Unknown);
        assert!(kind.retryable());
        assert!(kind.fallback_eligible());
    }

    #[test]
    fn test_flag_table_is_fixed_per_kind() {
        let table = [
            (ErrorKind::RateLimited, true, false),
            (ErrorKind::OversizedInput, false, true),
            (ErrorKind::PolicyRejected, false, true),
            (ErrorKind::Unavailable, true, false),
            (ErrorKind::Timeout, true, false),
            (ErrorKind::MalformedResponse, false, true),
            (ErrorKind::Unknown, true, true),
        ];
        for (kind, retryable, fallback_eligible) in table {
            assert_eq!(kind.retryable(), retryable, "retryable for {kind}");
            assert_eq!(
                kind.fallback_eligible(),
                fallback_eligible,
                "fallback_eligible for {kind}"
            );
        }
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(ErrorKind::RateLimited).unwrap(),
            serde_json::json!("rate_limited")
        );
        assert_eq!(ErrorKind::MalformedResponse.as_str(), "malformed_response");
    }
}

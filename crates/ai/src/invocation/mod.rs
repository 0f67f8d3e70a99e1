//! Invocation Controller — drives one logical model call end to end.
//!
//! ARCHITECTURAL RULE: every feature talks to the model through
//! [`ModelInvoker`]. Nothing else in the application touches the endpoint,
//! so retry policy, fault classification, and fallback substitution stay in
//! one place.
//!
//! The shape of a call:
//!
//! ```text
//! validate -> attempt -> Success(raw_text)
//!               |
//!             fault -> classify -> retryable and attempts left?
//!               |                        |
//!               |                   backoff sleep, try again
//!               v
//!     fallback-eligible and tag in catalog?
//!        yes: FallbackUsed        no: Failed
//! ```
//!
//! Faults never escape the loop as errors. Callers receive an
//! [`InvocationOutcome`] to pattern-match; the only `Err` returns are invalid
//! input and cancellation, both of which mean no completion was possible.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::recovery;
use crate::transport::ModelEndpoint;

pub mod backoff;
pub mod classify;
pub mod fallback;
pub mod outcome;
pub mod request;

use backoff::BackoffPolicy;
use classify::{classify, ErrorKind};
use fallback::{FallbackCatalog, FallbackPayload};
use outcome::{InvocationOutcome, StructuredOutcome};
use request::{InvocationRequest, ValidationError};

/// Network attempts per logical invocation. With a 3-attempt budget the loop
/// sleeps at most twice.
pub const MAX_ATTEMPTS: u32 = 3;

/// The only hard errors an invocation can return. Everything the network or
/// the model does wrong is absorbed into an [`InvocationOutcome`] instead.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("invocation cancelled before completion")]
    Cancelled,
}

/// One iteration of the retry loop. Created per attempt and dropped after
/// classification; only the last attempt's error kind outlives the loop.
#[derive(Debug)]
struct Attempt {
    index: u32,
    started_at: Instant,
    error: Option<ErrorKind>,
}

impl Attempt {
    fn begin(index: u32) -> Self {
        Self {
            index,
            started_at: Instant::now(),
            error: None,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

/// Endpoint liveness probe result, shaped for a health route to serialize.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The resilient entry point for all model calls.
///
/// Holds the endpoint behind a trait object so tests can script faults
/// without a network, plus the fallback catalog and backoff policy injected
/// at construction. Cloning is cheap; clones share the endpoint.
#[derive(Clone)]
pub struct ModelInvoker {
    endpoint: Arc<dyn ModelEndpoint>,
    catalog: FallbackCatalog,
    backoff: BackoffPolicy,
}

impl ModelInvoker {
    pub fn new(endpoint: Arc<dyn ModelEndpoint>, catalog: FallbackCatalog) -> Self {
        Self {
            endpoint,
            catalog,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Replaces the backoff policy. Tests use this to collapse or stretch
    /// the delays.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Runs one logical invocation to completion.
    pub async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationOutcome, InvokeError> {
        self.invoke_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Runs one logical invocation, aborting promptly once `cancel` fires.
    ///
    /// The token is checked before every attempt and raced against every
    /// backoff sleep, so an abandoned caller never pays for a full retry
    /// cycle.
    pub async fn invoke_with_cancel(
        &self,
        request: InvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<InvocationOutcome, InvokeError> {
        request.validate()?;

        let mut last_error: Option<ErrorKind> = None;

        for index in 0..MAX_ATTEMPTS {
            if cancel.is_cancelled() {
                info!(attempt = index, "invocation cancelled before attempt");
                return Err(InvokeError::Cancelled);
            }

            let mut attempt = Attempt::begin(index);
            debug!(
                attempt = attempt.index,
                tag = %request.use_case_tag,
                model = self.endpoint.model_id(),
                "calling model endpoint"
            );

            match self.endpoint.generate(&request).await {
                Ok(raw_text) => {
                    info!(
                        attempt = attempt.index,
                        elapsed_ms = attempt.elapsed_ms(),
                        "model call succeeded"
                    );
                    return Ok(InvocationOutcome::Success { raw_text });
                }
                Err(fault) => {
                    let kind = classify(&fault);
                    attempt.error = Some(kind);
                    warn!(
                        attempt = attempt.index,
                        kind = kind.as_str(),
                        elapsed_ms = attempt.elapsed_ms(),
                        "model call failed: {fault}"
                    );
                    last_error = attempt.error;

                    if !kind.retryable() {
                        debug!(kind = kind.as_str(), "fault is not retryable, stopping");
                        break;
                    }
                    if index + 1 == MAX_ATTEMPTS {
                        error!(
                            attempts = MAX_ATTEMPTS,
                            kind = kind.as_str(),
                            "attempt budget exhausted"
                        );
                        break;
                    }

                    let delay = self.backoff.delay(index);
                    info!(
                        attempt = attempt.index,
                        delay_ms = delay.as_millis() as u64,
                        "backing off before retry"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            info!(attempt = attempt.index, "invocation cancelled during backoff");
                            return Err(InvokeError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        let kind = last_error.unwrap_or(ErrorKind::Unknown);
        Ok(match self.fallback_payload(&request.use_case_tag, kind) {
            Some(payload) => InvocationOutcome::FallbackUsed {
                payload,
                last_error: kind,
            },
            None => {
                error!(
                    tag = %request.use_case_tag,
                    kind = kind.as_str(),
                    "invocation failed with no admissible fallback"
                );
                InvocationOutcome::Failed { last_error: kind }
            }
        })
    }

    /// Runs one invocation and recovers the completion into a JSON value.
    pub async fn invoke_structured(
        &self,
        request: InvocationRequest,
    ) -> Result<StructuredOutcome, InvokeError> {
        self.invoke_structured_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Structured variant of [`invoke_with_cancel`](Self::invoke_with_cancel).
    ///
    /// A completion that cannot be recovered as JSON counts as
    /// [`ErrorKind::MalformedResponse`] and goes through the same fallback
    /// gate as a network fault.
    pub async fn invoke_structured_with_cancel(
        &self,
        request: InvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<StructuredOutcome, InvokeError> {
        let tag = request.use_case_tag.clone();

        Ok(match self.invoke_with_cancel(request, cancel).await? {
            InvocationOutcome::Success { raw_text } => match recovery::recover_json(&raw_text) {
                Ok(value) => StructuredOutcome::Structured { value },
                Err(err) => {
                    warn!(tag = %tag, "completion not recoverable as JSON: {err}");
                    let kind = ErrorKind::MalformedResponse;
                    match self.fallback_payload(&tag, kind) {
                        Some(payload) => StructuredOutcome::FallbackUsed {
                            payload,
                            last_error: kind,
                        },
                        None => StructuredOutcome::Failed { last_error: kind },
                    }
                }
            },
            InvocationOutcome::FallbackUsed {
                payload,
                last_error,
            } => StructuredOutcome::FallbackUsed {
                payload,
                last_error,
            },
            InvocationOutcome::Failed { last_error } => {
                StructuredOutcome::Failed { last_error }
            }
        })
    }

    /// Single unretried probe of the endpoint, for readiness checks.
    pub async fn health_check(&self) -> HealthReport {
        let mut probe = InvocationRequest::simple("Hi");
        probe.max_output_tokens = 16;

        match self.endpoint.generate(&probe).await {
            Ok(_) => HealthReport {
                status: "healthy",
                model_id: self.endpoint.model_id().to_string(),
                detail: None,
            },
            Err(fault) => {
                let kind = classify(&fault);
                warn!(kind = kind.as_str(), "health probe failed: {fault}");
                HealthReport {
                    status: "unhealthy",
                    model_id: self.endpoint.model_id().to_string(),
                    detail: Some(kind.as_str().to_string()),
                }
            }
        }
    }

    /// The fallback gate: the error kind must permit substitution AND the
    /// catalog must actually know the use case. Rate limiting never passes,
    /// so sustained throttling surfaces as a hard failure.
    fn fallback_payload(&self, tag: &str, kind: ErrorKind) -> Option<FallbackPayload> {
        if kind.fallback_eligible() && self.catalog.contains(tag) {
            warn!(
                tag = %tag,
                kind = kind.as_str(),
                "substituting catalog fallback"
            );
            Some(self.catalog.fallback_with_error(tag, kind))
        } else {
            None
        }
    }
}

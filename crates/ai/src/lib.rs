//! ascent-ai — the resilient model-invocation layer of the Ascent learning
//! platform.
//!
//! Every feature that talks to a generative model goes through this crate,
//! which owns three concerns:
//!
//! - **Resilient invocation**: fault classification, exponential backoff
//!   with jitter, and a fixed attempt budget ([`ModelInvoker`]).
//! - **Graceful degradation**: a catalog of canned per-feature payloads
//!   substituted when retries are exhausted ([`FallbackCatalog`]).
//! - **Response recovery**: pulling a JSON value out of free-form model
//!   output, including repairing documents cut off by the token budget
//!   ([`recover_json`]).
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ascent_ai::{
//!     AnthropicEndpoint, Config, FallbackCatalog, InvocationRequest, ModelInvoker,
//!     StructuredOutcome,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let endpoint = Arc::new(AnthropicEndpoint::new(&config)?);
//! let invoker = ModelInvoker::new(endpoint, FallbackCatalog::standard());
//!
//! let request = InvocationRequest::single_turn(
//!     "You are a learning coach. Respond with JSON only.",
//!     "Build an 8-week Rust roadmap for a Python developer.",
//!     "roadmap",
//! );
//!
//! match invoker.invoke_structured(request).await? {
//!     StructuredOutcome::Structured { value } => println!("{value:#}"),
//!     StructuredOutcome::FallbackUsed { payload, last_error } => {
//!         println!("degraded ({last_error}): {}", payload.body);
//!     }
//!     StructuredOutcome::Failed { last_error } => {
//!         eprintln!("no usable output: {last_error}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod invocation;
pub mod recovery;
pub mod transport;

pub use config::Config;
pub use invocation::backoff::BackoffPolicy;
pub use invocation::classify::{classify, ErrorKind};
pub use invocation::fallback::{FallbackCatalog, FallbackPayload};
pub use invocation::outcome::{InvocationOutcome, StructuredOutcome};
pub use invocation::request::{InvocationRequest, Speaker, Turn, ValidationError};
pub use invocation::{HealthReport, InvokeError, ModelInvoker, MAX_ATTEMPTS};
pub use recovery::{extract_json, recover_json, repair_truncated_json, ExtractionError};
pub use transport::{AnthropicEndpoint, EndpointFault, ModelEndpoint};

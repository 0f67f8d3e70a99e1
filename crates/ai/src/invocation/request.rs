//! Invocation requests — the conversation model and its fail-fast validation.
//!
//! Every request is validated before any network call. A violation is a
//! client error surfaced immediately; it is never retried and never reaches
//! the endpoint.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ceiling on each conversation turn, in characters.
pub const MAX_TURN_CHARS: usize = 100_000;
/// Ceiling on the role context (system instructions), in characters.
pub const MAX_ROLE_CONTEXT_CHARS: usize = 10_000;
/// Hard ceiling on the output token budget.
pub const MAX_OUTPUT_TOKENS: u32 = 4096;

const DEFAULT_TEMPERATURE: f32 = 0.7;
const SIMPLE_ROLE_CONTEXT: &str = "You are a helpful assistant.";
const SIMPLE_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Request rejected before any network call was made.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("conversation must contain at least one turn")]
    EmptyConversation,

    #[error("conversation turn {index} is blank")]
    BlankTurn { index: usize },

    #[error("conversation turn {index} is {len} characters (max 100000)")]
    TurnTooLong { index: usize, len: usize },

    #[error("role context is {len} characters (max 10000)")]
    RoleContextTooLong { len: usize },

    #[error("max_output_tokens must be between 1 and 4096, got {requested}")]
    TokenBudgetOutOfRange { requested: u32 },

    #[error("temperature must be between 0.0 and 1.0, got {requested}")]
    TemperatureOutOfRange { requested: f32 },
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Role string the messages API expects.
    pub(crate) fn wire_role(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation, oldest-first in [`InvocationRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// One logical model invocation.
///
/// Single-turn calls are a conversation of length 1; the history-aware
/// contract (mock interviews, follow-up questions) is the same struct with
/// more turns.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// System instructions framing the whole conversation. May be empty.
    pub role_context: String,
    /// Ordered turns, oldest first. Never empty once validated.
    pub conversation: Vec<Turn>,
    /// Output token budget, 1..=4096.
    pub max_output_tokens: u32,
    /// Sampling temperature, 0.0..=1.0.
    pub temperature: f32,
    /// Key into the fallback catalog ("roadmap", "interview", ...).
    pub use_case_tag: String,
}

impl InvocationRequest {
    /// A single prompt/response exchange.
    pub fn single_turn(
        role_context: impl Into<String>,
        user_text: impl Into<String>,
        use_case_tag: impl Into<String>,
    ) -> Self {
        Self::with_history(role_context, vec![Turn::user(user_text)], use_case_tag)
    }

    /// A multi-turn conversation, oldest turn first.
    pub fn with_history(
        role_context: impl Into<String>,
        conversation: Vec<Turn>,
        use_case_tag: impl Into<String>,
    ) -> Self {
        Self {
            role_context: role_context.into(),
            conversation,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            use_case_tag: use_case_tag.into(),
        }
    }

    /// A bare prompt with a generic assistant role context and a small token
    /// budget, tagged "default" for fallback purposes.
    pub fn simple(prompt: impl Into<String>) -> Self {
        Self {
            role_context: SIMPLE_ROLE_CONTEXT.to_string(),
            conversation: vec![Turn::user(prompt)],
            max_output_tokens: SIMPLE_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            use_case_tag: "default".to_string(),
        }
    }

    /// Checks every ceiling before the request is allowed near the network.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.conversation.is_empty() {
            return Err(ValidationError::EmptyConversation);
        }
        for (index, turn) in self.conversation.iter().enumerate() {
            if turn.text.trim().is_empty() {
                return Err(ValidationError::BlankTurn { index });
            }
            let len = turn.text.chars().count();
            if len > MAX_TURN_CHARS {
                return Err(ValidationError::TurnTooLong { index, len });
            }
        }
        let context_len = self.role_context.chars().count();
        if context_len > MAX_ROLE_CONTEXT_CHARS {
            return Err(ValidationError::RoleContextTooLong { len: context_len });
        }
        if self.max_output_tokens == 0 || self.max_output_tokens > MAX_OUTPUT_TOKENS {
            return Err(ValidationError::TokenBudgetOutOfRange {
                requested: self.max_output_tokens,
            });
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::TemperatureOutOfRange {
                requested: self.temperature,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> InvocationRequest {
        InvocationRequest::single_turn("You are a coach.", "Plan my week.", "roadmap")
    }

    #[test]
    fn test_single_turn_request_is_valid() {
        assert_eq!(valid_request().validate(), Ok(()));
    }

    #[test]
    fn test_empty_conversation_rejected() {
        let mut request = valid_request();
        request.conversation.clear();
        assert_eq!(request.validate(), Err(ValidationError::EmptyConversation));
    }

    #[test]
    fn test_blank_turn_rejected_with_index() {
        let request = InvocationRequest::with_history(
            "",
            vec![Turn::user("first"), Turn::assistant("   \n ")],
            "interview",
        );
        assert_eq!(
            request.validate(),
            Err(ValidationError::BlankTurn { index: 1 })
        );
    }

    #[test]
    fn test_turn_over_ceiling_rejected() {
        let mut request = valid_request();
        request.conversation[0].text = "a".repeat(MAX_TURN_CHARS + 1);
        assert_eq!(
            request.validate(),
            Err(ValidationError::TurnTooLong {
                index: 0,
                len: MAX_TURN_CHARS + 1,
            })
        );
    }

    #[test]
    fn test_turn_at_ceiling_accepted() {
        let mut request = valid_request();
        request.conversation[0].text = "a".repeat(MAX_TURN_CHARS);
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn test_role_context_over_ceiling_rejected() {
        let mut request = valid_request();
        request.role_context = "x".repeat(MAX_ROLE_CONTEXT_CHARS + 1);
        assert_eq!(
            request.validate(),
            Err(ValidationError::RoleContextTooLong {
                len: MAX_ROLE_CONTEXT_CHARS + 1,
            })
        );
    }

    #[test]
    fn test_empty_role_context_accepted() {
        let mut request = valid_request();
        request.role_context = String::new();
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn test_zero_token_budget_rejected() {
        let mut request = valid_request();
        request.max_output_tokens = 0;
        assert_eq!(
            request.validate(),
            Err(ValidationError::TokenBudgetOutOfRange { requested: 0 })
        );
    }

    #[test]
    fn test_token_budget_over_ceiling_rejected() {
        let mut request = valid_request();
        request.max_output_tokens = MAX_OUTPUT_TOKENS + 1;
        assert!(matches!(
            request.validate(),
            Err(ValidationError::TokenBudgetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let mut request = valid_request();
        request.temperature = 1.5;
        assert!(matches!(
            request.validate(),
            Err(ValidationError::TemperatureOutOfRange { .. })
        ));

        request.temperature = -0.1;
        assert!(matches!(
            request.validate(),
            Err(ValidationError::TemperatureOutOfRange { .. })
        ));
    }

    #[test]
    fn test_nan_temperature_rejected() {
        let mut request = valid_request();
        request.temperature = f32::NAN;
        assert!(matches!(
            request.validate(),
            Err(ValidationError::TemperatureOutOfRange { .. })
        ));
    }

    #[test]
    fn test_simple_request_shape() {
        let request = InvocationRequest::simple("What is a B-tree?");
        assert_eq!(request.use_case_tag, "default");
        assert_eq!(request.max_output_tokens, 1024);
        assert_eq!(request.conversation.len(), 1);
        assert_eq!(request.conversation[0].speaker, Speaker::User);
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn test_multi_turn_history_is_valid() {
        let request = InvocationRequest::with_history(
            "You are a mock interviewer.",
            vec![
                Turn::user("Ask me something about databases."),
                Turn::assistant("What is an index?"),
                Turn::user("A structure that speeds up lookups."),
            ],
            "interview",
        );
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn test_speaker_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Speaker::User).unwrap(),
            serde_json::json!("user")
        );
        assert_eq!(
            serde_json::to_value(Speaker::Assistant).unwrap(),
            serde_json::json!("assistant")
        );
    }
}

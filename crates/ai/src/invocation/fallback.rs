//! Fallback Catalog — canned payloads substituted when retries are exhausted.
//!
//! Every entry is a pre-validated skeleton of its feature's response schema
//! (or a plain spoken line for conversational features), so UI-facing callers
//! always have something renderable. The catalog is an immutable value built
//! once and injected into the invoker; lookup only, no I/O.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classify::ErrorKind;

const DEFAULT_TAG: &str = "default";

/// Served when a tag has no registered entry and the catalog itself carries
/// no "default" row.
const GENERIC_APOLOGY: &str =
    "I'm sorry, I can't process that request right now. Please try again in a few moments.";

/// Tag → canned body. JSON bodies are structurally valid skeletons of the
/// feature's response schema; plain-text bodies are spoken replies.
const STANDARD_ENTRIES: &[(&str, &str)] = &[
    (
        "roadmap",
        r#"{"title": "Learning Roadmap", "total_weeks": 8, "weeks": [], "fallback": true, "message": "We're experiencing high demand right now. Try again shortly for a personalized roadmap."}"#,
    ),
    (
        "interview",
        "I'm having trouble connecting right now. Let's keep going with a general question: tell me about a project you're proud of and the hardest problem you solved in it.",
    ),
    (
        "jd_analysis",
        r#"{"match_score": 0, "matched_skills": [], "missing_skills": [], "recommendations": ["Analysis temporarily unavailable. Please try again in a few minutes."], "fallback": true}"#,
    ),
    (
        "explanation",
        r#"{"explanation": "A detailed explanation isn't available right now. Please try again in a few moments.", "fallback": true}"#,
    ),
    (
        "skill_assessment",
        r#"{"level": "unknown", "strengths": [], "gaps": [], "suggested_focus": [], "fallback": true, "message": "Assessment temporarily unavailable."}"#,
    ),
    (
        "weekly_checkin",
        r#"{"summary": "Check-in temporarily unavailable.", "adjustments": [], "encouragement": "Keep at it! Stick with your current plan and check back soon.", "fallback": true}"#,
    ),
    (
        "resume_tips",
        r#"{"tips": [], "fallback": true, "message": "Resume tips are temporarily unavailable. Please try again later."}"#,
    ),
    (
        "resource_recommendations",
        r#"{"resources": [], "fallback": true, "message": "Recommendations are temporarily unavailable. Please try again later."}"#,
    ),
    (
        "translation",
        r#"{"translated_text": "", "fallback": true, "message": "Translation temporarily unavailable."}"#,
    ),
    ("default", GENERIC_APOLOGY),
];

/// A canned payload served in place of real model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackPayload {
    /// Tag the payload was served for.
    pub use_case: String,
    /// Payload body: a JSON document for structured features, plain text for
    /// conversational ones.
    pub body: String,
    /// Always true. Serialized so downstream consumers can skip persistence
    /// or show a degraded-mode banner.
    pub is_fallback: bool,
}

impl FallbackPayload {
    /// The body as parsed JSON, when the entry is a structured skeleton.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Lookup table from use-case tag to canned payload body.
#[derive(Debug, Clone)]
pub struct FallbackCatalog {
    entries: HashMap<String, String>,
}

impl FallbackCatalog {
    /// The standard table covering every launched AI feature.
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_ENTRIES
                .iter()
                .map(|(tag, body)| (tag.to_string(), body.to_string()))
                .collect(),
        }
    }

    /// A catalog with no entries. Every lookup degrades to the generic
    /// apology, and the invoker's fallback gate treats every tag as
    /// unregistered.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the catalog extended with (or overriding) one entry.
    pub fn with_entry(mut self, tag: impl Into<String>, body: impl Into<String>) -> Self {
        self.entries.insert(tag.into(), body.into());
        self
    }

    /// Whether a tag has a registered payload. This is the invoker's
    /// fallback gate; unregistered tags fail hard instead of degrading.
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Canned payload for a tag; the generic apology when unregistered.
    pub fn fallback_for(&self, tag: &str) -> FallbackPayload {
        let body = self
            .entries
            .get(tag)
            .or_else(|| self.entries.get(DEFAULT_TAG))
            .map(String::as_str)
            .unwrap_or(GENERIC_APOLOGY);

        FallbackPayload {
            use_case: tag.to_string(),
            body: body.to_string(),
            is_fallback: true,
        }
    }

    /// Like [`fallback_for`](Self::fallback_for), additionally annotating
    /// JSON bodies with an `error_info` object naming the classified kind.
    /// Plain-text bodies are served unchanged.
    pub fn fallback_with_error(&self, tag: &str, kind: ErrorKind) -> FallbackPayload {
        let mut payload = self.fallback_for(tag);
        if let Ok(Value::Object(mut map)) = serde_json::from_str(&payload.body) {
            map.insert(
                "error_info".to_string(),
                serde_json::json!({
                    "error_kind": kind.as_str(),
                    "retries_exhausted": true,
                }),
            );
            if let Ok(body) = serde_json::to_string(&Value::Object(map)) {
                payload.body = body;
            }
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_json_entry_parses() {
        for (tag, body) in STANDARD_ENTRIES {
            if *tag == "interview" || *tag == "default" {
                continue; // plain-text entries
            }
            let value: Value = serde_json::from_str(body)
                .unwrap_or_else(|e| panic!("entry '{tag}' is not valid JSON: {e}"));
            assert_eq!(value["fallback"], true, "entry '{tag}' missing fallback marker");
        }
    }

    #[test]
    fn test_conversational_entries_are_plain_text() {
        let catalog = FallbackCatalog::standard();
        assert!(catalog.fallback_for("interview").body_json().is_none());
        assert!(catalog.fallback_for("default").body_json().is_none());
    }

    #[test]
    fn test_roadmap_skeleton_shape() {
        let payload = FallbackCatalog::standard().fallback_for("roadmap");
        let value = payload.body_json().unwrap();
        assert_eq!(value["total_weeks"], 8);
        assert_eq!(value["weeks"], serde_json::json!([]));
        assert!(payload.is_fallback);
        assert_eq!(payload.use_case, "roadmap");
    }

    #[test]
    fn test_unregistered_tag_gets_generic_apology() {
        let catalog = FallbackCatalog::standard();
        assert!(!catalog.contains("roadmap_week"));
        let payload = catalog.fallback_for("roadmap_week");
        assert_eq!(payload.body, GENERIC_APOLOGY);
        assert_eq!(payload.use_case, "roadmap_week");
        assert!(payload.is_fallback);
    }

    #[test]
    fn test_with_entry_registers_new_tag() {
        let catalog = FallbackCatalog::standard()
            .with_entry("roadmap_week", r#"{"week": null, "fallback": true}"#);
        assert!(catalog.contains("roadmap_week"));
        let value = catalog.fallback_for("roadmap_week").body_json().unwrap();
        assert_eq!(value["fallback"], true);
    }

    #[test]
    fn test_empty_catalog_still_answers() {
        let catalog = FallbackCatalog::empty();
        assert!(!catalog.contains("roadmap"));
        assert_eq!(catalog.fallback_for("roadmap").body, GENERIC_APOLOGY);
    }

    #[test]
    fn test_error_info_injected_into_json_bodies() {
        let catalog = FallbackCatalog::standard();
        let payload = catalog.fallback_with_error("roadmap", ErrorKind::OversizedInput);
        let value = payload.body_json().unwrap();
        assert_eq!(value["error_info"]["error_kind"], "oversized_input");
        assert_eq!(value["error_info"]["retries_exhausted"], true);
        assert_eq!(value["total_weeks"], 8, "original skeleton fields preserved");
    }

    #[test]
    fn test_error_info_leaves_plain_text_untouched() {
        let catalog = FallbackCatalog::standard();
        let plain = catalog.fallback_for("interview");
        let annotated = catalog.fallback_with_error("interview", ErrorKind::Unknown);
        assert_eq!(annotated.body, plain.body);
    }

    #[test]
    fn test_standard_catalog_covers_all_launched_features() {
        let catalog = FallbackCatalog::standard();
        for tag in [
            "roadmap",
            "interview",
            "jd_analysis",
            "explanation",
            "skill_assessment",
            "weekly_checkin",
            "resume_tips",
            "resource_recommendations",
            "translation",
            "default",
        ] {
            assert!(catalog.contains(tag), "missing standard entry '{tag}'");
        }
    }
}

//! Turns whatever text the model produced into a `{message, actions}` reply.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::actions::RawAction;

pub const FALLBACK_MESSAGE: &str =
    "I apologize, but I encountered an error processing the response. Could you please try again?";

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ModelReply {
    pub message: String,
    pub actions: Vec<RawAction>,
}

impl ModelReply {
    pub fn fallback() -> Self {
        Self { message: FALLBACK_MESSAGE.to_string(), actions: Vec::new() }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let message = match object.get("message") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let actions = match object.get("actions") {
            Some(Value::Array(items)) => items.iter().map(RawAction::from_value).collect(),
            _ => Vec::new(),
        };
        Self { message, actions }
    }
}

/// Which step of the fallback chain produced the object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStrategy {
    Direct,
    Unfenced,
    Embedded,
}

impl ParseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Unfenced => "unfenced",
            Self::Embedded => "embedded",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Sanitized {
    Parsed { reply: ModelReply, strategy: ParseStrategy },
    Fallback { reply: ModelReply, reason: String },
}

impl Sanitized {
    pub fn reply(&self) -> &ModelReply {
        match self {
            Self::Parsed { reply, .. } | Self::Fallback { reply, .. } => reply,
        }
    }

    pub fn into_reply(self) -> ModelReply {
        match self {
            Self::Parsed { reply, .. } | Self::Fallback { reply, .. } => reply,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Never fails: unparseable input yields the fixed apology reply.
pub fn sanitize(raw: &str) -> Sanitized {
    match extract_json_object(raw) {
        Some((object, strategy)) => {
            Sanitized::Parsed { reply: ModelReply::from_object(&object), strategy }
        }
        None => Sanitized::Fallback {
            reply: ModelReply::fallback(),
            reason: "no JSON object found in model reply".to_string(),
        },
    }
}

/// Finds a JSON object in model output: the whole text, then the text with
/// Markdown fences removed, then the span from the first `{` to the last `}`.
pub fn extract_json_object(raw: &str) -> Option<(Map<String, Value>, ParseStrategy)> {
    if let Some(object) = parse_object(raw) {
        return Some((object, ParseStrategy::Direct));
    }

    let unfenced = strip_fences(raw);
    if let Some(object) = parse_object(&unfenced) {
        return Some((object, ParseStrategy::Unfenced));
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&unfenced[start..=end]).map(|object| (object, ParseStrategy::Embedded))
}

fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```JSON", "").replace("```", "").trim().to_string()
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize, ParseStrategy, Sanitized, FALLBACK_MESSAGE};

    #[test]
    fn plain_json_parses_directly() {
        let sanitized = sanitize(r#"{"message":"ok","actions":[]}"#);
        assert!(matches!(sanitized, Sanitized::Parsed { strategy: ParseStrategy::Direct, .. }));
        assert_eq!(sanitized.reply().message, "ok");
    }

    #[test]
    fn fenced_json_matches_plain_json() {
        let plain = sanitize(r#"{"message":"hi","actions":[{"type":"TRIP_DELETE","params":{"trip_id":"t-1"}}]}"#);
        let fenced = sanitize(
            "```json\n{\"message\":\"hi\",\"actions\":[{\"type\":\"TRIP_DELETE\",\"params\":{\"trip_id\":\"t-1\"}}]}\n```",
        );

        assert_eq!(plain.reply(), fenced.reply());
        assert!(matches!(fenced, Sanitized::Parsed { strategy: ParseStrategy::Unfenced, .. }));
    }

    #[test]
    fn prose_before_fence_is_tolerated() {
        let sanitized =
            sanitize("Sure! Here's your plan:\n```json\n{\"message\":\"ok\",\"actions\":[]}\n```");
        assert!(!sanitized.is_fallback());
        assert_eq!(sanitized.reply().message, "ok");
        assert!(sanitized.reply().actions.is_empty());
    }

    #[test]
    fn embedded_object_is_found_between_prose() {
        let sanitized = sanitize("Here you go {\"message\":\"done\"} hope that helps");
        assert!(matches!(sanitized, Sanitized::Parsed { strategy: ParseStrategy::Embedded, .. }));
        assert_eq!(sanitized.reply().message, "done");
    }

    #[test]
    fn unparseable_text_falls_back() {
        let sanitized = sanitize("I cannot help with that.");
        assert!(sanitized.is_fallback());
        assert_eq!(sanitized.reply().message, FALLBACK_MESSAGE);
        assert!(sanitized.reply().actions.is_empty());
    }

    #[test]
    fn non_object_json_and_bad_actions_are_normalized() {
        assert!(sanitize("[1, 2, 3]").is_fallback());

        let sanitized = sanitize(r#"{"message": 5, "actions": "TRIP_CREATE"}"#);
        assert_eq!(sanitized.reply().message, "5");
        assert!(sanitized.reply().actions.is_empty());
    }
}

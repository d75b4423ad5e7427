//! Receipt photo to line items, for splitting a bill.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use tripchat_core::sanitizer::extract_json_object;

use crate::llm::{InlineImage, LlmClient, LlmError};

const RECEIPT_PROMPT: &str = r#"You read restaurant receipts for a bill-splitting app.
Return only one JSON object, with no text before or after it, shaped exactly like this:

{
  "items": [
    { "id": "unique id string", "name": "item name", "quantity": number, "price": number, "assignTo": [] }
  ],
  "currency": "currency symbol",
  "taxes": number,
  "discount": number,
  "tip": 0,
  "total": number
}

Rules:
- Every numeric field is a bare JSON number rounded to two decimals, never a string.
- "price" is the per-unit price when quantity is greater than 1.
- Give each item a distinct "id". Leave "assignTo" empty and "tip" at 0.
- Combine all taxes and fees into "taxes". If they are already included in item prices, use 0.
- If no currency symbol is printed, infer it from the receipt's language ("$" for English).
- Check that items, taxes and discount add up to the total. If the total is unreadable,
  compute it from them.
- When something is unclear, use a reasonable estimate instead of leaving it out."#;

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Invalid image data")]
    InvalidImage,
    #[error("Failed to parse AI response")]
    Parse,
    #[error("AI response did not match expected format")]
    Structure,
    #[error("An error occurred while analyzing the image")]
    Upstream(#[source] LlmError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(with = "rust_decimal::serde::float", default = "one")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(rename = "assignTo", default)]
    pub assign_to: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub items: Vec<ReceiptItem>,
    #[serde(default)]
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float", default)]
    pub taxes: Decimal,
    #[serde(with = "rust_decimal::serde::float", default)]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float", default)]
    pub tip: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

fn one() -> Decimal {
    Decimal::ONE
}

pub struct ReceiptAnalyzer {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl ReceiptAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// `image` is the raw `image` field of the request body.
    pub async fn analyze(&self, image: Option<&Value>) -> Result<Receipt, ReceiptError> {
        let image = decode_image(image)?;

        let reply =
            match tokio::time::timeout(self.timeout, self.llm.complete_with_image(RECEIPT_PROMPT, &image))
                .await
            {
                Ok(Ok(reply)) => reply,
                Ok(Err(error)) => return Err(ReceiptError::Upstream(error)),
                Err(_) => return Err(ReceiptError::Upstream(LlmError::Timeout(self.timeout))),
            };

        let receipt = parse_receipt(&reply)?;
        tracing::info!(
            event_name = "receipt.analyzed",
            items = receipt.items.len(),
            total = %receipt.total,
            "receipt analyzed"
        );
        Ok(receipt)
    }
}

/// Accepts plain base64 or a `data:<mime>;base64,` URL.
fn decode_image(image: Option<&Value>) -> Result<InlineImage, ReceiptError> {
    let Some(Value::String(raw)) = image else {
        return Err(ReceiptError::InvalidImage);
    };
    let raw = raw.trim();
    let (mime_type, data) = match raw.strip_prefix("data:").and_then(|rest| rest.split_once(";base64,"))
    {
        Some((mime_type, data)) => (mime_type.to_string(), data),
        None => ("image/jpeg".to_string(), raw),
    };
    if data.is_empty() || STANDARD.decode(data).is_err() {
        return Err(ReceiptError::InvalidImage);
    }
    Ok(InlineImage { mime_type, data_base64: data.to_string() })
}

fn parse_receipt(reply: &str) -> Result<Receipt, ReceiptError> {
    let (object, _) = extract_json_object(reply).ok_or(ReceiptError::Parse)?;
    let well_formed = object.get("items").is_some_and(Value::is_array)
        && object.get("total").is_some_and(Value::is_number);
    if !well_formed {
        return Err(ReceiptError::Structure);
    }

    let mut receipt: Receipt =
        serde_json::from_value(Value::Object(object)).map_err(|_| ReceiptError::Structure)?;
    receipt.tip = Decimal::ZERO;
    for (index, item) in receipt.items.iter_mut().enumerate() {
        item.assign_to.clear();
        if item.id.trim().is_empty() {
            item.id = format!("item-{}", index + 1);
        }
    }
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use super::{ReceiptAnalyzer, ReceiptError};
    use crate::llm::ScriptedLlmClient;

    const JPEG_BASE64: &str = "/9j/4AAQSkZJRgABAQAAAQABAAD/2wBDAAEBAQ==";

    fn analyzer(client: ScriptedLlmClient) -> ReceiptAnalyzer {
        ReceiptAnalyzer::new(Arc::new(client), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn fenced_reply_is_normalized() {
        let reply = r#"```json
{"items":[{"name":"Margherita","quantity":2,"price":9.5,"assignTo":["ana"]},
          {"id":"x","name":"Water","quantity":1,"price":2}],
 "currency":"€","taxes":1.9,"discount":0,"tip":4,"total":22.9}
```"#;

        let receipt = analyzer(ScriptedLlmClient::new([reply]))
            .analyze(Some(&json!(JPEG_BASE64)))
            .await
            .expect("receipt");

        assert_eq!(receipt.tip, Decimal::ZERO);
        assert_eq!(receipt.items[0].id, "item-1");
        assert_eq!(receipt.items[1].id, "x");
        assert!(receipt.items.iter().all(|item| item.assign_to.is_empty()));

        let value = serde_json::to_value(&receipt).expect("serialize");
        assert_eq!(value["tip"], json!(0.0));
        assert!(value["items"][0]["price"].is_number());
        assert!(value["items"][0]["quantity"].is_number());
        assert_eq!(value["items"][0]["assignTo"], json!([]));
    }

    #[tokio::test]
    async fn missing_or_invalid_image_is_rejected_before_model_call() {
        let client = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()));
        let analyzer = ReceiptAnalyzer::new(client.clone(), Duration::from_secs(5));

        for image in [None, Some(json!(42)), Some(json!("")), Some(json!("not base64!!"))] {
            let error = analyzer.analyze(image.as_ref()).await.expect_err("invalid image");
            assert!(matches!(error, ReceiptError::InvalidImage));
        }
        assert!(client.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn failure_messages_distinguish_parse_structure_and_upstream() {
        let image: Value = json!(format!("data:image/png;base64,{JPEG_BASE64}"));

        let parse = analyzer(ScriptedLlmClient::new(["Sorry, I can't read this."]))
            .analyze(Some(&image))
            .await
            .expect_err("parse failure");
        let structure = analyzer(ScriptedLlmClient::new([r#"{"items":"none","total":"12"}"#]))
            .analyze(Some(&image))
            .await
            .expect_err("structure failure");
        let upstream = analyzer(ScriptedLlmClient::failing("quota exceeded"))
            .analyze(Some(&image))
            .await
            .expect_err("upstream failure");

        assert_eq!(parse.to_string(), "Failed to parse AI response");
        assert_eq!(structure.to_string(), "AI response did not match expected format");
        assert_eq!(upstream.to_string(), "An error occurred while analyzing the image");
    }
}

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

use tripchat_agent::Receipt;

use crate::app::AppState;
use crate::error::ApiError;

/// `POST /receipts/analyze` with `{image: <base64 or data URL>}`.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Receipt>, ApiError> {
    let Json(body) = payload?;
    let receipt = state.receipts.analyze(body.get("image")).await?;
    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::app::test_support::{app, json_request, send, state, state_with_replies};

    const IMAGE: &str = "/9j/4AAQSkZJRgABAQAAAQABAAD/2wBDAAEBAQ==";

    #[tokio::test]
    async fn analyzed_receipt_has_numeric_lines_and_zero_tip() {
        let state = state_with_replies([r#"Here you go:
{"items":[{"id":"1","name":"Bifana","quantity":2,"price":3.5,"assignTo":[]}],
 "currency":"€","taxes":0.5,"discount":0,"tip":2,"total":7.5}"#]);

        let (status, body) =
            send(app(state), json_request("POST", "/api/receipts/analyze", &json!({"image": IMAGE})))
                .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tip"], 0.0);
        assert_eq!(body["items"][0]["quantity"], 2.0);
        assert_eq!(body["items"][0]["price"], 3.5);
        assert_eq!(body["total"], 7.5);
    }

    #[tokio::test]
    async fn missing_image_is_a_bad_request() {
        let (status, body) =
            send(app(state()), json_request("POST", "/api/receipts/analyze", &json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid image data");
    }

    #[tokio::test]
    async fn unstructured_reply_is_an_internal_error_with_its_own_message() {
        let state = state_with_replies([r#"{"lines":[],"total":4}"#]);

        let (status, body) =
            send(app(state), json_request("POST", "/api/receipts/analyze", &json!({"image": IMAGE})))
                .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "AI response did not match expected format");
    }
}

use axum::Json;
use serde_json::Value;
use tracing::debug;

use crate::classifier::{classify, Classification};
use crate::error::{AppResult, ReplyError};

fn text_field(body: &Value, field: &str, required: bool) -> Result<String, ReplyError> {
    match body.get(field) {
        Some(Value::String(text)) => Ok(text.clone()),
        None if !required => Ok(String::new()),
        None => Err(ReplyError::InvalidInput(format!("{field} is required"))),
        Some(other) => Err(ReplyError::InvalidInput(format!(
            "{field} must be a string, got {other}"
        ))),
    }
}

/// Classifies a `{subject, content}` pair without storing anything.
pub async fn classify_text(Json(body): Json<Value>) -> AppResult<Json<Classification>> {
    let subject = text_field(&body, "subject", false)?;
    let content = text_field(&body, "content", true)?;

    let result = classify(&subject, &content);
    debug!(
        intent = %result.intent,
        confidence = result.confidence,
        needs_review = result.needs_review,
        "classified ad-hoc text"
    );
    Ok(Json(result))
}

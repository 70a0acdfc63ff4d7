mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, json_body, TestApp};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct EmailResponse {
    id: Uuid,
    case_number: String,
}

#[derive(Deserialize)]
struct DraftResponse {
    subject: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct TemplateResponse {
    id: Uuid,
    name: String,
    intent_type: String,
    is_active: bool,
}

async fn create_template(
    app: &TestApp,
    name: &str,
    intent: &str,
    body: &str,
) -> Result<TemplateResponse> {
    let response = app
        .post_json(
            "/api/templates",
            &json!({
                "name": name,
                "intent_type": intent,
                "subject_template": "[{case_number}] {original_subject}",
                "body_template": body,
            }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn newest_active_template_drives_generation() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let email: EmailResponse = json_body(
        app.post_json(
            "/api/emails",
            &json!({
                "sender": "sam@example.com",
                "subject": "Invoice",
                "content": "I'm Sam Lee and need a refund for order 4821",
            }),
        )
        .await?,
    )
    .await?;
    let generate_path = format!("/api/emails/{}/generate-draft", email.id);

    let builtin: DraftResponse = json_body(app.post_empty(&generate_path).await?).await?;
    assert!(builtin.content.starts_with("Dear Sam Lee,"));
    assert!(builtin.content.contains("order #4821"));

    create_template(&app, "billing-v1", "billing", "v1 for {customer_name}").await?;
    let newest = create_template(
        &app,
        "billing-v2",
        "Billing",
        "v2 for {customer_name} about {order_id} {unknown_token}",
    )
    .await?;
    assert_eq!(newest.intent_type, "billing");
    assert!(newest.is_active);

    let draft: DraftResponse = json_body(app.post_empty(&generate_path).await?).await?;
    assert_eq!(draft.subject, format!("[{}] Invoice", email.case_number));
    assert_eq!(draft.content, "v2 for Sam Lee about 4821 {unknown_token}");

    let deactivated: TemplateResponse = json_body(
        app.patch_json(
            &format!("/api/templates/{}", newest.id),
            &json!({ "is_active": false }),
        )
        .await?,
    )
    .await?;
    assert!(!deactivated.is_active);

    let draft: DraftResponse = json_body(app.post_empty(&generate_path).await?).await?;
    assert_eq!(draft.content, "v1 for Sam Lee");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn template_crud_validates_input() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let template = create_template(&app, "support-default", "support", "{greeting}").await?;
    assert_eq!(template.name, "support-default");

    let duplicate = app
        .post_json(
            "/api/templates",
            &json!({
                "name": "support-default",
                "intent_type": "support",
                "subject_template": "x",
                "body_template": "y",
            }),
        )
        .await?;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let bad_intent = app
        .post_json(
            "/api/templates",
            &json!({
                "name": "spam",
                "intent_type": "spam",
                "subject_template": "x",
                "body_template": "y",
            }),
        )
        .await?;
    assert_eq!(bad_intent.status(), StatusCode::BAD_REQUEST);

    let path = format!("/api/templates/{}", template.id);
    let renamed: TemplateResponse = json_body(
        app.put_json(&path, &json!({ "name": "  support-main ", "intent_type": "bug" }))
            .await?,
    )
    .await?;
    assert_eq!(renamed.name, "support-main");
    assert_eq!(renamed.intent_type, "bug");

    let listed: Vec<TemplateResponse> = json_body(app.get("/api/templates").await?).await?;
    assert_eq!(listed.len(), 1);

    let deleted = app.delete(&path).await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let missing = app.get(&path).await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

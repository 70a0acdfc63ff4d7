use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{dsl::exists, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::to_iso;
use crate::error::{AppError, AppResult};
use crate::models::{Draft, NewDraft};
use crate::schema::{drafts, emails};
use crate::state::AppState;
use crate::utils::json::{optional_bool, optional_string};

#[derive(Deserialize)]
pub struct CreateDraftRequest {
    pub email_id: Uuid,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub approved: bool,
}

#[derive(Serialize)]
pub struct DraftResponse {
    pub id: Uuid,
    pub email_id: Uuid,
    pub subject: String,
    pub content: String,
    pub approved: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Draft> for DraftResponse {
    fn from(draft: Draft) -> Self {
        Self {
            id: draft.id,
            email_id: draft.email_id,
            subject: draft.subject,
            content: draft.content,
            approved: draft.approved,
            created_at: to_iso(draft.created_at),
            updated_at: to_iso(draft.updated_at),
        }
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = drafts)]
struct UpdateDraftChangeset {
    subject: Option<String>,
    content: Option<String>,
    approved: Option<bool>,
    updated_at: NaiveDateTime,
}

pub async fn create_draft(
    State(state): State<AppState>,
    Json(payload): Json<CreateDraftRequest>,
) -> AppResult<(StatusCode, Json<DraftResponse>)> {
    let mut conn = state.db()?;

    let email_exists: bool =
        diesel::select(exists(emails::table.filter(emails::id.eq(payload.email_id))))
            .get_result(&mut conn)?;
    if !email_exists {
        return Err(AppError::bad_request("email does not exist"));
    }

    let new_draft = NewDraft {
        id: Uuid::new_v4(),
        email_id: payload.email_id,
        subject: payload.subject,
        content: payload.content,
        approved: payload.approved,
    };
    diesel::insert_into(drafts::table)
        .values(&new_draft)
        .execute(&mut conn)?;

    let draft: Draft = drafts::table.find(new_draft.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(DraftResponse::from(draft))))
}

pub async fn get_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
) -> AppResult<Json<DraftResponse>> {
    let mut conn = state.db()?;
    let draft: Draft = drafts::table.find(draft_id).first(&mut conn)?;
    Ok(Json(DraftResponse::from(draft)))
}

pub async fn update_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<DraftResponse>> {
    let subject = optional_string(&body, "subject").map_err(AppError::bad_request)?;
    let content = optional_string(&body, "content").map_err(AppError::bad_request)?;
    let approved = optional_bool(&body, "approved").map_err(AppError::bad_request)?;

    if subject.is_none() && content.is_none() && approved.is_none() {
        return Err(AppError::bad_request("no changes provided"));
    }

    let mut conn = state.db()?;
    let changeset = UpdateDraftChangeset {
        subject,
        content,
        approved,
        updated_at: Utc::now().naive_utc(),
    };
    let updated = diesel::update(drafts::table.find(draft_id))
        .set(&changeset)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(AppError::not_found());
    }

    let draft: Draft = drafts::table.find(draft_id).first(&mut conn)?;
    if let Some(approved) = approved {
        info!(draft_id = %draft.id, email_id = %draft.email_id, approved, "draft approval changed");
    }
    Ok(Json(DraftResponse::from(draft)))
}

pub async fn delete_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(drafts::table.find(draft_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

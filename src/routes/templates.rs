use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, result::DatabaseErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::to_iso;
use crate::classifier::Intent;
use crate::error::{AppError, AppResult};
use crate::models::{NewTemplate, Template};
use crate::schema::templates;
use crate::state::AppState;
use crate::utils::json::{optional_bool, optional_string};

#[derive(Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub intent_type: String,
    pub subject_template: String,
    pub body_template: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

#[derive(Serialize)]
pub struct TemplateResponse {
    pub id: Uuid,
    pub name: String,
    pub intent_type: String,
    pub subject_template: String,
    pub body_template: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Template> for TemplateResponse {
    fn from(template: Template) -> Self {
        Self {
            id: template.id,
            name: template.name,
            intent_type: template.intent_type,
            subject_template: template.subject_template,
            body_template: template.body_template,
            is_active: template.is_active,
            created_at: to_iso(template.created_at),
            updated_at: to_iso(template.updated_at),
        }
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = templates)]
struct UpdateTemplateChangeset {
    name: Option<String>,
    intent_type: Option<String>,
    subject_template: Option<String>,
    body_template: Option<String>,
    is_active: Option<bool>,
    updated_at: NaiveDateTime,
}

fn normalized_name(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

pub async fn list_templates(State(state): State<AppState>) -> AppResult<Json<Vec<TemplateResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<Template> = templates::table
        .order((templates::intent_type.asc(), templates::created_at.desc()))
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(TemplateResponse::from).collect()))
}

pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateTemplateRequest>,
) -> AppResult<(StatusCode, Json<TemplateResponse>)> {
    let name = normalized_name(&payload.name)?;
    let intent: Intent = payload.intent_type.parse()?;

    let mut conn = state.db()?;
    let new_template = NewTemplate {
        id: Uuid::new_v4(),
        name,
        intent_type: intent.to_string(),
        subject_template: payload.subject_template,
        body_template: payload.body_template,
        is_active: payload.is_active,
    };

    match diesel::insert_into(templates::table)
        .values(&new_template)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::bad_request("template name already exists"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let template: Template = templates::table.find(new_template.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(TemplateResponse::from(template))))
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> AppResult<Json<TemplateResponse>> {
    let mut conn = state.db()?;
    let template: Template = templates::table.find(template_id).first(&mut conn)?;
    Ok(Json(TemplateResponse::from(template)))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<TemplateResponse>> {
    let name = optional_string(&body, "name")
        .map_err(AppError::bad_request)?
        .map(|name| normalized_name(&name))
        .transpose()?;
    let intent_type = optional_string(&body, "intent_type")
        .map_err(AppError::bad_request)?
        .map(|value| value.parse::<Intent>().map(|intent| intent.to_string()))
        .transpose()?;
    let subject_template =
        optional_string(&body, "subject_template").map_err(AppError::bad_request)?;
    let body_template = optional_string(&body, "body_template").map_err(AppError::bad_request)?;
    let is_active = optional_bool(&body, "is_active").map_err(AppError::bad_request)?;

    let mut conn = state.db()?;
    let changeset = UpdateTemplateChangeset {
        name,
        intent_type,
        subject_template,
        body_template,
        is_active,
        updated_at: Utc::now().naive_utc(),
    };

    let updated = match diesel::update(templates::table.find(template_id))
        .set(&changeset)
        .execute(&mut conn)
    {
        Ok(count) => count,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::bad_request("template name already exists"));
        }
        Err(err) => return Err(AppError::from(err)),
    };
    if updated == 0 {
        return Err(AppError::not_found());
    }

    let template: Template = templates::table.find(template_id).first(&mut conn)?;
    Ok(Json(TemplateResponse::from(template)))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(templates::table.find(template_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

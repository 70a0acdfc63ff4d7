use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, result::DatabaseErrorKind, PgConnection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::drafts::DraftResponse;
use super::to_iso;
use crate::classifier::{classify, needs_review, Classification, Intent};
use crate::drafting::{generate_draft, new_case_number};
use crate::error::{AppError, AppResult};
use crate::import::{parse_email_csv, EmailInput};
use crate::models::{Draft, Email, NewDraft, NewEmail};
use crate::schema::{drafts, emails};
use crate::state::AppState;
use crate::templates::TemplateRepository;
use crate::utils::json::{nullable_number, nullable_string, optional_string, Nullable};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;
const MAX_FOLDER_LEN: usize = 64;
const CASE_NUMBER_ATTEMPTS: usize = 3;

#[derive(Deserialize)]
pub struct EmailListQuery {
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
    pub folder: Option<String>,
}

#[derive(Serialize)]
pub struct EmailResponse {
    pub id: Uuid,
    pub case_number: String,
    pub sender: String,
    pub subject: String,
    pub content: String,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub folder: Option<String>,
    pub needs_review: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Email> for EmailResponse {
    fn from(email: Email) -> Self {
        Self {
            id: email.id,
            case_number: email.case_number,
            sender: email.sender,
            subject: email.subject,
            content: email.content,
            intent: email.intent,
            confidence: email.confidence,
            folder: email.folder,
            needs_review: email.needs_review,
            created_at: to_iso(email.created_at),
            updated_at: to_iso(email.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct EmailDetailResponse {
    #[serde(flatten)]
    pub email: EmailResponse,
    pub drafts: Vec<DraftResponse>,
}

#[derive(Serialize)]
pub struct ImportResult {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub imported_emails: Vec<EmailResponse>,
}

#[derive(AsChangeset)]
#[diesel(table_name = emails)]
struct UpdateEmailChangeset {
    sender: Option<String>,
    subject: Option<String>,
    content: Option<String>,
    intent: Option<Option<String>>,
    confidence: Option<Option<f64>>,
    folder: Option<Option<String>>,
    needs_review: Option<bool>,
    updated_at: NaiveDateTime,
}

/// Stores a new email with a fresh case number and its classification.
pub(crate) fn insert_classified_email(
    conn: &mut PgConnection,
    input: EmailInput,
) -> AppResult<Email> {
    let input = input.validated()?;
    let classification = classify(&input.subject, &input.content);

    let mut attempt = 1;
    loop {
        let new_email = NewEmail {
            id: Uuid::new_v4(),
            case_number: new_case_number(),
            sender: input.sender.clone(),
            subject: input.subject.clone(),
            content: input.content.clone(),
            intent: Some(classification.intent.to_string()),
            confidence: Some(classification.confidence),
            folder: Some(classification.intent.to_string()),
            needs_review: classification.needs_review,
        };

        match diesel::insert_into(emails::table)
            .values(&new_email)
            .execute(conn)
        {
            Ok(_) => {
                let email: Email = emails::table.find(new_email.id).first(conn)?;
                return Ok(email);
            }
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
                if attempt < CASE_NUMBER_ATTEMPTS =>
            {
                warn!(case_number = %new_email.case_number, attempt, "case number collision, retrying");
                attempt += 1;
            }
            Err(err) => return Err(AppError::from(err)),
        }
    }
}

/// Overwrites intent, confidence, folder and review flag. The case number is untouched.
fn apply_classification(
    conn: &mut PgConnection,
    email_id: Uuid,
    classification: &Classification,
) -> AppResult<Email> {
    let intent = classification.intent.as_str();
    diesel::update(emails::table.find(email_id))
        .set((
            emails::intent.eq(Some(intent)),
            emails::confidence.eq(Some(classification.confidence)),
            emails::folder.eq(Some(intent)),
            emails::needs_review.eq(classification.needs_review),
            emails::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    Ok(emails::table.find(email_id).first(conn)?)
}

pub async fn list_emails(
    State(state): State<AppState>,
    Query(params): Query<EmailListQuery>,
) -> AppResult<Json<Vec<EmailResponse>>> {
    if params.skip < 0 {
        return Err(AppError::bad_request("skip must not be negative"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let mut conn = state.db()?;
    let mut query = emails::table.into_boxed();
    if let Some(folder) = params
        .folder
        .as_deref()
        .map(str::trim)
        .filter(|folder| !folder.is_empty())
    {
        query = query.filter(emails::folder.eq(folder.to_string()));
    }

    let rows: Vec<Email> = query
        .order((emails::created_at.desc(), emails::id.desc()))
        .offset(params.skip)
        .limit(limit)
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(EmailResponse::from).collect()))
}

pub async fn create_email(
    State(state): State<AppState>,
    Json(payload): Json<EmailInput>,
) -> AppResult<(StatusCode, Json<EmailResponse>)> {
    let mut conn = state.db()?;
    let email = insert_classified_email(&mut conn, payload)?;

    info!(
        email_id = %email.id,
        case_number = %email.case_number,
        intent = email.intent.as_deref().unwrap_or_default(),
        confidence = email.confidence.unwrap_or_default(),
        needs_review = email.needs_review,
        "email created"
    );

    Ok((StatusCode::CREATED, Json(EmailResponse::from(email))))
}

pub async fn get_email(
    State(state): State<AppState>,
    Path(email_id): Path<Uuid>,
) -> AppResult<Json<EmailDetailResponse>> {
    let mut conn = state.db()?;

    let email: Email = emails::table.find(email_id).first(&mut conn)?;
    let drafts: Vec<Draft> = Draft::belonging_to(&email)
        .order((drafts::created_at.asc(), drafts::id.asc()))
        .load(&mut conn)?;

    Ok(Json(EmailDetailResponse {
        email: EmailResponse::from(email),
        drafts: drafts.into_iter().map(DraftResponse::from).collect(),
    }))
}

pub async fn update_email(
    State(state): State<AppState>,
    Path(email_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<EmailResponse>> {
    if body.get("case_number").is_some() {
        return Err(AppError::bad_request("case_number cannot be changed"));
    }
    if body.get("needs_review").is_some() {
        return Err(AppError::bad_request(
            "needs_review is derived from confidence",
        ));
    }

    let sender = match optional_string(&body, "sender").map_err(AppError::bad_request)? {
        Some(sender) => {
            let trimmed = sender.trim();
            if trimmed.is_empty() {
                return Err(AppError::bad_request("sender must not be empty"));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };
    let subject = optional_string(&body, "subject").map_err(AppError::bad_request)?;
    let content = optional_string(&body, "content").map_err(AppError::bad_request)?;

    let intent = match nullable_string(body.get("intent")).map_err(AppError::bad_request)? {
        Nullable::Omitted => None,
        Nullable::Null => Some(None),
        Nullable::Value(value) => Some(Some(value.parse::<Intent>()?.to_string())),
    };

    let (confidence, review) =
        match nullable_number(body.get("confidence")).map_err(AppError::bad_request)? {
            Nullable::Omitted => (None, None),
            Nullable::Null => (Some(None), Some(false)),
            Nullable::Value(value) => {
                if !(0.0..=1.0).contains(&value) {
                    return Err(AppError::bad_request(
                        "confidence must be between 0 and 1",
                    ));
                }
                (Some(Some(value)), Some(needs_review(value)))
            }
        };

    let folder = match nullable_string(body.get("folder")).map_err(AppError::bad_request)? {
        Nullable::Omitted => intent.clone(),
        Nullable::Null => Some(None),
        Nullable::Value(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(AppError::bad_request("folder must not be empty"));
            }
            if trimmed.chars().count() > MAX_FOLDER_LEN {
                return Err(AppError::bad_request(format!(
                    "folder must be at most {MAX_FOLDER_LEN} characters"
                )));
            }
            Some(Some(trimmed.to_string()))
        }
    };

    let changeset = UpdateEmailChangeset {
        sender,
        subject,
        content,
        intent,
        confidence,
        folder,
        needs_review: review,
        updated_at: Utc::now().naive_utc(),
    };

    let mut conn = state.db()?;
    let updated = diesel::update(emails::table.find(email_id))
        .set(&changeset)
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(AppError::not_found());
    }

    let email: Email = emails::table.find(email_id).first(&mut conn)?;
    Ok(Json(EmailResponse::from(email)))
}

pub async fn delete_email(
    State(state): State<AppState>,
    Path(email_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(emails::table.find(email_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }
    info!(email_id = %email_id, "email deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn classify_email(
    State(state): State<AppState>,
    Path(email_id): Path<Uuid>,
) -> AppResult<Json<EmailResponse>> {
    let mut conn = state.db()?;
    let email: Email = emails::table.find(email_id).first(&mut conn)?;

    let classification = classify(&email.subject, &email.content);
    let email = apply_classification(&mut conn, email.id, &classification)?;

    info!(
        email_id = %email.id,
        intent = %classification.intent,
        confidence = classification.confidence,
        needs_review = classification.needs_review,
        "email classified"
    );

    Ok(Json(EmailResponse::from(email)))
}

pub async fn generate_email_draft(
    State(state): State<AppState>,
    Path(email_id): Path<Uuid>,
) -> AppResult<Json<DraftResponse>> {
    let mut conn = state.db()?;
    let mut email: Email = emails::table.find(email_id).first(&mut conn)?;

    if email.intent.is_none() {
        let classification = classify(&email.subject, &email.content);
        email = apply_classification(&mut conn, email.id, &classification)?;
    }

    let result = generate_draft(&email, &mut TemplateRepository::new(&mut conn));

    let new_draft = NewDraft {
        id: Uuid::new_v4(),
        email_id: email.id,
        subject: result.subject,
        content: result.content,
        approved: false,
    };
    diesel::insert_into(drafts::table)
        .values(&new_draft)
        .execute(&mut conn)?;
    let draft: Draft = drafts::table.find(new_draft.id).first(&mut conn)?;

    info!(
        email_id = %email.id,
        draft_id = %draft.id,
        case_number = %result.case_number,
        intent = %result.intent,
        template_id = ?result.template_id,
        "draft generated"
    );

    Ok(Json(DraftResponse::from(draft)))
}

pub async fn import_emails(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ImportResult>> {
    let mut csv_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_ascii_lowercase();
        if !file_name.ends_with(".csv") {
            return Err(AppError::bad_request("File must be a CSV"));
        }
        let data = field.bytes().await.map_err(|err| {
            error!(error = %err, "failed to read csv upload");
            AppError::bad_request(format!("failed to read file bytes: {err}"))
        })?;
        csv_bytes = Some(data.to_vec());
    }

    let csv_bytes = csv_bytes.ok_or_else(|| AppError::bad_request("file field is required"))?;
    let csv_text = String::from_utf8(csv_bytes)
        .map_err(|_| AppError::bad_request("Import failed: file must be UTF-8 encoded"))?;

    let batch = parse_email_csv(&csv_text);
    let mut errors = batch.errors;
    let mut imported_emails = Vec::with_capacity(batch.rows.len());

    let mut conn = state.db()?;
    for row in batch.rows {
        match insert_classified_email(&mut conn, row.input) {
            Ok(email) => imported_emails.push(EmailResponse::from(email)),
            Err(err) => {
                warn!(line = row.line, error = %err.message(), "csv row import failed");
                errors.push(format!("Row {}: {}", row.line, err.message()));
            }
        }
    }

    info!(
        imported = imported_emails.len(),
        failed = errors.len(),
        "csv import finished"
    );

    Ok(Json(ImportResult {
        success: imported_emails.len(),
        failed: errors.len(),
        errors,
        imported_emails,
    }))
}

use std::time::Instant;

use axum::http::HeaderValue;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

pub mod classify;
pub mod drafts;
pub mod emails;
pub mod health;
pub mod templates;

pub const PROCESS_TIME_HEADER: &str = "x-process-time";

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let emails_routes = Router::new()
        .route("/", get(emails::list_emails).post(emails::create_email))
        .route("/import", post(emails::import_emails))
        .route(
            "/:id",
            get(emails::get_email)
                .put(emails::update_email)
                .patch(emails::update_email)
                .delete(emails::delete_email),
        )
        .route("/:id/classify", post(emails::classify_email))
        .route("/:id/generate-draft", post(emails::generate_email_draft));

    let drafts_routes = Router::new()
        .route("/", post(drafts::create_draft))
        .route(
            "/:id",
            get(drafts::get_draft)
                .put(drafts::update_draft)
                .patch(drafts::update_draft)
                .delete(drafts::delete_draft),
        );

    let templates_routes = Router::new()
        .route(
            "/",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/:id",
            get(templates::get_template)
                .put(templates::update_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        );

    let timing_state = state.clone();

    Router::new()
        .nest("/api/emails", emails_routes)
        .nest("/api/drafts", drafts_routes)
        .nest("/api/templates", templates_routes)
        .route("/api/classify", post(classify::classify_text))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(middleware::from_fn_with_state(timing_state, track_process_time))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 16))
}

/// Stamps every response with its handling time and flags slow requests.
async fn track_process_time(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(request).await;

    let elapsed = started.elapsed();
    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed.as_secs_f64())) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }
    if elapsed > state.config.slow_request_threshold {
        warn!(
            %method,
            %path,
            elapsed_ms = elapsed.as_millis() as u64,
            threshold_ms = state.config.slow_request_threshold.as_millis() as u64,
            "request exceeded latency budget"
        );
    }

    response
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

//! Axum HTTP server for the activity pages.
//!
//! Handlers are thin: they parse the request, run one [`ActivityService`]
//! call on the blocking pool, and shape the JSON envelope.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/controls` | Submit or update a student |
//! | PATCH | `/api/controls` | Record a critique in the next free slot |
//! | GET | `/api/controls` | Session or single student |
//! | DELETE | `/api/controls` | Delete one session or all (needs `confirm=true`) |
//! | GET | `/api/controls/:session_id` | Session with analytics, or single student |
//! | GET | `/api/getSessionTimerStatus` | Countdown status |
//! | DELETE | `/api/getSessionTimerStatus` | Reset the countdown |
//! | POST | `/api/saveRandomizationIdeas` | Append ideas and start the countdown |
//! | GET | `/api/peerResponse` | Pick a peer answer to review |
//! | GET | `/api/results` | Dashboard chart and rows |

mod error;

pub use error::ApiError;

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::activity::{CompromiseOption, ReviewRequest, Session, StudentSubmission};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::service::ActivityService;
use error::{json_rejection, query_rejection};

pub type AppState = Arc<ActivityService>;

type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn create_router(service: AppState, server: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/health", get(handle_health_check))
        .route(
            "/api/controls",
            post(handle_submit)
                .patch(handle_record_explanation)
                .get(handle_get_controls)
                .delete(handle_delete_sessions),
        )
        .route("/api/controls/:session_id", get(handle_get_session_detail))
        .route(
            "/api/getSessionTimerStatus",
            get(handle_timer_status).delete(handle_timer_reset),
        )
        .route("/api/saveRandomizationIdeas", post(handle_save_ideas))
        .route("/api/peerResponse", get(handle_peer_response))
        .route("/api/results", get(handle_results))
        .layer(TraceLayer::new_for_http());

    let router = if server.cors_allow_any {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    };

    router.with_state(service)
}

/// Run a service call on the blocking pool
async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&ActivityService) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(state);
    let out = tokio::task::spawn_blocking(move || f(&service)).await?;
    Ok(out?)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ── Request types ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExplanationBody {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    limit_explanation: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ControlsQuery {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    student_id: Option<String>,
}

#[derive(Deserialize)]
struct StudentQuery {
    #[serde(default, rename = "studentId")]
    student_id: Option<String>,
}

#[derive(Deserialize)]
struct DeleteQuery {
    #[serde(default, rename = "sessionID", alias = "sessionId")]
    session_id: Option<String>,
    #[serde(default)]
    confirm: Option<String>,
}

#[derive(Deserialize)]
struct TimerQuery {
    #[serde(default, rename = "sessionID", alias = "sessionId")]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct IdeasBody {
    #[serde(default)]
    ideas: Option<Value>,
    #[serde(default, rename = "sessionID", alias = "sessionId")]
    session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeerQuery {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    option: Option<String>,
    #[serde(default)]
    custom_option: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultsQuery {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    option: Option<String>,
}

/// Blank means "no filter"; `all` is accepted for the dashboard's all tab
fn parse_option(raw: Option<&str>) -> Result<Option<CompromiseOption>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => Ok(Some(s.parse()?)),
    }
}

// ── Response shaping ────────────────────────────────────────────────

fn session_body(session: &Session) -> Value {
    json!({
        "sessionId": session.session_id,
        "sessionType": session.session_type,
        "totalStudents": session.students.len(),
        "students": session.students,
        "createdAt": session.created_at,
        "updatedAt": session.updated_at,
    })
}

fn student_body(session: &Session, student_id: &str) -> ApiResult<Value> {
    let student = session.student(student_id).ok_or_else(|| {
        crate::error::LimitlabError::NotFound(format!("Student '{student_id}' not found in session"))
    })?;

    Ok(json!({
        "message": "Student data retrieved successfully",
        "data": {
            "sessionId": session.session_id,
            "sessionType": session.session_type,
            "student": student,
            "sessionStats": {
                "totalStudents": session.students.len(),
                "createdAt": session.created_at,
                "updatedAt": session.updated_at,
            },
        },
    }))
}

// ── Handlers ────────────────────────────────────────────────────────

async fn handle_health_check() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

async fn handle_submit(
    State(state): State<AppState>,
    payload: std::result::Result<Json<StudentSubmission>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(submission) = payload.map_err(json_rejection)?;
    let outcome = blocking(&state, move |svc| svc.submit(submission)).await?;

    Ok(Json(json!({
        "message": format!("Student data {} successfully", outcome.action),
        "updatedFields": outcome.updated_fields,
        "data": {
            "sessionId": outcome.session_id,
            "studentId": outcome.student.student_id,
            "student": outcome.student,
            "action": outcome.action,
            "updatedAt": outcome.updated_at,
        },
    })))
}

async fn handle_record_explanation(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ExplanationBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload.map_err(json_rejection)?;
    let session_id = body.session_id.clone();
    let outcome = blocking(&state, move |svc| {
        svc.record_limit_explanation(
            body.session_id.as_deref(),
            body.student_id.as_deref(),
            body.limit_explanation.as_deref(),
        )
    })
    .await?;

    Ok(Json(json!({
        "message": format!(
            "Limit explanation updated successfully in field: {}",
            outcome.slot.field
        ),
        "data": {
            "sessionId": session_id,
            "studentId": outcome.student.student_id,
            "fieldUpdated": outcome.slot.field,
            "explanationNumber": outcome.slot.number,
            "student": outcome.student,
            "updatedAt": outcome.updated_at,
        },
    })))
}

async fn handle_get_controls(
    State(state): State<AppState>,
    query: std::result::Result<Query<ControlsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(query_rejection)?;
    let session_id = non_blank(query.session_id)
        .ok_or_else(|| ApiError::bad_request("sessionId query parameter is required"))?;

    let session = blocking(&state, move |svc| svc.get_session(&session_id)).await?;

    if let Some(student_id) = non_blank(query.student_id) {
        return Ok(Json(student_body(&session, &student_id)?));
    }

    Ok(Json(json!({
        "message": "Session retrieved successfully",
        "data": session_body(&session),
    })))
}

async fn handle_get_session_detail(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    query: std::result::Result<Query<StudentQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(query_rejection)?;
    let session = blocking(&state, move |svc| svc.get_session(&session_id)).await?;

    if let Some(student_id) = non_blank(query.student_id) {
        return Ok(Json(student_body(&session, &student_id)?));
    }

    let mut data = session_body(&session);
    data["analytics"] = serde_json::to_value(session.analytics())?;

    Ok(Json(json!({
        "message": "Session retrieved successfully",
        "data": data,
    })))
}

async fn handle_delete_sessions(
    State(state): State<AppState>,
    query: std::result::Result<Query<DeleteQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(query_rejection)?;
    let confirm = query.confirm.as_deref() == Some("true");
    let outcome = blocking(&state, move |svc| {
        svc.delete(query.session_id.as_deref(), confirm)
    })
    .await?;

    let mut data = json!({
        "deletedCount": outcome.summary.deleted_count,
        "totalStudentsDeleted": outcome.summary.total_students_deleted,
    });
    if let Some(id) = &outcome.session_id {
        data["sessionId"] = json!(id);
    }
    if outcome.summary.deleted_count > 0 {
        data["operationTimestamp"] = json!(Utc::now());
    }

    Ok(Json(json!({
        "message": outcome.message,
        "data": data,
    })))
}

async fn handle_timer_status(
    State(state): State<AppState>,
    query: std::result::Result<Query<TimerQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(query_rejection)?;
    let session_id = non_blank(query.session_id)
        .ok_or_else(|| ApiError::bad_request("Missing sessionID parameter."))?;

    let status = blocking(&state, move |svc| svc.timer_status(&session_id)).await?;
    Ok(Json(serde_json::to_value(status)?))
}

async fn handle_timer_reset(
    State(state): State<AppState>,
    query: std::result::Result<Query<TimerQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(query_rejection)?;
    let session_id = non_blank(query.session_id)
        .ok_or_else(|| ApiError::bad_request("Missing sessionID parameter."))?;

    let timer = blocking(&state, move |svc| svc.reset_timer(&session_id)).await?;

    Ok(Json(json!({
        "message": "Timer reset successfully.",
        "sessionID": timer.session_id,
        "isActive": false,
        "startTime": Value::Null,
        "durationSeconds": timer.timer_duration_seconds,
    })))
}

async fn handle_save_ideas(
    State(state): State<AppState>,
    payload: std::result::Result<Json<IdeasBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload.map_err(json_rejection)?;
    let outcome = blocking(&state, move |svc| {
        svc.save_ideas(body.session_id.as_deref(), body.ideas.as_ref())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Randomization ideas saved successfully.",
            "timerStarted": outcome.timer.started,
            "timerStartTime": outcome.timer.timer.timer_start_time,
        })),
    ))
}

async fn handle_peer_response(
    State(state): State<AppState>,
    query: std::result::Result<Query<PeerQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(query_rejection)?;
    let (Some(session_id), Some(student_id)) =
        (non_blank(query.session_id), non_blank(query.student_id))
    else {
        return Err(ApiError::bad_request(
            "sessionId and studentId query parameters are required",
        ));
    };

    let request = ReviewRequest {
        student_id,
        option: parse_option(query.option.as_deref())?,
        custom_option: non_blank(query.custom_option),
        explanation: non_blank(query.explanation),
    };

    let selection = blocking(&state, move |svc| svc.peer_response(&session_id, &request)).await?;

    Ok(Json(json!({
        "message": "Peer response selected",
        "data": selection,
    })))
}

async fn handle_results(
    State(state): State<AppState>,
    query: std::result::Result<Query<ResultsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(query_rejection)?;
    let session_id = non_blank(query.session_id)
        .ok_or_else(|| ApiError::bad_request("sessionId query parameter is required"))?;
    let option = parse_option(query.option.as_deref())?;

    let view = blocking(&state, move |svc| svc.results(&session_id, option)).await?;

    Ok(Json(json!({
        "message": "Results retrieved successfully",
        "data": view,
    })))
}

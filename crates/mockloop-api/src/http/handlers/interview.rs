//! Interview lifecycle and query HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/interviews                  - Start an interview
//! - GET  /api/v1/interviews?user_id=N        - List a user's interviews
//! - GET  /api/v1/interviews/{id}             - Interview summary
//! - GET  /api/v1/interviews/{id}/questions   - Transcript plus summary record
//! - POST /api/v1/interviews/{id}/end         - Score and end
//! - GET  /api/v1/users/{id}/sessions         - Interview ids in the session cache

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use mockloop_types::interview::{
    FinalAssessment, InterviewListing, InterviewSummary, StartInterviewRequest, StartedInterview,
};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<i64>,
}

/// POST /api/v1/interviews - Start an interview and ask its first question.
pub async fn start_interview(
    State(state): State<AppState>,
    Json(body): Json<StartInterviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StartedInterview>>), AppError> {
    let start = Instant::now();
    let started = state.interview_service.start_interview(body).await?;

    let id = started.interview_id;
    let resp = ApiResponse::success(started, start)
        .with_link("self", &format!("/api/v1/interviews/{id}"))
        .with_link("turns", &format!("/api/v1/interviews/{id}/turns"));

    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/interviews?user_id=N - A user's interviews, newest first.
pub async fn list_interviews(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<InterviewListing>>>, AppError> {
    let start = Instant::now();
    let user_id = query
        .user_id
        .ok_or_else(|| AppError::Validation("user_id query parameter is required".to_string()))?;

    let interviews = state.interview_service.list_interviews(user_id).await?;
    Ok(Json(ApiResponse::success(interviews, start)))
}

/// GET /api/v1/interviews/{id}
pub async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<InterviewSummary>>, AppError> {
    let start = Instant::now();
    let summary = state.interview_service.get_interview(id).await?;

    let resp = ApiResponse::success(summary, start)
        .with_link("self", &format!("/api/v1/interviews/{id}"))
        .with_link("questions", &format!("/api/v1/interviews/{id}/questions"));
    Ok(Json(resp))
}

/// GET /api/v1/interviews/{id}/questions
///
/// The data array holds one record per question in order, then a trailing
/// `{interview_id, final_score, feedback}` record.
pub async fn get_interview_questions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let transcript = state.interview_service.get_interview_questions(id).await?;

    let resp = ApiResponse::success(transcript.items(), start)
        .with_link("interview", &format!("/api/v1/interviews/{id}"));
    Ok(Json(resp).into_response())
}

/// POST /api/v1/interviews/{id}/end - Score the interview and mark it ended.
pub async fn end_interview(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FinalAssessment>>, AppError> {
    let start = Instant::now();
    let assessment = state.interview_service.end_interview(id).await?;

    let resp = ApiResponse::success(assessment, start)
        .with_link("interview", &format!("/api/v1/interviews/{id}"));
    Ok(Json(resp))
}

/// GET /api/v1/users/{id}/sessions - Interview ids resumable from the cache.
pub async fn cached_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Json<ApiResponse<Vec<i64>>> {
    let start = Instant::now();
    let ids = state.interview_service.cached_sessions(user_id).await;
    Json(ApiResponse::success(ids, start))
}

// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{attempt::SaveAnswerRequest, user::CurrentUser},
    state::AppState,
};

/// Starts a new attempt on a quiz.
///
/// * Quiz must be open and inside its time window.
/// * The caller must have attempts left and no attempt in progress.
pub async fn start_attempt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = state.attempts.start(&user, quiz_id).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Returns `{"attempt": null}` when the caller has no attempt in progress.
pub async fn get_active_attempt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let active = state.attempts.active(&user, quiz_id).await?;
    Ok(Json(active))
}

pub async fn list_my_attempts(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let history = state.attempts.history(&user, quiz_id).await?;
    Ok(Json(history))
}

pub async fn get_attempt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.attempts.detail(&user, attempt_id).await?;
    Ok(Json(detail))
}

/// Autosaves the answer to one question.
pub async fn save_answer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let draft = state.autosave.save(&user, attempt_id, payload).await?;
    Ok(Json(draft))
}

/// Finalizes the attempt and returns its result.
pub async fn submit_attempt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.grader.submit(&user, attempt_id).await?;
    Ok(Json(result))
}

pub async fn get_attempt_result(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.results.result(&user, attempt_id).await?;
    Ok(Json(view))
}

// src/handlers/quiz.rs

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        question::ImportQuestionsRequest,
        quiz::{CreateQuizRequest, QuizListParams, UpdateQuizRequest},
        user::CurrentUser,
    },
    state::AppState,
    utils::import::parse_csv,
};

/// Lists the quizzes of a meeting.
/// Supports `is_open`, `quiz_type` and `search` filters.
pub async fn list_meeting_quizzes(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(meeting_id): Path<i64>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = state.catalog.list_by_meeting(&user, meeting_id, &params).await?;
    Ok(Json(quizzes))
}

/// Creates quiz metadata.
/// Admin or owning teacher only.
pub async fn create_quiz(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.catalog.create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.catalog.get(&user, id).await?;
    Ok(Json(quiz))
}

/// Returns the quiz with its questions. Answer keys are only included for staff.
pub async fn get_quiz_questions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.catalog.get_with_questions(&user, id).await?;
    Ok(Json(quiz))
}

pub async fn update_quiz(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.catalog.update(&user, id, payload).await?;
    Ok(Json(quiz))
}

pub async fn delete_quiz(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bulk-imports questions.
///
/// * `text/csv` bodies are read as CSV records; quoted cells may span lines.
/// * Anything else must be JSON: `{"rows": [["question", "opt A", "opt B", "A"], ...]}`.
pub async fn import_questions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let is_csv = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/csv"));

    let rows = if is_csv {
        let text = std::str::from_utf8(&body)
            .map_err(|_| AppError::BadRequest("CSV body must be UTF-8".to_string()))?;
        parse_csv(text)
    } else {
        serde_json::from_slice::<ImportQuestionsRequest>(&body)?.rows
    };

    let summary = state.catalog.import_questions(&user, id, &rows).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

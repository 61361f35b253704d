// src/services/viewer.rs

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        attempt::ResultView,
        user::{CurrentUser, Role},
    },
    repositories::{AttemptRepository, QuizRepository},
    services::access::AccessGuard,
};

/// Read-only access to finalized results.
pub struct ResultViewer {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
    guard: Arc<AccessGuard>,
}

impl ResultViewer {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
        guard: Arc<AccessGuard>,
    ) -> Self {
        Self {
            quizzes,
            attempts,
            guard,
        }
    }

    /// Staff skip the ownership check but never the access check.
    pub async fn result(&self, user: &CurrentUser, attempt_id: i64) -> AppResult<ResultView> {
        let not_found = || AppError::NotFound(format!("No result for attempt {}", attempt_id));

        let result = self.attempts.find_result(attempt_id).await?.ok_or_else(not_found)?;
        let attempt = self.attempts.find_by_id(attempt_id).await?.ok_or_else(not_found)?;
        let quiz = self
            .quizzes
            .find_by_id(result.quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", result.quiz_id)))?;

        self.guard.ensure_access(user, quiz.meeting_id).await?;

        if user.role == Role::Student && result.user_id != user.id {
            return Err(AppError::Forbidden("result belongs to another user".to_string()));
        }

        Ok(ResultView {
            result,
            attempt,
            quiz,
        })
    }
}

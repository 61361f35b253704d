// src/services/autosave.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        attempt::{QuizTempSubmission, SaveAnswerRequest},
        user::CurrentUser,
    },
    repositories::{AttemptRepository, QuizRepository},
    services::attempt::{AttemptManager, ensure_student},
};

/// Draft answers for active attempts. Last write wins per (attempt, question).
pub struct AutosaveStore {
    manager: Arc<AttemptManager>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AutosaveStore {
    pub fn new(
        manager: Arc<AttemptManager>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            manager,
            quizzes,
            attempts,
        }
    }

    pub async fn save(
        &self,
        user: &CurrentUser,
        attempt_id: i64,
        req: SaveAnswerRequest,
    ) -> AppResult<QuizTempSubmission> {
        ensure_student(user)?;
        let (attempt, quiz) = self.manager.load_owned(user, attempt_id).await?;

        if !attempt.is_active() {
            return Err(AppError::Conflict("attempt already submitted".to_string()));
        }

        let question = self
            .quizzes
            .find_question(req.question_id)
            .await?
            .filter(|q| q.quiz_id == quiz.id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Question {} not found in quiz {}", req.question_id, quiz.id))
            })?;

        let option = self
            .quizzes
            .find_option(req.selected_option_id)
            .await?
            .filter(|o| o.question_id == question.id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Option {} not found for question {}",
                    req.selected_option_id, question.id
                ))
            })?;

        let draft = self
            .attempts
            .save_draft(attempt.id, question.id, option.id, Utc::now())
            .await?;

        if draft.version > 1 {
            tracing::debug!(
                "Attempt {} question {} overwritten (version {})",
                attempt.id,
                question.id,
                draft.version
            );
        }

        Ok(draft)
    }
}

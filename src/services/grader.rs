// src/services/grader.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        attempt::{QuizResult, QuizTempSubmission, ScoredAnswer, Scorecard},
        user::CurrentUser,
    },
    repositories::{AnswerKey, AttemptRepository},
    services::attempt::{AttemptManager, ensure_student},
};

/// Grades drafts: 1 point when the selected option is correct, else 0.
/// Options missing from the key score 0.
///
/// `score_percent` is truncated, not rounded: 2 of 3 correct is 66.
pub fn score_drafts(drafts: &[QuizTempSubmission], answer_key: &AnswerKey) -> Scorecard {
    let answers: Vec<ScoredAnswer> = drafts
        .iter()
        .map(|d| ScoredAnswer {
            question_id: d.question_id,
            selected_option_id: d.selected_option_id,
            score: i16::from(answer_key.get(&d.selected_option_id).copied().unwrap_or(false)),
        })
        .collect();

    let total_questions = answers.len() as i32;
    let correct_answers = answers.iter().map(|a| i32::from(a.score)).sum::<i32>();
    let score_percent = if total_questions == 0 {
        0
    } else {
        correct_answers * 100 / total_questions
    };

    Scorecard {
        answers,
        total_questions,
        correct_answers,
        wrong_answers: total_questions - correct_answers,
        score_percent,
    }
}

/// Finalizes attempts exactly once.
pub struct Grader {
    manager: Arc<AttemptManager>,
    attempts: Arc<dyn AttemptRepository>,
}

impl Grader {
    pub fn new(manager: Arc<AttemptManager>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { manager, attempts }
    }

    pub async fn submit(&self, user: &CurrentUser, attempt_id: i64) -> AppResult<QuizResult> {
        ensure_student(user)?;
        let (attempt, quiz) = self.manager.load_owned(user, attempt_id).await?;

        if !attempt.is_active() {
            return Err(AppError::Conflict("attempt already submitted".to_string()));
        }

        let result = self
            .attempts
            .finalize(attempt.id, Utc::now(), score_drafts)
            .await?;

        tracing::info!(
            "User {} submitted attempt {} on quiz {}: {}/{} correct ({}%)",
            user.id,
            attempt.id,
            quiz.id,
            result.correct_answers,
            result.total_questions,
            result.score_percent
        );

        Ok(result)
    }
}

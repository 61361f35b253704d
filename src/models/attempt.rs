// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{
    question::PublicQuestion,
    quiz::Quiz,
};

/// Represents the 'quiz_attempts' table in the database.
/// One timed, countable try at a quiz by one user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub started_at: DateTime<Utc>,

    /// Set exactly once, when the attempt is submitted.
    pub ended_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Represents the 'quiz_temp_submissions' table.
/// A mutable draft answer, unique per (attempt, question).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizTempSubmission {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: i64,

    /// Bumped on every overwrite.
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'quiz_submissions' table.
/// The permanent, scored answer to one question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: i64,
    /// 1 when the selected option was correct, else 0.
    pub score: i16,
}

/// Represents the 'quiz_results' table.
/// `attempt_id` becomes NULL when the quiz (and with it the attempt) is deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: i64,
    pub attempt_id: Option<i64>,
    pub quiz_id: i64,
    pub user_id: i64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub score_percent: i32,
    pub created_at: DateTime<Utc>,
}

/// DTO for autosaving one answer.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveAnswerRequest {
    pub question_id: i64,
    pub selected_option_id: i64,
}

/// Lookup of the caller's active attempt. `attempt` is `None` when there is none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveAttemptResponse {
    pub attempt: Option<QuizAttempt>,
}

/// One answer shown in an attempt detail.
/// `score` is only present once the attempt has been submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerView {
    pub question_id: i64,
    pub selected_option_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i16>,
}

impl From<QuizTempSubmission> for AnswerView {
    fn from(d: QuizTempSubmission) -> Self {
        Self {
            question_id: d.question_id,
            selected_option_id: d.selected_option_id,
            score: None,
        }
    }
}

impl From<QuizSubmission> for AnswerView {
    fn from(s: QuizSubmission) -> Self {
        Self {
            question_id: s.question_id,
            selected_option_id: s.selected_option_id,
            score: Some(s.score),
        }
    }
}

/// Aggregated view of an attempt for the taker.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptDetail {
    pub attempt: QuizAttempt,
    pub quiz: Quiz,
    pub questions: Vec<PublicQuestion>,
    pub answers: Vec<AnswerView>,
    pub expires_at: DateTime<Utc>,
}

/// One row of the caller's attempt history.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub result: Option<QuizResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptHistory {
    pub attempts: Vec<AttemptSummary>,
    pub max_attempts: i32,
    pub remaining_attempts: i32,
}

/// A result joined with its attempt and quiz.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub result: QuizResult,
    pub attempt: QuizAttempt,
    pub quiz: Quiz,
}

/// One graded draft, about to become a `QuizSubmission`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredAnswer {
    pub question_id: i64,
    pub selected_option_id: i64,
    pub score: i16,
}

/// Outcome of grading an attempt's drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorecard {
    pub answers: Vec<ScoredAnswer>,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub score_percent: i32,
}

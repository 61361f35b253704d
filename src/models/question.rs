// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::models::quiz::Quiz;

/// Represents the 'quiz_questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'quiz_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
}

/// A question with its options, answer key included. Staff only.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: QuizQuestion,
    pub options: Vec<QuizOption>,
}

/// DTO for sending an option to a learner (excludes `is_correct`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: i64,
    pub option_text: String,
}

/// DTO for sending a question to a learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<PublicOption>,
}

impl From<QuestionWithOptions> for PublicQuestion {
    fn from(q: QuestionWithOptions) -> Self {
        Self {
            id: q.question.id,
            question: q.question.question,
            options: q
                .options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    option_text: o.option_text,
                })
                .collect(),
        }
    }
}

/// Questions as seen by a particular caller.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QuestionSet {
    WithAnswers(Vec<QuestionWithOptions>),
    Public(Vec<PublicQuestion>),
}

/// A quiz together with its questions.
#[derive(Debug, Clone, Serialize)]
pub struct QuizWithQuestions {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: QuestionSet,
}

/// DTO for importing questions from tabular rows.
/// Each row is `[question, option_1, .., option_n, correct_letter]`.
#[derive(Debug, Deserialize)]
pub struct ImportQuestionsRequest {
    pub rows: Vec<Vec<String>>,
}

/// A parsed import row, ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<NewOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOption {
    pub option_text: String,
    pub is_correct: bool,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

// src/models/quiz.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Answer format of every question in a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quiz_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuizType {
    TrueFalse,
    MultipleChoice,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    /// The meeting this quiz belongs to. Access is always decided on this reference.
    pub meeting_id: i64,

    pub title: String,
    pub description: Option<String>,
    pub quiz_type: QuizType,

    /// Attempts can only be started while the quiz is open.
    pub is_open: bool,

    pub start_time: DateTime<Utc>,

    /// No upper bound when absent.
    pub end_time: Option<DateTime<Utc>>,

    /// Length of one attempt, in minutes.
    pub duration_minute: i32,

    /// Upper bound on attempts per user, always >= 1.
    pub max_attempts: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    /// Checks the quiz-level preconditions for starting an attempt, in order:
    /// open flag, start of window, end of window.
    pub fn ensure_startable(&self, now: DateTime<Utc>) -> AppResult<()> {
        if !self.is_open {
            return Err(AppError::Conflict("quiz is not open".to_string()));
        }
        if now < self.start_time {
            return Err(AppError::Conflict("quiz has not started yet".to_string()));
        }
        if let Some(end_time) = self.end_time {
            if now > end_time {
                return Err(AppError::Conflict("quiz has already ended".to_string()));
            }
        }
        Ok(())
    }

    /// Informational deadline for an attempt started at `started_at`.
    pub fn attempt_deadline(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        let by_duration = started_at + Duration::minutes(i64::from(self.duration_minute));
        match self.end_time {
            Some(end_time) if end_time < by_duration => end_time,
            _ => by_duration,
        }
    }

    /// Merges a partial update into this quiz. The meeting reference never changes.
    pub fn apply_update(&mut self, update: UpdateQuizRequest) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(quiz_type) = update.quiz_type {
            self.quiz_type = quiz_type;
        }
        if let Some(is_open) = update.is_open {
            self.is_open = is_open;
        }
        if let Some(start_time) = update.start_time {
            self.start_time = start_time;
        }
        if update.clear_end_time {
            self.end_time = None;
        } else if let Some(end_time) = update.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(duration_minute) = update.duration_minute {
            self.duration_minute = duration_minute;
        }
        if let Some(max_attempts) = update.max_attempts {
            self.max_attempts = max_attempts;
        }
    }
}

/// Rejects windows that close before they open.
pub fn validate_window(start_time: DateTime<Utc>, end_time: Option<DateTime<Utc>>) -> AppResult<()> {
    match end_time {
        Some(end_time) if end_time < start_time => Err(AppError::BadRequest(
            "end_time must not be before start_time".to_string(),
        )),
        _ => Ok(()),
    }
}

/// DTO for creating quiz metadata.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub meeting_id: i64,
    #[validate(length(min = 1, max = 255, message = "Title length must be between 1 and 255 characters."))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub quiz_type: QuizType,
    #[serde(default)]
    pub is_open: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minute: i32,
    #[validate(range(min = 1, max = 100, message = "max_attempts must be between 1 and 100."))]
    pub max_attempts: i32,
}

/// DTO for updating quiz metadata. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub quiz_type: Option<QuizType>,
    pub is_open: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Removes the upper bound of the window; wins over `end_time`.
    #[serde(default)]
    pub clear_end_time: bool,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minute: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: Option<i32>,
}

/// Query parameters for listing the quizzes of a meeting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizListParams {
    pub is_open: Option<bool>,
    pub quiz_type: Option<QuizType>,
    pub search: Option<String>,
}

// src/services/attempt.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        attempt::{
            ActiveAttemptResponse, AnswerView, AttemptDetail, AttemptHistory, AttemptSummary,
            QuizAttempt,
        },
        question::PublicQuestion,
        quiz::Quiz,
        user::{CurrentUser, Role},
    },
    repositories::{AttemptRepository, QuizRepository},
    services::access::AccessGuard,
};

/// Owns the attempt lifecycle: NoAttempt -> Active -> Ended.
pub struct AttemptManager {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
    guard: Arc<AccessGuard>,
}

/// Only learners take quizzes.
pub(crate) fn ensure_student(user: &CurrentUser) -> AppResult<()> {
    if user.role == Role::Student {
        Ok(())
    } else {
        Err(AppError::Forbidden("only students can take quizzes".to_string()))
    }
}

impl AttemptManager {
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

    async fn load_quiz(&self, quiz_id: i64) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    async fn load_attempt(&self, attempt_id: i64) -> AppResult<QuizAttempt> {
        self.attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))
    }

    /// Loads an attempt owned by `user` together with its quiz, after checking access
    /// on the quiz's meeting.
    pub async fn load_owned(&self, user: &CurrentUser, attempt_id: i64) -> AppResult<(QuizAttempt, Quiz)> {
        let attempt = self.load_attempt(attempt_id).await?;
        if attempt.user_id != user.id {
            return Err(AppError::Forbidden("attempt belongs to another user".to_string()));
        }

        let quiz = self.load_quiz(attempt.quiz_id).await?;
        self.guard.ensure_access(user, quiz.meeting_id).await?;

        Ok((attempt, quiz))
    }

    pub async fn start(&self, user: &CurrentUser, quiz_id: i64) -> AppResult<QuizAttempt> {
        ensure_student(user)?;
        let quiz = self.load_quiz(quiz_id).await?;
        self.guard.ensure_access(user, quiz.meeting_id).await?;

        let now = Utc::now();
        quiz.ensure_startable(now)?;

        let created = self
            .attempts
            .start(quiz.id, user.id, quiz.max_attempts, now)
            .await?;

        tracing::info!("User {} started attempt {} on quiz {}", user.id, created.id, quiz.id);

        self.load_attempt(created.id).await
    }

    /// A missing active attempt is a normal answer, not an error.
    pub async fn active(&self, user: &CurrentUser, quiz_id: i64) -> AppResult<ActiveAttemptResponse> {
        let quiz = self.load_quiz(quiz_id).await?;
        self.guard.ensure_access(user, quiz.meeting_id).await?;

        let attempt = self.attempts.find_active(quiz.id, user.id).await?;
        Ok(ActiveAttemptResponse { attempt })
    }

    pub async fn history(&self, user: &CurrentUser, quiz_id: i64) -> AppResult<AttemptHistory> {
        let quiz = self.load_quiz(quiz_id).await?;
        self.guard.ensure_access(user, quiz.meeting_id).await?;

        let attempts = self.attempts.list_for_user(quiz.id, user.id).await?;
        let used = attempts.len() as i32;

        let mut summaries = Vec::with_capacity(attempts.len());
        for attempt in attempts {
            let result = if attempt.is_active() {
                None
            } else {
                self.attempts.find_result(attempt.id).await?
            };
            summaries.push(AttemptSummary { attempt, result });
        }

        Ok(AttemptHistory {
            attempts: summaries,
            max_attempts: quiz.max_attempts,
            remaining_attempts: (quiz.max_attempts - used).max(0),
        })
    }

    pub async fn detail(&self, user: &CurrentUser, attempt_id: i64) -> AppResult<AttemptDetail> {
        let (attempt, quiz) = self.load_owned(user, attempt_id).await?;

        let questions = self
            .quizzes
            .questions_with_options(quiz.id)
            .await?
            .into_iter()
            .map(PublicQuestion::from)
            .collect();

        let answers: Vec<AnswerView> = if attempt.is_active() {
            self.attempts
                .drafts(attempt.id)
                .await?
                .into_iter()
                .map(AnswerView::from)
                .collect()
        } else {
            self.attempts
                .submissions(attempt.id)
                .await?
                .into_iter()
                .map(AnswerView::from)
                .collect()
        };

        let expires_at = quiz.attempt_deadline(attempt.started_at);

        Ok(AttemptDetail {
            attempt,
            quiz,
            questions,
            answers,
            expires_at,
        })
    }
}

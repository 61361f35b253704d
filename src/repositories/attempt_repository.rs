// src/repositories/attempt_repository.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult, is_unique_violation},
    models::attempt::{QuizAttempt, QuizResult, QuizSubmission, QuizTempSubmission, Scorecard},
};

/// Correctness of each option referenced by an attempt's drafts, keyed by option id.
pub type AnswerKey = HashMap<i64, bool>;

/// Grading policy applied to an attempt's drafts inside the finalization transaction.
pub type Scorer = fn(&[QuizTempSubmission], &AnswerKey) -> Scorecard;

/// Attempt lifecycle storage. Every mutating method is one unit of work:
/// it runs its checks and writes in a single transaction.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Creates an attempt unless the user already used `max_attempts` attempts
    /// or has an active one. Both checks and the insert are serialized per (quiz, user).
    async fn start(
        &self,
        quiz_id: i64,
        user_id: i64,
        max_attempts: i32,
        started_at: DateTime<Utc>,
    ) -> AppResult<QuizAttempt>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<QuizAttempt>>;
    async fn find_active(&self, quiz_id: i64, user_id: i64) -> AppResult<Option<QuizAttempt>>;
    /// Newest first.
    async fn list_for_user(&self, quiz_id: i64, user_id: i64) -> AppResult<Vec<QuizAttempt>>;

    /// Upserts the draft for (attempt, question). Fails with Conflict once the attempt has ended.
    async fn save_draft(
        &self,
        attempt_id: i64,
        question_id: i64,
        selected_option_id: i64,
        saved_at: DateTime<Utc>,
    ) -> AppResult<QuizTempSubmission>;

    async fn drafts(&self, attempt_id: i64) -> AppResult<Vec<QuizTempSubmission>>;
    async fn submissions(&self, attempt_id: i64) -> AppResult<Vec<QuizSubmission>>;

    /// Grades the drafts with `scorer`, writes submissions and the result, closes the
    /// attempt and discards its drafts. Nothing is written on failure.
    async fn finalize(
        &self,
        attempt_id: i64,
        ended_at: DateTime<Utc>,
        scorer: Scorer,
    ) -> AppResult<QuizResult>;

    async fn find_result(&self, attempt_id: i64) -> AppResult<Option<QuizResult>>;
}

const ATTEMPT_COLUMNS: &str = "id, quiz_id, user_id, started_at, ended_at";
const DRAFT_COLUMNS: &str = "id, attempt_id, question_id, selected_option_id, version, updated_at";
const RESULT_COLUMNS: &str = "id, attempt_id, quiz_id, user_id, total_questions, correct_answers, \
     wrong_answers, score_percent, created_at";
const ONE_ACTIVE_INDEX: &str = "idx_quiz_attempts_one_active";

pub struct PgAttemptRepository {
    pool: PgPool,
}

impl PgAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptRepository for PgAttemptRepository {
    async fn start(
        &self,
        quiz_id: i64,
        user_id: i64,
        max_attempts: i32,
        started_at: DateTime<Utc>,
    ) -> AppResult<QuizAttempt> {
        let mut tx = self.pool.begin().await?;

        // Released on commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("quiz_attempt:{}:{}", quiz_id, user_id))
            .execute(&mut *tx)
            .await?;

        let used: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1 AND user_id = $2",
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if used >= i64::from(max_attempts) {
            return Err(AppError::Conflict("maximum attempts reached".to_string()));
        }

        let has_active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM quiz_attempts WHERE quiz_id = $1 AND user_id = $2 AND ended_at IS NULL)",
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if has_active {
            return Err(AppError::Conflict("an active attempt already exists".to_string()));
        }

        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            "INSERT INTO quiz_attempts (quiz_id, user_id, started_at) VALUES ($1, $2, $3) RETURNING {}",
            ATTEMPT_COLUMNS
        ))
        .bind(quiz_id)
        .bind(user_id)
        .bind(started_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, ONE_ACTIVE_INDEX) {
                AppError::Conflict("an active attempt already exists".to_string())
            } else {
                tracing::error!("Failed to insert attempt: {:?}", e);
                AppError::from(e)
            }
        })?;

        tx.commit().await?;

        Ok(attempt)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<QuizAttempt>> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {} FROM quiz_attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn find_active(&self, quiz_id: i64, user_id: i64) -> AppResult<Option<QuizAttempt>> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {} FROM quiz_attempts WHERE quiz_id = $1 AND user_id = $2 AND ended_at IS NULL",
            ATTEMPT_COLUMNS
        ))
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn list_for_user(&self, quiz_id: i64, user_id: i64) -> AppResult<Vec<QuizAttempt>> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {} FROM quiz_attempts WHERE quiz_id = $1 AND user_id = $2 ORDER BY started_at DESC, id DESC",
            ATTEMPT_COLUMNS
        ))
        .bind(quiz_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn save_draft(
        &self,
        attempt_id: i64,
        question_id: i64,
        selected_option_id: i64,
        saved_at: DateTime<Utc>,
    ) -> AppResult<QuizTempSubmission> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE blocks behind a finalizing FOR UPDATE, so no draft lands after the end.
        let ended_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT ended_at FROM quiz_attempts WHERE id = $1 FOR SHARE",
        )
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))?;

        if ended_at.is_some() {
            return Err(AppError::Conflict("attempt already submitted".to_string()));
        }

        let draft = sqlx::query_as::<_, QuizTempSubmission>(&format!(
            r#"
            INSERT INTO quiz_temp_submissions (attempt_id, question_id, selected_option_id, version, updated_at)
            VALUES ($1, $2, $3, 1, $4)
            ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                selected_option_id = EXCLUDED.selected_option_id,
                version = quiz_temp_submissions.version + 1,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            DRAFT_COLUMNS
        ))
        .bind(attempt_id)
        .bind(question_id)
        .bind(selected_option_id)
        .bind(saved_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(draft)
    }

    async fn drafts(&self, attempt_id: i64) -> AppResult<Vec<QuizTempSubmission>> {
        let drafts = sqlx::query_as::<_, QuizTempSubmission>(&format!(
            "SELECT {} FROM quiz_temp_submissions WHERE attempt_id = $1 ORDER BY question_id",
            DRAFT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(drafts)
    }

    async fn submissions(&self, attempt_id: i64) -> AppResult<Vec<QuizSubmission>> {
        let submissions = sqlx::query_as::<_, QuizSubmission>(
            "SELECT id, attempt_id, question_id, selected_option_id, score
             FROM quiz_submissions WHERE attempt_id = $1 ORDER BY question_id",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    async fn finalize(
        &self,
        attempt_id: i64,
        ended_at: DateTime<Utc>,
        scorer: Scorer,
    ) -> AppResult<QuizResult> {
        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {} FROM quiz_attempts WHERE id = $1 FOR UPDATE",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))?;

        if !attempt.is_active() {
            return Err(AppError::Conflict("attempt already submitted".to_string()));
        }

        let drafts = sqlx::query_as::<_, QuizTempSubmission>(&format!(
            "SELECT {} FROM quiz_temp_submissions WHERE attempt_id = $1 ORDER BY question_id",
            DRAFT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_all(&mut *tx)
        .await?;

        if drafts.is_empty() {
            return Err(AppError::EmptySubmission);
        }

        let option_ids: Vec<i64> = drafts.iter().map(|d| d.selected_option_id).collect();
        let answer_key: AnswerKey = sqlx::query_as::<_, (i64, bool)>(
            "SELECT id, is_correct FROM quiz_options WHERE id = ANY($1)",
        )
        .bind(&option_ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        let scorecard = scorer(&drafts, &answer_key);

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO quiz_submissions (attempt_id, question_id, selected_option_id, score) ",
        );
        builder.push_values(&scorecard.answers, |mut b, answer| {
            b.push_bind(attempt_id)
                .push_bind(answer.question_id)
                .push_bind(answer.selected_option_id)
                .push_bind(answer.score);
        });
        builder.build().execute(&mut *tx).await?;

        let result = sqlx::query_as::<_, QuizResult>(&format!(
            r#"
            INSERT INTO quiz_results (
                attempt_id, quiz_id, user_id, total_questions, correct_answers, wrong_answers, score_percent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            RESULT_COLUMNS
        ))
        .bind(attempt_id)
        .bind(attempt.quiz_id)
        .bind(attempt.user_id)
        .bind(scorecard.total_questions)
        .bind(scorecard.correct_answers)
        .bind(scorecard.wrong_answers)
        .bind(scorecard.score_percent)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE quiz_attempts SET ended_at = $2 WHERE id = $1")
            .bind(attempt_id)
            .bind(ended_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM quiz_temp_submissions WHERE attempt_id = $1")
            .bind(attempt_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit attempt {} finalization: {:?}", attempt_id, e);
            AppError::from(e)
        })?;

        Ok(result)
    }

    async fn find_result(&self, attempt_id: i64) -> AppResult<Option<QuizResult>> {
        let result = sqlx::query_as::<_, QuizResult>(&format!(
            "SELECT {} FROM quiz_results WHERE attempt_id = $1",
            RESULT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result)
    }
}

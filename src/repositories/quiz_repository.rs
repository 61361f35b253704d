// src/repositories/quiz_repository.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        question::{NewQuestion, QuestionWithOptions, QuizOption, QuizQuestion},
        quiz::{CreateQuizRequest, Quiz, QuizListParams},
    },
};

/// Quiz metadata, questions and options.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, req: &CreateQuizRequest) -> AppResult<Quiz>;
    async fn update(&self, quiz: &Quiz) -> AppResult<Quiz>;
    /// Returns false when no quiz had that id.
    async fn delete(&self, id: i64) -> AppResult<bool>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Quiz>>;
    async fn list_by_meeting(&self, meeting_id: i64, params: &QuizListParams) -> AppResult<Vec<Quiz>>;
    async fn questions_with_options(&self, quiz_id: i64) -> AppResult<Vec<QuestionWithOptions>>;
    async fn find_question(&self, id: i64) -> AppResult<Option<QuizQuestion>>;
    async fn find_option(&self, id: i64) -> AppResult<Option<QuizOption>>;
    /// Inserts all questions and their options atomically. Returns the number inserted.
    async fn import_questions(&self, quiz_id: i64, questions: &[NewQuestion]) -> AppResult<usize>;
}

const QUIZ_COLUMNS: &str = "id, meeting_id, title, description, quiz_type, is_open, start_time, \
     end_time, duration_minute, max_attempts, created_at, updated_at";

pub struct PgQuizRepository {
    pool: PgPool,
}

impl PgQuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn create(&self, req: &CreateQuizRequest) -> AppResult<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(&format!(
            "INSERT INTO quizzes (
                meeting_id, title, description, quiz_type, is_open,
                start_time, end_time, duration_minute, max_attempts
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}",
            QUIZ_COLUMNS
        ))
        .bind(req.meeting_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.quiz_type)
        .bind(req.is_open)
        .bind(req.start_time)
        .bind(req.end_time)
        .bind(req.duration_minute)
        .bind(req.max_attempts)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create quiz: {:?}", e);
            AppError::from(e)
        })?;

        Ok(quiz)
    }

    async fn update(&self, quiz: &Quiz) -> AppResult<Quiz> {
        sqlx::query_as::<_, Quiz>(&format!(
            "UPDATE quizzes SET
                title = $2, description = $3, quiz_type = $4, is_open = $5,
                start_time = $6, end_time = $7, duration_minute = $8, max_attempts = $9,
                updated_at = $10
            WHERE id = $1
            RETURNING {}",
            QUIZ_COLUMNS
        ))
        .bind(quiz.id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.quiz_type)
        .bind(quiz.is_open)
        .bind(quiz.start_time)
        .bind(quiz.end_time)
        .bind(quiz.duration_minute)
        .bind(quiz.max_attempts)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz.id)))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Quiz>> {
        let quiz = sqlx::query_as::<_, Quiz>(&format!("SELECT {} FROM quizzes WHERE id = $1", QUIZ_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quiz)
    }

    async fn list_by_meeting(&self, meeting_id: i64, params: &QuizListParams) -> AppResult<Vec<Quiz>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM quizzes WHERE meeting_id = ",
            QUIZ_COLUMNS
        ));
        builder.push_bind(meeting_id);

        if let Some(is_open) = params.is_open {
            builder.push(" AND is_open = ").push_bind(is_open);
        }
        if let Some(quiz_type) = params.quiz_type {
            builder.push(" AND quiz_type = ").push_bind(quiz_type);
        }
        if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder
                .push(" AND title ILIKE ")
                .push_bind(format!("%{}%", search));
        }
        builder.push(" ORDER BY start_time ASC, id ASC");

        let quizzes = builder.build_query_as::<Quiz>().fetch_all(&self.pool).await?;
        Ok(quizzes)
    }

    async fn questions_with_options(&self, quiz_id: i64) -> AppResult<Vec<QuestionWithOptions>> {
        let questions = sqlx::query_as::<_, QuizQuestion>(
            "SELECT id, quiz_id, question, created_at FROM quiz_questions WHERE quiz_id = $1 ORDER BY id",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, QuizOption>(
            r#"
            SELECT o.id, o.question_id, o.option_text, o.is_correct
            FROM quiz_options o
            JOIN quiz_questions q ON q.id = o.question_id
            WHERE q.quiz_id = $1
            ORDER BY o.id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<i64, Vec<QuizOption>> = HashMap::new();
        for option in options {
            by_question.entry(option.question_id).or_default().push(option);
        }

        Ok(questions
            .into_iter()
            .map(|question| QuestionWithOptions {
                options: by_question.remove(&question.id).unwrap_or_default(),
                question,
            })
            .collect())
    }

    async fn find_question(&self, id: i64) -> AppResult<Option<QuizQuestion>> {
        let question = sqlx::query_as::<_, QuizQuestion>(
            "SELECT id, quiz_id, question, created_at FROM quiz_questions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn find_option(&self, id: i64) -> AppResult<Option<QuizOption>> {
        let option = sqlx::query_as::<_, QuizOption>(
            "SELECT id, question_id, option_text, is_correct FROM quiz_options WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(option)
    }

    async fn import_questions(&self, quiz_id: i64, questions: &[NewQuestion]) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;

        for new_question in questions {
            let question_id: i64 = sqlx::query_scalar(
                "INSERT INTO quiz_questions (quiz_id, question) VALUES ($1, $2) RETURNING id",
            )
            .bind(quiz_id)
            .bind(&new_question.question)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert imported question: {:?}", e);
                AppError::from(e)
            })?;

            if new_question.options.is_empty() {
                continue;
            }

            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO quiz_options (question_id, option_text, is_correct) ",
            );
            builder.push_values(&new_question.options, |mut b, option| {
                b.push_bind(question_id)
                    .push_bind(&option.option_text)
                    .push_bind(option.is_correct);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(questions.len())
    }
}

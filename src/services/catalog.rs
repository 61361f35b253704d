// src/services/catalog.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        question::{ImportSummary, PublicQuestion, QuestionSet, QuizWithQuestions},
        quiz::{CreateQuizRequest, Quiz, QuizListParams, UpdateQuizRequest, validate_window},
        user::CurrentUser,
    },
    repositories::QuizRepository,
    services::access::AccessGuard,
    utils::{html::clean_html, import::parse_rows},
};

/// Quiz metadata and question bank management.
pub struct QuizCatalog {
    quizzes: Arc<dyn QuizRepository>,
    guard: Arc<AccessGuard>,
}

impl QuizCatalog {
    pub fn new(quizzes: Arc<dyn QuizRepository>, guard: Arc<AccessGuard>) -> Self {
        Self { quizzes, guard }
    }

    /// Loads a quiz or fails with NotFound.
    pub async fn load(&self, quiz_id: i64) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    /// Only staff with access to the meeting may change the catalog.
    async fn ensure_can_edit(&self, user: &CurrentUser, meeting_id: i64) -> AppResult<()> {
        if !user.role.is_staff() {
            return Err(AppError::Forbidden("students cannot manage quizzes".to_string()));
        }
        self.guard.ensure_access(user, meeting_id).await
    }

    pub async fn create(&self, user: &CurrentUser, mut req: CreateQuizRequest) -> AppResult<Quiz> {
        self.ensure_can_edit(user, req.meeting_id).await?;

        req.validate()?;
        validate_window(req.start_time, req.end_time)?;

        req.title = clean_html(&req.title);
        req.description = req.description.as_deref().map(clean_html);

        let quiz = self.quizzes.create(&req).await?;
        tracing::info!("Quiz {} created on meeting {} by user {}", quiz.id, quiz.meeting_id, user.id);
        Ok(quiz)
    }

    pub async fn update(&self, user: &CurrentUser, quiz_id: i64, req: UpdateQuizRequest) -> AppResult<Quiz> {
        let mut quiz = self.load(quiz_id).await?;
        self.ensure_can_edit(user, quiz.meeting_id).await?;

        req.validate()?;
        quiz.apply_update(req);
        validate_window(quiz.start_time, quiz.end_time)?;

        quiz.title = clean_html(&quiz.title);
        quiz.description = quiz.description.as_deref().map(clean_html);

        self.quizzes.update(&quiz).await
    }

    pub async fn delete(&self, user: &CurrentUser, quiz_id: i64) -> AppResult<()> {
        let quiz = self.load(quiz_id).await?;
        self.ensure_can_edit(user, quiz.meeting_id).await?;

        if !self.quizzes.delete(quiz_id).await? {
            return Err(AppError::NotFound(format!("Quiz {} not found", quiz_id)));
        }
        tracing::info!("Quiz {} deleted by user {}", quiz_id, user.id);
        Ok(())
    }

    /// Parses tabular rows and inserts them all, or nothing.
    pub async fn import_questions(
        &self,
        user: &CurrentUser,
        quiz_id: i64,
        rows: &[Vec<String>],
    ) -> AppResult<ImportSummary> {
        let quiz = self.load(quiz_id).await?;
        self.ensure_can_edit(user, quiz.meeting_id).await?;

        let (questions, skipped) = parse_rows(rows)?;
        let imported = if questions.is_empty() {
            0
        } else {
            self.quizzes.import_questions(quiz_id, &questions).await?
        };

        tracing::info!(
            "Imported {} questions into quiz {} ({} rows skipped)",
            imported,
            quiz_id,
            skipped
        );
        Ok(ImportSummary { imported, skipped })
    }

    pub async fn get(&self, user: &CurrentUser, quiz_id: i64) -> AppResult<Quiz> {
        let quiz = self.load(quiz_id).await?;
        self.guard.ensure_access(user, quiz.meeting_id).await?;
        Ok(quiz)
    }

    /// Staff see the answer key; everyone else gets public questions.
    pub async fn get_with_questions(&self, user: &CurrentUser, quiz_id: i64) -> AppResult<QuizWithQuestions> {
        let quiz = self.get(user, quiz_id).await?;
        let questions = self.quizzes.questions_with_options(quiz_id).await?;

        let questions = if user.role.is_staff() {
            QuestionSet::WithAnswers(questions)
        } else {
            QuestionSet::Public(questions.into_iter().map(PublicQuestion::from).collect())
        };

        Ok(QuizWithQuestions { quiz, questions })
    }

    pub async fn list_by_meeting(
        &self,
        user: &CurrentUser,
        meeting_id: i64,
        params: &QuizListParams,
    ) -> AppResult<Vec<Quiz>> {
        self.guard.ensure_access(user, meeting_id).await?;
        self.quizzes.list_by_meeting(meeting_id, params).await
    }
}

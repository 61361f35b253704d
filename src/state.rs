// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    repositories::{
        AttemptRepository, MeetingDirectory, PgAttemptRepository, PgMeetingDirectory,
        PgPurchaseLedger, PgQuizRepository, PurchaseLedger, QuizRepository,
    },
    services::{AccessGuard, AttemptManager, AutosaveStore, Grader, QuizCatalog, ResultViewer},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<QuizCatalog>,
    pub attempts: Arc<AttemptManager>,
    pub autosave: Arc<AutosaveStore>,
    pub grader: Arc<Grader>,
    pub results: Arc<ResultViewer>,
}

impl AppState {
    /// Wires the services over the given storage and collaborators.
    pub fn new(
        config: Config,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
        directory: Arc<dyn MeetingDirectory>,
        ledger: Arc<dyn PurchaseLedger>,
    ) -> Self {
        let guard = Arc::new(AccessGuard::new(directory, ledger));

        let catalog = Arc::new(QuizCatalog::new(quizzes.clone(), guard.clone()));
        let manager = Arc::new(AttemptManager::new(
            quizzes.clone(),
            attempts.clone(),
            guard.clone(),
        ));
        let autosave = Arc::new(AutosaveStore::new(
            manager.clone(),
            quizzes.clone(),
            attempts.clone(),
        ));
        let grader = Arc::new(Grader::new(manager.clone(), attempts.clone()));
        let results = Arc::new(ResultViewer::new(quizzes, attempts, guard));

        Self {
            config,
            catalog,
            attempts: manager,
            autosave,
            grader,
            results,
        }
    }

    /// Postgres-backed state used by the server binary.
    pub fn postgres(pool: PgPool, config: Config) -> Self {
        Self::new(
            config,
            Arc::new(PgQuizRepository::new(pool.clone())),
            Arc::new(PgAttemptRepository::new(pool.clone())),
            Arc::new(PgMeetingDirectory::new(pool.clone())),
            Arc::new(PgPurchaseLedger::new(pool)),
        )
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

// src/repositories/mod.rs

pub mod attempt_repository;
pub mod meeting_repository;
pub mod quiz_repository;

pub use attempt_repository::{AnswerKey, AttemptRepository, PgAttemptRepository, Scorer};
pub use meeting_repository::{MeetingDirectory, PgMeetingDirectory, PgPurchaseLedger, PurchaseLedger};
pub use quiz_repository::{PgQuizRepository, QuizRepository};

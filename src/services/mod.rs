// src/services/mod.rs

pub mod access;
pub mod attempt;
pub mod autosave;
pub mod catalog;
pub mod grader;
pub mod viewer;

pub use access::AccessGuard;
pub use attempt::AttemptManager;
pub use autosave::AutosaveStore;
pub use catalog::QuizCatalog;
pub use grader::Grader;
pub use viewer::ResultViewer;

//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{ParseIdError, QuestionId, QuizContentError, ReferenceError};

/// Why quiz content could not be produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("quiz content is malformed: {0}")]
    Invalid(#[from] QuizContentError),
}

/// Errors emitted by the quiz session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("invalid quiz reference: {0}")]
    InvalidReference(#[from] ReferenceError),
    #[error("failed to load quiz content: {0}")]
    ContentFetchFailed(#[source] ContentError),
    #[error("failed to save quiz report: {0}")]
    SubmissionFailed(#[source] StorageError),
    #[error("quiz content is not loaded")]
    NotReady,
    #[error("quiz content is already loaded")]
    AlreadyLoaded,
    #[error("another operation is in flight")]
    Busy,
    #[error("quiz session was aborted")]
    Aborted,
    #[error("unknown question {0}")]
    UnknownQuestion(QuestionId),
    #[error("question {question} has no option {option}")]
    InvalidOption { question: QuestionId, option: usize },
    #[error("quiz is not submitted yet")]
    NotSubmitted,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ReportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error("invalid report id: {0}")]
    InvalidReportId(#[from] ParseIdError),
    #[error("report not found")]
    NotFound,
    #[error("report quiz is malformed: {0}")]
    Content(#[from] QuizContentError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ReportError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LectureService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LectureError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    AlreadyRegistered,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unauthorized => Self::InvalidCredentials,
            StorageError::Conflict => Self::AlreadyRegistered,
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted while reading backend configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use study_core::model::{
    AuthSession, Lecture, NewReport, Profile, ProgressSignal, Question, QuestionId,
    QuizCategory, QuizContent, QuizContentError, QuizId, QuizReference, Report, ReportId,
    ReportListItem, UpcomingEvent, UserId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("not authorized")]
    Unauthorized,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend rejected request ({status}): {message}")]
    Backend { status: u16, message: String },
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Question ids arrive as either JSON strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionKey {
    Text(String),
    Number(i64),
}

impl QuestionKey {
    #[must_use]
    pub fn into_id(self) -> QuestionId {
        match self {
            Self::Text(s) => QuestionId::new(s),
            Self::Number(n) => QuestionId::new(n.to_string()),
        }
    }
}

/// Wire shape of one question inside a quiz record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: QuestionKey,
    pub question_title: String,
    pub answers: Vec<String>,
    pub correct_answer_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Wire shape of a quiz (`tests` row). This is also what the local cache stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

impl QuizRecord {
    /// Validate the record into domain content.
    ///
    /// An unrecognised `test_type` is treated as absent so classification
    /// falls back to the id.
    ///
    /// # Errors
    ///
    /// Returns `QuizContentError` if any question is malformed or ids repeat.
    pub fn into_content(self) -> Result<QuizContent, QuizContentError> {
        let category = self
            .test_type
            .as_deref()
            .and_then(|raw| raw.parse::<QuizCategory>().ok());
        let questions = self
            .questions
            .into_iter()
            .map(|q| {
                Question::new(
                    q.id.into_id(),
                    q.question_title,
                    q.answers,
                    q.correct_answer_index,
                    q.explanation,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        QuizContent::new(QuizId::new(self.id), category, self.updated_at, questions)
    }
}

/// A report row joined with the full quiz it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWithQuiz {
    pub report: Report,
    pub quiz: QuizRecord,
}

/// Result of a sign-up call; the backend may defer the session until the
/// email address is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpRecord {
    SignedIn(AuthSession),
    PendingConfirmation { user_id: Option<UserId> },
}

//
// ─── PORTS ─────────────────────────────────────────────────────────────────────
//

/// Device-local key/value store.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Fetch the blob stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// List every quiz (id, title, subject).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes(&self) -> Result<Vec<QuizReference>, StorageError>;

    /// Fetch a full quiz with its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_quiz(&self, id: &QuizId) -> Result<QuizRecord, StorageError>;

    /// Fetch only the revision marker of a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn quiz_revision(&self, id: &QuizId) -> Result<Option<DateTime<Utc>>, StorageError>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Persist a new report and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the insert is rejected.
    async fn insert_report(&self, report: &NewReport) -> Result<ReportId, StorageError>;

    /// Ids of all quizzes the user has at least one report for.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn taken_quiz_ids(&self, user_id: UserId) -> Result<Vec<QuizId>, StorageError>;

    /// Reports of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_reports(&self, user_id: UserId) -> Result<Vec<ReportListItem>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_report(&self, id: ReportId) -> Result<ReportWithQuiz, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert or update the signal keyed by `(user_id, date, category)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the upsert is rejected.
    async fn upsert_progress(&self, signal: &ProgressSignal) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn progress_for_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<ProgressSignal>, StorageError>;
}

#[async_trait]
pub trait LectureRepository: Send + Sync {
    /// Lectures newest first, optionally limited.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_lectures(&self, limit: Option<u32>) -> Result<Vec<Lecture>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_upcoming_events(&self) -> Result<Vec<UpcomingEvent>, StorageError>;
}

/// Object storage for lecture documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// URL of an object in a public bucket. Does not contact the backend.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Time-limited URL of an object in a private bucket.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if signing fails.
    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` for bad credentials.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if registration is rejected.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpRecord, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend refuses to revoke the session.
    async fn sign_out(&self, session: &AuthSession) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_profile(&self, session: &AuthSession) -> Result<Option<Profile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn update_profile(
        &self,
        session: &AuthSession,
        profile: &Profile,
    ) -> Result<Profile, StorageError>;
}

/// Aggregates backend ports behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub cache: Arc<dyn LocalCache>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub lectures: Arc<dyn LectureRepository>,
    pub objects: Arc<dyn ObjectStore>,
    pub auth: Arc<dyn AuthGateway>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(&crate::memory::InMemoryRepository::new())
    }

    /// Wrap one in-memory backend in every port.
    #[must_use]
    pub fn from_memory(repo: &crate::memory::InMemoryRepository) -> Self {
        Self {
            cache: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            reports: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            lectures: Arc::new(repo.clone()),
            objects: Arc::new(repo.clone()),
            auth: Arc::new(repo.clone()),
        }
    }

    /// Replace the local cache adapter.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn LocalCache>) -> Self {
        self.cache = cache;
        self
    }
}

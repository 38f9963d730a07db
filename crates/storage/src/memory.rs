//! In-memory backend for tests and prototyping.
//!
//! Every port is implemented over one shared state. Call counters and
//! failure switches let tests observe and disturb the traffic a service
//! generates.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use study_core::model::{
    AuthSession, Lecture, NewReport, Profile, ProgressSignal, QuizCategory, QuizId,
    QuizReference, Report, ReportId, ReportListItem, UpcomingEvent, UserId,
};
use uuid::Uuid;

use crate::repository::{
    AuthGateway, LectureRepository, LocalCache, ObjectStore, ProgressRepository, QuizRecord,
    QuizRepository, ReportRepository, ReportWithQuiz, SignUpRecord, StorageError,
};

/// Which operation a failure switch applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    QuizFetch,
    QuizRevision,
    ReportInsert,
    ProgressUpsert,
    CacheRead,
    CacheWrite,
    SignedUrl,
}

struct Account {
    user_id: UserId,
    password: String,
    profile: Profile,
}

#[derive(Default)]
struct State {
    quizzes: Vec<QuizRecord>,
    reports: Vec<Report>,
    progress: HashMap<(UserId, NaiveDate, QuizCategory), bool>,
    lectures: Vec<Lecture>,
    events: Vec<UpcomingEvent>,
    cache: HashMap<String, String>,
    accounts: HashMap<String, Account>,
    require_confirmation: bool,
}

#[derive(Default)]
struct Counters {
    quiz_fetches: AtomicUsize,
    revision_probes: AtomicUsize,
    report_inserts: AtomicUsize,
    progress_upserts: AtomicUsize,
    cache_reads: AtomicUsize,
    cache_writes: AtomicUsize,
}

#[derive(Default)]
struct Switches {
    quiz_fetch: AtomicBool,
    quiz_revision: AtomicBool,
    report_insert: AtomicBool,
    progress_upsert: AtomicBool,
    cache_read: AtomicBool,
    cache_write: AtomicBool,
    signed_url: AtomicBool,
}

impl Switches {
    fn flag(&self, point: FailPoint) -> &AtomicBool {
        match point {
            FailPoint::QuizFetch => &self.quiz_fetch,
            FailPoint::QuizRevision => &self.quiz_revision,
            FailPoint::ReportInsert => &self.report_insert,
            FailPoint::ProgressUpsert => &self.progress_upsert,
            FailPoint::CacheRead => &self.cache_read,
            FailPoint::CacheWrite => &self.cache_write,
            FailPoint::SignedUrl => &self.signed_url,
        }
    }
}

/// Simple in-memory backend implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
    counters: Arc<Counters>,
    switches: Arc<Switches>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn check(&self, point: FailPoint) -> Result<(), StorageError> {
        if self.switches.flag(point).load(Ordering::SeqCst) {
            return Err(StorageError::Connection(format!("injected failure: {point:?}")));
        }
        Ok(())
    }

    /// Make the given operation fail (or succeed again) on subsequent calls.
    pub fn set_failure(&self, point: FailPoint, fail: bool) {
        self.switches.flag(point).store(fail, Ordering::SeqCst);
    }

    /// Add or replace a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn put_quiz(&self, record: QuizRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if let Some(existing) = guard.quizzes.iter_mut().find(|q| q.id == record.id) {
            *existing = record;
        } else {
            guard.quizzes.push(record);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn put_lecture(&self, lecture: Lecture) -> Result<(), StorageError> {
        self.lock()?.lectures.push(lecture);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn put_event(&self, event: UpcomingEvent) -> Result<(), StorageError> {
        self.lock()?.events.push(event);
        Ok(())
    }

    /// Register an account that can sign in with `password`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn put_account(
        &self,
        email: &str,
        password: &str,
        user_id: UserId,
    ) -> Result<(), StorageError> {
        self.lock()?.accounts.insert(
            email.to_owned(),
            Account {
                user_id,
                password: password.to_owned(),
                profile: Profile::default(),
            },
        );
        Ok(())
    }

    /// When set, sign-ups are accepted without returning a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn require_email_confirmation(&self, required: bool) -> Result<(), StorageError> {
        self.lock()?.require_confirmation = required;
        Ok(())
    }

    /// Snapshot of persisted reports.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn reports(&self) -> Result<Vec<Report>, StorageError> {
        Ok(self.lock()?.reports.clone())
    }

    /// Snapshot of persisted progress signals.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn progress_signals(&self) -> Result<Vec<ProgressSignal>, StorageError> {
        Ok(self
            .lock()?
            .progress
            .iter()
            .map(|(&(user_id, date, category), &completed)| ProgressSignal {
                user_id,
                date,
                category,
                completed,
            })
            .collect())
    }

    #[must_use]
    pub fn quiz_fetches(&self) -> usize {
        self.counters.quiz_fetches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn revision_probes(&self) -> usize {
        self.counters.revision_probes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn report_inserts(&self) -> usize {
        self.counters.report_inserts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn progress_upserts(&self) -> usize {
        self.counters.progress_upserts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cache_reads(&self) -> usize {
        self.counters.cache_reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cache_writes(&self) -> usize {
        self.counters.cache_writes.load(Ordering::SeqCst)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl LocalCache for InMemoryRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        bump(&self.counters.cache_reads);
        self.check(FailPoint::CacheRead)?;
        Ok(self.lock()?.cache.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        bump(&self.counters.cache_writes);
        self.check(FailPoint::CacheWrite)?;
        self.lock()?.cache.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn list_quizzes(&self) -> Result<Vec<QuizReference>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .quizzes
            .iter()
            .map(|q| QuizReference {
                id: QuizId::new(q.id.clone()),
                title: q.title.clone().unwrap_or_default(),
                subject: q.subject.clone().unwrap_or_default(),
                taken: false,
            })
            .collect())
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<QuizRecord, StorageError> {
        bump(&self.counters.quiz_fetches);
        self.check(FailPoint::QuizFetch)?;
        let guard = self.lock()?;
        guard
            .quizzes
            .iter()
            .find(|q| q.id == id.as_str())
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn quiz_revision(&self, id: &QuizId) -> Result<Option<DateTime<Utc>>, StorageError> {
        bump(&self.counters.revision_probes);
        self.check(FailPoint::QuizRevision)?;
        let guard = self.lock()?;
        guard
            .quizzes
            .iter()
            .find(|q| q.id == id.as_str())
            .map(|q| q.updated_at)
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ReportRepository for InMemoryRepository {
    async fn insert_report(&self, report: &NewReport) -> Result<ReportId, StorageError> {
        bump(&self.counters.report_inserts);
        self.check(FailPoint::ReportInsert)?;
        let id = ReportId::new(Uuid::new_v4());
        self.lock()?.reports.push(Report {
            id,
            user_id: report.user_id,
            quiz_id: report.quiz_id.clone(),
            score: report.score,
            answers: report.answers.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn taken_quiz_ids(&self, user_id: UserId) -> Result<Vec<QuizId>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .reports
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.quiz_id.clone())
            .collect())
    }

    async fn list_reports(&self, user_id: UserId) -> Result<Vec<ReportListItem>, StorageError> {
        let guard = self.lock()?;
        let mut items: Vec<ReportListItem> = guard
            .reports
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| {
                let quiz = guard.quizzes.iter().find(|q| q.id == r.quiz_id.as_str());
                ReportListItem {
                    id: r.id,
                    score: r.score,
                    created_at: r.created_at,
                    quiz_title: quiz.and_then(|q| q.title.clone()).unwrap_or_default(),
                    quiz_subject: quiz.and_then(|q| q.subject.clone()).unwrap_or_default(),
                }
            })
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn get_report(&self, id: ReportId) -> Result<ReportWithQuiz, StorageError> {
        let guard = self.lock()?;
        let report = guard
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)?;
        let quiz = guard
            .quizzes
            .iter()
            .find(|q| q.id == report.quiz_id.as_str())
            .cloned()
            .ok_or(StorageError::NotFound)?;
        Ok(ReportWithQuiz { report, quiz })
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, signal: &ProgressSignal) -> Result<(), StorageError> {
        bump(&self.counters.progress_upserts);
        self.check(FailPoint::ProgressUpsert)?;
        self.lock()?.progress.insert(
            (signal.user_id, signal.date, signal.category),
            signal.completed,
        );
        Ok(())
    }

    async fn progress_for_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<ProgressSignal>, StorageError> {
        Ok(self
            .progress_signals()?
            .into_iter()
            .filter(|s| s.user_id == user_id && s.date == date)
            .collect())
    }
}

#[async_trait]
impl LectureRepository for InMemoryRepository {
    async fn list_lectures(&self, limit: Option<u32>) -> Result<Vec<Lecture>, StorageError> {
        let mut lectures = self.lock()?.lectures.clone();
        lectures.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            lectures.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(lectures)
    }

    async fn list_upcoming_events(&self) -> Result<Vec<UpcomingEvent>, StorageError> {
        let mut events = self.lock()?.events.clone();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }
}

#[async_trait]
impl ObjectStore for InMemoryRepository {
    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://public/{bucket}/{path}")
    }

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        self.check(FailPoint::SignedUrl)?;
        Ok(format!(
            "memory://sign/{bucket}/{path}?expires_in={}",
            expires_in.as_secs()
        ))
    }
}

#[async_trait]
impl AuthGateway for InMemoryRepository {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StorageError> {
        let guard = self.lock()?;
        let account = guard.accounts.get(email).ok_or(StorageError::Unauthorized)?;
        if account.password != password {
            return Err(StorageError::Unauthorized);
        }
        let user_id = account.user_id;
        Ok(AuthSession::new(
            user_id,
            Some(email.to_owned()),
            format!("memory-token-{user_id}"),
        ))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpRecord, StorageError> {
        let mut guard = self.lock()?;
        if guard.accounts.contains_key(email) {
            return Err(StorageError::Conflict);
        }
        let user_id = UserId::new(Uuid::new_v4());
        guard.accounts.insert(
            email.to_owned(),
            Account {
                user_id,
                password: password.to_owned(),
                profile: Profile::default(),
            },
        );
        if guard.require_confirmation {
            return Ok(SignUpRecord::PendingConfirmation {
                user_id: Some(user_id),
            });
        }
        Ok(SignUpRecord::SignedIn(AuthSession::new(
            user_id,
            Some(email.to_owned()),
            format!("memory-token-{user_id}"),
        )))
    }

    async fn sign_out(&self, _session: &AuthSession) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get_profile(&self, session: &AuthSession) -> Result<Option<Profile>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .accounts
            .values()
            .find(|a| a.user_id == session.user_id)
            .map(|a| a.profile.clone()))
    }

    async fn update_profile(
        &self,
        session: &AuthSession,
        profile: &Profile,
    ) -> Result<Profile, StorageError> {
        let mut guard = self.lock()?;
        let account = guard
            .accounts
            .values_mut()
            .find(|a| a.user_id == session.user_id)
            .ok_or(StorageError::NotFound)?;
        account.profile = profile.clone();
        Ok(account.profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::AnswerState;
    use study_core::time::fixed_now;

    fn quiz(id: &str) -> QuizRecord {
        QuizRecord {
            id: id.into(),
            title: Some(format!("Quiz {id}")),
            subject: Some("Law".into()),
            test_type: None,
            updated_at: None,
            questions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn cache_round_trips_and_counts() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get("quiz_a").await.unwrap(), None);
        repo.set("quiz_a", "{}").await.unwrap();
        assert_eq!(repo.get("quiz_a").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(repo.cache_reads(), 2);
        assert_eq!(repo.cache_writes(), 1);
    }

    #[tokio::test]
    async fn failure_switch_applies_until_cleared() {
        let repo = InMemoryRepository::new();
        repo.put_quiz(quiz("lawTFQ3")).unwrap();
        repo.set_failure(FailPoint::QuizFetch, true);
        assert!(repo.get_quiz(&QuizId::new("lawTFQ3")).await.is_err());
        repo.set_failure(FailPoint::QuizFetch, false);
        assert!(repo.get_quiz(&QuizId::new("lawTFQ3")).await.is_ok());
        assert_eq!(repo.quiz_fetches(), 2);
    }

    #[tokio::test]
    async fn progress_upsert_is_keyed_by_user_day_category() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(Uuid::nil());
        let day = fixed_now().date_naive();
        let signal = ProgressSignal::completed(user, day, QuizCategory::Mcq);
        repo.upsert_progress(&signal).await.unwrap();
        repo.upsert_progress(&signal).await.unwrap();
        assert_eq!(repo.progress_for_day(user, day).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reports_join_quiz_titles() {
        let repo = InMemoryRepository::new();
        repo.put_quiz(quiz("lawTFQ3")).unwrap();
        let user = UserId::new(Uuid::nil());
        let id = repo
            .insert_report(&NewReport {
                user_id: user,
                quiz_id: QuizId::new("lawTFQ3"),
                score: 1,
                answers: AnswerState::new(),
            })
            .await
            .unwrap();
        let items = repo.list_reports(user).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quiz_title, "Quiz lawTFQ3");
        let detail = repo.get_report(id).await.unwrap();
        assert_eq!(detail.quiz.id, "lawTFQ3");
    }
}

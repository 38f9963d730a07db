use std::sync::Arc;

use storage::repository::{LocalCache, ProgressRepository, QuizRepository, ReportRepository};
use study_core::model::{AuthSession, NewReport, ProgressSignal, QuizReference};
use tracing::{debug, error, info, warn};

use super::content::{ContentSource, QuizContentLoader};
use super::state::{InFlight, QuizSession, SubmitOutcome};
use crate::Clock;
use crate::error::QuizError;

/// Drives quiz sessions against the cache and the backend on behalf of one
/// signed-in user.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    auth: AuthSession,
    content: QuizContentLoader,
    reports: Arc<dyn ReportRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        auth: AuthSession,
        cache: Arc<dyn LocalCache>,
        quizzes: Arc<dyn QuizRepository>,
        reports: Arc<dyn ReportRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            auth,
            content: QuizContentLoader::new(cache, quizzes),
            reports,
            progress,
        }
    }

    #[must_use]
    pub fn with_revision_check(mut self, check_revision: bool) -> Self {
        self.content = self.content.with_revision_check(check_revision);
        self
    }

    #[must_use]
    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// Decode the navigation payload and open a session for it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidReference` if the payload is empty,
    /// not valid percent-encoding, or not a quiz reference.
    pub fn initialize(&self, payload: &str) -> Result<QuizSession, QuizError> {
        let reference = QuizReference::decode(payload).map_err(|err| {
            warn!(error = %err, "rejecting quiz reference");
            QuizError::InvalidReference(err)
        })?;
        debug!(quiz_id = %reference.id, "quiz session initialized");
        Ok(QuizSession::new(reference))
    }

    /// Load questions into the session from the cache, or from the backend
    /// on a miss.
    ///
    /// A hit on an unversioned entry makes no remote call. A hit on an entry
    /// that carries a version makes one `quiz_revision` call (unless the
    /// check is disabled with `with_revision_check(false)`) and fetches the
    /// quiz again only when the revision changed.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ContentFetchFailed` (and aborts the session) if
    /// the backend cannot provide valid content, `QuizError::Busy` /
    /// `QuizError::AlreadyLoaded` / `QuizError::Aborted` if the session is
    /// not waiting for content.
    pub async fn load_content(&self, session: &mut QuizSession) -> Result<ContentSource, QuizError> {
        session.begin_loading()?;
        let mut session = InFlight::new(session);
        let id = session.reference().id.clone();

        match self.content.load(&id, self.clock.now()).await {
            Ok((content, source)) => {
                info!(quiz_id = %id, questions = content.len(), ?source, "quiz content loaded");
                session.finish_loading(content);
                Ok(source)
            }
            Err(err) => {
                error!(quiz_id = %id, error = %err, "quiz content unavailable");
                session.abort();
                Err(QuizError::ContentFetchFailed(err))
            }
        }
    }

    /// Score the session, persist a report and record today's progress.
    ///
    /// Once the report is stored the session is `Submitted` even if the
    /// progress write fails; `sync_progress` can retry it. Calling this on a
    /// submitted session returns the stored outcome without any writes.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SubmissionFailed` if the report insert fails; the
    /// session goes back to `Ready` and can be submitted again.
    pub async fn submit(&self, session: &mut QuizSession) -> Result<SubmitOutcome, QuizError> {
        if let Some(outcome) = session.outcome() {
            debug!(quiz_id = %session.reference().id, "quiz already submitted");
            return Ok(outcome.clone());
        }

        let result = session.begin_submit()?;
        let mut session = InFlight::new(session);
        let quiz_id = session.reference().id.clone();
        let category = session
            .content()
            .ok_or(QuizError::NotReady)?
            .category();

        let report = NewReport::new(
            self.auth.user_id,
            quiz_id.clone(),
            result,
            session.answers().clone(),
        );
        let report_id = match self.reports.insert_report(&report).await {
            Ok(id) => id,
            Err(err) => {
                error!(quiz_id = %quiz_id, error = %err, "failed to save quiz report");
                session.fail_submit();
                return Err(QuizError::SubmissionFailed(err));
            }
        };
        session.complete_submit(SubmitOutcome {
            result,
            report_id,
            category,
            progress_recorded: false,
        });
        info!(
            quiz_id = %quiz_id,
            %report_id,
            score = result.score(),
            total = result.total(),
            "quiz submitted"
        );

        if self.record_progress(&session).await {
            session.mark_progress_recorded();
        }
        session.outcome().cloned().ok_or(QuizError::NotSubmitted)
    }

    /// Retry the daily progress write for a submitted session.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotSubmitted` for sessions without a stored
    /// report, or `QuizError::Storage` if the upsert fails again.
    pub async fn sync_progress(&self, session: &mut QuizSession) -> Result<SubmitOutcome, QuizError> {
        let outcome = session.outcome().cloned().ok_or(QuizError::NotSubmitted)?;
        if outcome.progress_recorded {
            return Ok(outcome);
        }
        let signal =
            ProgressSignal::completed(self.auth.user_id, self.clock.today(), outcome.category);
        self.progress.upsert_progress(&signal).await?;
        session.mark_progress_recorded();
        session.outcome().cloned().ok_or(QuizError::NotSubmitted)
    }

    async fn record_progress(&self, session: &QuizSession) -> bool {
        let Some(outcome) = session.outcome() else {
            return false;
        };
        let signal =
            ProgressSignal::completed(self.auth.user_id, self.clock.today(), outcome.category);
        match self.progress.upsert_progress(&signal).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    quiz_id = %session.reference().id,
                    category = %outcome.category,
                    date = %signal.date_key(),
                    error = %err,
                    "report saved but daily progress was not recorded"
                );
                false
            }
        }
    }
}

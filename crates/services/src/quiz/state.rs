use std::fmt;
use std::ops::{Deref, DerefMut};

use study_core::model::{
    AnswerState, QuestionId, QuizCategory, QuizContent, QuizReference, ReportId,
    SubmissionResult,
};

use crate::error::QuizError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Reference decoded, content not requested yet.
    Initializing,
    ContentLoading,
    Ready,
    Submitting,
    /// Terminal. Answers are frozen and the result is available.
    Submitted,
    /// Terminal. Content could not be loaded; the caller should navigate away.
    Aborted,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Aborted)
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub result: SubmissionResult,
    pub report_id: ReportId,
    pub category: QuizCategory,
    /// False while the daily progress upsert has not gone through.
    pub progress_recorded: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of a single quiz attempt.
///
/// Transitions are driven by `QuizSessionService`; selection happens here
/// directly since it touches no backend.
pub struct QuizSession {
    reference: QuizReference,
    state: SessionState,
    content: Option<QuizContent>,
    answers: AnswerState,
    outcome: Option<SubmitOutcome>,
}

impl QuizSession {
    #[must_use]
    pub fn new(reference: QuizReference) -> Self {
        Self {
            reference,
            state: SessionState::Initializing,
            content: None,
            answers: AnswerState::new(),
            outcome: None,
        }
    }

    #[must_use]
    pub fn reference(&self) -> &QuizReference {
        &self.reference
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn content(&self) -> Option<&QuizContent> {
        self.content.as_ref()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerState {
        &self.answers
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SubmitOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn result(&self) -> Option<SubmissionResult> {
        self.outcome.as_ref().map(|o| o.result)
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.state == SessionState::Submitted
    }

    /// Record the option picked for a question.
    ///
    /// Returns `Ok(false)` without touching the answers once submission has
    /// started.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotReady` before content is loaded,
    /// `QuizError::UnknownQuestion` / `QuizError::InvalidOption` if the
    /// selection does not exist in the quiz.
    pub fn select_answer(&mut self, question: &QuestionId, option: usize) -> Result<bool, QuizError> {
        match self.state {
            SessionState::Submitting | SessionState::Submitted => return Ok(false),
            SessionState::Ready => {}
            _ => return Err(QuizError::NotReady),
        }
        let content = self.content.as_ref().ok_or(QuizError::NotReady)?;
        let q = content
            .question(question)
            .ok_or_else(|| QuizError::UnknownQuestion(question.clone()))?;
        if !q.has_option(option) {
            return Err(QuizError::InvalidOption {
                question: question.clone(),
                option,
            });
        }
        self.answers.select(question.clone(), option);
        Ok(true)
    }

    pub(crate) fn begin_loading(&mut self) -> Result<(), QuizError> {
        match self.state {
            SessionState::Initializing => {
                self.state = SessionState::ContentLoading;
                Ok(())
            }
            SessionState::ContentLoading => Err(QuizError::Busy),
            SessionState::Aborted => Err(QuizError::Aborted),
            _ => Err(QuizError::AlreadyLoaded),
        }
    }

    pub(crate) fn finish_loading(&mut self, content: QuizContent) {
        self.content = Some(content);
        self.state = SessionState::Ready;
    }

    pub(crate) fn abort(&mut self) {
        self.state = SessionState::Aborted;
    }

    /// Move to `Submitting` and score the current answers.
    pub(crate) fn begin_submit(&mut self) -> Result<SubmissionResult, QuizError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Submitting => return Err(QuizError::Busy),
            SessionState::Aborted => return Err(QuizError::Aborted),
            _ => return Err(QuizError::NotReady),
        }
        let content = self.content.as_ref().ok_or(QuizError::NotReady)?;
        let result = SubmissionResult::compute(content, &self.answers);
        self.state = SessionState::Submitting;
        Ok(result)
    }

    pub(crate) fn fail_submit(&mut self) {
        if self.state == SessionState::Submitting {
            self.state = SessionState::Ready;
        }
    }

    pub(crate) fn complete_submit(&mut self, outcome: SubmitOutcome) {
        self.outcome = Some(outcome);
        self.state = SessionState::Submitted;
    }

    pub(crate) fn mark_progress_recorded(&mut self) {
        if let Some(outcome) = self.outcome.as_mut() {
            outcome.progress_recorded = true;
        }
    }

    fn revert_in_flight(&mut self) {
        self.state = match self.state {
            SessionState::ContentLoading => SessionState::Initializing,
            SessionState::Submitting => SessionState::Ready,
            other => other,
        };
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz_id", &self.reference.id)
            .field("state", &self.state)
            .field("questions", &self.content.as_ref().map(QuizContent::len))
            .field("answered", &self.answers.len())
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// Borrow of a session with an operation in flight.
///
/// If the owning future is dropped before the operation settles, the session
/// falls back to the state it had before the operation started.
pub(crate) struct InFlight<'a> {
    session: &'a mut QuizSession,
}

impl<'a> InFlight<'a> {
    pub(crate) fn new(session: &'a mut QuizSession) -> Self {
        Self { session }
    }
}

impl Deref for InFlight<'_> {
    type Target = QuizSession;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl DerefMut for InFlight<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.revert_in_flight();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{Question, QuizId};
    use uuid::Uuid;

    fn reference() -> QuizReference {
        QuizReference {
            id: QuizId::new("logisticsMCQ1"),
            title: "Logistics".into(),
            subject: "Logistics".into(),
            taken: false,
        }
    }

    fn content() -> QuizContent {
        let q1 = Question::new(
            QuestionId::new("q1"),
            "First",
            vec!["a".into(), "b".into()],
            1,
            None,
        )
        .unwrap();
        let q2 = Question::new(
            QuestionId::new("q2"),
            "Second",
            vec!["a".into(), "b".into()],
            0,
            None,
        )
        .unwrap();
        QuizContent::new(QuizId::new("logisticsMCQ1"), None, None, vec![q1, q2]).unwrap()
    }

    fn ready_session() -> QuizSession {
        let mut session = QuizSession::new(reference());
        session.begin_loading().unwrap();
        session.finish_loading(content());
        session
    }

    fn outcome(result: SubmissionResult) -> SubmitOutcome {
        SubmitOutcome {
            result,
            report_id: ReportId::new(Uuid::nil()),
            category: QuizCategory::Mcq,
            progress_recorded: true,
        }
    }

    #[test]
    fn selection_requires_loaded_content() {
        let mut session = QuizSession::new(reference());
        let err = session.select_answer(&QuestionId::new("q1"), 0).unwrap_err();
        assert!(matches!(err, QuizError::NotReady));
    }

    #[test]
    fn selection_validates_question_and_option() {
        let mut session = ready_session();
        assert!(matches!(
            session.select_answer(&QuestionId::new("q9"), 0),
            Err(QuizError::UnknownQuestion(_))
        ));
        assert!(matches!(
            session.select_answer(&QuestionId::new("q1"), 5),
            Err(QuizError::InvalidOption { option: 5, .. })
        ));
        assert!(session.select_answer(&QuestionId::new("q1"), 1).unwrap());
        assert_eq!(session.answers().selected(&QuestionId::new("q1")), Some(1));
    }

    #[test]
    fn selection_after_submission_is_ignored() {
        let mut session = ready_session();
        session.select_answer(&QuestionId::new("q1"), 1).unwrap();
        let result = session.begin_submit().unwrap();
        session.complete_submit(outcome(result));

        let before = session.answers().clone();
        assert!(!session.select_answer(&QuestionId::new("q1"), 0).unwrap());
        assert!(!session.select_answer(&QuestionId::new("q2"), 1).unwrap());
        assert_eq!(session.answers(), &before);
    }

    #[test]
    fn loading_twice_is_rejected() {
        let mut session = QuizSession::new(reference());
        session.begin_loading().unwrap();
        assert!(matches!(session.begin_loading(), Err(QuizError::Busy)));
        session.finish_loading(content());
        assert!(matches!(session.begin_loading(), Err(QuizError::AlreadyLoaded)));
    }

    #[test]
    fn aborted_session_stays_aborted() {
        let mut session = QuizSession::new(reference());
        session.begin_loading().unwrap();
        session.abort();
        assert!(session.state().is_terminal());
        assert!(matches!(session.begin_loading(), Err(QuizError::Aborted)));
        assert!(matches!(session.begin_submit(), Err(QuizError::Aborted)));
    }

    #[test]
    fn failed_submit_returns_to_ready() {
        let mut session = ready_session();
        session.begin_submit().unwrap();
        assert!(matches!(session.begin_submit(), Err(QuizError::Busy)));
        session.fail_submit();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.result().is_none());
    }

    #[test]
    fn dropped_in_flight_operation_reverts_state() {
        let mut session = QuizSession::new(reference());
        session.begin_loading().unwrap();
        drop(InFlight::new(&mut session));
        assert_eq!(session.state(), SessionState::Initializing);

        let mut session = ready_session();
        session.begin_submit().unwrap();
        drop(InFlight::new(&mut session));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn settled_operation_is_not_reverted() {
        let mut session = ready_session();
        let result = session.begin_submit().unwrap();
        {
            let mut guard = InFlight::new(&mut session);
            guard.complete_submit(outcome(result));
        }
        assert_eq!(session.state(), SessionState::Submitted);
    }
}

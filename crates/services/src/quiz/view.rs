use study_core::model::{QuestionId, QuestionOutcome, SubmissionResult};

use super::state::{QuizSession, SessionState};

/// How an answer option should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionHighlight {
    Neutral,
    Selected,
    /// Correct option, revealed after submission.
    Correct,
    /// Option the user picked that turned out wrong.
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub index: usize,
    pub text: String,
    pub selected: bool,
    /// Only populated once the session is submitted.
    pub correct: Option<bool>,
    pub highlight: OptionHighlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub number: usize,
    pub prompt: String,
    pub options: Vec<OptionView>,
    /// Only populated once the session is submitted.
    pub outcome: Option<QuestionOutcome>,
    pub explanation: Option<String>,
}

/// Snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub title: String,
    pub subject: String,
    pub state: SessionState,
    pub questions: Vec<QuestionView>,
    pub answered: usize,
    pub total: usize,
    pub result: Option<SubmissionResult>,
}

impl SessionView {
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.state == SessionState::Ready
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(
            self.state,
            SessionState::Initializing | SessionState::ContentLoading
        )
    }
}

fn highlight(selected: bool, correct: bool, submitted: bool) -> OptionHighlight {
    match (submitted, selected, correct) {
        (true, _, true) => OptionHighlight::Correct,
        (true, true, false) => OptionHighlight::Wrong,
        (false, true, _) => OptionHighlight::Selected,
        _ => OptionHighlight::Neutral,
    }
}

impl QuizSession {
    /// Build the presentation snapshot of the session.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let submitted = self.is_submitted();
        let answers = self.answers();
        let questions: Vec<QuestionView> = self
            .content()
            .map(|content| content.questions())
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let chosen = answers.selected(q.id());
                let options = q
                    .answers()
                    .iter()
                    .enumerate()
                    .map(|(index, text)| {
                        let selected = chosen == Some(index);
                        let correct = index == q.correct_answer_index();
                        OptionView {
                            index,
                            text: text.clone(),
                            selected,
                            correct: submitted.then_some(correct),
                            highlight: highlight(selected, correct, submitted),
                        }
                    })
                    .collect();
                QuestionView {
                    id: q.id().clone(),
                    number: i + 1,
                    prompt: q.prompt().to_owned(),
                    options,
                    outcome: submitted.then(|| QuestionOutcome::of(q, answers)),
                    explanation: if submitted {
                        q.explanation().map(str::to_owned)
                    } else {
                        None
                    },
                }
            })
            .collect();

        SessionView {
            title: self.reference().title.clone(),
            subject: self.reference().subject.clone(),
            state: self.state(),
            answered: answers.len(),
            total: questions.len(),
            questions,
            result: self.result(),
        }
    }
}

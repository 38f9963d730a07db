use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::QuestionId;
use crate::model::quiz::{Question, QuizContent};

/// Selected option per question. Entries are inserted or overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerState(BTreeMap<QuestionId, usize>);

impl AnswerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a selection, returning the previously selected option if any.
    pub fn select(&mut self, question: QuestionId, option: usize) -> Option<usize> {
        self.0.insert(question, option)
    }

    #[must_use]
    pub fn selected(&self, question: &QuestionId) -> Option<usize> {
        self.0.get(question).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, usize)> {
        self.0.iter().map(|(id, option)| (id, *option))
    }
}

impl FromIterator<(QuestionId, usize)> for AnswerState {
    fn from_iter<T: IntoIterator<Item = (QuestionId, usize)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How a single question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOutcome {
    Correct,
    Incorrect { chosen: usize },
    Unanswered,
}

impl QuestionOutcome {
    #[must_use]
    pub fn of(question: &Question, answers: &AnswerState) -> Self {
        match answers.selected(question.id()) {
            Some(chosen) if chosen == question.correct_answer_index() => Self::Correct,
            Some(chosen) => Self::Incorrect { chosen },
            None => Self::Unanswered,
        }
    }

    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Final score of a submitted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    score: u32,
    total: u32,
}

impl SubmissionResult {
    /// Score `answers` against `content`. Unanswered questions count as incorrect.
    #[must_use]
    pub fn compute(content: &QuizContent, answers: &AnswerState) -> Self {
        let score = content
            .questions()
            .iter()
            .filter(|q| QuestionOutcome::of(q, answers).is_correct())
            .count();
        Self {
            score: u32::try_from(score).unwrap_or(u32::MAX),
            total: u32::try_from(content.len()).unwrap_or(u32::MAX),
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Share of correct answers in `[0, 1]`; an empty quiz scores 0.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuizId;

    fn two_question_quiz() -> QuizContent {
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
            vec!["True".into(), "False".into()],
            0,
            None,
        )
        .unwrap();
        QuizContent::new(QuizId::new("logisticsMCQ1"), None, None, vec![q1, q2]).unwrap()
    }

    fn answers(pairs: &[(&str, usize)]) -> AnswerState {
        pairs
            .iter()
            .map(|(id, option)| (QuestionId::new(*id), *option))
            .collect()
    }

    #[test]
    fn scores_all_correct() {
        let result = SubmissionResult::compute(&two_question_quiz(), &answers(&[("q1", 1), ("q2", 0)]));
        assert_eq!((result.score(), result.total()), (2, 2));
    }

    #[test]
    fn scores_partial() {
        let result = SubmissionResult::compute(&two_question_quiz(), &answers(&[("q1", 0), ("q2", 0)]));
        assert_eq!((result.score(), result.total()), (1, 2));
    }

    #[test]
    fn unanswered_counts_as_incorrect() {
        let result = SubmissionResult::compute(&two_question_quiz(), &AnswerState::new());
        assert_eq!((result.score(), result.total()), (0, 2));
        assert!(result.ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn answers_for_unknown_questions_are_ignored() {
        let result = SubmissionResult::compute(&two_question_quiz(), &answers(&[("q9", 1)]));
        assert_eq!(result.score(), 0);
    }

    #[test]
    fn select_overwrites_previous_choice() {
        let mut state = AnswerState::new();
        assert_eq!(state.select(QuestionId::new("q1"), 0), None);
        assert_eq!(state.select(QuestionId::new("q1"), 1), Some(0));
        assert_eq!(state.len(), 1);
        assert_eq!(state.selected(&QuestionId::new("q1")), Some(1));
    }

    #[test]
    fn outcomes_per_question() {
        let quiz = two_question_quiz();
        let state = answers(&[("q1", 0)]);
        assert_eq!(
            QuestionOutcome::of(&quiz.questions()[0], &state),
            QuestionOutcome::Incorrect { chosen: 0 }
        );
        assert_eq!(
            QuestionOutcome::of(&quiz.questions()[1], &state),
            QuestionOutcome::Unanswered
        );
    }

    #[test]
    fn answer_state_serializes_as_object() {
        let json = serde_json::to_value(answers(&[("q1", 1), ("q2", 0)])).unwrap();
        assert_eq!(json, serde_json::json!({"q1": 1, "q2": 0}));
    }
}

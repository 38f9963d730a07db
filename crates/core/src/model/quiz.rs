use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::category::QuizCategory;
use crate::model::ids::{QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Failure to decode a quiz reference handed over by the listing screen.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReferenceError {
    #[error("quiz reference payload is empty")]
    Empty,

    #[error("quiz reference is not valid percent-encoding: {0}")]
    Encoding(String),

    #[error("quiz reference is not valid JSON: {0}")]
    Json(String),

    #[error("quiz reference has an empty id")]
    MissingId,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizContentError {
    #[error("question {question} has no answer options")]
    NoAnswers { question: QuestionId },

    #[error("question {question} marks option {index} correct but has {len} options")]
    CorrectIndexOutOfRange {
        question: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("question id {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

//
// ─── REFERENCE ─────────────────────────────────────────────────────────────────
//

/// Lightweight quiz descriptor passed from the quiz list into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizReference {
    pub id: QuizId,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub taken: bool,
}

impl QuizReference {
    /// Decode a percent-encoded JSON payload (as produced by [`QuizReference::encode`]).
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError` when the payload is empty, not valid
    /// percent-encoding, not a JSON reference, or carries a blank id.
    pub fn decode(payload: &str) -> Result<Self, ReferenceError> {
        if payload.trim().is_empty() {
            return Err(ReferenceError::Empty);
        }
        let json =
            urlencoding::decode(payload).map_err(|e| ReferenceError::Encoding(e.to_string()))?;
        let reference: Self =
            serde_json::from_str(&json).map_err(|e| ReferenceError::Json(e.to_string()))?;
        if reference.id.as_str().trim().is_empty() {
            return Err(ReferenceError::MissingId);
        }
        Ok(reference)
    }

    /// Percent-encoded JSON form suitable for a route parameter.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing plain strings and a bool cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        urlencoding::encode(&json).into_owned()
    }
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// A single multiple-choice or true/false question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    answers: Vec<String>,
    correct_answer_index: usize,
    explanation: Option<String>,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuizContentError` if there are no answers or the correct index
    /// does not point at one of them.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        answers: Vec<String>,
        correct_answer_index: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuizContentError> {
        if answers.is_empty() {
            return Err(QuizContentError::NoAnswers { question: id });
        }
        if correct_answer_index >= answers.len() {
            return Err(QuizContentError::CorrectIndexOutOfRange {
                question: id,
                index: correct_answer_index,
                len: answers.len(),
            });
        }
        let explanation = explanation.filter(|text| !text.trim().is_empty());
        Ok(Self {
            id,
            prompt: prompt.into(),
            answers,
            correct_answer_index,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    #[must_use]
    pub fn correct_answer_index(&self) -> usize {
        self.correct_answer_index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.answers.len()
    }
}

/// Ordered questions of one quiz, validated at the gateway boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizContent {
    id: QuizId,
    category: Option<QuizCategory>,
    updated_at: Option<DateTime<Utc>>,
    questions: Vec<Question>,
}

impl QuizContent {
    /// # Errors
    ///
    /// Returns `QuizContentError::DuplicateQuestion` if two questions share an id.
    pub fn new(
        id: QuizId,
        category: Option<QuizCategory>,
        updated_at: Option<DateTime<Utc>>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizContentError> {
        let mut seen = std::collections::HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizContentError::DuplicateQuestion(question.id().clone()));
            }
        }
        Ok(Self {
            id,
            category,
            updated_at,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuizId {
        &self.id
    }

    /// Category carried by the record itself, if any.
    #[must_use]
    pub fn explicit_category(&self) -> Option<QuizCategory> {
        self.category
    }

    /// Effective category: explicit attribute first, id token match otherwise.
    #[must_use]
    pub fn category(&self) -> QuizCategory {
        QuizCategory::resolve(self.category, &self.id)
    }

    /// Backend revision marker used to validate cached copies.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> QuizReference {
        QuizReference {
            id: QuizId::new("logisticsMCQ1"),
            title: "Logistics basics & terms".into(),
            subject: "Logistics".into(),
            taken: false,
        }
    }

    #[test]
    fn reference_encode_decode() {
        let original = reference();
        let payload = original.encode();
        assert!(!payload.contains('{'));
        assert!(!payload.contains('&'));
        assert_eq!(QuizReference::decode(&payload).unwrap(), original);
    }

    #[test]
    fn reference_taken_defaults_to_false() {
        let payload = urlencoding::encode(r#"{"id":"lawTFQ3","title":"Law","subject":"Law"}"#);
        let decoded = QuizReference::decode(&payload).unwrap();
        assert!(!decoded.taken);
        assert_eq!(decoded.id, QuizId::new("lawTFQ3"));
    }

    #[test]
    fn malformed_references_are_errors() {
        assert_eq!(QuizReference::decode(""), Err(ReferenceError::Empty));
        assert!(matches!(
            QuizReference::decode("%7B%22id"),
            Err(ReferenceError::Json(_))
        ));
        assert!(matches!(
            QuizReference::decode("%FF%FE"),
            Err(ReferenceError::Encoding(_))
        ));
        let blank = urlencoding::encode(r#"{"id":"  ","title":"t","subject":"s"}"#);
        assert_eq!(
            QuizReference::decode(&blank),
            Err(ReferenceError::MissingId)
        );
    }

    #[test]
    fn question_rejects_out_of_range_index() {
        let err = Question::new(
            QuestionId::new("q1"),
            "Pick",
            vec!["a".into(), "b".into()],
            2,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            QuizContentError::CorrectIndexOutOfRange { index: 2, len: 2, .. }
        ));
    }

    #[test]
    fn question_rejects_empty_answers_and_blank_explanation_is_dropped() {
        assert!(matches!(
            Question::new(QuestionId::new("q1"), "Pick", Vec::new(), 0, None),
            Err(QuizContentError::NoAnswers { .. })
        ));
        let q = Question::new(
            QuestionId::new("q1"),
            "Pick",
            vec!["True".into(), "False".into()],
            0,
            Some("  ".into()),
        )
        .unwrap();
        assert_eq!(q.explanation(), None);
    }

    #[test]
    fn content_rejects_duplicate_question_ids() {
        let q = Question::new(QuestionId::new("q1"), "Pick", vec!["a".into()], 0, None).unwrap();
        let err = QuizContent::new(QuizId::new("x"), None, None, vec![q.clone(), q]).unwrap_err();
        assert_eq!(err, QuizContentError::DuplicateQuestion(QuestionId::new("q1")));
    }
}

use chrono::{DateTime, Utc};

use crate::model::answers::{AnswerState, QuestionOutcome, SubmissionResult};
use crate::model::ids::{QuestionId, QuizId, ReportId, UserId};
use crate::model::quiz::QuizContent;

/// Insert payload for a score report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub score: u32,
    pub answers: AnswerState,
}

impl NewReport {
    #[must_use]
    pub fn new(
        user_id: UserId,
        quiz_id: QuizId,
        result: SubmissionResult,
        answers: AnswerState,
    ) -> Self {
        Self {
            user_id,
            quiz_id,
            score: result.score(),
            answers,
        }
    }
}

/// A persisted score report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: ReportId,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub score: u32,
    pub answers: AnswerState,
    pub created_at: DateTime<Utc>,
}

/// Report row joined with the title and subject of its quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportListItem {
    pub id: ReportId,
    pub score: u32,
    pub created_at: DateTime<Utc>,
    pub quiz_title: String,
    pub quiz_subject: String,
}

/// Review line for one question of a past attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewedQuestion {
    pub question_id: QuestionId,
    pub prompt: String,
    pub answers: Vec<String>,
    pub chosen: Option<usize>,
    pub correct: usize,
    pub explanation: Option<String>,
    pub outcome: QuestionOutcome,
}

/// A report together with the quiz it was taken against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDetail {
    pub report: Report,
    pub quiz_title: String,
    pub quiz_subject: String,
    pub content: QuizContent,
}

impl ReportDetail {
    /// Per-question review in quiz order.
    #[must_use]
    pub fn review(&self) -> Vec<ReviewedQuestion> {
        self.content
            .questions()
            .iter()
            .map(|q| ReviewedQuestion {
                question_id: q.id().clone(),
                prompt: q.prompt().to_owned(),
                answers: q.answers().to_vec(),
                chosen: self.report.answers.selected(q.id()),
                correct: q.correct_answer_index(),
                explanation: q.explanation().map(str::to_owned),
                outcome: QuestionOutcome::of(q, &self.report.answers),
            })
            .collect()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.content.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::quiz::Question;
    use crate::time::fixed_now;
    use uuid::Uuid;

    #[test]
    fn review_reports_choice_and_outcome() {
        let q1 = Question::new(
            QuestionId::new("q1"),
            "Incoterm for seller delivers at buyer's door?",
            vec!["EXW".into(), "DDP".into()],
            1,
            Some("DDP puts all costs on the seller.".into()),
        )
        .unwrap();
        let q2 = Question::new(QuestionId::new("q2"), "True?", vec!["T".into(), "F".into()], 0, None)
            .unwrap();
        let content = QuizContent::new(QuizId::new("logisticsMCQ1"), None, None, vec![q1, q2]).unwrap();
        let answers: AnswerState = [(QuestionId::new("q1"), 0)].into_iter().collect();
        let detail = ReportDetail {
            report: Report {
                id: ReportId::new(Uuid::nil()),
                user_id: UserId::new(Uuid::nil()),
                quiz_id: QuizId::new("logisticsMCQ1"),
                score: 0,
                answers,
                created_at: fixed_now(),
            },
            quiz_title: "Logistics 1".into(),
            quiz_subject: "Logistics".into(),
            content,
        };

        let review = detail.review();
        assert_eq!(review.len(), 2);
        assert_eq!(review[0].chosen, Some(0));
        assert_eq!(review[0].correct, 1);
        assert_eq!(review[0].outcome, QuestionOutcome::Incorrect { chosen: 0 });
        assert!(review[0].explanation.is_some());
        assert_eq!(review[1].outcome, QuestionOutcome::Unanswered);
    }
}

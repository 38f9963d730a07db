use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::model::ids::{LectureId, QuizId};
use crate::model::quiz::QuizReference;

/// Items grouped under one subject heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroup<T> {
    pub subject: String,
    pub items: Vec<T>,
}

/// Group items by subject, keeping subjects in first-seen order and items
/// in input order.
pub fn group_by_subject<T>(
    items: impl IntoIterator<Item = T>,
    subject_of: impl Fn(&T) -> &str,
) -> Vec<SubjectGroup<T>> {
    let mut groups: Vec<SubjectGroup<T>> = Vec::new();
    for item in items {
        let subject = subject_of(&item);
        if let Some(group) = groups.iter_mut().find(|g| g.subject == subject) {
            group.items.push(item);
        } else {
            groups.push(SubjectGroup {
                subject: subject.to_owned(),
                items: vec![item],
            });
        }
    }
    groups
}

/// Quiz catalog with per-user "taken" status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuizListing {
    groups: Vec<SubjectGroup<QuizReference>>,
}

impl QuizListing {
    /// Mark every quiz whose id appears in `taken` and group by subject.
    #[must_use]
    pub fn build(quizzes: Vec<QuizReference>, taken: &HashSet<QuizId>) -> Self {
        let marked = quizzes.into_iter().map(|mut quiz| {
            quiz.taken = taken.contains(&quiz.id);
            quiz
        });
        Self {
            groups: group_by_subject(marked, |q| q.subject.as_str()),
        }
    }

    #[must_use]
    pub fn groups(&self) -> &[SubjectGroup<QuizReference>] {
        &self.groups
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn quizzes(&self) -> impl Iterator<Item = &QuizReference> {
        self.groups.iter().flat_map(|g| g.items.iter())
    }
}

/// Lecture PDF metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lecture {
    pub id: LectureId,
    pub title: String,
    pub subject: String,
    pub pdf_path: String,
    pub created_at: DateTime<Utc>,
    pub cover: Option<String>,
}

/// A lecture with a URL the document viewer can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureWithUrl {
    pub lecture: Lecture,
    pub url: String,
}

/// Announcement shown on the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingEvent {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub date_text: Option<String>,
}

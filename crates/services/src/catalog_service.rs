use std::collections::HashSet;
use std::sync::Arc;

use storage::repository::{LectureRepository, QuizRepository, ReportRepository};
use study_core::model::{QuizListing, UpcomingEvent, UserId};
use tracing::debug;

use crate::error::CatalogError;

/// Quiz catalog and the announcements shown next to it.
#[derive(Clone)]
pub struct CatalogService {
    quizzes: Arc<dyn QuizRepository>,
    reports: Arc<dyn ReportRepository>,
    lectures: Arc<dyn LectureRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        reports: Arc<dyn ReportRepository>,
        lectures: Arc<dyn LectureRepository>,
    ) -> Self {
        Self {
            quizzes,
            reports,
            lectures,
        }
    }

    /// All quizzes grouped by subject, flagged when `user_id` already has a
    /// report for them.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if either listing fails.
    pub async fn list_quizzes(&self, user_id: UserId) -> Result<QuizListing, CatalogError> {
        let (quizzes, taken) = tokio::try_join!(
            self.quizzes.list_quizzes(),
            self.reports.taken_quiz_ids(user_id)
        )?;
        let taken: HashSet<_> = taken.into_iter().collect();
        debug!(quizzes = quizzes.len(), taken = taken.len(), "quiz catalog loaded");
        Ok(QuizListing::build(quizzes, &taken))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the listing fails.
    pub async fn upcoming_events(&self) -> Result<Vec<UpcomingEvent>, CatalogError> {
        Ok(self.lectures.list_upcoming_events().await?)
    }
}

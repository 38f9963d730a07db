use std::sync::Arc;

use storage::repository::ReportRepository;
use study_core::model::{ReportDetail, ReportId, ReportListItem, UserId};

use crate::error::ReportError;

/// Past quiz attempts of a user.
#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
}

impl ReportService {
    #[must_use]
    pub fn new(reports: Arc<dyn ReportRepository>) -> Self {
        Self { reports }
    }

    /// Reports newest first, with the title and subject of each quiz.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Storage` if repository access fails.
    pub async fn list_reports(&self, user_id: UserId) -> Result<Vec<ReportListItem>, ReportError> {
        Ok(self.reports.list_reports(user_id).await?)
    }

    /// Load one report with the quiz it was taken against.
    ///
    /// `raw_id` comes from navigation and is validated before any request.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidReportId` for a malformed id,
    /// `ReportError::NotFound` if no such report exists, or
    /// `ReportError::Content` if the stored quiz no longer validates.
    pub async fn report_detail(&self, raw_id: &str) -> Result<ReportDetail, ReportError> {
        let id: ReportId = raw_id.trim().parse()?;
        let joined = self.reports.get_report(id).await?;
        let quiz_title = joined.quiz.title.clone().unwrap_or_default();
        let quiz_subject = joined.quiz.subject.clone().unwrap_or_default();
        let content = joined.quiz.into_content()?;
        Ok(ReportDetail {
            report: joined.report,
            quiz_title,
            quiz_subject,
            content,
        })
    }
}

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use study_core::model::{
    Lecture, NewReport, ProgressSignal, QuizId, QuizReference, ReportId, ReportListItem,
    UpcomingEvent, UserId,
};

use super::SupabaseClient;
use super::rows::{
    EventRow, InsertedRow, LectureRow, ProgressRow, QuizRow, ReportDetailRow, ReportInsertRow,
    ReportListRow, RevisionRow, TakenRow, progress_signals,
};
use crate::repository::{
    LectureRepository, ProgressRepository, QuizRecord, QuizRepository, ReportRepository,
    ReportWithQuiz, StorageError,
};

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn first<T>(rows: Vec<T>) -> Result<T, StorageError> {
    rows.into_iter().next().ok_or(StorageError::NotFound)
}

#[async_trait]
impl QuizRepository for SupabaseClient {
    async fn list_quizzes(&self) -> Result<Vec<QuizReference>, StorageError> {
        let rows: Vec<QuizRow> = self
            .send_json(
                self.http
                    .get(self.rest("tests"))
                    .query(&[("select", "id,title,subject")]),
            )
            .await?;
        Ok(rows.into_iter().map(QuizReference::from).collect())
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<QuizRecord, StorageError> {
        let rows: Vec<QuizRecord> = self
            .send_json(
                self.http
                    .get(self.rest("tests"))
                    .query(&[("select", "*".to_owned()), ("id", eq(id))]),
            )
            .await?;
        first(rows)
    }

    async fn quiz_revision(&self, id: &QuizId) -> Result<Option<DateTime<Utc>>, StorageError> {
        let rows: Vec<RevisionRow> = self
            .send_json(
                self.http
                    .get(self.rest("tests"))
                    .query(&[("select", "updated_at".to_owned()), ("id", eq(id))]),
            )
            .await?;
        Ok(first(rows)?.updated_at)
    }
}

#[async_trait]
impl ReportRepository for SupabaseClient {
    async fn insert_report(&self, report: &NewReport) -> Result<ReportId, StorageError> {
        let body = ReportInsertRow {
            user_id: report.user_id.value(),
            test_id: report.quiz_id.as_str(),
            score: report.score,
            answers: &report.answers,
        };
        let rows: Vec<InsertedRow> = self
            .send_json(
                self.http
                    .post(self.rest("reports"))
                    .header("Prefer", "return=representation")
                    .query(&[("select", "id")])
                    .json(&body),
            )
            .await?;
        Ok(ReportId::new(first(rows)?.id))
    }

    async fn taken_quiz_ids(&self, user_id: UserId) -> Result<Vec<QuizId>, StorageError> {
        let rows: Vec<TakenRow> = self
            .send_json(
                self.http
                    .get(self.rest("reports"))
                    .query(&[("select", "test_id".to_owned()), ("user_id", eq(user_id))]),
            )
            .await?;
        Ok(rows.into_iter().map(|r| QuizId::new(r.test_id)).collect())
    }

    async fn list_reports(&self, user_id: UserId) -> Result<Vec<ReportListItem>, StorageError> {
        let rows: Vec<ReportListRow> = self
            .send_json(self.http.get(self.rest("reports")).query(&[
                ("select", "id,score,created_at,tests(title,subject)".to_owned()),
                ("user_id", eq(user_id)),
                ("order", "created_at.desc".to_owned()),
            ]))
            .await?;
        rows.into_iter().map(ReportListRow::into_item).collect()
    }

    async fn get_report(&self, id: ReportId) -> Result<ReportWithQuiz, StorageError> {
        let rows: Vec<ReportDetailRow> = self
            .send_json(self.http.get(self.rest("reports")).query(&[
                (
                    "select",
                    "id,user_id,test_id,score,answers,created_at,tests(*)".to_owned(),
                ),
                ("id", eq(id)),
            ]))
            .await?;
        let (report, quiz) = first(rows)?.into_parts()?;
        Ok(ReportWithQuiz { report, quiz })
    }
}

#[async_trait]
impl ProgressRepository for SupabaseClient {
    async fn upsert_progress(&self, signal: &ProgressSignal) -> Result<(), StorageError> {
        self.send_empty(
            self.http
                .post(self.rest("daily_progress"))
                .header("Prefer", "resolution=merge-duplicates")
                .query(&[("on_conflict", "user_id,date,test_type")])
                .json(&ProgressRow::from_signal(signal)),
        )
        .await
    }

    async fn progress_for_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<ProgressSignal>, StorageError> {
        let rows: Vec<ProgressRow> = self
            .send_json(self.http.get(self.rest("daily_progress")).query(&[
                ("select", "user_id,date,test_type,completed".to_owned()),
                ("user_id", eq(user_id)),
                ("date", eq(date.format("%Y-%m-%d"))),
            ]))
            .await?;
        Ok(progress_signals(rows))
    }
}

#[async_trait]
impl LectureRepository for SupabaseClient {
    async fn list_lectures(&self, limit: Option<u32>) -> Result<Vec<Lecture>, StorageError> {
        let mut query = vec![
            ("select", "id,title,subject,pdf_path,created_at,cover".to_owned()),
            ("order", "created_at.desc".to_owned()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let rows: Vec<LectureRow> = self
            .send_json(self.http.get(self.rest("lectures")).query(&query))
            .await?;
        Ok(rows.into_iter().map(Lecture::from).collect())
    }

    async fn list_upcoming_events(&self) -> Result<Vec<UpcomingEvent>, StorageError> {
        let rows: Vec<EventRow> = self
            .send_json(self.http.get(self.rest("upcoming_events")).query(&[
                ("select", "id,title,description,date_text"),
                ("order", "id.asc"),
            ]))
            .await?;
        Ok(rows.into_iter().map(UpcomingEvent::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_filter_formats_postgrest_operator() {
        assert_eq!(eq(QuizId::new("lawTFQ3")), "eq.lawTFQ3");
        assert_eq!(
            eq(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap().format("%Y-%m-%d")),
            "eq.2024-03-07"
        );
    }

    #[test]
    fn first_of_empty_is_not_found() {
        assert!(matches!(first::<u8>(Vec::new()), Err(StorageError::NotFound)));
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use study_core::model::{
    AnswerState, AuthSession, Lecture, LectureId, Profile, ProgressSignal, QuizCategory, QuizId,
    QuizReference, Report, ReportId, ReportListItem, UpcomingEvent, UserId,
};
use uuid::Uuid;

use crate::repository::{QuizRecord, SignUpRecord, StorageError};

fn score_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid score: {v}")))
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizRow {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

impl From<QuizRow> for QuizReference {
    fn from(row: QuizRow) -> Self {
        Self {
            id: QuizId::new(row.id),
            title: row.title.unwrap_or_default(),
            subject: row.subject.unwrap_or_default(),
            taken: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RevisionRow {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TakenRow {
    pub test_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportInsertRow<'a> {
    pub user_id: Uuid,
    pub test_id: &'a str,
    pub score: u32,
    pub answers: &'a AnswerState,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InsertedRow {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizTitleRow {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportListRow {
    pub id: Uuid,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tests: Option<QuizTitleRow>,
}

impl ReportListRow {
    pub fn into_item(self) -> Result<ReportListItem, StorageError> {
        let (quiz_title, quiz_subject) = self
            .tests
            .map(|t| (t.title.unwrap_or_default(), t.subject.unwrap_or_default()))
            .unwrap_or_default();
        Ok(ReportListItem {
            id: ReportId::new(self.id),
            score: score_from_i64(self.score)?,
            created_at: self.created_at,
            quiz_title,
            quiz_subject,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportDetailRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub test_id: String,
    pub score: i64,
    #[serde(default)]
    pub answers: AnswerState,
    pub created_at: DateTime<Utc>,
    pub tests: Option<QuizRecord>,
}

impl ReportDetailRow {
    pub fn into_parts(self) -> Result<(Report, QuizRecord), StorageError> {
        let quiz = self.tests.ok_or(StorageError::NotFound)?;
        let report = Report {
            id: ReportId::new(self.id),
            user_id: UserId::new(self.user_id),
            quiz_id: QuizId::new(self.test_id),
            score: score_from_i64(self.score)?,
            answers: self.answers,
            created_at: self.created_at,
        };
        Ok((report, quiz))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ProgressRow {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub test_type: String,
    pub completed: bool,
}

impl ProgressRow {
    pub fn from_signal(signal: &ProgressSignal) -> Self {
        Self {
            user_id: signal.user_id.value(),
            date: signal.date,
            test_type: signal.category.label().to_owned(),
            completed: signal.completed,
        }
    }

    /// `None` for rows whose `test_type` is not a known category.
    pub fn into_signal(self) -> Option<ProgressSignal> {
        match self.test_type.parse::<QuizCategory>() {
            Ok(category) => Some(ProgressSignal {
                user_id: UserId::new(self.user_id),
                date: self.date,
                category,
                completed: self.completed,
            }),
            Err(err) => {
                tracing::warn!(
                    test_type = %self.test_type,
                    error = %err,
                    "skipping progress row"
                );
                None
            }
        }
    }
}

/// Keeps the recognised signals of a day; unknown task types are dropped.
pub(crate) fn progress_signals(rows: Vec<ProgressRow>) -> Vec<ProgressSignal> {
    rows.into_iter().filter_map(ProgressRow::into_signal).collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct LectureRow {
    pub id: u64,
    pub title: String,
    pub subject: String,
    pub pdf_path: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cover: Option<String>,
}

impl From<LectureRow> for Lecture {
    fn from(row: LectureRow) -> Self {
        Self {
            id: LectureId::new(row.id),
            title: row.title,
            subject: row.subject,
            pdf_path: row.pdf_path,
            created_at: row.created_at,
            cover: row.cover,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventRow {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date_text: Option<String>,
}

impl From<EventRow> for UpcomingEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            date_text: row.date_text,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub(crate) struct ProfileRow {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            full_name: row.full_name,
            username: row.username,
            avatar_url: row.avatar_url,
        }
    }
}

impl From<&Profile> for ProfileRow {
    fn from(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            username: profile.username.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRow {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub user: UserRow,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        AuthSession::new(UserId::new(token.user.id), token.user.email, token.access_token)
    }
}

/// Sign-up answers either with a session (`access_token` + `user`) or, when
/// email confirmation is enabled, with the bare user object.
#[derive(Debug, Deserialize, Default)]
pub(crate) struct SignUpResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserRow>,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
}

impl SignUpResponse {
    pub fn into_record(self) -> SignUpRecord {
        match (self.access_token, self.user) {
            (Some(token), Some(user)) => {
                SignUpRecord::SignedIn(AuthSession::new(UserId::new(user.id), user.email, token))
            }
            (_, user) => SignUpRecord::PendingConfirmation {
                user_id: user.map(|u| u.id).or(self.id).map(UserId::new),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SignRequest {
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    pub signed_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_detail_row_carries_answers_and_quiz() {
        let row: ReportDetailRow = serde_json::from_value(json!({
            "id": "1b4e28ba-2fa1-41d2-883f-0016d3cca427",
            "user_id": "00000000-0000-0000-0000-000000000000",
            "test_id": "lawTFQ3",
            "score": 1,
            "answers": {"q1": 0},
            "created_at": "2024-03-07T10:00:00Z",
            "tests": {"id": "lawTFQ3", "title": "Contracts", "subject": "Law", "questions": []}
        }))
        .unwrap();
        let (report, quiz) = row.into_parts().unwrap();
        assert_eq!(report.score, 1);
        assert_eq!(report.answers.len(), 1);
        assert_eq!(quiz.title.as_deref(), Some("Contracts"));
    }

    #[test]
    fn negative_score_is_rejected() {
        let row: ReportListRow = serde_json::from_value(json!({
            "id": "1b4e28ba-2fa1-41d2-883f-0016d3cca427",
            "score": -1,
            "created_at": "2024-03-07T10:00:00Z",
            "tests": null
        }))
        .unwrap();
        assert!(row.into_item().is_err());
    }

    #[test]
    fn progress_row_uses_iso_date_and_label() {
        let signal = ProgressSignal::completed(
            UserId::new(Uuid::nil()),
            NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            QuizCategory::Tfq,
        );
        let value = serde_json::to_value(ProgressRow::from_signal(&signal)).unwrap();
        assert_eq!(value["date"], "2024-03-07");
        assert_eq!(value["test_type"], "TFQ");
        assert_eq!(value["completed"], true);

        let back: ProgressRow = serde_json::from_value(value).unwrap();
        assert_eq!(back.into_signal(), Some(signal));
    }

    #[test]
    fn unknown_progress_types_are_skipped() {
        let rows: Vec<ProgressRow> = serde_json::from_value(json!([
            {"user_id": "00000000-0000-0000-0000-000000000000", "date": "2024-03-07",
             "test_type": "MCQ", "completed": true},
            {"user_id": "00000000-0000-0000-0000-000000000000", "date": "2024-03-07",
             "test_type": "ESSAY", "completed": true}
        ]))
        .unwrap();
        let signals = progress_signals(rows);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].category, QuizCategory::Mcq);
        assert!(signals[0].completed);
    }

    #[test]
    fn null_quiz_title_defaults_to_empty() {
        let row: ReportListRow = serde_json::from_value(json!({
            "id": "1b4e28ba-2fa1-41d2-883f-0016d3cca427",
            "score": 2,
            "created_at": "2024-03-07T10:00:00Z",
            "tests": {"title": null, "subject": "Law"}
        }))
        .unwrap();
        let item = row.into_item().unwrap();
        assert_eq!(item.quiz_title, "");
        assert_eq!(item.quiz_subject, "Law");

        let quiz: QuizRow =
            serde_json::from_value(json!({"id": "lawTFQ3", "title": null, "subject": null}))
                .unwrap();
        let reference = QuizReference::from(quiz);
        assert_eq!(reference.id.as_str(), "lawTFQ3");
        assert!(reference.title.is_empty() && reference.subject.is_empty());
    }

    #[test]
    fn report_insert_row_matches_wire_shape() {
        let answers: AnswerState = [
            (study_core::model::QuestionId::new("1"), 0),
            (study_core::model::QuestionId::new("q2"), 3),
        ]
        .into_iter()
        .collect();
        let row = ReportInsertRow {
            user_id: Uuid::nil(),
            test_id: "logisticsMCQ1",
            score: 1,
            answers: &answers,
        };
        let value = serde_json::to_value(&row).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4);
        for key in ["user_id", "test_id", "score", "answers"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(value["user_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["test_id"], "logisticsMCQ1");
        assert_eq!(value["score"], 1);
        assert_eq!(value["answers"], json!({"1": 0, "q2": 3}));
    }

    #[test]
    fn sign_up_without_session_is_pending() {
        let response: SignUpResponse = serde_json::from_value(json!({
            "id": "1b4e28ba-2fa1-41d2-883f-0016d3cca427",
            "email": "a@b.c"
        }))
        .unwrap();
        assert!(matches!(
            response.into_record(),
            SignUpRecord::PendingConfirmation { user_id: Some(_) }
        ));

        let response: SignUpResponse = serde_json::from_value(json!({
            "access_token": "tok",
            "user": {"id": "1b4e28ba-2fa1-41d2-883f-0016d3cca427", "email": "a@b.c"}
        }))
        .unwrap();
        assert!(matches!(response.into_record(), SignUpRecord::SignedIn(_)));
    }
}

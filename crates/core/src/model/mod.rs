mod account;
mod answers;
mod catalog;
mod category;
mod ids;
mod progress;
mod quiz;
mod report;

pub use ids::{LectureId, ParseIdError, QuestionId, QuizId, ReportId, UserId};

pub use account::{AuthSession, Profile};
pub use answers::{AnswerState, QuestionOutcome, SubmissionResult};
pub use catalog::{
    group_by_subject, Lecture, LectureWithUrl, QuizListing, SubjectGroup, UpcomingEvent,
};
pub use category::{CategoryParseError, QuizCategory};
pub use progress::{DailyProgress, DailyTask, ProgressSignal};
pub use quiz::{Question, QuizContent, QuizContentError, QuizReference, ReferenceError};
pub use report::{NewReport, Report, ReportDetail, ReportListItem, ReviewedQuestion};

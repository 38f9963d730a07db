#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod catalog_service;
pub mod config;
pub mod error;
pub mod lecture_service;
pub mod progress_service;
pub mod quiz;
pub mod report_service;

pub use study_core::Clock;

pub use app_services::{AppServices, UserServices};
pub use auth_service::{AuthService, SignUpOutcome};
pub use catalog_service::CatalogService;
pub use config::BackendConfig;
pub use error::{
    AppServicesError, AuthError, CatalogError, ConfigError, ContentError, LectureError,
    ProgressError, QuizError, ReportError,
};
pub use lecture_service::{DEFAULT_LATEST, LectureBucket, LectureService, SIGNED_URL_TTL};
pub use progress_service::ProgressService;
pub use quiz::{
    ContentSource, OptionHighlight, QuizSession, QuizSessionService, SessionState, SessionView,
    SubmitOutcome,
};
pub use report_service::ReportService;

use std::sync::Arc;

use storage::Storage;
use storage::supabase::{SupabaseClient, SupabaseConfig};
use study_core::model::AuthSession;

use crate::Clock;
use crate::auth_service::AuthService;
use crate::catalog_service::CatalogService;
use crate::config::BackendConfig;
use crate::error::AppServicesError;
use crate::lecture_service::{LectureBucket, LectureService};
use crate::progress_service::ProgressService;
use crate::quiz::QuizSessionService;
use crate::report_service::ReportService;

/// Assembles app-facing services over one storage backend.
///
/// Only account access is available before sign-in; everything else is
/// obtained per user through [`AppServices::for_session`].
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    remote: Option<SupabaseClient>,
    lecture_bucket: LectureBucket,
    auth: Arc<AuthService>,
}

impl AppServices {
    /// Build services against Supabase with a `SQLite` content cache.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if the cache database cannot be
    /// opened or migrated.
    pub async fn from_config(config: &BackendConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let client = SupabaseClient::new(SupabaseConfig::new(
            config.supabase_url.clone(),
            config.anon_key.clone(),
        ));
        let storage = Storage::supabase(&client)
            .with_sqlite_cache(&config.cache_db)
            .await?;
        let mut services = Self::from_storage(storage, clock, config.lecture_bucket.clone());
        services.remote = Some(client);
        Ok(services)
    }

    /// Build services over an already assembled storage, e.g. in memory.
    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, lecture_bucket: LectureBucket) -> Self {
        let auth = Arc::new(AuthService::new(Arc::clone(&storage.auth)));
        Self {
            clock,
            storage,
            remote: None,
            lecture_bucket,
            auth,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    /// Services acting for the signed-in user of `session`.
    ///
    /// Remote requests made through them carry the session's access token;
    /// the local cache is shared across users.
    #[must_use]
    pub fn for_session(&self, session: AuthSession) -> UserServices {
        let storage = match &self.remote {
            Some(client) => Storage::supabase(&client.with_session(&session))
                .with_cache(Arc::clone(&self.storage.cache)),
            None => self.storage.clone(),
        };
        UserServices::new(self.clock, session, &storage, self.lecture_bucket.clone())
    }
}

/// Services scoped to one signed-in user.
#[derive(Clone)]
pub struct UserServices {
    session: AuthSession,
    quiz: Arc<QuizSessionService>,
    catalog: Arc<CatalogService>,
    reports: Arc<ReportService>,
    progress: Arc<ProgressService>,
    lectures: Arc<LectureService>,
}

impl UserServices {
    fn new(clock: Clock, session: AuthSession, storage: &Storage, bucket: LectureBucket) -> Self {
        let quiz = Arc::new(QuizSessionService::new(
            clock,
            session.clone(),
            Arc::clone(&storage.cache),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.reports),
            Arc::clone(&storage.progress),
        ));
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.reports),
            Arc::clone(&storage.lectures),
        ));
        let reports = Arc::new(ReportService::new(Arc::clone(&storage.reports)));
        let progress = Arc::new(ProgressService::new(clock, Arc::clone(&storage.progress)));
        let lectures = Arc::new(LectureService::new(
            Arc::clone(&storage.lectures),
            Arc::clone(&storage.objects),
            bucket,
        ));
        Self {
            session,
            quiz,
            catalog,
            reports,
            progress,
            lectures,
        }
    }

    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.reports)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn lectures(&self) -> Arc<LectureService> {
        Arc::clone(&self.lectures)
    }
}

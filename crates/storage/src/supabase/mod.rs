//! Supabase adapter: PostgREST tables, GoTrue auth, and object storage
//! over HTTPS.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use study_core::model::AuthSession;

use crate::memory::InMemoryRepository;
use crate::repository::{
    AuthGateway, LectureRepository, LocalCache, ObjectStore, ProgressRepository, QuizRepository,
    ReportRepository, Storage, StorageError,
};

mod auth;
mod objects;
mod rest;
mod rows;

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }
}

/// HTTP client for one Supabase project, optionally acting for a signed-in user.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: Arc<SupabaseConfig>,
    access_token: Option<String>,
}

impl SupabaseClient {
    #[must_use]
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            http: Client::new(),
            config: Arc::new(config),
            access_token: None,
        }
    }

    /// A client whose requests carry the user's access token, so row-level
    /// security applies to that user.
    #[must_use]
    pub fn with_session(&self, session: &AuthSession) -> Self {
        Self {
            http: self.http.clone(),
            config: Arc::clone(&self.config),
            access_token: Some(session.access_token.clone()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn rest(&self, table: &str) -> String {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .access_token
            .as_deref()
            .unwrap_or(self.config.anon_key.as_str());
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StorageError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), StorageError> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        tracing::debug!(%status, %message, "supabase request rejected");
        Err(status_error(status, message))
    }
}

fn status_error(status: StatusCode, message: String) -> StorageError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Unauthorized,
        StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => StorageError::NotFound,
        StatusCode::CONFLICT => StorageError::Conflict,
        other => StorageError::Backend {
            status: other.as_u16(),
            message,
        },
    }
}

impl Storage {
    /// Build a `Storage` whose remote ports talk to Supabase through `client`.
    ///
    /// The local cache starts in memory; see [`Storage::with_sqlite_cache`].
    #[must_use]
    pub fn supabase(client: &SupabaseClient) -> Self {
        let cache: Arc<dyn LocalCache> = Arc::new(InMemoryRepository::new());
        let quizzes: Arc<dyn QuizRepository> = Arc::new(client.clone());
        let reports: Arc<dyn ReportRepository> = Arc::new(client.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(client.clone());
        let lectures: Arc<dyn LectureRepository> = Arc::new(client.clone());
        let objects: Arc<dyn ObjectStore> = Arc::new(client.clone());
        let auth: Arc<dyn AuthGateway> = Arc::new(client.clone());
        Self {
            cache,
            quizzes,
            reports,
            progress,
            lectures,
            objects,
            auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_without_double_slashes() {
        let client = SupabaseClient::new(SupabaseConfig::new("https://abc.supabase.co/", "anon"));
        assert_eq!(client.rest("tests"), "https://abc.supabase.co/rest/v1/tests");
        assert_eq!(
            client.endpoint("/auth/v1/logout"),
            "https://abc.supabase.co/auth/v1/logout"
        );
    }

    #[test]
    fn statuses_map_to_storage_errors() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            StorageError::Unauthorized
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, String::new()),
            StorageError::Conflict
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "bad".into()),
            StorageError::Backend { status: 400, .. }
        ));
    }

    #[test]
    fn client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SupabaseClient>();
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::repository::{LocalCache, QuizRecord, QuizRepository};
use study_core::model::{QuizContent, QuizId};
use tracing::{debug, warn};

use crate::error::ContentError;

/// Cache key under which a quiz's content is stored.
#[must_use]
pub fn cache_key(id: &QuizId) -> String {
    format!("quiz_{id}")
}

/// Where loaded content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Cache,
    Remote,
}

/// Blob written to the local cache.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    #[serde(default)]
    version: Option<DateTime<Utc>>,
    cached_at: DateTime<Utc>,
    content: QuizRecord,
}

/// Read-through cache over the quiz gateway.
#[derive(Clone)]
pub struct QuizContentLoader {
    cache: Arc<dyn LocalCache>,
    quizzes: Arc<dyn QuizRepository>,
    check_revision: bool,
}

impl QuizContentLoader {
    #[must_use]
    pub fn new(cache: Arc<dyn LocalCache>, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self {
            cache,
            quizzes,
            check_revision: true,
        }
    }

    /// Whether cached entries are compared against the remote revision
    /// before being trusted.
    #[must_use]
    pub fn with_revision_check(mut self, check_revision: bool) -> Self {
        self.check_revision = check_revision;
        self
    }

    /// Resolve content for `id`, preferring a fresh cache entry.
    ///
    /// Cache faults never fail the load; they are logged and the gateway is
    /// used instead.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` if the remote fetch fails or returns content
    /// that does not validate.
    pub async fn load(
        &self,
        id: &QuizId,
        now: DateTime<Utc>,
    ) -> Result<(QuizContent, ContentSource), ContentError> {
        let key = cache_key(id);
        if let Some(content) = self.read_cached(id, &key).await {
            return Ok((content, ContentSource::Cache));
        }

        let record = self.quizzes.get_quiz(id).await?;
        let content = record.clone().into_content()?;
        debug!(quiz_id = %id, questions = content.len(), "quiz content fetched");
        self.write_cached(&key, record, now).await;
        Ok((content, ContentSource::Remote))
    }

    async fn read_cached(&self, id: &QuizId, key: &str) -> Option<QuizContent> {
        let blob = match self.cache.get(key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!(quiz_id = %id, "quiz cache miss");
                return None;
            }
            Err(err) => {
                warn!(quiz_id = %id, error = %err, "quiz cache read failed");
                return None;
            }
        };

        let envelope = match serde_json::from_str::<CacheEnvelope>(&blob) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(quiz_id = %id, error = %err, "discarding unreadable quiz cache entry");
                return None;
            }
        };
        let version = envelope.version;
        let content = match envelope.content.into_content() {
            Ok(content) => content,
            Err(err) => {
                warn!(quiz_id = %id, error = %err, "discarding invalid quiz cache entry");
                return None;
            }
        };

        if self.is_stale(id, version).await {
            debug!(quiz_id = %id, "quiz cache entry is stale");
            return None;
        }
        debug!(quiz_id = %id, cached_at = %envelope.cached_at, "quiz cache hit");
        Some(content)
    }

    /// Entries without a version, or whose revision cannot be probed, are
    /// trusted as is.
    async fn is_stale(&self, id: &QuizId, version: Option<DateTime<Utc>>) -> bool {
        let Some(cached) = version else {
            return false;
        };
        if !self.check_revision {
            return false;
        }
        match self.quizzes.quiz_revision(id).await {
            Ok(Some(current)) => current != cached,
            Ok(None) => false,
            Err(err) => {
                warn!(quiz_id = %id, error = %err, "quiz revision probe failed; using cache");
                false
            }
        }
    }

    async fn write_cached(&self, key: &str, record: QuizRecord, now: DateTime<Utc>) {
        let envelope = CacheEnvelope {
            version: record.updated_at,
            cached_at: now,
            content: record,
        };
        let blob = match serde_json::to_string(&envelope) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(key, error = %err, "failed to encode quiz cache entry");
                return;
            }
        };
        if let Err(err) = self.cache.set(key, &blob).await {
            warn!(key, error = %err, "quiz cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use storage::repository::{QuestionKey, QuestionRecord};
    use storage::{FailPoint, InMemoryRepository};

    fn record(updated_at: Option<DateTime<Utc>>) -> QuizRecord {
        QuizRecord {
            id: "bioMCQ1".into(),
            title: Some("Cells".into()),
            subject: Some("Biology".into()),
            test_type: None,
            updated_at,
            questions: vec![QuestionRecord {
                id: QuestionKey::Text("q1".into()),
                question_title: "Powerhouse?".into(),
                answers: vec!["Mitochondria".into(), "Nucleus".into()],
                correct_answer_index: 0,
                explanation: None,
            }],
        }
    }

    fn loader(repo: &InMemoryRepository) -> QuizContentLoader {
        QuizContentLoader::new(Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 9, 0, 0).unwrap()
    }

    #[test]
    fn cache_key_prefixes_quiz_id() {
        assert_eq!(cache_key(&QuizId::new("bioMCQ1")), "quiz_bioMCQ1");
    }

    #[tokio::test]
    async fn miss_fetches_once_and_writes_through() {
        let repo = InMemoryRepository::new();
        repo.put_quiz(record(None)).unwrap();
        let loader = loader(&repo);
        let id = QuizId::new("bioMCQ1");

        let (content, source) = loader.load(&id, now()).await.unwrap();
        assert_eq!(source, ContentSource::Remote);
        assert_eq!(content.len(), 1);
        assert_eq!(repo.quiz_fetches(), 1);

        let blob = repo.get("quiz_bioMCQ1").await.unwrap().unwrap();
        let envelope: CacheEnvelope = serde_json::from_str(&blob).unwrap();
        assert_eq!(envelope.cached_at, now());
        assert_eq!(envelope.content, record(None));

        let (_, source) = loader.load(&id, now()).await.unwrap();
        assert_eq!(source, ContentSource::Cache);
        assert_eq!(repo.quiz_fetches(), 1);
    }

    #[tokio::test]
    async fn unreadable_entry_is_refetched_and_overwritten() {
        let repo = InMemoryRepository::new();
        repo.put_quiz(record(None)).unwrap();
        repo.set("quiz_bioMCQ1", "{not json").await.unwrap();

        let (_, source) = loader(&repo)
            .load(&QuizId::new("bioMCQ1"), now())
            .await
            .unwrap();
        assert_eq!(source, ContentSource::Remote);
        let blob = repo.get("quiz_bioMCQ1").await.unwrap().unwrap();
        assert!(serde_json::from_str::<CacheEnvelope>(&blob).is_ok());
    }

    #[tokio::test]
    async fn changed_revision_invalidates_entry() {
        let old = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let repo = InMemoryRepository::new();
        repo.put_quiz(record(Some(old))).unwrap();
        let loader = loader(&repo);
        let id = QuizId::new("bioMCQ1");

        loader.load(&id, now()).await.unwrap();
        repo.put_quiz(record(Some(new))).unwrap();

        let (content, source) = loader.load(&id, now()).await.unwrap();
        assert_eq!(source, ContentSource::Remote);
        assert_eq!(content.updated_at(), Some(new));
        assert_eq!(repo.quiz_fetches(), 2);
        assert_eq!(repo.revision_probes(), 1);
    }

    #[tokio::test]
    async fn versioned_hit_probes_revision_once_and_skips_fetch() {
        let rev = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let repo = InMemoryRepository::new();
        repo.put_quiz(record(Some(rev))).unwrap();
        let loader = loader(&repo);
        let id = QuizId::new("bioMCQ1");

        loader.load(&id, now()).await.unwrap();
        assert_eq!(repo.revision_probes(), 0);

        let (_, source) = loader.load(&id, now()).await.unwrap();
        assert_eq!(source, ContentSource::Cache);
        assert_eq!(repo.quiz_fetches(), 1);
        assert_eq!(repo.revision_probes(), 1);
    }

    #[tokio::test]
    async fn unversioned_hit_makes_no_remote_call() {
        let repo = InMemoryRepository::new();
        repo.put_quiz(record(None)).unwrap();
        let loader = loader(&repo);
        let id = QuizId::new("bioMCQ1");

        loader.load(&id, now()).await.unwrap();
        loader.load(&id, now()).await.unwrap();
        assert_eq!(repo.quiz_fetches(), 1);
        assert_eq!(repo.revision_probes(), 0);
    }

    #[tokio::test]
    async fn failed_revision_probe_trusts_cache() {
        let rev = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let repo = InMemoryRepository::new();
        repo.put_quiz(record(Some(rev))).unwrap();
        let loader = loader(&repo);
        let id = QuizId::new("bioMCQ1");

        loader.load(&id, now()).await.unwrap();
        repo.set_failure(FailPoint::QuizRevision, true);
        repo.set_failure(FailPoint::QuizFetch, true);

        let (_, source) = loader.load(&id, now()).await.unwrap();
        assert_eq!(source, ContentSource::Cache);
    }

    #[tokio::test]
    async fn disabled_revision_check_never_probes() {
        let rev = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let repo = InMemoryRepository::new();
        repo.put_quiz(record(Some(rev))).unwrap();
        let loader = loader(&repo).with_revision_check(false);
        let id = QuizId::new("bioMCQ1");

        loader.load(&id, now()).await.unwrap();
        loader.load(&id, now()).await.unwrap();
        assert_eq!(repo.revision_probes(), 0);
        assert_eq!(repo.quiz_fetches(), 1);
    }

    #[tokio::test]
    async fn cache_faults_degrade_to_remote() {
        let repo = InMemoryRepository::new();
        repo.put_quiz(record(None)).unwrap();
        repo.set_failure(FailPoint::CacheRead, true);
        repo.set_failure(FailPoint::CacheWrite, true);

        let (_, source) = loader(&repo)
            .load(&QuizId::new("bioMCQ1"), now())
            .await
            .unwrap();
        assert_eq!(source, ContentSource::Remote);
    }

    #[tokio::test]
    async fn remote_failure_surfaces() {
        let repo = InMemoryRepository::new();
        let err = loader(&repo)
            .load(&QuizId::new("missing"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Storage(_)));
    }
}

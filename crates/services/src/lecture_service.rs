use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use storage::StorageError;
use storage::repository::{LectureRepository, ObjectStore};
use study_core::model::{Lecture, LectureWithUrl, SubjectGroup, group_by_subject};
use tracing::debug;

use crate::error::LectureError;

/// Lifetime of signed lecture URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Number of lectures shown on the home screen.
pub const DEFAULT_LATEST: u32 = 3;

/// Where lecture PDFs live and whether they need signing.
///
/// The default is the private `lectures` bucket, which is how the lecture
/// screens are deployed. Set `private: false` (or
/// `STUDY_LECTURES_PRIVATE=false`) for a public bucket to skip signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureBucket {
    pub name: String,
    pub private: bool,
}

impl Default for LectureBucket {
    fn default() -> Self {
        Self {
            name: "lectures".into(),
            private: true,
        }
    }
}

/// Lecture listings with document URLs resolved.
#[derive(Clone)]
pub struct LectureService {
    lectures: Arc<dyn LectureRepository>,
    objects: Arc<dyn ObjectStore>,
    bucket: LectureBucket,
}

impl LectureService {
    #[must_use]
    pub fn new(
        lectures: Arc<dyn LectureRepository>,
        objects: Arc<dyn ObjectStore>,
        bucket: LectureBucket,
    ) -> Self {
        Self {
            lectures,
            objects,
            bucket,
        }
    }

    /// Every lecture, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LectureError::Storage` if the listing or any URL signing fails.
    pub async fn list(&self) -> Result<Vec<LectureWithUrl>, LectureError> {
        let lectures = self.lectures.list_lectures(None).await?;
        self.with_urls(lectures).await
    }

    /// The `limit` most recent lectures.
    ///
    /// # Errors
    ///
    /// Returns `LectureError::Storage` if the listing or any URL signing fails.
    pub async fn latest(&self, limit: u32) -> Result<Vec<LectureWithUrl>, LectureError> {
        let lectures = self.lectures.list_lectures(Some(limit)).await?;
        self.with_urls(lectures).await
    }

    /// Every lecture grouped by subject.
    ///
    /// # Errors
    ///
    /// Returns `LectureError::Storage` if the listing or any URL signing fails.
    pub async fn by_subject(&self) -> Result<Vec<SubjectGroup<LectureWithUrl>>, LectureError> {
        let lectures = self.list().await?;
        Ok(group_by_subject(lectures, |l| l.lecture.subject.as_str()))
    }

    async fn with_urls(&self, lectures: Vec<Lecture>) -> Result<Vec<LectureWithUrl>, LectureError> {
        let resolved = try_join_all(lectures.into_iter().map(|lecture| self.resolve(lecture))).await?;
        debug!(
            lectures = resolved.len(),
            bucket = %self.bucket.name,
            private = self.bucket.private,
            "lecture urls resolved"
        );
        Ok(resolved)
    }

    async fn resolve(&self, lecture: Lecture) -> Result<LectureWithUrl, StorageError> {
        let url = if self.bucket.private {
            self.objects
                .signed_url(&self.bucket.name, &lecture.pdf_path, SIGNED_URL_TTL)
                .await?
        } else {
            self.objects.public_url(&self.bucket.name, &lecture.pdf_path)
        };
        Ok(LectureWithUrl { lecture, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bucket_is_private_lectures() {
        let bucket = LectureBucket::default();
        assert_eq!(bucket.name, "lectures");
        assert!(bucket.private);
    }
}

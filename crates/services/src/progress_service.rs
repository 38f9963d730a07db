use std::sync::Arc;

use storage::repository::ProgressRepository;
use study_core::model::{DailyProgress, UserId};

use crate::Clock;
use crate::error::ProgressError;

/// Daily task checklist built from progress signals.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Progress of `user_id` on the clock's current day.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn today(&self, user_id: UserId) -> Result<DailyProgress, ProgressError> {
        let date = self.clock.today();
        let signals = self.progress.progress_for_day(user_id, date).await?;
        Ok(DailyProgress::from_signals(date, &signals))
    }
}

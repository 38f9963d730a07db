use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::category::QuizCategory;
use crate::model::ids::UserId;

/// Per-user, per-day, per-category completion marker.
///
/// `(user_id, date, category)` is the uniqueness key for upserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSignal {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub category: QuizCategory,
    pub completed: bool,
}

impl ProgressSignal {
    #[must_use]
    pub fn completed(user_id: UserId, date: NaiveDate, category: QuizCategory) -> Self {
        Self {
            user_id,
            date,
            category,
            completed: true,
        }
    }

    /// Date in the `YYYY-MM-DD` form used as part of the key.
    #[must_use]
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// One entry of the "tasks done today" checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTask {
    pub category: QuizCategory,
    pub completed: bool,
}

/// Today's progress over the required task categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyProgress {
    date: NaiveDate,
    tasks: Vec<DailyTask>,
}

impl DailyProgress {
    /// Build the checklist for `date` from whatever signals were recorded.
    ///
    /// Signals for other days or with `completed = false` do not tick a task.
    #[must_use]
    pub fn from_signals(date: NaiveDate, signals: &[ProgressSignal]) -> Self {
        let tasks = QuizCategory::DAILY_TASKS
            .iter()
            .map(|&category| DailyTask {
                category,
                completed: signals
                    .iter()
                    .any(|s| s.date == date && s.category == category && s.completed),
            })
            .collect();
        Self { date, tasks }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn tasks(&self) -> &[DailyTask] {
        &self.tasks
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.completed() == self.total()
    }
}

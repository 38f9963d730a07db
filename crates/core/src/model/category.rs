use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuizId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown quiz category: {0}")]
pub struct CategoryParseError(pub String);

/// Coarse quiz classification used to key daily progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuizCategory {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "TFQ")]
    Tfq,
    #[serde(rename = "OTHER")]
    Other,
}

impl QuizCategory {
    /// Categories that make up the "tasks done today" checklist.
    pub const DAILY_TASKS: [QuizCategory; 2] = [QuizCategory::Mcq, QuizCategory::Tfq];

    /// Infer the category from a quiz id by token match.
    ///
    /// `MCQ` is checked before `TFQ`; anything else is `Other`.
    #[must_use]
    pub fn classify(id: &QuizId) -> Self {
        let raw = id.as_str();
        if raw.contains("MCQ") {
            Self::Mcq
        } else if raw.contains("TFQ") {
            Self::Tfq
        } else {
            Self::Other
        }
    }

    /// Prefer an explicit category carried by the quiz record, falling back
    /// to id classification.
    #[must_use]
    pub fn resolve(explicit: Option<Self>, id: &QuizId) -> Self {
        explicit.unwrap_or_else(|| Self::classify(id))
    }

    /// Storage label (`test_type` column).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Mcq => "MCQ",
            Self::Tfq => "TFQ",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for QuizCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuizCategory {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MCQ" => Ok(Self::Mcq),
            "TFQ" => Ok(Self::Tfq),
            "OTHER" => Ok(Self::Other),
            other => Err(CategoryParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_token() {
        assert_eq!(
            QuizCategory::classify(&QuizId::new("logisticsMCQ1")),
            QuizCategory::Mcq
        );
        assert_eq!(
            QuizCategory::classify(&QuizId::new("lawTFQ3")),
            QuizCategory::Tfq
        );
        assert_eq!(
            QuizCategory::classify(&QuizId::new("misc42")),
            QuizCategory::Other
        );
    }

    #[test]
    fn classify_is_case_sensitive_and_mcq_first() {
        assert_eq!(
            QuizCategory::classify(&QuizId::new("lawmcq1")),
            QuizCategory::Other
        );
        assert_eq!(
            QuizCategory::classify(&QuizId::new("MCQ_TFQ_mix")),
            QuizCategory::Mcq
        );
    }

    #[test]
    fn explicit_category_wins() {
        let id = QuizId::new("logisticsMCQ1");
        assert_eq!(
            QuizCategory::resolve(Some(QuizCategory::Tfq), &id),
            QuizCategory::Tfq
        );
        assert_eq!(QuizCategory::resolve(None, &id), QuizCategory::Mcq);
    }

    #[test]
    fn labels_round_trip() {
        for category in [QuizCategory::Mcq, QuizCategory::Tfq, QuizCategory::Other] {
            assert_eq!(category.label().parse::<QuizCategory>().unwrap(), category);
        }
        assert!("mcq".parse::<QuizCategory>().is_err());
    }
}

use std::env;

use crate::error::ConfigError;
use crate::lecture_service::LectureBucket;

pub const DEFAULT_CACHE_DB: &str = "sqlite:study-cache.db?mode=rwc";

/// Backend endpoints and local storage locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub supabase_url: String,
    pub anon_key: String,
    pub cache_db: String,
    pub lecture_bucket: LectureBucket,
}

impl BackendConfig {
    /// Read configuration from `STUDY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the backend URL or key is unset,
    /// `ConfigError::Invalid` for an unparsable flag.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| value(name).ok_or(ConfigError::Missing(name));

        let supabase_url = required("STUDY_SUPABASE_URL")?;
        let anon_key = required("STUDY_SUPABASE_ANON_KEY")?;
        let cache_db = value("STUDY_CACHE_DB").unwrap_or_else(|| DEFAULT_CACHE_DB.into());

        let mut lecture_bucket = LectureBucket::default();
        if let Some(name) = value("STUDY_LECTURE_BUCKET") {
            lecture_bucket.name = name;
        }
        if let Some(raw) = value("STUDY_LECTURES_PRIVATE") {
            lecture_bucket.private = parse_flag("STUDY_LECTURES_PRIVATE", &raw)?;
        }

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_owned(),
            anon_key,
            cache_db,
            lecture_bucket,
        })
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<BackendConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        BackendConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_unset() {
        let cfg = config(&[
            ("STUDY_SUPABASE_URL", "https://x.supabase.co/"),
            ("STUDY_SUPABASE_ANON_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(cfg.supabase_url, "https://x.supabase.co");
        assert_eq!(cfg.cache_db, DEFAULT_CACHE_DB);
        assert_eq!(cfg.lecture_bucket, LectureBucket::default());
    }

    #[test]
    fn missing_backend_is_reported_by_name() {
        let err = config(&[("STUDY_SUPABASE_URL", "https://x.supabase.co")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("STUDY_SUPABASE_ANON_KEY")));
    }

    #[test]
    fn lecture_bucket_overrides() {
        let cfg = config(&[
            ("STUDY_SUPABASE_URL", "https://x.supabase.co"),
            ("STUDY_SUPABASE_ANON_KEY", "anon"),
            ("STUDY_LECTURE_BUCKET", "pdfs"),
            ("STUDY_LECTURES_PRIVATE", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.lecture_bucket.name, "pdfs");
        assert!(!cfg.lecture_bucket.private);
    }

    #[test]
    fn bad_flag_is_rejected() {
        let err = config(&[
            ("STUDY_SUPABASE_URL", "https://x.supabase.co"),
            ("STUDY_SUPABASE_ANON_KEY", "anon"),
            ("STUDY_LECTURES_PRIVATE", "maybe"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}

use std::env;
use std::time::Duration;

use anyhow::{Context, anyhow};

/// Firebase project settings.
///
/// Environment variables:
/// - FIREBASE_PROJECT_ID: project whose ID tokens are accepted (required)
/// - FIREBASE_DATABASE_URL: Realtime Database root URL
/// - FIREBASE_STORAGE_BUCKET: Storage bucket for product images
/// - FIREBASE_AUTH_TOKEN: credential sent with database and storage calls
/// - FIREBASE_REQUEST_TIMEOUT_SECS: per-request timeout (default: 30)
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub database_url: Option<String>,
    pub storage_bucket: Option<String>,
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
}

impl FirebaseConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        let project_id = non_empty("FIREBASE_PROJECT_ID").context("FIREBASE_PROJECT_ID must be set")?;
        let request_timeout = match non_empty("FIREBASE_REQUEST_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(secs.trim().parse().with_context(|| {
                format!("FIREBASE_REQUEST_TIMEOUT_SECS is not a number: {secs}")
            })?),
            None => Duration::from_secs(30),
        };

        Ok(Self {
            project_id,
            database_url: non_empty("FIREBASE_DATABASE_URL"),
            storage_bucket: non_empty("FIREBASE_STORAGE_BUCKET"),
            auth_token: non_empty("FIREBASE_AUTH_TOKEN"),
            request_timeout,
        })
    }

    /// Database URL and bucket, both needed by the Firebase catalog backend.
    pub fn backend_endpoints(&self) -> anyhow::Result<(&str, &str)> {
        let database_url = self
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow!("FIREBASE_DATABASE_URL must be set for the firebase backend"))?;
        let bucket = self
            .storage_bucket
            .as_deref()
            .ok_or_else(|| anyhow!("FIREBASE_STORAGE_BUCKET must be set for the firebase backend"))?;
        Ok((database_url, bucket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn should_require_project_id() {
        let err = FirebaseConfig::from_vars(vars(&[])).unwrap_err();

        assert!(err.to_string().contains("FIREBASE_PROJECT_ID"));
    }

    #[test]
    fn should_name_missing_backend_endpoint() {
        let config = FirebaseConfig::from_vars(vars(&[
            ("FIREBASE_PROJECT_ID", "shop"),
            ("FIREBASE_DATABASE_URL", "https://shop.firebaseio.com"),
        ]))
        .unwrap();

        let err = config.backend_endpoints().unwrap_err();

        assert!(err.to_string().contains("FIREBASE_STORAGE_BUCKET"));
    }

    #[test]
    fn should_read_timeout_and_ignore_blank_token() {
        let config = FirebaseConfig::from_vars(vars(&[
            ("FIREBASE_PROJECT_ID", "shop"),
            ("FIREBASE_AUTH_TOKEN", " "),
            ("FIREBASE_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.auth_token.is_none());
    }
}

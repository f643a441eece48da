use crate::errors::AppError;
use reqwest::Url;
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PREFS_PATH: &str = "data/preferences.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub widget_settle: Duration,
    pub backdrop_settle: Duration,
    pub navigate_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            widget_settle: Duration::from_millis(100),
            backdrop_settle: Duration::from_millis(300),
            navigate_delay: Duration::from_millis(500),
        }
    }
}

impl Timings {
    pub fn immediate() -> Self {
        Self {
            widget_settle: Duration::ZERO,
            backdrop_settle: Duration::ZERO,
            navigate_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub page_path: Option<String>,
    pub csrf_token: Option<String>,
    pub prefs_path: PathBuf,
    pub toasts: bool,
    pub timings: Timings,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let raw_base = lookup("MODAL_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&raw_base)
            .map_err(|err| AppError::config(format!("MODAL_BASE_URL {raw_base:?}: {err}")))?;

        let prefs_path = lookup("APP_PREFS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFS_PATH));

        let toasts = lookup("MODAL_TOAST")
            .map(|value| !matches!(value.trim(), "0" | "false" | "off"))
            .unwrap_or(true);

        Ok(Self {
            base_url,
            page_path: lookup("MODAL_PAGE_PATH").filter(|path| !path.is_empty()),
            csrf_token: lookup("MODAL_CSRF_TOKEN").filter(|token| !token.is_empty()),
            prefs_path,
            toasts,
            timings: Timings::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.prefs_path, PathBuf::from(DEFAULT_PREFS_PATH));
        assert!(config.toasts);
        assert_eq!(config.page_path, None);
        assert_eq!(config.timings, Timings::default());
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("MODAL_BASE_URL", "https://erp.example.com"),
            ("MODAL_PAGE_PATH", "/contracts/"),
            ("MODAL_CSRF_TOKEN", "abc"),
            ("APP_PREFS_PATH", "/tmp/prefs.json"),
            ("MODAL_TOAST", "0"),
        ]))
        .unwrap();
        assert_eq!(config.base_url.host_str(), Some("erp.example.com"));
        assert_eq!(config.page_path.as_deref(), Some("/contracts/"));
        assert_eq!(config.csrf_token.as_deref(), Some("abc"));
        assert_eq!(config.prefs_path, PathBuf::from("/tmp/prefs.json"));
        assert!(!config.toasts);
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = ClientConfig::from_lookup(lookup_from(&[("MODAL_BASE_URL", "not a url")]))
            .unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Config);
    }
}

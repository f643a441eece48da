use crate::errors::AppError;
use crate::preferences::UiPreferences;
use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;
use tracing::{debug, error};

const SIDEBAR_KEY: &str = "sidebar_collapsed";
const LEGACY_SIDEBAR_KEYS: [&str; 2] = ["sidebar-minimize", "sidebarState"];

pub async fn load_preferences(path: &Path) -> UiPreferences {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return UiPreferences::default(),
        Err(err) => {
            error!(path = %path.display(), "failed to read preferences file: {err}");
            return UiPreferences::default();
        }
    };
    match decode_preferences(&bytes) {
        Ok(prefs) => prefs,
        Err(err) => {
            error!(path = %path.display(), "failed to parse preferences file: {err}");
            UiPreferences::default()
        }
    }
}

fn decode_preferences(bytes: &[u8]) -> Result<UiPreferences, serde_json::Error> {
    let mut raw: Value = serde_json::from_slice(bytes)?;
    if let Some(object) = raw.as_object_mut() {
        fold_sidebar_keys(object);
        settle_theme(object);
    }
    serde_json::from_value(raw)
}

/// Merges the browser-era sidebar keys into `sidebar_collapsed`.
///
/// Any key saying the sidebar was minimized wins, the way the old layout
/// restored it.
fn fold_sidebar_keys(object: &mut Map<String, Value>) {
    let mut collapsed = None;
    for key in std::iter::once(SIDEBAR_KEY).chain(LEGACY_SIDEBAR_KEYS) {
        let Some(value) = object.remove(key) else {
            continue;
        };
        if key != SIDEBAR_KEY {
            debug!(key, "reading legacy sidebar preference");
        }
        let flag = match value {
            Value::Bool(flag) => flag,
            Value::String(text) => text == "true" || text == "collapsed",
            _ => false,
        };
        collapsed = Some(collapsed.unwrap_or(false) || flag);
    }
    if let Some(collapsed) = collapsed {
        object.insert(SIDEBAR_KEY.to_string(), Value::Bool(collapsed));
    }
}

/// Anything other than `light` means the dark theme.
fn settle_theme(object: &mut Map<String, Value>) {
    let Some(theme) = object.get_mut("theme") else {
        return;
    };
    if theme.as_str() != Some("light") {
        *theme = Value::String("dark".to_string());
    }
}

pub async fn persist_preferences(path: &Path, prefs: &UiPreferences) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(prefs).map_err(AppError::storage)?;
    fs::write(path, payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Theme;
    use std::path::PathBuf;

    fn unique_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!(
            "modal_forms_{tag}_{}_{}/prefs.json",
            std::process::id(),
            nanos
        ));
        path
    }

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let prefs = load_preferences(&unique_path("missing")).await;
        assert_eq!(prefs, UiPreferences::default());
    }

    #[tokio::test]
    async fn persisted_preferences_load_back() {
        let path = unique_path("persist");
        let mut prefs = UiPreferences::default();
        prefs.set_theme(Theme::Light);
        prefs.toggle_sidebar();
        persist_preferences(&path, &prefs).await.unwrap();

        assert_eq!(load_preferences(&path).await, prefs);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn browser_era_keys_are_understood() {
        let path = unique_path("legacy");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, br#"{"theme": "light", "sidebarState": "collapsed"}"#).unwrap();
        let prefs = load_preferences(&path).await;
        assert_eq!(prefs.theme, Theme::Light);
        assert!(prefs.sidebar_collapsed);

        std::fs::write(&path, br#"{"sidebar-minimize": "true", "sidebar_collapsed": false}"#)
            .unwrap();
        assert!(load_preferences(&path).await.sidebar_collapsed);

        std::fs::write(&path, br#"{"sidebarState": "expanded", "theme": "auto"}"#).unwrap();
        let prefs = load_preferences(&path).await;
        assert!(!prefs.sidebar_collapsed);
        assert_eq!(prefs.theme, Theme::Dark);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_gives_defaults() {
        let path = unique_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();
        assert_eq!(load_preferences(&path).await, UiPreferences::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}

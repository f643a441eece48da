use serde::{Deserialize, Serialize};
use std::fmt;

/// Theme stylesheet linked by the host page layout.
pub const THEME_STYLESHEET: &str = "/static/assets/css/dark-theme.css";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn stylesheet(self) -> &'static str {
        match self {
            Theme::Light => "light-theme.css",
            Theme::Dark => "dark-theme.css",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPreferences {
    pub theme: Theme,
    pub sidebar_collapsed: bool,
    pub language: Option<String>,
}

impl UiPreferences {
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_collapsed = !self.sidebar_collapsed;
        self.sidebar_collapsed
    }

    pub fn set_language(&mut self, language: &str) {
        let language = language.trim();
        self.language = if language.is_empty() {
            None
        } else {
            Some(language.to_string())
        };
    }
}

/// Swaps the file name of a theme stylesheet href, keeping its directory.
pub fn theme_stylesheet_href(current: &str, theme: Theme) -> String {
    let base = match current.rfind('/') {
        Some(index) => &current[..=index],
        None => "",
    };
    format!("{base}{}", theme.stylesheet())
}

use crate::config::ClientConfig;
use crate::controller::ModalController;
use crate::errors::{AppError, ErrorKind};
use crate::models::SubmitOutcome;
use crate::preferences::{THEME_STYLESHEET, Theme, UiPreferences, theme_stylesheet_href};
use crate::presenter::TerminalPresenter;
use crate::state::{ModalSession, Trigger};
use crate::storage::{load_preferences, persist_preferences};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "modal_forms", about = "Server-rendered modal forms from the terminal", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeMode {
    Light,
    Dark,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SidebarAction {
    Toggle,
    Collapse,
    Expand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Open a modal form, apply field edits and submit it
    Edit {
        /// Form URL with a `/0/` placeholder segment
        template: String,
        /// Entity id substituted into the template
        id: String,
        /// Field overrides as name=value
        #[arg(value_parser = parse_edit)]
        edits: Vec<(String, String)>,
    },
    /// Show, set or toggle the color theme
    Theme {
        #[arg(value_enum)]
        mode: Option<ThemeMode>,
    },
    /// Collapse or expand the sidebar
    Sidebar {
        #[arg(value_enum)]
        action: SidebarAction,
    },
    /// Set the interface language (empty to follow the browser)
    Language { code: String },
    /// Print the stored preferences
    Prefs,
}

fn parse_edit(pair: &str) -> Result<(String, String), String> {
    pair.split_once('=')
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected field=value, got '{pair}'"))
}

pub async fn run(config: &ClientConfig, command: Command) -> Result<(), AppError> {
    match command {
        Command::Edit {
            template,
            id,
            edits,
        } => edit(config, &template, &id, &edits).await,
        Command::Theme { mode } => {
            update_preferences(config, |prefs| match mode {
                None => {}
                Some(ThemeMode::Light) => prefs.set_theme(Theme::Light),
                Some(ThemeMode::Dark) => prefs.set_theme(Theme::Dark),
                Some(ThemeMode::Toggle) => {
                    prefs.toggle_theme();
                }
            })
            .await
        }
        Command::Sidebar { action } => {
            update_preferences(config, |prefs| match action {
                SidebarAction::Toggle => {
                    prefs.toggle_sidebar();
                }
                SidebarAction::Collapse => prefs.sidebar_collapsed = true,
                SidebarAction::Expand => prefs.sidebar_collapsed = false,
            })
            .await
        }
        Command::Language { code } => {
            update_preferences(config, |prefs| prefs.set_language(&code)).await
        }
        Command::Prefs => {
            let prefs = load_preferences(&config.prefs_path).await;
            print_preferences(&prefs);
            Ok(())
        }
    }
}

async fn update_preferences(
    config: &ClientConfig,
    change: impl FnOnce(&mut UiPreferences),
) -> Result<(), AppError> {
    let mut prefs = load_preferences(&config.prefs_path).await;
    let before = prefs.clone();
    change(&mut prefs);
    if prefs != before {
        persist_preferences(&config.prefs_path, &prefs).await?;
        info!(path = %config.prefs_path.display(), "preferences saved");
    }
    if prefs.theme != before.theme {
        info!(
            from = %theme_stylesheet_href(THEME_STYLESHEET, before.theme),
            to = %theme_stylesheet_href(THEME_STYLESHEET, prefs.theme),
            "theme stylesheet swapped"
        );
    }
    print_preferences(&prefs);
    Ok(())
}

fn print_preferences(prefs: &UiPreferences) {
    println!("theme = {}", prefs.theme);
    println!(
        "stylesheet = {}",
        theme_stylesheet_href(THEME_STYLESHEET, prefs.theme)
    );
    println!("sidebar_collapsed = {}", prefs.sidebar_collapsed);
    println!(
        "language = {}",
        prefs.language.as_deref().unwrap_or("(browser default)")
    );
}

async fn edit(
    config: &ClientConfig,
    template: &str,
    id: &str,
    edits: &[(String, String)],
) -> Result<(), AppError> {
    let mut controller = ModalController::from_config(config, TerminalPresenter::new(config.toasts))?;
    if let Some(page) = &config.page_path {
        if let Err(err) = controller.load_page(page).await {
            warn!("continuing without host page token: {err}");
        }
    }

    let mut session = controller.open(&Trigger::new(id), template).await?;
    print_fields(&session);
    for (field, value) in edits {
        session.set_field(field, value.as_str())?;
    }

    match controller.submit(&mut session).await? {
        SubmitOutcome::Saved { message, follow_up } => {
            println!("saved: {message} ({follow_up:?})");
            Ok(())
        }
        SubmitOutcome::Invalid { errors } => {
            for error in &errors {
                println!("{}: {}", error.field, error.message);
            }
            let first = errors
                .first()
                .map(|error| error.message.clone())
                .unwrap_or_default();
            Err(AppError::new(ErrorKind::ValidationFailure, first))
        }
        SubmitOutcome::Rerendered => {
            print_fields(&session);
            Err(AppError::new(
                ErrorKind::ValidationFailure,
                "server returned the form again",
            ))
        }
        SubmitOutcome::Failed(err) => Err(err),
    }
}

fn print_fields(session: &ModalSession) {
    let Some(form) = session.form() else {
        println!("(no form in modal content)");
        return;
    };
    for (name, value) in form.form_data() {
        if name != crate::form::CSRF_FIELD {
            println!("{name} = {value}");
        }
    }
}

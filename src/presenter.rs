use crate::state::SubmitState;
use chrono::{DateTime, Local};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Blocking alerts stand in when the presenter has no toasts.
    pub blocking: bool,
    pub at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalEvent {
    BodyReplaced(String),
    Shown,
    Hidden,
    BackdropCleared,
    WidgetsInitialized(Vec<String>),
    SubmitControl { busy: bool },
    FieldInvalid { field: String, message: String },
    Notified(Notice),
    Navigate(String),
    RefreshList,
    Reload,
    StateChanged { from: SubmitState, to: SubmitState },
}

/// Receives everything the controller wants rendered.
pub trait Presenter {
    fn handle(&mut self, event: ModalEvent);

    fn supports_toasts(&self) -> bool {
        true
    }
}

pub fn notice<P: Presenter + ?Sized>(
    presenter: &P,
    level: NoticeLevel,
    message: impl Into<String>,
) -> Notice {
    Notice {
        level,
        message: message.into(),
        blocking: !presenter.supports_toasts(),
        at: Local::now(),
    }
}

/// Logs events through `tracing` for terminal use.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    pub toasts: bool,
    pub body: String,
    pub visible: bool,
}

impl TerminalPresenter {
    pub fn new(toasts: bool) -> Self {
        Self {
            toasts,
            ..Self::default()
        }
    }
}

impl Presenter for TerminalPresenter {
    fn handle(&mut self, event: ModalEvent) {
        match event {
            ModalEvent::BodyReplaced(html) => self.body = html,
            ModalEvent::Shown => self.visible = true,
            ModalEvent::Hidden => self.visible = false,
            ModalEvent::BackdropCleared => {}
            ModalEvent::WidgetsInitialized(widgets) => {
                if !widgets.is_empty() {
                    info!(?widgets, "select widgets ready");
                }
            }
            ModalEvent::SubmitControl { busy } => {
                info!(label = if busy { "Processing..." } else { "Save" }, "submit control");
            }
            ModalEvent::FieldInvalid { field, message } => warn!(field, message, "invalid field"),
            ModalEvent::Notified(notice) => {
                let time = notice.at.format("%H:%M");
                match notice.level {
                    NoticeLevel::Success => info!("[{time}] {}", notice.message),
                    NoticeLevel::Error => error!("[{time}] {}", notice.message),
                }
            }
            ModalEvent::Navigate(url) => info!(url, "navigate"),
            ModalEvent::RefreshList => info!("list refresh"),
            ModalEvent::Reload => info!("page reload"),
            ModalEvent::StateChanged { from, to } => info!(?from, ?to, "submit state"),
        }
    }

    fn supports_toasts(&self) -> bool {
        self.toasts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_block_without_toasts() {
        let with_toasts = TerminalPresenter::new(true);
        let without = TerminalPresenter::new(false);
        assert!(!notice(&with_toasts, NoticeLevel::Success, "ok").blocking);
        assert!(notice(&without, NoticeLevel::Error, "boom").blocking);
    }

    #[test]
    fn terminal_presenter_tracks_visibility_and_body() {
        let mut presenter = TerminalPresenter::new(true);
        presenter.handle(ModalEvent::BodyReplaced("<form></form>".into()));
        presenter.handle(ModalEvent::Shown);
        assert!(presenter.visible);
        assert_eq!(presenter.body, "<form></form>");
        presenter.handle(ModalEvent::Hidden);
        assert!(!presenter.visible);
    }
}

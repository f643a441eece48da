use crate::config::{ClientConfig, Timings};
use crate::errors::{AppError, ErrorKind};
use crate::form::{annotate, csrf_token, escape_html};
use crate::models::{FieldError, FollowUp, SubmitOutcome};
use crate::presenter::{ModalEvent, NoticeLevel, Presenter, notice};
use crate::response::{CONNECTION_MESSAGE, RawResponse, Verdict, interpret};
use crate::state::{ModalSession, SubmitState, Trigger};
use reqwest::{
    Client, StatusCode, Url,
    header::{ACCEPT, CONTENT_TYPE, HeaderName, LOCATION},
    multipart, redirect,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const LOADING_MARKUP: &str = "<p>Loading...</p>";
pub const LOAD_FAILED_MESSAGE: &str = "Error loading the view. Please try again.";
pub const CSRF_HEADER: &str = "X-CSRFToken";

pub struct ModalController<P: Presenter> {
    client: Client,
    base_url: Url,
    csrf_token: Option<String>,
    timings: Timings,
    presenter: P,
    refresh_hook: Option<Box<dyn FnMut() + Send>>,
}

impl<P: Presenter> ModalController<P> {
    pub fn new(base_url: Url, presenter: P) -> Result<Self, AppError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .cookie_store(true)
            .build()?;
        Ok(Self {
            client,
            base_url,
            csrf_token: None,
            timings: Timings::default(),
            presenter,
            refresh_hook: None,
        })
    }

    pub fn from_config(config: &ClientConfig, presenter: P) -> Result<Self, AppError> {
        let mut controller = Self::new(config.base_url.clone(), presenter)?;
        controller.timings = config.timings;
        controller.csrf_token = config.csrf_token.clone();
        Ok(controller)
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Called after a successful save when the server sent no redirect.
    pub fn set_refresh_hook(&mut self, hook: impl FnMut() + Send + 'static) {
        self.refresh_hook = Some(Box::new(hook));
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Loads the host page and keeps its anti-forgery token.
    pub async fn load_page(&mut self, path: &str) -> Result<(), AppError> {
        let url = self.absolute(path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| AppError::fetch(err.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(AppError::fetch(format!(
                "host page {url} returned {}",
                response.status()
            )));
        }
        let html = response
            .text()
            .await
            .map_err(|err| AppError::fetch(err.to_string()))?;
        match csrf_token(&html) {
            Some(token) => self.csrf_token = Some(token),
            None => warn!(%url, "host page has no anti-forgery token"),
        }
        Ok(())
    }

    pub async fn open(
        &mut self,
        trigger: &Trigger,
        url_template: &str,
    ) -> Result<ModalSession, AppError> {
        trigger.validate()?;
        self.emit(ModalEvent::BackdropCleared);

        let mut session = ModalSession::new(trigger, url_template);
        session.load_body(LOADING_MARKUP);
        self.emit(ModalEvent::BodyReplaced(LOADING_MARKUP.to_string()));

        let url = self.absolute(session.resolved_url())?;
        info!(%url, entity_id = session.entity_id(), "loading modal form");

        let result = self
            .client
            .get(url)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(ACCEPT, "application/json, text/html")
            .send()
            .await;
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                return Err(self.fetch_failed(&mut session, CONNECTION_MESSAGE, err.to_string()));
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Err(self.fetch_failed(
                &mut session,
                LOAD_FAILED_MESSAGE,
                format!("form request returned {status}"),
            ));
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(err) => {
                return Err(self.fetch_failed(&mut session, CONNECTION_MESSAGE, err.to_string()));
            }
        };

        session.load_body(html.clone());
        self.emit(ModalEvent::BodyReplaced(html));
        self.emit(ModalEvent::Shown);
        self.init_widgets(&session).await;

        if session.form().is_none() {
            warn!(url = session.resolved_url(), "modal content has no form");
        }
        Ok(session)
    }

    pub async fn submit(&mut self, session: &mut ModalSession) -> Result<SubmitOutcome, AppError> {
        let from = session.state();
        session.begin_submit()?;
        self.emit(ModalEvent::StateChanged {
            from,
            to: SubmitState::Loading,
        });
        self.submit_control(session, true);

        let url = match self
            .absolute(session.resolved_url())
            .and_then(|page| join(&page, &session.submit_url()))
        {
            Ok(url) => url,
            Err(err) => return Ok(self.failed(session, err)),
        };

        let fields = session
            .form()
            .map(|form| form.form_data())
            .unwrap_or_default();
        let token = self.csrf_token.clone().or_else(|| {
            session
                .form()
                .and_then(|form| form.csrf_token())
                .map(str::to_string)
        });

        let mut body = multipart::Form::new();
        for (name, value) in fields {
            body = body.text(name, value);
        }

        let mut request = self
            .client
            .post(url.clone())
            .header("X-Requested-With", "XMLHttpRequest")
            .header(ACCEPT, "application/json")
            .multipart(body);
        match token {
            Some(token) => request = request.header(CSRF_HEADER, token),
            None => debug!("submitting without anti-forgery token"),
        }

        info!(%url, entity_id = session.entity_id(), "submitting modal form");
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, error = %err, "submit failed");
                return Ok(self.failed(session, AppError::network(CONNECTION_MESSAGE)));
            }
        };

        let status = response.status().as_u16();
        let (content_type, location) = {
            let header = |name: HeaderName| {
                response
                    .headers()
                    .get(name)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            };
            (header(CONTENT_TYPE), header(LOCATION))
        };
        let raw = RawResponse {
            status,
            content_type,
            location,
            body: response.text().await.map_err(|err| err.to_string()),
        };

        let outcome = match interpret(&raw) {
            Verdict::Success { message, redirect } => self.saved(session, message, redirect).await,
            Verdict::FieldErrors(errors) => self.invalid(session, errors),
            Verdict::Rerender(html) => self.rerender(session, html).await,
            Verdict::Rejected(message) => self.failed(session, AppError::server(message)),
            Verdict::Unreadable(detail) => {
                warn!(status, detail, "unreadable submit response");
                self.failed(
                    session,
                    AppError::new(
                        ErrorKind::ResponseParseFailure,
                        format!("Unexpected response from the server (HTTP {status})."),
                    ),
                )
            }
        };
        Ok(outcome)
    }

    async fn saved(
        &mut self,
        session: &mut ModalSession,
        message: String,
        redirect: Option<String>,
    ) -> SubmitOutcome {
        self.settle(session, SubmitState::Success);
        self.emit(ModalEvent::Hidden);
        self.notify(NoticeLevel::Success, &message);

        // Navigation and reload are timed from the hide, not from the cleanup.
        pause(self.timings.backdrop_settle).await;
        self.emit(ModalEvent::BackdropCleared);
        let remaining = self
            .timings
            .navigate_delay
            .saturating_sub(self.timings.backdrop_settle);

        let follow_up = if let Some(url) = redirect {
            pause(remaining).await;
            self.emit(ModalEvent::Navigate(url.clone()));
            FollowUp::Redirect(url)
        } else if let Some(hook) = self.refresh_hook.as_mut() {
            hook();
            self.emit(ModalEvent::RefreshList);
            FollowUp::RefreshList
        } else {
            pause(remaining).await;
            self.emit(ModalEvent::Reload);
            FollowUp::Reload
        };

        info!(entity_id = session.entity_id(), ?follow_up, "modal form saved");
        SubmitOutcome::Saved { message, follow_up }
    }

    fn invalid(&mut self, session: &mut ModalSession, errors: Vec<FieldError>) -> SubmitOutcome {
        self.settle(session, SubmitState::ValidationError);
        self.submit_control(session, false);

        let (markup, marked) = annotate(session.body(), &errors);
        session.set_markup(markup);
        for error in errors.iter().filter(|error| marked.contains(&error.field)) {
            self.emit(ModalEvent::FieldInvalid {
                field: error.field.clone(),
                message: error.message.clone(),
            });
        }
        let unknown: Vec<&str> = errors
            .iter()
            .filter(|error| !marked.contains(&error.field))
            .map(|error| error.field.as_str())
            .collect();
        if !unknown.is_empty() {
            debug!(?unknown, "errors for fields missing from the form");
        }

        if let Some(first) = errors.first() {
            self.notify(NoticeLevel::Error, &first.message);
        }
        SubmitOutcome::Invalid { errors }
    }

    async fn rerender(&mut self, session: &mut ModalSession, html: String) -> SubmitOutcome {
        self.settle(session, SubmitState::ValidationError);
        self.submit_control(session, false);
        session.load_body(html.clone());
        self.emit(ModalEvent::BodyReplaced(html));
        self.init_widgets(session).await;
        SubmitOutcome::Rerendered
    }

    fn failed(&mut self, session: &mut ModalSession, err: AppError) -> SubmitOutcome {
        self.settle(session, SubmitState::NetworkError);
        self.submit_control(session, false);
        self.notify(NoticeLevel::Error, &err.message);
        SubmitOutcome::Failed(err)
    }

    fn fetch_failed(&mut self, session: &mut ModalSession, message: &str, detail: String) -> AppError {
        warn!(url = session.resolved_url(), detail, "modal form failed to load");
        let markup = format!("<p>{}</p>", escape_html(message));
        session.load_body(markup.clone());
        self.emit(ModalEvent::BodyReplaced(markup));
        self.notify(NoticeLevel::Error, message);
        AppError::fetch(detail)
    }

    fn settle(&mut self, session: &mut ModalSession, to: SubmitState) {
        let from = session.state();
        session.finish(to);
        self.emit(ModalEvent::StateChanged { from, to });
    }

    async fn init_widgets(&mut self, session: &ModalSession) {
        pause(self.timings.widget_settle).await;
        let widgets = session
            .form()
            .map(|form| form.enhanced_widgets())
            .unwrap_or_default();
        self.emit(ModalEvent::WidgetsInitialized(widgets));
    }

    fn submit_control(&mut self, session: &ModalSession, busy: bool) {
        if session.form().is_some_and(|form| form.has_submit_control) {
            self.emit(ModalEvent::SubmitControl { busy });
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        let notice = notice(&self.presenter, level, message);
        self.emit(ModalEvent::Notified(notice));
    }

    fn emit(&mut self, event: ModalEvent) {
        self.presenter.handle(event);
    }

    fn absolute(&self, path: &str) -> Result<Url, AppError> {
        join(&self.base_url, path)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

fn join(base: &Url, path: &str) -> Result<Url, AppError> {
    base.join(path)
        .map_err(|err| AppError::config(format!("cannot resolve {path:?} against {base}: {err}")))
}

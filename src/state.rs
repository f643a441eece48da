use crate::errors::{AppError, ErrorKind};
use crate::form::FormDocument;
use crate::urls::resolve_url;
use once_cell::sync::Lazy;
use regex::Regex;

static DATA_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bdata-id\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub entity_id: String,
}

impl Trigger {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
        }
    }

    /// Reads the entity id from the `data-id` attribute of a trigger element.
    pub fn from_element(markup: &str) -> Result<Self, AppError> {
        let caps = DATA_ID_RE.captures(markup).ok_or_else(|| {
            AppError::new(ErrorKind::InvalidTrigger, "trigger has no data-id attribute")
        })?;
        let id = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Ok(Self::new(id))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.entity_id.trim().is_empty() {
            return Err(AppError::new(
                ErrorKind::InvalidTrigger,
                "trigger entity id is empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Loading,
    Success,
    ValidationError,
    NetworkError,
}

impl SubmitState {
    pub fn can_submit(self) -> bool {
        matches!(
            self,
            SubmitState::Idle | SubmitState::ValidationError | SubmitState::NetworkError
        )
    }
}

#[derive(Debug, Clone)]
pub struct ModalSession {
    entity_id: String,
    source_url: String,
    resolved_url: String,
    body: String,
    form: Option<FormDocument>,
    state: SubmitState,
    submit_enabled: bool,
    busy: bool,
}

impl ModalSession {
    pub fn new(trigger: &Trigger, source_url: &str) -> Self {
        Self {
            entity_id: trigger.entity_id.clone(),
            source_url: source_url.to_string(),
            resolved_url: resolve_url(source_url, &trigger.entity_id),
            body: String::new(),
            form: None,
            state: SubmitState::Idle,
            submit_enabled: true,
            busy: false,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn resolved_url(&self) -> &str {
        &self.resolved_url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn form(&self) -> Option<&FormDocument> {
        self.form.as_ref()
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Replaces the body content and the form parsed from it.
    pub fn load_body(&mut self, html: impl Into<String>) {
        self.body = html.into();
        self.form = FormDocument::first_in(&self.body);
    }

    /// Updates the body markup while keeping the parsed form and its edits.
    pub fn set_markup(&mut self, html: String) {
        self.body = html;
    }

    /// Edits a field value. Leaves an error state for idle.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), AppError> {
        let form = self
            .form
            .as_mut()
            .ok_or_else(|| AppError::new(ErrorKind::NoForm, "modal content has no form"))?;
        form.set_field(name, value);
        if matches!(
            self.state,
            SubmitState::ValidationError | SubmitState::NetworkError
        ) {
            self.state = SubmitState::Idle;
        }
        Ok(())
    }

    /// POST target: the form action when present, else the resolved template.
    pub fn submit_url(&self) -> String {
        self.form
            .as_ref()
            .and_then(|form| form.action.clone())
            .unwrap_or_else(|| resolve_url(&self.source_url, &self.entity_id))
    }

    pub(crate) fn begin_submit(&mut self) -> Result<(), AppError> {
        if self.form.is_none() {
            return Err(AppError::new(ErrorKind::NoForm, "modal content has no form"));
        }
        if !self.state.can_submit() {
            return Err(AppError::new(
                ErrorKind::SessionClosed,
                format!("cannot submit while {:?}", self.state),
            ));
        }
        self.state = SubmitState::Loading;
        self.submit_enabled = false;
        self.busy = true;
        Ok(())
    }

    pub(crate) fn finish(&mut self, state: SubmitState) {
        self.state = state;
        self.busy = false;
        self.submit_enabled = state != SubmitState::Success;
    }
}

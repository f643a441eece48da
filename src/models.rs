use crate::errors::AppError;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitEnvelope {
    pub success: bool,
    pub message: Option<String>,
    pub errors: Option<Map<String, Value>>,
    pub redirect: Option<String>,
}

impl SubmitEnvelope {
    /// Reads a JSON reply field by field; `None` unless it is an object.
    ///
    /// `success` must be a literal `true`. A string or list under `errors`
    /// is a general message, as is `error`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(first_message)
                .filter(|text| !text.is_empty())
        };
        let (errors, general) = match object.get("errors") {
            Some(Value::Object(errors)) => (Some(errors.clone()), None),
            Some(other) => (None, first_message(other).filter(|text| !text.is_empty())),
            None => (None, None),
        };
        Some(Self {
            success: object.get("success").and_then(Value::as_bool).unwrap_or(false),
            message: text("message").or_else(|| text("error")).or(general),
            errors,
            redirect: object
                .get("redirect")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
        })
    }

    /// First message per field, in the order the server sent them.
    pub fn field_errors(&self) -> Vec<FieldError> {
        let Some(errors) = &self.errors else {
            return Vec::new();
        };
        errors
            .iter()
            .filter_map(|(field, value)| {
                first_message(value).map(|message| FieldError {
                    field: field.clone(),
                    message,
                })
            })
            .collect()
    }
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.first().and_then(first_message),
        Value::Object(map) => map.get("message").and_then(first_message),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    Redirect(String),
    RefreshList,
    Reload,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Saved { message: String, follow_up: FollowUp },
    Invalid { errors: Vec<FieldError> },
    Rerendered,
    Failed(AppError),
}

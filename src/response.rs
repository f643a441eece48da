use crate::models::{FieldError, SubmitEnvelope};
use serde_json::Value;

pub const SAVED_MESSAGE: &str = "Operation completed successfully";
pub const COMPLETED_MESSAGE: &str = "Operation completed";
pub const REJECTED_MESSAGE: &str = "The server rejected the request.";
pub const CONNECTION_MESSAGE: &str =
    "Connection error. Please check your connection and try again.";

const SUCCESS_MARKERS: [&str; 2] = ["success", "éxito"];

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Result<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success {
        message: String,
        redirect: Option<String>,
    },
    FieldErrors(Vec<FieldError>),
    Rerender(String),
    Rejected(String),
    Unreadable(String),
}

fn is_redirect(status: u16) -> bool {
    (300..400).contains(&status)
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|value| value.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

pub fn interpret(raw: &RawResponse) -> Verdict {
    let body = match &raw.body {
        Ok(body) => body,
        Err(detail) => return unreadable(raw, detail.clone()),
    };

    if is_json(raw.content_type.as_deref()) {
        return match serde_json::from_str::<Value>(body) {
            Ok(value) => match SubmitEnvelope::from_value(&value) {
                Some(envelope) => from_envelope(envelope),
                None => unreadable(raw, format!("expected a JSON object, got {value}")),
            },
            Err(err) => unreadable(raw, err.to_string()),
        };
    }

    let looks_saved = SUCCESS_MARKERS.iter().any(|marker| body.contains(marker));
    if looks_saved || is_redirect(raw.status) {
        return Verdict::Success {
            message: COMPLETED_MESSAGE.to_string(),
            redirect: raw.location.clone(),
        };
    }

    Verdict::Rerender(body.clone())
}

fn from_envelope(envelope: SubmitEnvelope) -> Verdict {
    if envelope.success {
        return Verdict::Success {
            message: envelope
                .message
                .unwrap_or_else(|| SAVED_MESSAGE.to_string()),
            redirect: envelope.redirect,
        };
    }

    let errors = envelope.field_errors();
    if !errors.is_empty() {
        return Verdict::FieldErrors(errors);
    }

    Verdict::Rejected(
        envelope
            .message
            .unwrap_or_else(|| REJECTED_MESSAGE.to_string()),
    )
}

fn unreadable(raw: &RawResponse, detail: String) -> Verdict {
    if raw.status == 200 || is_redirect(raw.status) {
        Verdict::Success {
            message: COMPLETED_MESSAGE.to_string(),
            redirect: None,
        }
    } else {
        Verdict::Unreadable(detail)
    }
}

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FetchFailure,
    SubmitNetworkFailure,
    ValidationFailure,
    GenericServerFailure,
    ResponseParseFailure,
    InvalidTrigger,
    NoForm,
    SessionClosed,
    Storage,
    Config,
}

#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FetchFailure, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SubmitNetworkFailure, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GenericServerFailure, message)
    }

    pub fn parse(err: impl std::error::Error) -> Self {
        Self::new(ErrorKind::ResponseParseFailure, err.to_string())
    }

    pub fn storage(err: impl std::error::Error) -> Self {
        Self::new(ErrorKind::Storage, err.to_string())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

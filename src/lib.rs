pub mod app;
pub mod config;
pub mod controller;
pub mod errors;
pub mod form;
pub mod models;
pub mod preferences;
pub mod presenter;
pub mod response;
pub mod state;
pub mod storage;
pub mod urls;

pub use config::{ClientConfig, Timings};
pub use controller::ModalController;
pub use errors::{AppError, ErrorKind};
pub use models::{FieldError, FollowUp, SubmitOutcome};
pub use presenter::{ModalEvent, Presenter};
pub use state::{ModalSession, SubmitState, Trigger};
pub use urls::resolve_url;

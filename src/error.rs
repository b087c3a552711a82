use thiserror::Error;

use crate::api::ApiError;
use crate::profile::FieldError;
use crate::session::ApplicationId;
use crate::wizard::{Action, Stage};

/// Top-level error for the `autofill` binary.
#[derive(Debug, Error)]
pub enum AutofillError {
    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Every failure the wizard can surface to the user.
///
/// Stored in the session as `last_error`; each variant renders as a message
/// the user can act on (fix the form, re-upload, re-confirm or restart).
#[derive(Debug, Clone, Error)]
pub enum WizardError {
    #[error("Job URL is required")]
    EmptyUrl,

    #[error("Job URL is not a valid http(s) address: {0}")]
    InvalidUrl(String),

    #[error("Profile is incomplete: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Cannot submit without {0}")]
    MissingSessionData(&'static str),

    #[error("Could not read resume: {0}")]
    Ingestion(String),

    #[error("Could not reach the profile store: {0}")]
    ProfileStore(String),

    #[error("Application rejected: {0}")]
    SubmissionRejected(String),

    #[error("Application service unreachable: {0}")]
    SubmissionUnreachable(String),

    /// The job runner reported `error`; the message is the backend's verbatim.
    #[error("{0}")]
    TerminalJob(String),

    #[error("Lost contact with the application service after {attempts} attempts: {last_error}")]
    TrackingUnreachable { attempts: u32, last_error: String },

    #[error("Tracking timed out after {0}s")]
    TrackingTimedOut(u64),

    #[error("{action} is not allowed while {stage}")]
    IllegalTransition { stage: Stage, action: Action },

    #[error("Application {0} was already submitted in this session")]
    AlreadySubmitted(ApplicationId),

    #[error("{0} cannot change after submission")]
    Frozen(&'static str),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl WizardError {
    /// Failures the user can recover from without restarting the session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            WizardError::TerminalJob(_)
                | WizardError::TrackingUnreachable { .. }
                | WizardError::TrackingTimedOut(_)
        )
    }
}

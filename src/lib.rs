//! Guided job-application submission with backend status tracking.
//!
//! A [`WizardController`] walks the user through URL, resume and profile
//! capture, submits the assembled application once per confirmation through
//! [`SubmissionClient`], and follows the resulting backend job with a
//! [`StatusPoller`] until it completes, fails or the user restarts.

pub mod api;
pub mod config;
pub mod error;
pub mod poller;
pub mod profile;
pub mod resume;
pub mod session;
pub mod submission;
pub mod wizard;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, Backend, Credential};
pub use config::AutofillConfig;
pub use error::{AutofillError, WizardError};
pub use poller::{PollEvent, PollerConfig, StatusPoller};
pub use session::{ApplicationId, JobStatus, SessionState};
pub use submission::SubmissionClient;
pub use wizard::{Stage, WizardController};

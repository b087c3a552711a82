//! The seam between the wizard and the services it talks to.
//!
//! ```text
//!   parse_resume() ──→ [load_profile() / save_profile()] ──→ start_application() ──→ application_status()*
//! ```
//!
//! [`ApiClient`](super::ApiClient) implements [`Backend`] over HTTP; tests
//! substitute scripted implementations. Credentials are passed explicitly on
//! every call rather than read from ambient storage.

use std::fmt;

use async_trait::async_trait;

use super::error::ApiError;
use super::types::StartApplicationRequest;
use crate::profile::PersonalInfo;
use crate::resume::ResumeData;
use crate::session::{ApplicationId, StatusSnapshot};

/// Bearer token attached to outgoing requests when present.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank tokens so an empty config value means
    /// "not signed in".
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Every remote call the wizard makes.
///
/// Implementations must be `Send + Sync` because the status poller runs on
/// its own task and shares the backend through an `Arc`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Hand the assembled application to the job runner.
    async fn start_application(
        &self,
        request: &StartApplicationRequest<'_>,
        credential: Option<&Credential>,
    ) -> Result<ApplicationId, ApiError>;

    /// Query the job runner for the current state of one application.
    async fn application_status(
        &self,
        id: &ApplicationId,
        credential: Option<&Credential>,
    ) -> Result<StatusSnapshot, ApiError>;

    /// Upload a resume file and receive the extracted fields.
    async fn parse_resume(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        credential: Option<&Credential>,
    ) -> Result<ResumeData, ApiError>;

    /// Fetch the signed-in user's stored profile. `None` when nothing is stored.
    async fn load_profile(&self, credential: &Credential) -> Result<Option<PersonalInfo>, ApiError>;

    /// Store the signed-in user's profile.
    async fn save_profile(
        &self,
        profile: &PersonalInfo,
        credential: &Credential,
    ) -> Result<(), ApiError>;

    /// An example profile for prefilling the form.
    async fn sample_profile(&self) -> Result<PersonalInfo, ApiError>;
}

//! One-shot hand-off of an assembled application to the job runner.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{ApiError, Backend, Credential, StartApplicationRequest};
use crate::error::WizardError;
use crate::profile::PersonalInfo;
use crate::resume::ResumeData;
use crate::session::ApplicationId;

/// Sends `start-application` and nothing else. Stateless: every call is an
/// independent submission and nothing is retried.
pub struct SubmissionClient<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: Backend + ?Sized> SubmissionClient<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn submit(
        &self,
        job_url: &str,
        profile: &PersonalInfo,
        resume: &ResumeData,
        credential: Option<&Credential>,
    ) -> Result<ApplicationId, WizardError> {
        let request = StartApplicationRequest {
            url: job_url,
            personal_info: profile,
            resume_data: resume,
        };
        match self.backend.start_application(&request, credential).await {
            Ok(id) => {
                info!(application_id = %id, job_url, "application accepted");
                Ok(id)
            }
            Err(err) => {
                warn!(job_url, error = %err, "application submission failed");
                Err(classify(err))
            }
        }
    }
}

fn classify(err: ApiError) -> WizardError {
    if err.is_rejection() {
        WizardError::SubmissionRejected(err.message())
    } else {
        WizardError::SubmissionUnreachable(err.to_string())
    }
}

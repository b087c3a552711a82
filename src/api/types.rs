//! Wire shapes for the application backend's JSON endpoints.
//!
//! Request types borrow from the session so a submission never clones the
//! profile or resume; response types convert into domain values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::profile::PersonalInfo;
use crate::resume::ResumeData;
use crate::session::{ApplicationId, JobStatus, StatusSnapshot};

/// Body of `POST /api/start-application`.
#[derive(Debug, Clone, Serialize)]
pub struct StartApplicationRequest<'a> {
    pub url: &'a str,
    pub personal_info: &'a PersonalInfo,
    pub resume_data: &'a ResumeData,
}

/// Reply of `POST /api/start-application`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartApplicationResponse {
    pub application_id: String,
}

impl From<StartApplicationResponse> for ApplicationId {
    fn from(resp: StartApplicationResponse) -> Self {
        ApplicationId(resp.application_id)
    }
}

/// Status values the job runner reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    Starting,
    Processing,
    Completed,
    Error,
}

impl From<WireStatus> for JobStatus {
    fn from(status: WireStatus) -> Self {
        match status {
            WireStatus::Starting => JobStatus::Idle,
            WireStatus::Processing => JobStatus::Processing,
            WireStatus::Completed => JobStatus::Completed,
            WireStatus::Error => JobStatus::Error,
        }
    }
}

/// Reply of `GET /api/application-status/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: WireStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub progress: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<StatusResponse> for StatusSnapshot {
    fn from(resp: StatusResponse) -> Self {
        StatusSnapshot {
            status: resp.status.into(),
            message: resp.message,
            progress: resp.progress.clamp(0, 100) as u8,
            details: resp.details.filter(|d| !d.is_null()),
        }
    }
}

/// Reply of `GET /api/sample-personal-info`.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleProfileResponse {
    pub personal_info: PersonalInfo,
}

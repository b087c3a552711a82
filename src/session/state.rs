use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::WizardError;
use crate::profile::PersonalInfo;
use crate::resume::ResumeData;

/// Identifier the backend assigns to one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ApplicationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of the backend form-filling job as last observed.
///
/// Moves only forward: `Idle → Processing → {Completed, Error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Idle,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Idle => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Error => 2,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "IDLE"),
            JobStatus::Processing => write!(f, "PROCESSING"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// One decoded reply from the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: JobStatus,
    pub message: String,
    pub progress: u8,
    pub details: Option<Value>,
}

/// What applying a snapshot did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// The session already holds a terminal status; nothing changed.
    Ignored,
}

/// The data for one application attempt. Owned and mutated only by the
/// wizard controller.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    job_url: Option<String>,
    resume: Option<ResumeData>,
    profile: Option<PersonalInfo>,
    application_id: Option<ApplicationId>,
    status: JobStatus,
    progress: u8,
    message: Option<String>,
    details: Option<Value>,
    status_history: Vec<JobStatus>,
    #[serde(skip)]
    last_error: Option<WizardError>,
    last_transient: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            job_url: None,
            resume: None,
            profile: None,
            application_id: None,
            status: JobStatus::Idle,
            progress: 0,
            message: None,
            details: None,
            status_history: Vec::new(),
            last_error: None,
            last_transient: None,
        }
    }

    pub fn job_url(&self) -> Option<&str> {
        self.job_url.as_deref()
    }

    pub fn resume(&self) -> Option<&ResumeData> {
        self.resume.as_ref()
    }

    pub fn profile(&self) -> Option<&PersonalInfo> {
        self.profile.as_ref()
    }

    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.application_id.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Progress percentage; `None` until an application id exists.
    pub fn progress(&self) -> Option<u8> {
        self.application_id.as_ref().map(|_| self.progress)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn status_history(&self) -> &[JobStatus] {
        &self.status_history
    }

    pub fn last_error(&self) -> Option<&WizardError> {
        self.last_error.as_ref()
    }

    pub fn last_transient(&self) -> Option<&str> {
        self.last_transient.as_deref()
    }

    pub fn is_submitted(&self) -> bool {
        self.application_id.is_some()
    }

    pub fn set_job_url(&mut self, url: String) -> Result<(), WizardError> {
        self.ensure_editable("job_url")?;
        self.job_url = Some(url);
        Ok(())
    }

    pub fn set_resume(&mut self, resume: ResumeData) -> Result<(), WizardError> {
        self.ensure_editable("resume")?;
        self.resume = Some(resume);
        Ok(())
    }

    pub fn set_profile(&mut self, profile: PersonalInfo) -> Result<(), WizardError> {
        self.ensure_editable("profile")?;
        self.profile = Some(profile);
        Ok(())
    }

    /// Record the backend's id for this session. Allowed exactly once.
    pub fn set_application_id(&mut self, id: ApplicationId) -> Result<(), WizardError> {
        if let Some(existing) = &self.application_id {
            return Err(WizardError::AlreadySubmitted(existing.clone()));
        }
        self.application_id = Some(id);
        self.status = JobStatus::Idle;
        self.progress = 0;
        self.status_history.push(JobStatus::Idle);
        Ok(())
    }

    /// Fold a status reply into the session.
    ///
    /// Status never moves backwards and progress never decreases; a terminal
    /// status freezes the session until it is replaced.
    pub fn apply_snapshot(&mut self, snapshot: &StatusSnapshot) -> Result<Applied, WizardError> {
        if self.application_id.is_none() {
            return Err(WizardError::MissingSessionData("application_id"));
        }
        if self.status.is_terminal() {
            return Ok(Applied::Ignored);
        }

        if snapshot.status.rank() > self.status.rank() {
            self.status = snapshot.status;
            self.status_history.push(snapshot.status);
        }
        self.progress = self.progress.max(snapshot.progress.min(100));
        self.message = Some(snapshot.message.clone());
        if snapshot.details.is_some() {
            self.details = snapshot.details.clone();
        }
        self.last_transient = None;
        Ok(Applied::Updated)
    }

    pub fn record_error(&mut self, error: WizardError) {
        self.last_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn record_transient(&mut self, message: String) {
        self.last_transient = Some(message);
    }

    fn ensure_editable(&self, field: &'static str) -> Result<(), WizardError> {
        match &self.application_id {
            Some(_) => Err(WizardError::Frozen(field)),
            None => Ok(()),
        }
    }
}

//! Scripted [`Backend`] for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{ApiError, Backend, Credential, StartApplicationRequest};
use crate::profile::{PersonalInfo, sample_profile};
use crate::resume::ResumeData;
use crate::session::{ApplicationId, JobStatus, StatusSnapshot};

/// One scripted answer from the status endpoint.
pub struct StatusReply {
    result: Result<StatusSnapshot, (u16, String)>,
    delay: Option<Duration>,
}

impl StatusReply {
    pub fn ok(status: JobStatus, progress: u8) -> Self {
        Self {
            result: Ok(StatusSnapshot {
                status,
                message: format!("{status}"),
                progress,
                details: None,
            }),
            delay: None,
        }
    }

    pub fn unavailable() -> Self {
        Self::failing(503, "Service Unavailable")
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            result: Err((status, message.to_string())),
            delay: None,
        }
    }

    pub fn message(mut self, message: &str) -> Self {
        if let Ok(snapshot) = &mut self.result {
            snapshot.message = message.to_string();
        }
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        if let Ok(snapshot) = &mut self.result {
            snapshot.details = Some(details);
        }
        self
    }

    /// Hold the reply back for `delay` after the query arrives.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    statuses: Mutex<VecDeque<StatusReply>>,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    submission_failures: Mutex<VecDeque<(u16, String)>>,
    submissions: Mutex<Vec<Value>>,
    resume_failures: Mutex<VecDeque<(u16, String)>>,
    resume_uploads: AtomicUsize,
    stored_profile: Mutex<Option<PersonalInfo>>,
    saved_profiles: Mutex<Vec<PersonalInfo>>,
    credentials: Mutex<Vec<Option<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, reply: StatusReply) {
        self.statuses.lock().unwrap().push_back(reply);
    }

    pub fn fail_next_submission(&self, status: u16, message: &str) {
        self.submission_failures
            .lock()
            .unwrap()
            .push_back((status, message.to_string()));
    }

    pub fn fail_next_resume(&self, status: u16, message: &str) {
        self.resume_failures
            .lock()
            .unwrap()
            .push_back((status, message.to_string()));
    }

    pub fn store_profile(&self, profile: PersonalInfo) {
        *self.stored_profile.lock().unwrap() = Some(profile);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_status_calls(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Value> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn resume_uploads(&self) -> usize {
        self.resume_uploads.load(Ordering::SeqCst)
    }

    pub fn saved_profiles(&self) -> Vec<PersonalInfo> {
        self.saved_profiles.lock().unwrap().clone()
    }

    pub fn credentials_seen(&self) -> Vec<Option<String>> {
        self.credentials.lock().unwrap().clone()
    }

    fn note_credential(&self, credential: Option<&Credential>) {
        self.credentials
            .lock()
            .unwrap()
            .push(credential.map(|c| c.token().to_string()));
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn start_application(
        &self,
        request: &StartApplicationRequest<'_>,
        credential: Option<&Credential>,
    ) -> Result<ApplicationId, ApiError> {
        self.note_credential(credential);
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(serde_json::to_value(request).unwrap());
        if let Some((status, message)) = self.submission_failures.lock().unwrap().pop_front() {
            return Err(ApiError::from_response(status, &message));
        }
        Ok(ApplicationId(format!("app_{}", submissions.len())))
    }

    async fn application_status(
        &self,
        _id: &ApplicationId,
        credential: Option<&Credential>,
    ) -> Result<StatusSnapshot, ApiError> {
        self.note_credential(credential);
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let reply = self.statuses.lock().unwrap().pop_front();
        if let Some(delay) = reply.as_ref().and_then(|r| r.delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Some(StatusReply { result: Ok(s), .. }) => Ok(s),
            Some(StatusReply {
                result: Err((status, message)),
                ..
            }) => Err(ApiError::from_response(status, &message)),
            None => Err(ApiError::Decode("status script exhausted".into())),
        }
    }

    async fn parse_resume(
        &self,
        file_name: &str,
        _bytes: Vec<u8>,
        credential: Option<&Credential>,
    ) -> Result<ResumeData, ApiError> {
        self.note_credential(credential);
        self.resume_uploads.fetch_add(1, Ordering::SeqCst);
        if let Some((status, message)) = self.resume_failures.lock().unwrap().pop_front() {
            return Err(ApiError::from_response(status, &message));
        }
        let mut resume = ResumeData {
            skills: vec!["Python".into(), "SQL".into()],
            ..Default::default()
        };
        resume
            .contact_info
            .insert("source".into(), file_name.to_string());
        Ok(resume)
    }

    async fn load_profile(&self, credential: &Credential) -> Result<Option<PersonalInfo>, ApiError> {
        self.note_credential(Some(credential));
        Ok(self.stored_profile.lock().unwrap().clone())
    }

    async fn save_profile(
        &self,
        profile: &PersonalInfo,
        credential: &Credential,
    ) -> Result<(), ApiError> {
        self.note_credential(Some(credential));
        self.saved_profiles.lock().unwrap().push(profile.clone());
        Ok(())
    }

    async fn sample_profile(&self) -> Result<PersonalInfo, ApiError> {
        Ok(sample_profile("John"))
    }
}

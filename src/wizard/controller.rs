use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::api::{Backend, Credential};
use crate::error::WizardError;
use crate::poller::{PollEvent, PollMessage, PollerConfig, StatusPoller};
use crate::profile::{FieldError, PersonalInfo};
use crate::session::{ApplicationId, JobStatus, SessionState};
use crate::submission::SubmissionClient;

use super::stage::{Action, Stage};

/// Drives one application from URL capture to a terminal job status.
///
/// The controller is the only writer of [`SessionState`]. Backend results and
/// poller events are values it applies one at a time; nothing else holds a
/// mutable reference to the session.
pub struct WizardController<B: Backend + ?Sized + 'static> {
    backend: Arc<B>,
    submission: SubmissionClient<B>,
    poller: StatusPoller,
    credential: Option<Credential>,
    stage: Stage,
    session: SessionState,
    field_errors: Vec<FieldError>,
}

impl<B: Backend + ?Sized + 'static> WizardController<B> {
    pub fn new(backend: Arc<B>, poller_config: PollerConfig) -> Self {
        Self {
            submission: SubmissionClient::new(backend.clone()),
            backend,
            poller: StatusPoller::new(poller_config),
            credential: None,
            stage: Stage::CapturingUrl,
            session: SessionState::new(),
            field_errors: Vec::new(),
        }
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    /// Replace the credential used for subsequent calls. A poll that is
    /// already running keeps the credential it started with.
    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    /// Accept the job posting URL. Surrounding whitespace is ignored.
    pub fn provide_url(&mut self, raw: &str) -> Result<(), WizardError> {
        self.expect_stage(Stage::CapturingUrl, Action::UrlAccepted)?;
        let url = raw.trim();
        // Blank input is a form-level check; it never lands in `last_error`.
        if url.is_empty() {
            return Err(WizardError::EmptyUrl);
        }
        let invalid = match Url::parse(url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => None,
            Ok(u) => Some(format!("unsupported scheme {}", u.scheme())),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = invalid {
            return Err(self.fail(WizardError::InvalidUrl(reason)));
        }

        self.session.set_job_url(url.to_string())?;
        self.session.clear_error();
        self.advance(Action::UrlAccepted)
    }

    /// Send the resume file to the parsing service and keep what it returns.
    ///
    /// On failure the stage does not change and any previously parsed resume
    /// is kept.
    pub async fn upload_resume(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<(), WizardError> {
        self.expect_stage(Stage::CapturingResume, Action::ResumeParsed)?;
        self.session.clear_error();

        let parsed = self
            .backend
            .parse_resume(file_name, bytes, self.credential.as_ref())
            .await;
        match parsed {
            Ok(resume) => {
                debug!(file_name, skills = resume.skills.len(), "resume parsed");
                self.session.set_resume(resume)?;
                self.advance(Action::ResumeParsed)
            }
            Err(err) => {
                warn!(file_name, error = %err, "resume ingestion failed");
                Err(self.fail(WizardError::Ingestion(err.message())))
            }
        }
    }

    /// The signed-in user's stored profile, for prefilling the form.
    /// Without a credential this returns `None` without contacting anyone.
    pub async fn load_saved_profile(&mut self) -> Result<Option<PersonalInfo>, WizardError> {
        let Some(credential) = self.credential.as_ref() else {
            return Ok(None);
        };
        match self.backend.load_profile(credential).await {
            Ok(profile) => Ok(profile),
            Err(err) => {
                warn!(error = %err, "could not load stored profile");
                Err(self.fail(WizardError::ProfileStore(err.message())))
            }
        }
    }

    /// The backend's example profile, for prefilling the form.
    pub async fn load_sample_profile(&mut self) -> Result<PersonalInfo, WizardError> {
        match self.backend.sample_profile().await {
            Ok(profile) => Ok(profile),
            Err(err) => Err(self.fail(WizardError::ProfileStore(err.message()))),
        }
    }

    /// Validate and accept the profile form.
    ///
    /// Invalid input leaves the stage unchanged and lists the offending fields
    /// in [`field_errors`](Self::field_errors). With a credential the accepted
    /// profile is also written to the profile store; a failed write is logged
    /// and does not block the wizard.
    pub async fn provide_profile(&mut self, profile: PersonalInfo) -> Result<(), WizardError> {
        self.expect_stage(Stage::CapturingProfile, Action::ProfileAccepted)?;

        let errors = profile.validate();
        if !errors.is_empty() {
            self.field_errors = errors.clone();
            return Err(self.fail(WizardError::Validation(errors)));
        }
        self.field_errors.clear();
        self.session.clear_error();

        if let Some(credential) = self.credential.as_ref() {
            if let Err(err) = self.backend.save_profile(&profile, credential).await {
                warn!(error = %err, "profile not saved, continuing with this session only");
            }
        }

        self.session.set_profile(profile)?;
        self.advance(Action::ProfileAccepted)
    }

    /// Move forward from a capture stage whose data is already present,
    /// typically after navigating back.
    pub fn continue_with_captured(&mut self) -> Result<(), WizardError> {
        let (present, action) = match self.stage {
            Stage::CapturingUrl => (self.session.job_url().is_some(), Action::UrlAccepted),
            Stage::CapturingResume => (self.session.resume().is_some(), Action::ResumeParsed),
            Stage::CapturingProfile => (self.session.profile().is_some(), Action::ProfileAccepted),
            stage => {
                return Err(WizardError::IllegalTransition {
                    stage,
                    action: Action::UrlAccepted,
                });
            }
        };
        if !present {
            return Err(WizardError::MissingSessionData(missing_for(self.stage)));
        }
        self.advance(action)
    }

    /// Go to the previous capture stage, keeping everything captured so far.
    pub fn back(&mut self) -> Result<Stage, WizardError> {
        self.advance(Action::Back)?;
        Ok(self.stage)
    }

    /// Submit the reviewed application and start tracking it.
    ///
    /// Exactly one submission is made per call. When it fails the wizard
    /// returns to review with `last_error` set; calling again is a new attempt.
    pub async fn confirm(&mut self) -> Result<ApplicationId, WizardError> {
        self.expect_stage(Stage::Reviewing, Action::Confirm)?;
        let (job_url, resume, profile) = match (
            self.session.job_url(),
            self.session.resume(),
            self.session.profile(),
        ) {
            (Some(u), Some(r), Some(p)) => (u.to_string(), r.clone(), p.clone()),
            (None, _, _) => return Err(self.fail(WizardError::MissingSessionData("job URL"))),
            (_, None, _) => return Err(self.fail(WizardError::MissingSessionData("resume"))),
            (_, _, None) => return Err(self.fail(WizardError::MissingSessionData("profile"))),
        };

        self.session.clear_error();
        self.advance(Action::Confirm)?;

        let submitted = self
            .submission
            .submit(&job_url, &profile, &resume, self.credential.as_ref())
            .await;
        match submitted {
            Ok(id) => {
                self.session.set_application_id(id.clone())?;
                self.advance(Action::SubmissionAccepted)?;
                self.poller
                    .start(self.backend.clone(), id.clone(), self.credential.clone());
                Ok(id)
            }
            Err(err) => {
                self.advance(Action::SubmissionFailed)?;
                Err(self.fail(err))
            }
        }
    }

    /// Wait for the next poller event and apply it.
    ///
    /// Returns the stage afterwards, or `None` when nothing is being tracked.
    pub async fn next_update(&mut self) -> Option<Stage> {
        loop {
            let msg = self.poller.recv().await?;
            if self.apply(msg) {
                return Some(self.stage);
            }
        }
    }

    /// Apply every poller event that has already arrived, without waiting.
    /// Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(msg) = self.poller.try_recv() {
            if self.apply(msg) {
                applied += 1;
            }
        }
        applied
    }

    /// Keep applying poller events until tracking ends, calling `on_update`
    /// after each one.
    pub async fn run_to_completion<F>(&mut self, mut on_update: F) -> Stage
    where
        F: FnMut(&SessionState),
    {
        while self.stage == Stage::Tracking {
            if self.next_update().await.is_none() {
                // Loop ended without a final event (task panicked or aborted).
                let err = WizardError::TrackingUnreachable {
                    attempts: 0,
                    last_error: "status polling stopped unexpectedly".into(),
                };
                self.session.record_error(err);
                let _ = self.advance(Action::JobFailed);
                break;
            }
            on_update(&self.session);
        }
        self.stage
    }

    /// Discard the session and start over. Any active poll is cancelled
    /// before the new session exists.
    pub fn restart(&mut self) {
        if self.poller.cancel() {
            info!(session = %self.session.id, "tracking cancelled by restart");
        }
        let from = self.stage;
        self.session = SessionState::new();
        self.field_errors.clear();
        self.stage = from.next(Action::Restart).unwrap_or(Stage::CapturingUrl);
        info!(session = %self.session.id, %from, "wizard restarted");
    }

    /// Fold one poller message into the session. Messages from a superseded
    /// loop or for another application are dropped.
    fn apply(&mut self, msg: PollMessage) -> bool {
        let current = self.session.application_id();
        if self.stage != Stage::Tracking
            || !self.poller.accepts(&msg)
            || current != Some(&msg.application_id)
        {
            debug!(
                application_id = %msg.application_id,
                generation = msg.generation,
                "discarding stale status event"
            );
            return false;
        }

        match msg.event {
            PollEvent::Snapshot(snapshot) => {
                if let Err(err) = self.session.apply_snapshot(&snapshot) {
                    warn!(error = %err, "status snapshot not applied");
                    return false;
                }
            }
            PollEvent::Transient { attempt, error } => {
                debug!(attempt, %error, "status query failed, waiting for next tick");
                self.session.record_transient(error);
            }
            PollEvent::Terminal(snapshot) => {
                self.poller.cancel();
                if let Err(err) = self.session.apply_snapshot(&snapshot) {
                    warn!(error = %err, "terminal snapshot not applied");
                }
                if snapshot.status == JobStatus::Completed {
                    self.session.clear_error();
                    let _ = self.advance(Action::JobCompleted);
                } else {
                    self.session
                        .record_error(WizardError::TerminalJob(snapshot.message.clone()));
                    let _ = self.advance(Action::JobFailed);
                }
            }
            PollEvent::Exhausted { attempts, error } => {
                self.poller.cancel();
                self.session.record_error(WizardError::TrackingUnreachable {
                    attempts,
                    last_error: error,
                });
                let _ = self.advance(Action::JobFailed);
            }
            PollEvent::TimedOut { elapsed } => {
                self.poller.cancel();
                self.session
                    .record_error(WizardError::TrackingTimedOut(elapsed.as_secs()));
                let _ = self.advance(Action::JobFailed);
            }
        }
        true
    }

    fn advance(&mut self, action: Action) -> Result<(), WizardError> {
        match self.stage.next(action) {
            Some(next) => {
                info!(session = %self.session.id, from = %self.stage, to = %next, %action, "stage transition");
                self.stage = next;
                Ok(())
            }
            None => Err(WizardError::IllegalTransition {
                stage: self.stage,
                action,
            }),
        }
    }

    fn expect_stage(&self, stage: Stage, action: Action) -> Result<(), WizardError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(WizardError::IllegalTransition {
                stage: self.stage,
                action,
            })
        }
    }

    /// Record `err` as the session's last error and hand it back.
    fn fail(&mut self, err: WizardError) -> WizardError {
        self.session.record_error(err.clone());
        err
    }
}

fn missing_for(stage: Stage) -> &'static str {
    match stage {
        Stage::CapturingUrl => "job URL",
        Stage::CapturingResume => "resume",
        _ => "profile",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::sleep;

    use super::*;
    use crate::profile::sample_profile;
    use crate::testing::{ScriptedBackend, StatusReply};

    const JOB_URL: &str = "https://example.com/apply";

    fn wizard(backend: &Arc<ScriptedBackend>) -> WizardController<ScriptedBackend> {
        WizardController::new(backend.clone(), PollerConfig::default())
    }

    async fn reviewed(backend: &Arc<ScriptedBackend>) -> WizardController<ScriptedBackend> {
        let mut w = wizard(backend);
        w.provide_url(JOB_URL).unwrap();
        w.upload_resume("resume.pdf", b"%PDF".to_vec()).await.unwrap();
        w.provide_profile(sample_profile("Ada")).await.unwrap();
        assert_eq!(w.stage(), Stage::Reviewing);
        w
    }

    #[test]
    fn url_is_trimmed_and_advances() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut w = wizard(&backend);
        w.provide_url("  https://example.com/apply \n").unwrap();
        assert_eq!(w.stage(), Stage::CapturingResume);
        assert_eq!(w.session().job_url(), Some(JOB_URL));
    }

    #[test]
    fn empty_or_malformed_url_does_not_advance() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut w = wizard(&backend);

        assert!(matches!(w.provide_url("   "), Err(WizardError::EmptyUrl)));
        assert!(w.session().last_error().is_none());
        assert!(matches!(w.provide_url("not a url"), Err(WizardError::InvalidUrl(_))));
        assert!(matches!(w.session().last_error(), Some(WizardError::InvalidUrl(_))));
        assert!(matches!(w.provide_url("ftp://example.com/job"), Err(WizardError::InvalidUrl(_))));
        assert_eq!(w.stage(), Stage::CapturingUrl);
        assert!(w.session().job_url().is_none());
    }

    #[tokio::test]
    async fn failed_ingestion_stays_on_resume_stage() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.fail_next_resume(500, r#"{"detail": "Error parsing resume: encrypted PDF"}"#);
        let mut w = wizard(&backend);
        w.provide_url(JOB_URL).unwrap();

        let err = w.upload_resume("resume.pdf", vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, WizardError::Ingestion(ref m) if m.contains("encrypted PDF")));
        assert_eq!(w.stage(), Stage::CapturingResume);
        assert!(w.session().resume().is_none());
        assert!(w.session().last_error().is_some());

        // Re-uploading recovers and clears the error.
        w.upload_resume("resume.pdf", vec![1, 2, 3]).await.unwrap();
        assert_eq!(w.stage(), Stage::CapturingProfile);
        assert!(w.session().last_error().is_none());
        assert_eq!(w.session().resume().unwrap().skills, vec!["Python", "SQL"]);
    }

    #[tokio::test]
    async fn invalid_profile_lists_field_errors() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut w = wizard(&backend);
        w.provide_url(JOB_URL).unwrap();
        w.upload_resume("resume.pdf", vec![]).await.unwrap();

        let mut profile = sample_profile("Ada");
        profile.email = "ada-at-example".into();
        profile.address.city = String::new();
        let err = w.provide_profile(profile).await.unwrap_err();

        assert!(matches!(err, WizardError::Validation(_)));
        let fields: Vec<_> = w.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "address.city"]);
        assert_eq!(w.stage(), Stage::CapturingProfile);
        assert!(w.session().profile().is_none());
    }

    #[tokio::test]
    async fn profile_is_saved_only_with_credential() {
        let backend = Arc::new(ScriptedBackend::new());
        reviewed(&backend).await;
        assert!(backend.saved_profiles().is_empty());

        let mut w = wizard(&backend).with_credential(Credential::new("tok"));
        w.provide_url(JOB_URL).unwrap();
        w.upload_resume("resume.pdf", vec![]).await.unwrap();
        w.provide_profile(sample_profile("Ada")).await.unwrap();
        assert_eq!(backend.saved_profiles().len(), 1);
        assert_eq!(backend.saved_profiles()[0].first_name, "Ada");
    }

    #[tokio::test]
    async fn saved_profile_requires_credential() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.store_profile(sample_profile("Grace"));

        let mut anonymous = wizard(&backend);
        assert_eq!(anonymous.load_saved_profile().await.unwrap(), None);
        assert!(backend.credentials_seen().is_empty());

        let mut signed_in = wizard(&backend).with_credential(Credential::new("tok"));
        let profile = signed_in.load_saved_profile().await.unwrap().unwrap();
        assert_eq!(profile.first_name, "Grace");
    }

    #[tokio::test]
    async fn sample_profile_prefills_a_valid_form() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut w = wizard(&backend);
        let sample = w.load_sample_profile().await.unwrap();
        assert!(sample.validate().is_empty());
        assert_eq!(w.stage(), Stage::CapturingUrl);
    }

    #[tokio::test]
    async fn back_keeps_captured_data() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut w = reviewed(&backend).await;

        assert_eq!(w.back().unwrap(), Stage::CapturingProfile);
        assert_eq!(w.back().unwrap(), Stage::CapturingResume);
        assert_eq!(w.back().unwrap(), Stage::CapturingUrl);
        assert!(matches!(w.back(), Err(WizardError::IllegalTransition { .. })));

        assert_eq!(w.session().job_url(), Some(JOB_URL));
        assert!(w.session().resume().is_some());
        assert!(w.session().profile().is_some());

        w.continue_with_captured().unwrap();
        w.continue_with_captured().unwrap();
        w.continue_with_captured().unwrap();
        assert_eq!(w.stage(), Stage::Reviewing);
        assert_eq!(backend.resume_uploads(), 1);
    }

    #[tokio::test]
    async fn profile_can_be_edited_before_submission() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut w = reviewed(&backend).await;
        w.back().unwrap();
        w.provide_profile(sample_profile("Augusta")).await.unwrap();
        assert_eq!(w.session().profile().unwrap().first_name, "Augusta");
    }

    #[tokio::test(start_paused = true)]
    async fn one_submission_per_confirmation() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::ok(JobStatus::Processing, 10));
        let mut w = reviewed(&backend).await;

        let id = w.confirm().await.unwrap();
        assert_eq!(backend.submissions().len(), 1);
        assert_eq!(w.stage(), Stage::Tracking);
        assert_eq!(w.session().application_id(), Some(&id));
        assert!(w.is_polling());

        // Not in review any more, so a second confirm is refused outright.
        assert!(matches!(w.confirm().await, Err(WizardError::IllegalTransition { .. })));
        assert_eq!(backend.submissions().len(), 1);

        let body = &backend.submissions()[0];
        assert_eq!(body["url"], JOB_URL);
        assert_eq!(body["personal_info"]["first_name"], "Ada");
        assert_eq!(body["resume_data"]["skills"], json!(["Python", "SQL"]));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submission_returns_to_review_and_retry_is_a_new_attempt() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.fail_next_submission(400, r#"{"detail": "Unsupported job board"}"#);
        backend.push_status(StatusReply::ok(JobStatus::Processing, 10));
        let mut w = reviewed(&backend).await;

        let err = w.confirm().await.unwrap_err();
        assert!(matches!(err, WizardError::SubmissionRejected(_)));
        assert_eq!(w.stage(), Stage::Reviewing);
        assert_eq!(
            w.session().last_error().map(ToString::to_string).as_deref(),
            Some("Application rejected: Unsupported job board")
        );
        assert!(w.session().application_id().is_none());
        assert!(!w.is_polling());

        let id = w.confirm().await.unwrap();
        assert_eq!(id.as_str(), "app_2");
        assert_eq!(backend.submissions().len(), 2);
        assert!(w.session().last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn confirming_after_restart_gets_a_distinct_id() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::ok(JobStatus::Processing, 10).delayed(Duration::from_secs(60)));
        let mut w = reviewed(&backend).await;
        let first = w.confirm().await.unwrap();

        w.restart();
        w.provide_url(JOB_URL).unwrap();
        w.upload_resume("resume.pdf", vec![]).await.unwrap();
        w.provide_profile(sample_profile("Ada")).await.unwrap();
        let second = w.confirm().await.unwrap();

        assert_ne!(first, second);
        assert_eq!(backend.submissions()[0], backend.submissions()[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn status_and_progress_only_move_forward() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::ok(JobStatus::Idle, 0));
        backend.push_status(StatusReply::ok(JobStatus::Processing, 20));
        backend.push_status(StatusReply::ok(JobStatus::Processing, 60));
        backend.push_status(StatusReply::ok(JobStatus::Idle, 40));
        backend.push_status(StatusReply::ok(JobStatus::Processing, 90));
        backend.push_status(StatusReply::ok(JobStatus::Completed, 100));
        let mut w = reviewed(&backend).await;
        w.confirm().await.unwrap();

        let mut progress = Vec::new();
        let stage = w
            .run_to_completion(|s| progress.push(s.progress().unwrap()))
            .await;

        assert_eq!(stage, Stage::Completed);
        assert!(progress.windows(2).all(|p| p[0] <= p[1]), "{progress:?}");
        assert_eq!(progress, vec![0, 20, 60, 60, 90, 100]);
        assert_eq!(
            w.session().status_history(),
            &[JobStatus::Idle, JobStatus::Processing, JobStatus::Completed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restart_during_in_flight_poll_leaves_new_session_untouched() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(
            StatusReply::ok(JobStatus::Completed, 100).delayed(Duration::from_secs(3)),
        );
        let mut w = reviewed(&backend).await;
        w.confirm().await.unwrap();

        // The first query is issued and is waiting on its slow response.
        sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.status_calls(), 1);

        w.restart();
        let fresh_id = w.session().id;
        sleep(Duration::from_secs(10)).await;

        assert_eq!(w.pump(), 0);
        assert!(w.next_update().await.is_none());
        assert_eq!(w.stage(), Stage::CapturingUrl);
        assert_eq!(w.session().id, fresh_id);
        assert_eq!(w.session().status(), JobStatus::Idle);
        assert_eq!(w.session().progress(), None);
        assert!(w.session().application_id().is_none());
        assert!(w.session().status_history().is_empty());
        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_transient_failure_does_not_fail_tracking() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::ok(JobStatus::Processing, 10));
        backend.push_status(StatusReply::unavailable());
        backend.push_status(StatusReply::ok(JobStatus::Processing, 50));
        backend.push_status(StatusReply::ok(JobStatus::Completed, 100));
        let mut w = reviewed(&backend).await;
        w.confirm().await.unwrap();

        assert_eq!(w.next_update().await, Some(Stage::Tracking));
        assert_eq!(w.next_update().await, Some(Stage::Tracking));
        assert!(w.session().last_transient().is_some());
        assert!(w.session().last_error().is_none());

        assert_eq!(w.run_to_completion(|_| {}).await, Stage::Completed);
        assert!(w.session().last_transient().is_none());
        assert!(w.session().last_error().is_none());
        assert_eq!(backend.status_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_poll_is_reported_but_not_fatal() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::failing(401, r#"{"detail": "Could not validate credentials"}"#));
        backend.push_status(StatusReply::ok(JobStatus::Completed, 100));
        let mut w = reviewed(&backend).await;
        w.confirm().await.unwrap();

        w.next_update().await;
        assert_eq!(
            w.session().last_transient(),
            Some("unauthorized: Could not validate credentials")
        );
        assert_eq!(w.stage(), Stage::Tracking);
        assert_eq!(w.run_to_completion(|_| {}).await, Stage::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_endpoint_fails_after_retry_cap() {
        let backend = Arc::new(ScriptedBackend::new());
        for _ in 0..10 {
            backend.push_status(StatusReply::unavailable());
        }
        let mut w = reviewed(&backend).await;
        w.confirm().await.unwrap();

        assert_eq!(w.run_to_completion(|_| {}).await, Stage::Failed);
        assert!(matches!(
            w.session().last_error(),
            Some(WizardError::TrackingUnreachable { attempts: 6, .. })
        ));
        assert!(!w.is_polling());
        assert_eq!(backend.status_calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_job_ends_tracking() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::ok(JobStatus::Processing, 10));
        backend.push_status(StatusReply::ok(JobStatus::Processing, 60));
        backend.push_status(
            StatusReply::ok(JobStatus::Completed, 100).details(json!({"successful": true})),
        );
        let mut w = reviewed(&backend).await;
        w.confirm().await.unwrap();

        assert_eq!(w.run_to_completion(|_| {}).await, Stage::Completed);
        assert_eq!(w.session().progress(), Some(100));
        assert_eq!(w.session().details().unwrap()["successful"], true);
        assert!(w.session().last_error().is_none());
        assert!(!w.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn job_error_fails_with_backend_message() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::ok(JobStatus::Processing, 10));
        backend.push_status(StatusReply::ok(JobStatus::Processing, 60));
        backend.push_status(StatusReply::ok(JobStatus::Error, 0).message("form not found"));
        backend.push_status(StatusReply::ok(JobStatus::Processing, 70));
        let mut w = reviewed(&backend).await;
        w.confirm().await.unwrap();

        assert_eq!(w.run_to_completion(|_| {}).await, Stage::Failed);
        assert_eq!(
            w.session().last_error().map(ToString::to_string).as_deref(),
            Some("form not found")
        );
        assert_eq!(w.session().status(), JobStatus::Error);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.status_calls(), 3);
        assert!(w.next_update().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_from_terminal_begins_a_new_session() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::ok(JobStatus::Completed, 100));
        let mut w = reviewed(&backend).await;
        let old_session = w.session().id;
        w.confirm().await.unwrap();
        w.run_to_completion(|_| {}).await;

        w.restart();
        assert_eq!(w.stage(), Stage::CapturingUrl);
        assert_ne!(w.session().id, old_session);
        assert!(w.session().job_url().is_none());
        assert_eq!(w.session().status(), JobStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn credential_reaches_poller() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(StatusReply::ok(JobStatus::Completed, 100));
        let mut w = reviewed(&backend).await;
        let before = backend.credentials_seen().len();
        w.set_credential(Credential::new("tok"));
        w.confirm().await.unwrap();
        w.run_to_completion(|_| {}).await;

        let seen = &backend.credentials_seen()[before..];
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|c| c.as_deref() == Some("tok")));
    }
}

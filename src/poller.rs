//! Status polling for a submitted application.
//!
//! A [`StatusPoller`] owns at most one polling loop. Each loop runs on its own
//! tokio task, queries the backend once immediately and then again `interval`
//! after every completed query, and reports through a channel that belongs to
//! that loop alone. Cancelling a loop drops its receiver and races the
//! cancellation token against the in-flight query, so a response that lands
//! after cancellation is never delivered.
//!
//! ```text
//!   start() ──→ query ──→ Snapshot ──→ sleep(interval) ──→ query ──→ … ──→ Terminal
//!                 │
//!                 └─ error ──→ Transient ──→ sleep(backoff) ──→ query   (≤ max_retries)
//!                                   └──────────────────────────────────→ Exhausted
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{Backend, Credential};
use crate::session::{ApplicationId, StatusSnapshot};

/// Backoff for consecutive failed status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Consecutive failures tolerated before the loop gives up.
    pub max_retries: u32,
    /// Delay after the first failure; doubles for each further one.
    pub base_delay_ms: u64,
    /// Upper bound for a single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// delay = base_delay_ms * 2^(attempt - 1), capped at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        self.base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Pause between a completed query and the next one.
    pub interval: Duration,
    pub retry: RetryConfig,
    /// Give up after this much wall-clock time; `None` polls until terminal.
    pub deadline: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::with_interval(Duration::from_secs(2))
    }
}

impl PollerConfig {
    /// Default policy with a custom interval; the first retry after a failure
    /// waits exactly one interval.
    pub fn with_interval(interval: Duration) -> Self {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self {
            interval,
            retry: RetryConfig {
                base_delay_ms: millis,
                max_delay_ms: millis.saturating_mul(15).max(millis),
                ..RetryConfig::default()
            },
            deadline: None,
        }
    }
}

/// What one polling cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Job still running.
    Snapshot(StatusSnapshot),
    /// Job reached `Completed` or `Error`; the loop has ended.
    Terminal(StatusSnapshot),
    /// A query failed; the loop will retry.
    Transient { attempt: u32, error: String },
    /// Too many consecutive failures; the loop has ended.
    Exhausted { attempts: u32, error: String },
    /// The wall-clock deadline passed; the loop has ended.
    TimedOut { elapsed: Duration },
}

impl PollEvent {
    /// Whether the loop stops after emitting this event.
    pub fn is_final(&self) -> bool {
        !matches!(self, PollEvent::Snapshot(_) | PollEvent::Transient { .. })
    }
}

/// A [`PollEvent`] tagged with the loop that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PollMessage {
    pub generation: u64,
    pub application_id: ApplicationId,
    pub event: PollEvent,
}

struct ActiveLoop {
    generation: u64,
    application_id: ApplicationId,
    token: CancellationToken,
    task: JoinHandle<()>,
    rx: mpsc::UnboundedReceiver<PollMessage>,
}

/// Owner of the single polling loop for a session.
pub struct StatusPoller {
    config: PollerConfig,
    generation: u64,
    active: Option<ActiveLoop>,
}

impl StatusPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self {
            config,
            generation: 0,
            active: None,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Start polling `application_id`, cancelling any loop already running.
    /// Returns the generation of the new loop.
    pub fn start<B>(
        &mut self,
        backend: Arc<B>,
        application_id: ApplicationId,
        credential: Option<Credential>,
    ) -> u64
    where
        B: Backend + ?Sized + 'static,
    {
        self.cancel();
        self.generation += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let worker = PollLoop {
            backend,
            application_id: application_id.clone(),
            credential,
            config: self.config.clone(),
            token: token.clone(),
            generation: self.generation,
            tx,
        };
        info!(%application_id, generation = self.generation, "status polling started");
        let task = tokio::spawn(worker.run());

        self.active = Some(ActiveLoop {
            generation: self.generation,
            application_id,
            token,
            task,
            rx,
        });
        self.generation
    }

    /// Stop the active loop, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                active.token.cancel();
                active.task.abort();
                debug!(
                    application_id = %active.application_id,
                    generation = active.generation,
                    "status polling cancelled"
                );
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_application(&self) -> Option<&ApplicationId> {
        self.active.as_ref().map(|a| &a.application_id)
    }

    /// Whether `msg` came from the loop that is currently active.
    pub fn accepts(&self, msg: &PollMessage) -> bool {
        self.active.as_ref().is_some_and(|a| {
            a.generation == msg.generation && a.application_id == msg.application_id
        })
    }

    /// Wait for the next message of the active loop. `None` when nothing is
    /// being polled or the loop ended without a final event.
    pub async fn recv(&mut self) -> Option<PollMessage> {
        let active = self.active.as_mut()?;
        let msg = active.rx.recv().await;
        if msg.is_none() {
            self.active = None;
        }
        msg
    }

    /// Take a message that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<PollMessage> {
        let active = self.active.as_mut()?;
        match active.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.active = None;
                None
            }
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct PollLoop<B: ?Sized> {
    backend: Arc<B>,
    application_id: ApplicationId,
    credential: Option<Credential>,
    config: PollerConfig,
    token: CancellationToken,
    generation: u64,
    tx: mpsc::UnboundedSender<PollMessage>,
}

impl<B: Backend + ?Sized> PollLoop<B> {
    async fn run(self) {
        let started = Instant::now();
        let give_up_at = self.config.deadline.map(|d| started + d);
        let mut failures: u32 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                _ = until(give_up_at) => return self.time_out(started),
                outcome = self
                    .backend
                    .application_status(&self.application_id, self.credential.as_ref()) => outcome,
            };

            let delay = match outcome {
                Ok(snapshot) if snapshot.status.is_terminal() => {
                    info!(
                        application_id = %self.application_id,
                        status = %snapshot.status,
                        "job reached terminal status"
                    );
                    self.emit(PollEvent::Terminal(snapshot));
                    return;
                }
                Ok(snapshot) => {
                    failures = 0;
                    debug!(
                        application_id = %self.application_id,
                        status = %snapshot.status,
                        progress = snapshot.progress,
                        "status polled"
                    );
                    if !self.emit(PollEvent::Snapshot(snapshot)) {
                        return;
                    }
                    self.config.interval
                }
                Err(err) => {
                    failures += 1;
                    let error = err.to_string();
                    if failures > self.config.retry.max_retries {
                        warn!(
                            application_id = %self.application_id,
                            attempts = failures,
                            %error,
                            "giving up on status polling"
                        );
                        self.emit(PollEvent::Exhausted {
                            attempts: failures,
                            error,
                        });
                        return;
                    }
                    let delay_ms = self.config.retry.delay_for_attempt(failures);
                    warn!(
                        application_id = %self.application_id,
                        attempt = failures,
                        max = self.config.retry.max_retries,
                        delay_ms,
                        %error,
                        "status query failed, retrying"
                    );
                    if !self.emit(PollEvent::Transient {
                        attempt: failures,
                        error,
                    }) {
                        return;
                    }
                    Duration::from_millis(delay_ms)
                }
            };

            tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                _ = until(give_up_at) => return self.time_out(started),
                _ = sleep(delay) => {}
            }
        }
    }

    fn time_out(&self, started: Instant) {
        let elapsed = started.elapsed();
        warn!(application_id = %self.application_id, ?elapsed, "tracking deadline reached");
        self.emit(PollEvent::TimedOut { elapsed });
    }

    /// Deliver an event unless the loop was cancelled or nobody listens.
    fn emit(&self, event: PollEvent) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.tx
            .send(PollMessage {
                generation: self.generation,
                application_id: self.application_id.clone(),
                event,
            })
            .is_ok()
    }
}

/// Resolves at `at`, or never when there is no deadline.
async fn until(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

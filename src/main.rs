mod cli;
mod ui;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use job_autofill::config::TOKEN_ENV;
use job_autofill::profile::PersonalInfo;
use job_autofill::{
    ApiClient, ApplicationId, AutofillConfig, Backend, JobStatus, PollEvent, SessionState, Stage,
    StatusPoller, WizardController, WizardError,
};
use ui::TrackingProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let client = ApiClient::with_timeout(&config.api_base_url, config.request_timeout())
        .context("building HTTP client")?;
    info!(api = client.base_url(), "using backend");

    match cli.command {
        Command::Apply {
            url,
            resume,
            profile,
            sample_profile,
            dry_run,
        } => {
            let options = ApplyOptions {
                url: &url,
                resume: &resume,
                profile: profile.as_deref(),
                sample_profile,
                dry_run,
            };
            apply(Arc::new(client), &config, options).await
        }
        Command::Status { id } => {
            let snapshot = client
                .application_status(&ApplicationId::new(id), config.credential().as_ref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        Command::Track { id } => track(Arc::new(client), &config, ApplicationId::new(id)).await,
        Command::SampleProfile => {
            let profile = client.sample_profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Arquivo de configuração (padrão `autofill.toml`), depois variável de ambiente, depois flags.
fn load_config(cli: &Cli) -> Result<AutofillConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            AutofillConfig::load_from(path, std::env::var(TOKEN_ENV).ok())?
        }
        None => AutofillConfig::load()?,
    };
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.token = token.clone();
    }
    if let Some(ms) = cli.poll_interval_ms {
        if ms == 0 {
            bail!("--poll-interval-ms must be greater than zero");
        }
        config.poll_interval_ms = ms;
    }
    Ok(config)
}

struct ApplyOptions<'a> {
    url: &'a str,
    resume: &'a Path,
    profile: Option<&'a Path>,
    sample_profile: bool,
    dry_run: bool,
}

async fn apply(client: Arc<ApiClient>, config: &AutofillConfig, opts: ApplyOptions<'_>) -> Result<()> {
    let mut wizard =
        WizardController::new(client, config.poller_config()).with_credential(config.credential());

    wizard.provide_url(opts.url)?;

    let bytes = tokio::fs::read(opts.resume)
        .await
        .with_context(|| format!("reading resume {}", opts.resume.display()))?;
    let file_name = opts
        .resume
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume".into());
    wizard.upload_resume(&file_name, bytes).await?;

    let profile = choose_profile(&mut wizard, opts.profile, opts.sample_profile).await?;
    if let Err(err) = wizard.provide_profile(profile).await {
        if matches!(err, WizardError::Validation(_)) {
            eprintln!("Profile is incomplete:");
            ui::print_field_errors(wizard.field_errors());
        }
        return Err(err.into());
    }

    ui::print_review(wizard.session());
    if opts.dry_run {
        println!("Dry run: nothing was submitted.");
        return Ok(());
    }

    let id = wizard.confirm().await?;
    println!("Submitted application {id}");

    let mut progress = TrackingProgress::start(id.as_str());
    let finished = tokio::select! {
        stage = wizard.run_to_completion(|session| progress.update(session)) => Some(stage),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(stage) = finished else {
        progress.abandon("cancelled");
        wizard.restart();
        warn!(application_id = %id, "tracking cancelled; the job may still be running");
        println!("Tracking cancelled. Check later with `autofill status {id}`.");
        return Ok(());
    };

    progress.finish(stage, wizard.session());
    ui::print_summary(wizard.session());
    if stage == Stage::Failed {
        bail!("application {id} did not complete");
    }
    Ok(())
}

async fn choose_profile(
    wizard: &mut WizardController<ApiClient>,
    path: Option<&Path>,
    sample: bool,
) -> Result<PersonalInfo> {
    if let Some(path) = path {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading profile {}", path.display()))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("parsing profile {}", path.display()));
    }
    if sample {
        return Ok(wizard.load_sample_profile().await?);
    }
    match wizard.load_saved_profile().await? {
        Some(profile) => Ok(profile),
        None => bail!("no profile available: pass --profile <FILE> or --sample-profile"),
    }
}

/// Acompanha uma candidatura já enviada, sem passar pelo assistente.
async fn track(client: Arc<ApiClient>, config: &AutofillConfig, id: ApplicationId) -> Result<()> {
    let mut session = SessionState::new();
    session.set_application_id(id.clone())?;

    let mut poller = StatusPoller::new(config.poller_config());
    poller.start(client, id.clone(), config.credential());
    let mut progress = TrackingProgress::start(id.as_str());

    let mut completed = false;
    loop {
        let next = tokio::select! {
            msg = poller.recv() => Some(msg),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(msg) = next else {
            poller.cancel();
            progress.abandon("cancelled");
            return Ok(());
        };
        let Some(msg) = msg else { break };

        match msg.event {
            PollEvent::Snapshot(snapshot) => {
                session.apply_snapshot(&snapshot)?;
            }
            PollEvent::Transient { error, .. } => session.record_transient(error),
            PollEvent::Terminal(snapshot) => {
                session.apply_snapshot(&snapshot)?;
                completed = snapshot.status == JobStatus::Completed;
                if !completed {
                    session.record_error(WizardError::TerminalJob(snapshot.message));
                }
            }
            PollEvent::Exhausted { attempts, error } => {
                session.record_error(WizardError::TrackingUnreachable {
                    attempts,
                    last_error: error,
                });
            }
            PollEvent::TimedOut { elapsed } => {
                session.record_error(WizardError::TrackingTimedOut(elapsed.as_secs()));
            }
        }
        progress.update(&session);
    }

    let stage = if completed { Stage::Completed } else { Stage::Failed };
    progress.finish(stage, &session);
    ui::print_summary(&session);
    if !completed {
        bail!("application {id} did not complete");
    }
    Ok(())
}

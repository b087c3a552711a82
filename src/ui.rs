//! Interface de terminal do autofill: barra de progresso e saída colorida.
//!
//! Usa `indicatif` para a barra de progresso e `console` para estilização
//! com cores. O [`TrackingProgress`] acompanha visualmente o processamento
//! de uma candidatura no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use job_autofill::profile::FieldError;
use job_autofill::{JobStatus, SessionState, Stage};

/// Indicador visual de progresso para o acompanhamento de uma candidatura.
///
/// A barra vai de 0 a 100 seguindo o progresso reportado pelo backend.
/// Falhas transitórias aparecem em amarelo, sucesso em verde e falha em vermelho.
pub struct TrackingProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    // Última falha transitória exibida, para não repetir a mesma linha.
    last_notice: Option<String>,
}

impl TrackingProgress {
    /// Inicia a barra para a candidatura `application_id`.
    pub fn start(application_id: &str) -> Self {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(style);
        pb.set_message(format!("{application_id}: waiting for status"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            last_notice: None,
        }
    }

    /// Reflete o estado atual da sessão na barra.
    pub fn update(&mut self, session: &SessionState) {
        if let Some(progress) = session.progress() {
            self.pb.set_position(u64::from(progress));
        }
        let status = session.status();
        match session.message() {
            Some(message) => self.pb.set_message(format!("{status}: {message}")),
            None => self.pb.set_message(format!("{status}")),
        }

        let notice = session.last_transient().map(str::to_string);
        if notice != self.last_notice {
            if let Some(reason) = &notice {
                self.pb.println(format!(
                    "  {} status check failed, retrying: {reason}",
                    self.yellow.apply_to("↻")
                ));
            }
            self.last_notice = notice;
        }
    }

    /// Finaliza a barra e exibe o resultado final.
    pub fn finish(&self, stage: Stage, session: &SessionState) {
        self.pb.finish_and_clear();
        match stage {
            Stage::Completed => {
                println!(
                    "  {} Application completed: {}",
                    self.green.apply_to("✓"),
                    session.message().unwrap_or("done")
                );
            }
            _ => {
                let reason = session
                    .last_error()
                    .map(ToString::to_string)
                    .or_else(|| session.message().map(str::to_string))
                    .unwrap_or_else(|| "tracking stopped".into());
                println!("  {} Application failed: {reason}", self.red.apply_to("✗"));
            }
        }
    }

    /// Interrompe a barra sem resultado (cancelamento pelo usuário).
    pub fn abandon(&self, note: &str) {
        self.pb.abandon_with_message(note.to_string());
    }
}

/// Imprime a sessão em JSON com cabeçalho colorido pelo status.
pub fn print_summary(session: &SessionState) {
    let style = match session.status() {
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Error => Style::new().red().bold(),
        _ => Style::new().yellow(),
    };
    println!();
    println!("{}", style.apply_to("─── Application Summary ───"));
    println!(
        "{}",
        serde_json::to_string_pretty(session).unwrap_or_default()
    );
}

/// Resumo legível do que será enviado.
pub fn print_review(session: &SessionState) {
    let bold = Style::new().bold();
    println!("{}", bold.apply_to("Review"));
    if let Some(url) = session.job_url() {
        println!("  Job URL:  {url}");
    }
    if let Some(profile) = session.profile() {
        println!("  Name:     {}", profile.full_name());
        println!("  Email:    {}", profile.email);
        println!("  Phone:    {}", profile.phone);
    }
    if let Some(resume) = session.resume() {
        if !resume.skills.is_empty() {
            println!("  Skills:   {}", resume.skills.join(", "));
        }
        if let Some(summary) = &resume.summary {
            println!("  Summary:  {summary}");
        }
    }
}

pub fn print_field_errors(errors: &[FieldError]) {
    let red = Style::new().red();
    for error in errors {
        eprintln!("  {} {error}", red.apply_to("•"));
    }
}

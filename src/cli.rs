//! Interface de linha de comando baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (apply, status, track,
//! sample-profile) e flags globais (--config, --api-url, --token, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Preenche e envia candidaturas de emprego e acompanha o processamento.
#[derive(Debug, Parser)]
#[command(name = "autofill", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./autofill.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// URL base da API, sobrepõe o arquivo de configuração.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Token bearer para o armazenamento de perfil e a API.
    #[arg(long, global = true, env = "AUTOFILL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Intervalo entre consultas de status, em milissegundos.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o assistente completo: URL, currículo, perfil, revisão e envio.
    Apply {
        /// URL da vaga.
        #[arg(long)]
        url: String,

        /// Arquivo do currículo (PDF, DOCX ou TXT).
        #[arg(long)]
        resume: PathBuf,

        /// Arquivo JSON com os dados pessoais.
        #[arg(long, conflicts_with = "sample_profile")]
        profile: Option<PathBuf>,

        /// Usa o perfil de exemplo do backend.
        #[arg(long)]
        sample_profile: bool,

        /// Para na revisão sem enviar.
        #[arg(long)]
        dry_run: bool,
    },

    /// Consulta o status de uma candidatura uma única vez.
    Status {
        /// Identificador retornado pelo envio.
        id: String,
    },

    /// Acompanha uma candidatura existente até o fim.
    Track {
        /// Identificador retornado pelo envio.
        id: String,
    },

    /// Imprime o perfil de exemplo em JSON.
    SampleProfile,
}

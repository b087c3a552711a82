//! Configuração carregada a partir de `autofill.toml`.
//!
//! A struct [`AutofillConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `AUTOFILL_TOKEN` tem precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::api::{Credential, DEFAULT_BASE_URL};
use crate::error::AutofillError;
use crate::poller::{PollerConfig, RetryConfig};

pub const CONFIG_FILE: &str = "autofill.toml";
pub const TOKEN_ENV: &str = "AUTOFILL_TOKEN";

/// Configuração de nível superior carregada de `autofill.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AutofillConfig {
    /// URL base da API do backend.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Token bearer; vazio significa sem autenticação.
    #[serde(default)]
    pub token: String,

    /// Intervalo entre consultas de status, em milissegundos.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Falhas consecutivas toleradas antes de desistir do acompanhamento.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Atraso máximo de backoff entre tentativas, em milissegundos.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Limite total de acompanhamento em segundos; 0 desativa o limite.
    #[serde(default)]
    pub tracking_timeout_secs: u64,

    /// Timeout de cada requisição HTTP, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AutofillConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            max_backoff_ms: default_max_backoff_ms(),
            tracking_timeout_secs: 0,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AutofillConfig {
    /// Carrega `autofill.toml` do diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, AutofillError> {
        Self::load_from(Path::new(CONFIG_FILE), std::env::var(TOKEN_ENV).ok())
    }

    /// Carrega a configuração de `path`, aplicando `env_token` por cima do arquivo.
    pub fn load_from(path: &Path, env_token: Option<String>) -> Result<Self, AutofillError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AutofillConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo para o token.
        if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
            config.token = token;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AutofillError> {
        if self.poll_interval_ms == 0 {
            return Err(AutofillError::Config(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_consecutive_failures == 0 {
            return Err(AutofillError::Config(
                "max_consecutive_failures must be at least 1".into(),
            ));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(AutofillError::Config("api_base_url must not be empty".into()));
        }
        Ok(())
    }

    pub fn credential(&self) -> Option<Credential> {
        Credential::new(self.token.as_str())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Política de acompanhamento derivada da configuração.
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            retry: RetryConfig {
                max_retries: self.max_consecutive_failures,
                base_delay_ms: self.poll_interval_ms,
                max_delay_ms: self.max_backoff_ms.max(self.poll_interval_ms),
            },
            deadline: (self.tracking_timeout_secs > 0)
                .then(|| Duration::from_secs(self.tracking_timeout_secs)),
        }
    }
}

//! Configuração do autoapply carregada a partir de `autoapply.toml`.
//!
//! A struct [`AutoApplyConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `GEMINI_API_KEY` tem precedência sobre o arquivo;
//! a chave é resolvida uma única vez aqui e passada ao cliente de
//! planejamento como valor imutável.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Configuração de nível superior carregada de `autoapply.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoApplyConfig {
    /// Chave da API Gemini.
    #[serde(default)]
    pub api_key: String,

    /// Modelo do serviço de raciocínio usado nas requisições de plano.
    #[serde(default = "default_model")]
    pub model: String,

    /// URL base do endpoint WebDriver local (geckodriver).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Limite de segurança: máximo de ciclos de plano/execução por alvo.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,

    /// Falhas consecutivas toleradas antes de marcar um alvo como falho.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Máximo de alvos processados em uma execução.
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,

    /// Segundos entre re-inspeções da página durante intervenção humana.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

// Valor padrão para o modelo: "gemini-2.5-flash".
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

// Valor padrão para o endpoint WebDriver local.
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

// Valor padrão para o limite de ciclos por alvo: 12.
fn default_max_cycles() -> u32 {
    12
}

// Valor padrão para falhas consecutivas: 3.
fn default_max_consecutive_failures() -> u32 {
    3
}

// Valor padrão para o máximo de alvos: 10.
fn default_max_targets() -> usize {
    10
}

// Valor padrão para o intervalo de polling: 10s.
fn default_poll_interval_secs() -> u64 {
    10
}

impl Default for AutoApplyConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            webdriver_url: default_webdriver_url(),
            max_cycles: default_max_cycles(),
            max_consecutive_failures: default_max_consecutive_failures(),
            max_targets: default_max_targets(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl AutoApplyConfig {
    /// Carrega a configuração de `autoapply.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("autoapply.toml"))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AutoApplyConfig>(&contents)?
        } else {
            Self::default()
        };

        // A variável de ambiente tem precedência sobre o arquivo de configuração para a chave API.
        if let Ok(key) = std::env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        Ok(config)
    }
}

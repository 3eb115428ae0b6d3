//! Server Configuration
//!
//! Process settings from the environment and the persisted agent
//! configuration in `config/agent.yaml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vea_core::{AgentConfig, AgentError, LoopConfig, ModelId, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/agent.yaml";

/// Settings read once at startup
#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub config_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub max_tool_rounds: usize,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let loop_defaults = LoopConfig::default();
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            cors_origins: vec!["http://localhost:3000".into()],
            max_tool_rounds: loop_defaults.max_tool_rounds,
            model_timeout: loop_defaults.model_timeout,
            tool_timeout: loop_defaults.tool_timeout,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

impl ServerSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            config_path: std::env::var("VEA_CONFIG_PATH").map_or(defaults.config_path, PathBuf::from),
            cors_origins: std::env::var("VEA_CORS_ORIGINS").map_or(defaults.cors_origins, |raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            }),
            max_tool_rounds: env_parse("VEA_MAX_TOOL_ROUNDS").unwrap_or(defaults.max_tool_rounds),
            model_timeout: env_parse("VEA_MODEL_TIMEOUT_SECS").map_or(defaults.model_timeout, Duration::from_secs),
            tool_timeout: env_parse("VEA_TOOL_TIMEOUT_SECS").map_or(defaults.tool_timeout, Duration::from_secs),
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            max_tool_rounds: self.max_tool_rounds,
            model_timeout: self.model_timeout,
            tool_timeout: self.tool_timeout,
            ..LoopConfig::default()
        }
    }
}

// ---- agent.yaml layout ----

#[derive(Debug, Serialize, Deserialize)]
struct AgentFile {
    llm_config: LlmSection,
    tools: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LlmSection {
    tool_llm: LlmEntry,
    vision_llm: LlmEntry,
}

#[derive(Debug, Serialize, Deserialize)]
struct LlmEntry {
    provider: String,
    name: String,
}

impl From<&ModelId> for LlmEntry {
    fn from(id: &ModelId) -> Self {
        Self {
            provider: id.provider().into(),
            name: id.name().into(),
        }
    }
}

impl TryFrom<AgentFile> for AgentConfig {
    type Error = AgentError;

    fn try_from(file: AgentFile) -> Result<Self> {
        Ok(Self {
            tool_model: ModelId::new(file.llm_config.tool_llm.provider, file.llm_config.tool_llm.name)?,
            vision_model: ModelId::new(file.llm_config.vision_llm.provider, file.llm_config.vision_llm.name)?,
            tools: file.tools,
        })
    }
}

impl From<&AgentConfig> for AgentFile {
    fn from(config: &AgentConfig) -> Self {
        Self {
            llm_config: LlmSection {
                tool_llm: (&config.tool_model).into(),
                vision_llm: (&config.vision_model).into(),
            },
            tools: config.tools.clone(),
        }
    }
}

/// Reads and writes the agent configuration file
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, writing defaults first if the file is missing
    pub async fn load(&self) -> Result<AgentConfig> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "Config file not found, writing defaults");
                let config = AgentConfig::default();
                self.save(&config).await?;
                return Ok(config);
            }
            Err(e) => return Err(e.into()),
        };

        let file: AgentFile = serde_yaml::from_str(&raw)
            .map_err(|e| AgentError::Config(format!("{}: {e}", self.path.display())))?;
        let config = AgentConfig::try_from(file)?;

        tracing::info!(
            path = %self.path.display(),
            tool_model = %config.tool_model,
            vision_model = %config.vision_model,
            "Loaded agent config"
        );
        Ok(config)
    }

    pub async fn save(&self, config: &AgentConfig) -> Result<()> {
        let yaml = serde_yaml::to_string(&AgentFile::from(config))
            .map_err(|e| AgentError::Config(format!("failed to encode config: {e}")))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.path, yaml).await?;

        tracing::info!(path = %self.path.display(), "Saved agent config");
        Ok(())
    }
}

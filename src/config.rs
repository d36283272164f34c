use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::context::ContextConfig;

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SolaceConfig {
    pub gateway: GatewayConfig,
    pub generator: GeneratorConfig,
    pub persona: PersonaConfig,
    pub memory: MemoryConfig,
}

#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    7300
}
fn default_bind() -> String {
    "127.0.0.1".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    /// Override for OpenAI-compatible endpoints (proxy, local server).
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,
    #[serde(default = "default_personality")]
    pub personality: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            personality: default_personality(),
        }
    }
}

fn default_persona_name() -> String {
    "Aster".into()
}
fn default_personality() -> String {
    "warm and attentive".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Defaults to `max_messages / 2` when unset.
    pub target_length: Option<usize>,
    #[serde(default = "default_periodic_scan")]
    pub periodic_scan: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            target_length: None,
            periodic_scan: default_periodic_scan(),
        }
    }
}

fn default_max_messages() -> usize {
    20
}
fn default_periodic_scan() -> usize {
    50
}

impl SolaceConfig {
    /// Derive the context-manager tuning from the memory section.
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            max_messages: self.memory.max_messages,
            target_length: self
                .memory
                .target_length
                .unwrap_or(self.memory.max_messages / 2),
            generation_timeout: Duration::from_secs(self.generator.timeout_secs),
            periodic_scan: self.memory.periodic_scan,
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Search order:
/// 1. `SOLACE_CONFIG` env var
/// 2. `~/.solace/config.toml`
/// 3. Zero-config defaults (no file needed)
pub fn load() -> anyhow::Result<SolaceConfig> {
    let path = config_path();

    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let mut config: SolaceConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))?;

        resolve_api_key(&mut config);
        validate(&config)?;

        info!("loaded config from {}", path.display());
        Ok(config)
    } else {
        info!("no config file found, using zero-config defaults");
        let mut config = SolaceConfig::default();
        resolve_api_key(&mut config);
        Ok(config)
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SOLACE_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".solace").join("config.toml")
}

/// Resolve the API key from the environment if not set in the config.
fn resolve_api_key(config: &mut SolaceConfig) {
    if config.generator.api_key.is_none() {
        config.generator.api_key = std::env::var("OPENAI_API_KEY").ok();
    }
}

/// Validate the config and return clear error messages.
pub fn validate(config: &SolaceConfig) -> anyhow::Result<()> {
    if config.generator.provider != "openai" {
        anyhow::bail!(
            "invalid provider '{}': only 'openai' (and compatible endpoints via \
             generator.base_url) is supported",
            config.generator.provider
        );
    }

    if config.memory.max_messages == 0 {
        anyhow::bail!("memory.max_messages must be > 0");
    }

    if let Some(target) = config.memory.target_length {
        if target < 2 || target > config.memory.max_messages {
            anyhow::bail!(
                "memory.target_length must be between 2 and memory.max_messages ({})",
                config.memory.max_messages
            );
        }
    }

    if config.generator.timeout_secs == 0 {
        anyhow::bail!("generator.timeout_secs must be > 0");
    }

    Ok(())
}

//! Configuration for Storyloop
//!
//! Resolution order (later wins):
//!   1. built-in defaults
//!   2. `config.toml` (explicit path, else `~/.storyloop/config.toml` if present)
//!   3. `STORYLOOP_*` environment variables (a `.env` file is loaded first)
//!   4. command-line flags, applied by the binary through the `with_*` builders

use crate::{Result, StoryError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_SESSION_ID: &str = "test-session";
pub const DEFAULT_MODEL: &str = "llama2";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_URL: &str = "http://localhost:1234/v1";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

/// Where the turn log is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// JSONL files under `storage_dir`
    File,
    /// Process memory only
    Memory,
}

impl FromStr for StorageKind {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "memory" => Ok(StorageKind::Memory),
            other => Err(StoryError::Config(format!(
                "unknown storage '{}' (expected 'file' or 'memory')",
                other
            ))),
        }
    }
}

/// Which generation API to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Ollama native `/api/generate`
    Ollama,
    /// OpenAI-compatible `/chat/completions`
    Chat,
}

impl FromStr for ProviderKind {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "chat" | "openai" | "lmstudio" => Ok(ProviderKind::Chat),
            other => Err(StoryError::Config(format!(
                "unknown provider '{}' (expected 'ollama' or 'chat')",
                other
            ))),
        }
    }
}

/// Configuration for a Storyloop process
#[derive(Debug, Clone, PartialEq)]
pub struct StoryConfig {
    /// Session whose turn log this process owns
    pub session_id: String,

    pub storage: StorageKind,

    /// Directory for `StorageKind::File` logs
    pub storage_dir: PathBuf,

    pub provider: ProviderKind,

    pub model: String,

    /// Provider base URL; `None` means the provider default
    pub base_url: Option<String>,

    /// Name of the environment variable holding the API key (chat provider)
    pub api_key_env: String,

    pub temperature: f32,

    /// HTTP request timeout for one generation call
    pub generation_timeout_secs: u64,

    /// Optional bound on a whole turn (generation included)
    pub turn_timeout_secs: Option<u64>,

    /// Custom narrative template; `None` uses the built-in one
    pub template_file: Option<PathBuf>,

    /// Where logs go while the TUI owns the terminal
    pub log_file: PathBuf,
}

/// On-disk shape of `config.toml`; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    session_id: Option<String>,
    storage: Option<StorageKind>,
    storage_dir: Option<PathBuf>,
    provider: Option<ProviderKind>,
    model: Option<String>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    temperature: Option<f32>,
    generation_timeout_secs: Option<u64>,
    turn_timeout_secs: Option<u64>,
    template_file: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

/// `~/.storyloop`, or `./.storyloop` when no home directory is known
pub fn storyloop_home() -> PathBuf {
    if let Ok(home) = std::env::var("STORYLOOP_HOME") {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".storyloop")
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self::new(storyloop_home())
    }
}

impl StoryConfig {
    /// Defaults rooted at `home` (sessions and log file live under it).
    pub fn new(home: PathBuf) -> Self {
        Self {
            session_id: DEFAULT_SESSION_ID.to_string(),
            storage: StorageKind::File,
            storage_dir: home.join("sessions"),
            provider: ProviderKind::Ollama,
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: DEFAULT_TEMPERATURE,
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            turn_timeout_secs: None,
            template_file: None,
            log_file: home.join("storyloop.log"),
        }
    }

    /// Defaults, then the config file, then the environment.
    pub async fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let home = storyloop_home();
        let mut config = Self::new(home.clone());

        let path = match explicit_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = home.join("config.toml");
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = path {
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                StoryError::Config(format!("failed to read {}: {}", path.display(), e))
            })?;
            config.apply_toml(&content)?;
            info!("Loaded config from {}", path.display());
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        debug!("Resolved config: {:?}", config);
        Ok(config)
    }

    /// Merge values from `config.toml` text.
    pub fn apply_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigToml = toml::from_str(content)
            .map_err(|e| StoryError::Config(format!("invalid config.toml: {}", e)))?;

        if let Some(v) = file.session_id {
            self.session_id = v;
        }
        if let Some(v) = file.storage {
            self.storage = v;
        }
        if let Some(v) = file.storage_dir {
            self.storage_dir = v;
        }
        if let Some(v) = file.provider {
            self.provider = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.base_url {
            self.base_url = Some(v);
        }
        if let Some(v) = file.api_key_env {
            self.api_key_env = v;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.generation_timeout_secs {
            self.generation_timeout_secs = v;
        }
        if let Some(v) = file.turn_timeout_secs {
            self.turn_timeout_secs = Some(v);
        }
        if let Some(v) = file.template_file {
            self.template_file = Some(v);
        }
        if let Some(v) = file.log_file {
            self.log_file = v;
        }
        Ok(())
    }

    /// Merge `STORYLOOP_*` variables. `lookup` abstracts the environment for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("STORYLOOP_SESSION_ID") {
            self.session_id = v;
        }
        if let Some(v) = get("STORYLOOP_STORAGE") {
            self.storage = v.parse()?;
        }
        if let Some(v) = get("STORYLOOP_STORAGE_DIR") {
            self.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = get("STORYLOOP_PROVIDER") {
            self.provider = v.parse()?;
        }
        if let Some(v) = get("STORYLOOP_MODEL") {
            self.model = v;
        }
        if let Some(v) = get("STORYLOOP_BASE_URL") {
            self.base_url = Some(v);
        }
        if let Some(v) = get("STORYLOOP_TEMPLATE") {
            self.template_file = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Base URL, falling back to the provider's default
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => match self.provider {
                ProviderKind::Ollama => DEFAULT_OLLAMA_URL.to_string(),
                ProviderKind::Chat => DEFAULT_CHAT_URL.to_string(),
            },
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_storage_dir(mut self, dir: PathBuf) -> Self {
        self.storage_dir = dir;
        self
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_template_file(mut self, path: PathBuf) -> Self {
        self.template_file = Some(path);
        self
    }

    pub fn with_turn_timeout_secs(mut self, secs: u64) -> Self {
        self.turn_timeout_secs = Some(secs);
        self
    }
}

//! Configuration management for the Hybrid Agent.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.hybrid/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with overrides stored in `.hybrid/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the agent knows how to talk to.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "groq"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .hybrid/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("ollama" or "groq")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Append logs to this file in addition to stderr
    pub log_file: Option<PathBuf>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Orchestrator settings
    pub agent: AgentSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Groq {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Groq { model, .. } => model,
            ProviderConfig::Ollama { model, .. } => model,
        }
    }

    /// Endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::Groq { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Request timeout in seconds, if any.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            ProviderConfig::Ollama { timeout, .. } => *timeout,
            ProviderConfig::Groq { .. } => None,
        }
    }
}

/// Settings for the hybrid question-answering workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettings {
    /// Root directory of the markdown corpus
    #[serde(default = "default_docs_path")]
    pub docs_path: PathBuf,

    /// SQLite database answering the query path
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Tables whose schema is offered to query generation
    #[serde(default = "default_table_names")]
    pub table_names: Vec<String>,

    /// Number of chunks retrieved per question
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Hard cap on stage transitions per invocation
    #[serde(default = "default_max_transitions")]
    pub max_transitions: usize,

    /// Sampling temperature for every completion
    #[serde(default)]
    pub temperature: f32,

    /// Sampling seed for providers that honour it
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,

    /// Context window requested from local providers
    #[serde(default = "default_context_window")]
    pub context_window: Option<u32>,
}

fn default_docs_path() -> PathBuf {
    PathBuf::from("docs")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/northwind.sqlite")
}

fn default_table_names() -> Vec<String> {
    vec![
        "demo_orders".to_string(),
        "demo_order_details".to_string(),
        "demo_products".to_string(),
    ]
}

fn default_retrieval_k() -> usize {
    4
}

fn default_max_transitions() -> usize {
    15
}

fn default_seed() -> Option<u64> {
    Some(111)
}

fn default_context_window() -> Option<u32> {
    Some(1024)
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            docs_path: default_docs_path(),
            database_path: default_database_path(),
            table_names: default_table_names(),
            retrieval_k: default_retrieval_k(),
            max_transitions: default_max_transitions(),
            temperature: 0.0,
            seed: default_seed(),
            context_window: default_context_window(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    agent: Option<AgentSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            log_file: None,
            verbose: false,
            no_color: false,
            llm: None,
            agent: AgentSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `HYBRID_WORKSPACE`: Override workspace path
    /// - `HYBRID_CONFIG`: Path to config file
    /// - `HYBRID_PROVIDER`: LLM provider
    /// - `HYBRID_MODEL`: Model identifier
    /// - `HYBRID_API_KEY`: API key
    /// - `HYBRID_DOCS_PATH`: Markdown corpus directory
    /// - `HYBRID_DATABASE_PATH`: SQLite database file
    /// - `HYBRID_RETRIEVAL_K`: Chunks retrieved per question
    /// - `HYBRID_LOG_FILE`: Append logs to this file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use hybrid_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("HYBRID_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("HYBRID_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.hybrid_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        config.apply_env()?;

        Ok(config)
    }

    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(provider) = std::env::var("HYBRID_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("HYBRID_MODEL") {
            self.model = model;
        }

        if let Ok(key) = std::env::var("HYBRID_API_KEY") {
            self.api_key = Some(key);
        }

        if let Ok(docs) = std::env::var("HYBRID_DOCS_PATH") {
            self.agent.docs_path = PathBuf::from(docs);
        }

        if let Ok(db) = std::env::var("HYBRID_DATABASE_PATH") {
            self.agent.database_path = PathBuf::from(db);
        }

        if let Ok(k) = std::env::var("HYBRID_RETRIEVAL_K") {
            self.agent.retrieval_k = k.parse().map_err(|e| {
                AppError::Config(format!("Invalid HYBRID_RETRIEVAL_K '{}': {}", k, e))
            })?;
        }

        if let Ok(file) = std::env::var("HYBRID_LOG_FILE") {
            self.log_file = Some(PathBuf::from(file));
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(file) = logging.file {
                result.log_file = Some(PathBuf::from(file));
            }
        }

        if let Some(agent) = config_file.agent {
            result.agent = agent;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Override where the corpus and database live.
    pub fn with_data_paths(mut self, docs: Option<PathBuf>, database: Option<PathBuf>) -> Self {
        if let Some(docs) = docs {
            self.agent.docs_path = docs;
        }
        if let Some(database) = database {
            self.agent.database_path = database;
        }
        self
    }

    /// Get the path to the .hybrid directory.
    pub fn hybrid_dir(&self) -> PathBuf {
        self.workspace.join(".hybrid")
    }

    /// Resolve a possibly relative path against the workspace.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get the active provider configuration.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve API key from environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::Groq { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration for the active provider and the agent.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "groq" && self.resolve_api_key(provider).is_none() {
            return Err(AppError::Config(
                "Groq provider requires an API key (HYBRID_API_KEY or apiKeyEnv)".to_string(),
            ));
        }

        if self.agent.retrieval_k == 0 {
            return Err(AppError::Config("retrievalK must be at least 1".to_string()));
        }

        if self.agent.max_transitions == 0 {
            return Err(AppError::Config(
                "maxTransitions must be at least 1".to_string(),
            ));
        }

        if self.agent.table_names.is_empty() {
            return Err(AppError::Config(
                "tableNames must list at least one table".to_string(),
            ));
        }

        Ok(())
    }
}

//! TOML configuration.
//!
//! Every section is optional; missing keys take the defaults below. Any
//! credential left empty in the file is filled from the environment
//! variables the assistant has always honoured (`STEAM_API_KEY`,
//! `GITHUB_TOKEN`, `LM_STUDIO_BASE_URL`, ...). Values are read once at
//! startup and handed to adapter constructors; nothing re-reads the
//! environment afterwards.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [notes]
//! dir = "./notes"
//!
//! [steam]
//! api_key = "..."
//! steam_id = "7656119..."
//!
//! [github]
//! user = "octocat"
//! repo = "hello-world"
//!
//! [llm]
//! base_url = "http://localhost:1234"
//! model = "local-model"
//!
//! [aggregator]
//! timeout_secs = 15
//! sources = ["steam", "ytmusic", "github"]
//! ```

use anyhow::{bail, Context, Result};
use hub_core::context::SourceKey;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./config/hub.toml";

pub const DEFAULT_PERSONA_PROMPT: &str = "You are a helpful personal assistant.";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub steam: SteamConfig,
    #[serde(default)]
    pub ytmusic: YtMusicConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotesConfig {
    #[serde(default = "default_notes_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_note_globs")]
    pub include_globs: Vec<String>,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            dir: default_notes_dir(),
            include_globs: default_note_globs(),
        }
    }
}

fn default_notes_dir() -> PathBuf {
    PathBuf::from("./notes")
}

fn default_note_globs() -> Vec<String> {
    vec!["*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct SteamConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub steam_id: Option<String>,
    #[serde(default = "default_steam_url")]
    pub base_url: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            steam_id: None,
            base_url: default_steam_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl SteamConfig {
    pub fn is_configured(&self) -> bool {
        present(&self.api_key) && present(&self.steam_id)
    }
}

fn default_steam_url() -> String {
    "https://api.steampowered.com".to_string()
}

/// Liked-music access. `headers_json` holds the auth headers inline;
/// `headers_file` points at a JSON file with the same object.
#[derive(Debug, Deserialize, Clone)]
pub struct YtMusicConfig {
    #[serde(default)]
    pub headers_json: Option<String>,
    #[serde(default)]
    pub headers_file: Option<PathBuf>,
    #[serde(default = "default_youtube_url")]
    pub base_url: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for YtMusicConfig {
    fn default() -> Self {
        Self {
            headers_json: None,
            headers_file: None,
            base_url: default_youtube_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

fn default_youtube_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: Option<String>,
    /// Owner of the repository summarized in the context.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default = "default_github_url")]
    pub base_url: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            user: None,
            repo: None,
            base_url: default_github_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl GithubConfig {
    /// The `(owner, repo)` pair for the context summary, when both are set.
    pub fn summary_repo(&self) -> Option<(&str, &str)> {
        match (self.user.as_deref(), self.repo.as_deref()) {
            (Some(user), Some(repo)) if !user.is_empty() && !repo.is_empty() => Some((user, repo)),
            _ => None,
        }
    }
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

fn default_api_timeout() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    #[serde(default = "default_llm_key")]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_persona")]
    pub system_prompt: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            api_key: default_llm_key(),
            model: default_llm_model(),
            temperature: default_temperature(),
            system_prompt: default_persona(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_url() -> String {
    "http://localhost:1234".to_string()
}
fn default_llm_key() -> String {
    "lm-studio".to_string()
}
fn default_llm_model() -> String {
    "local-model".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_persona() -> String {
    DEFAULT_PERSONA_PROMPT.to_string()
}
fn default_llm_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregatorConfig {
    /// Per-source fetch budget.
    #[serde(default = "default_aggregator_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_aggregator_timeout(),
            sources: default_sources(),
        }
    }
}

impl AggregatorConfig {
    /// Enabled sources in briefing order, duplicates removed. Unknown names
    /// are rejected by [`Config::validate`].
    pub fn source_keys(&self) -> Vec<SourceKey> {
        let mut keys: Vec<SourceKey> = self
            .sources
            .iter()
            .filter_map(|name| SourceKey::parse(name))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

fn default_aggregator_timeout() -> u64 {
    15
}

fn default_sources() -> Vec<String> {
    SourceKey::ALL.iter().map(|k| k.as_str().to_string()).collect()
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Replace an empty optional field with the looked-up value.
fn fill(field: &mut Option<String>, value: Option<String>) {
    if !present(field) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            *field = Some(v);
        }
    }
}

impl Config {
    /// All defaults, used when no config file exists at the default path.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Fill empty credentials from `lookup` (normally the process
    /// environment). Values set in the file always win.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fill(&mut self.steam.api_key, lookup("STEAM_API_KEY"));
        fill(&mut self.steam.steam_id, lookup("STEAM_ID"));
        fill(&mut self.ytmusic.headers_json, lookup("YTMUSIC_HEADERS_JSON"));
        if self.ytmusic.headers_file.is_none() {
            self.ytmusic.headers_file = lookup("YTMUSIC_HEADERS_FILE").map(PathBuf::from);
        }
        fill(&mut self.github.token, lookup("GITHUB_TOKEN"));
        fill(&mut self.github.user, lookup("GITHUB_USER"));
        fill(&mut self.github.repo, lookup("GITHUB_REPO"));

        if let Some(url) = lookup("LM_STUDIO_BASE_URL") {
            if self.llm.base_url == default_llm_url() {
                self.llm.base_url = url;
            }
        }
        if let Some(key) = lookup("LM_STUDIO_API_KEY") {
            if self.llm.api_key == default_llm_key() {
                self.llm.api_key = key;
            }
        }
        if let Some(model) = lookup("LM_STUDIO_MODEL") {
            if self.llm.model == default_llm_model() {
                self.llm.model = model;
            }
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            bail!("server.bind must not be empty");
        }

        let timeouts = [
            ("steam.timeout_secs", self.steam.timeout_secs),
            ("ytmusic.timeout_secs", self.ytmusic.timeout_secs),
            ("github.timeout_secs", self.github.timeout_secs),
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("aggregator.timeout_secs", self.aggregator.timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                bail!("{} must be > 0", name);
            }
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            bail!("llm.temperature must be in [0.0, 2.0]");
        }

        for name in &self.aggregator.sources {
            if SourceKey::parse(name).is_none() {
                bail!(
                    "Unknown aggregator source: '{}'. Must be steam, ytmusic, or github.",
                    name
                );
            }
        }

        Ok(())
    }
}

/// Parse a config string, fill credentials from `lookup`, and validate.
pub fn parse_config_with(
    content: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.apply_env_with(lookup);
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_with(&content, |name| std::env::var(name).ok())
}

/// Load `path`, falling back to [`Config::minimal`] plus the environment
/// when `path` is the default location and nothing exists there.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        let mut config = Config::minimal();
        config.apply_env();
        config.validate()?;
        return Ok(config);
    }
    load_config(path)
}

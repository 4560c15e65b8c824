//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys split on `__`, e.g. `APP_RETRIEVAL__K=5`).
//! A `.env` file is read first so secrets such as `GOOGLE_API_KEY` can live there.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::personality::Personality;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Load with `dir` as the directory holding the TOML files. Relative paths
    /// in the settings are resolved against it.
    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            other => tracing::warn!(env = other, "unknown RUST_ENV; using config.toml only"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: dir.to_path_buf() };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(settings.resolve_paths(&self.base_dir))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub embed: EmbedSettings,
    pub llm: LlmSettings,
    pub server: ServerSettings,
}

/// Where the FAQ table lives and which column identifies a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub path: PathBuf,
    pub prompt_column: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self { path: PathBuf::from("data/relationship_faqs.csv"), prompt_column: "prompt".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub path: PathBuf,
    pub table: String,
    /// Row count from which an IVF-PQ index is trained; below it search is exact.
    pub ann_min_rows: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { path: PathBuf::from("knowledge_index"), table: "documents".to_string(), ann_min_rows: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { k: 3 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedBackend {
    Bert,
    Fake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
    pub backend: EmbedBackend,
    pub model_dir: PathBuf,
    pub max_len: usize,
    pub fake_dim: usize,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self {
            backend: EmbedBackend::Bert,
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2"),
            max_len: 256,
            fake_dim: 384,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.8,
            timeout_secs: 60,
            api_key_env: "GOOGLE_API_KEY".to_string(),
        }
    }
}

impl LlmSettings {
    pub fn api_key(&self) -> Result<String> {
        match env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::InvalidConfig(format!("{} is not set", self.api_key_env))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
    pub default_personality: Personality,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { addr: "127.0.0.1:8501".to_string(), default_personality: Personality::Funny }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::InvalidConfig(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.source.prompt_column.trim().is_empty() {
            return Err(Error::InvalidConfig("source.prompt_column is empty".into()));
        }
        if self.index.table.trim().is_empty() {
            return Err(Error::InvalidConfig("index.table is empty".into()));
        }
        if self.embed.fake_dim == 0 || self.embed.max_len == 0 {
            return Err(Error::InvalidConfig("embed.fake_dim and embed.max_len must be positive".into()));
        }
        Ok(())
    }

    fn resolve_paths(mut self, base: &Path) -> Self {
        self.source.path = resolve_with_base(base, self.source.path.to_string_lossy());
        self.index.path = resolve_with_base(base, self.index.path.to_string_lossy());
        self.embed.model_dir = resolve_with_base(base, self.embed.model_dir.to_string_lossy());
        self
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

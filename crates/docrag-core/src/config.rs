//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_RETRIEVAL__ALPHA`).
//! Store paths expand `~` and `${VAR}` via `expand_path`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wrap an already-assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.embedding.validate()?;
        self.retrieval.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: String,
    /// Persist after every `add`; when false the store is flushed explicitly.
    pub autosave: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: "./documents.json".to_string(), autosave: true }
    }
}

impl StoreSettings {
    pub fn resolved_path(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Deterministic feature-hashing embedder; no model files needed.
    Hash,
    /// all-MiniLM-L6-v2 sentence embeddings loaded from `model_dir`.
    MiniLm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub dimension: usize,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub timeout_ms: Option<u64>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { backend: EmbeddingBackend::Hash, dimension: 384, model_dir: None, max_len: 256, timeout_ms: None }
    }
}

impl EmbeddingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be > 0".into()));
        }
        if self.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be > 0".into()));
        }
        if self.timeout_ms == Some(0) {
            return Err(Error::InvalidConfig("embedding.timeout_ms must be > 0 when set".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_ms.map(std::time::Duration::from_millis)
    }
}

/// Where keyword scoring looks for matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordScope {
    /// Every chunk in the store.
    Store,
    /// Only the chunks returned by the semantic search.
    Candidates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSettings {
    pub enabled: bool,
    pub scope: KeywordScope,
}

impl Default for KeywordSettings {
    fn default() -> Self {
        Self { enabled: true, scope: KeywordScope::Store }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
    pub threshold: Option<f32>,
    /// Weight of the semantic signal in fusion, in `[0, 1]`.
    pub alpha: f32,
    pub fingerprint_len: usize,
    pub keyword: KeywordSettings,
    pub expand_abbreviations: bool,
    /// Extra abbreviation expansions merged over the built-in table.
    pub abbreviations: BTreeMap<String, String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k: 6,
            threshold: Some(0.3),
            alpha: 0.7,
            fingerprint_len: 50,
            keyword: KeywordSettings::default(),
            expand_abbreviations: true,
            abbreviations: BTreeMap::new(),
        }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<()> {
        validate_alpha(self.alpha)?;
        if self.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be > 0".into()));
        }
        if let Some(t) = self.threshold {
            if !t.is_finite() {
                return Err(Error::InvalidConfig(format!("retrieval.threshold must be finite, got {t}")));
            }
        }
        if self.fingerprint_len == 0 {
            return Err(Error::InvalidConfig("retrieval.fingerprint_len must be > 0".into()));
        }
        Ok(())
    }
}

/// `alpha` is the semantic weight of hybrid fusion and must lie in `[0, 1]`.
pub fn validate_alpha(alpha: f32) -> Result<()> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("alpha must be within [0, 1], got {alpha}")))
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

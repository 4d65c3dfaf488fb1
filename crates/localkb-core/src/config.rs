//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `localkb.toml`,
//! `localkb.<env>.toml` and `LOCALKB_*` env vars (nested keys split on `__`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{KbError, Result};

pub const CONFIG_FILE: &str = "localkb.toml";
pub const ENV_PREFIX: &str = "LOCALKB_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Hard character limit per chunk; longer section bodies are cut into
    /// consecutive windows of exactly this many characters.
    pub max_chars: usize,
    /// Recognised file extensions, matched case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: 1200, extensions: vec![".md".to_string(), ".txt".to_string()] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    /// Local transformer model loaded through candle.
    Bert,
    /// Deterministic feature hashing; no model files needed.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub encoder: EncoderKind,
    pub model: String,
    /// Directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors`. Defaults to `models/<model basename>`.
    pub model_dir: Option<String>,
    pub batch_size: usize,
    pub max_len: usize,
    pub hash_dim: usize,
    pub query_prefix: String,
    pub passage_prefix: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderKind::Bert,
            model: "intfloat/multilingual-e5-small".to_string(),
            model_dir: None,
            batch_size: 32,
            max_len: 512,
            hash_dim: 384,
            query_prefix: "query: ".to_string(),
            passage_prefix: "passage: ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub topk: usize,
    pub vec_candidates: usize,
    pub bm25_candidates: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { topk: 6, vec_candidates: 30, bm25_candidates: 30 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    pub chunking: ChunkingConfig,
    pub embed: EmbedConfig,
    pub retrieval: RetrievalConfig,
}

impl KbConfig {
    /// Load configuration for the project rooted at `project_root`.
    pub fn load(project_root: &Path) -> Result<Self> {
        let env_name = env::var("LOCALKB_ENV").unwrap_or_else(|_| "dev".to_string());
        let figment = Self::figment(project_root, &env_name);
        let config: Self = figment
            .extract()
            .map_err(|e| KbError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn figment(project_root: &Path, env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(project_root.join(CONFIG_FILE)));
        // The env name becomes part of a file name; anything path-like is ignored.
        let env_name = env_name.trim();
        if !env_name.is_empty() && env_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            figment = figment.merge(Toml::file(project_root.join(format!("localkb.{env_name}.toml"))));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chars == 0 {
            return Err(KbError::InvalidConfig("chunking.max_chars must be positive".into()));
        }
        if self.chunking.extensions.is_empty() {
            return Err(KbError::InvalidConfig("chunking.extensions must not be empty".into()));
        }
        if self.embed.batch_size == 0 {
            return Err(KbError::InvalidConfig("embed.batch_size must be positive".into()));
        }
        if self.embed.encoder == EncoderKind::Hash && self.embed.hash_dim == 0 {
            return Err(KbError::InvalidConfig("embed.hash_dim must be positive".into()));
        }
        Ok(())
    }

    /// Model directory after `~`/`$VAR` expansion, relative to `project_root`.
    pub fn model_dir(&self, project_root: &Path) -> PathBuf {
        match &self.embed.model_dir {
            Some(dir) => resolve_with_base(project_root, dir),
            None => {
                let name = self.embed.model.rsplit('/').next().unwrap_or(&self.embed.model);
                project_root.join("models").join(name)
            }
        }
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

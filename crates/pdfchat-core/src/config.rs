//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_LLM__BASE_URL`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::normalize::Language;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Ok(Self { figment: Self::layered(&env_name) })
    }

    fn layered(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub text: TextSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8501, max_upload_mb: 64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    /// Model used when answering from retrieved context.
    pub rag_model: String,
    /// Model used for plain chat while no documents are active.
    pub chat_model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            rag_model: "mistral".to_string(),
            chat_model: "neural-chat".to_string(),
            temperature: 0.7,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    pub language: String,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self { language: "portuguese".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub budget: usize,
    pub overlap: usize,
    /// Path to a `tokenizer.json`. Empty means the embedding model's tokenizer,
    /// or Unicode word tokens when that is missing too.
    pub tokenizer: String,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { budget: 500, overlap: 50, tokenizer: String::new() }
    }
}

/// Retrieval knobs.
///
/// `k` is how many neighbours are fetched per question. `max_distance` drops
/// any neighbour at or beyond that distance; with unit vectors and the L2
/// metric 1.0 keeps matches whose cosine similarity is above 0.5.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
    pub max_distance: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 3, max_distance: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub dir: String,
    pub table: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { dir: "faiss_index".to_string(), table: "chunks".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: String,
    pub max_len: usize,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_dir: "models/bert-base-portuguese-cased".to_string(),
            max_len: 512,
            use_fake: false,
            fake_dim: 768,
        }
    }
}

impl EmbeddingSettings {
    /// `APP_USE_FAKE_EMBEDDINGS=1` wins over the file so tests and dev runs
    /// never need model weights.
    pub fn fake_requested(&self) -> bool {
        self.use_fake
            || env::var("APP_USE_FAKE_EMBEDDINGS")
                .ok()
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Config::load()?.settings()
    }

    pub fn language(&self) -> Result<Language> {
        self.text.language.parse()
    }

    pub fn tokenizer_path(&self) -> Option<PathBuf> {
        if self.chunking.tokenizer.trim().is_empty() {
            let candidate = expand_path(&self.embedding.model_dir).join("tokenizer.json");
            return candidate.exists().then_some(candidate);
        }
        Some(expand_path(&self.chunking.tokenizer))
    }

    /// Startup preconditions. Everything a request would otherwise trip over
    /// later is checked here once.
    pub fn validate(&self) -> Result<()> {
        self.language()?;
        if self.chunking.budget == 0 || self.chunking.overlap >= self.chunking.budget {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than the budget ({})",
                self.chunking.overlap, self.chunking.budget
            )));
        }
        if self.retrieval.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be at least 1".to_string()));
        }
        if self.retrieval.max_distance <= 0.0 {
            return Err(Error::InvalidConfig("retrieval.max_distance must be positive".to_string()));
        }
        if !self.chunking.tokenizer.trim().is_empty() {
            let path = expand_path(&self.chunking.tokenizer);
            if !path.exists() {
                return Err(Error::InvalidConfig(format!("tokenizer file {} not found", path.display())));
            }
        }
        if !self.embedding.fake_requested() {
            let dir = expand_path(&self.embedding.model_dir);
            if !dir.is_dir() {
                return Err(Error::InvalidConfig(format!(
                    "embedding model directory {} not found (set APP_USE_FAKE_EMBEDDINGS=1 to run without it)",
                    dir.display()
                )));
            }
        }
        Ok(())
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

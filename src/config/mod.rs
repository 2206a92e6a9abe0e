//! Configuration management for quizzer
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Environment variable name for Qdrant API key
    #[serde(default = "default_qdrant_api_key_env")]
    pub qdrant_api_key_env: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding endpoint configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Completion endpoint configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Chunking and ingestion configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Quiz generation and storage limits
    #[serde(default)]
    pub quiz: QuizConfig,

    /// Quiz-taking session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service
    #[serde(default = "default_embedding_url")]
    pub url: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Completion (language model) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the completion service
    #[serde(default = "default_completion_url")]
    pub url: String,

    /// Model used for quiz generation and question answering
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Model used to judge short answers
    #[serde(default = "default_judge_model")]
    pub judge_model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,

    /// Temperature for quiz generation
    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f32,

    /// Temperature for question answering
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f32,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_chars")]
    pub max_chars: usize,

    /// Overlap characters between chunks (0 = no overlap)
    #[serde(default = "default_chunk_overlap")]
    pub overlap_chars: usize,

    /// Points per upsert request
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,

    /// Retries per failed upsert batch before giving up
    #[serde(default = "default_upsert_retries")]
    pub upsert_retries: usize,

    /// Largest accepted document, in characters
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

/// Quiz configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Questions generated when none are requested
    #[serde(default = "default_quiz_questions")]
    pub default_questions: usize,

    /// Maximum questions per quiz
    #[serde(default = "default_quiz_max_questions")]
    pub max_questions: usize,

    /// Document characters included in the generation prompt
    #[serde(default = "default_prompt_char_limit")]
    pub prompt_char_limit: usize,

    /// Generated quizzes larger than this (serialized) are rejected
    #[serde(default = "default_max_serialized_chars")]
    pub max_serialized_chars: usize,

    /// Hard ceiling on stored quizzes
    #[serde(default = "default_max_quizzes")]
    pub max_quizzes: usize,

    /// Length of generated quiz ids
    #[serde(default = "default_quiz_id_length")]
    pub id_length: usize,

    /// Attempts at drawing an id not already in use
    #[serde(default = "default_quiz_id_attempts")]
    pub id_attempts: usize,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fixed timezone offset used for session and upload timestamps
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of passages to retrieve
    #[serde(default = "default_query_k")]
    pub default_k: usize,

    /// Maximum passages allowed
    #[serde(default = "default_query_max_k")]
    pub max_k: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for quizzer data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            qdrant_api_key_env: default_qdrant_api_key_env(),
            collection_name: default_collection_name(),
            embedding: EmbeddingConfig::default(),
            completion: CompletionConfig::default(),
            chunk: ChunkConfig::default(),
            quiz: QuizConfig::default(),
            session: SessionConfig::default(),
            query: QueryConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: default_completion_url(),
            model: default_completion_model(),
            judge_model: default_judge_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_completion_timeout(),
            generation_temperature: default_generation_temperature(),
            answer_temperature: default_answer_temperature(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
            overlap_chars: default_chunk_overlap(),
            upsert_batch_size: default_upsert_batch_size(),
            upsert_retries: default_upsert_retries(),
            max_document_chars: default_max_document_chars(),
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            default_questions: default_quiz_questions(),
            max_questions: default_quiz_max_questions(),
            prompt_char_limit: default_prompt_char_limit(),
            max_serialized_chars: default_max_serialized_chars(),
            max_quizzes: default_max_quizzes(),
            id_length: default_quiz_id_length(),
            id_attempts: default_quiz_id_attempts(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: default_query_k(),
            max_k: default_query_max_k(),
        }
    }
}

impl SessionConfig {
    /// The fixed offset all session timestamps are expressed in
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!(
                "session.utc_offset_hours {} is not a valid offset",
                self.utc_offset_hours
            ))
        })
    }
}

impl Config {
    /// Get the default base directory for quizzer (~/.quizzer)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quizzer")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("quizzer.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("quizzer.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Get the Qdrant API key from environment
    pub fn qdrant_api_key(&self) -> Option<String> {
        env_key(&self.qdrant_api_key_env)
    }

    /// Get the embedding API key from environment
    pub fn embedding_api_key(&self) -> Option<String> {
        env_key(&self.embedding.api_key_env)
    }

    /// Get the completion API key from environment
    pub fn completion_api_key(&self) -> Option<String> {
        env_key(&self.completion.api_key_env)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.max_chars == 0 {
            return Err(Error::Config("chunk.max_chars must be positive".to_string()));
        }

        if self.chunk.overlap_chars >= self.chunk.max_chars {
            return Err(Error::Config(
                "chunk.overlap_chars must be < chunk.max_chars".to_string(),
            ));
        }

        if self.chunk.upsert_batch_size == 0 || self.embedding.batch_size == 0 {
            return Err(Error::Config("batch sizes must be positive".to_string()));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }

        if self.quiz.max_questions == 0
            || self.quiz.default_questions == 0
            || self.quiz.default_questions > self.quiz.max_questions
        {
            return Err(Error::Config(
                "quiz.default_questions must be between 1 and quiz.max_questions".to_string(),
            ));
        }

        // A u128 renders to at most 22 base-62 digits
        if self.quiz.id_length == 0 || self.quiz.id_length > 22 {
            return Err(Error::Config(
                "quiz.id_length must be between 1 and 22".to_string(),
            ));
        }

        if self.quiz.id_attempts == 0 {
            return Err(Error::Config("quiz.id_attempts must be positive".to_string()));
        }

        if !(-12..=14).contains(&self.session.utc_offset_hours) {
            return Err(Error::Config(
                "session.utc_offset_hours must be between -12 and 14".to_string(),
            ));
        }

        if self.query.default_k == 0 || self.query.default_k > self.query.max_k {
            return Err(Error::Config(
                "query.default_k must be between 1 and query.max_k".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_key(var: &str) -> Option<String> {
    if var.is_empty() {
        return None;
    }
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

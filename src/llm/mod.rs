//! Language-model completion
//!
//! Quiz generation, question answering and short-answer judging all go
//! through the [`Completer`] trait so they can be scripted in tests.

mod http_backend;

pub use http_backend::*;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;

/// Trait for completion providers
#[async_trait]
pub trait Completer: Send + Sync {
    /// Complete a single-turn prompt at the given sampling temperature
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Completer for quiz generation and question answering
pub fn create_completer(config: &Config) -> Result<Box<dyn Completer>> {
    Ok(Box::new(HttpCompleter::new(config, &config.completion.model)?))
}

/// Completer used to judge short answers
pub fn create_judge(config: &Config) -> Result<Box<dyn Completer>> {
    Ok(Box::new(HttpCompleter::new(
        config,
        &config.completion.judge_model,
    )?))
}

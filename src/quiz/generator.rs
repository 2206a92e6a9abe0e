use super::Question;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::Completer;
use crate::prompts::quiz_prompt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bounds applied to generation
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub max_questions: usize,
    pub prompt_char_limit: usize,
    pub max_serialized_chars: usize,
    pub temperature: f32,
}

impl GeneratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_questions: config.quiz.max_questions,
            prompt_char_limit: config.quiz.prompt_char_limit,
            max_serialized_chars: config.quiz.max_serialized_chars,
            temperature: config.completion.generation_temperature,
        }
    }
}

/// Turns document text into validated quiz questions
pub struct QuizGenerator {
    completer: Arc<dyn Completer>,
    settings: GeneratorSettings,
}

impl QuizGenerator {
    pub fn new(completer: Arc<dyn Completer>, settings: GeneratorSettings) -> Self {
        Self {
            completer,
            settings,
        }
    }

    /// Generate up to `num_questions` questions from `document_text`.
    ///
    /// Unparseable or empty output is a [`Error::GenerationParse`], and an
    /// oversized result is a [`Error::QuotaExceeded`]; neither yields a
    /// partial quiz.
    pub async fn generate(&self, document_text: &str, num_questions: usize) -> Result<Vec<Question>> {
        if num_questions == 0 || num_questions > self.settings.max_questions {
            return Err(Error::InvalidArgument(format!(
                "number of questions must be between 1 and {}",
                self.settings.max_questions
            )));
        }
        if document_text.trim().is_empty() {
            return Err(Error::EmptyDocument);
        }

        let prompt = quiz_prompt(document_text, num_questions, self.settings.prompt_char_limit);
        let raw = self
            .completer
            .complete(&prompt, self.settings.temperature)
            .await?;
        debug!("Model returned {} characters", raw.len());

        let mut questions = parse_questions(&raw)?;
        if questions.len() > num_questions {
            questions.truncate(num_questions);
        } else if questions.len() < num_questions {
            warn!(
                "Requested {} questions, model produced {} usable ones",
                num_questions,
                questions.len()
            );
        }

        let serialized = serde_json::to_string(&questions)?;
        let size = serialized.chars().count();
        if size > self.settings.max_serialized_chars {
            return Err(Error::QuotaExceeded(format!(
                "generated quiz is {} characters (limit {})",
                size, self.settings.max_serialized_chars
            )));
        }

        info!("Generated {} questions", questions.len());
        Ok(questions)
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse model output into validated questions.
///
/// Accepts a bare array or an object with a `questions` array, optionally
/// wrapped in a markdown code fence. Malformed entries are skipped.
pub fn parse_questions(raw: &str) -> Result<Vec<Question>> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::GenerationParse(format!("model output is not JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::GenerationParse(
                    "expected a JSON array of questions".to_string(),
                ))
            }
        },
        _ => {
            return Err(Error::GenerationParse(
                "expected a JSON array of questions".to_string(),
            ))
        }
    };

    let mut questions = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let parsed = serde_json::from_value::<Question>(item)
            .map_err(|e| e.to_string())
            .and_then(Question::normalize);
        match parsed {
            Ok(question) => questions.push(question),
            Err(reason) => warn!("Skipping generated question {}: {}", i + 1, reason),
        }
    }

    if questions.is_empty() {
        return Err(Error::GenerationParse(
            "model output contained no usable questions".to_string(),
        ));
    }

    Ok(questions)
}

//! Answer grading
//!
//! Closed questions (multiple choice, true/false) are graded by comparing
//! normalized strings. Short answers are judged by a language model with a
//! strict YES/NO prompt; a failed judge call is an error, never a pass.

use crate::error::{Error, Result};
use crate::llm::Completer;
use crate::prompts::judge_prompt;
use crate::quiz::QuestionKind;
use std::sync::Arc;
use tracing::debug;

/// Lower-case alphanumerics only
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Exact match after normalization
pub fn validate_closed(submitted: &str, correct: &str) -> bool {
    normalize(submitted) == normalize(correct)
}

fn is_yes(reply: &str) -> bool {
    reply
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .eq_ignore_ascii_case("YES")
}

pub struct AnswerValidator {
    judge: Arc<dyn Completer>,
}

impl AnswerValidator {
    pub fn new(judge: Arc<dyn Completer>) -> Self {
        Self { judge }
    }

    /// Semantic equivalence as decided by the judge model
    pub async fn validate_open(&self, submitted: &str, correct: &str) -> Result<bool> {
        let reply = self
            .judge
            .complete(&judge_prompt(submitted, correct), 0.0)
            .await?;
        debug!("Judge replied {:?}", reply.trim());
        Ok(is_yes(&reply))
    }

    /// Grade `submitted` for a question of `kind`
    pub async fn validate(&self, kind: QuestionKind, submitted: &str, correct: &str) -> Result<bool> {
        if submitted.trim().is_empty() {
            return Err(Error::EmptyAnswer);
        }

        if kind.is_closed() {
            Ok(validate_closed(submitted, correct))
        } else {
            self.validate_open(submitted, correct).await
        }
    }
}

//! Scripted collaborators shared by unit tests

use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::llm::Completer;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const TEST_DIMENSION: usize = 8;

/// Deterministic bag-of-words embedder: each word bumps one of eight buckets
pub struct KeywordEmbedder;

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; TEST_DIMENSION];
    for word in text.split_whitespace() {
        let word = word.to_lowercase();
        let bucket = word.bytes().map(usize::from).sum::<usize>() % TEST_DIMENSION;
        vector[bucket] += 1.0;
    }
    vector
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

/// Completer that replays canned replies and records the prompts it saw
#[derive(Default)]
pub struct ScriptedCompleter {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<(String, f32)>>,
}

impl ScriptedCompleter {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(Error::Completion(
                "service unavailable".to_string(),
            ))])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<(String, f32)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Completion("no scripted reply left".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

//! Question answering over one document

use crate::config::Config;
use crate::documents::ChunkStore;
use crate::error::{Error, Result};
use crate::llm::Completer;
use crate::progress::add_spinner;
use crate::prompts::answer_prompt;
use crate::retriever::{Passage, Retriever};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub question: String,
    pub filename: String,
    /// `None` when no chunks could be retrieved for the document
    pub answer: Option<String>,
    pub passages: Vec<Passage>,
}

/// Answer `question` from the passages of `target` (a document id or filename)
pub async fn cmd_ask(
    config: &Config,
    chunks: &ChunkStore,
    completer: &dyn Completer,
    target: &str,
    question: &str,
    k: Option<usize>,
) -> Result<AskResult> {
    if question.trim().is_empty() {
        return Err(Error::InvalidArgument("question is empty".to_string()));
    }
    let k = k.unwrap_or(config.query.default_k);
    if k == 0 || k > config.query.max_k {
        return Err(Error::InvalidArgument(format!(
            "k must be between 1 and {}",
            config.query.max_k
        )));
    }

    let filename = match chunks.get_document(target).await? {
        Some(doc) => doc.filename,
        None => target.to_string(),
    };

    let passages = Retriever::new(chunks).query(question, &filename, k).await?;
    if passages.is_empty() {
        info!("No retrievable chunks for {}", filename);
        return Ok(AskResult {
            question: question.to_string(),
            filename,
            answer: None,
            passages,
        });
    }

    let contexts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
    let spinner = add_spinner("Thinking");
    let answer = completer
        .complete(
            &answer_prompt(question, &contexts),
            config.completion.answer_temperature,
        )
        .await;
    spinner.finish_and_clear();

    Ok(AskResult {
        question: question.to_string(),
        filename,
        answer: Some(answer?.trim().to_string()),
        passages,
    })
}

pub fn print_ask_result(result: &AskResult) {
    println!("\n❓ {}\n", result.question);

    let Some(answer) = &result.answer else {
        println!(
            "No retrievable chunks for '{}'. Check the name with 'quizzer documents'.",
            result.filename
        );
        return;
    };

    println!("{}\n", answer);
    println!("Sources ({}):", result.filename);
    for passage in &result.passages {
        match passage.metadata.score {
            Some(score) => println!(
                "  [chunk {} | score {:.3}] {}",
                passage.metadata.chunk_index,
                score,
                super::preview(&passage.text, 120)
            ),
            None => println!(
                "  [chunk {}] {}",
                passage.metadata.chunk_index,
                super::preview(&passage.text, 120)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{ChunkStoreSettings, IngestOptions};
    use crate::store::MemoryIndex;
    use crate::testing::{KeywordEmbedder, ScriptedCompleter};
    use std::sync::Arc;

    async fn store_with_document() -> (ChunkStore, String) {
        let chunks = ChunkStore::new(
            Arc::new(MemoryIndex::new()),
            Arc::new(KeywordEmbedder),
            ChunkStoreSettings::from_config(&Config::default()).unwrap(),
        );
        let id = chunks
            .ingest(
                "The Nile is the longest river in Africa.",
                "rivers.txt",
                IngestOptions::default(),
            )
            .await
            .unwrap();
        (chunks, id.to_string())
    }

    #[tokio::test]
    async fn test_ask_by_document_id() {
        let (chunks, id) = store_with_document().await;
        let completer = ScriptedCompleter::new(["  The Nile.  "]);

        let result = cmd_ask(
            &Config::default(),
            &chunks,
            &completer,
            &id,
            "Which river is longest?",
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.filename, "rivers.txt");
        assert_eq!(result.answer.as_deref(), Some("The Nile."));
        assert_eq!(result.passages.len(), 1);

        let prompts = completer.prompts();
        assert!(prompts[0].0.contains("longest river in Africa"));
        assert_eq!(prompts[0].1, 0.2);
    }

    #[tokio::test]
    async fn test_unknown_document_skips_model() {
        let (chunks, _) = store_with_document().await;
        let completer = ScriptedCompleter::new(Vec::<String>::new());

        let result = cmd_ask(
            &Config::default(),
            &chunks,
            &completer,
            "missing.txt",
            "Anything?",
            Some(3),
        )
        .await
        .unwrap();

        assert!(result.answer.is_none());
        assert!(completer.prompts().is_empty());
        assert!(matches!(
            cmd_ask(&Config::default(), &chunks, &completer, "rivers.txt", "q", Some(0)).await,
            Err(Error::InvalidArgument(_))
        ));
    }
}

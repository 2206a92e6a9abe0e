//! Persisted quiz results
//!
//! A result id is a v5 UUID over `(document_id, quiz_id, username,
//! started_at)`, so saving the same finished attempt twice is detected and
//! rejected instead of producing a second row.

use crate::error::{Error, Result};
use crate::sheet::{Record, Row, SheetStore, RESULTS_SHEET, RESULT_COLUMNS};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One graded answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_text: String,
    pub submitted_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// The immutable record of one completed attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub result_id: String,
    pub quiz_id: String,
    pub document_id: String,
    pub filename: String,
    pub username: String,
    pub score: usize,
    pub answers: BTreeMap<usize, AnswerRecord>,
    pub started_at: String,
    pub completed_at: String,
}

impl QuizResult {
    pub fn total(&self) -> usize {
        self.answers.len()
    }
}

/// Deterministic id for an attempt
pub fn result_id(document_id: &str, quiz_id: &str, username: &str, started_at: &str) -> String {
    let name = format!("{}-{}-{}-{}", document_id, quiz_id, username, started_at);
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes()).to_string()
}

/// Sort by completion time, newest first
pub fn most_recent_first(results: &mut [QuizResult]) {
    results.sort_by(|a, b| {
        match (
            DateTime::parse_from_rfc3339(&a.completed_at),
            DateTime::parse_from_rfc3339(&b.completed_at),
        ) {
            (Ok(a_time), Ok(b_time)) => b_time.cmp(&a_time),
            _ => b.completed_at.cmp(&a.completed_at),
        }
    });
}

/// Results persisted in the `results` worksheet
#[derive(Clone)]
pub struct ResultStore {
    sheets: Arc<dyn SheetStore>,
}

impl ResultStore {
    pub async fn open(sheets: Arc<dyn SheetStore>) -> Result<Self> {
        sheets.ensure_sheet(RESULTS_SHEET, &RESULT_COLUMNS).await?;
        Ok(Self { sheets })
    }

    /// Append `result` unless its id is already recorded
    pub async fn save(&self, result: &QuizResult) -> Result<()> {
        let ids = self.sheets.column_values(RESULTS_SHEET, 0).await?;
        if ids.iter().any(|id| *id == result.result_id) {
            return Err(Error::DuplicateResult(result.result_id.clone()));
        }

        self.sheets
            .append_row(RESULTS_SHEET, result_to_row(result)?)
            .await?;
        info!(
            "Recorded result {} for {} on quiz {} ({}/{})",
            result.result_id,
            result.username,
            result.quiz_id,
            result.score,
            result.total()
        );
        Ok(())
    }

    /// Every result in insertion order
    pub async fn list_all(&self) -> Result<Vec<QuizResult>> {
        self.list_where(|_| true).await
    }

    pub async fn list_by_document(&self, document_id: &str) -> Result<Vec<QuizResult>> {
        self.list_where(|r| r.document_id == document_id).await
    }

    pub async fn list_by_quiz(&self, quiz_id: &str) -> Result<Vec<QuizResult>> {
        self.list_where(|r| r.quiz_id == quiz_id).await
    }

    pub async fn list_by_user(&self, username: &str) -> Result<Vec<QuizResult>> {
        self.list_where(|r| r.username == username).await
    }

    async fn list_where<F>(&self, keep: F) -> Result<Vec<QuizResult>>
    where
        F: Fn(&QuizResult) -> bool + Send,
    {
        let records = self.sheets.get_all_records(RESULTS_SHEET).await?;
        let mut results = Vec::new();
        for record in &records {
            match record_to_result(record) {
                Ok(result) if keep(&result) => results.push(result),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable result row: {}", e),
            }
        }
        Ok(results)
    }
}

fn result_to_row(result: &QuizResult) -> Result<Row> {
    Ok(vec![
        result.result_id.clone(),
        result.quiz_id.clone(),
        result.document_id.clone(),
        result.filename.clone(),
        result.username.clone(),
        result.score.to_string(),
        serde_json::to_string(&result.answers)?,
        result.started_at.clone(),
        result.completed_at.clone(),
    ])
}

fn record_to_result(record: &Record) -> Result<QuizResult> {
    let cell = |name: &str| record.get(name).cloned().unwrap_or_default();
    let score = cell("score")
        .parse()
        .map_err(|_| Error::Other(format!("invalid score '{}'", cell("score"))))?;

    Ok(QuizResult {
        result_id: cell("result_id"),
        quiz_id: cell("quiz_id"),
        document_id: cell("document_id"),
        filename: cell("filename"),
        username: cell("username"),
        score,
        answers: serde_json::from_str(&cell("answers"))?,
        started_at: cell("started_at"),
        completed_at: cell("completed_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::MemorySheetStore;

    fn result(username: &str, quiz_id: &str, completed_at: &str) -> QuizResult {
        let started_at = "2024-05-01T10:00:00+08:00";
        let mut answers = BTreeMap::new();
        answers.insert(
            0,
            AnswerRecord {
                question_text: "Capital of France?".to_string(),
                submitted_answer: "Paris".to_string(),
                correct_answer: "Paris".to_string(),
                is_correct: true,
            },
        );
        QuizResult {
            result_id: result_id("doc", quiz_id, username, started_at),
            quiz_id: quiz_id.to_string(),
            document_id: "doc".to_string(),
            filename: "notes.txt".to_string(),
            username: username.to_string(),
            score: 1,
            answers,
            started_at: started_at.to_string(),
            completed_at: completed_at.to_string(),
        }
    }

    async fn store() -> ResultStore {
        ResultStore::open(Arc::new(MemorySheetStore::new()))
            .await
            .unwrap()
    }

    #[test]
    fn test_result_id_is_deterministic() {
        let a = result_id("d", "q", "u", "t");
        assert_eq!(a, result_id("d", "q", "u", "t"));
        assert_ne!(a, result_id("d", "q", "u", "t2"));
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let store = store().await;
        let r = result("alice", "q1", "2024-05-01T10:05:00+08:00");

        store.save(&r).await.unwrap();
        let err = store.save(&r).await.unwrap_err();

        assert!(matches!(err, Error::DuplicateResult(_)));
        let all = store.list_all().await.unwrap();
        assert_eq!(all, vec![r]);
    }

    #[tokio::test]
    async fn test_filters_keep_insertion_order() {
        let store = store().await;
        store
            .save(&result("alice", "q1", "2024-05-01T10:05:00+08:00"))
            .await
            .unwrap();
        store
            .save(&result("bob", "q1", "2024-05-01T09:00:00+08:00"))
            .await
            .unwrap();
        store
            .save(&result("alice", "q2", "2024-05-02T10:05:00+08:00"))
            .await
            .unwrap();

        let alice = store.list_by_user("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].quiz_id, "q1");

        let q1: Vec<String> = store
            .list_by_quiz("q1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.username)
            .collect();
        assert_eq!(q1, vec!["alice", "bob"]);
        assert_eq!(store.list_by_document("doc").await.unwrap().len(), 3);
        assert!(store.list_by_document("other").await.unwrap().is_empty());
    }

    #[test]
    fn test_most_recent_first() {
        let mut results = vec![
            result("a", "q1", "2024-05-01T10:05:00+08:00"),
            result("b", "q1", "2024-05-02T01:00:00+00:00"),
            result("c", "q1", "2024-05-01T12:00:00+08:00"),
        ];
        most_recent_first(&mut results);

        let order: Vec<&str> = results.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }
}

use super::{new_quiz_id, Question, Quiz};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sheet::{Record, Row, SheetStore, QUIZZES_SHEET, QUIZ_COLUMNS};
use chrono::{FixedOffset, SecondsFormat, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RepositorySettings {
    pub max_quizzes: usize,
    pub id_length: usize,
    pub id_attempts: usize,
    pub offset: FixedOffset,
}

impl RepositorySettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            max_quizzes: config.quiz.max_quizzes,
            id_length: config.quiz.id_length,
            id_attempts: config.quiz.id_attempts,
            offset: config.session.offset()?,
        })
    }
}

/// Quizzes persisted in the `quizzes` worksheet
pub struct QuizRepository {
    sheets: Arc<dyn SheetStore>,
    settings: RepositorySettings,
}

impl QuizRepository {
    /// Open the repository, creating the worksheet if needed
    pub async fn open(sheets: Arc<dyn SheetStore>, settings: RepositorySettings) -> Result<Self> {
        sheets.ensure_sheet(QUIZZES_SHEET, &QUIZ_COLUMNS).await?;
        Ok(Self { sheets, settings })
    }

    pub async fn count(&self) -> Result<usize> {
        self.sheets.row_count(QUIZZES_SHEET).await
    }

    /// Append `quiz` unless the store is full or its id is taken
    pub async fn save(&self, quiz: &Quiz) -> Result<()> {
        let ids = self.sheets.column_values(QUIZZES_SHEET, 0).await?;
        if ids.len() >= self.settings.max_quizzes {
            return Err(Error::QuotaExceeded(format!(
                "quiz store already holds {} quizzes",
                self.settings.max_quizzes
            )));
        }
        if ids.iter().any(|id| *id == quiz.quiz_id) {
            return Err(Error::DuplicateQuiz(quiz.quiz_id.clone()));
        }

        self.sheets
            .append_row(QUIZZES_SHEET, quiz_to_row(quiz)?)
            .await?;
        info!(
            "Saved quiz {} ({} questions) for document {}",
            quiz.quiz_id,
            quiz.questions.len(),
            quiz.document_id
        );
        Ok(())
    }

    /// Assign a fresh id to `questions` and save them as a new quiz
    pub async fn create(&self, document_id: &str, questions: Vec<Question>) -> Result<Quiz> {
        if questions.is_empty() {
            return Err(Error::InvalidArgument(
                "a quiz needs at least one question".to_string(),
            ));
        }

        let taken: HashSet<String> = self
            .sheets
            .column_values(QUIZZES_SHEET, 0)
            .await?
            .into_iter()
            .collect();

        let mut quiz_id = None;
        for attempt in 1..=self.settings.id_attempts {
            let candidate = new_quiz_id(self.settings.id_length);
            if !taken.contains(&candidate) {
                quiz_id = Some(candidate);
                break;
            }
            debug!("Quiz id {} already taken (attempt {})", candidate, attempt);
        }
        let quiz_id = quiz_id.ok_or_else(|| {
            Error::DuplicateQuiz(format!(
                "no unused id after {} attempts",
                self.settings.id_attempts
            ))
        })?;

        let quiz = Quiz {
            quiz_id,
            document_id: document_id.to_string(),
            questions,
            created_at: Utc::now()
                .with_timezone(&self.settings.offset)
                .to_rfc3339_opts(SecondsFormat::Secs, false),
        };
        self.save(&quiz).await?;
        Ok(quiz)
    }

    /// Every stored quiz in insertion order
    pub async fn list_all(&self) -> Result<Vec<Quiz>> {
        let records = self.sheets.get_all_records(QUIZZES_SHEET).await?;
        Ok(records.iter().filter_map(parse_or_skip).collect())
    }

    /// Quizzes for `document_id` in insertion order
    pub async fn list_by_document(&self, document_id: &str) -> Result<Vec<Quiz>> {
        let records = self.sheets.get_all_records(QUIZZES_SHEET).await?;
        Ok(records
            .iter()
            .filter(|r| r.get("document_id").map(String::as_str) == Some(document_id))
            .filter_map(parse_or_skip)
            .collect())
    }

    pub async fn get(&self, quiz_id: &str) -> Result<Quiz> {
        let records = self.sheets.get_all_records(QUIZZES_SHEET).await?;
        let record = records
            .iter()
            .find(|r| r.get("quiz_id").map(String::as_str) == Some(quiz_id))
            .ok_or_else(|| Error::NotFound(format!("quiz {}", quiz_id)))?;
        record_to_quiz(record)
    }

    /// Remove the first quiz with `quiz_id`
    pub async fn delete(&self, quiz_id: &str) -> Result<()> {
        let ids = self.sheets.column_values(QUIZZES_SHEET, 0).await?;
        let index = ids
            .iter()
            .position(|id| id == quiz_id)
            .ok_or_else(|| Error::NotFound(format!("quiz {}", quiz_id)))?;

        self.sheets.delete_row(QUIZZES_SHEET, index).await?;
        info!("Deleted quiz {}", quiz_id);
        Ok(())
    }
}

fn quiz_to_row(quiz: &Quiz) -> Result<Row> {
    Ok(vec![
        quiz.quiz_id.clone(),
        quiz.document_id.clone(),
        serde_json::to_string(&quiz.questions)?,
        quiz.created_at.clone(),
    ])
}

fn record_to_quiz(record: &Record) -> Result<Quiz> {
    let cell = |name: &str| record.get(name).cloned().unwrap_or_default();
    let questions: Vec<Question> = serde_json::from_str(&cell("content"))?;
    Ok(Quiz {
        quiz_id: cell("quiz_id"),
        document_id: cell("document_id"),
        questions,
        created_at: cell("created_at"),
    })
}

fn parse_or_skip(record: &Record) -> Option<Quiz> {
    match record_to_quiz(record) {
        Ok(quiz) => Some(quiz),
        Err(e) => {
            warn!(
                "Skipping unreadable quiz row {}: {}",
                record.get("quiz_id").map(String::as_str).unwrap_or("?"),
                e
            );
            None
        }
    }
}

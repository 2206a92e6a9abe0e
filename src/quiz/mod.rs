//! Quiz content model, generation and persistence

mod generator;
mod id;
mod repository;

pub use generator::*;
pub use id::*;
pub use repository::*;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[serde(alias = "multiple-choice", alias = "mcq")]
    MultipleChoice,
    #[serde(alias = "true-false", alias = "boolean")]
    TrueFalse,
    #[serde(alias = "short-answer", alias = "open")]
    ShortAnswer,
}

impl QuestionKind {
    /// Graded by exact normalized match rather than semantic judgment
    pub fn is_closed(self) -> bool {
        !matches!(self, QuestionKind::ShortAnswer)
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            QuestionKind::MultipleChoice => "multiple choice",
            QuestionKind::TrueFalse => "true/false",
            QuestionKind::ShortAnswer => "short answer",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question", alias = "text")]
    pub text: String,

    #[serde(rename = "type")]
    pub kind: QuestionKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(deserialize_with = "answer_text")]
    pub correct_answer: String,

    #[serde(default)]
    pub explanation: String,

    #[serde(default)]
    pub source_excerpt: String,
}

impl Question {
    /// Check the shape rules, dropping options from non multiple-choice questions
    pub fn normalize(mut self) -> Result<Self, String> {
        if self.text.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        if self.correct_answer.trim().is_empty() {
            return Err("correct answer is empty".to_string());
        }

        match self.kind {
            QuestionKind::MultipleChoice => {
                self.options.retain(|o| !o.trim().is_empty());
                if !(2..=4).contains(&self.options.len()) {
                    return Err(format!(
                        "multiple choice needs 2 to 4 options, got {}",
                        self.options.len()
                    ));
                }
            }
            QuestionKind::TrueFalse | QuestionKind::ShortAnswer => self.options.clear(),
        }

        Ok(self)
    }
}

/// Models sometimes answer true/false questions with a JSON boolean
fn answer_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(if b { "True" } else { "False" }.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported correct_answer value: {}",
            other
        ))),
    }
}

/// A stored quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz_id: String,
    pub document_id: String,
    pub questions: Vec<Question>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_from_model_json() {
        let raw = r#"{
            "question": "Is Paris in France?",
            "type": "true_false",
            "correct_answer": true,
            "explanation": "It is.",
            "source_excerpt": "Paris is the capital of France."
        }"#;
        let q: Question = serde_json::from_str(raw).unwrap();

        assert_eq!(q.kind, QuestionKind::TrueFalse);
        assert_eq!(q.correct_answer, "True");
        assert!(q.options.is_empty());
        assert!(q.kind.is_closed());
    }

    #[test]
    fn test_normalize_multiple_choice_options() {
        let q = Question {
            text: "Capital?".to_string(),
            kind: QuestionKind::MultipleChoice,
            options: vec!["Paris".to_string()],
            correct_answer: "Paris".to_string(),
            explanation: String::new(),
            source_excerpt: String::new(),
        };
        assert!(q.clone().normalize().is_err());

        let mut ok = q.clone();
        ok.options = vec!["Paris".into(), "Rome".into(), " ".into()];
        assert_eq!(ok.normalize().unwrap().options.len(), 2);

        let mut short = q;
        short.kind = QuestionKind::ShortAnswer;
        assert!(short.normalize().unwrap().options.is_empty());
    }

    #[test]
    fn test_question_serializes_with_wire_names() {
        let q = Question {
            text: "Capital?".to_string(),
            kind: QuestionKind::ShortAnswer,
            options: Vec::new(),
            correct_answer: "Paris".to_string(),
            explanation: String::new(),
            source_excerpt: String::new(),
        };
        let value = serde_json::to_value(&q).unwrap();

        assert_eq!(value["question"], "Capital?");
        assert_eq!(value["type"], "short_answer");
        assert!(value.get("options").is_none());
    }
}

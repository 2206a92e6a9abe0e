//! Quiz generation, listing and deletion

use crate::config::Config;
use crate::documents::ChunkStore;
use crate::error::{Error, Result};
use crate::progress::add_spinner;
use crate::quiz::{Quiz, QuizGenerator, QuizRepository};
use tracing::info;

/// Generate a quiz for `document_id` and store it.
///
/// Nothing is persisted unless every step succeeds.
pub async fn cmd_generate(
    config: &Config,
    chunks: &ChunkStore,
    generator: &QuizGenerator,
    repository: &QuizRepository,
    document_id: &str,
    num_questions: Option<usize>,
) -> Result<Quiz> {
    let num_questions = num_questions.unwrap_or(config.quiz.default_questions);

    let stored = repository.count().await?;
    if stored >= config.quiz.max_quizzes {
        return Err(Error::QuotaExceeded(format!(
            "quiz store already holds {} quizzes; delete some first",
            stored
        )));
    }

    let document = chunks
        .get_document(document_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("document {}", document_id)))?;
    if document.full_text.trim().is_empty() {
        return Err(Error::EmptyDocument);
    }

    let spinner = add_spinner(format!(
        "Generating {} questions from {}",
        num_questions, document.filename
    ));
    let questions = generator.generate(&document.full_text, num_questions).await;
    spinner.finish_and_clear();

    let quiz = repository.create(&document.id, questions?).await?;
    info!("Created quiz {} from {}", quiz.quiz_id, document.filename);
    Ok(quiz)
}

pub async fn cmd_list_quizzes(
    repository: &QuizRepository,
    document_id: Option<&str>,
) -> Result<Vec<Quiz>> {
    match document_id {
        Some(id) => repository.list_by_document(id).await,
        None => repository.list_all().await,
    }
}

pub async fn cmd_show_quiz(repository: &QuizRepository, quiz_id: &str) -> Result<Quiz> {
    repository.get(quiz_id).await
}

pub async fn cmd_delete_quiz(repository: &QuizRepository, quiz_id: &str) -> Result<()> {
    repository.delete(quiz_id).await
}

pub fn print_quizzes(quizzes: &[Quiz]) {
    println!("\n📝 Quizzes\n");

    if quizzes.is_empty() {
        println!("No quizzes yet. Use 'quizzer generate <document_id>' to create one.");
        return;
    }

    for quiz in quizzes {
        println!(
            "• {} ({} questions, created {})",
            quiz.quiz_id,
            quiz.questions.len(),
            quiz.created_at
        );
        println!("  Document: {}", quiz.document_id);
    }
}

/// Full quiz including answers
pub fn print_quiz(quiz: &Quiz) {
    println!("\n📝 Quiz {} (document {})\n", quiz.quiz_id, quiz.document_id);

    for (i, question) in quiz.questions.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, question.kind, question.text);
        for (letter, option) in ('A'..='D').zip(&question.options) {
            println!("   {}) {}", letter, option);
        }
        println!("   Answer: {}", question.correct_answer);
        if !question.explanation.is_empty() {
            println!("   Why: {}", question.explanation);
        }
        println!();
    }
}

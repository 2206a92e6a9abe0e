//! Result history

use crate::error::{Error, Result};
use crate::results::{most_recent_first, QuizResult, ResultStore};

#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub username: Option<String>,
    pub document_id: Option<String>,
    pub quiz_id: Option<String>,
}

/// Results matching `filter`, most recent first.
///
/// At most one filter may be given; with none, every result is returned.
pub async fn cmd_results(store: &ResultStore, filter: ResultFilter) -> Result<Vec<QuizResult>> {
    let mut results = match filter {
        ResultFilter {
            username: Some(user),
            document_id: None,
            quiz_id: None,
        } => store.list_by_user(&user).await?,
        ResultFilter {
            username: None,
            document_id: Some(doc),
            quiz_id: None,
        } => store.list_by_document(&doc).await?,
        ResultFilter {
            username: None,
            document_id: None,
            quiz_id: Some(quiz),
        } => store.list_by_quiz(&quiz).await?,
        ResultFilter {
            username: None,
            document_id: None,
            quiz_id: None,
        } => store.list_all().await?,
        _ => {
            return Err(Error::InvalidArgument(
                "use only one of --user, --document or --quiz".to_string(),
            ))
        }
    };

    most_recent_first(&mut results);
    Ok(results)
}

pub fn print_results(results: &[QuizResult]) {
    println!("\n🏆 Results\n");

    if results.is_empty() {
        println!("No results recorded yet. Use 'quizzer take <quiz_id>' to take a quiz.");
        return;
    }

    for result in results {
        println!(
            "• {} scored {}/{} on quiz {} ({})",
            result.username,
            result.score,
            result.total(),
            result.quiz_id,
            result.filename
        );
        println!("  Completed: {}", result.completed_at);
        for (index, answer) in &result.answers {
            let mark = if answer.is_correct { "✓" } else { "✗" };
            println!(
                "  {} Q{}: {}",
                mark,
                index + 1,
                super::preview(&answer.submitted_answer, 60)
            );
        }
    }
}

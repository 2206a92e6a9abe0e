//! Interactive quiz taking

use crate::error::{Error, Result};
use crate::progress::add_spinner;
use crate::quiz::{Question, QuestionKind};
use crate::results::QuizResult;
use crate::session::{QuizSession, SessionState, Step};
use std::io::{BufRead, Write};
use tracing::warn;

/// Outcome of an interactive run
#[derive(Debug, Clone)]
pub struct TakeOutcome {
    pub result: QuizResult,
    pub recorded: bool,
}

/// Map a letter reply ("b", "B)") to the matching multiple-choice option
pub fn resolve_choice(question: &Question, reply: &str) -> String {
    let reply = reply.trim();
    if question.kind != QuestionKind::MultipleChoice {
        return reply.to_string();
    }

    let letter = reply.trim_end_matches(|c: char| c == ')' || c == '.');
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            let index = (c.to_ascii_uppercase() as u8 - b'A') as usize;
            question
                .options
                .get(index)
                .cloned()
                .unwrap_or_else(|| reply.to_string())
        }
        _ => reply.to_string(),
    }
}

/// Drive `session` from `input`, printing prompts and feedback to `output`.
///
/// Returns `None` if input ends before the quiz is finished; the attempt is
/// discarded and nothing is recorded.
pub async fn cmd_take<R, W>(
    session: &mut QuizSession,
    mut input: R,
    mut output: W,
) -> Result<Option<TakeOutcome>>
where
    R: BufRead,
    W: Write,
{
    session.start()?;
    let total = session.quiz().questions.len();

    loop {
        let Some((index, question)) = session.current_question() else {
            return Err(Error::InvalidTransition(format!(
                "no question to answer while {:?}",
                session.state()
            )));
        };
        let question = question.clone();
        write_question(&mut output, index, total, &question)?;

        let verdict = loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output, "\nQuiz abandoned; nothing was recorded.")?;
                session.discard();
                return Ok(None);
            }

            let answer = resolve_choice(&question, &line);
            let spinner = (!question.kind.is_closed()).then(|| add_spinner("Checking answer"));
            let verdict = session.submit_answer(&answer).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }

            match verdict {
                Ok(verdict) => break verdict,
                Err(Error::EmptyAnswer) => writeln!(output, "Please enter an answer.")?,
                Err(e) => {
                    warn!("Could not check answer: {}", e);
                    writeln!(output, "Could not check that answer; please try again.")?;
                }
            }
        };

        if verdict.is_correct {
            writeln!(output, "✓ Correct!")?;
        } else {
            writeln!(output, "✗ Incorrect. The answer is: {}", verdict.correct_answer)?;
        }
        if !verdict.explanation.is_empty() {
            writeln!(output, "  {}", verdict.explanation)?;
        }
        if !verdict.source_excerpt.is_empty() {
            writeln!(output, "  Source: \"{}\"", verdict.source_excerpt)?;
        }
        writeln!(output)?;

        match session.advance().await? {
            Step::Next(_) => continue,
            Step::Completed { result, recorded } => {
                debug_assert_eq!(session.state(), SessionState::Completed);
                return Ok(Some(TakeOutcome { result, recorded }));
            }
        }
    }
}

fn write_question<W: Write>(
    output: &mut W,
    index: usize,
    total: usize,
    question: &Question,
) -> Result<()> {
    writeln!(
        output,
        "Question {}/{} ({})\n{}",
        index + 1,
        total,
        question.kind,
        question.text
    )?;
    for (letter, option) in ('A'..='D').zip(&question.options) {
        writeln!(output, "  {}) {}", letter, option)?;
    }
    if question.kind == QuestionKind::TrueFalse {
        writeln!(output, "  (True / False)")?;
    }
    Ok(())
}

pub fn print_take_outcome(outcome: &TakeOutcome, practice: bool) {
    let result = &outcome.result;
    println!(
        "🏁 {} scored {}/{} on quiz {}",
        result.username,
        result.score,
        result.total(),
        result.quiz_id
    );
    if practice {
        println!("  Practice mode: result not saved");
    } else if outcome.recorded {
        println!("  Result ID: {}", result.result_id);
    } else {
        println!("  ⚠ This attempt was already recorded");
    }
}

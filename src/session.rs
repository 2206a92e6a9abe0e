//! One user's attempt at one quiz
//!
//! `NotStarted -> InProgress(i) -> Verified(i) -> InProgress(i + 1) -> ... -> Completed`
//!
//! A verified answer is locked. Reaching `Completed` saves exactly one result
//! unless the session runs in practice mode.

use crate::error::{Error, Result};
use crate::quiz::{Question, Quiz};
use crate::results::{result_id, AnswerRecord, QuizResult, ResultStore};
use crate::validation::AnswerValidator;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress(usize),
    Verified(usize),
    Completed,
}

/// Transient per-attempt data, never persisted directly
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAttempt {
    pub quiz_id: String,
    pub current_index: usize,
    pub answers: BTreeMap<usize, AnswerRecord>,
    pub score: usize,
    pub started_at: DateTime<FixedOffset>,
}

impl QuizAttempt {
    fn new(quiz_id: &str, started_at: DateTime<FixedOffset>) -> Self {
        Self {
            quiz_id: quiz_id.to_string(),
            current_index: 0,
            answers: BTreeMap::new(),
            score: 0,
            started_at,
        }
    }
}

/// Feedback for a verified answer
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: String,
    pub source_excerpt: String,
}

/// Outcome of `QuizSession::advance`
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Moved on to the question at this index
    Next(usize),
    /// Every question answered; `recorded` is false in practice mode or when
    /// the attempt had already been saved
    Completed { result: QuizResult, recorded: bool },
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub username: String,
    /// Filename of the quiz's source document, copied into the result
    pub filename: String,
    pub offset: FixedOffset,
    pub practice: bool,
}

pub struct QuizSession {
    quiz: Quiz,
    options: SessionOptions,
    validator: AnswerValidator,
    results: ResultStore,
    state: SessionState,
    attempt: Option<QuizAttempt>,
}

impl QuizSession {
    pub fn new(
        quiz: Quiz,
        validator: AnswerValidator,
        results: ResultStore,
        options: SessionOptions,
    ) -> Result<Self> {
        if quiz.questions.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "quiz {} has no questions",
                quiz.quiz_id
            )));
        }
        if options.username.trim().is_empty() {
            return Err(Error::InvalidArgument("username is empty".to_string()));
        }

        Ok(Self {
            quiz,
            options,
            validator,
            results,
            state: SessionState::NotStarted,
            attempt: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn attempt(&self) -> Option<&QuizAttempt> {
        self.attempt.as_ref()
    }

    pub fn score(&self) -> usize {
        self.attempt.as_ref().map_or(0, |a| a.score)
    }

    /// The question being answered or just verified
    pub fn current_question(&self) -> Option<(usize, &Question)> {
        match self.state {
            SessionState::InProgress(i) | SessionState::Verified(i) => {
                self.quiz.questions.get(i).map(|q| (i, q))
            }
            _ => None,
        }
    }

    /// Begin an attempt now
    pub fn start(&mut self) -> Result<()> {
        let now = Utc::now().with_timezone(&self.options.offset);
        self.start_at(now)
    }

    /// Begin an attempt with an explicit start time
    pub fn start_at(&mut self, started_at: DateTime<FixedOffset>) -> Result<()> {
        match self.state {
            SessionState::NotStarted | SessionState::Completed => {}
            other => {
                return Err(Error::InvalidTransition(format!(
                    "cannot start while {:?}; reset the session first",
                    other
                )))
            }
        }

        let started_at = started_at.with_timezone(&self.options.offset);
        self.attempt = Some(QuizAttempt::new(&self.quiz.quiz_id, started_at));
        self.state = SessionState::InProgress(0);
        debug!(
            "Started quiz {} for {} at {}",
            self.quiz.quiz_id, self.options.username, started_at
        );
        Ok(())
    }

    /// Throw away the current attempt and start over from the first question
    pub fn reset(&mut self) -> Result<()> {
        self.discard();
        self.start()
    }

    /// Throw away the current attempt without recording anything
    pub fn discard(&mut self) -> Option<QuizAttempt> {
        self.state = SessionState::NotStarted;
        self.attempt.take()
    }

    /// Grade `answer` for the current question and lock it in
    pub async fn submit_answer(&mut self, answer: &str) -> Result<Verdict> {
        let index = match self.state {
            SessionState::InProgress(i) => i,
            SessionState::Verified(i) => {
                return Err(Error::InvalidTransition(format!(
                    "question {} is already answered",
                    i + 1
                )))
            }
            other => {
                return Err(Error::InvalidTransition(format!(
                    "cannot answer while {:?}",
                    other
                )))
            }
        };
        if answer.trim().is_empty() {
            return Err(Error::EmptyAnswer);
        }

        let question = &self.quiz.questions[index];
        let is_correct = self
            .validator
            .validate(question.kind, answer, &question.correct_answer)
            .await?;

        let record = AnswerRecord {
            question_text: question.text.clone(),
            submitted_answer: answer.trim().to_string(),
            correct_answer: question.correct_answer.clone(),
            is_correct,
        };
        let verdict = Verdict {
            is_correct,
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
            source_excerpt: question.source_excerpt.clone(),
        };

        let attempt = self.attempt_mut()?;
        attempt.answers.insert(index, record);
        if is_correct {
            attempt.score += 1;
        }
        self.state = SessionState::Verified(index);
        Ok(verdict)
    }

    /// Move past a verified question, completing the quiz after the last one
    pub async fn advance(&mut self) -> Result<Step> {
        let index = match self.state {
            SessionState::Verified(i) => i,
            other => {
                return Err(Error::InvalidTransition(format!(
                    "cannot advance while {:?}",
                    other
                )))
            }
        };

        let next = index + 1;
        if next < self.quiz.questions.len() {
            self.attempt_mut()?.current_index = next;
            self.state = SessionState::InProgress(next);
            return Ok(Step::Next(next));
        }

        self.complete().await
    }

    async fn complete(&mut self) -> Result<Step> {
        let total = self.quiz.questions.len();
        self.attempt_mut()?.current_index = total;
        let result = self.build_result()?;

        let recorded = if self.options.practice {
            debug!("Practice attempt on quiz {} not recorded", self.quiz.quiz_id);
            false
        } else {
            match self.results.save(&result).await {
                Ok(()) => true,
                Err(Error::DuplicateResult(id)) => {
                    warn!("Result {} was already recorded", id);
                    false
                }
                // Stay in Verified so the caller can retry the save
                Err(e) => return Err(e),
            }
        };

        info!(
            "{} finished quiz {} with {}/{}",
            result.username,
            result.quiz_id,
            result.score,
            result.total()
        );
        self.state = SessionState::Completed;
        self.attempt = None;
        Ok(Step::Completed { result, recorded })
    }

    fn build_result(&self) -> Result<QuizResult> {
        let attempt = self
            .attempt
            .as_ref()
            .ok_or_else(|| Error::InvalidTransition("no attempt in progress".to_string()))?;
        // Sub-second precision keeps attempts started in the same second distinct
        let started_at = attempt
            .started_at
            .to_rfc3339_opts(SecondsFormat::Micros, false);
        let completed_at = Utc::now()
            .with_timezone(&self.options.offset)
            .to_rfc3339_opts(SecondsFormat::Micros, false);

        Ok(QuizResult {
            result_id: result_id(
                &self.quiz.document_id,
                &self.quiz.quiz_id,
                &self.options.username,
                &started_at,
            ),
            quiz_id: self.quiz.quiz_id.clone(),
            document_id: self.quiz.document_id.clone(),
            filename: self.options.filename.clone(),
            username: self.options.username.clone(),
            score: attempt.score,
            answers: attempt.answers.clone(),
            started_at,
            completed_at,
        })
    }

    fn attempt_mut(&mut self) -> Result<&mut QuizAttempt> {
        self.attempt
            .as_mut()
            .ok_or_else(|| Error::InvalidTransition("no attempt in progress".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::QuestionKind;
    use crate::sheet::{MemorySheetStore, Row, SheetStore};
    use crate::testing::ScriptedCompleter;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn question(text: &str, kind: QuestionKind, answer: &str) -> Question {
        Question {
            text: text.to_string(),
            kind,
            options: if kind == QuestionKind::MultipleChoice {
                vec!["Paris".to_string(), "Lyon".to_string()]
            } else {
                Vec::new()
            },
            correct_answer: answer.to_string(),
            explanation: format!("Because {}", answer),
            source_excerpt: String::new(),
        }
    }

    fn quiz() -> Quiz {
        Quiz {
            quiz_id: "abc123".to_string(),
            document_id: "doc-1".to_string(),
            questions: vec![
                question("Capital of France?", QuestionKind::MultipleChoice, "Paris"),
                question("The Seine flows through Paris.", QuestionKind::TrueFalse, "True"),
                question("What river crosses Paris?", QuestionKind::ShortAnswer, "The Seine"),
            ],
            created_at: "2024-05-01T09:00:00+08:00".to_string(),
        }
    }

    fn options(practice: bool) -> SessionOptions {
        SessionOptions {
            username: "alice".to_string(),
            filename: "paris.txt".to_string(),
            offset: FixedOffset::east_opt(8 * 3600).unwrap(),
            practice,
        }
    }

    fn start_time() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 10, 0, 0)
            .unwrap()
    }

    async fn session_with(
        judge: ScriptedCompleter,
        sheets: Arc<dyn SheetStore>,
        practice: bool,
    ) -> (QuizSession, ResultStore) {
        let results = ResultStore::open(sheets).await.unwrap();
        let session = QuizSession::new(
            quiz(),
            AnswerValidator::new(Arc::new(judge)),
            results.clone(),
            options(practice),
        )
        .unwrap();
        (session, results)
    }

    async fn session(judge: ScriptedCompleter) -> (QuizSession, ResultStore) {
        session_with(judge, Arc::new(MemorySheetStore::new()), false).await
    }

    #[tokio::test]
    async fn test_full_attempt_records_one_result() {
        let (mut session, results) = session(ScriptedCompleter::new(["YES"])).await;
        session.start_at(start_time()).unwrap();

        assert!(session.submit_answer("paris").await.unwrap().is_correct);
        assert_eq!(session.advance().await.unwrap(), Step::Next(1));

        let verdict = session.submit_answer("False").await.unwrap();
        assert!(!verdict.is_correct);
        assert_eq!(verdict.correct_answer, "True");
        assert_eq!(verdict.explanation, "Because True");
        assert_eq!(session.advance().await.unwrap(), Step::Next(2));

        assert!(session.submit_answer("the seine river").await.unwrap().is_correct);
        let step = session.advance().await.unwrap();

        let Step::Completed { result, recorded } = step else {
            panic!("expected completion");
        };
        assert!(recorded);
        assert_eq!(result.score, 2);
        assert_eq!(result.answers.len(), 3);
        assert_eq!(result.answers[&1].submitted_answer, "False");
        assert!(!result.answers[&1].is_correct);
        assert_eq!(result.started_at, "2024-05-01T10:00:00.000000+08:00");
        assert_eq!(session.state(), SessionState::Completed);
        assert!(session.attempt().is_none());

        assert_eq!(results.list_all().await.unwrap(), vec![result]);
    }

    #[tokio::test]
    async fn test_second_submit_is_rejected() {
        let (mut session, _) = session(ScriptedCompleter::new(Vec::<String>::new())).await;
        session.start().unwrap();

        session.submit_answer("Paris").await.unwrap();
        let err = session.submit_answer("Paris").await.unwrap_err();

        assert!(matches!(err, Error::InvalidTransition(_)));
        assert_eq!(session.state(), SessionState::Verified(0));
        assert_eq!(session.score(), 1);
        assert_eq!(session.attempt().unwrap().answers.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_answers_leave_state_unchanged() {
        let (mut session, _) = session(ScriptedCompleter::failing()).await;

        assert!(matches!(
            session.submit_answer("Paris").await,
            Err(Error::InvalidTransition(_))
        ));
        session.start().unwrap();
        assert!(matches!(
            session.advance().await,
            Err(Error::InvalidTransition(_))
        ));
        assert!(matches!(
            session.submit_answer("  ").await,
            Err(Error::EmptyAnswer)
        ));
        assert_eq!(session.state(), SessionState::InProgress(0));

        session.submit_answer("Paris").await.unwrap();
        session.advance().await.unwrap();
        session.submit_answer("True").await.unwrap();
        session.advance().await.unwrap();

        // The judge is down: no verdict, no score change
        assert!(matches!(
            session.submit_answer("The Seine").await,
            Err(Error::Completion(_))
        ));
        assert_eq!(session.state(), SessionState::InProgress(2));
        assert_eq!(session.score(), 2);
    }

    #[tokio::test]
    async fn test_same_attempt_is_recorded_once() {
        let sheets: Arc<dyn SheetStore> = Arc::new(MemorySheetStore::new());
        let mut recorded_flags = Vec::new();

        for _ in 0..2 {
            let (mut session, _) =
                session_with(ScriptedCompleter::new(["NO"]), sheets.clone(), false).await;
            session.start_at(start_time()).unwrap();
            for answer in ["Paris", "True", "Lyon"] {
                session.submit_answer(answer).await.unwrap();
                if let Step::Completed { recorded, .. } = session.advance().await.unwrap() {
                    recorded_flags.push(recorded);
                }
            }
        }

        assert_eq!(recorded_flags, vec![true, false]);
        let results = ResultStore::open(sheets).await.unwrap();
        assert_eq!(results.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attempts_in_the_same_second_are_both_recorded() {
        let (mut session, results) = session(ScriptedCompleter::new(["NO", "NO"])).await;
        let mut recorded_flags = Vec::new();

        for millis in [100, 800] {
            session
                .start_at(start_time() + chrono::Duration::milliseconds(millis))
                .unwrap();
            for answer in ["Paris", "True", "Lyon"] {
                session.submit_answer(answer).await.unwrap();
                if let Step::Completed { recorded, .. } = session.advance().await.unwrap() {
                    recorded_flags.push(recorded);
                }
            }
        }

        assert_eq!(recorded_flags, vec![true, true]);
        let stored = results.list_all().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].started_at, "2024-05-01T10:00:00.100000+08:00");
        assert_eq!(stored[1].started_at, "2024-05-01T10:00:00.800000+08:00");
        assert_ne!(stored[0].result_id, stored[1].result_id);
    }

    #[tokio::test]
    async fn test_practice_mode_records_nothing() {
        let sheets: Arc<dyn SheetStore> = Arc::new(MemorySheetStore::new());
        let (mut session, results) =
            session_with(ScriptedCompleter::new(["YES"]), sheets, true).await;
        session.start().unwrap();
        for answer in ["Paris", "True", "Seine"] {
            session.submit_answer(answer).await.unwrap();
            session.advance().await.unwrap();
        }

        assert_eq!(session.state(), SessionState::Completed);
        assert!(results.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_and_discard() {
        let (mut session, _) = session(ScriptedCompleter::new(Vec::<String>::new())).await;
        session.start().unwrap();
        session.submit_answer("Paris").await.unwrap();
        assert!(matches!(session.start(), Err(Error::InvalidTransition(_))));

        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::InProgress(0));
        assert_eq!(session.score(), 0);

        let dropped = session.discard().unwrap();
        assert!(dropped.answers.is_empty());
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(session.current_question().is_none());
    }

    /// Sheet store whose appends fail while `fail` is set
    struct FlakySheets {
        inner: MemorySheetStore,
        fail: AtomicBool,
    }

    #[async_trait]
    impl SheetStore for FlakySheets {
        async fn ensure_sheet(&self, sheet: &str, header: &[&str]) -> Result<()> {
            self.inner.ensure_sheet(sheet, header).await
        }

        async fn header(&self, sheet: &str) -> Result<Vec<String>> {
            self.inner.header(sheet).await
        }

        async fn rows(&self, sheet: &str) -> Result<Vec<Row>> {
            self.inner.rows(sheet).await
        }

        async fn append_row(&self, sheet: &str, row: Row) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Other("sheet unavailable".to_string()));
            }
            self.inner.append_row(sheet, row).await
        }

        async fn delete_row(&self, sheet: &str, index: usize) -> Result<()> {
            self.inner.delete_row(sheet, index).await
        }

        async fn update_range(
            &self,
            sheet: &str,
            index: usize,
            start_col: usize,
            values: Vec<String>,
        ) -> Result<()> {
            self.inner.update_range(sheet, index, start_col, values).await
        }
    }

    #[tokio::test]
    async fn test_failed_save_can_be_retried() {
        let sheets = Arc::new(FlakySheets {
            inner: MemorySheetStore::new(),
            fail: AtomicBool::new(true),
        });
        let (mut session, results) =
            session_with(ScriptedCompleter::new(["YES"]), sheets.clone(), false).await;
        session.start().unwrap();
        for answer in ["Paris", "True"] {
            session.submit_answer(answer).await.unwrap();
            session.advance().await.unwrap();
        }
        session.submit_answer("Seine").await.unwrap();

        assert!(matches!(session.advance().await, Err(Error::Other(_))));
        assert_eq!(session.state(), SessionState::Verified(2));

        sheets.fail.store(false, Ordering::SeqCst);
        let step = session.advance().await.unwrap();
        assert!(matches!(step, Step::Completed { recorded: true, .. }));
        assert_eq!(results.list_all().await.unwrap().len(), 1);
    }
}

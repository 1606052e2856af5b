//! Quiz session controller.
//!
//! A synchronous state machine owning every accumulator of one quiz attempt:
//!
//! ```text
//! AnsweringQuestion -> ShowingResult -> AnsweringQuestion | Completed
//! ```
//!
//! Scores are folded in the moment a question is left, so a timer expiry and
//! a manual "next" racing each other can only ever score the question once.
//! Loading is done by [`load_quiz`], which fetches the chapter and its
//! questions through the injected backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::model::{Chapter, Identity, Question};
use crate::scoring::{score_answer, AnswerOutcome};
use crate::traits::{IdentityProvider, QuizStore};

/// Phase of a quiz attempt after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AnsweringQuestion,
    ShowingResult,
    Completed,
}

/// What caused the current question to be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceTrigger {
    /// The learner asked for the next question.
    Manual,
    /// The countdown armed for `question_index` reached zero.
    Timeout { question_index: usize },
}

/// Misuse of the controller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("action not allowed while {0:?}")]
    WrongPhase(Phase),
}

/// Why a quiz could not be started.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nobody is signed in; the caller should send the user to sign in.
    #[error("no authenticated identity")]
    Unauthenticated,

    #[error("chapter {0} not found")]
    ChapterNotFound(Uuid),

    #[error("chapter {0} has no active questions")]
    NoQuestions(Uuid),

    #[error("backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// Result of leaving one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_index: usize,
    pub question_id: Uuid,
    pub submitted: String,
    pub hints_used: u32,
    pub timed_out: bool,
    #[serde(flatten)]
    pub outcome: AnswerOutcome,
}

/// Running totals of an attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub score: u32,
    pub xp_gained: u32,
    pub correct: usize,
}

/// Read-only summary shown once the quiz is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub score: u32,
    pub xp_gained: u32,
    pub correct: usize,
    pub total: usize,
    /// `round(100 * correct / total)`.
    pub accuracy_percent: u32,
    pub elapsed: Duration,
}

/// One answered question as handed to the persistence adapter.
#[derive(Debug, Clone)]
pub struct AnsweredQuestion {
    pub question: Question,
    pub submitted: String,
    pub hints_used: u32,
}

/// Everything the persistence adapter needs from a completed attempt.
#[derive(Debug, Clone)]
pub struct CompletedQuiz {
    pub student_id: Uuid,
    pub chapter_id: Uuid,
    pub totals: SessionTotals,
    pub elapsed: Duration,
    pub answers: Vec<AnsweredQuestion>,
}

/// Learner-facing view of the current question.
#[derive(Debug, Clone)]
pub struct QuestionPrompt<'a> {
    pub index: usize,
    pub total: usize,
    pub question: &'a Question,
    /// Hints revealed so far, in order.
    pub revealed_hints: &'a [String],
    /// Answer currently buffered for this question.
    pub current_answer: &'a str,
}

/// State of one quiz attempt.
#[derive(Debug)]
pub struct QuizController {
    student_id: Uuid,
    chapter: Chapter,
    questions: Vec<Question>,
    index: usize,
    phase: Phase,
    answers: Vec<String>,
    hints_used: Vec<u32>,
    outcomes: Vec<Option<QuestionOutcome>>,
    totals: SessionTotals,
    started_at: Instant,
    finished_at: Option<Instant>,
    completion_taken: bool,
}

impl QuizController {
    /// Start an attempt over pre-fetched questions.
    ///
    /// Returns `None` when `questions` is empty.
    pub fn new(student_id: Uuid, chapter: Chapter, questions: Vec<Question>) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        let n = questions.len();
        Some(Self {
            student_id,
            chapter,
            questions,
            index: 0,
            phase: Phase::AnsweringQuestion,
            answers: vec![String::new(); n],
            hints_used: vec![0; n],
            outcomes: vec![None; n],
            totals: SessionTotals::default(),
            started_at: Instant::now(),
            finished_at: None,
            completion_taken: false,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn chapter(&self) -> &Chapter {
        &self.chapter
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.index]
    }

    pub fn is_last_question(&self) -> bool {
        self.index + 1 == self.questions.len()
    }

    pub fn totals(&self) -> SessionTotals {
        self.totals
    }

    /// Outcome of the question just left, while its result is on display.
    pub fn last_outcome(&self) -> Option<&QuestionOutcome> {
        match self.phase {
            Phase::ShowingResult => self.outcomes[self.index].as_ref(),
            _ => None,
        }
    }

    /// Current question as seen by the learner.
    pub fn prompt(&self) -> QuestionPrompt<'_> {
        let question = &self.questions[self.index];
        let shown = (self.hints_used[self.index] as usize).min(question.hints.len());
        QuestionPrompt {
            index: self.index,
            total: self.questions.len(),
            question,
            revealed_hints: &question.hints[..shown],
            current_answer: &self.answers[self.index],
        }
    }

    /// Buffer an answer for the current question, replacing any previous one.
    pub fn select_answer(&mut self, answer: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_phase(Phase::AnsweringQuestion)?;
        self.answers[self.index] = answer.into();
        Ok(())
    }

    /// Reveal the next hint of the current question.
    ///
    /// Returns the revealed hint, or `None` once every hint is shown.
    pub fn reveal_hint(&mut self) -> Result<Option<&str>, SessionError> {
        self.ensure_phase(Phase::AnsweringQuestion)?;
        let used = self.hints_used[self.index] as usize;
        let question = &self.questions[self.index];
        if used >= question.hints.len() {
            return Ok(None);
        }
        self.hints_used[self.index] += 1;
        Ok(Some(question.hints[used].as_str()))
    }

    /// Leave the current question, scoring the buffered answer.
    ///
    /// Only the first trigger for a question has an effect: anything arriving
    /// outside `AnsweringQuestion`, or a timeout armed for another question,
    /// is ignored and yields `None`.
    pub fn advance(&mut self, trigger: AdvanceTrigger) -> Option<&QuestionOutcome> {
        if self.phase != Phase::AnsweringQuestion {
            tracing::debug!(?trigger, phase = ?self.phase, "ignoring stale advance");
            return None;
        }
        let timed_out = match trigger {
            AdvanceTrigger::Manual => false,
            AdvanceTrigger::Timeout { question_index } if question_index == self.index => true,
            AdvanceTrigger::Timeout { question_index } => {
                tracing::debug!(question_index, current = self.index, "ignoring stale timeout");
                return None;
            }
        };

        let question = &self.questions[self.index];
        let submitted = self.answers[self.index].clone();
        let hints_used = self.hints_used[self.index];
        let outcome = score_answer(question, &submitted, hints_used);

        self.totals.score += outcome.points;
        self.totals.xp_gained += outcome.points;
        if outcome.correct {
            self.totals.correct += 1;
        }

        self.outcomes[self.index] = Some(QuestionOutcome {
            question_index: self.index,
            question_id: question.id,
            submitted,
            hints_used,
            timed_out,
            outcome,
        });
        self.phase = Phase::ShowingResult;
        self.outcomes[self.index].as_ref()
    }

    /// End the result display: move to the next question or complete.
    pub fn finish_result(&mut self) -> Result<Phase, SessionError> {
        self.ensure_phase(Phase::ShowingResult)?;
        if self.is_last_question() {
            self.phase = Phase::Completed;
            self.finished_at = Some(Instant::now());
        } else {
            self.index += 1;
            self.phase = Phase::AnsweringQuestion;
        }
        Ok(self.phase)
    }

    /// Summary of a completed attempt.
    pub fn summary(&self) -> Option<QuizSummary> {
        if self.phase != Phase::Completed {
            return None;
        }
        let total = self.questions.len();
        Some(QuizSummary {
            score: self.totals.score,
            xp_gained: self.totals.xp_gained,
            correct: self.totals.correct,
            total,
            accuracy_percent: accuracy_percent(self.totals.correct, total),
            elapsed: self.elapsed(),
        })
    }

    /// Hand the completed attempt to persistence. Yields `Some` exactly once.
    pub fn take_completion(&mut self) -> Option<CompletedQuiz> {
        if self.phase != Phase::Completed || self.completion_taken {
            return None;
        }
        self.completion_taken = true;
        let answers = self
            .questions
            .iter()
            .zip(&self.answers)
            .zip(&self.hints_used)
            .map(|((question, submitted), &hints_used)| AnsweredQuestion {
                question: question.clone(),
                submitted: submitted.clone(),
                hints_used,
            })
            .collect();
        Some(CompletedQuiz {
            student_id: self.student_id,
            chapter_id: self.chapter.id,
            totals: self.totals,
            elapsed: self.elapsed(),
            answers,
        })
    }

    fn elapsed(&self) -> Duration {
        let end = self.finished_at.unwrap_or_else(Instant::now);
        end.duration_since(self.started_at)
    }

    fn ensure_phase(&self, expected: Phase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase(self.phase))
        }
    }
}

/// `round(100 * correct / total)`, 0 for an empty quiz.
pub fn accuracy_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 * 100.0 / total as f64).round() as u32
}

/// Resolve the learner, the chapter, and its active questions.
pub async fn load_quiz<B>(backend: &B, chapter_id: Uuid) -> Result<QuizController, LoadError>
where
    B: QuizStore + IdentityProvider + ?Sized,
{
    let Some(Identity { user_id, .. }) = backend.current_identity().await? else {
        return Err(LoadError::Unauthenticated);
    };

    let chapter = backend
        .fetch_chapter(chapter_id)
        .await?
        .ok_or(LoadError::ChapterNotFound(chapter_id))?;

    let mut questions = backend.fetch_questions(chapter_id).await?;
    for q in &mut questions {
        q.options.sort_by_key(|o| o.order_index);
    }

    tracing::info!(
        %chapter_id,
        student = %user_id,
        questions = questions.len(),
        "quiz loaded"
    );

    QuizController::new(user_id, chapter, questions).ok_or(LoadError::NoQuestions(chapter_id))
}

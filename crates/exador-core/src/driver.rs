//! Async quiz driver.
//!
//! Runs a [`QuizController`] to completion: learner input is raced against
//! the question's countdown, each result stays on display for a fixed pause,
//! and the completed attempt is handed to the persistence adapter once.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::{sleep, sleep_until, Instant};

use crate::persistence::{record_session, PersistError, SessionReceipt};
use crate::session::{
    AdvanceTrigger, Phase, QuestionOutcome, QuestionPrompt, QuizController, QuizSummary,
};
use crate::traits::QuizStore;

/// Configuration for the quiz driver.
#[derive(Debug, Clone)]
pub struct QuizRunConfig {
    /// How long a question's result stays on display.
    pub result_pause: Duration,
    /// Countdown for questions without their own time limit.
    pub default_time_limit: Option<Duration>,
}

impl Default for QuizRunConfig {
    fn default() -> Self {
        Self {
            result_pause: Duration::from_secs(2),
            default_time_limit: None,
        }
    }
}

/// One learner interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnerAction {
    /// Replace the buffered answer.
    Answer(String),
    /// Reveal the next hint.
    RevealHint,
    /// Move on with the buffered answer.
    Next,
    /// Abandon the attempt.
    Quit,
}

/// Source of learner input.
#[async_trait]
pub trait Learner: Send {
    /// Wait for the learner's next action on the current question.
    ///
    /// May be cancelled when the countdown expires.
    async fn next_action(&mut self, prompt: &QuestionPrompt<'_>) -> LearnerAction;
}

/// Progress reporting trait.
pub trait QuizObserver: Send + Sync {
    fn on_question(&self, prompt: &QuestionPrompt<'_>, time_limit: Option<Duration>);
    fn on_hint(&self, hint: &str);
    fn on_result(&self, outcome: &QuestionOutcome);
    fn on_complete(&self, summary: &QuizSummary);
}

/// No-op observer.
pub struct NoopObserver;

impl QuizObserver for NoopObserver {
    fn on_question(&self, _: &QuestionPrompt<'_>, _: Option<Duration>) {}
    fn on_hint(&self, _: &str) {}
    fn on_result(&self, _: &QuestionOutcome) {}
    fn on_complete(&self, _: &QuizSummary) {}
}

/// How a driven quiz ended.
#[derive(Debug)]
pub enum QuizRunOutcome {
    /// Every question was answered. `saved` carries the persistence result.
    Completed {
        summary: QuizSummary,
        saved: Result<SessionReceipt, PersistError>,
    },
    /// The learner quit; nothing was persisted.
    Abandoned { answered: usize },
}

/// Drive `controller` until the quiz completes or the learner quits.
pub async fn run_quiz<S>(
    controller: &mut QuizController,
    learner: &mut dyn Learner,
    store: &S,
    observer: &dyn QuizObserver,
    config: &QuizRunConfig,
) -> Result<QuizRunOutcome>
where
    S: QuizStore + ?Sized,
{
    loop {
        match controller.phase() {
            Phase::AnsweringQuestion => {
                let index = controller.current_index();
                let limit = controller
                    .current_question()
                    .time_limit
                    .filter(|&secs| secs > 0)
                    .map(|secs| Duration::from_secs(u64::from(secs)))
                    .or(config.default_time_limit);
                let deadline = limit.map(|l| Instant::now() + l);

                observer.on_question(&controller.prompt(), limit);

                let trigger = loop {
                    let action = {
                        let prompt = controller.prompt();
                        match deadline {
                            Some(deadline) => tokio::select! {
                                action = learner.next_action(&prompt) => Some(action),
                                _ = sleep_until(deadline) => None,
                            },
                            None => Some(learner.next_action(&prompt).await),
                        }
                    };

                    match action {
                        None => {
                            tracing::info!(question_index = index, "time is up");
                            break AdvanceTrigger::Timeout {
                                question_index: index,
                            };
                        }
                        Some(LearnerAction::Answer(answer)) => controller.select_answer(answer)?,
                        Some(LearnerAction::RevealHint) => {
                            if let Some(hint) = controller.reveal_hint()? {
                                observer.on_hint(hint);
                            }
                        }
                        Some(LearnerAction::Next) => break AdvanceTrigger::Manual,
                        Some(LearnerAction::Quit) => {
                            tracing::info!(question_index = index, "quiz abandoned");
                            return Ok(QuizRunOutcome::Abandoned { answered: index });
                        }
                    }
                };

                if let Some(outcome) = controller.advance(trigger) {
                    observer.on_result(outcome);
                }
            }
            Phase::ShowingResult => {
                sleep(config.result_pause).await;
                controller.finish_result()?;
            }
            Phase::Completed => break,
        }
    }

    let summary = controller
        .summary()
        .ok_or_else(|| anyhow::anyhow!("quiz completed without a summary"))?;
    observer.on_complete(&summary);

    let saved = match controller.take_completion() {
        Some(completed) => record_session(store, &completed).await,
        None => anyhow::bail!("quiz completion was already persisted"),
    };

    Ok(QuizRunOutcome::Completed { summary, saved })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;
    use crate::model::{
        Chapter, ChapterSummary, Continent, Difficulty, NewChapter, NewOption, NewQuestion,
        Profile, ProfileProgress, Question, QuizSessionRecord, StudentAnswerRecord,
    };
    use crate::persistence::PersistStep;
    use crate::scoring::tests::mcq;

    /// Store whose every call fails, so persistence stops at its first step.
    struct OfflineStore;

    #[async_trait]
    impl QuizStore for OfflineStore {
        fn name(&self) -> &str {
            "offline"
        }
        async fn fetch_chapter(&self, _: Uuid) -> Result<Option<Chapter>> {
            anyhow::bail!("offline")
        }
        async fn fetch_questions(&self, _: Uuid) -> Result<Vec<Question>> {
            anyhow::bail!("offline")
        }
        async fn list_chapters(&self, _: Continent) -> Result<Vec<ChapterSummary>> {
            anyhow::bail!("offline")
        }
        async fn fetch_profile(&self, _: Uuid) -> Result<Profile> {
            anyhow::bail!("offline")
        }
        async fn list_students(&self) -> Result<Vec<Profile>> {
            anyhow::bail!("offline")
        }
        async fn insert_session(&self, _: &QuizSessionRecord) -> Result<Uuid> {
            anyhow::bail!("offline")
        }
        async fn insert_answer(&self, _: &StudentAnswerRecord) -> Result<()> {
            anyhow::bail!("offline")
        }
        async fn update_profile_progress(&self, _: Uuid, _: &ProfileProgress) -> Result<()> {
            anyhow::bail!("offline")
        }
        async fn find_chapter_by_code(&self, _: &str) -> Result<Option<Uuid>> {
            anyhow::bail!("offline")
        }
        async fn insert_chapter(&self, _: &NewChapter) -> Result<Uuid> {
            anyhow::bail!("offline")
        }
        async fn insert_question(&self, _: &NewQuestion) -> Result<Uuid> {
            anyhow::bail!("offline")
        }
        async fn insert_option(&self, _: &NewOption) -> Result<()> {
            anyhow::bail!("offline")
        }
    }

    /// Types an answer once, then never submits.
    struct SilentLearner {
        typed: Option<String>,
    }

    #[async_trait]
    impl Learner for SilentLearner {
        async fn next_action(&mut self, _: &QuestionPrompt<'_>) -> LearnerAction {
            match self.typed.take() {
                Some(answer) => LearnerAction::Answer(answer),
                None => std::future::pending().await,
            }
        }
    }

    #[derive(Default)]
    struct Outcomes(Mutex<Vec<QuestionOutcome>>);

    impl QuizObserver for Outcomes {
        fn on_question(&self, _: &QuestionPrompt<'_>, _: Option<Duration>) {}
        fn on_hint(&self, _: &str) {}
        fn on_result(&self, outcome: &QuestionOutcome) {
            self.0.lock().unwrap().push(outcome.clone());
        }
        fn on_complete(&self, _: &QuizSummary) {}
    }

    fn controller(question: Question) -> QuizController {
        let chapter = Chapter {
            id: Uuid::new_v4(),
            code: "ARI-01".into(),
            title: "Chapitre ARI-01".into(),
            description: None,
            continent: Continent::Arithmia,
            level: 1,
            order_index: 0,
            is_active: true,
        };
        QuizController::new(Uuid::new_v4(), chapter, vec![question]).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_scores_the_buffered_answer() {
        let mut question = mcq(Difficulty::Moyen, None, "4");
        question.time_limit = Some(30);
        let mut c = controller(question);
        let mut learner = SilentLearner {
            typed: Some("4".into()),
        };
        let observer = Outcomes::default();
        let started = Instant::now();

        let outcome = run_quiz(
            &mut c,
            &mut learner,
            &OfflineStore,
            &observer,
            &QuizRunConfig::default(),
        )
        .await
        .unwrap();

        // 30s countdown plus the 2s result pause.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(32) && elapsed < Duration::from_secs(33));
        let outcomes = observer.0.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].timed_out);
        assert!(outcomes[0].outcome.correct);
        assert_eq!(outcomes[0].submitted, "4");

        match outcome {
            QuizRunOutcome::Completed { summary, saved } => {
                assert_eq!(summary.correct, 1);
                assert_eq!(saved.unwrap_err().step, PersistStep::ReadProfile);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn default_time_limit_applies_without_own_limit() {
        let mut c = controller(mcq(Difficulty::Facile, None, "4"));
        let mut learner = SilentLearner { typed: None };
        let observer = Outcomes::default();
        let config = QuizRunConfig {
            result_pause: Duration::ZERO,
            default_time_limit: Some(Duration::from_secs(5)),
        };
        let started = Instant::now();

        run_quiz(&mut c, &mut learner, &OfflineStore, &observer, &config)
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
        let outcomes = observer.0.lock().unwrap();
        assert!(outcomes[0].timed_out);
        assert!(!outcomes[0].outcome.correct);
    }
}

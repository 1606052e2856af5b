//! The `exador play` command.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use exador_core::driver::{run_quiz, Learner, LearnerAction, QuizObserver, QuizRunOutcome};
use exador_core::model::QuestionType;
use exador_core::session::{load_quiz, QuestionOutcome, QuestionPrompt, QuizSummary};

/// Learner reading commands from standard input.
///
/// Text matching a multiple-choice option picks it, otherwise a number picks
/// the option at that position. `?` reveals a hint, an empty line submits,
/// `:q` quits. Anything else is taken as the answer text.
///
/// Lines are read on a dedicated thread so a read left pending by an expired
/// countdown never holds the runtime open.
struct StdinLearner {
    lines: mpsc::UnboundedReceiver<String>,
}

impl StdinLearner {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("failed to read input: {e}");
                        break;
                    }
                }
            }
        });
        Self { lines: rx }
    }
}

/// Map one input line to a learner action.
fn parse_input(line: &str, prompt: &QuestionPrompt<'_>) -> LearnerAction {
    let line = line.trim();
    match line {
        ":q" => LearnerAction::Quit,
        "?" => LearnerAction::RevealHint,
        "" => LearnerAction::Next,
        _ => {
            let options = &prompt.question.options;
            if prompt.question.question_type == QuestionType::MultipleChoice {
                if options.iter().any(|o| o.option_text == line) {
                    return LearnerAction::Answer(line.to_string());
                }
                if let Some(option) = line
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| options.get(i))
                {
                    return LearnerAction::Answer(option.option_text.clone());
                }
            }
            LearnerAction::Answer(line.to_string())
        }
    }
}

#[async_trait]
impl Learner for StdinLearner {
    async fn next_action(&mut self, prompt: &QuestionPrompt<'_>) -> LearnerAction {
        match self.lines.recv().await {
            Some(line) => parse_input(&line, prompt),
            None => LearnerAction::Quit,
        }
    }
}

/// Console quiz observer.
struct ConsoleObserver;

impl QuizObserver for ConsoleObserver {
    fn on_question(&self, prompt: &QuestionPrompt<'_>, time_limit: Option<Duration>) {
        let q = prompt.question;
        println!(
            "\nQuestion {}/{} [{}]",
            prompt.index + 1,
            prompt.total,
            q.difficulty.label()
        );
        println!("{}", q.question_text);
        for (i, option) in q.options.iter().enumerate() {
            println!("  {}. {}", i + 1, option.option_text);
        }
        if let Some(limit) = time_limit {
            println!("({}s to answer)", limit.as_secs());
        }
        let hint_help = if q.hints.is_empty() { "" } else { ", ? for a hint" };
        println!("Type your answer then an empty line to submit{hint_help}, :q to quit.");
    }

    fn on_hint(&self, hint: &str) {
        println!("Indice : {hint}");
    }

    fn on_result(&self, outcome: &QuestionOutcome) {
        if outcome.timed_out {
            println!("Time's up!");
        }
        if outcome.outcome.correct {
            println!("Correct! +{} XP", outcome.outcome.points);
        } else if outcome.outcome.canonical.is_empty() {
            println!("Incorrect.");
        } else {
            println!("Incorrect. Expected: {}", outcome.outcome.canonical);
        }
    }

    fn on_complete(&self, summary: &QuizSummary) {
        println!("\nQuiz complete!");
        println!(
            "Score: {} | XP gained: {} | Correct: {}/{} ({}%) | Time: {}s",
            summary.score,
            summary.xp_gained,
            summary.correct,
            summary.total,
            summary.accuracy_percent,
            summary.elapsed.as_secs()
        );
    }
}

pub async fn execute(chapter_id: Uuid, config_path: Option<PathBuf>) -> Result<()> {
    let (config, backend) = super::connect(config_path).await?;
    let mut controller = load_quiz(backend.as_ref(), chapter_id).await?;

    println!(
        "{} ({} question(s))",
        controller.chapter().title,
        controller.question_count()
    );

    let mut learner = StdinLearner::new();
    let outcome = run_quiz(
        &mut controller,
        &mut learner,
        backend.as_ref(),
        &ConsoleObserver,
        &config.run_config(),
    )
    .await?;

    match outcome {
        QuizRunOutcome::Completed { saved, .. } => match saved {
            Ok(receipt) => println!(
                "Progress saved: level {}, {} XP in total, streak {} day(s)",
                receipt.progress.level, receipt.progress.total_xp, receipt.progress.current_streak
            ),
            Err(e) => eprintln!("Warning: progress could not be saved ({e})"),
        },
        QuizRunOutcome::Abandoned { answered } => {
            println!("Quiz abandoned after {answered} question(s). Nothing was saved.");
        }
    }

    Ok(())
}

//! End-to-end quiz, persistence, and import flows against the in-memory store.
//!
//! Quizzes are driven through the real driver with a scripted learner. The
//! tokio clock is paused so result pauses and countdowns elapse instantly.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use exador_core::driver::{
    run_quiz, Learner, LearnerAction, NoopObserver, QuizObserver, QuizRunConfig, QuizRunOutcome,
};
use exador_core::importer::{import_csv, ImportError, NoopImportProgress};
use exador_core::model::{Chapter, Continent};
use exador_core::persistence::PersistStep;
use exador_core::session::{load_quiz, LoadError, QuestionOutcome, QuestionPrompt, QuizSummary};
use exador_core::traits::QuizStore;
use exador_store::memory::{student_profile, InMemoryStore, Operation};

const HEADER: &str = "continent,chapter_code,difficulty,question_text,question_type,explanation,hint_1,hint_2,hint_3,option_a,option_b,option_c,option_d,correct_answer,points_base,competence_code,metadata";

/// facile MCQ (1 pt), moyen MCQ (2 pts), piege free text (8 pts).
const QUIZ_ROWS: [&str; 3] = [
    "arithmia,ARI-01,facile,Combien font 2 + 2 ?,multiple_choice,,Compte sur tes doigts,,,3,4,5,,4,1,CE1-NUM-01,",
    "arithmia,ARI-01,moyen,Combien font 3 x 3 ?,multiple_choice,,,,,6,9,12,,9,2,CE1-NUM-02,",
    "arithmia,ARI-01,piege,Quelle est la capitale de la France ?,free_text,Une ville lumière,Elle commence par P,Elle a une tour célèbre,,,,,,Paris,8,CE1-NUM-03,",
];

fn csv(rows: &[&str]) -> String {
    let mut text = HEADER.to_string();
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text
}

/// Store seeded with the three-question chapter and a signed-in student.
async fn seeded_store() -> (InMemoryStore, Uuid, Uuid) {
    let store = InMemoryStore::new();
    let report = import_csv(&store, &csv(&QUIZ_ROWS), &NoopImportProgress)
        .await
        .unwrap();
    assert_eq!(report.imported, 3);

    let chapter_id = store.find_chapter_by_code("ARI-01").await.unwrap().unwrap();
    let student_id = store.sign_in_as(student_profile("Lina", "lina@example.org"));
    (store, chapter_id, student_id)
}

/// Learner replaying a fixed script, then idling forever.
struct ScriptedLearner {
    actions: VecDeque<LearnerAction>,
}

impl ScriptedLearner {
    fn new(actions: Vec<LearnerAction>) -> Self {
        Self {
            actions: actions.into(),
        }
    }

    fn answering(answers: &[&str]) -> Self {
        Self::new(
            answers
                .iter()
                .flat_map(|a| [LearnerAction::Answer(a.to_string()), LearnerAction::Next])
                .collect(),
        )
    }
}

#[async_trait]
impl Learner for ScriptedLearner {
    async fn next_action(&mut self, _prompt: &QuestionPrompt<'_>) -> LearnerAction {
        match self.actions.pop_front() {
            Some(action) => action,
            None => std::future::pending().await,
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    outcomes: Mutex<Vec<QuestionOutcome>>,
    hints: Mutex<Vec<String>>,
}

impl QuizObserver for RecordingObserver {
    fn on_question(&self, _: &QuestionPrompt<'_>, _: Option<Duration>) {}

    fn on_hint(&self, hint: &str) {
        self.hints.lock().unwrap().push(hint.to_string());
    }

    fn on_result(&self, outcome: &QuestionOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }

    fn on_complete(&self, _: &QuizSummary) {}
}

async fn play(
    store: &InMemoryStore,
    chapter_id: Uuid,
    learner: &mut ScriptedLearner,
    observer: &dyn QuizObserver,
    config: &QuizRunConfig,
) -> QuizRunOutcome {
    let mut controller = load_quiz(store, chapter_id).await.unwrap();
    run_quiz(&mut controller, learner, store, observer, config)
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn all_correct_scores_eleven_points() {
    let (store, chapter_id, student_id) = seeded_store().await;
    let mut learner = ScriptedLearner::answering(&["4", "9", "  paris "]);

    let outcome = play(
        &store,
        chapter_id,
        &mut learner,
        &NoopObserver,
        &QuizRunConfig::default(),
    )
    .await;

    let QuizRunOutcome::Completed { summary, saved } = outcome else {
        panic!("quiz should complete");
    };
    assert_eq!(summary.score, 11);
    assert_eq!(summary.xp_gained, 11);
    assert_eq!(summary.correct, 3);
    assert_eq!(summary.accuracy_percent, 100);
    // Three result pauses of two seconds each.
    assert!(summary.elapsed >= Duration::from_secs(6));

    let receipt = saved.unwrap();
    assert_eq!(receipt.answers_written, 3);

    let sessions = store.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].0, receipt.session_id);
    assert_eq!(sessions[0].1.score, 11);
    assert_eq!(sessions[0].1.student_id, student_id);

    let answers = store.answers();
    assert_eq!(answers.len(), 3);
    assert!(answers.iter().all(|a| a.is_correct));
    let earned: Vec<u32> = answers.iter().map(|a| a.xp_earned).collect();
    assert_eq!(earned, vec![1, 2, 8]);

    let profile = store.profile(student_id).unwrap();
    assert_eq!(profile.xp, 11);
    assert_eq!(profile.total_xp, 11);
    assert_eq!(profile.level, 1);
    assert_eq!(profile.current_streak, 1);
    assert_eq!(profile.best_streak, 1);
    assert!(profile.last_activity.is_some());
}

#[tokio::test(start_paused = true)]
async fn one_wrong_answer_gives_67_percent() {
    let (store, chapter_id, student_id) = seeded_store().await;
    let mut learner = ScriptedLearner::answering(&["4", "12", "Paris"]);

    let QuizRunOutcome::Completed { summary, saved } = play(
        &store,
        chapter_id,
        &mut learner,
        &NoopObserver,
        &QuizRunConfig::default(),
    )
    .await
    else {
        panic!("quiz should complete");
    };

    assert_eq!(summary.score, 9);
    assert_eq!(summary.correct, 2);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.accuracy_percent, 67);
    assert!(saved.is_ok());

    let answers = store.answers();
    assert!(!answers[1].is_correct);
    assert_eq!(answers[1].student_answer, "12");
    assert_eq!(answers[1].xp_earned, 0);
    assert_eq!(store.profile(student_id).unwrap().total_xp, 9);
}

#[tokio::test(start_paused = true)]
async fn hints_reduce_points_and_are_recorded() {
    let (store, chapter_id, _) = seeded_store().await;
    let mut learner = ScriptedLearner::new(vec![
        LearnerAction::Answer("4".into()),
        LearnerAction::RevealHint,
        LearnerAction::Next,
        LearnerAction::Answer("9".into()),
        // No hints on this question: nothing is revealed.
        LearnerAction::RevealHint,
        LearnerAction::Next,
        LearnerAction::RevealHint,
        LearnerAction::RevealHint,
        LearnerAction::RevealHint,
        LearnerAction::Answer("Paris".into()),
        LearnerAction::Next,
    ]);
    let observer = RecordingObserver::default();

    let QuizRunOutcome::Completed { summary, .. } = play(
        &store,
        chapter_id,
        &mut learner,
        &observer,
        &QuizRunConfig::default(),
    )
    .await
    else {
        panic!("quiz should complete");
    };

    // 1 point floor, 2 points, 8 - 2 hints.
    assert_eq!(summary.score, 1 + 2 + 6);
    assert_eq!(
        *observer.hints.lock().unwrap(),
        vec![
            "Compte sur tes doigts".to_string(),
            "Elle commence par P".to_string(),
            "Elle a une tour célèbre".to_string(),
        ]
    );

    let hints_used: Vec<u32> = store.answers().iter().map(|a| a.hints_used).collect();
    assert_eq!(hints_used, vec![1, 0, 2]);
}

#[tokio::test(start_paused = true)]
async fn countdown_submits_the_buffered_answer() {
    let (store, chapter_id, _) = seeded_store().await;
    // Answers the first question, then never acts again.
    let mut learner = ScriptedLearner::new(vec![LearnerAction::Answer("4".into())]);
    let observer = RecordingObserver::default();
    let config = QuizRunConfig {
        result_pause: Duration::from_secs(2),
        default_time_limit: Some(Duration::from_secs(30)),
    };

    let QuizRunOutcome::Completed { summary, saved } =
        play(&store, chapter_id, &mut learner, &observer, &config).await
    else {
        panic!("quiz should complete");
    };

    let outcomes = observer.outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.timed_out));
    assert!(outcomes[0].outcome.correct);
    assert_eq!(outcomes[1].submitted, "");
    assert!(!outcomes[2].outcome.correct);

    assert_eq!(summary.score, 1);
    assert_eq!(summary.correct, 1);
    assert!(summary.elapsed >= Duration::from_secs(3 * 30 + 3 * 2));
    assert!(saved.is_ok());
    // Each question is scored exactly once.
    assert_eq!(store.answers().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn quitting_persists_nothing() {
    let (store, chapter_id, student_id) = seeded_store().await;
    let mut learner = ScriptedLearner::new(vec![
        LearnerAction::Answer("4".into()),
        LearnerAction::Next,
        LearnerAction::Quit,
    ]);

    let outcome = play(
        &store,
        chapter_id,
        &mut learner,
        &NoopObserver,
        &QuizRunConfig::default(),
    )
    .await;

    assert!(matches!(outcome, QuizRunOutcome::Abandoned { answered: 1 }));
    assert!(store.sessions().is_empty());
    assert!(store.answers().is_empty());
    assert_eq!(store.call_count(Operation::FetchProfile), 0);
    assert_eq!(store.profile(student_id).unwrap().total_xp, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_answer_insert_aborts_remaining_steps() {
    let (store, chapter_id, student_id) = seeded_store().await;
    store.fail_nth(Operation::InsertAnswer, 2);
    let mut learner = ScriptedLearner::answering(&["4", "9", "Paris"]);

    let QuizRunOutcome::Completed { summary, saved } = play(
        &store,
        chapter_id,
        &mut learner,
        &NoopObserver,
        &QuizRunConfig::default(),
    )
    .await
    else {
        panic!("quiz should complete");
    };

    // The learner still sees the full result.
    assert_eq!(summary.score, 11);

    let err = saved.unwrap_err();
    assert_eq!(err.step, PersistStep::InsertAnswer { index: 1 });
    assert!(err.to_string().contains("insert answer #2"));

    // Written steps stay written; later ones never ran.
    assert_eq!(store.sessions().len(), 1);
    assert_eq!(store.answers().len(), 1);
    assert_eq!(store.call_count(Operation::InsertAnswer), 2);
    assert_eq!(store.call_count(Operation::UpdateProfile), 0);
    assert_eq!(store.profile(student_id).unwrap().total_xp, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_profile_read_writes_nothing() {
    let (store, chapter_id, _) = seeded_store().await;
    store.fail_always(Operation::FetchProfile);
    let mut learner = ScriptedLearner::answering(&["4", "9", "Paris"]);

    let QuizRunOutcome::Completed { saved, .. } = play(
        &store,
        chapter_id,
        &mut learner,
        &NoopObserver,
        &QuizRunConfig::default(),
    )
    .await
    else {
        panic!("quiz should complete");
    };

    assert_eq!(saved.unwrap_err().step, PersistStep::ReadProfile);
    assert!(store.sessions().is_empty());
    assert_eq!(store.call_count(Operation::InsertSession), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_session_insert_skips_answers_and_profile() {
    let (store, chapter_id, student_id) = seeded_store().await;
    store.fail_always(Operation::InsertSession);
    let mut learner = ScriptedLearner::answering(&["4", "9", "Paris"]);

    let QuizRunOutcome::Completed { summary, saved } = play(
        &store,
        chapter_id,
        &mut learner,
        &NoopObserver,
        &QuizRunConfig::default(),
    )
    .await
    else {
        panic!("quiz should complete");
    };

    assert_eq!(summary.score, 11);
    assert_eq!(saved.unwrap_err().step, PersistStep::InsertSession);
    assert_eq!(store.call_count(Operation::FetchProfile), 1);
    assert_eq!(store.call_count(Operation::InsertSession), 1);
    assert_eq!(store.call_count(Operation::InsertAnswer), 0);
    assert_eq!(store.call_count(Operation::UpdateProfile), 0);
    assert!(store.sessions().is_empty());
    assert!(store.answers().is_empty());
    assert_eq!(store.profile(student_id).unwrap().total_xp, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_profile_update_leaves_records_and_stale_xp() {
    let (store, chapter_id, student_id) = seeded_store().await;
    store.fail_always(Operation::UpdateProfile);
    let mut learner = ScriptedLearner::answering(&["4", "9", "Paris"]);

    let QuizRunOutcome::Completed { saved, .. } = play(
        &store,
        chapter_id,
        &mut learner,
        &NoopObserver,
        &QuizRunConfig::default(),
    )
    .await
    else {
        panic!("quiz should complete");
    };

    assert_eq!(saved.unwrap_err().step, PersistStep::UpdateProfile);
    assert_eq!(store.call_count(Operation::UpdateProfile), 1);

    // Session and answers are written; the profile is not.
    let sessions = store.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].1.score, 11);
    assert_eq!(store.answers().len(), 3);
    let profile = store.profile(student_id).unwrap();
    assert_eq!(profile.total_xp, 0);
    assert_eq!(profile.current_streak, 0);
    assert!(profile.last_activity.is_none());
}

#[tokio::test]
async fn loading_requires_a_signed_in_student() {
    let (store, chapter_id, _) = seeded_store().await;
    store.sign_out();

    let err = load_quiz(&store, chapter_id).await.unwrap_err();
    assert!(matches!(err, LoadError::Unauthenticated));
}

#[tokio::test]
async fn loading_unknown_chapter_fails() {
    let (store, _, _) = seeded_store().await;
    let missing = Uuid::new_v4();

    let err = load_quiz(&store, missing).await.unwrap_err();
    assert!(matches!(err, LoadError::ChapterNotFound(id) if id == missing));
}

#[tokio::test]
async fn loading_chapter_without_questions_fails() {
    let (store, _, _) = seeded_store().await;
    let empty = Chapter {
        id: Uuid::new_v4(),
        code: "ARI-09".into(),
        title: "Chapitre ARI-09".into(),
        description: None,
        continent: Continent::Arithmia,
        level: 1,
        order_index: 1,
        is_active: true,
    };
    let empty_id = empty.id;
    store.add_chapter(empty);

    let err = load_quiz(&store, empty_id).await.unwrap_err();
    assert!(matches!(err, LoadError::NoQuestions(id) if id == empty_id));
}

#[tokio::test]
async fn one_invalid_row_blocks_the_whole_import() {
    let store = InMemoryStore::new();
    let bad = "arithmia,ARI-02,super_hard,Combien font 1 + 1 ?,multiple_choice,,,,,1,2,,,2,1,CE1-NUM-04,";
    let text = csv(&[QUIZ_ROWS[0], bad, QUIZ_ROWS[2]]);

    let err = import_csv(&store, &text, &NoopImportProgress)
        .await
        .unwrap_err();
    let ImportError::Validation(errors) = err else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].row, 2);
    assert_eq!(errors[0].field, "difficulty");

    assert!(store.questions().is_empty());
    assert!(store.chapters().is_empty());
    assert_eq!(store.call_count(Operation::InsertQuestion), 0);
}

#[tokio::test]
async fn row_failures_do_not_stop_the_import() {
    let store = InMemoryStore::new();
    store.fail_nth(Operation::InsertQuestion, 2);

    let report = import_csv(&store, &csv(&QUIZ_ROWS), &NoopImportProgress)
        .await
        .unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.imported, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].row, 2);
    assert_eq!(report.chapters_created, 1);

    let chapters = store.list_chapters(Continent::Arithmia).await.unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].question_count, 2);
    assert_eq!(chapters[0].chapter.title, "Chapitre ARI-01");
    assert_eq!(chapters[0].chapter.level, 1);
}

#[tokio::test]
async fn reimport_reuses_existing_chapters() {
    let store = InMemoryStore::new();
    import_csv(&store, &csv(&QUIZ_ROWS), &NoopImportProgress)
        .await
        .unwrap();
    let again = import_csv(&store, &csv(&QUIZ_ROWS), &NoopImportProgress)
        .await
        .unwrap();

    assert_eq!(again.chapters_created, 0);
    assert_eq!(store.chapters().len(), 1);
    assert_eq!(store.questions().len(), 6);
    // One lookup per run: the rest hit the per-run cache.
    assert_eq!(store.call_count(Operation::FindChapterByCode), 2);
}

#[tokio::test]
async fn invalid_metadata_fails_only_its_row() {
    let store = InMemoryStore::new();
    let bad_metadata = "arithmia,ARI-01,facile,Combien font 1 + 1 ?,multiple_choice,,,,,1,2,,,2,1,CE1-NUM-04,{bad";
    let text = csv(&[QUIZ_ROWS[0], bad_metadata]);

    let report = import_csv(&store, &text, &NoopImportProgress)
        .await
        .unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.imported, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].row, 2);
    assert!(report.failures[0].message.contains("invalid metadata JSON"));

    assert_eq!(store.questions().len(), 1);
    assert_eq!(store.call_count(Operation::InsertQuestion), 1);
}

//! In-memory store.
//!
//! Backs offline play and every flow test. Failures can be injected per
//! operation to exercise the abort and per-row error paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use exador_core::error::StoreError;
use exador_core::model::{
    Chapter, ChapterSummary, Continent, Identity, NewChapter, NewOption, NewQuestion, Profile,
    ProfileProgress, Question, QuestionOption, QuizSessionRecord, Role, StudentAnswerRecord,
};
use exador_core::traits::{IdentityProvider, QuizStore};

/// Store operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CurrentIdentity,
    FetchChapter,
    FetchQuestions,
    ListChapters,
    FetchProfile,
    ListStudents,
    InsertSession,
    InsertAnswer,
    UpdateProfile,
    FindChapterByCode,
    InsertChapter,
    InsertQuestion,
    InsertOption,
}

#[derive(Debug, Default)]
struct Tables {
    chapters: Vec<Chapter>,
    questions: Vec<Question>,
    profiles: Vec<Profile>,
    sessions: Vec<(Uuid, QuizSessionRecord)>,
    answers: Vec<StudentAnswerRecord>,
}

#[derive(Debug, Default)]
struct Calls {
    counts: HashMap<Operation, u32>,
    /// Operation -> 1-based call numbers that fail.
    failures: HashMap<Operation, Vec<u32>>,
    always_fail: Vec<Operation>,
}

/// A store holding every table in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    identity: Mutex<Option<Identity>>,
    calls: Mutex<Calls>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A fresh student profile at level 1 with no XP.
pub fn student_profile(name: &str, email: &str) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: name.to_string(),
        role: Role::Student,
        level: 1,
        xp: 0,
        total_xp: 0,
        current_streak: 0,
        best_streak: 0,
        last_activity: None,
        created_at: Utc::now(),
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a profile and sign it in.
    pub fn sign_in_as(&self, profile: Profile) -> Uuid {
        let id = profile.id;
        *lock(&self.identity) = Some(Identity {
            user_id: id,
            email: Some(profile.email.clone()),
        });
        self.add_profile(profile);
        id
    }

    pub fn sign_out(&self) {
        *lock(&self.identity) = None;
    }

    pub fn add_profile(&self, profile: Profile) {
        let mut tables = lock(&self.tables);
        tables.profiles.retain(|p| p.id != profile.id);
        tables.profiles.push(profile);
    }

    pub fn add_chapter(&self, chapter: Chapter) {
        lock(&self.tables).chapters.push(chapter);
    }

    pub fn add_question(&self, question: Question) {
        lock(&self.tables).questions.push(question);
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        lock(&self.tables)
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn chapters(&self) -> Vec<Chapter> {
        lock(&self.tables).chapters.clone()
    }

    pub fn questions(&self) -> Vec<Question> {
        lock(&self.tables).questions.clone()
    }

    pub fn sessions(&self) -> Vec<(Uuid, QuizSessionRecord)> {
        lock(&self.tables).sessions.clone()
    }

    pub fn answers(&self) -> Vec<StudentAnswerRecord> {
        lock(&self.tables).answers.clone()
    }

    /// Make the `nth` (1-based) call of `op` fail.
    pub fn fail_nth(&self, op: Operation, nth: u32) {
        lock(&self.calls).failures.entry(op).or_default().push(nth);
    }

    /// Make every call of `op` fail.
    pub fn fail_always(&self, op: Operation) {
        lock(&self.calls).always_fail.push(op);
    }

    /// Number of calls made to `op`, failed ones included.
    pub fn call_count(&self, op: Operation) -> u32 {
        lock(&self.calls).counts.get(&op).copied().unwrap_or(0)
    }

    fn record(&self, op: Operation) -> Result<(), StoreError> {
        let mut calls = lock(&self.calls);
        let n = {
            let count = calls.counts.entry(op).or_insert(0);
            *count += 1;
            *count
        };
        let fails = calls.always_fail.contains(&op)
            || calls.failures.get(&op).is_some_and(|f| f.contains(&n));
        if fails {
            Err(StoreError::Injected(format!("{op:?} call #{n}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QuizStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_chapter(&self, chapter_id: Uuid) -> anyhow::Result<Option<Chapter>> {
        self.record(Operation::FetchChapter)?;
        Ok(lock(&self.tables)
            .chapters
            .iter()
            .find(|c| c.id == chapter_id)
            .cloned())
    }

    async fn fetch_questions(&self, chapter_id: Uuid) -> anyhow::Result<Vec<Question>> {
        self.record(Operation::FetchQuestions)?;
        let mut questions: Vec<Question> = lock(&self.tables)
            .questions
            .iter()
            .filter(|q| q.chapter_id == chapter_id && q.is_active)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.created_at);
        for q in &mut questions {
            q.options.sort_by_key(|o| o.order_index);
        }
        Ok(questions)
    }

    async fn list_chapters(&self, continent: Continent) -> anyhow::Result<Vec<ChapterSummary>> {
        self.record(Operation::ListChapters)?;
        let tables = lock(&self.tables);
        let mut chapters: Vec<ChapterSummary> = tables
            .chapters
            .iter()
            .filter(|c| c.continent == continent && c.is_active)
            .map(|c| ChapterSummary {
                chapter: c.clone(),
                question_count: tables
                    .questions
                    .iter()
                    .filter(|q| q.chapter_id == c.id && q.is_active)
                    .count(),
            })
            .collect();
        chapters.sort_by_key(|s| s.chapter.order_index);
        Ok(chapters)
    }

    async fn fetch_profile(&self, user_id: Uuid) -> anyhow::Result<Profile> {
        self.record(Operation::FetchProfile)?;
        self.profile(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {user_id}")).into())
    }

    async fn list_students(&self) -> anyhow::Result<Vec<Profile>> {
        self.record(Operation::ListStudents)?;
        let mut students: Vec<Profile> = lock(&self.tables)
            .profiles
            .iter()
            .filter(|p| p.role == Role::Student)
            .cloned()
            .collect();
        students.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(students)
    }

    async fn insert_session(&self, record: &QuizSessionRecord) -> anyhow::Result<Uuid> {
        self.record(Operation::InsertSession)?;
        let id = Uuid::new_v4();
        lock(&self.tables).sessions.push((id, record.clone()));
        Ok(id)
    }

    async fn insert_answer(&self, record: &StudentAnswerRecord) -> anyhow::Result<()> {
        self.record(Operation::InsertAnswer)?;
        lock(&self.tables).answers.push(record.clone());
        Ok(())
    }

    async fn update_profile_progress(
        &self,
        user_id: Uuid,
        progress: &ProfileProgress,
    ) -> anyhow::Result<()> {
        self.record(Operation::UpdateProfile)?;
        let mut tables = lock(&self.tables);
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {user_id}")))?;
        profile.xp = progress.xp;
        profile.total_xp = progress.total_xp;
        profile.level = progress.level;
        profile.current_streak = progress.current_streak;
        profile.best_streak = progress.best_streak;
        profile.last_activity = Some(progress.last_activity);
        Ok(())
    }

    async fn find_chapter_by_code(&self, code: &str) -> anyhow::Result<Option<Uuid>> {
        self.record(Operation::FindChapterByCode)?;
        Ok(lock(&self.tables)
            .chapters
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.id))
    }

    async fn insert_chapter(&self, chapter: &NewChapter) -> anyhow::Result<Uuid> {
        self.record(Operation::InsertChapter)?;
        let mut tables = lock(&self.tables);
        let order_index = tables
            .chapters
            .iter()
            .filter(|c| c.continent == chapter.continent)
            .count() as u32;
        let id = Uuid::new_v4();
        tables.chapters.push(Chapter {
            id,
            code: chapter.code.clone(),
            title: chapter.title.clone(),
            description: chapter.description.clone(),
            continent: chapter.continent,
            level: chapter.level,
            order_index,
            is_active: true,
        });
        Ok(id)
    }

    async fn insert_question(&self, question: &NewQuestion) -> anyhow::Result<Uuid> {
        self.record(Operation::InsertQuestion)?;
        let id = Uuid::new_v4();
        lock(&self.tables).questions.push(Question {
            id,
            chapter_id: question.chapter_id,
            question_text: question.question_text.clone(),
            question_type: question.question_type,
            difficulty: question.difficulty,
            points_base: Some(question.points_base),
            explanation: question.explanation.clone(),
            accepted_answer: question.accepted_answer.clone(),
            hints: question.hints.clone(),
            time_limit: None,
            tags: vec![],
            metadata: question.metadata.clone(),
            is_active: true,
            options: vec![],
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn insert_option(&self, option: &NewOption) -> anyhow::Result<()> {
        self.record(Operation::InsertOption)?;
        let mut tables = lock(&self.tables);
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == option.question_id)
            .ok_or_else(|| StoreError::NotFound(format!("question {}", option.question_id)))?;
        question.options.push(QuestionOption {
            id: Uuid::new_v4(),
            question_id: option.question_id,
            option_text: option.option_text.clone(),
            is_correct: option.is_correct,
            order_index: option.order_index,
        });
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryStore {
    async fn current_identity(&self) -> anyhow::Result<Option<Identity>> {
        self.record(Operation::CurrentIdentity)?;
        Ok(lock(&self.identity).clone())
    }
}

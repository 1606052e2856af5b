//! Data-access trait definitions.
//!
//! Everything the quiz flow, the persistence adapter, and the importer need
//! from the hosted backend goes through these traits. The `exador-store`
//! crate provides a REST implementation and an in-memory one.

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{
    Chapter, ChapterSummary, Continent, Identity, NewChapter, NewOption, NewQuestion, Profile,
    ProfileProgress, Question, QuizSessionRecord, StudentAnswerRecord,
};

// ---------------------------------------------------------------------------
// Row store
// ---------------------------------------------------------------------------

/// Row-oriented access to chapters, questions, profiles, and session records.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Human-readable backend name (e.g. "rest").
    fn name(&self) -> &str;

    /// Fetch a chapter by id. `Ok(None)` when it does not exist.
    async fn fetch_chapter(&self, chapter_id: Uuid) -> anyhow::Result<Option<Chapter>>;

    /// Active questions of a chapter, ordered by creation, options ordered by index.
    async fn fetch_questions(&self, chapter_id: Uuid) -> anyhow::Result<Vec<Question>>;

    /// Active chapters of a continent ordered by `order_index`.
    async fn list_chapters(&self, continent: Continent) -> anyhow::Result<Vec<ChapterSummary>>;

    /// Fetch a profile by user id.
    async fn fetch_profile(&self, user_id: Uuid) -> anyhow::Result<Profile>;

    /// All student profiles, newest first.
    async fn list_students(&self) -> anyhow::Result<Vec<Profile>>;

    /// Insert a quiz session and return its generated id.
    async fn insert_session(&self, record: &QuizSessionRecord) -> anyhow::Result<Uuid>;

    /// Insert one answer record.
    async fn insert_answer(&self, record: &StudentAnswerRecord) -> anyhow::Result<()>;

    /// Overwrite the XP, level, streak, and activity fields of a profile.
    async fn update_profile_progress(
        &self,
        user_id: Uuid,
        progress: &ProfileProgress,
    ) -> anyhow::Result<()>;

    /// Look up a chapter id by its import code.
    async fn find_chapter_by_code(&self, code: &str) -> anyhow::Result<Option<Uuid>>;

    /// Insert a chapter and return its generated id.
    async fn insert_chapter(&self, chapter: &NewChapter) -> anyhow::Result<Uuid>;

    /// Insert a question and return its generated id.
    async fn insert_question(&self, question: &NewQuestion) -> anyhow::Result<Uuid>;

    /// Insert one question option.
    async fn insert_option(&self, option: &NewOption) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

/// Source of the currently authenticated identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in identity, or `None` when nobody is signed in.
    async fn current_identity(&self) -> anyhow::Result<Option<Identity>>;
}

/// A full backend: row store plus identity provider.
pub trait Backend: QuizStore + IdentityProvider {}

impl<T: QuizStore + IdentityProvider> Backend for T {}

//! Session persistence adapter.
//!
//! Writes a completed attempt as an ordered sequence of steps. The first
//! failing step aborts the rest; steps already written stay written. In
//! particular a session row can exist with some answers missing, and the
//! profile XP can stay stale after the session row was created.
//!
//! The XP update is a client-side read-modify-write: two attempts finishing
//! at the same time for the same student can lose one of the gains.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{ProfileProgress, QuizSessionRecord, SessionStatus, StudentAnswerRecord};
use crate::progress::{level_for_xp, next_streak};
use crate::scoring::score_answer;
use crate::session::CompletedQuiz;
use crate::traits::QuizStore;

/// One step of the persistence sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStep {
    ReadProfile,
    InsertSession,
    InsertAnswer { index: usize },
    UpdateProfile,
}

impl fmt::Display for PersistStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistStep::ReadProfile => write!(f, "read profile"),
            PersistStep::InsertSession => write!(f, "insert session"),
            PersistStep::InsertAnswer { index } => write!(f, "insert answer #{}", index + 1),
            PersistStep::UpdateProfile => write!(f, "update profile"),
        }
    }
}

/// A failed persistence step. Later steps were not attempted.
#[derive(Debug, Error)]
#[error("{step} failed: {cause:#}")]
pub struct PersistError {
    pub step: PersistStep,
    pub cause: anyhow::Error,
}

/// What was written for a completed attempt.
#[derive(Debug, Clone)]
pub struct SessionReceipt {
    pub session_id: Uuid,
    pub answers_written: usize,
    pub progress: ProfileProgress,
}

/// Persist a completed attempt, stamped with the current time.
pub async fn record_session<S>(
    store: &S,
    completed: &CompletedQuiz,
) -> Result<SessionReceipt, PersistError>
where
    S: QuizStore + ?Sized,
{
    record_session_at(store, completed, Utc::now()).await
}

/// Persist a completed attempt as of `now`.
pub async fn record_session_at<S>(
    store: &S,
    completed: &CompletedQuiz,
    now: DateTime<Utc>,
) -> Result<SessionReceipt, PersistError>
where
    S: QuizStore + ?Sized,
{
    let fail = |step: PersistStep| {
        move |cause: anyhow::Error| {
            tracing::error!(%step, student = %completed.student_id, "persistence aborted: {cause:#}");
            PersistError { step, cause }
        }
    };

    // 1. Current XP
    let profile = store
        .fetch_profile(completed.student_id)
        .await
        .map_err(fail(PersistStep::ReadProfile))?;

    // 2. Session row
    let gained = completed.totals.xp_gained;
    let session = QuizSessionRecord {
        student_id: completed.student_id,
        chapter_id: completed.chapter_id,
        status: SessionStatus::Completed,
        score: completed.totals.score,
        xp_gained: gained,
        time_spent: completed.elapsed.as_millis() as u64,
        completed_at: now,
    };
    let session_id = store
        .insert_session(&session)
        .await
        .map_err(fail(PersistStep::InsertSession))?;

    // 3. One answer row per question, rescored for storage
    for (index, answered) in completed.answers.iter().enumerate() {
        let outcome = score_answer(&answered.question, &answered.submitted, answered.hints_used);
        let record = StudentAnswerRecord {
            session_id,
            question_id: answered.question.id,
            student_answer: answered.submitted.clone(),
            is_correct: outcome.correct,
            hints_used: answered.hints_used,
            xp_earned: outcome.points,
        };
        store
            .insert_answer(&record)
            .await
            .map_err(fail(PersistStep::InsertAnswer { index }))?;
    }

    // 4. Overwrite the profile with client-computed totals
    let total_xp = profile.total_xp + u64::from(gained);
    let current_streak = next_streak(profile.last_activity, profile.current_streak, now);
    let progress = ProfileProgress {
        xp: profile.xp + u64::from(gained),
        total_xp,
        level: level_for_xp(total_xp).level,
        current_streak,
        best_streak: profile.best_streak.max(current_streak),
        last_activity: now,
    };
    store
        .update_profile_progress(completed.student_id, &progress)
        .await
        .map_err(fail(PersistStep::UpdateProfile))?;

    tracing::info!(
        %session_id,
        student = %completed.student_id,
        xp_gained = gained,
        total_xp,
        "quiz session saved"
    );

    Ok(SessionReceipt {
        session_id,
        answers_written: completed.answers.len(),
        progress,
    })
}

//! Core data model types for Exador Math.
//!
//! These mirror the rows held by the hosted backend: chapters grouped by
//! continent, questions with their options, learner profiles, and the
//! session/answer records written when a quiz completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Difficulty tag of a question. Drives the default point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Facile,
    Moyen,
    Difficile,
    /// Also accepted as `tres_difficile`, the spelling used by CSV imports.
    #[serde(alias = "tres_difficile")]
    Expert,
    Piege,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Facile,
        Difficulty::Moyen,
        Difficulty::Difficile,
        Difficulty::Expert,
        Difficulty::Piege,
    ];

    /// Points awarded for a correct answer when the question has no explicit value.
    pub fn default_points(self) -> u32 {
        match self {
            Difficulty::Facile => 1,
            Difficulty::Moyen => 2,
            Difficulty::Difficile => 3,
            Difficulty::Expert => 5,
            Difficulty::Piege => 8,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Facile => "Facile",
            Difficulty::Moyen => "Moyen",
            Difficulty::Difficile => "Difficile",
            Difficulty::Expert => "Expert",
            Difficulty::Piege => "Piège",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Facile => write!(f, "facile"),
            Difficulty::Moyen => write!(f, "moyen"),
            Difficulty::Difficile => write!(f, "difficile"),
            Difficulty::Expert => write!(f, "expert"),
            Difficulty::Piege => write!(f, "piege"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "facile" => Ok(Difficulty::Facile),
            "moyen" => Ok(Difficulty::Moyen),
            "difficile" => Ok(Difficulty::Difficile),
            "expert" | "tres_difficile" => Ok(Difficulty::Expert),
            "piege" => Ok(Difficulty::Piege),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    FreeText,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::FreeText => write!(f, "free_text"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "free_text" => Ok(QuestionType::FreeText),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Top-level thematic category grouping chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Continent {
    Arithmia,
    Algebria,
    Geometria,
    Analysia,
    Probabilia,
}

impl Continent {
    pub const ALL: [Continent; 5] = [
        Continent::Arithmia,
        Continent::Algebria,
        Continent::Geometria,
        Continent::Analysia,
        Continent::Probabilia,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Continent::Arithmia => "Arithmia",
            Continent::Algebria => "Algebria",
            Continent::Geometria => "Geometria",
            Continent::Analysia => "Analysia",
            Continent::Probabilia => "Probabilia",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Continent::Arithmia => "Le continent des nombres et opérations",
            Continent::Algebria => "Le royaume des équations et expressions",
            Continent::Geometria => "Le monde des formes et mesures",
            Continent::Analysia => "Le territoire des fonctions",
            Continent::Probabilia => "L'univers du hasard et des statistiques",
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name().to_lowercase())
    }
}

impl FromStr for Continent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Continent::ALL
            .into_iter()
            .find(|c| c.to_string() == s)
            .ok_or_else(|| format!("unknown continent: {s}"))
    }
}

/// A single answer choice of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub option_text: String,
    pub is_correct: bool,
    pub order_index: u32,
}

/// A quiz question together with its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    /// Explicit point value; `None` (or 0) falls back to the difficulty table.
    #[serde(default)]
    pub points_base: Option<u32>,
    /// Explanation shown to the learner after answering.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Accepted answer for free-text questions.
    #[serde(default)]
    pub accepted_answer: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    /// Countdown in seconds.
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Options ordered by `order_index`. Empty for free-text questions.
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    pub created_at: DateTime<Utc>,
}

/// An ordered unit of questions within a continent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: Uuid,
    /// Import key (`chapter_code` column).
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub continent: Continent,
    /// School level derived from the competence code.
    pub level: u32,
    pub order_index: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A chapter listing entry with its active question count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub chapter: Chapter,
    pub question_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Coach,
}

/// A learner or coach profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub level: u32,
    /// Current-period XP.
    pub xp: u64,
    /// Lifetime XP.
    pub total_xp: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields overwritten at the end of a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileProgress {
    pub xp: u64,
    pub total_xp: u64,
    pub level: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_activity: DateTime<Utc>,
}

/// An authenticated identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

/// One completed quiz attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSessionRecord {
    pub student_id: Uuid,
    pub chapter_id: Uuid,
    pub status: SessionStatus,
    pub score: u32,
    pub xp_gained: u32,
    /// Elapsed time in milliseconds.
    pub time_spent: u64,
    pub completed_at: DateTime<Utc>,
}

/// One answer within a stored quiz session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAnswerRecord {
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub student_answer: String,
    pub is_correct: bool,
    pub hints_used: u32,
    pub xp_earned: u32,
}

/// Chapter row created by the importer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChapter {
    pub code: String,
    pub title: String,
    pub continent: Continent,
    pub description: Option<String>,
    pub level: u32,
}

/// Question row created by the importer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub chapter_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub points_base: u32,
    pub explanation: Option<String>,
    pub accepted_answer: Option<String>,
    pub hints: Vec<String>,
    pub metadata: serde_json::Value,
}

/// Option row created by the importer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOption {
    pub question_id: Uuid,
    pub option_text: String,
    pub is_correct: bool,
    pub order_index: u32,
}

fn default_true() -> bool {
    true
}

//! Per-question scoring.
//!
//! A correct answer earns the question's base points minus one point per
//! revealed hint, never less than one point. A wrong answer earns nothing.

use serde::{Deserialize, Serialize};

use crate::model::{Question, QuestionType};

/// The result of scoring one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    /// Whether the submission matched the canonical answer.
    pub correct: bool,
    /// Points awarded.
    pub points: u32,
    /// The answer the submission was compared against.
    pub canonical: String,
}

/// The answer a submission must match.
///
/// Multiple choice: text of the first option flagged correct, or `""` when
/// none is. Free text: the accepted answer, falling back to the explanation
/// for questions authored before the accepted-answer field existed.
pub fn canonical_answer(question: &Question) -> String {
    match question.question_type {
        QuestionType::MultipleChoice => question
            .options
            .iter()
            .find(|o| o.is_correct)
            .map(|o| o.option_text.clone())
            .unwrap_or_default(),
        QuestionType::FreeText => match (&question.accepted_answer, &question.explanation) {
            (Some(accepted), _) => accepted.clone(),
            (None, Some(explanation)) => {
                tracing::warn!(
                    question_id = %question.id,
                    "free-text question has no accepted answer, comparing against explanation"
                );
                explanation.clone()
            }
            (None, None) => String::new(),
        },
    }
}

/// Compare a submission against the canonical answer for the question type.
pub fn answers_match(question_type: QuestionType, submitted: &str, canonical: &str) -> bool {
    match question_type {
        QuestionType::MultipleChoice => submitted == canonical,
        QuestionType::FreeText => submitted.trim().to_lowercase() == canonical.trim().to_lowercase(),
    }
}

/// Points for a correct answer before the hint penalty.
pub fn base_points(question: &Question) -> u32 {
    match question.points_base {
        Some(points) if points > 0 => points,
        _ => question.difficulty.default_points(),
    }
}

/// Score one submission.
///
/// Never fails: a question with no usable canonical answer scores 0.
pub fn score_answer(question: &Question, submitted: &str, hints_used: u32) -> AnswerOutcome {
    let canonical = canonical_answer(question);
    // An empty canonical answer marks a malformed question; nothing matches it.
    let correct = !canonical.trim().is_empty()
        && answers_match(question.question_type, submitted, &canonical);
    let points = if correct {
        base_points(question).saturating_sub(hints_used).max(1)
    } else {
        0
    };

    tracing::debug!(
        question_id = %question.id,
        correct,
        hints_used,
        points,
        "scored answer"
    );

    AnswerOutcome {
        correct,
        points,
        canonical,
    }
}

/// Points awarded for one submission.
pub fn question_score(question: &Question, submitted: &str, hints_used: u32) -> u32 {
    score_answer(question, submitted, hints_used).points
}

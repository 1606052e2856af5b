//! Levels, streaks, and dashboard aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Profile, Role};

/// A rung of the level ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    pub name: &'static str,
    pub xp_required: u64,
}

/// Level ladder ordered by XP threshold.
pub const LEVELS: [LevelInfo; 10] = [
    LevelInfo {
        level: 1,
        name: "Apprenti Explorateur",
        xp_required: 0,
    },
    LevelInfo {
        level: 2,
        name: "Novice Aventurier",
        xp_required: 100,
    },
    LevelInfo {
        level: 3,
        name: "Chercheur Curieux",
        xp_required: 250,
    },
    LevelInfo {
        level: 4,
        name: "Découvreur Audacieux",
        xp_required: 500,
    },
    LevelInfo {
        level: 5,
        name: "Explorateur Sage",
        xp_required: 1000,
    },
    LevelInfo {
        level: 6,
        name: "Maître Navigateur",
        xp_required: 2000,
    },
    LevelInfo {
        level: 7,
        name: "Champion des Continents",
        xp_required: 4000,
    },
    LevelInfo {
        level: 8,
        name: "Légende d'Exador",
        xp_required: 8000,
    },
    LevelInfo {
        level: 9,
        name: "Gardien des Mystères",
        xp_required: 15000,
    },
    LevelInfo {
        level: 10,
        name: "Maître Suprême",
        xp_required: 25000,
    },
];

/// Highest level whose threshold `total_xp` reaches.
pub fn level_for_xp(total_xp: u64) -> LevelInfo {
    LEVELS
        .iter()
        .rev()
        .find(|l| total_xp >= l.xp_required)
        .copied()
        .unwrap_or(LEVELS[0])
}

/// Streak after recording activity at `now`.
///
/// Activity on the same calendar day keeps the streak, the day after extends
/// it, anything else starts over at 1.
pub fn next_streak(last_activity: Option<DateTime<Utc>>, current: u32, now: DateTime<Utc>) -> u32 {
    match last_activity.map(|t| (now.date_naive() - t.date_naive()).num_days()) {
        Some(0) => current.max(1),
        Some(1) => current + 1,
        _ => 1,
    }
}

/// A student's dashboard figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProgress {
    pub level: u32,
    pub level_name: String,
    pub xp: u64,
    pub total_xp: u64,
    /// XP target of the current level bar.
    pub xp_for_next_level: u64,
    /// Fill of the level bar, capped at 100.
    pub progress_percent: f64,
    pub current_streak: u32,
    pub best_streak: u32,
}

impl StudentProgress {
    pub fn from_profile(profile: &Profile) -> Self {
        let level = profile.level.max(1);
        let xp_for_next_level = u64::from(level) * 100;
        let progress_percent = (profile.xp as f64 / xp_for_next_level as f64 * 100.0).min(100.0);
        let level_name = LEVELS
            .iter()
            .find(|l| l.level == level)
            .map(|l| l.name)
            .unwrap_or(LEVELS[LEVELS.len() - 1].name);

        Self {
            level,
            level_name: level_name.to_string(),
            xp: profile.xp,
            total_xp: profile.total_xp,
            xp_for_next_level,
            progress_percent,
            current_streak: profile.current_streak,
            best_streak: profile.best_streak,
        }
    }
}

/// Coach view over all students.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoachOverview {
    pub total_students: usize,
    /// Students with any recorded activity.
    pub active_students: usize,
    /// Rounded mean level, 0 without students.
    pub average_level: u32,
    pub total_xp: u64,
}

/// Aggregate student profiles. Coach profiles in the input are skipped.
pub fn coach_overview(profiles: &[Profile]) -> CoachOverview {
    let students: Vec<&Profile> = profiles.iter().filter(|p| p.role == Role::Student).collect();
    let total_students = students.len();
    if total_students == 0 {
        return CoachOverview::default();
    }

    let level_sum: u64 = students.iter().map(|s| u64::from(s.level.max(1))).sum();
    CoachOverview {
        total_students,
        active_students: students.iter().filter(|s| s.last_activity.is_some()).count(),
        average_level: (level_sum as f64 / total_students as f64).round() as u32,
        total_xp: students.iter().map(|s| s.total_xp).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn profile(level: u32, xp: u64, total_xp: u64, active: bool) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "eleve@example.org".into(),
            name: "Eleve".into(),
            role: Role::Student,
            level,
            xp,
            total_xp,
            current_streak: 0,
            best_streak: 0,
            last_activity: active.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level_for_xp(0).level, 1);
        assert_eq!(level_for_xp(99).level, 1);
        assert_eq!(level_for_xp(100).level, 2);
        assert_eq!(level_for_xp(999).level, 4);
        assert_eq!(level_for_xp(25_000).level, 10);
        assert_eq!(level_for_xp(1_000_000).name, "Maître Suprême");
    }

    #[test]
    fn streak_rules() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(next_streak(None, 0, now), 1);
        assert_eq!(next_streak(Some(now - Duration::hours(2)), 3, now), 3);
        assert_eq!(next_streak(Some(now - Duration::hours(2)), 0, now), 1);
        assert_eq!(next_streak(Some(now - Duration::days(1)), 3, now), 4);
        assert_eq!(next_streak(Some(now - Duration::days(3)), 3, now), 1);
    }

    #[test]
    fn student_progress_bar() {
        let p = StudentProgress::from_profile(&profile(2, 50, 150, true));
        assert_eq!(p.xp_for_next_level, 200);
        assert!((p.progress_percent - 25.0).abs() < f64::EPSILON);
        assert_eq!(p.level_name, "Novice Aventurier");

        let capped = StudentProgress::from_profile(&profile(1, 500, 500, true));
        assert!((capped.progress_percent - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coach_overview_aggregates_students() {
        let mut coach = profile(9, 0, 0, true);
        coach.role = Role::Coach;
        let profiles = vec![
            profile(1, 10, 10, true),
            profile(2, 0, 120, false),
            profile(4, 0, 600, true),
            coach,
        ];
        let overview = coach_overview(&profiles);
        assert_eq!(overview.total_students, 3);
        assert_eq!(overview.active_students, 2);
        assert_eq!(overview.average_level, 2);
        assert_eq!(overview.total_xp, 730);
    }

    #[test]
    fn coach_overview_empty() {
        assert_eq!(coach_overview(&[]), CoachOverview::default());
    }
}

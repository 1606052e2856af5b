//! The `exador coach` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use exador_core::model::Role;
use exador_core::progress::coach_overview;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let (_, backend) = super::connect(config_path).await?;
    let Some(identity) = backend.current_identity().await? else {
        anyhow::bail!("not signed in: set access_token in exador.toml or EXADOR_ACCESS_TOKEN");
    };
    let profile = backend.fetch_profile(identity.user_id).await?;
    if profile.role != Role::Coach {
        anyhow::bail!("the coach view is reserved to coach accounts");
    }

    let students = backend.list_students().await?;
    let overview = coach_overview(&students);

    println!(
        "{} student(s), {} active, average level {}, {} XP earned in total",
        overview.total_students, overview.active_students, overview.average_level, overview.total_xp
    );
    if students.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Email", "Level", "Total XP", "Streak", "Last activity"]);
    for s in &students {
        table.add_row(vec![
            Cell::new(&s.name),
            Cell::new(&s.email),
            Cell::new(s.level),
            Cell::new(s.total_xp),
            Cell::new(s.current_streak),
            Cell::new(
                s.last_activity
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "never".to_string()),
            ),
        ]);
    }
    println!("{table}");

    Ok(())
}

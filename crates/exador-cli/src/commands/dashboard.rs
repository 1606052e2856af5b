//! The `exador dashboard` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use exador_core::progress::{level_for_xp, StudentProgress, LEVELS};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let (_, backend) = super::connect(config_path).await?;
    let Some(identity) = backend.current_identity().await? else {
        anyhow::bail!("not signed in: set access_token in exador.toml or EXADOR_ACCESS_TOKEN");
    };
    let profile = backend.fetch_profile(identity.user_id).await?;
    let progress = StudentProgress::from_profile(&profile);

    println!("Bonjour {} !", profile.name);

    let mut table = Table::new();
    table.set_header(vec!["Level", "XP", "Total XP", "Streak", "Best streak"]);
    table.add_row(vec![
        format!("{} ({})", progress.level, progress.level_name),
        format!("{}/{}", progress.xp, progress.xp_for_next_level),
        progress.total_xp.to_string(),
        format!("{} day(s)", progress.current_streak),
        format!("{} day(s)", progress.best_streak),
    ]);
    println!("{table}");

    println!("Level progress: {:.0}%", progress.progress_percent);
    let current = level_for_xp(progress.total_xp);
    if let Some(next) = LEVELS.iter().find(|l| l.level == current.level + 1) {
        println!(
            "{} XP to reach {} (level {})",
            next.xp_required - progress.total_xp,
            next.name,
            next.level
        );
    }

    Ok(())
}

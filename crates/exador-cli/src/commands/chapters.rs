//! The `exador chapters` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use exador_core::model::Continent;

pub async fn execute(continent: Continent, config_path: Option<PathBuf>) -> Result<()> {
    let (_, backend) = super::connect(config_path).await?;
    let chapters = backend.list_chapters(continent).await?;

    println!("{}: {}", continent.name(), continent.description());
    if chapters.is_empty() {
        println!("No chapters yet. Import questions with `exador import --csv <file>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Code", "Title", "Level", "Questions", "Id"]);
    for (i, summary) in chapters.iter().enumerate() {
        let chapter = &summary.chapter;
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&chapter.code),
            Cell::new(&chapter.title),
            Cell::new(format!("CE{}", chapter.level)),
            Cell::new(summary.question_count),
            Cell::new(chapter.id),
        ]);
    }
    println!("{table}");

    Ok(())
}

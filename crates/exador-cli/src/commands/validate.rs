//! The `exador validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use exador_core::importer::{parse_csv, validate_table};

pub fn execute(csv_path: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;

    let table = parse_csv(&text)?;
    let errors = validate_table(&table);

    println!("{}: {} data row(s)", csv_path.display(), table.rows.len());
    for e in &errors {
        println!("  row {} [{}]: {}", e.row, e.field, e.message);
    }

    if errors.is_empty() {
        println!("All rows valid.");
        Ok(())
    } else {
        anyhow::bail!("{} validation error(s) found", errors.len())
    }
}

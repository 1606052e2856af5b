//! The `exador import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

use exador_core::importer::{import_csv, ImportError, ImportProgress};

/// Console progress reporter.
struct ConsoleImportProgress;

impl ImportProgress for ConsoleImportProgress {
    fn on_row_imported(&self, row: usize, total: usize, question_id: Uuid) {
        eprintln!("  [{row}/{total}] imported question {question_id}");
    }

    fn on_row_failed(&self, row: usize, total: usize, error: &anyhow::Error) {
        eprintln!("  [{row}/{total}] FAILED: {error:#}");
    }
}

pub async fn execute(csv_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let text = std::fs::read_to_string(&csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;
    let (_, backend) = super::connect(config_path).await?;

    let report = match import_csv(backend.as_ref(), &text, &ConsoleImportProgress).await {
        Ok(report) => report,
        Err(ImportError::Validation(errors)) => {
            for e in &errors {
                println!("  row {} [{}]: {}", e.row, e.field, e.message);
            }
            anyhow::bail!("{} validation error(s), nothing imported", errors.len());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "\nImport finished: {}/{} imported, {} failed, {} chapter(s) created",
        report.imported, report.total, report.failed, report.chapters_created
    );
    for failure in &report.failures {
        println!("  row {}: {}", failure.row, failure.message);
    }

    Ok(())
}

//! CSV question importer.
//!
//! Parses pasted CSV text against the fixed 17-column question schema,
//! validates the whole batch, and only then loads it row by row. A single
//! invalid row blocks the import; once validation passed, a row that fails to
//! load is counted and the remaining rows still run.
//!
//! Splitting is a plain comma split: quoted fields containing commas are not
//! supported.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Continent, Difficulty, NewChapter, NewOption, NewQuestion, QuestionType};
use crate::traits::QuizStore;

/// The header columns every import must carry, in canonical order.
pub const COLUMNS: [&str; 17] = [
    "continent",
    "chapter_code",
    "difficulty",
    "question_text",
    "question_type",
    "explanation",
    "hint_1",
    "hint_2",
    "hint_3",
    "option_a",
    "option_b",
    "option_c",
    "option_d",
    "correct_answer",
    "points_base",
    "competence_code",
    "metadata",
];

const REQUIRED: [&str; 6] = [
    "continent",
    "chapter_code",
    "difficulty",
    "question_text",
    "question_type",
    "correct_answer",
];

const OPTION_COLUMNS: [&str; 4] = ["option_a", "option_b", "option_c", "option_d"];
const HINT_COLUMNS: [&str; 3] = ["hint_1", "hint_2", "hint_3"];

/// A schema violation. `row` is 1-based over data rows; 0 means the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Why an import did not start loading.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV is empty or has no data rows")]
    Empty,

    #[error("{} validation error(s), nothing imported", .0.len())]
    Validation(Vec<ValidationError>),
}

/// One parsed data row, keyed by header name.
#[derive(Debug, Clone)]
pub struct CsvRow {
    /// 1-based index over data rows.
    pub row: usize,
    fields: HashMap<String, String>,
}

impl CsvRow {
    /// Cell value, `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    fn non_blank(&self, column: &str) -> Option<&str> {
        let value = self.get(column);
        (!value.is_empty()).then_some(value)
    }

    /// Non-blank `option_a..option_d` values, in column order.
    pub fn options(&self) -> Vec<&str> {
        OPTION_COLUMNS
            .iter()
            .filter_map(|c| self.non_blank(c))
            .collect()
    }

    /// Non-blank `hint_1..hint_3` values, in column order.
    pub fn hints(&self) -> Vec<String> {
        HINT_COLUMNS
            .iter()
            .filter_map(|c| self.non_blank(c))
            .map(str::to_string)
            .collect()
    }
}

/// Parsed CSV: header plus data rows.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

/// Split raw text into a header and data rows.
///
/// Cells are trimmed and stripped of `"` characters; missing trailing cells
/// read as blank.
pub fn parse_csv(text: &str) -> Result<CsvTable, ImportError> {
    let lines: Vec<&str> = text
        .trim()
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .collect();
    if lines.len() < 2 {
        return Err(ImportError::Empty);
    }

    let headers: Vec<String> = lines[0].split(',').map(|h| h.trim().to_string()).collect();
    let rows = lines[1..]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let values: Vec<&str> = line.split(',').collect();
            let fields = headers
                .iter()
                .enumerate()
                .map(|(col, header)| {
                    let value = values
                        .get(col)
                        .map(|v| v.trim().replace('"', ""))
                        .unwrap_or_default();
                    (header.clone(), value)
                })
                .collect();
            CsvRow { row: i + 1, fields }
        })
        .collect();

    Ok(CsvTable { headers, rows })
}

/// Report schema columns missing from the header.
pub fn validate_headers(headers: &[String]) -> Vec<ValidationError> {
    let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
    COLUMNS
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| ValidationError::new(0, c, "missing column"))
        .collect()
}

/// Validate one data row against the schema.
pub fn validate_row(row: &CsvRow) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let n = row.row;

    for field in REQUIRED {
        if row.get(field).is_empty() {
            errors.push(ValidationError::new(n, field, "required field is missing"));
        }
    }

    let continent = row.get("continent");
    if !continent.is_empty() && continent.parse::<Continent>().is_err() {
        let allowed: Vec<String> = Continent::ALL.iter().map(|c| c.to_string()).collect();
        errors.push(ValidationError::new(
            n,
            "continent",
            format!("invalid continent, expected one of: {}", allowed.join(", ")),
        ));
    }

    let difficulty = row.get("difficulty");
    if !difficulty.is_empty() && difficulty.parse::<Difficulty>().is_err() {
        errors.push(ValidationError::new(
            n,
            "difficulty",
            "invalid difficulty, expected one of: facile, moyen, difficile, expert (or tres_difficile), piege",
        ));
    }

    let question_type = row.get("question_type");
    if !question_type.is_empty() && question_type.parse::<QuestionType>().is_err() {
        errors.push(ValidationError::new(
            n,
            "question_type",
            "invalid question type, expected one of: multiple_choice, free_text",
        ));
    }

    if question_type == "multiple_choice" {
        let options = row.options();
        if options.len() < 2 {
            errors.push(ValidationError::new(
                n,
                "options",
                "multiple-choice questions need at least 2 options",
            ));
        }
        if !options.contains(&row.get("correct_answer")) {
            errors.push(ValidationError::new(
                n,
                "correct_answer",
                "correct answer must match one of the options",
            ));
        }
    }

    match row.get("points_base").parse::<i64>() {
        Ok(points) if (1..=10).contains(&points) => {}
        _ => errors.push(ValidationError::new(
            n,
            "points_base",
            "points must be an integer between 1 and 10",
        )),
    }

    errors
}

/// Validate header and every row, collecting all errors.
pub fn validate_table(table: &CsvTable) -> Vec<ValidationError> {
    let mut errors = validate_headers(&table.headers);
    errors.extend(table.rows.iter().flat_map(validate_row));
    errors
}

/// Parse and validate without touching any store.
pub fn validate_csv(text: &str) -> Result<CsvTable, ImportError> {
    let table = parse_csv(text)?;
    let errors = validate_table(&table);
    if errors.is_empty() {
        Ok(table)
    } else {
        Err(ImportError::Validation(errors))
    }
}

/// A row that passed validation but failed to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFailure {
    pub row: usize,
    pub message: String,
}

/// Outcome of a load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    pub failures: Vec<RowFailure>,
    /// Chapters created during this import.
    pub chapters_created: usize,
}

/// Per-row progress reporting.
pub trait ImportProgress: Send + Sync {
    fn on_row_imported(&self, row: usize, total: usize, question_id: Uuid);
    fn on_row_failed(&self, row: usize, total: usize, error: &anyhow::Error);
}

/// No-op progress reporter.
pub struct NoopImportProgress;

impl ImportProgress for NoopImportProgress {
    fn on_row_imported(&self, _: usize, _: usize, _: Uuid) {}
    fn on_row_failed(&self, _: usize, _: usize, _: &anyhow::Error) {}
}

/// Validate `text` and, if every row passes, load it into `store`.
pub async fn import_csv<S>(
    store: &S,
    text: &str,
    progress: &dyn ImportProgress,
) -> Result<ImportReport, ImportError>
where
    S: QuizStore + ?Sized,
{
    let table = validate_csv(text).inspect_err(|e| {
        tracing::warn!("import rejected: {e}");
    })?;

    let total = table.rows.len();
    let mut report = ImportReport {
        total,
        ..Default::default()
    };
    let mut chapter_ids: HashMap<String, Uuid> = HashMap::new();

    for row in &table.rows {
        match import_row(store, row, &mut chapter_ids, &mut report.chapters_created).await {
            Ok(question_id) => {
                report.imported += 1;
                progress.on_row_imported(row.row, total, question_id);
            }
            Err(e) => {
                tracing::error!(row = row.row, "failed to import row: {e:#}");
                progress.on_row_failed(row.row, total, &e);
                report.failed += 1;
                report.failures.push(RowFailure {
                    row: row.row,
                    message: format!("{e:#}"),
                });
            }
        }
    }

    tracing::info!(
        total,
        imported = report.imported,
        failed = report.failed,
        "import finished"
    );
    Ok(report)
}

async fn import_row<S>(
    store: &S,
    row: &CsvRow,
    chapter_ids: &mut HashMap<String, Uuid>,
    chapters_created: &mut usize,
) -> anyhow::Result<Uuid>
where
    S: QuizStore + ?Sized,
{
    let code = row.get("chapter_code");
    let chapter_id = match chapter_ids.get(code) {
        Some(id) => *id,
        None => {
            let id = match store.find_chapter_by_code(code).await? {
                Some(id) => id,
                None => {
                    let chapter = new_chapter(row)?;
                    let id = store.insert_chapter(&chapter).await?;
                    *chapters_created += 1;
                    tracing::info!(%id, code, "chapter created");
                    id
                }
            };
            chapter_ids.insert(code.to_string(), id);
            id
        }
    };

    let question = new_question(row, chapter_id)?;
    let question_id = store.insert_question(&question).await?;

    if question.question_type == QuestionType::MultipleChoice {
        let correct = row.get("correct_answer");
        for (index, text) in row.options().into_iter().enumerate() {
            store
                .insert_option(&NewOption {
                    question_id,
                    option_text: text.to_string(),
                    is_correct: text == correct,
                    order_index: index as u32,
                })
                .await?;
        }
    }

    Ok(question_id)
}

fn new_chapter(row: &CsvRow) -> anyhow::Result<NewChapter> {
    let code = row.get("chapter_code");
    let competence = row.get("competence_code");
    Ok(NewChapter {
        code: code.to_string(),
        title: format!("Chapitre {code}"),
        continent: row.get("continent").parse().map_err(anyhow::Error::msg)?,
        description: Some(format!("Questions générées pour {competence}")),
        level: school_level(competence),
    })
}

fn new_question(row: &CsvRow, chapter_id: Uuid) -> anyhow::Result<NewQuestion> {
    let question_type: QuestionType = row.get("question_type").parse().map_err(anyhow::Error::msg)?;
    let metadata = match row.get("metadata") {
        "" => serde_json::json!({}),
        raw => serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("invalid metadata JSON: {e}"))?,
    };

    Ok(NewQuestion {
        chapter_id,
        question_text: row.get("question_text").to_string(),
        question_type,
        difficulty: row.get("difficulty").parse().map_err(anyhow::Error::msg)?,
        points_base: row.get("points_base").parse().unwrap_or(1),
        explanation: row.non_blank("explanation").map(str::to_string),
        accepted_answer: (question_type == QuestionType::FreeText)
            .then(|| row.get("correct_answer").to_string()),
        hints: row.hints(),
        metadata,
    })
}

/// School level from a competence code such as `CE2-NUM-03`: the integer
/// after an optional `CE` prefix of the first dash-separated segment, else 1.
pub fn school_level(competence_code: &str) -> u32 {
    competence_code
        .split('-')
        .next()
        .map(|seg| seg.replace("CE", ""))
        .and_then(|seg| seg.trim().parse::<u32>().ok())
        .unwrap_or(1)
}

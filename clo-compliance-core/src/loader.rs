// Stipulation loading from CSV, TSV and spreadsheet files.
//
// Every format is reduced to numbered string rows first; validation of the
// header and of each row is shared.

use crate::error::ValidationError;
use crate::types::{RejectedRow, Stipulation};
use calamine::{open_workbook_auto, Reader};
use std::collections::HashMap;
use std::path::Path;

const ID_COLUMN: &str = "id";
const CATEGORY_COLUMN: &str = "category";
const DESCRIPTION_COLUMN: &str = "description";
const SECTION_COLUMNS: [&str; 2] = ["section", "section_hint"];

/// Accepted stipulations in file order, plus the rows that were refused
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedStipulations {
    pub stipulations: Vec<Stipulation>,
    pub rejected: Vec<RejectedRow>,
}

/// A raw row with its 1-based position in the source file
type NumberedRow = (usize, Vec<String>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Delimited(u8),
    Workbook,
}

impl SourceFormat {
    fn for_path(path: &Path) -> Result<Self, ValidationError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(Self::Delimited(b',')),
            "tsv" | "tab" => Ok(Self::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Workbook),
            _ => Err(ValidationError::UnsupportedFormat {
                path: path.display().to_string(),
                extension,
            }),
        }
    }
}

/// Load and validate the stipulations file at `path`.
///
/// Rows without an id, rows without a description and repeated ids are
/// rejected. The first row carrying an id claims it even when that row is
/// itself rejected. A missing required column, a file with
/// no header, or a file where nothing is accepted is an error.
pub fn load_stipulations(path: &Path) -> Result<LoadedStipulations, ValidationError> {
    let source = path.display().to_string();
    tracing::info!("📋 Loading stipulations from {source}");

    let rows = match SourceFormat::for_path(path)? {
        SourceFormat::Delimited(delimiter) => read_delimited(path, delimiter)?,
        SourceFormat::Workbook => read_workbook(path)?,
    };

    let loaded = validate_rows(&source, rows)?;
    tracing::info!(
        "   ✅ Accepted {} stipulations, rejected {} rows",
        loaded.stipulations.len(),
        loaded.rejected.len()
    );
    Ok(loaded)
}

fn unreadable(path: &Path, message: impl ToString) -> ValidationError {
    ValidationError::Unreadable {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Vec<NumberedRow>, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| unreadable(path, e))?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| unreadable(path, e))?;
        let row_number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 1);
        rows.push((row_number, record.iter().map(str::to_string).collect()));
    }
    Ok(rows)
}

fn read_workbook(path: &Path) -> Result<Vec<NumberedRow>, ValidationError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(path, e))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| unreadable(path, e))?,
        None => {
            return Err(ValidationError::EmptyFile {
                path: path.display().to_string(),
            })
        }
    };

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    Ok(range
        .rows()
        .enumerate()
        .map(|(i, cells)| {
            let values = cells.iter().map(|cell| cell.to_string()).collect();
            (first_row + i + 1, values)
        })
        .collect())
}

/// Lowercase, trimmed, with spaces and dashes turned into underscores
fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

struct ColumnIndex {
    id: usize,
    category: usize,
    description: usize,
    section: Option<usize>,
}

impl ColumnIndex {
    fn from_header(source: &str, header: &[String]) -> Result<Self, ValidationError> {
        let positions: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .rev()
            .map(|(i, name)| (normalize_header(name), i))
            .collect();

        let required = |column: &str| {
            positions
                .get(column)
                .copied()
                .ok_or_else(|| ValidationError::MissingColumn {
                    path: source.to_string(),
                    column: column.to_string(),
                })
        };

        Ok(Self {
            id: required(ID_COLUMN)?,
            category: required(CATEGORY_COLUMN)?,
            description: required(DESCRIPTION_COLUMN)?,
            section: SECTION_COLUMNS.iter().find_map(|c| positions.get(*c).copied()),
        })
    }
}

fn cell(cells: &[String], index: usize) -> &str {
    cells.get(index).map(|c| c.trim()).unwrap_or("")
}

fn validate_rows(source: &str, rows: Vec<NumberedRow>) -> Result<LoadedStipulations, ValidationError> {
    let mut rows = rows.into_iter().skip_while(|(_, cells)| is_blank_row(cells));
    let (_, header) = rows.next().ok_or_else(|| ValidationError::EmptyFile {
        path: source.to_string(),
    })?;
    let columns = ColumnIndex::from_header(source, &header)?;

    let mut stipulations = Vec::new();
    let mut rejected = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (row, cells) in rows {
        if is_blank_row(&cells) {
            continue;
        }

        let id = cell(&cells, columns.id);
        if id.is_empty() {
            tracing::warn!("⚠️  Row {row}: missing id, skipping");
            rejected.push(RejectedRow {
                row,
                id: None,
                reason: "missing id".to_string(),
            });
            continue;
        }

        if let Some(first_row) = seen.get(id) {
            tracing::warn!("⚠️  Row {row}: duplicate id '{id}' (first seen on row {first_row}), skipping");
            rejected.push(RejectedRow {
                row,
                id: Some(id.to_string()),
                reason: format!("duplicate id (first seen on row {first_row})"),
            });
            continue;
        }

        seen.insert(id.to_string(), row);

        let description = cell(&cells, columns.description);
        if description.is_empty() {
            tracing::warn!("⚠️  Row {row}: stipulation '{id}' has no description, skipping");
            rejected.push(RejectedRow {
                row,
                id: Some(id.to_string()),
                reason: "missing description".to_string(),
            });
            continue;
        }

        let section_hint = columns
            .section
            .map(|i| cell(&cells, i))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        stipulations.push(Stipulation {
            id: id.to_string(),
            category: cell(&cells, columns.category).to_string(),
            description: description.to_string(),
            section_hint,
        });
    }

    if stipulations.is_empty() {
        return Err(ValidationError::NoStipulations {
            path: source.to_string(),
            rejected: rejected.len(),
        });
    }

    Ok(LoadedStipulations { stipulations, rejected })
}

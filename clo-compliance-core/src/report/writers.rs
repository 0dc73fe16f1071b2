// Report writers: CSV (primary), JSON, and a plain text fallback.

use super::{ComplianceReport, ReportFormat, ReportRow, ReportSummary, REPORT_COLUMNS};
use crate::error::RunError;
use crate::types::ComplianceStatus;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// First field of the record that separates rows from summary counts
pub const SUMMARY_MARKER: &str = "# Summary";

const UNAVAILABLE_TABULAR_EXTENSIONS: [&str; 3] = ["xlsx", "xlsm", "xls"];

/// Write `report` to `path` in `format`, returning the path actually written.
///
/// Spreadsheet output is not available, and a failed CSV write is retried
/// once as text; both fall back to the same path with a `.txt` extension.
pub fn write_report(report: &ComplianceReport, path: &Path, format: ReportFormat) -> Result<PathBuf, RunError> {
    ensure_parent_dir(path)?;

    let result = match format {
        ReportFormat::Csv if wants_spreadsheet(path) => {
            tracing::warn!(
                "⚠️  No spreadsheet writer available for {}, writing a text report instead",
                path.display()
            );
            return write_text_fallback(report, path);
        }
        ReportFormat::Csv => write_csv(report, path),
        ReportFormat::Json => write_json(report, path),
        ReportFormat::Text => write_text(report, path),
    };

    match (result, format) {
        (Ok(()), _) => {
            tracing::info!("💾 Report written to {}", path.display());
            Ok(path.to_path_buf())
        }
        (Err(e), ReportFormat::Csv) => {
            tracing::warn!("⚠️  CSV report failed ({e:#}), writing a text report instead");
            write_text_fallback(report, path)
        }
        (Err(e), _) => Err(report_write_error(path, e)),
    }
}

fn wants_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| UNAVAILABLE_TABULAR_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn ensure_parent_dir(path: &Path) -> Result<(), RunError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| RunError::ReportWrite {
                path: path.display().to_string(),
                message: format!("cannot create output directory: {e}"),
            })
        }
        _ => Ok(()),
    }
}

fn report_write_error(path: &Path, error: anyhow::Error) -> RunError {
    RunError::ReportWrite {
        path: path.display().to_string(),
        message: format!("{error:#}"),
    }
}

fn write_text_fallback(report: &ComplianceReport, path: &Path) -> Result<PathBuf, RunError> {
    let fallback = path.with_extension("txt");
    write_text(report, &fallback).map_err(|e| report_write_error(&fallback, e))?;
    tracing::info!("💾 Text report written to {}", fallback.display());
    Ok(fallback)
}

pub fn write_csv(report: &ComplianceReport, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(REPORT_COLUMNS)?;
    for row in &report.rows {
        writer.write_record([
            row.stipulation_id.as_str(),
            row.category.as_str(),
            row.description.as_str(),
            row.section.as_str(),
            row.status.as_str(),
            row.explanation.as_str(),
            row.excerpt.as_str(),
        ])?;
    }

    writer.write_record([SUMMARY_MARKER])?;
    for status in ComplianceStatus::ALL {
        writer.write_record([status.as_str().to_string(), report.summary.count(status).to_string()])?;
    }
    writer.write_record(["TOTAL".to_string(), report.summary.total.to_string()])?;
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

pub fn write_json(report: &ComplianceReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn write_text(report: &ComplianceReport, path: &Path) -> Result<()> {
    fs::write(path, render_text(report)).with_context(|| format!("Failed to write {}", path.display()))
}

/// Human-readable report body
pub fn render_text(report: &ComplianceReport) -> String {
    let meta = &report.metadata;
    let mut out = String::new();
    out.push_str("CLO Compliance Report\n");
    out.push_str("=====================\n");
    out.push_str(&format!("Document:     {}\n", meta.document));
    out.push_str(&format!("SHA-256:      {}\n", meta.document_sha256));
    out.push_str(&format!("Stipulations: {}\n", meta.stipulations_file));
    out.push_str(&format!("Generated:    {}\n", meta.generated_at.to_rfc3339()));
    out.push_str(&format!("Run ID:       {}\n", meta.run_id));
    if !meta.rejected_rows.is_empty() {
        out.push_str(&format!("Rejected rows: {}\n", meta.rejected_rows.len()));
        for rejected in &meta.rejected_rows {
            out.push_str(&format!(
                "  row {}: {} ({})\n",
                rejected.row,
                rejected.id.as_deref().unwrap_or("-"),
                rejected.reason
            ));
        }
    }
    out.push('\n');

    for row in &report.rows {
        out.push_str(&format!("[{}] {} - {}\n", row.status, row.stipulation_id, row.category));
        out.push_str(&format!("  Rule:        {}\n", row.description));
        if !row.section.is_empty() {
            out.push_str(&format!("  Section:     {}\n", row.section));
        }
        out.push_str(&format!("  Explanation: {}\n", row.explanation));
        if !row.excerpt.is_empty() {
            let preview: String = row.excerpt.chars().take(300).collect();
            out.push_str(&format!("  Excerpt:     {}\n", preview.split_whitespace().collect::<Vec<_>>().join(" ")));
        }
        if let Some(quoted) = &row.quoted_excerpts {
            out.push_str("  Quoted:\n");
            for line in quoted.lines() {
                out.push_str(&format!("    {line}\n"));
            }
        }
        out.push('\n');
    }

    out.push_str(&summary_line(&report.summary));
    out.push('\n');
    out
}

pub fn summary_line(summary: &ReportSummary) -> String {
    format!(
        "Summary: PASS {} | FAIL {} | UNCLEAR {} | TOTAL {}",
        summary.passed, summary.failed, summary.unclear, summary.total
    )
}

/// Read the rows of a CSV report back, stopping at the summary marker
pub fn read_report_csv(path: &Path) -> Result<Vec<ReportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open report {}", path.display()))?;

    let headers = reader.headers()?.clone();
    if headers.iter().ne(REPORT_COLUMNS.iter().copied()) {
        bail!("{} does not have the compliance report header", path.display());
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.get(0) == Some(SUMMARY_MARKER) {
            break;
        }
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        let status = field(4)
            .parse::<ComplianceStatus>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Bad status in report row for {}", field(0)))?;
        rows.push(ReportRow {
            stipulation_id: field(0),
            category: field(1),
            description: field(2),
            section: field(3),
            status,
            explanation: field(5),
            excerpt: field(6),
            match_confidence: 0.0,
            quoted_excerpts: None,
        });
    }
    Ok(rows)
}

//! Compliance report model
//!
//! One row per evaluated stipulation, in stipulation order, plus per-status
//! counts and run metadata. Writers for the on-disk formats live in
//! [`writers`].

pub mod writers;

pub use writers::{read_report_csv, write_report, SUMMARY_MARKER};

use crate::types::{ComplianceResult, ComplianceStatus, RejectedRow, Stipulation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const REPORT_COLUMNS: [&str; 7] = [
    "stipulation_id",
    "category",
    "description",
    "section",
    "status",
    "explanation",
    "excerpt",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
    Text,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "text",
        })
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            other => Err(format!("unknown report format '{other}' (expected csv, json or text)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub stipulation_id: String,
    pub category: String,
    pub description: String,
    pub section: String,
    pub status: ComplianceStatus,
    pub explanation: String,
    pub excerpt: String,
    #[serde(default)]
    pub match_confidence: f64,
    /// Model-quoted evidence; not part of the CSV columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_excerpts: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub passed: usize,
    pub failed: usize,
    pub unclear: usize,
    pub total: usize,
}

impl ReportSummary {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let count = |status: ComplianceStatus| rows.iter().filter(|r| r.status == status).count();
        Self {
            passed: count(ComplianceStatus::Pass),
            failed: count(ComplianceStatus::Fail),
            unclear: count(ComplianceStatus::Unclear),
            total: rows.len(),
        }
    }

    pub fn count(&self, status: ComplianceStatus) -> usize {
        match status {
            ComplianceStatus::Pass => self.passed,
            ComplianceStatus::Fail => self.failed,
            ComplianceStatus::Unclear => self.unclear,
        }
    }
}

/// Provenance of a run, written into JSON and text reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub document: String,
    /// SHA-256 of the document bytes
    pub document_sha256: String,
    pub page_count: usize,
    pub section_count: usize,
    pub stipulations_file: String,
    pub rejected_rows: Vec<RejectedRow>,
    pub judgement_backend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub metadata: ReportMetadata,
    pub rows: Vec<ReportRow>,
    pub summary: ReportSummary,
}

/// Accumulates rows in evaluation order
pub struct ReportBuilder {
    metadata: ReportMetadata,
    include_excerpts: bool,
    rows: Vec<ReportRow>,
}

impl ReportBuilder {
    pub fn new(metadata: ReportMetadata) -> Self {
        Self {
            metadata,
            include_excerpts: true,
            rows: Vec::new(),
        }
    }

    pub fn include_excerpts(mut self, include: bool) -> Self {
        self.include_excerpts = include;
        self
    }

    pub fn add(&mut self, stipulation: &Stipulation, result: ComplianceResult) {
        self.rows.push(ReportRow {
            stipulation_id: result.stipulation_id,
            category: stipulation.category.clone(),
            description: stipulation.description.clone(),
            section: result.section_identifier.unwrap_or_default(),
            status: result.status,
            explanation: result.explanation,
            excerpt: if self.include_excerpts { result.excerpt } else { String::new() },
            match_confidence: result.match_confidence,
            quoted_excerpts: result.quoted_excerpts,
        });
    }

    pub fn build(self) -> ComplianceReport {
        let summary = ReportSummary::from_rows(&self.rows);
        ComplianceReport {
            metadata: self.metadata,
            rows: self.rows,
            summary,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ===== INPUT TYPES =====

/// One compliance rule to verify against the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stipulation {
    pub id: String,
    pub category: String,
    pub description: String,
    /// Explicit section reference, e.g. "Article 5" or "Coverage Tests"
    pub section_hint: Option<String>,
}

/// A stipulation row the loader refused to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based spreadsheet row number, header included
    pub row: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Page-ordered raw text produced by a preprocessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentText {
    pub source: String,
    pub pages: Vec<String>,
}

impl DocumentText {
    pub fn new(source: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            source: source.into(),
            pages: pages
                .into_iter()
                .map(|p| p.replace("\r\n", "\n").replace('\r', "\n"))
                .collect(),
        }
    }

    /// Single-page document, mostly for tests and plain text input
    pub fn from_text(source: impl Into<String>, text: &str) -> Self {
        Self::new(source, vec![text.to_string()])
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }

    /// Concatenated text (pages joined by `\n`) and the byte offset where
    /// each page starts.
    pub fn concatenated(&self) -> (String, Vec<usize>) {
        let mut text = String::new();
        let mut page_starts = Vec::with_capacity(self.pages.len());
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            page_starts.push(text.len());
            text.push_str(page);
        }
        (text, page_starts)
    }
}

// ===== SECTION TYPES =====

/// A heading-delimited region of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub identifier: String,
    pub heading: String,
    /// Byte offset into the concatenated document text (inclusive)
    pub start_offset: usize,
    /// Byte offset into the concatenated document text (exclusive)
    pub end_offset: usize,
    /// 1-indexed page on which the section starts
    pub page: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// The stipulation named a section that exists
    SectionHint,
    /// Pattern and keyword scoring picked the section(s)
    Scored,
    /// Nothing scored above threshold; start of document used instead
    Fallback,
}

/// Text selected as evidence for one stipulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excerpt {
    pub text: String,
    pub section_identifiers: Vec<String>,
    /// Match confidence in [0, 1]; 0 means no confident match
    pub confidence: f64,
    pub truncated: bool,
    pub strategy: MatchStrategy,
}

impl Excerpt {
    pub fn is_confident(&self) -> bool {
        self.confidence > 0.0
    }

    pub fn section_label(&self) -> Option<String> {
        if self.section_identifiers.is_empty() {
            None
        } else {
            Some(self.section_identifiers.join(", "))
        }
    }
}

// ===== RESULT TYPES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplianceStatus {
    Pass,
    Fail,
    Unclear,
}

impl ComplianceStatus {
    pub const ALL: [ComplianceStatus; 3] = [Self::Pass, Self::Fail, Self::Unclear];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Unclear => "UNCLEAR",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            "UNCLEAR" => Ok(Self::Unclear),
            other => Err(format!("unknown compliance status '{other}'")),
        }
    }
}

/// Verdict for one stipulation. Created once per stipulation per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub stipulation_id: String,
    pub status: ComplianceStatus,
    pub explanation: String,
    pub excerpt: String,
    pub section_identifier: Option<String>,
    pub match_confidence: f64,
    /// Passages the model quoted as its evidence
    pub quoted_excerpts: Option<String>,
    /// Judgement calls made for this result
    pub attempts: u32,
}

// ===== COVENANT EXTRACTION TYPES =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub identifier: String,
    pub heading: String,
    pub page: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub length: usize,
}

impl From<&DocumentSection> for SectionSummary {
    fn from(section: &DocumentSection) -> Self {
        Self {
            identifier: section.identifier.clone(),
            heading: section.heading.clone(),
            page: section.page,
            start_offset: section.start_offset,
            end_offset: section.end_offset,
            length: section.end_offset - section.start_offset,
        }
    }
}

/// One covenant pattern hit inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovenantMatch {
    pub pattern: String,
    pub section_identifier: String,
    pub matched_text: String,
    /// First capture group, e.g. the threshold value
    pub value: Option<String>,
    /// Byte offset into the concatenated document text
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovenantExtraction {
    pub document: String,
    pub sections: Vec<SectionSummary>,
    pub matches: Vec<CovenantMatch>,
}

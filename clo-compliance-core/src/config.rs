use crate::report::ReportFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

// Default value functions for serde
fn default_true() -> bool {
    true
}

/// Top-level configuration for a compliance run.
///
/// Every section has serde defaults, so a YAML file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComplianceConfig {
    /// Heading markers, category patterns and covenant patterns
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Section scoring thresholds and excerpt bounds
    #[serde(default)]
    pub matcher: MatcherConfig,
    /// Retry policy for judgement calls
    #[serde(default)]
    pub judge: JudgeConfig,
    /// Judgement endpoint settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedPattern {
    pub name: String,
    pub pattern: String,
}

impl NamedPattern {
    fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryConfig {
    pub name: String,
    /// Alternative spellings accepted in the stipulations file
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Regexes whose hits mark a section as relevant to this category
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Words that, when present in a section heading, mark it as relevant
    #[serde(default)]
    pub heading_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Section heading regexes, in priority order. Named groups `kind`,
    /// `number` and `title` control how sections are named.
    #[serde(default = "default_heading_patterns")]
    pub heading_patterns: Vec<NamedPattern>,
    /// Section names recognised when they stand alone on a line
    #[serde(default = "default_named_sections")]
    pub named_sections: Vec<String>,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
    /// Patterns for the covenant extraction pass
    #[serde(default = "default_covenant_patterns")]
    pub covenant_patterns: Vec<NamedPattern>,
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            heading_patterns: default_heading_patterns(),
            named_sections: default_named_sections(),
            categories: default_categories(),
            covenant_patterns: default_covenant_patterns(),
            stopwords: default_stopwords(),
        }
    }
}

fn default_heading_patterns() -> Vec<NamedPattern> {
    vec![
        // "SECTION 1. COVERAGE TESTS", "Article V - Events of Default", "Section 7.1: Limits".
        // The title must start upper case and carry no clause punctuation, so a
        // wrapped cross-reference ("Section 7.1 hereof, shall ...") stays body text.
        NamedPattern::new(
            "numbered_heading",
            r#"^[ \t]*(?P<kind>section|article)[ \t]+(?P<number>\d+(?:\.\d+)*|(?-i:[IVXLC]+))\b(?:[ \t]*[-\x{2013}\x{2014}:.])?[ \t]*(?P<title>(?-i:[A-Z"(\[])[^\n,;]{0,119})?[ \t]*$"#,
        ),
    ]
}

fn default_named_sections() -> Vec<String> {
    [
        "Definitions",
        "Covenants",
        "Events of Default",
        "Collateral",
        "Payment Priority",
        "Coverage Tests",
        "Concentration Limits",
        "Rating Requirements",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn category(name: &str, aliases: &[&str], patterns: &[&str], keywords: &[&str]) -> CategoryConfig {
    CategoryConfig {
        name: name.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        patterns: patterns.iter().map(|s| s.to_string()).collect(),
        heading_keywords: keywords.iter().map(|s| s.to_string()).collect(),
    }
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        category(
            "Coverage Test",
            &["OC Test", "IC Test", "Overcollateralization Test", "Interest Coverage Test"],
            &[
                r"\bcoverage\s+tests?\b",
                r"\b(?:overcollateralization|o/c|oc)\s+(?:ratio|test)",
                r"\b(?:interest\s+coverage|i/c|ic)\s+(?:ratio|test)",
            ],
            &["coverage", "overcollateralization", "interest coverage"],
        ),
        category(
            "Concentration Limit",
            &["Concentration", "Obligor Concentration"],
            &[
                r"\bconcentration\s+limit",
                r"\bsingle\s+obligor",
                r"\bobligor\s+concentration",
                r"\b\d+(?:\.\d+)?\s*%\s+of\s+the\s+(?:aggregate|collateral)",
            ],
            &["concentration"],
        ),
        category(
            "Rating Requirement",
            &["Rating", "Ratings", "Rating Threshold"],
            &[
                r"\b(?:rated|rating)\s+(?:of\s+)?(?:at\s+least\s+)?[A-Z][a-z]*[-+]?\d?",
                r"\b(?:moody's|s&p|fitch)\b",
                r"\bccc\b",
            ],
            &["rating"],
        ),
        category(
            "Payment Priority",
            &["Priority of Payments", "Waterfall"],
            &[
                r"\bpriority\s+of\s+payments?",
                r"\bwaterfall\b",
                r"\binterest\s+proceeds\b",
                r"\bprincipal\s+proceeds\b",
            ],
            &["priority", "payment", "waterfall"],
        ),
        category(
            "Event of Default",
            &["Default", "Events of Default"],
            &[
                r"\bevents?\s+of\s+default\b",
                r"\bacceleration\b",
                r"\bdefault\s+(?:interest|rate)",
            ],
            &["default"],
        ),
        category(
            "Collateral Quality",
            &["Collateral", "Eligibility Criteria", "Collateral Quality Test"],
            &[
                r"\bcollateral\s+quality\s+tests?",
                r"\bweighted\s+average\s+(?:spread|coupon|life|rating\s+factor)",
                r"\bdiversity\s+score\b",
                r"\beligib(?:le|ility)\s+(?:criteria|collateral)",
            ],
            &["collateral", "eligibility"],
        ),
        category(
            "Covenant",
            &["Financial Covenant"],
            &[
                r"(?:if|when|in the event that)\s+[^,]+?\s+(?:exceeds?|falls? below|is less than|is greater than)",
                r"\bcovenants?\b",
                r"\bshall\s+(?:not\s+)?(?:exceed|maintain|be\s+less\s+than)",
            ],
            &["covenant"],
        ),
        category(
            "Reinvestment",
            &["Reinvestment Period"],
            &[r"\breinvestment\s+period\b", r"\breinvest(?:ment|ed)?\b"],
            &["reinvestment"],
        ),
    ]
}

fn default_covenant_patterns() -> Vec<NamedPattern> {
    vec![
        NamedPattern::new(
            "covenant_trigger",
            r"(?:if|when|in the event that)\s+([^,]+?)\s+(?:exceeds?|falls? below|is less than|is greater than)\s+(\d+(?:\.\d+)?%?)",
        ),
        NamedPattern::new(
            "oc_ratio",
            r"(?:overcollateralization|o/c)\s+(?:ratio|test)\s*(?:of)?\s*(\d+(?:\.\d+)?%?)",
        ),
        NamedPattern::new(
            "ic_ratio",
            r"(?:interest coverage|i/c)\s+(?:ratio|test)\s*(?:of)?\s*(\d+(?:\.\d+)?%?)",
        ),
        NamedPattern::new(
            "concentration_limit",
            r"concentration\s+limit\s*(?:of)?\s*(\d+(?:\.\d+)?%?)",
        ),
        NamedPattern::new(
            "rating_threshold",
            r"(?:rated|rating)\s+(?:of\s+)?([A-Z][a-z]*[-+]?)",
        ),
        NamedPattern::new("percentage", r"(\d+(?:\.\d+)?)\s*%"),
        NamedPattern::new(
            "dollar_amount",
            r"\$\s*(\d{1,3}(?:,\d{3})*(?:\.\d{2})?)",
        ),
        NamedPattern::new(
            "date",
            r"\b(\d{1,2}[-/]\d{1,2}[-/]\d{2,4}|\d{4}[-/]\d{1,2}[-/]\d{1,2})\b",
        ),
    ]
}

fn default_stopwords() -> Vec<String> {
    [
        "the", "an", "and", "or", "of", "to", "in", "on", "for", "by", "with", "must", "shall",
        "be", "is", "are", "not", "no", "any", "all", "each", "than", "at", "as", "that", "this",
        "which", "such", "from", "least", "will", "may", "per", "its", "it", "has", "have",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum score (0.0-1.0) for a section to be accepted as a match
    pub min_score: f64,
    /// Minimum shared description tokens, unless a category pattern hit
    pub min_keyword_overlap: usize,
    /// Weight of category pattern hits
    pub pattern_weight: f64,
    /// Weight of a category keyword appearing in the section heading
    pub heading_weight: f64,
    /// Weight of description/section token overlap
    pub keyword_weight: f64,
    /// Pattern hits beyond this count add nothing
    pub pattern_hit_cap: usize,
    /// Upper bound on excerpt length in characters
    pub max_excerpt_chars: usize,
    /// Length of the start-of-document excerpt used when nothing matches
    pub fallback_excerpt_chars: usize,
    /// Shorter tokens are ignored
    pub min_token_len: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_score: 0.2,
            min_keyword_overlap: 1,
            pattern_weight: 0.45,
            heading_weight: 0.15,
            keyword_weight: 0.40,
            pattern_hit_cap: 3,
            max_excerpt_chars: 4000,
            fallback_excerpt_chars: 1000,
            min_token_len: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Total judgement attempts per stipulation, first call included
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            backoff_multiplier: 2.0,
            max_backoff_ms: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,
    pub model: String,
    /// Lower temperature keeps verdicts consistent between runs
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
            timeout_secs: 60,
            api_key_env: "OPENAI_API_KEY".to_string(),
            system_prompt: "You are a CLO compliance expert.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
    /// Include the matched excerpt text in report rows
    #[serde(default = "default_true")]
    pub include_excerpts: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            include_excerpts: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: String,
    pub stipulations_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: "output/".to_string(),
            stipulations_file: "input/stips.xlsx".to_string(),
        }
    }
}

impl ComplianceConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        let config: ComplianceConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {path}"))?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {p} ({e:#}), using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

// Response parsing for judgement calls.
//
// The model is asked for numbered "Compliance Status" / "Explanation" /
// "Relevant Excerpts" fields but free text is tolerated.

use crate::error::JudgementParseError;
use crate::types::ComplianceStatus;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

const CERTAINTY_WORDS: [&str; 4] = ["clearly", "definitely", "explicitly", "states that"];
const HEDGING_WORDS: [&str; 5] = ["may", "might", "unclear", "ambiguous", "possibly"];

fn status_line_regex() -> &'static Regex {
    static STATUS_LINE: OnceLock<Regex> = OnceLock::new();
    STATUS_LINE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t>*#-]*(?:\d+[.)][ \t]*)?[*_]*(?:compliance[ \t]+)?status[*_]*[ \t]*:[ \t]*[*_]*[ \t]*(pass|fail|unclear)\b[^\n]*$")
            .expect("status line regex is valid")
    })
}

fn status_token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\b(PASS|FAIL|UNCLEAR)\b").expect("status token regex is valid"))
}

fn explanation_regex() -> &'static Regex {
    static EXPLANATION: OnceLock<Regex> = OnceLock::new();
    EXPLANATION.get_or_init(|| {
        Regex::new(
            r"(?ims)^[ \t>*#-]*(?:\d+[.)][ \t]*)?[*_]*explanation[*_]*[ \t]*:[*_]*(.*?)(?:^[ \t>*#-]*(?:\d+[.)][ \t]*)?[*_]*(?:relevant[ \t]+excerpts?|excerpts?|compliance[ \t]+status|status)[*_]*[ \t]*:|\z)",
        )
        .expect("explanation regex is valid")
    })
}

fn excerpts_regex() -> &'static Regex {
    static EXCERPTS: OnceLock<Regex> = OnceLock::new();
    EXCERPTS.get_or_init(|| {
        Regex::new(
            r"(?ims)^[ \t>*#-]*(?:\d+[.)][ \t]*)?[*_]*(?:relevant[ \t]+)?excerpts?[*_]*[ \t]*:[*_]*(.*?)(?:^[ \t>*#-]*(?:\d+[.)][ \t]*)?[*_]*(?:explanation|compliance[ \t]+status|status)[*_]*[ \t]*:|\z)",
        )
        .expect("excerpts regex is valid")
    })
}

/// Verdict recovered from a raw model response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJudgement {
    pub status: ComplianceStatus,
    pub explanation: String,
    /// Passages the model quoted under "Relevant Excerpts", if any
    pub quoted_excerpts: Option<String>,
}

/// Parse a raw response into a status and a non-empty explanation.
///
/// A labelled `Status:` line decides the verdict. Without one, exactly one
/// distinct upper-case status token must appear in the text.
pub fn parse_judgement(raw: &str) -> Result<ParsedJudgement, JudgementParseError> {
    let (status, status_line) = match status_line_regex().captures(raw) {
        Some(caps) => {
            let token = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let status = token.parse::<ComplianceStatus>().map_err(|_| JudgementParseError::MissingStatus {
                raw: raw.to_string(),
            })?;
            (status, caps.get(0).map(|m| m.as_str()))
        }
        None => (standalone_status(raw)?, None),
    };

    let explanation = extract_explanation(raw)
        .or_else(|| {
            let remainder = match status_line {
                Some(line) => raw.replacen(line, "", 1),
                None => raw.to_string(),
            };
            let remainder = remainder.trim();
            (!remainder.is_empty()).then(|| remainder.to_string())
        })
        .unwrap_or_else(|| format!("Model returned {status} without an explanation"));

    Ok(ParsedJudgement {
        status,
        explanation,
        quoted_excerpts: extract_quoted_excerpts(raw),
    })
}

fn standalone_status(raw: &str) -> Result<ComplianceStatus, JudgementParseError> {
    let tokens: BTreeSet<&str> = status_token_regex()
        .find_iter(raw)
        .map(|m| m.as_str())
        .collect();

    match tokens.len() {
        0 => Err(JudgementParseError::MissingStatus { raw: raw.to_string() }),
        1 => tokens
            .into_iter()
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| JudgementParseError::MissingStatus { raw: raw.to_string() }),
        _ => Err(JudgementParseError::ConflictingStatus {
            raw: raw.to_string(),
            tokens: tokens.into_iter().map(str::to_string).collect(),
        }),
    }
}

fn extract_explanation(raw: &str) -> Option<String> {
    let caps = explanation_regex().captures(raw)?;
    let text = caps
        .get(1)?
        .as_str()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.trim_matches(|c: char| c == '*' || c == '_').trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Quoted passages, one per line; "None" and "N/A" count as nothing quoted
fn extract_quoted_excerpts(raw: &str) -> Option<String> {
    let caps = excerpts_regex().captures(raw)?;
    let text = caps
        .get(1)?
        .as_str()
        .lines()
        .map(|line| line.trim().trim_matches(|c: char| c == '*' || c == '_').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let placeholder = matches!(text.to_lowercase().trim_end_matches('.'), "none" | "n/a" | "na");
    (!text.is_empty() && !placeholder).then_some(text)
}

/// Heuristic certainty of a response in [0, 1]: certainty words against
/// hedging words, 0.5 when neither appears.
pub fn confidence_indicator(response: &str) -> f64 {
    let lower = response.to_lowercase();
    let certain = CERTAINTY_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let hedging = HEDGING_WORDS.iter().filter(|w| lower.contains(*w)).count();

    if certain + hedging == 0 {
        return 0.5;
    }
    certain as f64 / (certain + hedging) as f64
}

use crate::catalog::{normalize_label, CategoryPatterns, PatternCatalog};
use crate::config::MatcherConfig;
use crate::types::{DocumentSection, Excerpt, MatchStrategy, Stipulation};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

pub const TRUNCATION_MARKER: &str = "\n[... excerpt truncated ...]";

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"[a-z0-9]+(?:\.[0-9]+)?").expect("token regex is valid"))
}

/// Score of one section against one stipulation
#[derive(Debug, Clone, PartialEq)]
pub struct SectionScore {
    pub index: usize,
    pub score: f64,
    pub pattern_hits: usize,
    pub keyword_overlap: usize,
}

// RuleMatcher - picks the excerpt a stipulation is judged against
pub struct RuleMatcher<'a> {
    catalog: &'a PatternCatalog,
    config: &'a MatcherConfig,
}

impl<'a> RuleMatcher<'a> {
    pub fn new(catalog: &'a PatternCatalog, config: &'a MatcherConfig) -> Self {
        Self { catalog, config }
    }

    /// Select the best excerpt for `stipulation`.
    ///
    /// A section hint that names an existing section overrides scoring. A
    /// hint that names nothing is ignored. When no section clears the
    /// threshold, the start of the document is returned with confidence 0.
    pub fn match_stipulation(&self, stipulation: &Stipulation, sections: &[DocumentSection]) -> Excerpt {
        if let Some(hint) = stipulation.section_hint.as_deref() {
            let hinted: Vec<&DocumentSection> = sections
                .iter()
                .filter(|s| section_answers_to_hint(s, hint))
                .collect();
            if !hinted.is_empty() {
                tracing::debug!("   🎯 {}: section hint '{hint}' matched {} section(s)", stipulation.id, hinted.len());
                return self.build_excerpt(&hinted, 1.0, MatchStrategy::SectionHint);
            }
            tracing::warn!(
                "⚠️  {}: section hint '{hint}' matches no extracted section, scoring heuristically",
                stipulation.id
            );
        }

        let scores = self.score_sections(stipulation, sections);
        let best = scores
            .iter()
            .map(|s| s.score)
            .fold(f64::NEG_INFINITY, f64::max);

        if scores.is_empty() || best <= 0.0 {
            tracing::debug!("   ❔ {}: no section above threshold, using fallback excerpt", stipulation.id);
            return self.fallback_excerpt(sections);
        }

        // Scores come from identical arithmetic, so exact ties are meaningful
        let winners: Vec<&DocumentSection> = scores
            .iter()
            .filter(|s| s.score == best)
            .map(|s| &sections[s.index])
            .collect();

        tracing::debug!(
            "   🔍 {}: best score {:.2} across {} section(s)",
            stipulation.id,
            best,
            winners.len()
        );
        self.build_excerpt(&winners, best.clamp(0.0, 1.0), MatchStrategy::Scored)
    }

    /// Scores of all sections that clear the acceptance thresholds, in
    /// document order
    pub fn score_sections(&self, stipulation: &Stipulation, sections: &[DocumentSection]) -> Vec<SectionScore> {
        let category = self.catalog.category(&stipulation.category);
        let description_tokens = self.tokenize(&stipulation.description);

        sections
            .iter()
            .enumerate()
            .filter_map(|(index, section)| {
                let score = self.score_section(category, &description_tokens, section, index);
                let accepted = score.score >= self.config.min_score
                    && (score.keyword_overlap >= self.config.min_keyword_overlap
                        || score.pattern_hits > 0);
                accepted.then_some(score)
            })
            .collect()
    }

    fn score_section(
        &self,
        category: Option<&CategoryPatterns>,
        description_tokens: &BTreeSet<String>,
        section: &DocumentSection,
        index: usize,
    ) -> SectionScore {
        let section_tokens: HashSet<String> = self.tokenize(&section.text).into_iter().collect();
        let keyword_overlap = description_tokens
            .iter()
            .filter(|t| section_tokens.contains(*t))
            .count();
        let overlap_ratio = if description_tokens.is_empty() {
            0.0
        } else {
            keyword_overlap as f64 / description_tokens.len() as f64
        };

        let (score, pattern_hits) = match category {
            Some(category) => {
                let pattern_hits = category.count_hits(&section.text);
                let cap = self.config.pattern_hit_cap.max(1);
                let pattern_score = pattern_hits.min(cap) as f64 / cap as f64;
                let heading_bonus = if category.heading_mentions_keyword(&section.heading) {
                    1.0
                } else {
                    0.0
                };
                let score = self.config.pattern_weight * pattern_score
                    + self.config.heading_weight * heading_bonus
                    + self.config.keyword_weight * overlap_ratio;
                (score, pattern_hits)
            }
            None => (overlap_ratio, 0),
        };

        SectionScore {
            index,
            score,
            pattern_hits,
            keyword_overlap,
        }
    }

    /// Lowercase word and number tokens, stopwords and short tokens removed
    pub fn tokenize(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        token_regex()
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|t| t.len() >= self.config.min_token_len && !self.catalog.is_stopword(t))
            .map(str::to_string)
            .collect()
    }

    fn build_excerpt(&self, sections: &[&DocumentSection], confidence: f64, strategy: MatchStrategy) -> Excerpt {
        let joined = sections
            .iter()
            .map(|s| s.text.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n");
        let (text, truncated) = truncate_chars(&joined, self.config.max_excerpt_chars);

        Excerpt {
            text,
            section_identifiers: sections.iter().map(|s| s.identifier.clone()).collect(),
            confidence,
            truncated,
            strategy,
        }
    }

    fn fallback_excerpt(&self, sections: &[DocumentSection]) -> Excerpt {
        // Sections tile the document, so their concatenation is the full text
        let full: String = sections.iter().map(|s| s.text.as_str()).collect();
        let (text, truncated) = truncate_chars(full.trim(), self.config.fallback_excerpt_chars);

        Excerpt {
            text,
            section_identifiers: Vec::new(),
            confidence: 0.0,
            truncated,
            strategy: MatchStrategy::Fallback,
        }
    }
}

fn section_answers_to_hint(section: &DocumentSection, hint: &str) -> bool {
    let hint = normalize_label(hint);
    !hint.is_empty()
        && (normalize_label(&section.identifier) == hint || normalize_label(&section.heading) == hint)
}

/// Truncate to at most `max_chars` characters, marker included. A bound too
/// small to hold the marker gets a plain cut.
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    let (keep, marker) = if max_chars > marker_len {
        (max_chars - marker_len, TRUNCATION_MARKER)
    } else {
        (max_chars, "")
    };
    let cut = text.char_indices().nth(keep).map(|(i, _)| i).unwrap_or(text.len());
    let mut truncated = text[..cut].to_string();
    truncated.push_str(marker);
    (truncated, true)
}

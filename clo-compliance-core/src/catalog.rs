// Pattern catalog - compiled, read-only form of CatalogConfig.
//
// Built once per run and shared by the section extractor, the rule matcher
// and the covenant pass.

use crate::config::{CatalogConfig, CategoryConfig, NamedPattern};
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// A compiled section heading marker
#[derive(Debug, Clone)]
pub struct HeadingPattern {
    pub name: String,
    pub regex: Regex,
}

/// Compiled patterns for one stipulation category
#[derive(Debug, Clone)]
pub struct CategoryPatterns {
    pub name: String,
    aliases: Vec<String>,
    pub patterns: Vec<Regex>,
    pub heading_keywords: Vec<String>,
}

impl CategoryPatterns {
    fn compile(config: &CategoryConfig) -> Result<Self> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| {
                compile_pattern(p)
                    .with_context(|| format!("Invalid pattern for category '{}'", config.name))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: config.name.clone(),
            aliases: config.aliases.iter().map(|a| normalize_label(a)).collect(),
            patterns,
            heading_keywords: config
                .heading_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        })
    }

    fn answers_to(&self, normalized: &str) -> bool {
        let own = normalize_label(&self.name);
        let candidates = std::iter::once(&own).chain(self.aliases.iter());
        for candidate in candidates {
            if candidate == normalized
                || singular(candidate) == normalized
                || candidate == singular(normalized)
            {
                return true;
            }
        }
        false
    }

    /// Number of pattern matches in `text`
    pub fn count_hits(&self, text: &str) -> usize {
        self.patterns.iter().map(|p| p.find_iter(text).count()).sum()
    }

    pub fn heading_mentions_keyword(&self, heading: &str) -> bool {
        let heading = heading.to_lowercase();
        self.heading_keywords.iter().any(|k| heading.contains(k.as_str()))
    }
}

/// A compiled covenant pattern. The first capture group, when present, is
/// reported as the matched value.
#[derive(Debug, Clone)]
pub struct CovenantPattern {
    pub name: String,
    pub regex: Regex,
}

#[derive(Debug, Clone)]
pub struct PatternCatalog {
    headings: Vec<HeadingPattern>,
    categories: Vec<CategoryPatterns>,
    covenants: Vec<CovenantPattern>,
    stopwords: HashSet<String>,
}

impl PatternCatalog {
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let mut headings = config
            .heading_patterns
            .iter()
            .map(compile_named)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .map(|(name, regex)| HeadingPattern { name, regex })
            .collect::<Vec<_>>();

        // Standalone section names are declared last, so explicit markers win ties
        if !config.named_sections.is_empty() {
            let alternatives = config
                .named_sections
                .iter()
                .map(|s| regex::escape(s.trim()))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"^[ \t]*(?P<title>{alternatives})[ \t]*:?[ \t]*$");
            headings.push(HeadingPattern {
                name: "named_section".to_string(),
                regex: compile_pattern(&pattern).context("Invalid named section list")?,
            });
        }

        let categories = config
            .categories
            .iter()
            .map(CategoryPatterns::compile)
            .collect::<Result<Vec<_>>>()?;

        let covenants = config
            .covenant_patterns
            .iter()
            .map(compile_named)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .map(|(name, regex)| CovenantPattern { name, regex })
            .collect();

        Ok(Self {
            headings,
            categories,
            covenants,
            stopwords: config.stopwords.iter().map(|s| s.to_lowercase()).collect(),
        })
    }

    pub fn heading_patterns(&self) -> &[HeadingPattern] {
        &self.headings
    }

    pub fn covenant_patterns(&self) -> &[CovenantPattern] {
        &self.covenants
    }

    /// Case-insensitive lookup over category names and aliases
    pub fn category(&self, name: &str) -> Option<&CategoryPatterns> {
        let normalized = normalize_label(name);
        if normalized.is_empty() {
            return None;
        }
        self.categories.iter().find(|c| c.answers_to(&normalized))
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default()).expect("Built-in pattern catalog must compile")
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .with_context(|| format!("Failed to compile pattern: {pattern}"))
}

fn compile_named(pattern: &NamedPattern) -> Result<(String, Regex)> {
    let regex = compile_pattern(&pattern.pattern)
        .with_context(|| format!("Invalid pattern '{}'", pattern.name))?;
    Ok((pattern.name.clone(), regex))
}

/// Lowercase, collapse whitespace, drop trailing '.' and ':'
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(&['.', ':'][..])
        .to_lowercase()
}

fn singular(label: &str) -> &str {
    label.strip_suffix('s').unwrap_or(label)
}

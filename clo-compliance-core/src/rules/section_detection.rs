use crate::catalog::PatternCatalog;
use crate::error::ExtractionError;
use crate::types::{DocumentSection, DocumentText};
use regex::Captures;

const PREAMBLE_IDENTIFIER: &str = "Preamble";
const CATCH_ALL_IDENTIFIER: &str = "Document";

// SectionExtractor - splits document text into heading-delimited sections
pub struct SectionExtractor<'a> {
    catalog: &'a PatternCatalog,
}

/// A heading occurrence before overlap resolution
#[derive(Debug, Clone)]
struct HeadingMatch {
    start: usize,
    end: usize,
    pattern_index: usize,
    identifier: String,
    heading: String,
}

impl<'a> SectionExtractor<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Split `document` into ordered, non-overlapping sections.
    ///
    /// Each heading match opens a section that runs to the next heading or to
    /// the end of the document. Non-blank text before the first heading
    /// becomes a preamble section, and a document without any heading comes
    /// back as a single catch-all section. Blank input is an error.
    pub fn extract_sections(&self, document: &DocumentText) -> Result<Vec<DocumentSection>, ExtractionError> {
        if document.is_blank() {
            return Err(ExtractionError::EmptyDocument {
                path: document.source.clone(),
            });
        }

        let (text, page_starts) = document.concatenated();
        let headings = self.resolve_overlaps(self.find_headings(&text));
        let page_of = |offset: usize| page_starts.partition_point(|&p| p <= offset).max(1);

        if headings.is_empty() {
            tracing::info!("   ⚠️  No section headings detected, using whole document as one section");
            return Ok(vec![DocumentSection {
                identifier: CATCH_ALL_IDENTIFIER.to_string(),
                heading: CATCH_ALL_IDENTIFIER.to_string(),
                start_offset: 0,
                end_offset: text.len(),
                page: 1,
                text,
            }]);
        }

        let mut sections = Vec::with_capacity(headings.len() + 1);

        let first_start = headings[0].start;
        if !text[..first_start].trim().is_empty() {
            sections.push(DocumentSection {
                identifier: PREAMBLE_IDENTIFIER.to_string(),
                heading: PREAMBLE_IDENTIFIER.to_string(),
                start_offset: 0,
                end_offset: first_start,
                page: 1,
                text: text[..first_start].to_string(),
            });
        }

        for (i, heading) in headings.iter().enumerate() {
            let end = headings.get(i + 1).map(|next| next.start).unwrap_or(text.len());
            sections.push(DocumentSection {
                identifier: heading.identifier.clone(),
                heading: heading.heading.clone(),
                start_offset: heading.start,
                end_offset: end,
                page: page_of(heading.start),
                text: text[heading.start..end].to_string(),
            });
        }

        tracing::info!(
            "   ✅ Extracted {} sections across {} pages",
            sections.len(),
            document.page_count()
        );
        Ok(sections)
    }

    fn find_headings(&self, text: &str) -> Vec<HeadingMatch> {
        let mut matches = Vec::new();
        for (pattern_index, pattern) in self.catalog.heading_patterns().iter().enumerate() {
            for caps in pattern.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                if whole.as_str().trim().is_empty() {
                    continue;
                }
                let (identifier, heading) = name_section(&caps);
                tracing::debug!(pattern = %pattern.name, offset = whole.start(), "heading match: {identifier}");
                matches.push(HeadingMatch {
                    start: whole.start(),
                    end: whole.end(),
                    pattern_index,
                    identifier,
                    heading,
                });
            }
        }
        matches
    }

    /// First match at an offset wins; ties go to the pattern declared first.
    /// A match starting inside an accepted heading is dropped.
    fn resolve_overlaps(&self, mut matches: Vec<HeadingMatch>) -> Vec<HeadingMatch> {
        matches.sort_by_key(|m| (m.start, m.pattern_index));

        let mut accepted: Vec<HeadingMatch> = Vec::with_capacity(matches.len());
        for candidate in matches {
            if let Some(last) = accepted.last() {
                if candidate.start < last.end {
                    continue;
                }
            }
            accepted.push(candidate);
        }
        accepted
    }
}

/// Build (identifier, heading) from the named groups of a heading match
fn name_section(caps: &Captures<'_>) -> (String, String) {
    let whole = caps.get(0).map(|m| m.as_str().trim()).unwrap_or_default();
    let title = caps
        .name("title")
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty());

    match (caps.name("kind"), caps.name("number")) {
        (Some(kind), Some(number)) => {
            let number = number.as_str();
            let number = if number.chars().all(|c| c.is_ascii_alphabetic()) {
                number.to_uppercase()
            } else {
                number.to_string()
            };
            let identifier = format!("{} {}", title_case(kind.as_str()), number);
            let heading = title.unwrap_or(whole).to_string();
            (identifier, heading)
        }
        _ => {
            let name = title.unwrap_or(whole).to_string();
            (name.clone(), name)
        }
    }
}

fn title_case(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, NamedPattern};
    use pretty_assertions::assert_eq;

    fn extract(text: &str) -> Vec<DocumentSection> {
        let catalog = PatternCatalog::default();
        SectionExtractor::new(&catalog)
            .extract_sections(&DocumentText::from_text("test", text))
            .unwrap()
    }

    #[test]
    fn test_numbered_heading_starts_section() {
        let sections = extract("SECTION 1. COVERAGE TESTS\nThe OC ratio shall exceed 1.2.");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].identifier, "Section 1");
        assert_eq!(sections[0].heading, "COVERAGE TESTS");
        assert_eq!(sections[0].start_offset, 0);
        assert!(sections[0].text.contains("OC ratio"));
    }

    #[test]
    fn test_sections_end_at_next_heading() {
        let text = "Preliminary statement.\nArticle V - Events of Default\nDefault text.\nSection 7.1: Limits\nLimit text.";
        let sections = extract(text);
        let ids: Vec<_> = sections.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Preamble", "Article V", "Section 7.1"]);
        assert_eq!(sections[1].heading, "Events of Default");
        assert_eq!(sections[1].end_offset, sections[2].start_offset);
        assert_eq!(sections[2].end_offset, text.len());
        for section in &sections {
            assert!(section.start_offset < section.end_offset);
            assert_eq!(section.text, &text[section.start_offset..section.end_offset]);
        }
    }

    #[test]
    fn test_named_sections_detected_on_own_line() {
        let sections = extract("Definitions\n\"Issuer\" means the issuer.\nCoverage Tests:\nThe tests.");
        let ids: Vec<_> = sections.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Definitions", "Coverage Tests"]);
    }

    #[test]
    fn test_wrapped_cross_reference_stays_in_section() {
        let text = "Section 2. Coverage Tests\n\
The Overcollateralization Ratio, calculated as set forth in\n\
Section 7.1 hereof, shall be at least 120%.\n\
Section 3. Concentration Limits\n\
No more than 2% per obligor.";
        let sections = extract(text);
        let ids: Vec<_> = sections.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Section 2", "Section 3"]);
        assert!(sections[0].text.contains("at least 120%"));
    }

    #[test]
    fn test_heading_without_title_still_opens_section() {
        let sections = extract("Article II\nThe Notes.\nSection 2.1 - Issuance\nbody");
        let ids: Vec<_> = sections.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Article II", "Section 2.1"]);
        assert_eq!(sections[0].heading, "Article II");
        assert_eq!(sections[1].heading, "Issuance");
    }

    #[test]
    fn test_lowercase_roman_letters_are_prose() {
        let text = "Article I\nScope.\nSection civil claims are excluded.\nArticle mix\nmore";
        let sections = extract(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].identifier, "Article I");
        assert!(sections[0].text.contains("civil claims"));
    }

    #[test]
    fn test_no_headings_falls_back_to_whole_document() {
        let text = "just some prose without any headings";
        let sections = extract(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].identifier, "Document");
        assert_eq!(sections[0].end_offset, text.len());
    }

    #[test]
    fn test_blank_document_is_error() {
        let catalog = PatternCatalog::default();
        let err = SectionExtractor::new(&catalog)
            .extract_sections(&DocumentText::from_text("blank", "  \n\t"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyDocument { .. }));
    }

    #[test]
    fn test_tie_broken_by_declaration_order() {
        let config = CatalogConfig {
            heading_patterns: vec![
                NamedPattern {
                    name: "short".into(),
                    pattern: r"^(?P<title>SECTION \d+)".into(),
                },
                NamedPattern {
                    name: "long".into(),
                    pattern: r"^(?P<title>SECTION \d+ [A-Z ]+)$".into(),
                },
            ],
            named_sections: vec![],
            ..CatalogConfig::default()
        };
        let catalog = PatternCatalog::from_config(&config).unwrap();
        let sections = SectionExtractor::new(&catalog)
            .extract_sections(&DocumentText::from_text("t", "SECTION 4 LIMITS\nbody"))
            .unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].identifier, "SECTION 4");
    }

    #[test]
    fn test_page_numbers_follow_page_breaks() {
        let catalog = PatternCatalog::default();
        let document = DocumentText::new(
            "paged",
            vec![
                "Section 1. Definitions\nterms".into(),
                "more terms\nSection 2. Covenants\ncovenant text".into(),
            ],
        );
        let sections = SectionExtractor::new(&catalog).extract_sections(&document).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].page, 1);
        assert_eq!(sections[1].page, 2);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "Article I\nfoo\nSection 1.1 Bar\nbaz\nCovenants\nqux";
        assert_eq!(extract(text), extract(text));
    }
}

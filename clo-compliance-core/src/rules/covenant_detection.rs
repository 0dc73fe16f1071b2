use crate::catalog::PatternCatalog;
use crate::types::{CovenantMatch, DocumentSection};

// CovenantDetector - runs the covenant patterns over every extracted section
pub struct CovenantDetector<'a> {
    catalog: &'a PatternCatalog,
}

impl<'a> CovenantDetector<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self { catalog }
    }

    /// All covenant pattern hits, ordered by document offset and then by
    /// pattern declaration order.
    pub fn detect(&self, sections: &[DocumentSection]) -> Vec<CovenantMatch> {
        tracing::info!(
            "🔍 Checking {} covenant patterns against {} sections",
            self.catalog.covenant_patterns().len(),
            sections.len()
        );

        let mut matches = Vec::new();
        for section in sections {
            for pattern in self.catalog.covenant_patterns() {
                for caps in pattern.regex.captures_iter(&section.text) {
                    let Some(whole) = caps.get(0) else { continue };
                    matches.push((
                        pattern_order(self.catalog, &pattern.name),
                        CovenantMatch {
                            pattern: pattern.name.clone(),
                            section_identifier: section.identifier.clone(),
                            matched_text: collapse_whitespace(whole.as_str()),
                            value: caps.get(1).map(|m| m.as_str().trim().to_string()),
                            offset: section.start_offset + whole.start(),
                        },
                    ));
                }
            }
        }

        matches.sort_by_key(|(order, m)| (m.offset, *order));
        tracing::info!("   ✅ Found {} covenant matches", matches.len());
        matches.into_iter().map(|(_, m)| m).collect()
    }
}

fn pattern_order(catalog: &PatternCatalog, name: &str) -> usize {
    catalog
        .covenant_patterns()
        .iter()
        .position(|p| p.name == name)
        .unwrap_or(usize::MAX)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::section_detection::SectionExtractor;
    use crate::types::DocumentText;

    fn detect(text: &str) -> Vec<CovenantMatch> {
        let catalog = PatternCatalog::default();
        let sections = SectionExtractor::new(&catalog)
            .extract_sections(&DocumentText::from_text("t", text))
            .unwrap();
        CovenantDetector::new(&catalog).detect(&sections)
    }

    #[test]
    fn test_ratio_thresholds_are_captured() {
        let matches = detect("Section 2. Coverage Tests\nThe Overcollateralization Ratio of 120% applies.");
        let oc = matches.iter().find(|m| m.pattern == "oc_ratio").unwrap();
        assert_eq!(oc.value.as_deref(), Some("120%"));
        assert_eq!(oc.section_identifier, "Section 2");
    }

    #[test]
    fn test_offsets_are_absolute_and_ordered() {
        let text = "Section 1. Fees\nA fee of $1,000.00 is due.\nSection 2. Limits\nUp to 5% per obligor.";
        let matches = detect(text);
        let dollar = matches.iter().find(|m| m.pattern == "dollar_amount").unwrap();
        assert_eq!(dollar.value.as_deref(), Some("1,000.00"));
        assert!(text[dollar.offset..].starts_with("$1,000.00"));

        let percent = matches.iter().find(|m| m.pattern == "percentage").unwrap();
        assert_eq!(percent.section_identifier, "Section 2");
        assert!(matches.windows(2).all(|w| w[0].offset <= w[1].offset));
    }

    #[test]
    fn test_prose_without_covenants_has_no_matches() {
        assert!(detect("Section 1. Recitals\nThe parties agree as follows.").is_empty());
    }
}

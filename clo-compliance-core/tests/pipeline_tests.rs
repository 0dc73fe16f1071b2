//! Pipeline tests for a full compliance run.
//!
//! Each run goes through the orchestrator with real stipulation files and
//! either fixture documents or a stub preprocessor. Judgement backends are
//! stubs, so no network is needed.
//!
//! - Evaluation: row order, section matching, CSV round-trip
//! - Failure paths: FAILED state, no report written, stage ordering
//! - Section extraction properties

use clo_compliance_core::error::JudgementTransportError;
use clo_compliance_core::judge::{ComplianceJudge, JudgementBackend, JudgementPrompt};
use clo_compliance_core::preprocessors::DocumentPreprocessor;
use clo_compliance_core::report::read_report_csv;
use clo_compliance_core::rules::SectionExtractor;
use clo_compliance_core::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Fixture helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures")
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap_or_else(|e| panic!("Cannot write {}: {e}", path.display()));
    path
}

/// Config with no backoff so retry tests stay fast
fn test_config() -> ComplianceConfig {
    let mut config = ComplianceConfig::default();
    config.judge.initial_backoff_ms = 0;
    config
}

fn orchestrator(backend: impl JudgementBackend + 'static) -> ComplianceOrchestrator {
    let config = test_config();
    let judge = ComplianceJudge::new(Box::new(backend), config.judge.clone());
    ComplianceOrchestrator::new(config, judge).expect("default catalog compiles")
}

/// PASS when the excerpt contains the given phrase, FAIL otherwise
struct PhraseBackend {
    phrase: &'static str,
}

impl JudgementBackend for PhraseBackend {
    fn judge(&self, prompt: &JudgementPrompt) -> Result<String, JudgementTransportError> {
        if prompt.excerpt.contains(self.phrase) {
            Ok(format!(
                "1. Compliance Status: PASS\n2. Explanation: The excerpt states \"{}\".\n3. Relevant Excerpts: n/a",
                self.phrase
            ))
        } else {
            Ok("1. Compliance Status: FAIL\n2. Explanation: The requirement is not met.".to_string())
        }
    }

    fn name(&self) -> &str {
        "PhraseBackend"
    }
}

/// Every call fails with a retryable transport error
struct UnreachableBackend {
    calls: Arc<AtomicUsize>,
}

impl JudgementBackend for UnreachableBackend {
    fn judge(&self, _prompt: &JudgementPrompt) -> Result<String, JudgementTransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(JudgementTransportError::Transport {
            message: "connection refused".to_string(),
        })
    }

    fn name(&self) -> &str {
        "UnreachableBackend"
    }
}

/// Returns fixed text and counts how often it was asked
struct CountingPreprocessor {
    text: String,
    calls: Arc<AtomicUsize>,
}

impl DocumentPreprocessor for CountingPreprocessor {
    fn extract_from_bytes(&self, source: &str, _bytes: &[u8]) -> Result<DocumentText, ExtractionError> {
        Ok(DocumentText::from_text(source, &self.text))
    }

    fn extract(&self, path: &Path) -> Result<DocumentText, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.extract_from_bytes(&path.display().to_string(), &[])
    }

    fn name(&self) -> &str {
        "CountingPreprocessor"
    }

    fn supports_file_type(&self, _path: &Path) -> bool {
        true
    }
}

// ============================================================================
// Evaluation runs
// ============================================================================

mod evaluation {
    use super::*;

    #[test]
    fn coverage_scenario_passes_with_confident_match() {
        let dir = tempfile::tempdir().unwrap();
        let document = write_file(
            dir.path(),
            "indenture.txt",
            "SECTION 1. COVERAGE TESTS\nThe OC ratio shall exceed 1.2.",
        );
        let stips = write_file(
            dir.path(),
            "stips.csv",
            "id,category,description\nS1,Coverage Test,OC ratio must exceed 1.2\n",
        );
        let output = dir.path().join("report.csv");

        let mut orchestrator = orchestrator(PhraseBackend { phrase: "shall exceed 1.2" });
        let run = orchestrator.run_evaluation(&document, &stips, &output).unwrap();

        assert_eq!(orchestrator.state(), RunState::Done);
        let row = &run.report.rows[0];
        assert_eq!(row.stipulation_id, "S1");
        assert_eq!(row.status, ComplianceStatus::Pass);
        assert_eq!(row.section, "Section 1");
        assert!(row.match_confidence > 0.0);
    }

    #[test]
    fn fixture_rows_follow_stipulation_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");

        let mut orchestrator = orchestrator(PhraseBackend { phrase: "at least 120%" });
        let run = orchestrator
            .run_evaluation(
                &fixtures_dir().join("indenture.txt"),
                &fixtures_dir().join("stipulations.csv"),
                &output,
            )
            .unwrap();

        let ids: Vec<_> = run.report.rows.iter().map(|r| r.stipulation_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3", "S4"]);
        assert_eq!(run.report.summary.total, 4);
        assert_eq!(run.report.metadata.page_count, 1);

        let sections: Vec<_> = run.report.rows.iter().map(|r| r.section.as_str()).collect();
        assert_eq!(&sections[..3], &["Section 2", "Section 3", "Section 4"]);
        assert_eq!(run.report.rows[0].status, ComplianceStatus::Pass);
        assert_eq!(run.report.rows[1].status, ComplianceStatus::Fail);
    }

    #[test]
    fn csv_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out").join("report.csv");

        let mut orchestrator = orchestrator(PhraseBackend { phrase: "Event of Default" });
        let run = orchestrator
            .run_evaluation(
                &fixtures_dir().join("indenture.txt"),
                &fixtures_dir().join("stipulations.csv"),
                &output,
            )
            .unwrap();
        assert_eq!(run.report_path, output);

        let rows = read_report_csv(&output).unwrap();
        assert_eq!(rows.len(), run.report.rows.len());
        for (read, written) in rows.iter().zip(&run.report.rows) {
            assert_eq!(read.stipulation_id, written.stipulation_id);
            assert_eq!(read.status, written.status);
            assert_eq!(read.explanation, written.explanation);
        }
    }

    #[test]
    fn duplicate_ids_produce_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let stips = write_file(
            dir.path(),
            "stips.csv",
            "id,category,description\nS1,Coverage Test,OC ratio must exceed 1.2\nS1,Coverage Test,duplicate\n",
        );
        let output = dir.path().join("report.csv");

        let mut orchestrator = orchestrator(PhraseBackend { phrase: "120%" });
        let run = orchestrator
            .run_evaluation(&fixtures_dir().join("indenture.txt"), &stips, &output)
            .unwrap();

        assert_eq!(run.report.rows.len(), 1);
        assert_eq!(run.report.metadata.rejected_rows.len(), 1);
        assert_eq!(run.report.metadata.rejected_rows[0].id.as_deref(), Some("S1"));
    }

    #[test]
    fn unreachable_judge_degrades_to_unclear() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut orchestrator = orchestrator(UnreachableBackend { calls: calls.clone() });
        let run = orchestrator
            .run_evaluation(
                &fixtures_dir().join("indenture.txt"),
                &fixtures_dir().join("stipulations.csv"),
                &output,
            )
            .unwrap();

        assert_eq!(orchestrator.state(), RunState::Done);
        assert_eq!(run.report.summary.unclear, 4);
        assert!(run.report.rows.iter().all(|r| !r.explanation.is_empty()));
        // Default policy: three attempts per stipulation
        assert_eq!(calls.load(Ordering::SeqCst), 12);
        assert!(output.exists());
    }
}

// ============================================================================
// Failure paths
// ============================================================================

mod failures {
    use super::*;

    #[test]
    fn empty_document_fails_without_report() {
        let dir = tempfile::tempdir().unwrap();
        let document = write_file(dir.path(), "blank.txt", "  \n \n");
        let output = dir.path().join("report.csv");

        let mut orchestrator = orchestrator(PhraseBackend { phrase: "x" });
        let err = orchestrator
            .run_evaluation(&document, &fixtures_dir().join("stipulations.csv"), &output)
            .unwrap_err();

        assert!(matches!(err, RunError::Extraction(ExtractionError::EmptyDocument { .. })));
        assert_eq!(orchestrator.state(), RunState::Failed);
        assert!(!output.exists());
    }

    #[test]
    fn missing_description_column_stops_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let stips = write_file(dir.path(), "stips.csv", "id,category\nS1,Coverage Test\n");
        let output = dir.path().join("report.csv");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut orchestrator = orchestrator(PhraseBackend { phrase: "x" }).with_preprocessor(Box::new(
            CountingPreprocessor {
                text: "SECTION 1. COVERAGE TESTS\nbody".to_string(),
                calls: calls.clone(),
            },
        ));
        let err = orchestrator
            .run_evaluation(Path::new("indenture.pdf"), &stips, &output)
            .unwrap_err();

        match err {
            RunError::Validation(ValidationError::MissingColumn { column, .. }) => assert_eq!(column, "description"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(orchestrator.state(), RunState::Failed);
        assert!(!output.exists());
    }

    #[test]
    fn unsupported_document_type_fails() {
        let dir = tempfile::tempdir().unwrap();
        let document = write_file(dir.path(), "indenture.docx", "not supported");
        let output = dir.path().join("report.csv");

        let mut orchestrator = orchestrator(PhraseBackend { phrase: "x" });
        let err = orchestrator
            .run_evaluation(&document, &fixtures_dir().join("stipulations.csv"), &output)
            .unwrap_err();
        assert!(matches!(err, RunError::Extraction(ExtractionError::UnsupportedFormat { .. })));
        assert!(!output.exists());
    }
}

// ============================================================================
// Covenant extraction
// ============================================================================

mod covenants {
    use super::*;

    #[test]
    fn fixture_covenants_are_found_without_judgement() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut orchestrator = orchestrator(UnreachableBackend { calls: calls.clone() });
        let extraction = orchestrator
            .extract_covenants(&fixtures_dir().join("indenture.txt"))
            .unwrap();

        let ids: Vec<_> = extraction.sections.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Preamble", "Section 1", "Section 2", "Section 3", "Section 4"]);

        let trigger = extraction
            .matches
            .iter()
            .find(|m| m.pattern == "covenant_trigger")
            .expect("falls-below trigger");
        assert_eq!(trigger.section_identifier, "Section 2");
        assert!(extraction.matches.iter().any(|m| m.pattern == "percentage" && m.value.as_deref() == Some("7.5")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

// ============================================================================
// Section extraction properties
// ============================================================================

mod section_properties {
    use super::*;
    use proptest::prelude::*;

    fn document_lines() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                "Section [1-9]\\. [A-Z][a-z]{2,8}",
                "Article [IVX]{1,3} - [A-Z][a-z]{2,8}",
                "Covenants",
                "[a-z ]{0,40}",
            ],
            1..12,
        )
        .prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn non_blank_text_yields_contiguous_sections(text in document_lines()) {
            prop_assume!(!text.trim().is_empty());
            let catalog = PatternCatalog::default();
            let extractor = SectionExtractor::new(&catalog);
            let document = DocumentText::from_text("prop", &text);

            let sections = extractor.extract_sections(&document).unwrap();
            prop_assert!(!sections.is_empty());
            prop_assert_eq!(sections.last().unwrap().end_offset, text.len());
            for pair in sections.windows(2) {
                prop_assert_eq!(pair[0].end_offset, pair[1].start_offset);
            }
            for section in &sections {
                prop_assert!(section.start_offset < section.end_offset);
                prop_assert_eq!(&section.text, &text[section.start_offset..section.end_offset]);
            }

            prop_assert_eq!(extractor.extract_sections(&document).unwrap(), sections);
        }
    }
}

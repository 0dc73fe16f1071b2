use crate::catalog::PatternCatalog;
use crate::config::ComplianceConfig;
use crate::error::RunError;
use crate::judge::ComplianceJudge;
use crate::loader::load_stipulations;
use crate::preprocessors::{AutoPreprocessor, DocumentPreprocessor};
use crate::report::{write_report, ComplianceReport, ReportBuilder, ReportMetadata};
use crate::rules::{CovenantDetector, RuleMatcher, SectionExtractor};
use crate::types::*;
use anyhow::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Simple profiler for timing pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        tracing::info!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        tracing::info!("📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            tracing::info!("   {:.<35} {:.0}ms ({:.1}%)", step, duration.as_millis(), percentage);
        }
        tracing::info!("   {:.<35} {:.0}ms", "TOTAL", total.as_millis());
    }
}

/// Lifecycle of one run. `Failed` is only entered while loading rules or
/// extracting sections; later problems degrade individual results instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    LoadingRules,
    ExtractingSections,
    Evaluating,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::LoadingRules => "LOADING_RULES",
            Self::ExtractingSections => "EXTRACTING_SECTIONS",
            Self::Evaluating => "EVALUATING",
            Self::Reporting => "REPORTING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        })
    }
}

/// Outcome of a completed evaluation
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    pub report: ComplianceReport,
    /// Where the report was written; differs from the requested path on fallback
    pub report_path: PathBuf,
}

/// Document + stipulations → compliance report
pub struct ComplianceOrchestrator {
    config: ComplianceConfig,
    catalog: PatternCatalog,
    preprocessor: Box<dyn DocumentPreprocessor>,
    judge: ComplianceJudge,
    state: RunState,
    profile: bool,
}

impl ComplianceOrchestrator {
    /// Compiles the pattern catalog from `config`; invalid patterns are an error
    pub fn new(config: ComplianceConfig, judge: ComplianceJudge) -> Result<Self> {
        let catalog = PatternCatalog::from_config(&config.catalog)?;
        Ok(Self {
            config,
            catalog,
            preprocessor: Box::new(AutoPreprocessor::default()),
            judge,
            state: RunState::Idle,
            profile: false,
        })
    }

    pub fn with_preprocessor(mut self, preprocessor: Box<dyn DocumentPreprocessor>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profile = enabled;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    fn transition(&mut self, next: RunState) {
        tracing::info!("🔄 {} → {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: impl Into<RunError>) -> RunError {
        let error = error.into();
        self.transition(RunState::Failed);
        tracing::error!("❌ Run failed: {error}");
        error
    }

    /// Evaluate every stipulation against the document and write the report.
    ///
    /// Stipulations are validated before the document is touched. No report
    /// is written when either step fails.
    pub fn run_evaluation(
        &mut self,
        document: &Path,
        stipulations: &Path,
        output: &Path,
    ) -> Result<EvaluationRun, RunError> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(self.profile);

        self.transition(RunState::LoadingRules);
        let loaded = match profiler.time_step("Load stipulations", || load_stipulations(stipulations)) {
            Ok(loaded) => loaded,
            Err(e) => return Err(self.fail(e)),
        };

        self.transition(RunState::ExtractingSections);
        let (text, sections) = match profiler.time_step("Extract sections", || self.extract(document)) {
            Ok(extracted) => extracted,
            Err(e) => return Err(self.fail(e)),
        };

        self.transition(RunState::Evaluating);
        let metadata = ReportMetadata {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            document: document.display().to_string(),
            document_sha256: fingerprint(document),
            page_count: text.page_count(),
            section_count: sections.len(),
            stipulations_file: stipulations.display().to_string(),
            rejected_rows: loaded.rejected.clone(),
            judgement_backend: self.judge.backend_name().to_string(),
        };
        let report = profiler.time_step("Evaluate stipulations", || {
            self.evaluate(&loaded.stipulations, &sections, metadata)
        });

        self.transition(RunState::Reporting);
        let format = self.config.report.format;
        let report_path = profiler.time_step("Write report", || write_report(&report, output, format))?;

        self.transition(RunState::Done);
        profiler.log_summary();
        tracing::info!(
            "⏱️  Total processing time: {:.3}s",
            start_time.elapsed().as_secs_f64()
        );

        Ok(EvaluationRun { report, report_path })
    }

    /// Section listing and covenant pattern matches. No judgement calls.
    pub fn extract_covenants(&mut self, document: &Path) -> Result<CovenantExtraction, RunError> {
        let mut profiler = StepProfiler::new(self.profile);

        self.transition(RunState::ExtractingSections);
        let (_, sections) = match profiler.time_step("Extract sections", || self.extract(document)) {
            Ok(extracted) => extracted,
            Err(e) => return Err(self.fail(e)),
        };

        let matches = profiler.time_step("Detect covenants", || {
            CovenantDetector::new(&self.catalog).detect(&sections)
        });

        self.transition(RunState::Done);
        profiler.log_summary();

        Ok(CovenantExtraction {
            document: document.display().to_string(),
            sections: sections.iter().map(SectionSummary::from).collect(),
            matches,
        })
    }

    fn extract(&self, document: &Path) -> Result<(DocumentText, Vec<DocumentSection>), RunError> {
        tracing::info!("📄 Extracting text with {}", self.preprocessor.name());
        let text = self.preprocessor.extract(document)?;
        let sections = SectionExtractor::new(&self.catalog).extract_sections(&text)?;
        Ok((text, sections))
    }

    fn evaluate(
        &self,
        stipulations: &[Stipulation],
        sections: &[DocumentSection],
        metadata: ReportMetadata,
    ) -> ComplianceReport {
        let matcher = RuleMatcher::new(&self.catalog, &self.config.matcher);
        let mut builder = ReportBuilder::new(metadata).include_excerpts(self.config.report.include_excerpts);

        tracing::info!(
            "⚖️  Evaluating {} stipulations with {}",
            stipulations.len(),
            self.judge.backend_name()
        );
        for (i, stipulation) in stipulations.iter().enumerate() {
            tracing::debug!("Processing check {}/{}: {}", i + 1, stipulations.len(), stipulation.id);
            let excerpt = matcher.match_stipulation(stipulation, sections);
            let result = self.judge.evaluate(stipulation, &excerpt);
            tracing::info!("   {} {} ({})", status_icon(result.status), stipulation.id, result.status);
            builder.add(stipulation, result);
        }

        builder.build()
    }
}

fn status_icon(status: ComplianceStatus) -> &'static str {
    match status {
        ComplianceStatus::Pass => "✅",
        ComplianceStatus::Fail => "❌",
        ComplianceStatus::Unclear => "❔",
    }
}

/// SHA-256 of the document bytes, hex encoded
pub fn fingerprint(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => format!("{:x}", Sha256::digest(&bytes)),
        Err(e) => {
            tracing::warn!("⚠️  Could not fingerprint {}: {e}", path.display());
            String::new()
        }
    }
}

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use clo_compliance::{
    default_covenants_path, default_report_path, select_backend, ComplianceConfig, ComplianceJudge,
    ComplianceOrchestrator, ComplianceStatus, EvaluationRun, ReportFormat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Judge every stipulation and write a compliance report
    Evaluate,
    /// List sections and covenant pattern matches, no judgement calls
    ExtractCovenants,
}

#[derive(Parser)]
#[command(name = "clo-compliance")]
#[command(about = "Checks a CLO indenture against a list of compliance stipulations")]
struct Args {
    /// Path to the indenture (PDF or plain text)
    #[arg(short, long, visible_alias = "pdf", required_unless_present = "show_configs")]
    document: Option<PathBuf>,

    /// Path to the stipulations file (CSV, TSV or spreadsheet)
    #[arg(short, long)]
    stips: Option<PathBuf>,

    /// What to do with the document
    #[arg(short, long, value_enum, default_value = "evaluate")]
    mode: Mode,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output file path (defaults to the configured output directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format: csv, json or text
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Never call the judgement endpoint; every stipulation is UNCLEAR
    #[arg(long)]
    offline: bool,

    /// Log timings of each pipeline step
    #[arg(long)]
    profile: bool,

    /// Print the default configuration as YAML and exit
    #[arg(long)]
    show_configs: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("❌ {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    if args.show_configs {
        let yaml = serde_yaml::to_string(&ComplianceConfig::default()).context("Failed to render default config")?;
        println!("{yaml}");
        return Ok(ExitCode::SUCCESS);
    }

    println!("🦀 CLO Compliance Checker");

    let mut config = ComplianceConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {config_path}");
    } else {
        println!("📋 Using default config");
    }

    // Apply CLI overrides to config
    if let Some(format) = args.format {
        config.report.format = format;
    }

    let document = args.document.clone().context("--document is required")?;
    let backend = select_backend(&config.llm, args.offline || args.mode == Mode::ExtractCovenants);
    let judge = ComplianceJudge::new(backend, config.judge.clone());
    let mut orchestrator = ComplianceOrchestrator::new(config.clone(), judge)
        .context("Failed to build pattern catalog")?
        .with_profiling(args.profile);

    println!("📄 Processing: {}", document.display());

    match args.mode {
        Mode::Evaluate => {
            let stips = args
                .stips
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.paths.stipulations_file));
            let output = args.output.clone().unwrap_or_else(|| default_report_path(&config));

            match orchestrator.run_evaluation(&document, &stips, &output) {
                Ok(run) => {
                    print_summary(&run);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("❌ Compliance run failed ({}): {e}", orchestrator.state());
                    Ok(ExitCode::from(1))
                }
            }
        }
        Mode::ExtractCovenants => {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| default_covenants_path(&config, &document));

            match orchestrator.extract_covenants(&document) {
                Ok(extraction) => {
                    save_json(&extraction, &output)?;
                    println!("✅ Extracted {} sections", extraction.sections.len());
                    println!("   - Covenant matches: {}", extraction.matches.len());
                    println!("💾 Covenants saved to: {}", output.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("❌ Covenant extraction failed ({}): {e}", orchestrator.state());
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

fn print_summary(run: &EvaluationRun) {
    let summary = &run.report.summary;
    println!("✅ Evaluated {} stipulations", summary.total);
    println!("📊 Results:");
    println!("   - PASS:    {}", summary.count(ComplianceStatus::Pass));
    println!("   - FAIL:    {}", summary.count(ComplianceStatus::Fail));
    println!("   - UNCLEAR: {}", summary.count(ComplianceStatus::Unclear));
    if !run.report.metadata.rejected_rows.is_empty() {
        println!("⚠️  {} stipulation rows were rejected:", run.report.metadata.rejected_rows.len());
        for rejected in &run.report.metadata.rejected_rows {
            println!(
                "   - row {} ({}): {}",
                rejected.row,
                rejected.id.as_deref().unwrap_or("no id"),
                rejected.reason
            );
        }
    }
    println!("💾 Report saved to: {}", run.report_path.display());
}

fn save_json<T: serde::Serialize>(value: &T, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize covenant extraction")?;
    std::fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))
}

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pronunciation_rs::{
    aggregate_reports, compute_case_report, load_cases, AlignerKind, AssessmentConfig, Assessor,
    AssessorBuilder, CaseReport, Meta, Report,
};
use tracing_subscriber::EnvFilter;

#[path = "assessment_report/json_report_formatter.rs"]
mod json_report_formatter;

use json_report_formatter::ReportSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlignerChoice {
    Dtw,
    Greedy,
}

impl AlignerChoice {
    fn aligner_kind(self) -> AlignerKind {
        match self {
            Self::Dtw => AlignerKind::Dtw,
            Self::Greedy => AlignerKind::Greedy,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "assessment_report")]
#[command(about = "Run pronunciation assessment over a case file and write an aggregate report")]
struct Args {
    #[arg(
        long,
        env = "ASSESS_REPORT_CASES",
        default_value = "test-data/assessment/cases.json"
    )]
    cases: PathBuf,
    #[arg(long, env = "ASSESS_REPORT_CONFIG")]
    config: Option<PathBuf>,
    /// Output file, or `-` for stdout.
    #[arg(long, env = "ASSESS_REPORT_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "ASSESS_REPORT_LIMIT")]
    limit: Option<usize>,
    #[arg(long, env = "ASSESS_REPORT_OFFSET", default_value_t = 0)]
    offset: usize,
    #[arg(
        long,
        env = "ASSESS_REPORT_ALIGNER",
        value_enum,
        default_value_t = AlignerChoice::Dtw
    )]
    aligner: AlignerChoice,
    /// Exit non-zero when any case misses its expectation.
    #[arg(long, env = "ASSESS_REPORT_STRICT", default_value_t = false)]
    strict: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cases_path = resolve_path(&repo_root, &args.cases);
    let config_path = args.config.as_ref().map(|p| resolve_path(&repo_root, p));
    let sink = resolve_sink(&repo_root, args.out.as_ref());

    let mut cases = load_cases(&cases_path)
        .map_err(|err| format!("Failed to load cases '{}': {err}", cases_path.display()))?;
    if args.offset > 0 {
        cases = cases.into_iter().skip(args.offset).collect();
    }
    if let Some(limit) = args.limit {
        cases.truncate(limit);
    }
    if cases.is_empty() {
        return Err("No cases selected after applying offset/limit.".to_string());
    }

    let assessor = build_assessor(config_path.as_deref(), args.aligner)?;

    let progress = ProgressBar::new(cases.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("starting...");

    let started = Instant::now();
    let mut case_reports: Vec<CaseReport> = Vec::with_capacity(cases.len());
    for case in &cases {
        progress.set_message(case.id.clone());
        let assessment = assessor
            .assess(&case.input)
            .map_err(|err| format!("{}: assessment failed: {err}", case.id))?;
        case_reports.push(compute_case_report(case, &assessment));
        progress.inc(1);
    }
    progress.finish_with_message("done");
    tracing::info!(
        cases = case_reports.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch assessed"
    );

    let aggregates = aggregate_reports(&case_reports);
    let failures = aggregates.counts.expectation_failures;
    let report = Report {
        schema_version: 1,
        meta: Meta {
            generated_at: Utc::now().to_rfc3339(),
            cases_path: cases_path.to_string_lossy().into_owned(),
            config_path: config_path.map(|p| p.to_string_lossy().into_owned()),
            aligner: assessor.aligner_name().to_string(),
            case_count: case_reports.len(),
        },
        cases: case_reports,
        aggregates,
    };

    json_report_formatter::write_report(&sink, &report)?;
    if let ReportSink::File(_) = sink {
        println!("{}", sink.describe());
    }

    if args.strict && failures > 0 {
        return Err(format!("{failures} case(s) missed their expectation."));
    }
    Ok(())
}

fn build_assessor(config_path: Option<&Path>, aligner: AlignerChoice) -> Result<Assessor, String> {
    let builder = match config_path {
        Some(path) => {
            require_path_exists(path, "Missing assessment config.")?;
            AssessorBuilder::from_config_file(path)
                .map_err(|err| format!("Failed to load config: {err}"))?
        }
        None => AssessorBuilder::new(AssessmentConfig::default()),
    };
    builder
        .with_aligner_kind(aligner.aligner_kind())
        .build()
        .map_err(|err| format!("Failed to build Assessor: {err}"))
}

fn resolve_sink(repo_root: &Path, out: Option<&PathBuf>) -> ReportSink {
    match out {
        Some(path) if path.as_os_str() == "-" => ReportSink::Stdout,
        Some(path) => ReportSink::File(resolve_path(repo_root, path)),
        None => {
            let run_id = Utc::now().format("%Y%m%dT%H%M%SZ");
            ReportSink::File(
                repo_root
                    .join("target")
                    .join("assessment_reports")
                    .join(format!("assessment-report-{run_id}.json")),
            )
        }
    }
}

fn resolve_path(repo_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

fn require_path_exists(path: &Path, message: &str) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    Err(format!("{message} Missing path: {}", path.display()))
}

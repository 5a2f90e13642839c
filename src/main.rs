//! Cryptojacking Detector - Command Line Entry Point
//!
//! Loads the trained artifacts once, then classifies a telemetry table,
//! a single hand-entered record, a labeled table, or the built-in demo samples.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cryptojack_detector::{
    config::{AppConfig, LoggingConfig},
    formatter,
    metrics::DetectionMetrics,
    models::{ArtifactLoader, InferencePipeline},
    types::{DetectionReport, ReportPayload, TelemetrySample},
    Detector,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cryptojack-detector",
    version,
    about = "Detect cryptojacking in host resource telemetry"
)]
struct Cli {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(short, long, env = "CRYPTOJACK_CONFIG")]
    config: Option<PathBuf>,

    /// Emit a JSON report instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify every row of a telemetry CSV
    Detect { file: PathBuf },
    /// Classify one record given as key=value fields (missing fields are 0)
    Check {
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Compare predictions against the Label column of a CSV
    Evaluate { file: PathBuf },
    /// Run the built-in suspicious and normal samples
    Demo,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("cryptojack_detector={}", config.level).parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format.as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.init(),
        other => bail!("unknown log format '{}'", other),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::resolve(cli.config.as_deref())?;
    init_logging(&config.logging)?;
    info!("Starting Cryptojacking Detector");

    let bundle =
        ArtifactLoader::with_threads(config.artifacts.onnx_threads).load(&config.artifacts);
    let pipeline = InferencePipeline::new(bundle);
    let metrics = Arc::new(DetectionMetrics::new());
    let detector = Detector::new(config.contract.to_contract(), pipeline, metrics.clone());

    match cli.command {
        Command::Detect { file } => {
            let summary = detector.detect_table(open(&file)?)?;
            if cli.json {
                emit(&file.display().to_string(), ReportPayload::Batch(summary))?;
            } else {
                println!("Total samples:          {}", summary.total_samples);
                println!("Cryptojacking detected: {}", summary.cryptojacking_detected);
                println!("Normal samples:         {}", summary.normal_samples);
            }
        }
        Command::Check { fields } => {
            let fields: HashMap<String, String> = fields.into_iter().collect();
            let verdict = detector.detect_single(&fields)?;
            if cli.json {
                emit("form", ReportPayload::Single(verdict))?;
            } else {
                println!("{} ({:.2}% confidence)", verdict.label, verdict.confidence);
            }
        }
        Command::Evaluate { file } => {
            let report = detector.evaluate_table(open(&file)?)?;
            if cli.json {
                emit(&file.display().to_string(), ReportPayload::Evaluation(report))?;
            } else {
                for row in &report.rows {
                    println!(
                        "{} Actual: {:6} | Predicted: {:6} | Confidence: {:5.1}%",
                        if row.is_correct() { "✓" } else { "✗" },
                        short_label(row.actual.is_threat()),
                        short_label(row.predicted.is_threat()),
                        row.confidence
                    );
                }
                println!("Actual cryptojacking samples:    {}", report.actual_cryptojacking);
                println!("Predicted cryptojacking samples: {}", report.predicted_cryptojacking);
                println!("Accuracy: {:.1}%", report.accuracy);
            }
        }
        Command::Demo => {
            let samples = [
                ("Suspicious Activity Sample", TelemetrySample::suspicious_example()),
                ("Normal Activity Sample", TelemetrySample::normal_example()),
            ];
            for (name, sample) in &samples {
                let result = detector.detect_sample(sample)?;
                let verdict = formatter::format_verdict(&result);
                if cli.json {
                    emit("demo", ReportPayload::Single(verdict))?;
                } else {
                    println!("{}", name);
                    println!("  Prediction: {}", verdict.label);
                    println!("  Confidence: {:.2}%", verdict.confidence);
                    println!(
                        "  Probability [Normal, Cryptojacking]: [{:.4}, {:.4}]",
                        result.probabilities[0], result.probabilities[1]
                    );
                }
            }
        }
    }

    metrics.print_summary();
    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn emit(source: &str, payload: ReportPayload) -> Result<()> {
    let report = DetectionReport::new(source, payload);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn short_label(is_threat: bool) -> &'static str {
    if is_threat {
        "CRYPTO"
    } else {
        "NORMAL"
    }
}

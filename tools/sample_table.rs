//! Sample Telemetry Table Generator
//!
//! Writes a labeled telemetry CSV for exercising `detect` and `evaluate`.

use cryptojack_detector::feature_contract::{FEATURES, FEATURE_COUNT};
use rand::Rng;
use std::io;
use tracing::info;

/// Telemetry generator for testing
struct TelemetryGenerator {
    rng: rand::rngs::ThreadRng,
    sample_counter: u64,
}

impl TelemetryGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            sample_counter: 0,
        }
    }

    /// Generate a host at ordinary load
    fn generate_normal(&mut self) -> [f64; FEATURE_COUNT] {
        self.sample_counter += 1;
        [
            self.rng.gen_range(50.0..400.0),
            self.rng.gen_range(1_000.0..60_000.0),
            self.rng.gen_range(0.0..4.0_f64).floor(),
            self.rng.gen_range(0.01..0.35),
            self.rng.gen_range(0.0..20.0),
            self.rng.gen_range(0.0..25.0),
            self.rng.gen_range(5_000.0..200_000.0),
            self.rng.gen_range(10_000.0..400_000.0),
            self.rng.gen_range(10.0..300.0),
            self.rng.gen_range(10.0..400.0),
            self.rng.gen_range(0.0..5.0),
            self.rng.gen_range(0.0..5.0),
            self.rng.gen_range(0.0..40.0),
            self.rng.gen_range(0.0..50.0),
        ]
    }

    /// Generate a host mining in the background
    fn generate_cryptojacking(&mut self) -> [f64; FEATURE_COUNT] {
        self.sample_counter += 1;
        [
            self.rng.gen_range(500.0..5_000.0),
            self.rng.gen_range(100_000.0..2_000_000.0),
            self.rng.gen_range(4.0..20.0_f64).floor(), // Worker processes
            self.rng.gen_range(0.80..1.0),             // Pegged CPU
            self.rng.gen_range(50.0..500.0),
            self.rng.gen_range(50.0..500.0),
            self.rng.gen_range(500.0..20_000.0), // Pool traffic only
            self.rng.gen_range(500.0..20_000.0),
            self.rng.gen_range(300.0..3_000.0),
            self.rng.gen_range(300.0..3_000.0),
            self.rng.gen_range(20.0..200.0),
            self.rng.gen_range(20.0..200.0),
            self.rng.gen_range(200.0..2_000.0),
            self.rng.gen_range(100.0..1_000.0),
        ]
    }
}

/// Positional `[count] [threat_rate]`, defaulting to 100 and 0.3.
fn parse_args(args: &[String]) -> anyhow::Result<(u64, f64)> {
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
    let threat_rate: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.3);
    if !(0.0..=1.0).contains(&threat_rate) {
        anyhow::bail!("threat rate must be between 0 and 1, got {}", threat_rate);
    }
    Ok((count, threat_rate))
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr, the table to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_table=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (count, threat_rate) = parse_args(&args)?;

    info!(count = count, threat_rate = threat_rate, "Generating sample table");

    let mut generator = TelemetryGenerator::new();
    let mut rng = rand::thread_rng();
    let mut writer = csv::Writer::from_writer(io::stdout().lock());

    let mut header = vec!["ID"];
    header.extend(FEATURES.iter().map(|f| f.name));
    header.push("Label");
    writer.write_record(&header)?;

    let mut normal_count = 0;
    let mut threat_count = 0;

    for _ in 0..count {
        let (values, label) = if rng.gen_bool(threat_rate) {
            threat_count += 1;
            (generator.generate_cryptojacking(), "1")
        } else {
            normal_count += 1;
            (generator.generate_normal(), "0")
        };

        let mut record = vec![generator.sample_counter.to_string()];
        record.extend(values.iter().map(|v| format!("{:.4}", v)));
        record.push(label.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(
        "Completed! Wrote {} samples ({} normal, {} cryptojacking)",
        count, normal_count, threat_count
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("sample-table")
            .chain(values.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args_defaults() {
        assert_eq!(parse_args(&args(&[])).unwrap(), (100, 0.3));
        assert_eq!(parse_args(&args(&["20", "1"])).unwrap(), (20, 1.0));
    }

    #[test]
    fn test_parse_args_rejects_bad_rate() {
        for rate in ["1.5", "-0.1", "NaN"] {
            assert!(parse_args(&args(&["10", rate])).is_err());
        }
    }
}

//! Zero Log CLI Application
//!
//! This is the command-line interface for the Zero Motorcycles log decoder.
//! It uses the zero-log-decoder library and adds:
//! - Reading log files (decoded in parallel)
//! - Configuration from TOML
//! - Merging MBB and BMS logs
//! - Writing CSV/TSV/JSON output

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use zero_log_decoder::dataset::EntryRecord;
use zero_log_decoder::{Decoder, LogDataset, MultiLogMerger, OutputFormat};

mod config;
mod report;

use report::Destination;

/// Timestamp layouts accepted by `--at`
const AT_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Zero Log CLI - Decode Zero Motorcycles log exports
#[derive(Parser, Debug)]
#[command(name = "zero-log-cli")]
#[command(about = "Decode Zero Motorcycles MBB/BMS text logs into CSV, TSV or JSON", long_about = None)]
#[command(version)]
struct Args {
    /// Decoded MBB (or BMS) log export
    #[arg(value_name = "LOGFILE")]
    log: Option<PathBuf>,

    /// BMS log(s) to merge with the main log (can be repeated)
    #[arg(long, value_name = "FILE")]
    bms: Vec<PathBuf>,

    /// Output format: csv, tsv or json (default: tsv)
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Render values without their units (mV readings become volts)
    #[arg(long)]
    omit_units: bool,

    /// Output file, `-` for stdout (default: LOGFILE with the format's extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the merged entry in effect at this time instead of rendering
    #[arg(long, value_name = "TIMESTAMP", value_parser = parse_timestamp)]
    at: Option<NaiveDateTime>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn parse_timestamp(text: &str) -> std::result::Result<NaiveDateTime, String> {
    AT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
        .ok_or_else(|| format!("expected a timestamp like 2018-05-13 10:09:00, got '{}'", text))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Zero Log CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", zero_log_decoder::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    let Some(primary_path) = primary_log(args.log.as_ref(), &app_config.input.files) else {
        println!("Zero Log CLI - No input specified");
        println!("\nQuick Start:");
        println!("  zero-log-cli VIN_MBB_2018-05-21.txt");
        println!("  zero-log-cli VIN_MBB_2018-05-21.txt --bms VIN_BMS0_2018-05-21.txt -f tsv");
        println!("\nUse --help for more options");
        return Ok(());
    };

    let mut secondary_paths = app_config.input.secondary.clone();
    for (i, path) in args.bms.iter().enumerate() {
        secondary_paths.insert(format!("bms{}", i), path.clone());
    }

    let decoder = Decoder::with_config(app_config.decoder.clone())?;
    let (primary, secondaries) = decode_all(&decoder, primary_path.clone(), secondary_paths)?;

    let format = args.format.unwrap_or(app_config.output.format);
    let omit_units = args.omit_units || app_config.output.omit_units;

    let rendered = if secondaries.is_empty() && args.at.is_none() {
        warn_skipped(primary.errors().len());
        primary.render(format, omit_units)?
    } else {
        let merger = MultiLogMerger::new(primary, secondaries);
        warn_skipped(merger.skipped_lines());
        if let Some(at) = args.at {
            return print_entry_at(&merger, at, omit_units);
        }
        merger.render(format, omit_units)?
    };

    let explicit = args.output.as_deref().or(app_config.output.output.as_deref());
    let destination = Destination::resolve(explicit, &primary_path, format);
    report::write_rendered(&rendered, &destination)?;

    Ok(())
}

/// The command-line log, else the first `[input] files` entry
fn primary_log(explicit: Option<&PathBuf>, files: &[PathBuf]) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.clone());
    }
    if let [first, rest @ ..] = files {
        if !rest.is_empty() {
            log::warn!(
                "[input] files lists {} logs; only {:?} is decoded, add the others to [input.secondary]",
                files.len(),
                first
            );
        }
    }
    files.first().cloned()
}

/// Decode the primary and every secondary log in parallel
fn decode_all(
    decoder: &Decoder,
    primary_path: PathBuf,
    secondary_paths: BTreeMap<String, PathBuf>,
) -> Result<(LogDataset, BTreeMap<String, LogDataset>)> {
    let jobs: Vec<(Option<String>, PathBuf)> = std::iter::once((None, primary_path))
        .chain(secondary_paths.into_iter().map(|(key, path)| (Some(key), path)))
        .collect();

    let decoded = jobs
        .par_iter()
        .map(|(key, path)| {
            decoder
                .decode_file(path)
                .with_context(|| format!("Failed to decode log file: {:?}", path))
                .map(|dataset| (key.clone(), dataset))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut decoded = decoded.into_iter();
    let (_, primary) = decoded.next().context("Primary log was not decoded")?;
    let secondaries = decoded
        .filter_map(|(key, dataset)| key.map(|key| (key, dataset)))
        .collect();
    Ok((primary, secondaries))
}

fn warn_skipped(count: usize) {
    if count > 0 {
        log::warn!("{} line(s) could not be decoded and were skipped", count);
    }
}

/// Print the merged entry in effect at `at` as JSON
fn print_entry_at(merger: &MultiLogMerger, at: NaiveDateTime, omit_units: bool) -> Result<()> {
    match merger.entry_for_timestamp(at) {
        Some(merged) => {
            let record = serde_json::json!({
                "source": merged.source,
                "entry": EntryRecord::new(&merged.entry, omit_units),
            });
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => println!("No entry at or before {}", at),
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "zero-log-cli",
            "mbb.txt",
            "--bms",
            "bms0.txt",
            "--format",
            "json",
            "--at",
            "2018-05-13 10:09:00",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.log, Some(PathBuf::from("mbb.txt")));
        assert_eq!(args.bms, vec![PathBuf::from("bms0.txt")]);
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.verbose, 2);
        assert!(args.at.is_some());

        assert!(Args::try_parse_from(["zero-log-cli", "mbb.txt", "--format", "xml"]).is_err());
        assert!(Args::try_parse_from(["zero-log-cli", "--at", "yesterday"]).is_err());
    }

    #[test]
    fn test_primary_log_selection() {
        let files = vec![PathBuf::from("a_MBB.txt"), PathBuf::from("b_MBB.txt")];
        let explicit = PathBuf::from("c_MBB.txt");
        assert_eq!(primary_log(Some(&explicit), &files), Some(explicit.clone()));
        assert_eq!(primary_log(None, &files), Some(PathBuf::from("a_MBB.txt")));
        assert_eq!(primary_log(None, &[]), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = parse_timestamp("2018-05-13 10:09:00").unwrap();
        assert_eq!(parse_timestamp("2018-05-13T10:09:00").unwrap(), expected);
        assert_eq!(parse_timestamp("05/13/2018 10:09:00").unwrap(), expected);
    }
}

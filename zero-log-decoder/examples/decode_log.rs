//! Standalone Zero log inspection tool
//!
//! Decodes an MBB or BMS text log export and prints the header, a summary
//! of segments and event types, and optionally the first entries.
//!
//! Usage:
//!   decode_log <log_file.txt> [--limit <count>]
//!
//! Example:
//!   decode_log 538SD9Z37GCG06073_MBB_2018-05-21.txt --limit 20

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use zero_log_decoder::{Decoder, LogDataset, LogEntry};

fn print_entry(entry: &LogEntry) {
    let timestamp = entry
        .timestamp
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:>6}  {}  [{} #{}]  {:<10} {:<12} {}",
        entry.sequence_number,
        timestamp,
        entry.segment_activity,
        entry.segment_id,
        entry.component,
        entry.event_type.map(|t| t.as_str()).unwrap_or(""),
        entry.event
    );
    for (key, value) in entry.conditions.iter() {
        println!("          {} = {}", key, value);
    }
}

fn print_summary(dataset: &LogDataset) {
    let entries = dataset.entries();

    println!("\n=== DECODING SUMMARY ===");
    println!("Entries decoded: {}", entries.len());
    println!("Lines skipped: {}", dataset.errors().len());
    println!(
        "Segments: {}",
        entries.last().map(|e| e.segment_id + 1).unwrap_or(0)
    );
    println!("Condition columns: {}", dataset.all_condition_keys().len());

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_event: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries {
        *by_type
            .entry(entry.event_type.map(|t| t.as_str()).unwrap_or("(none)"))
            .or_default() += 1;
        if !entry.event.is_empty() {
            *by_event.entry(entry.event.as_str()).or_default() += 1;
        }
    }

    println!("\nEvent types:");
    for (event_type, count) in &by_type {
        println!("  {}: {}", event_type, count);
    }

    if !by_event.is_empty() {
        println!("\nTop 10 Most Frequent Events:");
        let mut sorted: Vec<_> = by_event.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1));
        for (event, count) in sorted.iter().take(10) {
            println!("  {}: {} times", event, count);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <log_file.txt> [--limit <count>]", args[0]);
        std::process::exit(1);
    }

    let log_path = PathBuf::from(&args[1]);
    let mut limit = 0usize;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" if i + 1 < args.len() => {
                limit = args[i + 1].parse()?;
                i += 2;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    let dataset = Decoder::new().decode_file(&log_path)?;

    println!("=== HEADER ===");
    println!("{}", serde_json::to_string_pretty(&dataset.header().to_record())?);

    if limit > 0 {
        println!("\n=== FIRST {} ENTRIES ===", limit);
        for entry in dataset.entries().iter().take(limit) {
            print_entry(entry);
        }
    }

    for error in dataset.errors() {
        eprintln!("{}", error);
    }

    print_summary(&dataset);
    Ok(())
}

//! # AAR Inspect
//!
//! Command-line tool to print the index and entries of a recorded log.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::ExitCode;

use chronicle::model::{decode_message, MessageTypeRegistry};
use chronicle::replay::format::from_micros;
use chronicle::replay::LogStreamReader;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let show_entries = args.iter().any(|a| a == "--entries");
    let limit: usize = args
        .iter()
        .position(|a| a == "--limit")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(usize::MAX);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(log_path) = args.iter().skip(1).find(|a| !a.starts_with("--") && a.ends_with(".aarlog")) else {
        println!("Usage: aar_inspect <log.aarlog> [--entries] [--limit <n>] [--verbose]");
        println!();
        println!("Options:");
        println!("  --entries      Print every entry");
        println!("  --limit <n>    Stop after n entries");
        println!("  --verbose      Debug logging");
        return ExitCode::FAILURE;
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         CHRONICLE AAR INSPECT                                    ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let path = Path::new(log_path);
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            println!("Error: Could not open {log_path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut reader = match LogStreamReader::from_source(BufReader::new(file), name) {
        Ok(r) => r,
        Err(e) => {
            println!("Error: Could not load log: {e}");
            return ExitCode::FAILURE;
        }
    };

    let start = reader.record_start_micros();
    println!("┌─ LOG INFO ───────────────────────────────────────────────────────┐");
    println!("│ Name:               {}", reader.name());
    println!("│ Indexed:            {}", if reader.is_indexed() { "yes" } else { "no (scanned)" });
    println!("│ Data bytes:         {}", reader.data_end());
    println!("│ Recorded:           {:.3}s .. {:.3}s", from_micros(start), from_micros(reader.record_end_micros()));
    println!("│ Baseline actors:    {}", reader.baseline().len());
    println!("│ Keyframes:          {}", reader.keyframes().len());
    println!("│ Tags:               {}", reader.tags().len());
    println!("└──────────────────────────────────────────────────────────────────┘");

    if !reader.keyframes().is_empty() {
        println!();
        println!("┌─ KEYFRAMES ──────────────────────────────────────────────────────┐");
        for (i, k) in reader.keyframes().iter().enumerate() {
            println!(
                "│ [{i}] {:<16} t={:>10.3}s  offset={:<10} actors={}",
                k.name,
                k.timestamp(),
                k.offset,
                k.snapshot.len()
            );
        }
        println!("└──────────────────────────────────────────────────────────────────┘");
    }

    if !reader.tags().is_empty() {
        println!();
        println!("┌─ TAGS ───────────────────────────────────────────────────────────┐");
        for t in reader.tags().iter() {
            let keyframe = t
                .keyframe_micros
                .map_or_else(|| "-".to_owned(), |ts| format!("{:.3}s", from_micros(ts)));
            println!(
                "│ {:<16} t={:>10.3}s  keyframe={keyframe}  {}",
                t.name,
                from_micros(t.timestamp_micros),
                t.description
            );
        }
        println!("└──────────────────────────────────────────────────────────────────┘");
    }

    let registry = MessageTypeRegistry::new();
    let mut entries = 0usize;
    let mut undecodable = 0usize;
    if show_entries {
        println!();
        println!("┌─ ENTRIES ────────────────────────────────────────────────────────┐");
    }
    loop {
        if entries >= limit {
            break;
        }
        let entry = match reader.next_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                println!("│ damaged entry at {}: {e}", reader.position());
                break;
            }
        };
        entries += 1;
        let t = from_micros(entry.timestamp_micros);
        match decode_message(&entry.payload, &registry) {
            Ok(message) if show_entries => println!(
                "│ {t:>10.3}s  {:<28} about={} params={}",
                message.message_type().name(),
                message.about_actor.map_or_else(|| "-".to_owned(), |id| id.to_string()),
                message.params.len()
            ),
            Ok(_) => {}
            Err(e) => {
                undecodable += 1;
                if show_entries {
                    println!("│ {t:>10.3}s  <{} bytes, {e}>", entry.payload.len());
                }
            }
        }
    }
    if show_entries {
        println!("└──────────────────────────────────────────────────────────────────┘");
    }

    println!();
    println!("Entries: {entries}  (user-defined or unreadable types: {undecodable})");
    ExitCode::SUCCESS
}

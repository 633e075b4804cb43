//! Times a streaming import of one or more files into a temporary database.
//!
//! Usage: benchmark_import <file>... [--batch-size N]

use std::time::Instant;

use tabulite::import::{EventChannel, EventKind, FileInput, ImportOptions, ProgressEvent, import_all};
use tabulite::store::Store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    let mut opts = ImportOptions { progress_every: Some(100_000), ..ImportOptions::default() };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--batch-size" {
            opts.batch_size = args.next().ok_or("--batch-size needs a value")?.parse()?;
        } else {
            files.push(arg);
        }
    }
    if files.is_empty() {
        return Err("usage: benchmark_import <file>... [--batch-size N]".into());
    }

    let inputs: Vec<FileInput> = files
        .iter()
        .enumerate()
        .map(|(i, f)| FileInput::new(f.clone(), format!("bench{}", i + 1)))
        .collect();
    let events = EventChannel::new(|e: &ProgressEvent| {
        if let EventKind::ParseProgress { rows } = e.kind {
            eprintln!("{}: {rows} rows", e.path);
        }
    });

    let store = Store::open(None)?;
    let started = Instant::now();
    let run = import_all(&store, &inputs, &opts, &events);
    let elapsed = started.elapsed();

    let total: u64 = run.results.iter().map(|r| r.row_count).sum();
    for r in &run.results {
        println!("{} -> {}: {} rows", r.path, r.table_name, r.row_count);
    }
    if let Some(err) = &run.error {
        eprintln!("failures:\n{err}");
    }
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    println!(
        "imported {total} rows from {} file(s) in {:.2}s ({:.0} rows/s, batch size {})",
        run.results.len(),
        secs,
        total as f64 / secs,
        opts.batch_size
    );
    Ok(())
}

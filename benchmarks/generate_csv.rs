//! Writes a large synthetic CSV (or `.csv.gz`) for import benchmarks.
//!
//! Usage: generate_csv [path] [rows]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::Writer;
use rand::Rng;

const NAMES: &[&str] = &["ann", "bo", "cy", "dee", "ed", "flo", "gus", "hal", "ivy", "jo"];
const CITIES: &[&str] = &["Oslo", "Rome", "Lima", "Pune", "Kyiv", "Doha", "Cork", "Nice"];

fn generate_csv_chunked<W: Write>(
    out: W,
    total_rows: usize,
    chunk_size: usize,
) -> Result<W, Box<dyn std::error::Error>> {
    let mut wtr = Writer::from_writer(out);
    let mut rng = rand::rng();

    wtr.write_record(["id", "name", "city", "value", "flag", "note"])?;

    let mut id_counter = 0;
    while id_counter < total_rows {
        let end = std::cmp::min(id_counter + chunk_size, total_rows);
        for i in id_counter..end {
            let name = NAMES[rng.random_range(0..NAMES.len())];
            let city = CITIES[rng.random_range(0..CITIES.len())];
            let value: f64 = rng.random_range(0.0..10000.0);
            let flag: bool = rng.random();
            let note = if rng.random_ratio(1, 20) { "needs, quoting" } else { "" };
            wtr.write_record([
                i.to_string(),
                format!("{name}{i}"),
                city.to_string(),
                format!("{value:.2}"),
                flag.to_string(),
                note.to_string(),
            ])?;
        }
        wtr.flush()?;
        id_counter = end;
        eprintln!("Generated rows: {id_counter}/{total_rows}");
    }

    Ok(wtr.into_inner().map_err(|e| e.error().to_string())?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "synthetic_data.csv".to_string());
    let rows: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(1_000_000);

    if Path::new(&path).exists() {
        println!("File '{path}' already exists. Skipping generation.");
        return Ok(());
    }
    let file = BufWriter::new(File::create(&path)?);
    if path.ends_with(".gz") {
        let enc = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
        generate_csv_chunked(enc, rows, 100_000)?.finish()?.flush()?;
    } else {
        generate_csv_chunked(file, rows, 100_000)?.flush()?;
    }
    println!("Synthetic data generated at '{path}' ({rows} rows).");
    Ok(())
}

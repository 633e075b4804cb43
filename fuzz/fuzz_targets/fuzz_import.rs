#![no_main]
use libfuzzer_sys::fuzz_target;
use tabulite::import::{EventChannel, FileInput, ImportOptions, import_from_reader};

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 { return; }
    let Ok(mut conn) = rusqlite::Connection::open_in_memory() else { return };
    let input = FileInput::new("fuzz.csv", "fuzz");
    let opts = ImportOptions { batch_size: 7, progress_every: Some(3) };
    if let Ok(res) = import_from_reader(&mut conn, data, &input, &opts, &EventChannel::silent()) {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM fuzz", [], |r| r.get(0)).unwrap_or(-1);
        assert_eq!(n as u64, res.row_count);
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;
use tabulite::import::DelimitedReader;

fuzz_target!(|input: (bool, bool, &[u8])| {
    let (tab, has_header, data) = input;
    if data.len() > 65536 { return; }
    let delimiter = if tab { b'\t' } else { b',' };
    let Ok(mut rdr) = DelimitedReader::new(data, delimiter, has_header) else { return };
    let width = rdr.header().len();
    assert_eq!(rdr.header().columns().len(), width);
    while let Some(row) = rdr.next() {
        if row.is_err() {
            assert!(rdr.next().is_none());
            break;
        }
    }
});

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use shortreg_rows::RowSource;
use shortreg_xlsx::{ReaderOptions, XlsxPackage, XlsxRowReader};

const MAX_INPUT_BYTES: usize = 1024 * 1024;
const MAX_ROWS: usize = 100_000;

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_BYTES {
        return;
    }
    let Ok(mut package) = XlsxPackage::from_reader(Cursor::new(data)) else {
        return;
    };
    let _ = package.sheets();
    let reader = XlsxRowReader::open(&mut package, &ReaderOptions::default());
    for row in reader.rows().take(MAX_ROWS) {
        let _ = row;
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use shortreg_rows::{RowSource, RowSourceError};
use shortreg_xlsx::{parse_shared_strings, MalformedXmlPolicy, SharedStrings, XlsxRowReader};

/// Worksheet parts in the wild reach tens of megabytes; fuzzing gains nothing past this.
const MAX_INPUT_BYTES: usize = 256 * 1024;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, data)) = data.split_first() else {
        return;
    };
    let data = &data[..data.len().min(MAX_INPUT_BYTES)];

    // The low bit picks the malformed-XML policy; the rest splits the input into a shared-string
    // part and a worksheet part.
    let policy = if selector & 1 == 0 {
        MalformedXmlPolicy::StopSilently
    } else {
        MalformedXmlPolicy::Fail
    };
    let split = (usize::from(selector >> 1) * data.len()) / 128;
    let (sst, sheet) = data.split_at(split.min(data.len()));

    let shared = parse_shared_strings(sst).unwrap_or_else(|_| SharedStrings::default());
    let mut reader = XlsxRowReader::from_sheet_xml(sheet, shared, policy);

    let mut errors = 0usize;
    while reader.has_next() {
        // `has_next` must be stable until the row is taken.
        assert!(reader.has_next());
        match reader.next_row() {
            Ok(_) => {}
            Err(RowSourceError::MalformedDocument(_)) => errors += 1,
            Err(err) => panic!("unexpected error after has_next: {err}"),
        }
    }
    assert!(errors <= 1, "malformed document reported {errors} times");
    assert!(matches!(reader.next_row(), Err(RowSourceError::NoMoreRows)));
});

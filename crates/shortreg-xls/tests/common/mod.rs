#![allow(dead_code)]

pub mod xls_fixture_builder;

use shortreg_xls::MemoryTable;

pub const HEADER: [&str; 6] = [
    "Innehavare av positionen",
    "Emittent",
    "ISIN",
    "Position i procent",
    "Datum för positionen",
    "Kommentar",
];

/// Register sheet laid out the way it is published: `preamble` title/notice rows, the header,
/// then `rows`.
pub fn register_table(preamble: &[&str], rows: &[&[&str]]) -> MemoryTable {
    let mut table = MemoryTable::new();
    for line in preamble {
        if line.is_empty() {
            table.push_empty_row();
        } else {
            table.push_text_row(&[*line]);
        }
    }
    table.push_text_row(&HEADER);
    for row in rows {
        table.push_text_row(*row);
    }
    table
}

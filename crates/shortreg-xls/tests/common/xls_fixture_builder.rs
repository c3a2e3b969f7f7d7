#![allow(dead_code)]

use std::io::{Cursor, Write};

// Just enough BIFF8 inside a CFB container for calamine to load sheets of labels and numbers.
const RECORD_BOF: u16 = 0x0809;
const RECORD_EOF: u16 = 0x000A;
const RECORD_CODEPAGE: u16 = 0x0042;
const RECORD_DATEMODE: u16 = 0x0022;
const RECORD_WINDOW1: u16 = 0x003D;
const RECORD_XF: u16 = 0x00E0;
const RECORD_BOUNDSHEET: u16 = 0x0085;
const RECORD_DIMENSIONS: u16 = 0x0200;
const RECORD_WINDOW2: u16 = 0x023E;
const RECORD_NUMBER: u16 = 0x0203;
const RECORD_LABEL: u16 = 0x0204;

const BOF_VERSION_BIFF8: u16 = 0x0600;
const BOF_DT_WORKBOOK_GLOBALS: u16 = 0x0005;
const BOF_DT_WORKSHEET: u16 = 0x0010;

const XF_FLAG_LOCKED: u16 = 0x0001;
const XF_FLAG_STYLE: u16 = 0x0004;

/// Built-in number format 14 (`m/d/yyyy`); calamine reads numbers in it as dates.
const FMT_DATE: u16 = 14;
const XF_GENERAL: u16 = 16;
const XF_DATE: u16 = 17;

#[derive(Debug, Clone, Copy)]
pub enum XlsCell<'a> {
    Blank,
    Text(&'a str),
    Number(f64),
    /// Excel serial written with a date format.
    Date(f64),
}

pub struct XlsSheet<'a> {
    pub name: &'a str,
    pub rows: Vec<Vec<XlsCell<'a>>>,
}

impl<'a> XlsSheet<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, cells: Vec<XlsCell<'a>>) -> Self {
        self.rows.push(cells);
        self
    }

    /// A row of labels; `""` leaves the cell out.
    pub fn text_row(self, cells: &[&'a str]) -> Self {
        self.row(
            cells
                .iter()
                .map(|&c| if c.is_empty() { XlsCell::Blank } else { XlsCell::Text(c) })
                .collect(),
        )
    }
}

/// Build a BIFF8 `.xls` workbook with one worksheet per entry of `sheets`.
pub fn build_workbook_xls(sheets: &[XlsSheet<'_>]) -> Vec<u8> {
    let workbook_stream = build_workbook_stream(sheets);

    let cursor = Cursor::new(Vec::new());
    let mut ole = cfb::CompoundFile::create(cursor).expect("create cfb");
    {
        let mut stream = ole.create_stream("Workbook").expect("Workbook stream");
        stream
            .write_all(&workbook_stream)
            .expect("write Workbook stream");
    }
    ole.into_inner().into_inner()
}

fn build_workbook_stream(sheets: &[XlsSheet<'_>]) -> Vec<u8> {
    let mut globals = Vec::<u8>::new();

    push_record(&mut globals, RECORD_BOF, &bof(BOF_DT_WORKBOOK_GLOBALS));
    push_record(&mut globals, RECORD_CODEPAGE, &1252u16.to_le_bytes());
    push_record(&mut globals, RECORD_DATEMODE, &0u16.to_le_bytes()); // 1900 date system
    push_record(&mut globals, RECORD_WINDOW1, &window1());

    // Readers expect 16 style XFs before the cell XFs.
    for _ in 0..16 {
        push_record(&mut globals, RECORD_XF, &xf_record(0, true));
    }
    push_record(&mut globals, RECORD_XF, &xf_record(0, false)); // XF_GENERAL
    push_record(&mut globals, RECORD_XF, &xf_record(FMT_DATE, false)); // XF_DATE

    let mut offset_positions = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let mut boundsheet = Vec::<u8>::new();
        boundsheet.extend_from_slice(&0u32.to_le_bytes()); // lbPlyPos, patched below
        boundsheet.extend_from_slice(&0u16.to_le_bytes()); // visible worksheet
        write_short_string(&mut boundsheet, sheet.name);
        offset_positions.push(globals.len() + 4);
        push_record(&mut globals, RECORD_BOUNDSHEET, &boundsheet);
    }

    push_record(&mut globals, RECORD_EOF, &[]);

    for (sheet, pos) in sheets.iter().zip(offset_positions) {
        let offset = globals.len() as u32;
        globals[pos..pos + 4].copy_from_slice(&offset.to_le_bytes());
        globals.extend_from_slice(&build_sheet_stream(sheet));
    }
    globals
}

fn build_sheet_stream(sheet: &XlsSheet<'_>) -> Vec<u8> {
    let mut out = Vec::<u8>::new();
    push_record(&mut out, RECORD_BOF, &bof(BOF_DT_WORKSHEET));

    let cols = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut dims = Vec::<u8>::new();
    dims.extend_from_slice(&0u32.to_le_bytes()); // first row
    dims.extend_from_slice(&(sheet.rows.len() as u32).to_le_bytes()); // last row + 1
    dims.extend_from_slice(&0u16.to_le_bytes()); // first col
    dims.extend_from_slice(&(cols as u16).to_le_bytes()); // last col + 1
    dims.extend_from_slice(&0u16.to_le_bytes()); // reserved
    push_record(&mut out, RECORD_DIMENSIONS, &dims);

    push_record(&mut out, RECORD_WINDOW2, &window2());

    for (r, cells) in sheet.rows.iter().enumerate() {
        for (c, cell) in cells.iter().enumerate() {
            let (row, col) = (r as u16, c as u16);
            match *cell {
                XlsCell::Blank => {}
                XlsCell::Text(text) => {
                    push_record(&mut out, RECORD_LABEL, &label_cell(row, col, XF_GENERAL, text))
                }
                XlsCell::Number(v) => {
                    push_record(&mut out, RECORD_NUMBER, &number_cell(row, col, XF_GENERAL, v))
                }
                XlsCell::Date(v) => {
                    push_record(&mut out, RECORD_NUMBER, &number_cell(row, col, XF_DATE, v))
                }
            }
        }
    }

    push_record(&mut out, RECORD_EOF, &[]);
    out
}

fn push_record(out: &mut Vec<u8>, id: u16, data: &[u8]) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

fn bof(dt: u16) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..2].copy_from_slice(&BOF_VERSION_BIFF8.to_le_bytes());
    out[2..4].copy_from_slice(&dt.to_le_bytes());
    out[4..6].copy_from_slice(&0x0DBBu16.to_le_bytes()); // build
    out[6..8].copy_from_slice(&0x07CCu16.to_le_bytes()); // year
    out
}

fn window1() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[14..16].copy_from_slice(&1u16.to_le_bytes()); // cTabSel
    out[16..18].copy_from_slice(&600u16.to_le_bytes()); // wTabRatio
    out
}

fn window2() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[0..2].copy_from_slice(&0x02B6u16.to_le_bytes());
    out
}

fn xf_record(fmt_idx: u16, is_style_xf: bool) -> [u8; 20] {
    let mut out = [0u8; 20];
    out[2..4].copy_from_slice(&fmt_idx.to_le_bytes());
    let flags: u16 = XF_FLAG_LOCKED | if is_style_xf { XF_FLAG_STYLE } else { 0 };
    out[4..6].copy_from_slice(&flags.to_le_bytes());
    out[6] = 0x20; // General + Bottom
    out[9] = 0x3F;
    out
}

fn number_cell(row: u16, col: u16, xf: u16, v: f64) -> [u8; 14] {
    let mut out = [0u8; 14];
    out[0..2].copy_from_slice(&row.to_le_bytes());
    out[2..4].copy_from_slice(&col.to_le_bytes());
    out[4..6].copy_from_slice(&xf.to_le_bytes());
    out[6..14].copy_from_slice(&v.to_le_bytes());
    out
}

fn label_cell(row: u16, col: u16, xf: u16, text: &str) -> Vec<u8> {
    let mut out = Vec::<u8>::new();
    out.extend_from_slice(&row.to_le_bytes());
    out.extend_from_slice(&col.to_le_bytes());
    out.extend_from_slice(&xf.to_le_bytes());
    write_unicode_string(&mut out, text);
    out
}

/// Compressed (8-bit) characters in the workbook's 1252 code page; fixtures stay in Latin-1.
fn latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).expect("fixture text must be Latin-1"))
        .collect()
}

fn write_short_string(out: &mut Vec<u8>, s: &str) {
    // ShortXLUnicodeString: [cch: u8][flags: u8][chars]
    let bytes = latin1(s);
    out.push(u8::try_from(bytes.len()).expect("string too long for u8 length"));
    out.push(0);
    out.extend_from_slice(&bytes);
}

fn write_unicode_string(out: &mut Vec<u8>, s: &str) {
    // XLUnicodeString: [cch: u16][flags: u8][chars]
    let bytes = latin1(s);
    let len = u16::try_from(bytes.len()).expect("string too long for u16 length");
    out.extend_from_slice(&len.to_le_bytes());
    out.push(0);
    out.extend_from_slice(&bytes);
}

use std::io::{Read, Seek};

use calamine::{Data, Range, Reader, Xls};
use chrono::{NaiveDate, NaiveDateTime};
use shortreg_rows::serial::serial_to_datetime;
use shortreg_rows::RowSourceError;
use thiserror::Error;

use crate::table::{SheetTable, TableCell};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read `.xls`: {0}")]
    Xls(#[from] calamine::XlsError),
    #[error("workbook contains no worksheets")]
    NoSheets,
}

impl From<LoadError> for RowSourceError {
    fn from(err: LoadError) -> Self {
        RowSourceError::MalformedDocument(err.to_string())
    }
}

/// One worksheet loaded by `calamine`.
#[derive(Debug, Clone)]
pub struct CalamineSheet {
    name: String,
    range: Range<Data>,
}

impl CalamineSheet {
    pub fn new(name: impl Into<String>, range: Range<Data>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SheetTable for CalamineSheet {
    fn row_count(&self) -> usize {
        // `end` is absolute, so rows above the used range count as empty rows.
        self.range.end().map_or(0, |(row, _)| row as usize + 1)
    }

    fn column_count(&self) -> usize {
        self.range.end().map_or(0, |(_, col)| col as usize + 1)
    }

    fn cell(&self, row: usize, col: usize) -> TableCell<'_> {
        let (Ok(row), Ok(col)) = (u32::try_from(row), u32::try_from(col)) else {
            return TableCell::Empty;
        };
        match self.range.get_value((row, col)) {
            Some(value) => convert_value(value),
            None => TableCell::Empty,
        }
    }
}

fn convert_value(value: &Data) -> TableCell<'_> {
    match value {
        Data::Empty | Data::Error(_) => TableCell::Empty,
        Data::Bool(true) => TableCell::Text("TRUE"),
        Data::Bool(false) => TableCell::Text("FALSE"),
        Data::Int(v) => TableCell::Number(*v as f64),
        Data::Float(v) => TableCell::Number(*v),
        Data::String(v) => TableCell::Text(v),
        Data::DateTime(v) => match serial_to_datetime(v.as_f64()) {
            Some(dt) => TableCell::DateTime(dt),
            None => TableCell::Number(v.as_f64()),
        },
        Data::DateTimeIso(v) => match parse_iso_datetime(v) {
            Some(dt) => TableCell::DateTime(dt),
            None => TableCell::Text(v),
        },
        Data::DurationIso(v) => TableCell::Text(v),
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
}

/// Load one worksheet of a `.xls` workbook.
///
/// The first sheet whose name contains `sheet_fragment` (case-insensitive) is loaded. Without a
/// fragment, or when no name matches, the first sheet is used.
pub fn load_xls_sheet<RS: Read + Seek>(
    reader: RS,
    sheet_fragment: Option<&str>,
) -> Result<CalamineSheet, LoadError> {
    let mut workbook: Xls<RS> = Xls::new(reader)?;
    load_from_workbook(&mut workbook, sheet_fragment)
}

fn load_from_workbook<RS: Read + Seek>(
    workbook: &mut Xls<RS>,
    sheet_fragment: Option<&str>,
) -> Result<CalamineSheet, LoadError> {
    let sheet_names = workbook.sheet_names().to_owned();
    let name = pick_sheet(&sheet_names, sheet_fragment)
        .ok_or(LoadError::NoSheets)?
        .to_string();
    let range = workbook.worksheet_range(&name)?;
    log::debug!("loaded `.xls` sheet `{name}` ({:?})", range.end());
    Ok(CalamineSheet::new(name, range))
}

fn pick_sheet<'a>(names: &'a [String], fragment: Option<&str>) -> Option<&'a str> {
    if let Some(fragment) = fragment {
        let needle = fragment.to_lowercase();
        if let Some(name) = names.iter().find(|n| n.to_lowercase().contains(&needle)) {
            return Some(name);
        }
        log::debug!("no `.xls` sheet name contains `{fragment}`; using the first sheet");
    }
    names.first().map(String::as_str)
}

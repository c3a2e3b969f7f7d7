use chrono::NaiveDate;
use shortreg_rows::serial::{parse_serial_date, serial_to_date};
use shortreg_rows::{CellParseWarning, Lookahead, Row, RowCursor, RowSource, RowSourceError};

use crate::header::HeaderPrefixes;
use crate::table::{normalize_text, SheetTable, TableCell};

const ISIN_COL: usize = 2;
const POSITION_COL: usize = 3;
const DATE_COL: usize = 4;
const ISIN_LEN: usize = 12;

/// Options for reading a `.xls` register sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    /// Case-insensitive sheet-name fragment; `None` reads the first sheet.
    pub sheet_fragment: Option<String>,
    pub header: HeaderPrefixes,
}

impl TableOptions {
    pub fn with_sheet_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.sheet_fragment = Some(fragment.into());
        self
    }

    pub fn with_header(mut self, header: HeaderPrefixes) -> Self {
        self.header = header;
        self
    }
}

/// Row source over a loaded sheet table.
///
/// Rows above the header row (located on the first `has_next`) are skipped. Below it, rows
/// without a date or with anything but a 12-character ISIN are footers and blank rows and are
/// dropped silently; rows whose position or date can't be read as such are dropped with a
/// warning.
#[derive(Debug)]
pub struct TableRowReader<T> {
    inner: Lookahead<TableCursor<T>>,
}

impl<T: SheetTable> TableRowReader<T> {
    /// Read every row of `table`.
    pub fn new(table: T, header: HeaderPrefixes) -> Self {
        let row_count = table.row_count();
        Self::with_row_count(table, row_count, header)
    }

    /// Read the first `row_count` rows of `table`.
    pub fn with_row_count(table: T, row_count: usize, header: HeaderPrefixes) -> Self {
        Self {
            inner: Lookahead::new(TableCursor {
                table,
                row_count,
                header,
                phase: Phase::SeekingHeader,
                next: 0,
            }),
        }
    }

    pub fn table(&self) -> &T {
        &self.inner.cursor().table
    }

    /// Index of the header row, once it has been located.
    pub fn header_row(&self) -> Option<usize> {
        match self.inner.cursor().phase {
            Phase::Data { header_row } => Some(header_row),
            Phase::SeekingHeader | Phase::NoHeader => None,
        }
    }
}

impl<T: SheetTable> RowSource for TableRowReader<T> {
    fn has_next(&mut self) -> bool {
        self.inner.has_next()
    }

    fn next_row(&mut self) -> Result<Row, RowSourceError> {
        self.inner.next_row()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    SeekingHeader,
    Data { header_row: usize },
    NoHeader,
}

#[derive(Debug)]
struct TableCursor<T> {
    table: T,
    row_count: usize,
    header: HeaderPrefixes,
    phase: Phase,
    next: usize,
}

impl<T: SheetTable> TableCursor<T> {
    fn locate_header(&mut self) {
        match (0..self.row_count).find(|&row| self.header.matches_row(&self.table, row)) {
            Some(header_row) => {
                log::debug!("register header found at row {header_row}");
                self.phase = Phase::Data { header_row };
                self.next = header_row + 1;
            }
            None => {
                log::warn!("no register header row in {} rows", self.row_count);
                self.phase = Phase::NoHeader;
            }
        }
    }

    fn candidate(&self, row: usize) -> Option<Row> {
        let table = &self.table;
        if table.cell(row, DATE_COL).is_blank() {
            return None;
        }
        let isin = table.cell(row, ISIN_COL).to_text();
        if isin.chars().count() != ISIN_LEN {
            return None;
        }

        if let Err(warning) = check_position(row, table.cell(row, POSITION_COL))
            .and_then(|()| check_date(row, table.cell(row, DATE_COL)))
        {
            warning.log();
            return None;
        }

        let width = (0..table.column_count())
            .rev()
            .find(|&col| !table.cell(row, col).is_blank())
            .map_or(0, |col| col + 1)
            .max(HeaderPrefixes::WIDTH);
        Some((0..width).map(|col| table.cell(row, col).to_text()).collect())
    }
}

impl<T: SheetTable> RowCursor for TableCursor<T> {
    fn advance(&mut self) -> Result<Option<Row>, RowSourceError> {
        if self.phase == Phase::SeekingHeader {
            self.locate_header();
        }
        if self.phase == Phase::NoHeader {
            return Ok(None);
        }
        while self.next < self.row_count {
            let row = self.next;
            self.next += 1;
            if let Some(cells) = self.candidate(row) {
                return Ok(Some(cells));
            }
        }
        Ok(None)
    }
}

fn check_position(row: usize, cell: TableCell<'_>) -> Result<(), CellParseWarning> {
    let ok = match cell {
        TableCell::Number(_) => true,
        TableCell::Text(text) => {
            let text = normalize_text(text);
            let digits = text.strip_prefix('<').unwrap_or(text).trim();
            digits.replace(',', ".").parse::<f64>().is_ok()
        }
        TableCell::Empty | TableCell::DateTime(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(CellParseWarning::Number {
            row,
            column: "position",
            value: cell.to_text(),
        })
    }
}

fn check_date(row: usize, cell: TableCell<'_>) -> Result<(), CellParseWarning> {
    let ok = match cell {
        TableCell::DateTime(_) => true,
        TableCell::Number(n) => serial_to_date(n).is_some(),
        TableCell::Text(text) => {
            let text = normalize_text(text);
            NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() || parse_serial_date(text).is_some()
        }
        TableCell::Empty => false,
    };
    if ok {
        Ok(())
    } else {
        Err(CellParseWarning::Date {
            row,
            column: "position date",
            value: cell.to_text(),
        })
    }
}

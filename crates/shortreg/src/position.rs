use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::Serialize;
use shortreg_rows::serial::parse_serial_date;
use shortreg_rows::{Row, RowSource};
use thiserror::Error;

use crate::source::DocumentFormat;

/// One published net short position.
///
/// Ordered by position date, then issuer, then position holder; the remaining fields only break
/// ties.
#[derive(Debug, Clone, Serialize)]
pub struct NetShortPosition {
    pub position_holder: String,
    pub issuer: String,
    pub isin: String,
    pub position_in_percent: f64,
    pub position_date: NaiveDate,
    pub comment: Option<String>,
    /// `false` for positions published as below the reporting threshold (`<0,5`).
    pub significant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionParseError {
    #[error("row has {0} cells; expected a register row")]
    Width(usize),
    #[error("`{0}` is not a position in percent")]
    Position(String),
    #[error("`{0}` is not a date")]
    Date(String),
}

/// Column layout of a register row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// `[publication date, holder, issuer, ISIN, position, position date, (comment)]`
    WithPublicationDate,
    /// `[holder, issuer, ISIN, position, position date, (comment)]`
    PositionsOnly,
}

impl RowLayout {
    fn offset(self) -> usize {
        match self {
            Self::WithPublicationDate => 1,
            Self::PositionsOnly => 0,
        }
    }
}

impl From<DocumentFormat> for RowLayout {
    fn from(format: DocumentFormat) -> Self {
        match format {
            DocumentFormat::Xlsx => Self::WithPublicationDate,
            DocumentFormat::Xls => Self::PositionsOnly,
        }
    }
}

impl NetShortPosition {
    /// Whether `row` has the width of a register row in `layout` (title and header rows don't).
    pub fn is_register_row(row: &[String], layout: RowLayout) -> bool {
        matches!(row.len().checked_sub(layout.offset()), Some(5 | 6))
    }

    pub fn from_row(row: &[String], layout: RowLayout) -> Result<Self, PositionParseError> {
        if !Self::is_register_row(row, layout) {
            return Err(PositionParseError::Width(row.len()));
        }
        let cells = &row[layout.offset()..];
        let (position_in_percent, significant) = parse_position(&cells[3])?;
        let comment = cells
            .get(5)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            position_holder: cells[0].trim().to_string(),
            issuer: cells[1].trim().to_string(),
            isin: cells[2].trim().to_string(),
            position_in_percent,
            position_date: parse_date(&cells[4])?,
            comment,
            significant,
        })
    }

    fn sort_key(&self) -> (NaiveDate, &str, &str) {
        (self.position_date, &self.issuer, &self.position_holder)
    }
}

impl Ord for NetShortPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.isin.cmp(&other.isin))
            .then_with(|| self.position_in_percent.total_cmp(&other.position_in_percent))
            .then_with(|| self.comment.cmp(&other.comment))
            .then_with(|| self.significant.cmp(&other.significant))
    }
}

impl PartialOrd for NetShortPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NetShortPosition {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NetShortPosition {}

impl Hash for NetShortPosition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position_holder.hash(state);
        self.issuer.hash(state);
        self.isin.hash(state);
        self.position_in_percent.to_bits().hash(state);
        self.position_date.hash(state);
        self.comment.hash(state);
        self.significant.hash(state);
    }
}

/// `2018-04-18` as written, otherwise an Excel serial (`43208`, or `43208.5` with a time of day).
pub fn parse_date(text: &str) -> Result<NaiveDate, PositionParseError> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_serial_date(text))
        .ok_or_else(|| PositionParseError::Date(text.to_string()))
}

/// Parse `0,52` / `0.52` / `<0,5`; returns the value and whether it is significant.
pub fn parse_position(text: &str) -> Result<(f64, bool), PositionParseError> {
    let text = text.trim();
    let (digits, significant) = match text.strip_prefix('<') {
        Some(rest) => (rest.trim_start(), false),
        None => (text, true),
    };
    let value = digits
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| PositionParseError::Position(text.to_string()))?;
    Ok((value, significant))
}

/// Drain `source` into positions.
///
/// Rows of the wrong width are skipped quietly; rows that fail to parse are logged and skipped.
/// A document error ends the read (also logged) and keeps the positions read so far.
pub fn read_positions<S: RowSource>(source: S, layout: RowLayout) -> Vec<NetShortPosition> {
    let mut positions = Vec::new();
    for (index, row) in source.rows().enumerate() {
        let row: Row = match row {
            Ok(row) => row,
            Err(err) => {
                log::warn!("stopped reading positions: {err}");
                break;
            }
        };
        if !NetShortPosition::is_register_row(&row, layout) {
            log::trace!("row {index}: {} cells, not a position", row.len());
            continue;
        }
        match NetShortPosition::from_row(&row, layout) {
            Ok(position) => positions.push(position),
            Err(err) => log::warn!("row {index}: failed to parse net short position: {err}"),
        }
    }
    positions
}

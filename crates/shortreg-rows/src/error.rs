use thiserror::Error;

/// Errors surfaced by a [`crate::RowSource`].
#[derive(Debug, Error)]
pub enum RowSourceError {
    /// The document could not be opened, the target sheet is missing, the shared-string table
    /// could not be read, or (when the caller asked for it) the sheet XML is malformed.
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    /// A single cell could not be interpreted. Readers log these and keep going; the variant
    /// exists so the condition has one name across readers.
    #[error(transparent)]
    CellParse(#[from] CellParseWarning),
    /// `next_row` was called without a row being available.
    #[error("no more rows")]
    NoMoreRows,
}

impl RowSourceError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }
}

/// Non-fatal, cell-level problems. The offending cell is blanked or the row is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellParseWarning {
    #[error("row {row}: shared string index `{index}` is not a valid index into a table of {len} strings")]
    SharedStringIndex { row: usize, index: String, len: usize },
    #[error("row {row}: `{value}` in column `{column}` is not a number")]
    Number {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("row {row}: `{value}` in column `{column}` is not a date")]
    Date {
        row: usize,
        column: &'static str,
        value: String,
    },
}

impl CellParseWarning {
    /// Emit the warning through the `log` facade.
    pub fn log(&self) {
        log::warn!("{self}; skipping");
    }
}

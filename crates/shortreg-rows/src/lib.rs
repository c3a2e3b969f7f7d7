//! `shortreg-rows` defines the row model shared by the shortreg spreadsheet readers.
//!
//! Both readers (the streaming `.xlsx` reader in `shortreg-xlsx` and the table-model `.xls`
//! reader in `shortreg-xls`) produce the same thing: a lazy, forward-only sequence of [`Row`]s
//! behind the [`RowSource`] trait. Callers compose sources without knowing which document
//! format produced them.
//!
//! Readers implement the small [`RowCursor`] trait ("produce the next row or report
//! exhaustion") and get the query-then-consume protocol from [`Lookahead`].

mod error;
pub mod serial;
mod source;

pub use error::{CellParseWarning, RowSourceError};
pub use source::{Empty, Lookahead, RowCursor, RowSource, Rows};

/// One spreadsheet row: cell texts in the order they were encountered in the source.
///
/// Rows are not padded to a fixed width. Callers must tolerate short or long rows and should
/// consult a header row (rather than column positions) when meaning matters.
pub type Row = Vec<String>;

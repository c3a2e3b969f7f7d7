//! Swedish short-position register (Blankningsregistret).
//!
//! Finansinspektionen publishes the register daily as a spreadsheet; older files are Excel
//! 97-2003 `.xls`, newer ones `.xlsx`. This crate opens either ([`Document`]), exposes the
//! register sheet as a row source, parses rows into [`NetShortPosition`]s, and searches the
//! published files by date ([`Register`]).

pub mod cli;
pub mod position;
pub mod register;
pub mod source;

pub use position::{read_positions, NetShortPosition, PositionParseError, RowLayout};
pub use register::{FetchError, Fetcher, HttpFetcher, Register, RegisterConfig};
pub use shortreg_rows::{Row, RowSource, RowSourceError};
pub use source::{Document, DocumentFormat, SourceOptions};

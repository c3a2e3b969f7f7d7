//! Streaming row extraction for XLSX (SpreadsheetML) documents.
//!
//! The crate has two layers:
//!
//! - [`XlsxPackage`]: Open Packaging Convention (OPC) access on top of a ZIP archive. It lists
//!   worksheets by name, loads the shared-string table, and opens individual parts as
//!   forward-only byte streams without inflating the whole package into memory.
//! - [`XlsxRowReader`]: a [`shortreg_rows::RowSource`] that walks one worksheet's XML event
//!   stream and emits each `<row>` as a vector of cell texts, resolving shared-string
//!   references on the way.

mod error;
mod package;
mod reader;
mod relationships;
pub mod shared_strings;

pub use error::PackageError;
pub use package::{SheetEntry, XlsxPackage, MAX_XLSX_METADATA_PART_BYTES};
pub use reader::{MalformedXmlPolicy, ReaderOptions, XlsxRowReader, DEFAULT_SHEET_FRAGMENT};
pub use shared_strings::{parse_shared_strings, SharedStrings};

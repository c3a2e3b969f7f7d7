//! Legacy Excel 97-2003 `.xls` (BIFF) register support.
//!
//! `.xls` files are loaded whole by `calamine` into a [`SheetTable`] (typed cells addressable by
//! row and column). [`TableRowReader`] then walks that table: it skips the preamble above the
//! register's header row, drops trailing footer/blank rows, and emits every remaining row as
//! text cells through the same [`shortreg_rows::RowSource`] protocol as the XLSX reader.

mod header;
mod load;
mod reader;
mod table;

pub use header::HeaderPrefixes;
pub use load::{load_xls_sheet, CalamineSheet, LoadError};
pub use reader::{TableOptions, TableRowReader};
pub use table::{MemoryTable, SheetTable, TableCell};

use std::io::{Read, Seek};
use std::path::Path;

use shortreg_rows::{Empty, RowSource, RowSourceError};
use shortreg_xls::{load_xls_sheet, CalamineSheet, TableOptions, TableRowReader};
use shortreg_xlsx::{MalformedXmlPolicy, ReaderOptions, XlsxPackage, XlsxRowReader};

/// Container format of a register document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Office Open XML workbook (`.xlsx`), read as a stream of sheet XML events.
    Xlsx,
    /// Excel 97-2003 workbook (`.xls`), loaded whole and read as a table.
    Xls,
}

impl DocumentFormat {
    /// Format for a file extension (`"xlsx"`, `".XLS"`, ...).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }

    /// Format for a path or URL, judged by its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }
}

/// Reader options for both formats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOptions {
    pub xlsx: ReaderOptions,
    pub xls: TableOptions,
}

impl SourceOptions {
    /// Read the sheet whose name contains `fragment`, whichever the format.
    pub fn with_sheet_fragment(mut self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        self.xls = self.xls.with_sheet_fragment(fragment.clone());
        self.xlsx = self.xlsx.with_sheet_fragment(fragment);
        self
    }

    pub fn with_malformed_xml(mut self, policy: MalformedXmlPolicy) -> Self {
        self.xlsx = self.xlsx.with_malformed_xml(policy);
        self
    }
}

enum Inner<R> {
    Xlsx(XlsxPackage<R>),
    Xls(CalamineSheet),
}

/// An opened register document.
///
/// The document owns the underlying stream; row sources borrow it, so keep the document alive
/// for as long as rows are pulled.
pub struct Document<R> {
    inner: Inner<R>,
    options: SourceOptions,
}

impl<R> std::fmt::Debug for Document<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("format", &self.format())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<R> Document<R> {
    pub fn format(&self) -> DocumentFormat {
        match self.inner {
            Inner::Xlsx(_) => DocumentFormat::Xlsx,
            Inner::Xls(_) => DocumentFormat::Xls,
        }
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }
}

impl<R: Read + Seek> Document<R> {
    /// Open `reader` as a `format` container.
    ///
    /// For `.xlsx` only the zip directory is read here; for `.xls` the selected sheet is loaded.
    pub fn open(
        format: DocumentFormat,
        reader: R,
        options: SourceOptions,
    ) -> Result<Self, RowSourceError> {
        let inner = match format {
            DocumentFormat::Xlsx => Inner::Xlsx(XlsxPackage::from_reader(reader)?),
            DocumentFormat::Xls => {
                Inner::Xls(load_xls_sheet(reader, options.xls.sheet_fragment.as_deref())?)
            }
        };
        Ok(Self { inner, options })
    }

    /// Row source over the register sheet, or `MalformedDocument` if it can't be set up.
    pub fn try_row_source(&mut self) -> Result<Box<dyn RowSource + '_>, RowSourceError> {
        match &mut self.inner {
            Inner::Xlsx(package) => Ok(Box::new(XlsxRowReader::try_open(
                package,
                &self.options.xlsx,
            )?)),
            Inner::Xls(sheet) => Ok(Box::new(TableRowReader::new(
                &*sheet,
                self.options.xls.header.clone(),
            ))),
        }
    }

    /// Like [`Document::try_row_source`], but a document whose rows can't be reached yields no
    /// rows (with a logged warning) instead of an error.
    pub fn row_source(&mut self) -> Box<dyn RowSource + '_> {
        match self.try_row_source() {
            Ok(source) => source,
            Err(err) => {
                log::warn!("{err}; reading no rows");
                Box::new(Empty)
            }
        }
    }
}

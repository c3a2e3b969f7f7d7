use quick_xml::events::attributes::AttrError;
use shortreg_rows::RowSourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] AttrError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("missing required part: {0}")]
    MissingPart(String),
    #[error("part `{part}` is too large ({size} bytes, max {max})")]
    PartTooLarge { part: String, size: u64, max: u64 },
    #[error("malformed {part}: {reason}")]
    Malformed { part: String, reason: &'static str },
    #[error("no worksheet name contains `{0}`")]
    SheetNotFound(String),
}

impl From<PackageError> for RowSourceError {
    fn from(err: PackageError) -> Self {
        RowSourceError::MalformedDocument(err.to_string())
    }
}

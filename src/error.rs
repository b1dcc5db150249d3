use thiserror::Error;

/// Failures while turning a workbook into an item list. Any of these aborts the
/// import; no partial item list is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("sheet not found")]
    SheetNotFound,

    #[error("header row not found (no ANTALL cell in column A)")]
    HeaderRowNotFound,

    #[error("could not read workbook: {0}")]
    Workbook(String),
}

/// Failures while writing counts back into a workbook. No output is produced
/// when any of these occur.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("sheet not found")]
    SheetNotFound,

    #[error("header row not found at export (no ANTALL cell in column A)")]
    HeaderRowNotFound,

    #[error("row {0} is not a valid row number")]
    InvalidRow(u32),

    #[error("count for row {row} is not a finite number: {value}")]
    InvalidCount { row: u32, value: f64 },

    #[error("could not read workbook: {0}")]
    Workbook(String),

    #[error("malformed worksheet XML: {0}")]
    MalformedSheet(String),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseError> for ExportError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::SheetNotFound => ExportError::SheetNotFound,
            ParseError::HeaderRowNotFound => ExportError::HeaderRowNotFound,
            ParseError::Workbook(msg) => ExportError::Workbook(msg),
        }
    }
}

#[derive(Error, Debug)]
pub enum VareError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not read count list: {0}")]
    Parse(#[from] ParseError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("No active counting session. Run `varetelling import <file>` first.")]
    NoActiveSession,

    #[error("Unknown session: {0}")]
    UnknownSession(i64),

    #[error("Row {0} is not an item in the active count list")]
    UnknownRow(u32),

    #[error("Unknown checklist item: {0}")]
    UnknownChecklistItem(i64),

    #[error("Unknown denomination: {0}")]
    InvalidDenomination(u32),

    #[error("Invalid period: {0} (expected YYYY-MM)")]
    InvalidPeriod(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VareError>;

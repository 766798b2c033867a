use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Workbook is missing required sheet(s): {}", .0.join(", "))]
    MissingSheets(Vec<String>),

    #[error("Sheet '{sheet}' is missing required column(s): {}", .columns.join(", "))]
    MissingColumns { sheet: String, columns: Vec<String> },
}

#[derive(Error, Debug)]
pub enum SalesReportError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid date range: start {start} is after end {end}")]
    Range { start: NaiveDate, end: NaiveDate },

    #[error("Not enough data points for a trend fit: need {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid allocation input {0}: must be greater than 0")]
    InvalidTarget(f64),

    #[error("Historical window contains no sales to allocate from")]
    EmptyWindow,

    #[error("Failed to render chart '{chart}': {details}")]
    Render { chart: String, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workbook could not be read: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Spreadsheet export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Slide deck archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SalesReportError {
    /// Errors the presentation layer should show as a notice rather than a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, SalesReportError::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, SalesReportError>;

pub mod csv;
pub mod merchant;
pub mod pdf;
pub mod statement;
pub mod xlsx;

use thiserror::Error;

pub use pdf::{MockTextExtractor, PdfTextExtractor, TextExtractor};
pub use statement::{
    MemoryStatusStore, ParsedStatement, ProcessingRecord, ProcessingStatus, StatementKind,
    StatementMetadata, StatementParser, StatementSummary, StatusStore,
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported statement kind: '{0}'")]
    UnsupportedKind(String),
    #[error("Failed to read {kind} input: {detail}")]
    Unreadable { kind: &'static str, detail: String },
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("No data rows")]
    NoDataRows,
}

/// One statement line after date/description/amount extraction, before
/// merchant derivation and recurring detection.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub date: chrono::NaiveDate,
    pub description: String,
    pub amount: cardwise_core::Money,
}

/// Rows plus the count of lines/rows that were dropped as unparsable.
#[derive(Debug, Default)]
pub struct RowBatch {
    pub rows: Vec<RawRow>,
    pub skipped: usize,
}

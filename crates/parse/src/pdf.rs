use std::sync::OnceLock;

use regex::Regex;

use crate::csv::{parse_amount, parse_date};
use crate::{ParseError, RawRow, RowBatch};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Ordered line patterns: date, free-text description, trailing amount with an
// optional debit/credit marker. First pattern that matches a line wins.
re!(re_line_dmy_slash,
    r"^(\d{2}/\d{2}/\d{4})\s+(.+?)\s+(₹?\s*[\d,]+(?:\.\d{1,2})?)\s*(?:CR|DR|Cr|Dr)?$");
re!(re_line_dmy_dash,
    r"^(\d{2}-\d{2}-\d{4})\s+(.+?)\s+(₹?\s*[\d,]+(?:\.\d{1,2})?)\s*(?:CR|DR|Cr|Dr)?$");
re!(re_line_iso,
    r"^(\d{4}-\d{2}-\d{2})\s+(.+?)\s+(₹?\s*[\d,]+(?:\.\d{1,2})?)\s*(?:CR|DR|Cr|Dr)?$");

/// Lines shorter than this cannot hold date + description + amount.
const MIN_LINE_LEN: usize = 14;

/// Abstraction over PDF text extraction so the line scanner is testable
/// without real PDF bytes.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, data: &[u8]) -> Result<String, ParseError>;
}

/// Extracts embedded text from PDF bytes. Scanned-image PDFs yield little or
/// no text; that degrades to an empty transaction set, not an error.
#[derive(Debug, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String, ParseError> {
        pdf_extract::extract_text_from_mem(data).map_err(|e| ParseError::Unreadable {
            kind: "pdf",
            detail: e.to_string(),
        })
    }
}

/// Returns a pre-set string — lets tests drive the scanner without PDFs.
pub struct MockTextExtractor {
    pub text: String,
}

impl MockTextExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextExtractor for MockTextExtractor {
    fn extract_text(&self, _data: &[u8]) -> Result<String, ParseError> {
        Ok(self.text.clone())
    }
}

/// Scan extracted statement text line by line. Deliberately lossy: a line
/// that matches no pattern, or whose date/amount does not parse, is skipped
/// and counted, never fatal.
pub fn scan_lines(text: &str) -> RowBatch {
    let mut batch = RowBatch::default();

    for line in text.lines() {
        let line = line.trim();
        if line.len() < MIN_LINE_LEN {
            continue;
        }
        let captures = re_line_dmy_slash()
            .captures(line)
            .or_else(|| re_line_dmy_dash().captures(line))
            .or_else(|| re_line_iso().captures(line));
        let Some(c) = captures else {
            batch.skipped += 1;
            continue;
        };

        let date = c.get(1).and_then(|m| parse_date(m.as_str()));
        let amount = c.get(3).and_then(|m| parse_amount(m.as_str()));
        let description = c.get(2).map(|m| m.as_str().trim().to_string());

        match (date, description, amount) {
            (Some(date), Some(description), Some(amount)) if !description.is_empty() => {
                batch.rows.push(RawRow {
                    date,
                    description,
                    amount,
                });
            }
            _ => batch.skipped += 1,
        }
    }

    batch
}

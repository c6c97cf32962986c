use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use cardwise_core::{Category, DateRange, Money, Transaction};

use crate::merchant::derive_merchant;
use crate::pdf::{scan_lines, TextExtractor};
use crate::{csv, xlsx, ParseError};

/// Amounts within this many paise count as "identical" for recurring
/// detection — rounding noise only.
const RECURRING_TOLERANCE_PAISE: i64 = 1;

/// How many top merchants the summary reports.
const TOP_MERCHANTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Pdf,
    Csv,
    Xlsx,
}

impl std::str::FromStr for StatementKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(StatementKind::Pdf),
            "csv" => Ok(StatementKind::Csv),
            "xlsx" | "xls" | "spreadsheet" => Ok(StatementKind::Xlsx),
            other => Err(ParseError::UnsupportedKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementKind::Pdf => write!(f, "pdf"),
            StatementKind::Csv => write!(f, "csv"),
            StatementKind::Xlsx => write!(f, "xlsx"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementSummary {
    pub transaction_count: usize,
    pub total_amount: Money,
    pub date_range: Option<DateRange>,
    /// Merchants ranked by total spend, largest first.
    pub top_merchants: Vec<(String, Money)>,
    /// Per-category subtotals; empty until categorization has run.
    #[serde(default)]
    pub by_category: BTreeMap<Category, Money>,
    /// Rows/lines dropped as unparsable.
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementMetadata {
    pub kind: StatementKind,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub transactions: Vec<Transaction>,
    pub summary: StatementSummary,
    pub metadata: StatementMetadata,
}

// ── Processing status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub status: ProcessingStatus,
    pub detail: Option<String>,
}

/// Tracks processing state per (user, file) pair. Injected at construction so
/// callers choose the backing store; keys are independent, and concurrent
/// writes to the same key are last-write-wins.
pub trait StatusStore: Send + Sync {
    fn set(&self, key: &str, record: ProcessingRecord);
    fn get(&self, key: &str) -> Option<ProcessingRecord>;
}

#[derive(Default)]
pub struct MemoryStatusStore {
    records: RwLock<HashMap<String, ProcessingRecord>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for MemoryStatusStore {
    fn set(&self, key: &str, record: ProcessingRecord) {
        if let Ok(mut map) = self.records.write() {
            map.insert(key.to_string(), record);
        }
    }

    fn get(&self, key: &str) -> Option<ProcessingRecord> {
        self.records.read().ok()?.get(key).cloned()
    }
}

pub fn status_key(user_id: &str, file_id: &str) -> String {
    format!("{user_id}:{file_id}")
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Converts a raw statement file into ordered, merchant-annotated
/// transactions plus a summary.
pub struct StatementParser<X: TextExtractor> {
    extractor: X,
    status: Arc<dyn StatusStore>,
}

impl<X: TextExtractor> StatementParser<X> {
    pub fn new(extractor: X, status: Arc<dyn StatusStore>) -> Self {
        Self { extractor, status }
    }

    pub fn status(&self, user_id: &str, file_id: &str) -> Option<ProcessingRecord> {
        self.status.get(&status_key(user_id, file_id))
    }

    /// Parse and record per-(user, file) processing status around the run.
    pub fn parse_tracked(
        &self,
        user_id: &str,
        file_id: &str,
        data: &[u8],
        kind: StatementKind,
    ) -> Result<ParsedStatement, ParseError> {
        let key = status_key(user_id, file_id);
        self.status.set(
            &key,
            ProcessingRecord {
                status: ProcessingStatus::Processing,
                detail: None,
            },
        );
        match self.parse(data, kind) {
            Ok(parsed) => {
                self.status.set(
                    &key,
                    ProcessingRecord {
                        status: ProcessingStatus::Completed,
                        detail: None,
                    },
                );
                Ok(parsed)
            }
            Err(e) => {
                self.status.set(
                    &key,
                    ProcessingRecord {
                        status: ProcessingStatus::Error,
                        detail: Some(e.to_string()),
                    },
                );
                Err(e)
            }
        }
    }

    pub fn parse(&self, data: &[u8], kind: StatementKind) -> Result<ParsedStatement, ParseError> {
        let started = Instant::now();

        let batch = match kind {
            StatementKind::Pdf => {
                let text = self.extractor.extract_text(data)?;
                scan_lines(&text)
            }
            StatementKind::Csv => csv::parse_csv(data)?,
            StatementKind::Xlsx => xlsx::parse_xlsx(data)?,
        };

        let transactions = assemble(batch.rows.iter().cloned());
        let summary = summarize(&transactions, batch.skipped);

        tracing::debug!(
            kind = %kind,
            count = transactions.len(),
            skipped = batch.skipped,
            "statement parsed"
        );

        Ok(ParsedStatement {
            transactions,
            summary,
            metadata: StatementMetadata {
                kind,
                processing_time_ms: started.elapsed().as_millis() as u64,
            },
        })
    }
}

/// Rows → sorted transactions with derived merchant and recurring flags.
fn assemble(rows: impl Iterator<Item = crate::RawRow>) -> Vec<Transaction> {
    let mut transactions: Vec<Transaction> = rows
        .map(|row| {
            let mut tx = Transaction::new(row.date, row.description, row.amount);
            tx.merchant = derive_merchant(&tx.description);
            tx
        })
        .collect();

    transactions.sort_by(|a, b| a.date.cmp(&b.date));
    flag_recurring(&mut transactions);
    transactions
}

/// A transaction is recurring when another one in the same batch has the
/// same description, an amount within tolerance, and a different date.
fn flag_recurring(transactions: &mut [Transaction]) {
    let snapshot: Vec<(String, i64, chrono::NaiveDate)> = transactions
        .iter()
        .map(|t| (t.description.clone(), t.amount.to_paise(), t.date))
        .collect();

    for (i, tx) in transactions.iter_mut().enumerate() {
        tx.is_recurring = snapshot.iter().enumerate().any(|(j, (desc, paise, date))| {
            j != i
                && *desc == tx.description
                && (paise - tx.amount.to_paise()).abs() <= RECURRING_TOLERANCE_PAISE
                && *date != tx.date
        });
    }
}

fn summarize(transactions: &[Transaction], skipped_rows: usize) -> StatementSummary {
    let total_amount: Money = transactions.iter().map(|t| t.amount).sum();
    let date_range = match (transactions.first(), transactions.last()) {
        (Some(first), Some(last)) => Some(DateRange::new(first.date, last.date)),
        _ => None,
    };

    let mut merchant_spend: HashMap<&str, Money> = HashMap::new();
    for tx in transactions {
        *merchant_spend.entry(tx.merchant.as_str()).or_insert_with(Money::zero) += tx.amount;
    }
    let mut top_merchants: Vec<(String, Money)> = merchant_spend
        .into_iter()
        .map(|(m, spend)| (m.to_string(), spend))
        .collect();
    top_merchants.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_merchants.truncate(TOP_MERCHANTS);

    StatementSummary {
        transaction_count: transactions.len(),
        total_amount,
        date_range,
        top_merchants,
        by_category: BTreeMap::new(),
        skipped_rows,
    }
}

/// Fill per-category subtotals once transactions carry categories.
pub fn summarize_with_categories(
    summary: &mut StatementSummary,
    transactions: &[Transaction],
) {
    let mut by_category: BTreeMap<Category, Money> = BTreeMap::new();
    for tx in transactions {
        *by_category.entry(tx.category).or_insert_with(Money::zero) += tx.amount;
    }
    summary.by_category = by_category;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::MockTextExtractor;
    use std::str::FromStr;

    fn parser(text: &str) -> StatementParser<MockTextExtractor> {
        StatementParser::new(
            MockTextExtractor::new(text),
            Arc::new(MemoryStatusStore::new()),
        )
    }

    // ── Kind dispatch ─────────────────────────────────────────────────────────

    #[test]
    fn kind_from_str() {
        assert_eq!(StatementKind::from_str("pdf").unwrap(), StatementKind::Pdf);
        assert_eq!(StatementKind::from_str("CSV").unwrap(), StatementKind::Csv);
        assert_eq!(
            StatementKind::from_str("spreadsheet").unwrap(),
            StatementKind::Xlsx
        );
        assert!(StatementKind::from_str("docx").is_err());
    }

    // ── End-to-end CSV ────────────────────────────────────────────────────────

    #[test]
    fn parse_csv_statement_scenario_a_shape() {
        let p = parser("");
        let data = b"Date,Merchant,Amount\n10/08/2025,Zomato Order,540\n";
        let parsed = p.parse(data, StatementKind::Csv).unwrap();

        assert_eq!(parsed.transactions.len(), 1);
        let tx = &parsed.transactions[0];
        assert_eq!(tx.date, chrono::NaiveDate::from_ymd_opt(2025, 8, 10).unwrap());
        assert_eq!(tx.merchant, "Zomato Order");
        assert_eq!(tx.amount.to_paise(), 54000);
    }

    #[test]
    fn transactions_sorted_by_date_ascending() {
        let p = parser("");
        let data = b"Date,Description,Amount\n12/08/2025,Later,100\n10/08/2025,Earlier,200\n";
        let parsed = p.parse(data, StatementKind::Csv).unwrap();
        assert_eq!(parsed.transactions[0].description, "Earlier");
        assert_eq!(parsed.transactions[1].description, "Later");
    }

    #[test]
    fn parse_is_idempotent_over_ids() {
        let p = parser("");
        let data = b"Date,Description,Amount\n10/08/2025,Zomato,540\n11/08/2025,Uber,250\n";
        let a = p.parse(data, StatementKind::Csv).unwrap();
        let b = p.parse(data, StatementKind::Csv).unwrap();
        let ids_a: std::collections::BTreeSet<_> =
            a.transactions.iter().map(|t| t.id.clone()).collect();
        let ids_b: std::collections::BTreeSet<_> =
            b.transactions.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }

    // ── Recurring detection ───────────────────────────────────────────────────

    #[test]
    fn recurring_flagged_for_repeated_description_and_amount() {
        let p = parser("");
        let data = b"Date,Description,Amount\n01/07/2025,NETFLIX SUBSCRIPTION,649\n01/08/2025,NETFLIX SUBSCRIPTION,649\n05/08/2025,ZOMATO,540\n";
        let parsed = p.parse(data, StatementKind::Csv).unwrap();
        assert!(parsed.transactions[0].is_recurring);
        assert!(parsed.transactions[1].is_recurring);
        assert!(!parsed.transactions[2].is_recurring);
    }

    #[test]
    fn same_day_duplicate_is_not_recurring() {
        let p = parser("");
        let data = b"Date,Description,Amount\n10/08/2025,CHAI POINT,40\n10/08/2025,CHAI POINT,40\n";
        let parsed = p.parse(data, StatementKind::Csv).unwrap();
        assert!(!parsed.transactions[0].is_recurring);
        assert!(!parsed.transactions[1].is_recurring);
    }

    // ── PDF path ──────────────────────────────────────────────────────────────

    #[test]
    fn parse_pdf_uses_extractor_text() {
        let p = parser("10/08/2025  ZOMATO ORDER  540.00\n11/08/2025  UBER TRIP  250.00");
        let parsed = p.parse(b"%PDF-ignored", StatementKind::Pdf).unwrap();
        assert_eq!(parsed.transactions.len(), 2);
        assert_eq!(parsed.summary.transaction_count, 2);
        assert_eq!(parsed.metadata.kind, StatementKind::Pdf);
    }

    // ── Summary ───────────────────────────────────────────────────────────────

    #[test]
    fn summary_totals_and_range() {
        let p = parser("");
        let data =
            b"Date,Description,Amount\n10/08/2025,Zomato,540\n11/08/2025,Uber,250\n12/08/2025,Zomato,540\n";
        let parsed = p.parse(data, StatementKind::Csv).unwrap();
        let s = &parsed.summary;
        assert_eq!(s.transaction_count, 3);
        assert_eq!(s.total_amount.to_paise(), 133000);
        let range = s.date_range.unwrap();
        assert_eq!(range.start, chrono::NaiveDate::from_ymd_opt(2025, 8, 10).unwrap());
        assert_eq!(range.end, chrono::NaiveDate::from_ymd_opt(2025, 8, 12).unwrap());
        // Zomato (1080) outranks Uber (250).
        assert_eq!(s.top_merchants[0].0, "Zomato");
    }

    #[test]
    fn summary_with_categories_fills_subtotals() {
        let p = parser("");
        let data = b"Date,Description,Amount\n10/08/2025,Zomato,540\n";
        let mut parsed = p.parse(data, StatementKind::Csv).unwrap();
        parsed.transactions[0].category = Category::Food;
        let mut summary = parsed.summary.clone();
        summarize_with_categories(&mut summary, &parsed.transactions);
        assert_eq!(summary.by_category[&Category::Food].to_paise(), 54000);
    }

    // ── Status tracking ───────────────────────────────────────────────────────

    #[test]
    fn tracked_parse_records_completed() {
        let p = parser("");
        let data = b"Date,Description,Amount\n10/08/2025,Zomato,540\n";
        p.parse_tracked("user-1", "file-1", data, StatementKind::Csv)
            .unwrap();
        let record = p.status("user-1", "file-1").unwrap();
        assert_eq!(record.status, ProcessingStatus::Completed);
    }

    #[test]
    fn tracked_parse_records_error_detail() {
        let p = parser("");
        let data = b"Date,Merchant\n10/08/2025,Zomato\n";
        assert!(p
            .parse_tracked("user-1", "file-2", data, StatementKind::Csv)
            .is_err());
        let record = p.status("user-1", "file-2").unwrap();
        assert_eq!(record.status, ProcessingStatus::Error);
        assert!(record.detail.unwrap().contains("amount"));
    }

    #[test]
    fn status_keys_are_per_user_and_file() {
        let p = parser("");
        assert!(p.status("user-1", "file-9").is_none());
        assert_eq!(status_key("u", "f"), "u:f");
    }
}

use cardwise_core::Money;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::{ParseError, RawRow, RowBatch};

/// Synonym sets for fuzzy header matching, checked case-insensitively.
/// Exact equality wins over substring containment.
const DATE_SYNONYMS: &[&str] = &[
    "date",
    "txn date",
    "tran date",
    "transaction date",
    "value date",
    "posting date",
];
const DESCRIPTION_SYNONYMS: &[&str] = &[
    "description",
    "narration",
    "particulars",
    "details",
    "merchant",
    "transaction details",
    "remarks",
];
const AMOUNT_SYNONYMS: &[&str] = &[
    "amount",
    "debit",
    "transaction amount",
    "withdrawal amount",
    "amount (inr)",
    "value",
];

/// Accepted date formats, tried in order. A date that parses under none of
/// these drops the row.
pub(crate) const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d/%m/%y", "%d-%m-%y"];

/// Column indices for the three required roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRoles {
    pub date: usize,
    pub description: usize,
    pub amount: usize,
}

/// Resolve the required roles against a header row. Unlike PDF line
/// scanning, a missing role fails the whole file.
pub fn resolve_roles(headers: &[String]) -> Result<HeaderRoles, ParseError> {
    let date = match_role(headers, DATE_SYNONYMS).ok_or(ParseError::MissingColumn("date"))?;
    let description = match_role(headers, DESCRIPTION_SYNONYMS)
        .ok_or(ParseError::MissingColumn("description"))?;
    let amount = match_role(headers, AMOUNT_SYNONYMS).ok_or(ParseError::MissingColumn("amount"))?;
    Ok(HeaderRoles {
        date,
        description,
        amount,
    })
}

fn match_role(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    // Pass 1: exact match.
    for syn in synonyms {
        if let Some(idx) = lowered.iter().position(|h| h == syn) {
            return Some(idx);
        }
    }
    // Pass 2: containment either way ("Txn Date" vs "date").
    for syn in synonyms {
        if let Some(idx) = lowered
            .iter()
            .position(|h| h.contains(syn) || (!h.is_empty() && syn.contains(h.as_str())))
        {
            return Some(idx);
        }
    }
    None
}

/// Parse a statement date under the accepted formats.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Clean currency symbols, thousands separators, and debit/credit markers,
/// then coerce to a non-negative amount.
pub(crate) fn parse_amount(s: &str) -> Option<Money> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (_negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let mut cleaned = s
        .replace('₹', "")
        .replace("Rs.", "")
        .replace("INR", "")
        .replace([',', ' '], "");
    for marker in ["CR", "Cr", "cr", "DR", "Dr", "dr"] {
        if let Some(stripped) = cleaned.strip_suffix(marker) {
            cleaned = stripped.to_string();
            break;
        }
    }
    let dec = Decimal::from_str(cleaned.trim()).ok()?;
    // Statements are card spend; the sign of debit/credit is normalized away.
    Some(Money::from_decimal(dec.abs()))
}

/// Parse CSV bytes into rows. Header resolution failure is fatal; a row with
/// an unparsable date or amount is skipped and counted.
pub fn parse_csv(data: &[u8]) -> Result<RowBatch, ParseError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::Unreadable {
            kind: "csv",
            detail: e.to_string(),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let roles = resolve_roles(&headers)?;

    let mut batch = RowBatch::default();
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                batch.skipped += 1;
                continue;
            }
        };
        if record.is_empty() {
            continue;
        }
        match row_from_fields(
            record.get(roles.date).unwrap_or_default(),
            record.get(roles.description).unwrap_or_default(),
            record.get(roles.amount).unwrap_or_default(),
        ) {
            Some(row) => batch.rows.push(row),
            None => batch.skipped += 1,
        }
    }

    if batch.rows.is_empty() {
        return Err(ParseError::NoDataRows);
    }
    Ok(batch)
}

/// Shared row assembly for the CSV and XLSX paths.
pub(crate) fn row_from_fields(date: &str, description: &str, amount: &str) -> Option<RawRow> {
    let date = parse_date(date)?;
    let amount = parse_amount(amount)?;
    let description = description.trim().to_string();
    if description.is_empty() {
        return None;
    }
    Some(RawRow {
        date,
        description,
        amount,
    })
}

use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

use crate::csv::{resolve_roles, row_from_fields};
use crate::{ParseError, RowBatch};

/// Parse the first worksheet that yields a usable header row. Rows feed the
/// same role/row pipeline as CSV, so the failure semantics match: missing
/// columns are fatal, bad rows are skipped.
pub fn parse_xlsx(data: &[u8]) -> Result<RowBatch, ParseError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(data)).map_err(|e| ParseError::Unreadable {
            kind: "xlsx",
            detail: e.to_string(),
        })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut role_error: Option<ParseError> = None;

    for name in sheet_names {
        let Ok(range) = workbook.worksheet_range(&name) else {
            continue;
        };
        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            continue;
        };
        let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();
        let roles = match resolve_roles(&headers) {
            Ok(r) => r,
            Err(e) => {
                // Remember the first role failure; a later sheet may still match.
                role_error.get_or_insert(e);
                continue;
            }
        };

        let mut batch = RowBatch::default();
        for row in rows {
            let date = row.get(roles.date).map(cell_to_string).unwrap_or_default();
            let description = row
                .get(roles.description)
                .map(cell_to_string)
                .unwrap_or_default();
            let amount = row.get(roles.amount).map(cell_to_string).unwrap_or_default();
            if date.is_empty() && description.is_empty() && amount.is_empty() {
                continue;
            }
            match row_from_fields(&date, &description, &amount) {
                Some(r) => batch.rows.push(r),
                None => batch.skipped += 1,
            }
        }

        if batch.rows.is_empty() {
            return Err(ParseError::NoDataRows);
        }
        return Ok(batch);
    }

    Err(role_error.unwrap_or(ParseError::NoDataRows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                format!("{f}")
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_float_without_fraction_renders_as_integer() {
        assert_eq!(cell_to_string(&Data::Float(540.0)), "540");
        assert_eq!(cell_to_string(&Data::Float(540.5)), "540.5");
    }

    #[test]
    fn cell_empty_is_empty_string() {
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn parse_xlsx_rejects_non_xlsx_bytes() {
        assert!(matches!(
            parse_xlsx(b"this is not a zip archive"),
            Err(ParseError::Unreadable { kind: "xlsx", .. })
        ));
    }
}

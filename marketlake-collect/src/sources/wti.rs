//! WTI crude daily CSV (`Date,Price`).

use chrono::NaiveDate;
use marketlake_core::domain::{non_negative, parse_date, round6};
use marketlake_core::{OilDailyPrice, ParseError};

use super::Parsed;

/// Parse the CSV and keep rows whose date falls in `start..=end`.
///
/// Out-of-range rows are dropped silently; rows with an unreadable date or
/// price are reported in `skipped`. A missing `Date` or `Price` header fails
/// the whole file.
pub fn parse_wti_csv(
    text: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Parsed<OilDailyPrice>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Malformed(format!("WTI CSV header: {e}")))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseError::Malformed(format!("WTI CSV has no '{name}' column")))
    };
    let date_idx = column("Date")?;
    let price_idx = column("Price")?;

    let mut parsed = Parsed::default();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                parsed.skipped.push(ParseError::Malformed(e.to_string()));
                continue;
            }
        };
        let row = parse_row(
            record.get(date_idx).unwrap_or_default(),
            record.get(price_idx).unwrap_or_default(),
        );
        match row {
            Ok(row) if row.date < start || row.date > end => {}
            other => parsed.push(other),
        }
    }
    parsed.rows.sort_by_key(|r| r.date);
    Ok(parsed)
}

fn parse_row(date: &str, price: &str) -> Result<OilDailyPrice, ParseError> {
    if date.is_empty() {
        return Err(ParseError::MissingField { field: "Date" });
    }
    if price.is_empty() {
        return Err(ParseError::MissingField { field: "Price" });
    }
    let date = parse_date("Date", date)?;
    let value: f64 = price.parse().map_err(|_| ParseError::InvalidValue {
        field: "Price",
        value: price.to_string(),
    })?;
    Ok(OilDailyPrice {
        date,
        price_usd: round6(non_negative("Price", value)?),
    })
}

//! Yahoo Finance v8 chart API.
//!
//! Yahoo has no official API and changes its format without notice; anything
//! that does not match the shape below is reported as a malformed payload.

use chrono::{DateTime, NaiveDate};
use marketlake_core::domain::{non_negative, round6};
use marketlake_core::{ParseError, StockDailyBar};
use serde::Deserialize;

use super::Parsed;

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Chart URL for one ticker. `^` is percent-encoded for index symbols.
pub fn chart_url(base_url: &str, ticker: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        ticker.replace('^', "%5E")
    )
}

/// Query parameters covering `start..=end` at daily resolution.
pub fn chart_params(start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
    let period1 = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
    let period2 = end
        .succ_opt()
        .unwrap_or(end)
        .and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .timestamp();
    vec![
        ("period1", period1.to_string()),
        ("period2", period2.to_string()),
        ("interval", "1d".to_string()),
        ("events", "history".to_string()),
    ]
}

/// Turn a chart response into daily bars for `ticker` within `start..=end`.
///
/// Dates are taken in the exchange's local time using the reported GMT
/// offset. Bars missing any of open, high, low, close or volume are skipped.
pub fn parse_chart(
    ticker: &str,
    resp: ChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Parsed<StockDailyBar>, ParseError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) => {
            return Err(ParseError::Malformed(format!(
                "{ticker}: {}: {}",
                err.code, err.description
            )))
        }
        (None, None) => {
            return Err(ParseError::Malformed(format!(
                "{ticker}: empty result with no error"
            )))
        }
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::Malformed(format!("{ticker}: result array is empty")))?;
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    // A range with no trading days comes back without timestamps.
    let Some(timestamps) = data.timestamp else {
        return Ok(Parsed::default());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::Malformed(format!("{ticker}: no quote data")))?;

    let mut parsed = Parsed::default();
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(ts + offset, 0).map(|dt| dt.date_naive()) else {
            parsed.skipped.push(ParseError::InvalidValue {
                field: "timestamp",
                value: ts.to_string(),
            });
            continue;
        };
        if date < start || date > end {
            continue;
        }

        let at = |series: &[Option<f64>]| series.get(i).copied().flatten();
        parsed.push(bar(
            ticker,
            date,
            [
                at(&quote.open),
                at(&quote.high),
                at(&quote.low),
                at(&quote.close),
            ],
            at(&quote.volume),
        ));
    }
    Ok(parsed)
}

fn bar(
    ticker: &str,
    date: NaiveDate,
    ohlc: [Option<f64>; 4],
    volume: Option<f64>,
) -> Result<StockDailyBar, ParseError> {
    const FIELDS: [&str; 4] = ["open", "high", "low", "close"];
    let mut values = [0.0; 4];
    for ((slot, value), field) in values.iter_mut().zip(ohlc).zip(FIELDS) {
        let v = value.ok_or(ParseError::MissingField { field })?;
        *slot = round6(non_negative(field, v)?);
    }
    let volume = volume.ok_or(ParseError::MissingField { field: "volume" })?;
    let volume = non_negative("volume", volume)?;

    let [open, high, low, close] = values;
    Ok(StockDailyBar {
        ticker: ticker.to_string(),
        date,
        open,
        high,
        low,
        close,
        volume: volume.round() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn index_tickers_are_encoded() {
        assert_eq!(
            chart_url("https://query2.finance.yahoo.com/v8/finance/chart/", "^GSPC"),
            "https://query2.finance.yahoo.com/v8/finance/chart/%5EGSPC"
        );
        assert_eq!(chart_url("http://h/c", "AAPL"), "http://h/c/AAPL");
    }

    #[test]
    fn period_covers_end_date_inclusive() {
        let params = chart_params(d(2020, 1, 1), d(2025, 9, 30));
        assert!(params.contains(&("period1", "1577836800".to_string())));
        // 2025-10-01T00:00:00Z
        assert!(params.contains(&("period2", "1759276800".to_string())));
    }

    #[test]
    fn error_payload_is_malformed() {
        let resp: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap();
        let err = parse_chart("^NOPE", resp, d(2020, 1, 1), d(2020, 12, 31)).unwrap_err();
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn null_fields_skip_the_bar() {
        let resp: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":[{
                "meta":{"gmtoffset":-18000},
                "timestamp":[1735828200,1735914600],
                "indicators":{"quote":[{
                    "open":[5903.26,null],
                    "high":[5949.34,5949.0],
                    "low":[5832.3,5888.0],
                    "close":[5868.55,5942.47],
                    "volume":[3621680000,3667340000]
                }]}
            }],"error":null}}"#,
        )
        .unwrap();
        let parsed = parse_chart("^GSPC", resp, d(2025, 1, 1), d(2025, 1, 31)).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].date, d(2025, 1, 2));
        assert_eq!(parsed.rows[0].volume, 3_621_680_000);
        assert_eq!(parsed.skipped, vec![ParseError::MissingField { field: "open" }]);
    }
}

//! Payload parsers for each remote source.
//!
//! Parsers are pure: they take a fetched payload and return typed rows plus
//! the reasons any individual record was skipped. Whole-payload problems are
//! returned as an error.

pub mod coingecko;
pub mod wti;
pub mod yahoo;

use marketlake_core::ParseError;

/// Rows parsed from one payload, with the records that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub skipped: Vec<ParseError>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    pub fn push(&mut self, record: Result<T, ParseError>) {
        match record {
            Ok(row) => self.rows.push(row),
            Err(e) => self.skipped.push(e),
        }
    }
}

//! Sources of historical returns.
//!
//! The optimizer only sees a [`ReturnsMatrix`]; where it comes from is the
//! business of a [`ReturnsProvider`]. [`CsvPriceProvider`] reads a wide price
//! table (one date column, one column per ticker) and turns the selected
//! lookback window into simple returns.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Duration, Months, NaiveDate};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TailRiskError};
use crate::returns::ReturnsMatrix;

/// Lookback window relative to the most recent observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    /// The whole history.
    Max,
}

impl Period {
    /// First date inside the window ending at `last`.
    pub fn start_from(&self, last: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Period::Days(n) => last.checked_sub_signed(Duration::days(i64::from(n))),
            Period::Weeks(n) => last.checked_sub_signed(Duration::weeks(i64::from(n))),
            Period::Months(n) => last.checked_sub_months(Months::new(n)),
            Period::Years(n) => last.checked_sub_months(Months::new(n.saturating_mul(12))),
            Period::Max => None,
        }
    }
}

impl FromStr for Period {
    type Err = TailRiskError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") {
            return Ok(Period::Max);
        }

        let invalid = || {
            TailRiskError::Configuration(format!(
                "invalid period '{}': expected <n>D, <n>W, <n>M, <n>Y or max",
                s
            ))
        };

        let split = s.len().checked_sub(1).ok_or_else(invalid)?;
        if !s.is_char_boundary(split) {
            return Err(invalid());
        }
        let (count, unit) = s.split_at(split);
        let n: u32 = count.parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }

        match unit.to_ascii_uppercase().as_str() {
            "D" => Ok(Period::Days(n)),
            "W" => Ok(Period::Weeks(n)),
            "M" => Ok(Period::Months(n)),
            "Y" => Ok(Period::Years(n)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = TailRiskError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> String {
        p.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{}D", n),
            Period::Weeks(n) => write!(f, "{}W", n),
            Period::Months(n) => write!(f, "{}M", n),
            Period::Years(n) => write!(f, "{}Y", n),
            Period::Max => f.write_str("max"),
        }
    }
}

/// Supplies the return sample for a set of tickers.
pub trait ReturnsProvider {
    /// Returns of `tickers`, in that column order, over `period`.
    fn returns(&self, tickers: &[String], period: Period) -> Result<ReturnsMatrix>;
}

/// Wide CSV price table: `date,<ticker>,<ticker>,...`.
///
/// Dates are `YYYY-MM-DD`; rows may appear in any order. Empty cells and
/// `NaN`/`null` mark missing prices.
#[derive(Debug, Clone)]
pub struct CsvPriceProvider {
    path: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        CsvPriceProvider {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full table as `(columns, dated price rows)` sorted by date.
    fn load(&self) -> Result<(Vec<String>, Vec<(NaiveDate, Vec<f64>)>)> {
        info!("Loading prices from: {}", self.path.display());

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let columns: Vec<String> = reader.headers()?.iter().skip(1).map(str::to_string).collect();
        if columns.is_empty() {
            return Err(TailRiskError::Data(format!(
                "{} has no price columns",
                self.path.display()
            )));
        }

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let date_field = record.get(0).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d").map_err(|e| {
                TailRiskError::Data(format!(
                    "row {}: invalid date '{}': {}",
                    line + 1,
                    date_field,
                    e
                ))
            })?;

            let prices = (1..=columns.len())
                .map(|i| parse_price(record.get(i).unwrap_or_default(), line + 1))
                .collect::<Result<Vec<f64>>>()?;
            rows.push((date, prices));
        }

        rows.sort_by_key(|(date, _)| *date);
        debug!("Loaded {} price rows for {} columns", rows.len(), columns.len());
        Ok((columns, rows))
    }
}

fn parse_price(field: &str, line: usize) -> Result<f64> {
    if field.is_empty()
        || field.eq_ignore_ascii_case("nan")
        || field.eq_ignore_ascii_case("null")
    {
        return Ok(f64::NAN);
    }
    field
        .parse()
        .map_err(|_| TailRiskError::Data(format!("row {}: invalid price '{}'", line, field)))
}

impl ReturnsProvider for CsvPriceProvider {
    fn returns(&self, tickers: &[String], period: Period) -> Result<ReturnsMatrix> {
        let (columns, rows) = self.load()?;

        let selected: Vec<String> = if tickers.is_empty() {
            columns.clone()
        } else {
            tickers.to_vec()
        };
        let indices = selected
            .iter()
            .map(|t| {
                columns.iter().position(|c| c == t).ok_or_else(|| {
                    TailRiskError::Configuration(format!(
                        "ticker '{}' not found in {}",
                        t,
                        self.path.display()
                    ))
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let start = rows
            .last()
            .and_then(|(last, _)| period.start_from(*last));
        let prices: Vec<Vec<f64>> = rows
            .iter()
            .filter(|(date, _)| start.map_or(true, |s| *date >= s))
            .map(|(_, row)| indices.iter().map(|&i| row[i]).collect())
            .collect();

        info!(
            "Using {} price rows for {} tickers over period {}",
            prices.len(),
            selected.len(),
            period
        );

        ReturnsMatrix::from_prices(&prices, selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_period() {
        assert_eq!("5Y".parse::<Period>().unwrap(), Period::Years(5));
        assert_eq!("6m".parse::<Period>().unwrap(), Period::Months(6));
        assert_eq!("10D".parse::<Period>().unwrap(), Period::Days(10));
        assert_eq!("2W".parse::<Period>().unwrap(), Period::Weeks(2));
        assert_eq!("max".parse::<Period>().unwrap(), Period::Max);
        for bad in ["", "Y", "0Y", "5X", "abc", "-1Y"] {
            assert!(bad.parse::<Period>().is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_period_start() {
        let last = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(
            Period::Years(1).start_from(last),
            NaiveDate::from_ymd_opt(2023, 3, 31)
        );
        assert_eq!(
            Period::Days(10).start_from(last),
            NaiveDate::from_ymd_opt(2024, 3, 21)
        );
        assert_eq!(Period::Max.start_from(last), None);
    }

    #[test]
    fn test_csv_returns_in_requested_order() {
        let file = write_csv(
            "date,SPY,GLD\n\
             2024-01-03,110,50\n\
             2024-01-02,100,50\n\
             2024-01-04,99,55\n",
        );
        let provider = CsvPriceProvider::new(file.path());
        let tickers = vec!["GLD".to_string(), "SPY".to_string()];
        let m = provider.returns(&tickers, Period::Max).unwrap();

        assert_eq!(m.asset_ids(), &["GLD".to_string(), "SPY".to_string()]);
        assert_eq!(m.n_obs(), 2);
        assert_relative_eq!(m.data()[(0, 1)], 0.10, epsilon = 1e-12);
        assert_relative_eq!(m.data()[(1, 0)], 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_csv_period_and_missing_values() {
        let file = write_csv(
            "date,A,B\n\
             2023-01-02,1,1\n\
             2024-01-02,100,10\n\
             2024-01-03,,11\n\
             2024-01-04,102,12\n\
             2024-01-05,103,13\n\
             2024-01-08,104,14\n",
        );
        let provider = CsvPriceProvider::new(file.path());
        let m = provider.returns(&[], Period::Months(1)).unwrap();
        // 2023 row is outside the window; two periods touch the gap.
        assert_eq!(m.n_obs(), 2);
        assert_relative_eq!(m.data()[(0, 0)], 103.0 / 102.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_csv_unknown_ticker() {
        let file = write_csv("date,A\n2024-01-02,1\n2024-01-03,2\n2024-01-04,3\n");
        let provider = CsvPriceProvider::new(file.path());
        let err = provider.returns(&["ZZZ".to_string()], Period::Max).unwrap_err();
        assert!(matches!(err, TailRiskError::Configuration(_)));
    }

    #[test]
    fn test_csv_bad_price() {
        let file = write_csv("date,A\n2024-01-02,1\n2024-01-03,abc\n");
        let provider = CsvPriceProvider::new(file.path());
        let err = provider.returns(&[], Period::Max).unwrap_err();
        assert!(matches!(err, TailRiskError::Data(_)));
    }
}

use crate::error::{Error, Result};
use chrono::{Duration, NaiveDate};

/// Relabel a chronological sequence of weekly sample dates as inclusive
/// "start - end" ranges. Each label runs up to the day before the next
/// sample; the last label assumes the 7-day cadence and covers 6 more days.
pub fn window_labels(points: &[NaiveDate]) -> Vec<String> {
    points
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = match points.get(i + 1) {
                Some(next) => *next - Duration::days(1),
                None => *start + Duration::days(6),
            };
            format!("{} - {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
        })
        .collect()
}

/// One keyword's interest-over-time series as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSeries {
    pub points: Vec<NaiveDate>,
    pub values: Vec<u32>,
}

/// Accumulator for per-keyword series sharing one sample index.
///
/// The first series pushed establishes the row index; later series are
/// appended as columns and must match its length. Starts empty, merges
/// unconditionally.
#[derive(Debug, Default)]
pub struct TrendTable {
    index: Vec<NaiveDate>,
    columns: Vec<(String, Vec<u32>)>,
}

impl TrendTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Append one keyword's series as a new column.
    pub fn push_series(&mut self, keyword: &str, series: KeywordSeries) -> Result<()> {
        if series.points.len() != series.values.len() {
            return Err(Error::ShapeMismatch {
                keyword: keyword.to_string(),
                expected: series.points.len(),
                got: series.values.len(),
            });
        }
        if self.columns.is_empty() {
            self.index = series.points;
        } else if series.values.len() != self.index.len() {
            return Err(Error::ShapeMismatch {
                keyword: keyword.to_string(),
                expected: self.index.len(),
                got: series.values.len(),
            });
        }
        self.columns.push((keyword.to_string(), series.values));
        Ok(())
    }

    /// Render as CSV: header row with an empty leading cell then one column
    /// per keyword, data rows keyed by the window label.
    pub fn to_csv(&self) -> String {
        let labels = window_labels(&self.index);

        // Pre-size: labels + values + separators, roughly.
        let mut csv = String::with_capacity((self.index.len() + 1) * 32);
        for (keyword, _) in &self.columns {
            csv.push(',');
            csv.push_str(&csv_field(keyword));
        }
        csv.push('\n');

        for (row, label) in labels.iter().enumerate() {
            csv.push_str(&csv_field(label));
            for (_, values) in &self.columns {
                csv.push(',');
                csv.push_str(&values[row].to_string());
            }
            csv.push('\n');
        }
        csv
    }
}

/// Quote a field if it contains a delimiter, quote, or newline.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

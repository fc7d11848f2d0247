//! Daily form-completion trend for the title page.

use crate::utils::present;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DATETIME_FORMATS: [&str; 7] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d.%m.%Y"];

/// Completions recorded on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Completions per day, ascending by date. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTrend")]
pub struct CompletionTrend {
    days: Vec<DailyCount>,
}

#[derive(Deserialize)]
struct RawTrend {
    days: Vec<DailyCount>,
}

impl TryFrom<RawTrend> for CompletionTrend {
    type Error = String;

    fn try_from(raw: RawTrend) -> Result<Self, Self::Error> {
        Self::new(raw.days).ok_or_else(|| "completion trend has no days".to_string())
    }
}

impl CompletionTrend {
    /// Build a trend from daily counts, sorted by date. `None` when empty.
    pub fn new(mut days: Vec<DailyCount>) -> Option<Self> {
        if days.is_empty() {
            return None;
        }
        days.sort_by_key(|d| d.date);
        Some(Self { days })
    }

    pub fn days(&self) -> &[DailyCount] {
        &self.days
    }

    /// Busiest day; the earliest one on ties.
    pub fn peak(&self) -> DailyCount {
        let mut peak = self.days[0];
        for day in &self.days[1..] {
            if day.count > peak.count {
                peak = *day;
            }
        }
        peak
    }

    pub fn average(&self) -> f64 {
        let total: usize = self.days.iter().map(|d| d.count).sum();
        total as f64 / self.days.len() as f64
    }

    pub fn first_date(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.days[self.days.len() - 1].date
    }

    /// Lines printed under the trend chart.
    pub fn summary_lines(&self) -> Vec<String> {
        let peak = self.peak();
        vec![
            format!(
                "Peak completion day: {} ({} completions)",
                peak.date.format("%d %B"),
                peak.count
            ),
            format!("Average daily completions: {}", self.average().round() as i64),
            format!("Total days with responses: {}", self.days.len()),
            format!(
                "Data range: {} to {}",
                self.first_date().format("%d %B"),
                self.last_date().format("%d %B")
            ),
        ]
    }
}

/// Whether a completion trend could be computed, and why not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionStatus {
    ColumnMissing { column: String },
    NoTimestamps,
    NoValidDates,
    Trend(CompletionTrend),
}

impl CompletionStatus {
    /// Explanation shown instead of the chart.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::ColumnMissing { column } => {
                Some(format!("Timestamp column '{}' not found in data", column))
            }
            Self::NoTimestamps => Some("No timestamp data available for this professor".to_string()),
            Self::NoValidDates => {
                Some("No valid timestamp data found for this professor".to_string())
            }
            Self::Trend(_) => None,
        }
    }
}

/// Parse the date part of a completion timestamp.
pub fn parse_timestamp(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

/// Compute the completion status of a timestamp column.
///
/// `values` is `None` when the column itself is absent from the table.
pub fn completion_status(column: &str, values: Option<&[Option<String>]>) -> CompletionStatus {
    let Some(values) = values else {
        return CompletionStatus::ColumnMissing {
            column: column.to_string(),
        };
    };

    let stamps: Vec<&str> = values.iter().filter_map(present).collect();
    if stamps.is_empty() {
        return CompletionStatus::NoTimestamps;
    }

    let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in stamps.iter().filter_map(|s| parse_timestamp(s)) {
        *daily.entry(date).or_insert(0) += 1;
    }
    let days = daily
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect();
    match CompletionTrend::new(days) {
        Some(trend) => CompletionStatus::Trend(trend),
        None => CompletionStatus::NoValidDates,
    }
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::normalize::year_number;

/// One `(period, value)` observation as exported to CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub period: String,
    pub value: f64,
}

/// Yearly series with at most one value per period, always ascending.
///
/// Periods are 4-digit year strings, so lexicographic order of the backing
/// map is also chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    points: BTreeMap<String, f64>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series, summing values that share a period.
    pub fn from_pairs<P, I>(pairs: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = (P, f64)>,
    {
        let mut series = Self::new();
        for (period, value) in pairs {
            series.add(period, value);
        }
        series
    }

    pub fn from_years<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        Self::from_pairs(pairs.into_iter().map(|(year, value)| (year.to_string(), value)))
    }

    /// Adds `value` to the period, creating it when absent.
    pub fn add(&mut self, period: impl Into<String>, value: f64) {
        *self.points.entry(period.into()).or_insert(0.0) += value;
    }

    /// Overwrites the value stored for `period`.
    pub fn set(&mut self, period: impl Into<String>, value: f64) {
        self.points.insert(period.into(), value);
    }

    pub fn get(&self, period: &str) -> Option<f64> {
        self.points.get(period).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.points.iter().map(|(period, value)| (period.as_str(), *value))
    }

    pub fn periods(&self) -> Vec<String> {
        self.points.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.values().copied().collect()
    }

    /// Integer years of every period, or the first period that is not a year.
    pub fn years(&self) -> Result<Vec<i32>, String> {
        self.points
            .keys()
            .map(|period| year_number(period).ok_or_else(|| period.clone()))
            .collect()
    }

    pub fn max_value(&self) -> Option<f64> {
        self.points.values().copied().fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
    }

    pub fn min_value(&self) -> Option<f64> {
        self.points.values().copied().fold(None, |acc, v| match acc {
            Some(m) if m <= v => Some(m),
            _ => Some(v),
        })
    }

    pub fn map_values<F>(&self, f: F) -> TimeSeries
    where
        F: Fn(f64) -> f64,
    {
        TimeSeries {
            points: self.points.iter().map(|(p, v)| (p.clone(), f(*v))).collect(),
        }
    }

    /// Outer merge on period; a side lacking a period contributes `0.0`.
    pub fn outer_combine<F>(&self, other: &TimeSeries, f: F) -> TimeSeries
    where
        F: Fn(f64, f64) -> f64,
    {
        let mut points = BTreeMap::new();
        for period in self.points.keys().chain(other.points.keys()) {
            if points.contains_key(period) {
                continue;
            }
            let left = self.get(period).unwrap_or(0.0);
            let right = other.get(period).unwrap_or(0.0);
            points.insert(period.clone(), f(left, right));
        }
        TimeSeries { points }
    }

    pub fn to_records(&self) -> Vec<TimeSeriesRecord> {
        self.iter()
            .map(|(period, value)| TimeSeriesRecord {
                period: period.to_string(),
                value,
            })
            .collect()
    }
}

impl FromIterator<TimeSeriesRecord> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = TimeSeriesRecord>>(iter: I) -> Self {
        TimeSeries::from_pairs(iter.into_iter().map(|r| (r.period, r.value)))
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (period, value) in self.iter() {
            writeln!(f, "{}: {:.4}", period, value)?;
        }
        Ok(())
    }
}

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;

use crate::config::constants::{HERD_QUANTITY_COLUMN, HERD_TYPE_COLUMN, LIVESTOCK_KEY};
use crate::models::time_series::TimeSeries;
use crate::utils::frame::{number_values, text_values};
use crate::utils::logging::{self, OperationCategory};
use crate::utils::normalize::normalize_year_key;

/// Descriptive statistics; `std` is the sample standard deviation and is
/// `None` for fewer than two values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;
    let std = (count > 1).then(|| {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    });
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(Summary { count, sum, mean, std, min, max })
}

/// Pearson correlation coefficient; `None` when either side is constant or
/// there are fewer than two pairs.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Correlates two yearly series over the years they share.
/// Returns the number of shared years and the coefficient.
pub fn correlate(a: &TimeSeries, b: &TimeSeries) -> Option<(usize, f64)> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .filter_map(|(period, x)| b.get(period).map(|y| (x, y)))
        .unzip();
    pearson(&xs, &ys).map(|r| (xs.len(), r))
}

fn has_herd_columns(live: &DataFrame) -> bool {
    [LIVESTOCK_KEY, HERD_TYPE_COLUMN, HERD_QUANTITY_COLUMN]
        .iter()
        .all(|c| live.column(c).is_ok())
}

/// Rows of one year, with the herd type as text and the headcount as numbers.
fn herds_in_year(live: &DataFrame, year: &str) -> LazyFrame {
    live.clone()
        .lazy()
        .select([
            col(LIVESTOCK_KEY).cast(DataType::String),
            col(HERD_TYPE_COLUMN).cast(DataType::String),
            col(HERD_QUANTITY_COLUMN).cast(DataType::Float64),
        ])
        .filter(col(LIVESTOCK_KEY).eq(lit(year)))
}

/// Headcount per herd type and year, summed across municipalities.
pub fn herd_totals(live: &DataFrame) -> PolarsResult<BTreeMap<String, TimeSeries>> {
    let _timing = logging::start_timing("herd_totals", OperationCategory::Analysis);
    let mut totals: BTreeMap<String, TimeSeries> = BTreeMap::new();
    if !has_herd_columns(live) {
        return Ok(totals);
    }

    let grouped = live
        .clone()
        .lazy()
        .select([
            col(HERD_TYPE_COLUMN).cast(DataType::String),
            col(LIVESTOCK_KEY).cast(DataType::String),
            col(HERD_QUANTITY_COLUMN).cast(DataType::Float64).fill_null(lit(0.0)),
        ])
        .group_by([col(HERD_TYPE_COLUMN), col(LIVESTOCK_KEY)])
        .agg([col(HERD_QUANTITY_COLUMN).sum()])
        .collect()?;

    let herds = text_values(&grouped, HERD_TYPE_COLUMN)?;
    let years = text_values(&grouped, LIVESTOCK_KEY)?;
    let sums = number_values(&grouped, HERD_QUANTITY_COLUMN)?;
    for ((herd, period), total) in herds.into_iter().zip(years).zip(sums) {
        if let Some(year) = period.as_deref().and_then(normalize_year_key) {
            totals
                .entry(herd.unwrap_or_default())
                .or_default()
                .add(year, total.unwrap_or(0.0));
        }
    }
    Ok(totals)
}

/// Year-over-year percentage change of each herd type. The first year of a
/// type, and years following a zero total, have no rate.
pub fn herd_growth_rates(live: &DataFrame) -> PolarsResult<BTreeMap<String, TimeSeries>> {
    Ok(herd_totals(live)?
        .into_iter()
        .map(|(herd, series)| {
            let points: Vec<(&str, f64)> = series.iter().collect();
            let rates = TimeSeries::from_pairs(points.windows(2).filter_map(|w| {
                let (_, previous) = w[0];
                let (year, current) = w[1];
                (previous != 0.0).then(|| (year, (current - previous) / previous * 100.0))
            }));
            (herd, rates)
        })
        .collect())
}

/// Share of each herd type in one year, largest first.
pub fn herd_composition(live: &DataFrame, year: &str) -> PolarsResult<Vec<(String, f64)>> {
    if !has_herd_columns(live) {
        return Ok(Vec::new());
    }
    let composition = herds_in_year(live, year)
        .group_by([col(HERD_TYPE_COLUMN)])
        .agg([col(HERD_QUANTITY_COLUMN).fill_null(lit(0.0)).sum()])
        .sort(
            [HERD_QUANTITY_COLUMN, HERD_TYPE_COLUMN],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    Ok(text_values(&composition, HERD_TYPE_COLUMN)?
        .into_iter()
        .zip(number_values(&composition, HERD_QUANTITY_COLUMN)?)
        .map(|(herd, total)| (herd.unwrap_or_default(), total.unwrap_or(0.0)))
        .collect())
}

/// Per-municipality statistics of each herd type in one year.
pub fn herd_statistics(live: &DataFrame, year: &str) -> PolarsResult<Vec<(String, Summary)>> {
    if !has_herd_columns(live) {
        return Ok(Vec::new());
    }
    let quantity = || col(HERD_QUANTITY_COLUMN);
    let stats = herds_in_year(live, year)
        .filter(quantity().is_not_null())
        .group_by([col(HERD_TYPE_COLUMN)])
        .agg([
            quantity().count().alias("count"),
            quantity().sum().alias("sum"),
            quantity().mean().alias("mean"),
            quantity().std(1).alias("std"),
            quantity().min().alias("min"),
            quantity().max().alias("max"),
        ])
        .sort([HERD_TYPE_COLUMN], SortMultipleOptions::default())
        .collect()?;

    let herds = text_values(&stats, HERD_TYPE_COLUMN)?;
    let [count, sum, mean, std, min, max] =
        ["count", "sum", "mean", "std", "min", "max"].map(|c| number_values(&stats, c));
    let (count, sum, mean, std, min, max) = (count?, sum?, mean?, std?, min?, max?);

    Ok((0..stats.height())
        .map(|i| {
            let summary = Summary {
                count: count[i].unwrap_or(0.0) as usize,
                sum: sum[i].unwrap_or(0.0),
                mean: mean[i].unwrap_or(0.0),
                std: std[i],
                min: min[i].unwrap_or(0.0),
                max: max[i].unwrap_or(0.0),
            };
            (herds[i].clone().unwrap_or_default(), summary)
        })
        .collect())
}

/// Most recent year present in the livestock table.
pub fn latest_year(live: &DataFrame) -> Option<String> {
    text_values(live, LIVESTOCK_KEY)
        .ok()?
        .into_iter()
        .flatten()
        .filter_map(|v| normalize_year_key(&v))
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn livestock() -> DataFrame {
        df![
            "ano" => ["2020", "2020", "2020", "2021", "2021", "2022"],
            "tipo_rebanho" => ["Bovino", "Bovino", "Suíno", "Bovino", "Suíno", "Suíno"],
            "quantidade" => [100.0, 50.0, 30.0, 180.0, 0.0, 10.0],
        ]
        .unwrap()
    }

    #[test]
    fn describes_values() {
        let s = describe(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.count, 8);
        assert_relative_eq!(s.mean, 5.0);
        assert_relative_eq!(s.std.unwrap(), (32.0f64 / 7.0).sqrt());
        assert_eq!((s.min, s.max), (2.0, 9.0));
        assert_eq!(describe(&[1.0]).unwrap().std, None);
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn correlation_on_shared_years() {
        let a = TimeSeries::from_years([(2019, 1.0), (2020, 2.0), (2021, 3.0), (2022, 99.0)]);
        let b = TimeSeries::from_years([(2020, 10.0), (2021, 20.0), (2022, 30.0), (2023, 0.0)]);
        let (n, r) = correlate(&a, &b).unwrap();
        assert_eq!(n, 3);
        assert!(r > 0.8);
        assert_relative_eq!(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap(), -1.0);
        assert!(pearson(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn growth_and_composition() {
        let live = livestock();
        let growth = herd_growth_rates(&live).unwrap();
        assert_relative_eq!(growth["Bovino"].get("2021").unwrap(), 20.0);
        assert_relative_eq!(growth["Suíno"].get("2021").unwrap(), -100.0);
        // previous year total was zero
        assert_eq!(growth["Suíno"].get("2022"), None);

        assert_eq!(
            herd_composition(&live, "2020").unwrap(),
            vec![("Bovino".to_string(), 150.0), ("Suíno".to_string(), 30.0)]
        );
        assert_eq!(latest_year(&live).as_deref(), Some("2022"));
    }

    #[test]
    fn per_municipality_stats() {
        let stats = herd_statistics(&livestock(), "2020").unwrap();
        assert_eq!(stats[0].0, "Bovino");
        assert_eq!(stats[0].1.count, 2);
        assert_relative_eq!(stats[0].1.sum, 150.0);
        assert_relative_eq!(stats[0].1.mean, 75.0);
        assert_relative_eq!(stats[0].1.std.unwrap(), 1250.0f64.sqrt());
        assert_eq!((stats[0].1.min, stats[0].1.max), (50.0, 100.0));
        // a single municipality has no sample deviation
        assert_eq!(stats[1].0, "Suíno");
        assert_eq!(stats[1].1.std, None);
    }

    #[test]
    fn frames_without_herd_columns_are_empty() {
        let df = df!["ano" => ["2020"], "Soja" => [1.0]].unwrap();
        assert!(herd_totals(&df).unwrap().is_empty());
        assert!(herd_composition(&df, "2020").unwrap().is_empty());
        assert!(herd_statistics(&df, "2020").unwrap().is_empty());
    }
}

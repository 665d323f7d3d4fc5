//! Cell access and yearly aggregation over polars frames.

use polars::prelude::*;

use crate::config::constants::UNIFIED_KEY;
use crate::models::time_series::TimeSeries;
use crate::utils::normalize::{normalize_column_name, normalize_year_key};

/// Column rendered as text; non-text columns are cast first.
pub fn text_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Column as numbers; cells that do not cast are `None`.
pub fn number_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Distinct non-empty values of a column in first-seen order.
pub fn distinct_text(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    let unique = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?
        .unique_stable()?;
    Ok(unique
        .str()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect())
}

/// Sums `value` per `key`, treating missing values as zero.
///
/// Keys that do not coerce to a year are dropped.
pub fn year_sums(frame: LazyFrame, key: &str, value: &str) -> PolarsResult<TimeSeries> {
    let sums = frame
        .select([
            col(key).cast(DataType::String),
            col(value).cast(DataType::Float64).fill_null(lit(0.0)),
        ])
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg([col(value).sum()])
        .collect()?;

    let mut series = TimeSeries::new();
    for (period, total) in text_values(&sums, key)?.into_iter().zip(number_values(&sums, value)?) {
        if let Some(year) = period.as_deref().and_then(normalize_year_key) {
            series.add(year, total.unwrap_or(0.0));
        }
    }
    Ok(series)
}

/// Year column of a frame: the first whose normalized name is `ano`.
pub fn year_column(df: &DataFrame) -> Option<String> {
    df.get_column_names()
        .into_iter()
        .map(|c| c.to_string())
        .find(|c| normalize_column_name(c) == UNIFIED_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_per_year_and_skips_non_years() {
        let df = df![
            "ano" => ["2020", "2020", "n/a", "2021"],
            "quantidade" => [Some(3.0), Some(4.0), Some(100.0), None],
        ]
        .unwrap();
        let series = year_sums(df.lazy(), "ano", "quantidade").unwrap();
        assert_eq!(series.get("2020"), Some(7.0));
        assert_eq!(series.get("2021"), Some(0.0));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn distinct_values_keep_first_seen_order() {
        let df = df!["tipo_rebanho" => ["Suíno", "Bovino", "Suíno", ""]].unwrap();
        assert_eq!(distinct_text(&df, "tipo_rebanho").unwrap(), vec!["Suíno", "Bovino"]);
    }

    #[test]
    fn numeric_keys_render_as_text() {
        let df = df!["Ano" => [2020i32, 2021], "Soja" => [1.0, 2.0]].unwrap();
        assert_eq!(year_column(&df).as_deref(), Some("Ano"));
        assert_eq!(text_values(&df, "Ano").unwrap(), vec![Some("2020".to_string()), Some("2021".to_string())]);
        assert_eq!(number_values(&df, "Soja").unwrap(), vec![Some(1.0), Some(2.0)]);
    }
}

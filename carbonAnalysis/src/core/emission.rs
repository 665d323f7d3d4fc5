use polars::prelude::*;
use tracing::{debug, info};

use crate::config::constants::*;
use crate::models::time_series::TimeSeries;
use crate::utils::frame::{year_column, year_sums};
use crate::utils::logging::{self, OperationCategory};
use crate::utils::normalize::normalize_column_name;

#[derive(Debug)]
pub enum EmissionError {
    UnknownSelection { kind: &'static str, name: String },
    NegativeQuantity { kind: &'static str, value: f64 },
    Frame(PolarsError),
}

impl std::fmt::Display for EmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmissionError::UnknownSelection { kind, name } => {
                write!(f, "Unknown {} '{}' in the loaded data", kind, name)
            }
            EmissionError::NegativeQuantity { kind, value } => {
                write!(f, "The {} quantity must be non-negative, got {}", kind, value)
            }
            EmissionError::Frame(e) => write!(f, "Aggregation failed: {}", e),
        }
    }
}

impl std::error::Error for EmissionError {}

impl From<PolarsError> for EmissionError {
    fn from(e: PolarsError) -> Self {
        EmissionError::Frame(e)
    }
}

/// Yearly emission estimate: each source rescaled to the chosen quantity and
/// their sum. All three series share the same periods.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionScenario {
    pub agricultural: TimeSeries,
    pub herd: TimeSeries,
    pub total: TimeSeries,
}

impl EmissionScenario {
    /// Columns `ano`, `emissao_agricola`, `emissao_rebanho`, `emissao_total`.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let periods = self.total.periods();
        let share = |series: &TimeSeries| -> Vec<f64> {
            periods.iter().map(|p| series.get(p).unwrap_or(0.0)).collect()
        };
        DataFrame::new(vec![
            Column::new(UNIFIED_KEY.into(), periods.clone()),
            Column::new(AGRICULTURAL_EMISSION_COLUMN.into(), share(&self.agricultural)),
            Column::new(HERD_EMISSION_COLUMN.into(), share(&self.herd)),
            Column::new(TOTAL_EMISSION_COLUMN.into(), self.total.values()),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }
}

/// `value / max(series) * qty` for every point.
///
/// A series whose maximum is zero (or that is empty) rescales to zeros.
pub fn rescale(series: &TimeSeries, qty: f64) -> TimeSeries {
    match series.max_value() {
        Some(max) if max != 0.0 => series.map_values(|v| v / max * qty),
        _ => series.map_values(|_| 0.0),
    }
}

pub fn compute_emission(
    agro_series: &TimeSeries,
    live_series: &TimeSeries,
    qty_crop: f64,
    qty_herd: f64,
) -> Result<EmissionScenario, EmissionError> {
    let _timing = logging::start_timing("compute_emission", OperationCategory::Emission);

    check_quantity("crop", qty_crop)?;
    check_quantity("herd", qty_herd)?;

    let agricultural = rescale(agro_series, qty_crop);
    let herd = rescale(live_series, qty_herd);

    // Align both sides on the union of years, 0.0 where a source has no value
    let total = agricultural.outer_combine(&herd, |a, h| a + h);
    let agricultural = agricultural.outer_combine(&total, |a, _| a);
    let herd = herd.outer_combine(&total, |h, _| h);

    debug!("Emission scenario spans {} years", total.len());
    Ok(EmissionScenario { agricultural, herd, total })
}

fn check_quantity(kind: &'static str, value: f64) -> Result<(), EmissionError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(EmissionError::NegativeQuantity { kind, value })
    }
}

/// Yearly values of one crop column of the agricultural table.
pub fn crop_series(agro: &DataFrame, crop: &str) -> Result<TimeSeries, EmissionError> {
    let unknown = || EmissionError::UnknownSelection { kind: "crop", name: crop.to_string() };
    if agro.column(crop).is_err() {
        return Err(unknown());
    }
    let key = year_column(agro).ok_or_else(unknown)?;

    let series = year_sums(agro.clone().lazy(), &key, crop)?;
    info!("Crop '{}': {} years", crop, series.len());
    Ok(series)
}

/// Yearly headcount of one herd type, summed across municipalities.
pub fn herd_series(live: &DataFrame, herd_type: &str) -> Result<TimeSeries, EmissionError> {
    let unknown = || EmissionError::UnknownSelection { kind: "herd type", name: herd_type.to_string() };
    if live.column(HERD_TYPE_COLUMN).is_err() {
        return Err(unknown());
    }
    let key = year_column(live).ok_or_else(unknown)?;

    let selected = live
        .clone()
        .lazy()
        .filter(col(HERD_TYPE_COLUMN).cast(DataType::String).eq(lit(herd_type)))
        .collect()?;
    if selected.height() == 0 {
        return Err(unknown());
    }

    let series = year_sums(selected.lazy(), &key, HERD_QUANTITY_COLUMN)?;
    info!("Herd '{}': {} years", herd_type, series.len());
    Ok(series)
}

/// Crop columns of an agricultural table (every column but the year key).
pub fn crop_names(agro: &DataFrame) -> Vec<String> {
    agro.get_column_names()
        .into_iter()
        .filter(|c| normalize_column_name(c) != UNIFIED_KEY)
        .map(|c| c.to_string())
        .collect()
}

use std::fmt;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

use crate::config::constants::*;
use crate::data::agriculture_loader::match_crop;
use crate::data::meteorology_loader::DATE_FORMATS;
use crate::utils::frame::{number_values, text_values};
use crate::utils::logging::{self, OperationCategory};

#[derive(Debug, Clone, PartialEq)]
pub struct ProductivityInputs {
    pub crop: String,
    pub area_ha: f64,
    pub irrigation_pct: f64,
    pub technology_pct: f64,
    /// Mean monthly precipitation in mm.
    pub mean_precipitation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivityEstimate {
    pub crop: String,
    pub base_productivity: f64,
    pub irrigation_factor: f64,
    pub technology_factor: f64,
    pub precipitation_factor: f64,
    /// Tonnes over the whole planted area.
    pub production: f64,
}

impl ProductivityEstimate {
    /// t/ha attributable to the base yield and to each adjustment factor.
    pub fn contributions(&self) -> [(&'static str, f64); 4] {
        let base = self.base_productivity;
        [
            ("base", base),
            ("irrigation", base * (self.irrigation_factor - 1.0)),
            ("technology", base * (self.technology_factor - 1.0)),
            ("precipitation", base * (self.precipitation_factor - 1.0)),
        ]
    }
}

#[derive(Debug, PartialEq)]
pub enum ProductivityError {
    UnknownCrop(String),
    OutOfRange { field: &'static str, value: f64 },
}

impl fmt::Display for ProductivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductivityError::UnknownCrop(crop) => {
                let known: Vec<&str> = TARGET_CROPS
                    .iter()
                    .filter(|c| c.base_productivity.is_some())
                    .map(|c| c.label)
                    .collect();
                write!(f, "No base productivity for '{}' (known: {})", crop, known.join(", "))
            }
            ProductivityError::OutOfRange { field, value } => {
                write!(f, "{} out of range: {}", field, value)
            }
        }
    }
}

impl std::error::Error for ProductivityError {}

/// area × base yield × irrigation × technology × precipitation factors.
pub fn simulate_productivity(inputs: &ProductivityInputs) -> Result<ProductivityEstimate, ProductivityError> {
    let _timing = logging::start_timing("simulate_productivity", OperationCategory::Analysis);

    check_range("area", inputs.area_ha, 0.0, f64::INFINITY)?;
    check_range("irrigation", inputs.irrigation_pct, 0.0, 100.0)?;
    check_range("technology", inputs.technology_pct, 0.0, 100.0)?;
    if !inputs.mean_precipitation.is_finite() {
        return Err(ProductivityError::OutOfRange {
            field: "precipitation",
            value: inputs.mean_precipitation,
        });
    }

    let (label, base) = match_crop(&inputs.crop)
        .and_then(|i| TARGET_CROPS[i].base_productivity.map(|b| (TARGET_CROPS[i].label, b)))
        .ok_or_else(|| ProductivityError::UnknownCrop(inputs.crop.clone()))?;

    let irrigation_factor = 1.0 + inputs.irrigation_pct / 100.0 * IRRIGATION_MAX_GAIN;
    let technology_factor = 1.0 + inputs.technology_pct / 100.0 * TECHNOLOGY_MAX_GAIN;
    let precipitation_factor = 1.0 + inputs.mean_precipitation / 100.0 * PRECIPITATION_GAIN_PER_100MM;

    Ok(ProductivityEstimate {
        crop: label.to_string(),
        base_productivity: base,
        irrigation_factor,
        technology_factor,
        precipitation_factor,
        production: inputs.area_ha * base * irrigation_factor * technology_factor * precipitation_factor,
    })
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ProductivityError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ProductivityError::OutOfRange { field, value })
    }
}

/// Mean over calendar months of each month's mean precipitation, from the
/// station readings frame.
pub fn mean_monthly_precipitation(readings: &DataFrame) -> PolarsResult<Option<f64>> {
    if readings.column(METEOROLOGY_DATE_COLUMN).is_err() || readings.column(PRECIPITATION_COLUMN).is_err() {
        return Ok(None);
    }
    let months: Vec<Option<u32>> = text_values(readings, METEOROLOGY_DATE_COLUMN)?
        .iter()
        .map(|date| date.as_deref().and_then(month_of))
        .collect();

    let mut frame = readings.select([PRECIPITATION_COLUMN])?;
    frame.with_column(Column::new("mes".into(), months))?;

    let means = frame
        .lazy()
        .select([col("mes"), col(PRECIPITATION_COLUMN).cast(DataType::Float64)])
        .filter(col("mes").is_not_null().and(col(PRECIPITATION_COLUMN).is_not_null()))
        .group_by([col("mes")])
        .agg([col(PRECIPITATION_COLUMN).mean()])
        .select([col(PRECIPITATION_COLUMN).mean()])
        .collect()?;

    Ok(number_values(&means, PRECIPITATION_COLUMN)?.into_iter().next().flatten())
}

fn month_of(date: &str) -> Option<u32> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date.trim(), fmt).ok())
        .map(|d| d.month())
}

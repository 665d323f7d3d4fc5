use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::arima::Arima;
use super::linear::LinearTrend;
use super::lstm::Lstm;
use super::random_forest::RandomForest;
use super::smoothing::AdditiveTrend;
use crate::config::constants::{FORECAST_HORIZON, MIN_HISTORY_POINTS};
use crate::models::time_series::TimeSeries;
use crate::utils::logging::{self, OperationCategory};

/// Forecasting strategies selectable for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    Linear,
    Arima,
    Prophet,
    RandomForest,
    Lstm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Linear,
        ModelKind::Arima,
        ModelKind::Prophet,
        ModelKind::RandomForest,
        ModelKind::Lstm,
    ];

    /// Human readable name used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear regression",
            ModelKind::Arima => "ARIMA(1,1,1)",
            ModelKind::Prophet => "Additive trend (Prophet-style)",
            ModelKind::RandomForest => "Random forest",
            ModelKind::Lstm => "LSTM",
        }
    }
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::Linear
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "linear" | "linearregression" | "ols" | "regressaolinear" => Ok(ModelKind::Linear),
            "arima" | "sarima" | "arimasarima" | "arima111" => Ok(ModelKind::Arima),
            "prophet" | "holt" | "smoothing" | "additivetrend" => Ok(ModelKind::Prophet),
            "randomforest" | "rf" | "forest" => Ok(ModelKind::RandomForest),
            "lstm" | "lstmdeeplearning" | "deeplearning" => Ok(ModelKind::Lstm),
            _ => Err(format!(
                "Unknown model '{}' (expected linear, arima, prophet, random-forest or lstm)",
                s
            )),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelKind::Linear => write!(f, "linear"),
            ModelKind::Arima => write!(f, "arima"),
            ModelKind::Prophet => write!(f, "prophet"),
            ModelKind::RandomForest => write!(f, "random-forest"),
            ModelKind::Lstm => write!(f, "lstm"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    InsufficientData { required: usize, found: usize },
    Unavailable { model: ModelKind, reason: String },
    FitFailed { model: ModelKind, reason: String },
    InvalidPeriod(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InsufficientData { required, found } => write!(
                f,
                "At least {} historical points are needed, found {}",
                required, found
            ),
            ModelError::Unavailable { model, reason } => {
                write!(f, "{} is unavailable: {}", model.label(), reason)
            }
            ModelError::FitFailed { model, reason } => {
                write!(f, "{} failed to fit: {}", model.label(), reason)
            }
            ModelError::InvalidPeriod(period) => write!(f, "Period '{}' is not a year", period),
        }
    }
}

impl std::error::Error for ModelError {}

/// A strategy that extrapolates a yearly history `horizon` steps past its
/// last year. `years` is strictly ascending and as long as `values`.
pub trait Forecaster {
    fn fit_predict(&self, years: &[i32], values: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError>;
}

/// Builds the strategy for `model`. `seed` only affects stochastic strategies.
pub fn forecaster(model: ModelKind, seed: Option<u64>) -> Box<dyn Forecaster + Send + Sync> {
    match model {
        ModelKind::Linear => Box::new(LinearTrend),
        ModelKind::Arima => Box::new(Arima),
        ModelKind::Prophet => Box::new(AdditiveTrend),
        ModelKind::RandomForest => Box::new(RandomForest::new(seed)),
        ModelKind::Lstm => Box::new(Lstm),
    }
}

/// Forecasts the five years following the last year of `history`.
pub fn forecast(history: &TimeSeries, model: ModelKind) -> Result<TimeSeries, ModelError> {
    forecast_with_seed(history, model, None)
}

pub fn forecast_with_seed(
    history: &TimeSeries,
    model: ModelKind,
    seed: Option<u64>,
) -> Result<TimeSeries, ModelError> {
    let _timing = logging::start_timing("forecast", OperationCategory::Forecast);

    let years = history.years().map_err(ModelError::InvalidPeriod)?;
    if years.len() < MIN_HISTORY_POINTS {
        return Err(ModelError::InsufficientData {
            required: MIN_HISTORY_POINTS,
            found: years.len(),
        });
    }
    let values = history.values();

    let predictions = forecaster(model, seed).fit_predict(&years, &values, FORECAST_HORIZON)?;
    if predictions.len() != FORECAST_HORIZON || predictions.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::FitFailed {
            model,
            reason: "produced non-finite or incomplete predictions".to_string(),
        });
    }

    debug!("{} forecast from {} points ending {:?}", model, years.len(), years.last());
    Ok(TimeSeries::from_years(
        future_years(&years, FORECAST_HORIZON).into_iter().zip(predictions),
    ))
}

/// Years `last + 1 ..= last + horizon`.
pub fn future_years(years: &[i32], horizon: usize) -> Vec<i32> {
    let last = years.last().copied().unwrap_or_default();
    (1..=horizon as i32).map(|h| last + h).collect()
}

use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};

use super::model::{future_years, Forecaster, ModelError, ModelKind};

pub type YearRegression = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Ordinary least squares line of value on year.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrend;

/// One-column design matrix of `year - origin`.
pub fn year_features(years: &[i32], origin: i32) -> Result<DenseMatrix<f64>, smartcore::error::Failed> {
    let rows: Vec<Vec<f64>> = years.iter().map(|&y| vec![(y - origin) as f64]).collect();
    DenseMatrix::from_2d_vec(&rows)
}

impl LinearTrend {
    /// Fits on years measured from the last observed year.
    pub fn fit(years: &[i32], values: &[f64]) -> Result<YearRegression, ModelError> {
        let fit_failed = |reason: String| ModelError::FitFailed { model: ModelKind::Linear, reason };

        let first = years.first().copied();
        if years.len() != values.len() || years.iter().all(|&y| Some(y) == first) {
            return Err(fit_failed("need at least two distinct years".to_string()));
        }
        let origin = years[years.len() - 1];

        let x = year_features(years, origin).map_err(|e| fit_failed(e.to_string()))?;
        let y = values.to_vec();
        YearRegression::fit(&x, &y, LinearRegressionParameters::default()).map_err(|e| fit_failed(e.to_string()))
    }
}

impl Forecaster for LinearTrend {
    fn fit_predict(&self, years: &[i32], values: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        let model = Self::fit(years, values)?;
        let origin = years[years.len() - 1];

        let x = year_features(&future_years(years, horizon), origin).map_err(|e| ModelError::FitFailed {
            model: ModelKind::Linear,
            reason: e.to_string(),
        })?;
        model.predict(&x).map_err(|e| ModelError::FitFailed {
            model: ModelKind::Linear,
            reason: e.to_string(),
        })
    }
}

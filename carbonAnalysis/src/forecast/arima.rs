use argmin::core::CostFunction;

use super::model::{Forecaster, ModelError, ModelKind};
use super::optimize::minimize;
use crate::config::constants::*;

/// ARIMA(1,1,1) without drift, fitted by conditional sum of squares.
///
/// On the differenced series `w`:
/// `w[t] = phi * w[t-1] + e[t] + theta * e[t-1]`, with `e[0] = 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Arima;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArimaFit {
    pub phi: f64,
    pub theta: f64,
    pub sse: f64,
}

/// CSS objective over an unbounded plane, squashed into `(-bound, bound)`.
struct ConditionalSumOfSquares {
    diffs: Vec<f64>,
}

impl CostFunction for ConditionalSumOfSquares {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Vec<f64>) -> Result<f64, argmin::core::Error> {
        Ok(sum_of_squares(&self.diffs, bounded(p[0]), bounded(p[1])))
    }
}

impl Arima {
    pub fn fit(&self, values: &[f64]) -> Result<ArimaFit, ModelError> {
        if values.len() < ARIMA_MIN_HISTORY_POINTS {
            return Err(ModelError::InsufficientData {
                required: ARIMA_MIN_HISTORY_POINTS,
                found: values.len(),
            });
        }
        let diffs = difference(values);

        let best = minimize(
            ModelKind::Arima,
            ConditionalSumOfSquares { diffs: diffs.clone() },
            vec![0.0, 0.0],
            0.5,
        )?;
        let (phi, theta) = (bounded(best[0]), bounded(best[1]));
        let fit = ArimaFit { phi, theta, sse: sum_of_squares(&diffs, phi, theta) };

        if !(fit.phi.is_finite() && fit.theta.is_finite() && fit.sse.is_finite()) {
            return Err(ModelError::FitFailed {
                model: ModelKind::Arima,
                reason: "conditional sum of squares did not converge".to_string(),
            });
        }
        Ok(fit)
    }
}

impl Forecaster for Arima {
    fn fit_predict(&self, _years: &[i32], values: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        let fit = self.fit(values)?;
        let diffs = difference(values);
        let errors = residuals(&diffs, fit.phi, fit.theta);

        let mut last_diff = diffs.last().copied().unwrap_or(0.0);
        let mut last_error = errors.last().copied().unwrap_or(0.0);
        let mut level = values.last().copied().unwrap_or(0.0);

        let mut predictions = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next_diff = fit.phi * last_diff + fit.theta * last_error;
            level += next_diff;
            predictions.push(level);
            last_diff = next_diff;
            last_error = 0.0;
        }

        if predictions.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::FitFailed {
                model: ModelKind::Arima,
                reason: "forecast diverged".to_string(),
            });
        }
        Ok(predictions)
    }
}

fn bounded(raw: f64) -> f64 {
    ARIMA_COEFFICIENT_BOUND * raw.tanh()
}

fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// One-step residuals; the first is zero by conditioning.
fn residuals(diffs: &[f64], phi: f64, theta: f64) -> Vec<f64> {
    let mut errors = vec![0.0; diffs.len()];
    for t in 1..diffs.len() {
        errors[t] = diffs[t] - phi * diffs[t - 1] - theta * errors[t - 1];
    }
    errors
}

fn sum_of_squares(diffs: &[f64], phi: f64, theta: f64) -> f64 {
    residuals(diffs, phi, theta).iter().map(|e| e * e).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_stay_inside_bounds() {
        let values = [1.0, 3.0, 2.0, 5.0, 4.0, 8.0, 7.0, 11.0];
        let fit = Arima.fit(&values).unwrap();
        assert!(fit.phi.abs() < 1.0);
        assert!(fit.theta.abs() < 1.0);
    }

    #[test]
    fn optimum_beats_white_noise() {
        let values = [1.0, 3.0, 2.0, 5.0, 4.0, 8.0, 7.0, 11.0];
        let fit = Arima.fit(&values).unwrap();
        assert!(fit.sse <= sum_of_squares(&difference(&values), 0.0, 0.0) + 1e-9);
    }

    #[test]
    fn constant_growth_continues() {
        // Constant differences: the forecast keeps adding the same step
        // whenever phi is close to one; at minimum it never goes backwards.
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let predictions = Arima.fit_predict(&[], &values, 5).unwrap();
        assert_eq!(predictions.len(), 5);
        assert!(predictions.windows(2).all(|w| w[1] >= w[0] - 1e-9));
        assert!(predictions[0] >= 50.0);
    }

    #[test]
    fn needs_three_points() {
        assert_eq!(
            Arima.fit_predict(&[2020, 2021], &[1.0, 2.0], 5),
            Err(ModelError::InsufficientData { required: 3, found: 2 })
        );
    }
}

use argmin::core::CostFunction;

use super::model::{Forecaster, ModelError, ModelKind};
use super::optimize::minimize;
use crate::config::constants::SMOOTHING_INITIAL_WEIGHT;

/// Additive level + trend model (Holt's linear exponential smoothing) with
/// one step per year and no seasonal component.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveTrend;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoltFit {
    pub alpha: f64,
    pub beta: f64,
    pub level: f64,
    pub trend: f64,
    pub sse: f64,
}

impl HoltFit {
    pub fn predict(&self, steps_ahead: usize) -> f64 {
        self.level + self.trend * steps_ahead as f64
    }
}

/// One-step SSE with both weights mapped into `(0, 1)` by the logistic function.
struct OneStepError<'a> {
    values: &'a [f64],
}

impl CostFunction for OneStepError<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Vec<f64>) -> Result<f64, argmin::core::Error> {
        Ok(holt(self.values, logistic(p[0]), logistic(p[1])).sse)
    }
}

impl AdditiveTrend {
    pub fn fit(&self, values: &[f64]) -> Result<HoltFit, ModelError> {
        if values.len() < 2 {
            return Err(ModelError::FitFailed {
                model: ModelKind::Prophet,
                reason: "need at least two observations".to_string(),
            });
        }
        let start = logit(SMOOTHING_INITIAL_WEIGHT);
        let best = minimize(ModelKind::Prophet, OneStepError { values }, vec![start, start], 1.0)?;
        Ok(holt(values, logistic(best[0]), logistic(best[1])))
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

fn holt(values: &[f64], alpha: f64, beta: f64) -> HoltFit {
    let mut level = values[0];
    let mut trend = values[1] - values[0];
    let mut sse = 0.0;

    for &y in &values[1..] {
        let predicted = level + trend;
        sse += (y - predicted).powi(2);
        let new_level = alpha * y + (1.0 - alpha) * predicted;
        trend = beta * (new_level - level) + (1.0 - beta) * trend;
        level = new_level;
    }

    HoltFit { alpha, beta, level, trend, sse }
}

impl Forecaster for AdditiveTrend {
    fn fit_predict(&self, _years: &[i32], values: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        let fit = self.fit(values)?;
        Ok((1..=horizon).map(|h| fit.predict(h)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_history_is_extended_exactly() {
        let predictions = AdditiveTrend
            .fit_predict(&[2019, 2020, 2021, 2022], &[5.0, 7.0, 9.0, 11.0], 5)
            .unwrap();
        for (got, want) in predictions.iter().zip([13.0, 15.0, 17.0, 19.0, 21.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn optimizer_improves_on_the_starting_weights() {
        let values = [10.0, 12.0, 11.0, 15.0, 14.0, 18.0];
        let fit = AdditiveTrend.fit(&values).unwrap();
        let initial = holt(&values, SMOOTHING_INITIAL_WEIGHT, SMOOTHING_INITIAL_WEIGHT);
        assert!(fit.sse <= initial.sse);
        assert!(fit.alpha > 0.0 && fit.alpha <= 1.0);
        assert!(fit.beta > 0.0 && fit.beta <= 1.0);
    }

    #[test]
    fn two_points_extrapolate_their_slope() {
        let predictions = AdditiveTrend.fit_predict(&[2020, 2021], &[1.0, 3.0], 2).unwrap();
        assert_relative_eq!(predictions[0], 5.0, epsilon = 1e-9);
        assert_relative_eq!(predictions[1], 7.0, epsilon = 1e-9);
    }

    #[test]
    fn one_step_per_year_regardless_of_calendar() {
        let predictions = AdditiveTrend.fit_predict(&[2000, 2001], &[0.0, 10.0], 3).unwrap();
        for (got, want) in predictions.iter().zip([20.0, 30.0, 40.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-9);
        }
    }
}

use smartcore::ensemble::random_forest_regressor::{RandomForestRegressor, RandomForestRegressorParameters};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::linear::year_features;
use super::model::{future_years, Forecaster, ModelError, ModelKind};
use crate::config::constants::{RANDOM_FOREST_MIN_SAMPLES_SPLIT, RANDOM_FOREST_TREES};

pub type YearForest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Bagged regression trees on the single feature "year".
///
/// Trees only split inside the training range, so the forecast plateaus past
/// the last observed year.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub trees: usize,
    pub min_samples_split: usize,
    pub seed: Option<u64>,
}

impl RandomForest {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            trees: RANDOM_FOREST_TREES,
            min_samples_split: RANDOM_FOREST_MIN_SAMPLES_SPLIT,
            seed,
        }
    }

    pub fn parameters(&self) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters::default()
            .with_n_trees(self.trees)
            .with_min_samples_split(self.min_samples_split)
            .with_seed(self.seed.unwrap_or_else(rand::random))
    }
}

impl Forecaster for RandomForest {
    fn fit_predict(&self, years: &[i32], values: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        let fit_failed = |reason: String| ModelError::FitFailed { model: ModelKind::RandomForest, reason };

        if years.is_empty() || years.len() != values.len() || self.trees == 0 {
            return Err(fit_failed("no training samples".to_string()));
        }
        let origin = years[years.len() - 1];

        let x = year_features(years, origin).map_err(|e| fit_failed(e.to_string()))?;
        let y = values.to_vec();
        let forest = YearForest::fit(&x, &y, self.parameters()).map_err(|e| fit_failed(e.to_string()))?;

        let future = year_features(&future_years(years, horizon), origin).map_err(|e| fit_failed(e.to_string()))?;
        forest.predict(&future).map_err(|e| fit_failed(e.to_string()))
    }
}

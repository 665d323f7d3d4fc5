use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;

use super::model::{ModelError, ModelKind};
use crate::config::constants::{NELDER_MEAD_MAX_ITERATIONS, NELDER_MEAD_TOLERANCE};

/// Runs argmin's Nelder-Mead from `start`, with an initial simplex offset by
/// `step` along each axis, and returns the best parameters found.
pub fn minimize<C>(model: ModelKind, problem: C, start: Vec<f64>, step: f64) -> Result<Vec<f64>, ModelError>
where
    C: CostFunction<Param = Vec<f64>, Output = f64>,
{
    let fit_failed = |reason: String| ModelError::FitFailed { model, reason };

    let mut simplex = vec![start.clone()];
    for axis in 0..start.len() {
        let mut vertex = start.clone();
        vertex[axis] += step;
        simplex.push(vertex);
    }

    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(NELDER_MEAD_TOLERANCE)
        .map_err(|e| fit_failed(e.to_string()))?;
    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(NELDER_MEAD_MAX_ITERATIONS))
        .run()
        .map_err(|e| fit_failed(e.to_string()))?;

    result
        .state()
        .get_best_param()
        .cloned()
        .ok_or_else(|| fit_failed("optimizer returned no parameters".to_string()))
}

use super::model::{Forecaster, ModelError, ModelKind};

/// Recurrent-network forecaster. No deep-learning runtime is linked into this
/// build, so every call reports the model as unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lstm;

impl Forecaster for Lstm {
    fn fit_predict(&self, _years: &[i32], _values: &[f64], _horizon: usize) -> Result<Vec<f64>, ModelError> {
        Err(ModelError::Unavailable {
            model: ModelKind::Lstm,
            reason: "no deep-learning runtime is available in this build; choose another model".to_string(),
        })
    }
}

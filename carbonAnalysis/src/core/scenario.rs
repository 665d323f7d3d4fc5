use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use tracing::{info, warn};

use super::emission::{compute_emission, crop_names, crop_series, herd_series, EmissionError, EmissionScenario};
use super::unify::{unify, UnifyError};
use crate::config::constants::HERD_TYPE_COLUMN;
use crate::config::source_config::SourceConfig;
use crate::data::agriculture_loader::load_agriculture;
use crate::data::error::DataLoadError;
use crate::data::livestock_loader::load_livestock;
use crate::data::meteorology_loader::load_meteorology;
use crate::forecast::{forecast_with_seed, ModelError, ModelKind};
use crate::models::time_series::TimeSeries;
use crate::utils::cache::{SourceKey, TableCache};
use crate::utils::frame::distinct_text;

/// User selections for one scenario pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParams {
    /// Crop column; the first loaded crop when unset.
    pub crop: Option<String>,
    /// Herd type; the first loaded herd type when unset.
    pub herd_type: Option<String>,
    pub crop_quantity: f64,
    pub herd_quantity: f64,
    pub model: ModelKind,
    pub seed: Option<u64>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            crop: None,
            herd_type: None,
            crop_quantity: 0.0,
            herd_quantity: 0.0,
            model: ModelKind::Linear,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    Loaded { rows: usize },
    Missing(PathBuf),
    /// The caller supplied no frame for this source.
    NotProvided,
    Failed(String),
}

impl SourceStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, SourceStatus::Loaded { .. })
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Loaded { rows } => write!(f, "loaded ({} rows)", rows),
            SourceStatus::Missing(path) => write!(f, "missing ({})", path.display()),
            SourceStatus::NotProvided => write!(f, "not provided"),
            SourceStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug)]
pub enum ScenarioError {
    Unify(UnifyError),
    Emission(EmissionError),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Unify(e) => write!(f, "Unify error: {}", e),
            ScenarioError::Emission(e) => write!(f, "Emission error: {}", e),
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<UnifyError> for ScenarioError {
    fn from(err: UnifyError) -> Self {
        ScenarioError::Unify(err)
    }
}

impl From<EmissionError> for ScenarioError {
    fn from(err: EmissionError) -> Self {
        ScenarioError::Emission(err)
    }
}

/// Forecast of every model, in [`ModelKind::ALL`] order.
pub type ModelResults = Vec<(ModelKind, Result<TimeSeries, ModelError>)>;

/// Everything one pass produces. A failed forecast leaves `forecast` empty
/// and records why in `forecast_error`.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub unified: DataFrame,
    pub emission: EmissionScenario,
    pub model: ModelKind,
    pub forecast: TimeSeries,
    pub forecast_error: Option<ModelError>,
}

/// The loaded sources of one pass. Absent or broken sources are `None` and
/// the rest of the pipeline runs without them.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    agriculture: Option<Arc<DataFrame>>,
    livestock: Option<Arc<DataFrame>>,
    meteorology: Option<Arc<DataFrame>>,
    statuses: Vec<(&'static str, SourceStatus)>,
}

impl Scenario {
    pub fn load(config: &SourceConfig, cache: Option<&TableCache>) -> Scenario {
        let agriculture_variant = format!("{}|{}", config.state_code, config.agriculture_sheet.as_deref().unwrap_or(""));
        let (agriculture, agriculture_status) = load_source(
            "agriculture",
            &config.agriculture_path,
            &agriculture_variant,
            cache,
            || load_agriculture(config),
        );
        let (livestock, livestock_status) = load_source(
            "livestock",
            &config.livestock_path,
            &config.state_code,
            cache,
            || load_livestock(config),
        );
        let (meteorology, meteorology_status) = load_source(
            "meteorology",
            &config.meteorology_dir,
            "",
            cache,
            || load_meteorology(config),
        );

        Scenario {
            agriculture,
            livestock,
            meteorology,
            statuses: vec![
                ("agriculture", agriculture_status),
                ("livestock", livestock_status),
                ("meteorology", meteorology_status),
            ],
        }
    }

    /// A scenario over frames that are already in memory.
    pub fn from_tables(
        agriculture: Option<DataFrame>,
        livestock: Option<DataFrame>,
        meteorology: Option<DataFrame>,
    ) -> Scenario {
        let status = |t: &Option<DataFrame>| match t {
            Some(t) => SourceStatus::Loaded { rows: t.height() },
            None => SourceStatus::NotProvided,
        };
        Scenario {
            statuses: vec![
                ("agriculture", status(&agriculture)),
                ("livestock", status(&livestock)),
                ("meteorology", status(&meteorology)),
            ],
            agriculture: agriculture.map(Arc::new),
            livestock: livestock.map(Arc::new),
            meteorology: meteorology.map(Arc::new),
        }
    }

    pub fn agriculture(&self) -> Option<&DataFrame> {
        self.agriculture.as_deref()
    }

    pub fn livestock(&self) -> Option<&DataFrame> {
        self.livestock.as_deref()
    }

    pub fn meteorology(&self) -> Option<&DataFrame> {
        self.meteorology.as_deref()
    }

    pub fn statuses(&self) -> &[(&'static str, SourceStatus)] {
        &self.statuses
    }

    pub fn crops(&self) -> Vec<String> {
        self.agriculture().map(crop_names).unwrap_or_default()
    }

    pub fn herd_types(&self) -> Vec<String> {
        self.livestock()
            .and_then(|t| distinct_text(t, HERD_TYPE_COLUMN).ok())
            .unwrap_or_default()
    }

    pub fn unified(&self) -> Result<DataFrame, UnifyError> {
        unify(self.agriculture(), self.livestock(), self.meteorology())
    }

    /// Rescaled crop and herd series for the selections in `params`.
    pub fn emission(&self, params: &ScenarioParams) -> Result<EmissionScenario, EmissionError> {
        let crop = match self.agriculture() {
            Some(agro) => match params.crop.clone().or_else(|| self.crops().into_iter().next()) {
                Some(crop) => crop_series(agro, &crop)?,
                None => TimeSeries::new(),
            },
            None => TimeSeries::new(),
        };
        let herd = match self.livestock() {
            Some(live) => match params.herd_type.clone().or_else(|| self.herd_types().into_iter().next()) {
                Some(herd) => herd_series(live, &herd)?,
                None => TimeSeries::new(),
            },
            None => TimeSeries::new(),
        };
        compute_emission(&crop, &herd, params.crop_quantity, params.herd_quantity)
    }

    /// Unify, scale and forecast. Forecast failures do not fail the pass.
    pub fn run(&self, params: &ScenarioParams) -> Result<ScenarioOutcome, ScenarioError> {
        let unified = self.unified()?;
        let emission = self.emission(params)?;

        let (forecast, forecast_error) = match forecast_with_seed(&emission.total, params.model, params.seed) {
            Ok(series) => (series, None),
            Err(e) => {
                warn!("{} forecast unavailable: {}", params.model, e);
                (TimeSeries::new(), Some(e))
            }
        };

        info!("Scenario pass complete: {} emission years, {} forecast years", emission.total.len(), forecast.len());
        Ok(ScenarioOutcome {
            unified,
            emission,
            model: params.model,
            forecast,
            forecast_error,
        })
    }

    /// Forecasts the same emission history with every model in parallel,
    /// each result independent of the others.
    pub fn compare_models(
        &self,
        params: &ScenarioParams,
        show_progress: bool,
    ) -> Result<ModelResults, ScenarioError> {
        let emission = self.emission(params)?;

        let progress = if show_progress {
            let bar = ProgressBar::new(ModelKind::ALL.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let results: ModelResults = ModelKind::ALL
            .par_iter()
            .map(|&model| {
                let result = forecast_with_seed(&emission.total, model, params.seed);
                if let Err(e) = &result {
                    warn!("{} forecast unavailable: {}", model, e);
                }
                progress.set_message(model.to_string());
                progress.inc(1);
                (model, result)
            })
            .collect();
        progress.finish_and_clear();

        Ok(results)
    }
}

fn load_source<F>(
    name: &'static str,
    path: &std::path::Path,
    variant: &str,
    cache: Option<&TableCache>,
    load: F,
) -> (Option<Arc<DataFrame>>, SourceStatus)
where
    F: FnOnce() -> Result<DataFrame, DataLoadError>,
{
    let result = match cache.and_then(|c| SourceKey::for_path(path, variant).ok().map(|k| (c, k))) {
        Some((cache, key)) => cache.get_or_load(key, load),
        None => load().map(Arc::new),
    };

    match result {
        Ok(frame) => {
            let status = SourceStatus::Loaded { rows: frame.height() };
            (Some(frame), status)
        }
        Err(DataLoadError::SourceMissing(missing)) => {
            warn!("{} source not found at {}; continuing without it", name, missing.display());
            (None, SourceStatus::Missing(missing))
        }
        Err(e) => {
            warn!("{} source could not be loaded: {}; continuing without it", name, e);
            (None, SourceStatus::Failed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn agro() -> DataFrame {
        df!["Ano" => ["2020", "2021"], "Soja" => [100.0, 200.0]].unwrap()
    }

    #[test]
    fn default_crop_and_forecast() {
        let scenario = Scenario::from_tables(Some(agro()), None, None);
        let params = ScenarioParams { crop_quantity: 50.0, ..Default::default() };
        let outcome = scenario.run(&params).unwrap();

        assert_eq!(outcome.emission.total, TimeSeries::from_years([(2020, 25.0), (2021, 50.0)]));
        assert_eq!(outcome.forecast.periods(), vec!["2022", "2023", "2024", "2025", "2026"]);
        assert!(outcome.forecast_error.is_none());
    }

    #[test]
    fn forecast_failure_keeps_emission() {
        let scenario = Scenario::from_tables(Some(agro()), None, None);
        let params = ScenarioParams { crop_quantity: 1.0, model: ModelKind::Lstm, ..Default::default() };
        let outcome = scenario.run(&params).unwrap();
        assert_eq!(outcome.emission.total.len(), 2);
        assert!(outcome.forecast.is_empty());
        assert!(matches!(outcome.forecast_error, Some(ModelError::Unavailable { .. })));
    }

    #[test]
    fn compare_reports_every_model() {
        let scenario = Scenario::from_tables(Some(agro()), None, None);
        let params = ScenarioParams { crop_quantity: 10.0, seed: Some(1), ..Default::default() };
        let results = scenario.compare_models(&params, false).unwrap();
        assert_eq!(results.len(), ModelKind::ALL.len());
        let failed: Vec<ModelKind> = results.iter().filter(|(_, r)| r.is_err()).map(|(m, _)| *m).collect();
        // two points are too few for ARIMA, and LSTM is never available
        assert_eq!(failed, vec![ModelKind::Arima, ModelKind::Lstm]);
    }

    #[test]
    fn unknown_crop_is_an_error() {
        let scenario = Scenario::from_tables(Some(agro()), None, None);
        let params = ScenarioParams { crop: Some("Arroz".into()), ..Default::default() };
        assert!(matches!(scenario.run(&params), Err(ScenarioError::Emission(_))));
    }

    #[test]
    fn absent_frames_are_not_provided() {
        let scenario = Scenario::from_tables(Some(agro()), None, None);
        let statuses = scenario.statuses();
        assert_eq!(statuses[0].1, SourceStatus::Loaded { rows: 2 });
        assert_eq!(statuses[1].1, SourceStatus::NotProvided);
        assert_eq!(statuses[2].1.to_string(), "not provided");
        assert!(!statuses[1].1.is_loaded());
    }

    #[test]
    fn missing_sources_degrade() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = Scenario::load(&SourceConfig::with_data_dir(dir.path()), None);
        assert!(scenario.statuses().iter().all(|(_, s)| matches!(s, SourceStatus::Missing(_))));
        assert!(matches!(scenario.unified(), Err(UnifyError::NoSources)));
    }
}

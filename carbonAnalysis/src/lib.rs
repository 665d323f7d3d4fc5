// Module declarations for the carbono emission pipeline

// Series and station metadata
pub mod models {
    pub mod time_series;
    pub mod station;
}

// Configuration modules
pub mod config {
    pub mod constants;
    pub mod source_config;
}

// Data loaders
pub mod data {
    pub mod error;
    pub mod sheet;
    pub mod livestock_loader;
    pub mod agriculture_loader;
    pub mod meteorology_loader;
    pub mod forest_carbon_loader;
}

// Unification and scenario pipeline
pub mod core {
    pub mod unify;
    pub mod emission;
    pub mod scenario;
}

// Forecasting models
pub mod forecast {
    pub mod model;
    pub mod linear;
    pub mod arima;
    pub mod smoothing;
    pub mod random_forest;
    pub mod lstm;
    pub mod optimize;

    pub use self::model::{forecast, forecast_with_seed, forecaster, future_years, Forecaster, ModelError, ModelKind};
}

// Statistics, simulation and reporting
pub mod analysis {
    pub mod statistics;
    pub mod productivity;
    pub mod reporting;
}

// Utility functions
pub mod utils {
    pub mod normalize;
    pub mod frame;
    pub mod logging;
    pub mod cache;
    pub mod csv_export;
}

// CLI interface
pub mod cli {
    pub mod cli;
}

// Re-export commonly used items
pub use crate::config::source_config::SourceConfig;
pub use crate::core::scenario::{Scenario, ScenarioOutcome, ScenarioParams};
pub use crate::models::time_series::TimeSeries;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::analysis::productivity::ProductivityInputs;
use crate::core::scenario::ScenarioParams;
use crate::forecast::ModelKind;

#[derive(Parser, Debug)]
#[command(author, version, about = "Agricultural and livestock emission scenarios with forecasting", long_about = None)]
pub struct Args {
    #[arg(short, long, global = true, help = "JSON file with dataset paths and state selection")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Root of the conventional data layout (ignored with --config)")]
    data_dir: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Two-letter state code, e.g. MS")]
    state: Option<String>,

    #[arg(long, global = true, default_value_t = false)]
    debug_logging: bool,

    #[arg(long, global = true, default_value_t = false)]
    enable_timing: bool,

    #[arg(long, global = true, default_value_t = false, help = "Load every source again instead of reusing cached tables")]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Merge the loaded sources into one table keyed by year.
    Unify {
        #[arg(short, long, help = "Write the unified table to this CSV file")]
        output: Option<PathBuf>,
    },
    /// Compute an emission scenario and forecast it with one model.
    Scenario(ScenarioArgs),
    /// Forecast the same scenario with every model.
    Compare(ScenarioArgs),
    /// Herd statistics, growth and correlation with the weather.
    Stats {
        #[arg(short, long, help = "Year for composition and per-municipality statistics (latest when unset)")]
        year: Option<String>,
    },
    /// List weather stations and yearly precipitation totals.
    Stations,
    /// Gross forest carbon emissions of the state.
    Carbon {
        #[arg(short, long, help = "Also forecast the series with this model")]
        model: Option<ModelKind>,
    },
    /// Simulate crop production under irrigation and technology levels.
    Productivity(ProductivityArgs),
    /// Run a scenario and write its tables to a timestamped directory.
    Export {
        #[command(flatten)]
        scenario: ScenarioArgs,

        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long, help = "Crop column (first available when unset)")]
    crop: Option<String>,

    #[arg(long, help = "Herd type (first available when unset)")]
    herd: Option<String>,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    crop_quantity: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    herd_quantity: f64,

    #[arg(short, long, default_value = "linear")]
    model: ModelKind,

    #[arg(long, help = "Random seed for reproducible forecasts")]
    seed: Option<u64>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ProductivityArgs {
    #[arg(long)]
    crop: String,

    #[arg(long, default_value_t = 100.0, help = "Planted area in hectares")]
    area: f64,

    #[arg(long, default_value_t = 50.0, help = "Irrigated share, 0-100")]
    irrigation: f64,

    #[arg(long, default_value_t = 50.0, help = "Technology level, 0-100")]
    technology: f64,

    #[arg(long, help = "Mean monthly precipitation in mm (from station data when unset)")]
    precipitation: Option<f64>,
}

impl Args {
    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

impl ScenarioArgs {
    pub fn params(&self) -> ScenarioParams {
        ScenarioParams {
            crop: self.crop.clone(),
            herd_type: self.herd.clone(),
            crop_quantity: self.crop_quantity,
            herd_quantity: self.herd_quantity,
            model: self.model,
            seed: self.seed,
        }
    }
}

impl ProductivityArgs {
    pub fn precipitation(&self) -> Option<f64> {
        self.precipitation
    }

    pub fn inputs(&self, mean_precipitation: f64) -> ProductivityInputs {
        ProductivityInputs {
            crop: self.crop.clone(),
            area_ha: self.area,
            irrigation_pct: self.irrigation,
            technology_pct: self.technology,
            mean_precipitation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_flags_become_params() {
        let args = Args::parse_from([
            "carbono", "--state", "mt", "scenario", "--crop", "Soja", "--crop-quantity", "50", "--model", "random_forest", "--seed", "7",
        ]);
        assert_eq!(args.state(), Some("mt"));
        let Command::Scenario(scenario) = args.command() else {
            panic!("expected scenario subcommand");
        };
        let params = scenario.params();
        assert_eq!(params.crop.as_deref(), Some("Soja"));
        assert_eq!(params.crop_quantity, 50.0);
        assert_eq!(params.herd_quantity, 0.0);
        assert_eq!(params.model, ModelKind::RandomForest);
        assert_eq!(params.seed, Some(7));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from(["carbono", "stations", "--data-dir", "/srv/dados", "--debug-logging"]);
        assert!(matches!(args.command(), Command::Stations));
        assert_eq!(args.data_dir(), Some(Path::new("/srv/dados")));
        assert!(args.debug_logging());
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(Args::try_parse_from(["carbono", "compare", "--model", "gpt"]).is_err());
    }
}

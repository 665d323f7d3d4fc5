use anyhow::{bail, Context};
use clap::Parser;
use polars::prelude::IntoLazy;
use tracing::{info, warn};

use carbono::analysis::productivity::{mean_monthly_precipitation, simulate_productivity};
use carbono::analysis::reporting;
use carbono::analysis::statistics::{correlate, herd_composition, herd_growth_rates, herd_statistics, herd_totals, latest_year};
use carbono::cli::cli::{Args, Command};
use carbono::config::constants::{METEOROLOGY_COLUMNS, METEOROLOGY_KEY, STATE_NAMES};
use carbono::config::source_config::SourceConfig;
use carbono::core::scenario::Scenario;
use carbono::data::forest_carbon_loader::load_forest_carbon;
use carbono::data::meteorology_loader::{annual_precipitation_total, load_station_readings, load_stations};
use carbono::forecast::forecast;
use carbono::utils::cache::TableCache;
use carbono::utils::csv_export::{write_table, CsvExporter};
use carbono::utils::frame::year_sums;
use carbono::utils::logging::{self, FileIOType, OperationCategory};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init_logging(args.enable_timing(), args.debug_logging());

    let config = build_config(&args)?;
    info!("Using data for {} ({})", config.state_name, config.state_code);

    let cache = TableCache::new();
    let cache = (!args.no_cache()).then_some(&cache);

    match args.command() {
        Command::Unify { output } => {
            let scenario = Scenario::load(&config, cache);
            reporting::print_source_statuses(scenario.statuses());
            let unified = scenario.unified()?;
            match output {
                Some(path) => {
                    write_table(path, &unified).map_err(|e| anyhow::anyhow!(e))
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Unified table ({} rows) written to {}", unified.height(), path.display());
                }
                None => println!("\n{}", unified),
            }
        }
        Command::Scenario(scenario_args) => {
            let scenario = Scenario::load(&config, cache);
            reporting::print_source_statuses(scenario.statuses());
            let outcome = scenario.run(&scenario_args.params())?;
            reporting::print_scenario_summary(&outcome);
        }
        Command::Compare(scenario_args) => {
            let scenario = Scenario::load(&config, cache);
            reporting::print_source_statuses(scenario.statuses());
            let results = scenario.compare_models(&scenario_args.params(), true)?;
            reporting::print_model_comparison(&results);
        }
        Command::Stats { year } => {
            let scenario = Scenario::load(&config, cache);
            reporting::print_source_statuses(scenario.statuses());
            let Some(livestock) = scenario.livestock() else {
                bail!("Livestock data is required for herd statistics");
            };
            let Some(year) = year.clone().or_else(|| latest_year(livestock)) else {
                bail!("Livestock data has no valid years");
            };

            println!("\nHerd Composition {}", year);
            println!("----------------------------------------");
            let composition = herd_composition(livestock, &year)?;
            let total: f64 = composition.iter().map(|(_, v)| v).sum();
            for (herd, headcount) in &composition {
                let share = if total > 0.0 { headcount / total * 100.0 } else { 0.0 };
                println!("  {:<24} {:>14.0} ({:.1}%)", herd, headcount, share);
            }

            println!("\nPer-municipality Statistics {}", year);
            println!("----------------------------------------");
            for (herd, summary) in herd_statistics(livestock, &year)? {
                reporting::print_summary(&herd, &summary);
            }

            for (herd, rates) in herd_growth_rates(livestock)? {
                reporting::print_series(&format!("Growth (%) - {}", herd), &rates);
            }

            if let Some(meteorology) = scenario.meteorology() {
                println!("\nCorrelation with Weather");
                println!("----------------------------------------");
                for (herd, totals) in herd_totals(livestock)? {
                    for column in METEOROLOGY_COLUMNS.iter() {
                        let Ok(weather) = year_sums(meteorology.clone().lazy(), METEOROLOGY_KEY, column.canonical) else {
                            continue;
                        };
                        if let Some((years, r)) = correlate(&totals, &weather) {
                            println!("  {:<24} {:<24} r={:+.3} ({} years)", herd, column.canonical, r, years);
                        }
                    }
                }
            }
        }
        Command::Stations => {
            let stations = load_stations(&config)?;
            reporting::print_stations(&stations);
            let readings = load_station_readings(&config)?;
            reporting::print_series("Annual Precipitation (mm, summed over stations)", &annual_precipitation_total(&readings)?);
        }
        Command::Carbon { model } => {
            let carbon = load_forest_carbon(&config)?;
            reporting::print_series(&format!("Forest Carbon Gross Emissions (Mg CO2e) - {}", config.state_name), &carbon);
            if let Some(model) = model {
                match forecast(&carbon, *model) {
                    Ok(projection) => reporting::print_series(&format!("Forecast - {}", model.label()), &projection),
                    Err(e) => warn!("{} forecast unavailable: {}", model, e),
                }
            }
        }
        Command::Productivity(productivity_args) => {
            let precipitation = match productivity_args.precipitation() {
                Some(mm) => mm,
                None => station_precipitation(&config),
            };
            let estimate = simulate_productivity(&productivity_args.inputs(precipitation))?;
            reporting::print_productivity(&estimate);
        }
        Command::Export { scenario: scenario_args, output_dir } => {
            let scenario = Scenario::load(&config, cache);
            reporting::print_source_statuses(scenario.statuses());
            let outcome = scenario.run(&scenario_args.params())?;
            reporting::print_scenario_summary(&outcome);

            let exporter = CsvExporter::new(output_dir, true).map_err(|e| anyhow::anyhow!(e))?;
            let written = exporter.export_scenario(&outcome).map_err(|e| anyhow::anyhow!(e))?;
            for path in written {
                println!("  {}", path.display());
            }
        }
    }

    logging::print_timing_report();
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<SourceConfig> {
    let _timing = logging::start_timing("build_config",
        OperationCategory::FileIO { subcategory: FileIOType::ConfigLoad });

    let mut config = match (args.config(), args.data_dir()) {
        (Some(path), _) => SourceConfig::load_from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        (None, Some(dir)) => SourceConfig::with_data_dir(dir),
        (None, None) => SourceConfig::default(),
    };

    if let Some(state) = args.state() {
        let code = state.trim().to_uppercase();
        let Some(name) = STATE_NAMES.get(code.as_str()) else {
            bail!("Unknown state code '{}'", state);
        };
        config.state_code = code;
        config.state_name = name.to_string();
    }
    Ok(config)
}

/// Mean monthly precipitation over the station files; 0 when unavailable.
fn station_precipitation(config: &SourceConfig) -> f64 {
    match load_station_readings(config) {
        Ok(readings) => match mean_monthly_precipitation(&readings) {
            Ok(Some(mm)) => mm,
            Ok(None) => {
                warn!("Station readings carry no dated precipitation, assuming 0 mm");
                0.0
            }
            Err(e) => {
                warn!("Could not average station precipitation ({}), assuming 0 mm", e);
                0.0
            }
        },
        Err(e) => {
            warn!("Could not read station data ({}), assuming 0 mm of precipitation", e);
            0.0
        }
    }
}

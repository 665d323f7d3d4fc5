use crate::analysis::productivity::ProductivityEstimate;
use crate::analysis::statistics::Summary;
use crate::core::scenario::{ModelResults, ScenarioOutcome, SourceStatus};
use crate::models::station::Station;
use crate::models::time_series::TimeSeries;

pub fn print_source_statuses(statuses: &[(&str, SourceStatus)]) {
    println!("\nData Sources");
    println!("----------------------------------------");
    for (name, status) in statuses {
        println!("  {:<12} {}", name, status);
    }
}

pub fn print_scenario_summary(outcome: &ScenarioOutcome) {
    println!("\nEmission Scenario");
    println!("----------------------------------------");
    println!("{:>6} {:>14} {:>14} {:>14}", "Year", "Agricultural", "Herd", "Total");
    for (year, total) in outcome.emission.total.iter() {
        println!(
            "{:>6} {:>14.2} {:>14.2} {:>14.2}",
            year,
            outcome.emission.agricultural.get(year).unwrap_or(0.0),
            outcome.emission.herd.get(year).unwrap_or(0.0),
            total
        );
    }

    println!("\nForecast - {}", outcome.model.label());
    println!("----------------------------------------");
    match &outcome.forecast_error {
        Some(e) => println!("  No forecast: {}", e),
        None => print_series_rows(&outcome.forecast),
    }
}

pub fn print_model_comparison(results: &ModelResults) {
    println!("\nModel Comparison");
    println!("----------------------------------------");
    for (model, result) in results {
        match result {
            Ok(series) => {
                let values: Vec<String> = series.values().iter().map(|v| format!("{:.2}", v)).collect();
                println!("{:<32} {}", model.label(), values.join("  "));
            }
            Err(e) => println!("{:<32} unavailable: {}", model.label(), e),
        }
    }
}

pub fn print_series(title: &str, series: &TimeSeries) {
    println!("\n{}", title);
    println!("----------------------------------------");
    print_series_rows(series);
}

fn print_series_rows(series: &TimeSeries) {
    if series.is_empty() {
        println!("  (no data)");
    }
    for (period, value) in series.iter() {
        println!("  {}: {:.2}", period, value);
    }
}

pub fn print_summary(label: &str, summary: &Summary) {
    println!(
        "{}: count={}, total={:.2}, mean={:.2}, std={}, min={:.2}, max={:.2}",
        label,
        summary.count,
        summary.sum,
        summary.mean,
        summary.std.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "-".to_string()),
        summary.min,
        summary.max
    );
}

pub fn print_stations(stations: &[Station]) {
    println!("\nWeather Stations");
    println!("----------------------------------------");
    for station in stations {
        let coordinate = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "?".to_string());
        println!(
            "{} [{}] lat={} lon={} alt={}",
            station.display_name(),
            station.code.as_deref().unwrap_or("-"),
            coordinate(station.latitude),
            coordinate(station.longitude),
            station.altitude.map(|a| format!("{:.0} m", a)).unwrap_or_else(|| "?".to_string()),
        );
    }
}

pub fn print_productivity(estimate: &ProductivityEstimate) {
    println!("\nProductivity Simulation - {}", estimate.crop);
    println!("----------------------------------------");
    println!("  Base productivity: {:.2} t/ha", estimate.base_productivity);
    println!("  Irrigation factor: {:.2}x", estimate.irrigation_factor);
    println!("  Technology factor: {:.2}x", estimate.technology_factor);
    println!("  Precipitation factor: {:.2}x", estimate.precipitation_factor);
    println!("  Estimated production: {:.2} t", estimate.production);
    println!("Contributions (t/ha):");
    for (factor, value) in estimate.contributions() {
        println!("  {:<14} {:.2}", factor, value);
    }
}

use polars::prelude::*;
use tracing::{debug, info, warn};

use super::error::DataLoadError;
use super::sheet::{read_grid, Grid};
use crate::config::constants::*;
use crate::config::source_config::SourceConfig;
use crate::utils::logging::{self, DataSource, OperationCategory};
use crate::utils::normalize::{normalize_column_name, normalize_year_key, parse_measurement};

/// Loads crop production for the configured state from the two-row-header
/// spreadsheet (row 0 product names, row 1 state codes, column 0 periods).
///
/// The first column becomes `Ano`; every other column is an allow-listed crop
/// named after its row-0 product label.
pub fn load_agriculture(config: &SourceConfig) -> Result<DataFrame, DataLoadError> {
    let _timing = logging::start_timing("load_agriculture",
        OperationCategory::DataLoad { subcategory: DataSource::Agriculture });

    let path = config.agriculture_path.as_path();
    let grid = read_grid(path, config.agriculture_sheet.as_deref())?;
    let frame = filter_state_crops(&grid, &config.state_code)
        .map_err(|reason| match reason {
            GridIssue::TooShort => DataLoadError::parse(path, "expected a product row and a state row"),
            GridIssue::NoCrops => DataLoadError::missing_column(path, format!("any allow-listed crop for {}", config.state_code)),
            GridIssue::Frame(e) => DataLoadError::FrameError(e),
        })?;

    info!("Loaded {} crop columns x {} periods from {}",
        frame.width().saturating_sub(1), frame.height(), path.display());
    Ok(frame)
}

#[derive(Debug)]
enum GridIssue {
    TooShort,
    NoCrops,
    Frame(PolarsError),
}

/// Index into [`TARGET_CROPS`] matched by a sheet product label, if any.
pub fn match_crop(product: &str) -> Option<usize> {
    let product = normalize_column_name(product);
    if product.is_empty() {
        return None;
    }
    TARGET_CROPS
        .iter()
        .position(|crop| product.contains(&normalize_column_name(crop.label)))
}

fn filter_state_crops(grid: &Grid, state_code: &str) -> Result<DataFrame, GridIssue> {
    if grid.len() <= STATE_ROW {
        return Err(GridIssue::TooShort);
    }
    let products = &grid[PRODUCT_ROW];
    let states = &grid[STATE_ROW];

    let mut selected: Vec<(usize, String)> = Vec::new();
    let mut matched_crops = vec![false; TARGET_CROPS.len()];

    for (index, state) in states.iter().enumerate() {
        if index == PERIOD_COLUMN || !state.trim().eq_ignore_ascii_case(state_code) {
            continue;
        }
        let product = products.get(index).map(String::as_str).unwrap_or("");
        if let Some(crop) = match_crop(product) {
            matched_crops[crop] = true;
            let names: Vec<String> = selected.iter().map(|(_, n)| n.clone()).collect();
            selected.push((index, dedupe(&names, product.trim())));
        }
    }

    for (crop, matched) in TARGET_CROPS.iter().zip(&matched_crops) {
        if !matched {
            warn!("No {} column found for crop '{}'", state_code, crop.label);
        }
    }
    if selected.is_empty() {
        return Err(GridIssue::NoCrops);
    }

    let mut periods = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); selected.len()];
    let mut blank_rows = 0usize;
    for row in grid.iter().skip(STATE_ROW + 1) {
        let raw_period = row.get(PERIOD_COLUMN).map(|s| s.trim()).unwrap_or("");
        if raw_period.is_empty() {
            blank_rows += 1;
            continue;
        }
        periods.push(normalize_year_key(raw_period).unwrap_or_else(|| raw_period.to_string()));
        for ((index, _), cells) in selected.iter().zip(values.iter_mut()) {
            cells.push(row.get(*index).and_then(|c| parse_measurement(c)));
        }
    }
    debug!("Skipped {} agricultural rows without a period", blank_rows);

    let mut columns = vec![Column::new(AGRICULTURE_KEY.into(), periods)];
    for ((_, name), cells) in selected.into_iter().zip(values) {
        columns.push(Column::new(name.into(), cells));
    }
    DataFrame::new(columns).map_err(GridIssue::Frame)
}

fn dedupe(existing: &[String], name: &str) -> String {
    if !existing.iter().any(|n| n == name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{} ({})", name, n))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

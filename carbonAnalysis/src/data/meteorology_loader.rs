use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use polars::prelude::*;
use tracing::{debug, info};

use super::error::{ensure_exists, DataLoadError};
use crate::config::constants::*;
use crate::config::source_config::SourceConfig;
use crate::models::station::Station;
use crate::models::time_series::TimeSeries;
use crate::utils::frame::year_sums;
use crate::utils::logging::{self, DataSource, OperationCategory};
use crate::utils::normalize::{normalize_column_name, normalize_year_key, parse_measurement};

pub const STATION_COLUMN: &str = "estacao";

pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Yearly state-wide means of every mapped measurement.
///
/// All stations are pooled before averaging, so a year's value is the mean of
/// every monthly reading of every station in that year.
pub fn load_meteorology(config: &SourceConfig) -> Result<DataFrame, DataLoadError> {
    let _timing = logging::start_timing("load_meteorology",
        OperationCategory::DataLoad { subcategory: DataSource::Meteorology });

    let readings = load_station_readings(config)?;
    let means: Vec<Expr> = METEOROLOGY_COLUMNS.iter().map(|c| col(c.canonical).mean()).collect();
    let yearly = readings
        .clone()
        .lazy()
        .group_by([col(METEOROLOGY_KEY)])
        .agg(means)
        .sort([METEOROLOGY_KEY], SortMultipleOptions::default())
        .collect()?;

    info!("Aggregated {} meteorological readings into {} years", readings.height(), yearly.height());
    Ok(yearly)
}

/// Every monthly reading of every station, with canonical column names.
///
/// Columns: `estacao`, `data_medicao`, `ano`, then the canonical measurements.
pub fn load_station_readings(config: &SourceConfig) -> Result<DataFrame, DataLoadError> {
    let frames = station_files(&config.meteorology_dir)?
        .iter()
        .map(|path| {
            let (station, frame) = read_station_file(path)?;
            debug!("Station {}: {} readings", station.display_name(), frame.height());
            Ok(frame.lazy())
        })
        .collect::<Result<Vec<LazyFrame>, DataLoadError>>()?;

    Ok(concat(frames, UnionArgs::default())?.collect()?)
}

/// Station metadata from every export preamble in the directory.
pub fn load_stations(config: &SourceConfig) -> Result<Vec<Station>, DataLoadError> {
    station_files(&config.meteorology_dir)?
        .into_iter()
        .map(|path| {
            let contents = read_text(&path)?;
            Ok(Station::from_preamble(
                contents.lines().take(METEOROLOGY_PREAMBLE_LINES),
                path,
            ))
        })
        .collect()
}

/// Total precipitation per year summed over every station and month.
pub fn annual_precipitation_total(readings: &DataFrame) -> Result<TimeSeries, DataLoadError> {
    Ok(year_sums(readings.clone().lazy(), METEOROLOGY_KEY, PRECIPITATION_COLUMN)?)
}

fn station_files(dir: &Path) -> Result<Vec<PathBuf>, DataLoadError> {
    ensure_exists(dir)?;
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(DataLoadError::EmptySource(dir.to_path_buf()));
    }
    Ok(files)
}

/// Station exports are UTF-8 or Windows-1252 depending on when they were pulled.
fn read_text(path: &Path) -> Result<String, DataLoadError> {
    let bytes = fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => WINDOWS_1252.decode(e.as_bytes()).0.into_owned(),
    })
}

fn read_station_file(path: &Path) -> Result<(Station, DataFrame), DataLoadError> {
    let contents = read_text(path)?;
    let lines: Vec<&str> = contents.lines().collect();
    if lines.len() <= METEOROLOGY_PREAMBLE_LINES {
        return Err(DataLoadError::parse(path, "file ends inside the station preamble"));
    }

    let station = Station::from_preamble(lines[..METEOROLOGY_PREAMBLE_LINES].iter().copied(), path.to_path_buf());
    let body = lines[METEOROLOGY_PREAMBLE_LINES..].join("\n");

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(METEOROLOGY_DELIMITER)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_column_name).collect();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DataLoadError::missing_column(path, name))
    };

    let date_idx = position(METEOROLOGY_DATE_COLUMN)?;
    let measure_idx = METEOROLOGY_COLUMNS
        .iter()
        .map(|c| position(c.normalized))
        .collect::<Result<Vec<usize>, _>>()?;

    let station_name = station.display_name();
    let mut dates = Vec::new();
    let mut years = Vec::new();
    let mut measures: Vec<Vec<Option<f64>>> = vec![Vec::new(); measure_idx.len()];
    let mut undated = 0usize;
    for record in reader.records() {
        let record = record?;
        let date = record.get(date_idx).map(str::trim).unwrap_or("");
        let Some(year) = year_of_date(date) else {
            undated += 1;
            continue;
        };

        dates.push(date.to_string());
        years.push(year);
        for (&i, cells) in measure_idx.iter().zip(measures.iter_mut()) {
            cells.push(record.get(i).and_then(parse_measurement));
        }
    }

    if undated > 0 {
        debug!("Dropped {} rows without a valid date in {}", undated, path.display());
    }

    let mut columns = vec![
        Column::new(STATION_COLUMN.into(), vec![station_name; dates.len()]),
        Column::new(METEOROLOGY_DATE_COLUMN.into(), dates),
        Column::new(METEOROLOGY_KEY.into(), years),
    ];
    for (column, cells) in METEOROLOGY_COLUMNS.iter().zip(measures) {
        columns.push(Column::new(column.canonical.into(), cells));
    }
    Ok((station, DataFrame::new(columns)?))
}

/// Year of a measurement date (`2020-01-31`, `31/01/2020`, `2020/01/31`).
pub fn year_of_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|d| d.year().to_string())
        .or_else(|| normalize_year_key(trimmed))
}

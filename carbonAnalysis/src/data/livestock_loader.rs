use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::*;
use tracing::{debug, info, warn};

use super::error::{ensure_exists, DataLoadError};
use super::sheet::sniff_delimiter;
use crate::config::constants::*;
use crate::config::source_config::SourceConfig;
use crate::utils::logging::{self, DataSource, OperationCategory};
use crate::utils::normalize::{normalize_year_key, parse_measurement};

/// Loads the herd headcount file filtered to the configured state.
///
/// Output columns: `ano`, `tipo_rebanho`, `quantidade` and, when the source
/// has it, `id_municipio`. The delimiter is sniffed from the header line; if
/// that parse fails the file is parsed again as `;`-delimited.
pub fn load_livestock(config: &SourceConfig) -> Result<DataFrame, DataLoadError> {
    let _timing = logging::start_timing("load_livestock",
        OperationCategory::DataLoad { subcategory: DataSource::Livestock });

    let path = config.livestock_path.as_path();
    ensure_exists(path)?;
    let contents = fs::read_to_string(path)?;

    let sniffed = contents
        .lines()
        .find(|l| !l.trim().is_empty())
        .and_then(sniff_delimiter);

    let first_attempt = match sniffed {
        Some(delimiter) if delimiter != LIVESTOCK_FALLBACK_DELIMITER => {
            Some(parse_livestock(&contents, delimiter, path, &config.state_code))
        }
        _ => None,
    };

    let frame = match first_attempt {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => {
            warn!("Sniffed delimiter failed for {} ({}); retrying with ';'", path.display(), e);
            match parse_livestock(&contents, LIVESTOCK_FALLBACK_DELIMITER, path, &config.state_code) {
                Ok(frame) => frame,
                Err(fallback_err) => {
                    debug!("';' fallback also failed: {}", fallback_err);
                    return Err(e);
                }
            }
        }
        None => parse_livestock(&contents, LIVESTOCK_FALLBACK_DELIMITER, path, &config.state_code)?,
    };

    info!("Loaded {} livestock rows for {} from {}", frame.height(), config.state_code, path.display());
    Ok(frame)
}

fn parse_livestock(
    contents: &str,
    delimiter: u8,
    path: &Path,
    state_code: &str,
) -> Result<DataFrame, DataLoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| position(name).ok_or_else(|| DataLoadError::missing_column(path, name));

    let year_idx = require(LIVESTOCK_KEY)?;
    let herd_idx = require(HERD_TYPE_COLUMN)?;
    let quantity_idx = require(HERD_QUANTITY_COLUMN)?;
    let state_idx = position(STATE_CODE_COLUMN);
    let municipality_idx = position(MUNICIPALITY_COLUMN);

    let mut years = Vec::new();
    let mut herds = Vec::new();
    let mut quantities = Vec::new();
    let mut municipalities = Vec::new();
    let mut skipped_state = 0usize;

    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

        if let Some(idx) = state_idx {
            if !field(idx).eq_ignore_ascii_case(state_code) {
                skipped_state += 1;
                continue;
            }
        }

        let raw_year = field(year_idx);
        years.push(normalize_year_key(raw_year).unwrap_or_else(|| raw_year.to_string()));
        herds.push(field(herd_idx).to_string());
        quantities.push(parse_measurement(field(quantity_idx)));
        if let Some(idx) = municipality_idx {
            municipalities.push(field(idx).to_string());
        }
    }

    debug!("Skipped {} livestock rows outside {}", skipped_state, state_code);

    if years.is_empty() {
        return Err(DataLoadError::EmptySource(path.to_path_buf()));
    }

    let mut columns = vec![
        Column::new(LIVESTOCK_KEY.into(), years),
        Column::new(HERD_TYPE_COLUMN.into(), herds),
        Column::new(HERD_QUANTITY_COLUMN.into(), quantities),
    ];
    if municipality_idx.is_some() {
        columns.push(Column::new(MUNICIPALITY_COLUMN.into(), municipalities));
    }
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(contents: &str) -> (tempfile::TempDir, SourceConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SourceConfig::with_data_dir(dir.path());
        config.livestock_path = dir.path().join("rebanhos.csv");
        fs::write(&config.livestock_path, contents).unwrap();
        (dir, config)
    }

    use crate::utils::frame::{distinct_text, number_values};

    fn columns(df: &DataFrame) -> Vec<String> {
        df.get_column_names().into_iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn semicolon_file_filtered_to_state() {
        let (_dir, config) = config_for(
            "ano;sigla_uf;id_municipio;tipo_rebanho;quantidade\n\
             2020;MS;5002704;Bovino;100\n\
             2020;MT;5103403;Bovino;999\n\
             2021;MS;5002704;Bovino;120\n",
        );
        let frame = load_livestock(&config).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(columns(&frame), vec!["ano", "tipo_rebanho", "quantidade", "id_municipio"]);
        assert_eq!(number_values(&frame, "quantidade").unwrap(), vec![Some(100.0), Some(120.0)]);
    }

    #[test]
    fn comma_file_without_state_column() {
        let (_dir, config) = config_for("ano,tipo_rebanho,quantidade\n2020,Suíno,5\n2021,Suíno,7\n");
        let frame = load_livestock(&config).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(distinct_text(&frame, "tipo_rebanho").unwrap(), vec!["Suíno"]);
    }

    #[test]
    fn falls_back_to_semicolon_when_sniffing_misleads() {
        // Header has more commas than semicolons but the file is ';' separated.
        let (_dir, config) = config_for(
            "ano;tipo_rebanho;quantidade;obs,a,b,c\n2020;Bovino;10,5;x\n",
        );
        let frame = load_livestock(&config).unwrap();
        assert_eq!(number_values(&frame, "quantidade").unwrap(), vec![Some(10.5)]);
    }

    #[test]
    fn missing_required_column_is_reported() {
        let (_dir, config) = config_for("ano;quantidade\n2020;1\n");
        match load_livestock(&config) {
            Err(DataLoadError::MissingColumn { column, .. }) => assert_eq!(column, "tipo_rebanho"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn absent_file_is_source_missing() {
        let config = SourceConfig::with_data_dir("/nonexistent");
        assert!(load_livestock(&config).unwrap_err().is_source_missing());
    }
}

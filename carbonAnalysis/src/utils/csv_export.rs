use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::{ReaderBuilder, Writer};
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::constants::{TOTAL_EMISSION_COLUMN, UNIFIED_KEY};
use crate::core::scenario::ScenarioOutcome;
use crate::forecast::ModelKind;
use crate::models::time_series::{TimeSeries, TimeSeriesRecord};
use crate::utils::logging::{self, FileIOType, OperationCategory};
use crate::utils::normalize::{normalize_year_key, parse_measurement};

type ExportResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Serialize)]
struct ScenarioSummary {
    model: ModelKind,
    agricultural: Vec<TimeSeriesRecord>,
    herd: Vec<TimeSeriesRecord>,
    total: Vec<TimeSeriesRecord>,
    forecast: Vec<TimeSeriesRecord>,
    forecast_error: Option<String>,
}

/// Writes scenario outputs into a timestamped directory under `output_dir`.
pub struct CsvExporter {
    output_dir: PathBuf,
    timestamp: String,
    verbose_logging: bool,
}

impl CsvExporter {
    pub fn new(output_dir: impl AsRef<Path>, verbose_logging: bool) -> ExportResult<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let full_path = output_dir.as_ref().join(&timestamp);
        fs::create_dir_all(&full_path)?;

        Ok(Self {
            output_dir: full_path,
            timestamp,
            verbose_logging,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Unified table, emission table, forecast (when there is one) and a
    /// JSON summary of the pass.
    pub fn export_scenario(&self, outcome: &ScenarioOutcome) -> ExportResult<Vec<PathBuf>> {
        let mut written = vec![
            self.export_table("dados_unificados.csv", &outcome.unified)?,
            self.export_table("emissao_cenario.csv", &outcome.emission.to_frame()?)?,
        ];
        if !outcome.forecast.is_empty() {
            let name = format!("previsao_{}.csv", outcome.model);
            written.push(self.export_series(&name, &outcome.forecast)?);
        }
        written.push(self.export_summary(outcome)?);

        if self.verbose_logging {
            println!("CSV export completed successfully to: {}", self.output_dir.display());
        }
        Ok(written)
    }

    pub fn export_summary(&self, outcome: &ScenarioOutcome) -> ExportResult<PathBuf> {
        let _timing = logging::start_timing("export_summary",
            OperationCategory::FileIO { subcategory: FileIOType::ResultsSave });

        let summary = ScenarioSummary {
            model: outcome.model,
            agricultural: outcome.emission.agricultural.to_records(),
            herd: outcome.emission.herd.to_records(),
            total: outcome.emission.total.to_records(),
            forecast: outcome.forecast.to_records(),
            forecast_error: outcome.forecast_error.as_ref().map(|e| e.to_string()),
        };
        let path = self.output_dir.join("resumo_cenario.json");
        fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        Ok(path)
    }

    pub fn export_table(&self, file_name: &str, frame: &DataFrame) -> ExportResult<PathBuf> {
        let path = self.output_dir.join(file_name);
        write_table(&path, frame)?;
        Ok(path)
    }

    pub fn export_series(&self, file_name: &str, series: &TimeSeries) -> ExportResult<PathBuf> {
        let path = self.output_dir.join(file_name);
        write_series(&path, series, TOTAL_EMISSION_COLUMN)?;
        Ok(path)
    }
}

/// Header row, then one record per row; nulls are written as empty cells.
pub fn write_table(path: &Path, frame: &DataFrame) -> ExportResult<()> {
    let _timing = logging::start_timing("write_table",
        OperationCategory::FileIO { subcategory: FileIOType::ResultsSave });

    let mut file = fs::File::create(path)?;
    let mut frame = frame.clone();
    CsvWriter::new(&mut file).include_header(true).finish(&mut frame)?;

    info!("Wrote {} rows to {}", frame.height(), path.display());
    Ok(())
}

/// Two columns: `ano` and `value_column`.
pub fn write_series(path: &Path, series: &TimeSeries, value_column: &str) -> ExportResult<()> {
    let _timing = logging::start_timing("write_series",
        OperationCategory::FileIO { subcategory: FileIOType::ResultsSave });

    let mut writer = Writer::from_path(path)?;
    writer.write_record([UNIFIED_KEY, value_column])?;
    for (period, value) in series.iter() {
        writer.write_record([period.to_string(), value.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a series written by [`write_series`]: header row, then
/// `period,value` records. Blank values are skipped.
pub fn read_series(path: &Path) -> ExportResult<TimeSeries> {
    let _timing = logging::start_timing("read_series",
        OperationCategory::FileIO { subcategory: FileIOType::ResultsLoad });

    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut series = TimeSeries::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw_period = record.get(0).unwrap_or("");
        let period = normalize_year_key(raw_period)
            .ok_or_else(|| format!("line {}: '{}' is not a year", line + 2, raw_period))?;
        if let Some(value) = record.get(1).and_then(parse_measurement) {
            series.set(period, value);
        }
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("previsao.csv");
        write_series(&path, &TimeSeries::from_years([(2023, 40.5), (2024, 50.0)]), "emissao_total").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ano,emissao_total\n2023,40.5\n2024,50\n");
    }

    #[test]
    fn table_cells_are_quoted_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let frame = df![
            "ano" => ["2020", "2021"],
            "tipo_rebanho" => [Some("Galinhas, galos"), None],
        ]
        .unwrap();
        write_table(&path, &frame).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "ano,tipo_rebanho\n2020,\"Galinhas, galos\"\n2021,\n"
        );
    }

    #[test]
    fn rejects_non_year_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "ano,emissao_total\ntotal,3\n").unwrap();
        assert!(read_series(&path).is_err());
    }

    #[test]
    fn exporter_creates_timestamped_dir() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path(), false).unwrap();
        assert!(exporter.output_dir().is_dir());
        assert_eq!(exporter.output_dir().file_name().unwrap().to_str(), Some(exporter.timestamp()));
    }
}

use tracing::{debug, info};

use super::error::DataLoadError;
use super::sheet::{read_grid, Grid};
use crate::config::constants::*;
use crate::config::source_config::SourceConfig;
use crate::models::time_series::TimeSeries;
use crate::utils::logging::{self, DataSource, OperationCategory};
use crate::utils::normalize::parse_measurement;

/// Gross forest-carbon emissions (Mg CO2e) per year for the configured state,
/// summed over every municipality row of the workbook sheet.
pub fn load_forest_carbon(config: &SourceConfig) -> Result<TimeSeries, DataLoadError> {
    let _timing = logging::start_timing("load_forest_carbon",
        OperationCategory::DataLoad { subcategory: DataSource::ForestCarbon });

    let path = config.forest_carbon_path.as_path();
    let grid = read_grid(path, Some(&config.forest_carbon_sheet))?;
    let series = sum_state_emissions(&grid, &config.state_name).map_err(|issue| match issue {
        CarbonIssue::NoHeader => DataLoadError::EmptySource(path.to_path_buf()),
        CarbonIssue::MissingColumn(column) => DataLoadError::missing_column(path, column),
        CarbonIssue::NoRows => DataLoadError::EmptySource(path.to_path_buf()),
    })?;

    info!("Loaded forest carbon emissions for {} years of {}", series.len(), config.state_name);
    Ok(series)
}

#[derive(Debug, PartialEq)]
enum CarbonIssue {
    NoHeader,
    MissingColumn(String),
    NoRows,
}

/// Year encoded in a `gfw_forest_carbon_gross_emissions_{YYYY}__Mg_CO2e` header.
pub fn emission_column_year(header: &str) -> Option<String> {
    let year = header
        .trim()
        .strip_prefix(FOREST_EMISSION_PREFIX)?
        .strip_suffix(FOREST_EMISSION_SUFFIX)?;
    (year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit())).then(|| year.to_string())
}

fn sum_state_emissions(grid: &Grid, state_name: &str) -> Result<TimeSeries, CarbonIssue> {
    let header = grid.first().ok_or(CarbonIssue::NoHeader)?;

    let region_idx = header
        .iter()
        .position(|h| h.trim() == FOREST_REGION_COLUMN)
        .ok_or_else(|| CarbonIssue::MissingColumn(FOREST_REGION_COLUMN.to_string()))?;

    let year_columns: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter_map(|(i, h)| emission_column_year(h).map(|y| (i, y)))
        .collect();
    if year_columns.is_empty() {
        return Err(CarbonIssue::MissingColumn(format!(
            "{}YYYY{}", FOREST_EMISSION_PREFIX, FOREST_EMISSION_SUFFIX
        )));
    }

    let mut series = TimeSeries::new();
    let mut matched_rows = 0usize;
    for row in grid.iter().skip(1) {
        let region = row.get(region_idx).map(|s| s.trim()).unwrap_or("");
        if region != state_name.trim() {
            continue;
        }
        matched_rows += 1;
        for (col, year) in &year_columns {
            let value = row.get(*col).and_then(|c| parse_measurement(c)).unwrap_or(0.0);
            series.add(year.clone(), value);
        }
    }

    debug!("{} forest carbon rows matched {}", matched_rows, state_name);
    if matched_rows == 0 {
        return Err(CarbonIssue::NoRows);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
    }

    #[test]
    fn sums_state_rows_per_year() {
        let g = grid(&[
            &["country", "subnational1", "subnational2",
              "gfw_forest_carbon_gross_emissions_2001__Mg_CO2e",
              "gfw_forest_carbon_gross_emissions_2002__Mg_CO2e", "umd_tree_cover_extent_2000__ha"],
            &["Brazil", "Mato Grosso do Sul", "Dourados", "10", "20", "999"],
            &["Brazil", "Mato Grosso do Sul", "Corumbá", "5,5", "", "999"],
            &["Brazil", "Mato Grosso", "Sinop", "1000", "1000", "999"],
        ]);
        let series = sum_state_emissions(&g, "Mato Grosso do Sul").unwrap();
        assert_eq!(series.periods(), vec!["2001", "2002"]);
        assert_eq!(series.get("2001"), Some(15.5));
        assert_eq!(series.get("2002"), Some(20.0));
    }

    #[test]
    fn header_years() {
        assert_eq!(
            emission_column_year("gfw_forest_carbon_gross_emissions_2019__Mg_CO2e").as_deref(),
            Some("2019")
        );
        assert_eq!(emission_column_year("gfw_forest_carbon_gross_emissions_all__Mg_CO2e"), None);
        assert_eq!(emission_column_year("subnational1"), None);
    }

    #[test]
    fn state_absent_or_layout_wrong() {
        let header: &[&str] = &["subnational1", "gfw_forest_carbon_gross_emissions_2001__Mg_CO2e"];
        let g = grid(&[header, &["Paraná", "1"]]);
        assert_eq!(sum_state_emissions(&g, "Mato Grosso do Sul").unwrap_err(), CarbonIssue::NoRows);

        let g = grid(&[&["subnational1", "area"], &["Mato Grosso do Sul", "1"]]);
        assert!(matches!(
            sum_state_emissions(&g, "Mato Grosso do Sul"),
            Err(CarbonIssue::MissingColumn(_))
        ));
        assert_eq!(sum_state_emissions(&Vec::new(), "x").unwrap_err(), CarbonIssue::NoHeader);
    }
}

//! Raw cell grids, read without interpreting any header row.

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;

use super::error::{ensure_exists, DataLoadError};
use crate::config::constants::DELIMITER_CANDIDATES;

pub type Grid = Vec<Vec<String>>;

/// Reads every cell of a workbook sheet (`.xlsx`, `.xls`, `.ods`) or of a
/// delimited text export (`.csv`, `.txt`) as trimmed strings.
pub fn read_grid(path: &Path, sheet: Option<&str>) -> Result<Grid, DataLoadError> {
    ensure_exists(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "txt" => read_delimited_grid(path),
        _ => read_workbook_grid(path, sheet),
    }
}

fn read_workbook_grid(path: &Path, sheet: Option<&str>) -> Result<Grid, DataLoadError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DataLoadError::EmptySource(path.to_path_buf()))?,
    };

    if !workbook.sheet_names().iter().any(|s| s == &sheet_name) {
        return Err(DataLoadError::parse(path, format!("sheet '{}' not found", sheet_name)));
    }

    let range = workbook.worksheet_range(&sheet_name)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn read_delimited_grid(path: &Path) -> Result<Grid, DataLoadError> {
    let contents = fs::read_to_string(path)?;
    let delimiter = contents
        .lines()
        .find(|l| !l.trim().is_empty())
        .and_then(sniff_delimiter)
        .unwrap_or(b',');

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(contents.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(grid)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Picks the candidate delimiter that occurs most often in a header line.
///
/// Returns `None` when no candidate occurs at all. Ties go to the earlier
/// candidate (`,` before `;`).
pub fn sniff_delimiter(line: &str) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for &candidate in DELIMITER_CANDIDATES.iter() {
        let count = line.bytes().filter(|&b| b == candidate).count();
        if count == 0 {
            continue;
        }
        match best {
            Some((_, n)) if n >= count => {}
            _ => best = Some((candidate, count)),
        }
    }
    best.map(|(delimiter, _)| delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter("ano;sigla_uf;tipo_rebanho;quantidade"), Some(b';'));
        assert_eq!(sniff_delimiter("ano,sigla_uf,tipo_rebanho"), Some(b','));
        assert_eq!(sniff_delimiter("ano\tquantidade"), Some(b'\t'));
        assert_eq!(sniff_delimiter("ano"), None);
    }

    #[test]
    fn reads_csv_grid_without_header() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, ";Soja;Milho").unwrap();
        writeln!(file, ";MS;MS").unwrap();
        writeln!(file, "2020;1,5;2").unwrap();

        let grid = read_grid(file.path(), None).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0], vec!["", "Soja", "Milho"]);
        assert_eq!(grid[2][1], "1,5");
    }

    #[test]
    fn missing_file_is_source_missing() {
        let err = read_grid(Path::new("/nonexistent/planilha.xlsx"), None).unwrap_err();
        assert!(err.is_source_missing());
    }
}

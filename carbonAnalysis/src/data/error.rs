use std::path::PathBuf;

#[derive(Debug)]
pub enum DataLoadError {
    SourceMissing(PathBuf),
    IoError(std::io::Error),
    CsvError(csv::Error),
    SheetError(calamine::Error),
    FrameError(polars::prelude::PolarsError),
    ParseError { source: PathBuf, reason: String },
    MissingColumn { source: PathBuf, column: String },
    EmptySource(PathBuf),
}

impl DataLoadError {
    /// Absent sources degrade the pipeline instead of failing it.
    pub fn is_source_missing(&self) -> bool {
        matches!(self, DataLoadError::SourceMissing(_))
    }

    pub fn parse(source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        DataLoadError::ParseError {
            source: source.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_column(source: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        DataLoadError::MissingColumn {
            source: source.into(),
            column: column.into(),
        }
    }
}

impl From<std::io::Error> for DataLoadError {
    fn from(err: std::io::Error) -> Self {
        DataLoadError::IoError(err)
    }
}

impl From<csv::Error> for DataLoadError {
    fn from(err: csv::Error) -> Self {
        DataLoadError::CsvError(err)
    }
}

impl From<calamine::Error> for DataLoadError {
    fn from(err: calamine::Error) -> Self {
        DataLoadError::SheetError(err)
    }
}

impl From<polars::prelude::PolarsError> for DataLoadError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        DataLoadError::FrameError(err)
    }
}

impl std::fmt::Display for DataLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataLoadError::SourceMissing(p) => write!(f, "Source not found: {}", p.display()),
            DataLoadError::IoError(e) => write!(f, "IO error: {}", e),
            DataLoadError::CsvError(e) => write!(f, "CSV error: {}", e),
            DataLoadError::SheetError(e) => write!(f, "Spreadsheet error: {}", e),
            DataLoadError::FrameError(e) => write!(f, "Frame error: {}", e),
            DataLoadError::ParseError { source, reason } => {
                write!(f, "Could not parse {}: {}", source.display(), reason)
            }
            DataLoadError::MissingColumn { source, column } => {
                write!(f, "Expected column '{}' not found in {}", column, source.display())
            }
            DataLoadError::EmptySource(p) => write!(f, "No usable rows in {}", p.display()),
        }
    }
}

impl std::error::Error for DataLoadError {}

/// Fails with [`DataLoadError::SourceMissing`] when `path` does not exist.
pub fn ensure_exists(path: &std::path::Path) -> Result<(), DataLoadError> {
    if path.exists() {
        Ok(())
    } else {
        Err(DataLoadError::SourceMissing(path.to_path_buf()))
    }
}

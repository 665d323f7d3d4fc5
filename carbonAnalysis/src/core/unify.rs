use polars::prelude::*;
use tracing::{debug, info};

use crate::config::constants::UNIFIED_KEY;
use crate::utils::frame::{text_values, year_column};
use crate::utils::logging::{self, OperationCategory};
use crate::utils::normalize::{normalize_column_name, normalize_year_key};

#[derive(Debug)]
pub enum UnifyError {
    NoSources,
    MissingKey(String),
    Frame(PolarsError),
}

impl std::fmt::Display for UnifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnifyError::NoSources => write!(f, "No dataset was loaded; nothing to unify"),
            UnifyError::MissingKey(source) => {
                write!(f, "The {} table has no year column", source)
            }
            UnifyError::Frame(e) => write!(f, "Join failed: {}", e),
        }
    }
}

impl std::error::Error for UnifyError {}

impl From<PolarsError> for UnifyError {
    fn from(e: PolarsError) -> Self {
        UnifyError::Frame(e)
    }
}

/// Joins every available dataset on the year key.
///
/// Meteorology (when present) is full-joined with agriculture, and the result
/// with livestock. Missing numbers become `0.0` and missing text `"0"`, the
/// `ano` key stays a string and rows come out ordered by year.
pub fn unify(
    agro: Option<&DataFrame>,
    live: Option<&DataFrame>,
    meteo: Option<&DataFrame>,
) -> Result<DataFrame, UnifyError> {
    let _timing = logging::start_timing("unify", OperationCategory::Unify);

    let mut keyed = Vec::new();
    for (name, frame) in [("meteorology", meteo), ("agriculture", agro), ("livestock", live)] {
        if let Some(frame) = frame {
            keyed.push(with_year_key(frame, name)?);
        }
    }

    let mut frames = keyed.into_iter();
    let first = frames.next().ok_or(UnifyError::NoSources)?;
    let joined = frames.fold(first, |acc, next| {
        acc.join(
            next,
            [col(UNIFIED_KEY)],
            [col(UNIFIED_KEY)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        )
    });

    let unified = joined
        .with_columns([
            dtype_col(&DataType::Float64).fill_null(lit(0.0)),
            dtype_col(&DataType::String).fill_null(lit("0")),
        ])
        .sort([UNIFIED_KEY], SortMultipleOptions::default().with_maintain_order(true))
        .collect()?;

    info!("Unified table: {} rows x {} columns", unified.height(), unified.width());
    Ok(unified)
}

/// Applies [`normalize_column_name`] to every column name.
pub fn normalize_column_names(df: &DataFrame) -> PolarsResult<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|c| normalize_column_name(c))
        .collect();
    let mut renamed = df.clone();
    renamed.set_column_names(names)?;
    Ok(renamed)
}

/// Renames the frame's year column to `ano` and coerces every key to a
/// 4-digit year string, dropping rows whose key does not coerce.
fn with_year_key(df: &DataFrame, source: &str) -> Result<LazyFrame, UnifyError> {
    let key = year_column(df).ok_or_else(|| UnifyError::MissingKey(source.to_string()))?;

    let years: Vec<Option<String>> = text_values(df, &key)?
        .into_iter()
        .map(|v| v.as_deref().and_then(normalize_year_key))
        .collect();
    let dropped = years.iter().filter(|y| y.is_none()).count();
    if dropped > 0 {
        debug!("Dropped {} {} rows without a valid year", dropped, source);
    }

    let mut keyed = df.clone();
    keyed.with_column(Column::new(key.as_str().into(), years))?;
    keyed.rename(&key, UNIFIED_KEY.into())?;
    // polars 0.46 `rename` leaves the cached schema stale; refresh it so the
    // lazy plan sees the new key name.
    keyed.clear_schema();
    Ok(keyed.lazy().filter(col(UNIFIED_KEY).is_not_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::frame::number_values;

    fn agro() -> DataFrame {
        df![
            "Ano" => ["2021", "2020.0"],
            "Soja" => [2.0, 1.0],
        ]
        .unwrap()
    }

    fn live() -> DataFrame {
        df![
            "ano" => ["2020", "2020", "2022", "sem ano"],
            "tipo_rebanho" => ["Bovino", "Suíno", "Bovino", "Bovino"],
            "quantidade" => [10.0, 4.0, 12.0, 1.0],
        ]
        .unwrap()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().into_iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn joins_and_fills_with_zero() {
        let unified = unify(Some(&agro()), Some(&live()), None).unwrap();
        assert_eq!(names(&unified), ["ano", "Soja", "tipo_rebanho", "quantidade"]);
        // 2020 x2 herds, 2021 agro only, 2022 livestock only
        assert_eq!(unified.height(), 4);
        let years = text_values(&unified, "ano").unwrap();
        assert_eq!(years[0].as_deref(), Some("2020"));
        assert_eq!(years[3].as_deref(), Some("2022"));
        assert_eq!(number_values(&unified, "quantidade").unwrap()[2], Some(0.0));
        assert_eq!(number_values(&unified, "Soja").unwrap()[3], Some(0.0));
        assert_eq!(text_values(&unified, "tipo_rebanho").unwrap()[2].as_deref(), Some("0"));
        assert!(unified.get_columns().iter().all(|c| c.null_count() == 0));
    }

    #[test]
    fn meteorology_comes_first() {
        let meteo = df!["ano" => ["2019"], "temperatura_media" => [24.5]].unwrap();
        let unified = unify(Some(&agro()), None, Some(&meteo)).unwrap();
        assert_eq!(names(&unified), ["ano", "temperatura_media", "Soja"]);
        assert_eq!(unified.height(), 3);
        assert_eq!(number_values(&unified, "temperatura_media").unwrap()[0], Some(24.5));
    }

    #[test]
    fn numeric_year_keys_become_text() {
        let meteo = df!["ano" => [2020i32, 2021], "temperatura_media" => [24.0, 25.0]].unwrap();
        let unified = unify(Some(&agro()), None, Some(&meteo)).unwrap();
        assert_eq!(unified.column("ano").unwrap().dtype(), &DataType::String);
        assert_eq!(unified.height(), 2);
    }

    #[test]
    fn row_count_never_shrinks() {
        let (a, l) = (agro(), live());
        let unified = unify(Some(&a), Some(&l), None).unwrap();
        assert!(unified.height() >= a.height());
        // the livestock row with an unusable key is dropped before the join
        assert!(unified.height() >= l.height() - 1);
    }

    #[test]
    fn single_source_and_no_source() {
        let unified = unify(None, Some(&live()), None).unwrap();
        assert_eq!(unified.height(), 3);
        assert!(matches!(unify(None, None, None), Err(UnifyError::NoSources)));
    }

    #[test]
    fn frame_without_year_is_rejected() {
        let soja = df!["Soja" => [1.0]].unwrap();
        match unify(Some(&soja), None, None) {
            Err(UnifyError::MissingKey(source)) => assert_eq!(source, "agriculture"),
            other => panic!("expected a missing key, got {:?}", other),
        }
    }

    #[test]
    fn column_names_normalize_idempotently() {
        let df = df![
            "Ano" => ["2020"],
            "Cana-de-açúcar" => [1.0],
            "TEMPERATURA MEDIA, MENSAL (AUT)(°C)" => [2.0],
        ]
        .unwrap();
        let once = normalize_column_names(&df).unwrap();
        assert_eq!(names(&once), ["ano", "cana_de_acucar", "temperatura_media_mensal_aut_c"]);
        assert_eq!(normalize_column_names(&once).unwrap(), once);
    }
}

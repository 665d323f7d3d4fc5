use std::collections::HashMap;

use lazy_static::lazy_static;

// Region
pub const DEFAULT_STATE_CODE: &str = "MS";
pub const DEFAULT_STATE_NAME: &str = "Mato Grosso do Sul";

// Default source layout (relative to the data directory)
pub const LIVESTOCK_FILE: &str = "dados_rebanho/br_ibge_ppm_efetivo_rebanhos.csv";
pub const AGRICULTURE_FILE: &str = "dados_agricolas/producao_qtde_produzida.xlsx";
pub const METEOROLOGY_DIR: &str = "dados_meteorologicos";
pub const FOREST_CARBON_FILE: &str = "dados_carbono/BRA.xlsx";
pub const FOREST_CARBON_SHEET: &str = "Subnational 2 carbon data";
pub const DEFAULT_DATA_DIR: &str = "data";

// Table keys
pub const UNIFIED_KEY: &str = "ano";
pub const AGRICULTURE_KEY: &str = "Ano";
pub const LIVESTOCK_KEY: &str = "ano";
pub const METEOROLOGY_KEY: &str = "ano";

// Livestock columns
pub const HERD_TYPE_COLUMN: &str = "tipo_rebanho";
pub const HERD_QUANTITY_COLUMN: &str = "quantidade";
pub const STATE_CODE_COLUMN: &str = "sigla_uf";
pub const MUNICIPALITY_COLUMN: &str = "id_municipio";
pub const LIVESTOCK_FALLBACK_DELIMITER: u8 = b';';
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

// Agricultural sheet layout
pub const PRODUCT_ROW: usize = 0;
pub const STATE_ROW: usize = 1;
pub const PERIOD_COLUMN: usize = 0;

// Meteorological exports
pub const METEOROLOGY_PREAMBLE_LINES: usize = 10;
pub const METEOROLOGY_DELIMITER: u8 = b';';
pub const METEOROLOGY_DATE_COLUMN: &str = "data_medicao";
pub const PRECIPITATION_COLUMN: &str = "precipitacao_total";

// Forest carbon workbook
pub const FOREST_REGION_COLUMN: &str = "subnational1";
pub const FOREST_EMISSION_PREFIX: &str = "gfw_forest_carbon_gross_emissions_";
pub const FOREST_EMISSION_SUFFIX: &str = "__Mg_CO2e";

// Emission scenario output columns
pub const AGRICULTURAL_EMISSION_COLUMN: &str = "emissao_agricola";
pub const HERD_EMISSION_COLUMN: &str = "emissao_rebanho";
pub const TOTAL_EMISSION_COLUMN: &str = "emissao_total";

// Forecasting
pub const FORECAST_HORIZON: usize = 5;
pub const MIN_HISTORY_POINTS: usize = 2;
pub const ARIMA_MIN_HISTORY_POINTS: usize = 3;
pub const RANDOM_FOREST_TREES: usize = 100;
pub const RANDOM_FOREST_MIN_SAMPLES_SPLIT: usize = 2;
pub const NELDER_MEAD_MAX_ITERATIONS: u64 = 500;
pub const NELDER_MEAD_TOLERANCE: f64 = 1e-10;
pub const ARIMA_COEFFICIENT_BOUND: f64 = 0.99;   // keeps phi/theta stationary and invertible
pub const SMOOTHING_INITIAL_WEIGHT: f64 = 0.5;

// Productivity simulation (t/ha and factor ceilings)
pub const IRRIGATION_MAX_GAIN: f64 = 0.2;   // up to 20% at full irrigation
pub const TECHNOLOGY_MAX_GAIN: f64 = 0.3;   // up to 30% at full technology
pub const PRECIPITATION_GAIN_PER_100MM: f64 = 0.1;

/// Allow-listed crop, matched against sheet product names after normalization.
#[derive(Debug, Clone)]
pub struct CropSpec {
    pub label: &'static str,
    pub base_productivity: Option<f64>,
}

/// Canonical name for a meteorological export column.
#[derive(Debug, Clone)]
pub struct MeteoColumn {
    pub normalized: &'static str,
    pub canonical: &'static str,
}

lazy_static! {
    pub static ref TARGET_CROPS: Vec<CropSpec> = vec![
        CropSpec { label: "Soja", base_productivity: Some(3.5) },
        CropSpec { label: "Algodão", base_productivity: Some(4.0) },
        CropSpec { label: "Café", base_productivity: None },
        CropSpec { label: "Laranja", base_productivity: None },
        CropSpec { label: "Cana de açúcar", base_productivity: Some(75.0) },
        CropSpec { label: "Grãos", base_productivity: None },
        CropSpec { label: "Madeira para papel", base_productivity: None },
        CropSpec { label: "Milho", base_productivity: Some(6.0) },
    ];

    pub static ref METEOROLOGY_COLUMNS: Vec<MeteoColumn> = vec![
        MeteoColumn {
            normalized: "numero_de_dias_com_precip_pluv_mensal_aut_numero",
            canonical: "dias_precipitacao",
        },
        MeteoColumn {
            normalized: "precipitacao_total_mensal_aut_mm",
            canonical: PRECIPITATION_COLUMN,
        },
        MeteoColumn {
            normalized: "pressao_atmosferica_media_mensal_aut_mb",
            canonical: "pressao_atmosferica",
        },
        MeteoColumn {
            normalized: "temperatura_media_mensal_aut_c",
            canonical: "temperatura_media",
        },
        MeteoColumn {
            normalized: "vento_velocidade_maxima_mensal_aut_m_s",
            canonical: "vento_velocidade_maxima",
        },
        MeteoColumn {
            normalized: "vento_velocidade_media_mensal_aut_m_s",
            canonical: "vento_velocidade_media",
        },
    ];

    /// Full state names by two-letter code, as written in the forest carbon workbook.
    pub static ref STATE_NAMES: HashMap<&'static str, &'static str> = [
        ("AC", "Acre"), ("AL", "Alagoas"), ("AP", "Amapá"), ("AM", "Amazonas"),
        ("BA", "Bahia"), ("CE", "Ceará"), ("DF", "Distrito Federal"), ("ES", "Espírito Santo"),
        ("GO", "Goiás"), ("MA", "Maranhão"), ("MT", "Mato Grosso"), ("MS", "Mato Grosso do Sul"),
        ("MG", "Minas Gerais"), ("PA", "Pará"), ("PB", "Paraíba"), ("PR", "Paraná"),
        ("PE", "Pernambuco"), ("PI", "Piauí"), ("RJ", "Rio de Janeiro"), ("RN", "Rio Grande do Norte"),
        ("RS", "Rio Grande do Sul"), ("RO", "Rondônia"), ("RR", "Roraima"), ("SC", "Santa Catarina"),
        ("SP", "São Paulo"), ("SE", "Sergipe"), ("TO", "Tocantins"),
    ]
    .into_iter()
    .collect();
}

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use polars::df;

use carbono::config::source_config::SourceConfig;
use carbono::core::emission::{compute_emission, rescale};
use carbono::core::scenario::{Scenario, ScenarioParams, SourceStatus};
use carbono::core::unify::{normalize_column_names, unify};
use carbono::forecast::ModelKind;
use carbono::utils::cache::TableCache;
use carbono::utils::csv_export::{read_series, write_series, CsvExporter};
use carbono::utils::frame::{number_values, text_values};
use carbono::TimeSeries;

const STATION_HEADER: &str = "Data Medicao;NUMERO DE DIAS COM PRECIP. PLUV, MENSAL (AUT)(número);\
PRECIPITACAO TOTAL, MENSAL (AUT)(mm);PRESSAO ATMOSFERICA, MEDIA MENSAL (AUT)(mB);\
TEMPERATURA MEDIA, MENSAL (AUT)(°C);VENTO, VELOCIDADE MAXIMA MENSAL (AUT)(m/s);\
VENTO, VELOCIDADE MEDIA MENSAL (AUT)(m/s);";

fn write_fixtures(root: &Path) -> SourceConfig {
    let mut config = SourceConfig::with_data_dir(root);
    config.agriculture_path = root.join("producao.csv");

    fs::write(
        &config.agriculture_path,
        "Período;Soja;Milho;Soja\n;MS;MS;MT\n2020;100;10;5\n2021;200,5;20;6\n",
    )
    .unwrap();

    fs::create_dir_all(config.livestock_path.parent().unwrap()).unwrap();
    fs::write(
        &config.livestock_path,
        "ano,sigla_uf,id_municipio,tipo_rebanho,quantidade\n\
         2020,MS,5000203,Bovino,1000\n\
         2020,MS,5000252,Bovino,500\n\
         2021,MS,5000203,Bovino,3000\n\
         2020,MT,5100102,Bovino,99999\n\
         2022,MS,5000203,Suíno,10\n",
    )
    .unwrap();

    fs::create_dir_all(&config.meteorology_dir).unwrap();
    let mut station = String::from(
        "Nome: CAMPO GRANDE\nCodigo Estacao: A702\nLatitude: -20,44\nLongitude: -54,72\nAltitude: 530\n\
         Situacao: Operante\nPeriodo Solicitado dos Dados: 2020-01-01 a 2021-12-31\n\
         Os dados listados abaixo sao os que encontram-se digitados no BDMEP\nHora em UTC\n\n",
    );
    station.push_str(STATION_HEADER);
    station.push_str("\n2020-01-31;10;200,0;950;24,0;10;2;\n2021-01-31;8;100,0;951;26,0;11;3;\n");
    fs::write(config.meteorology_dir.join("dados_A702_M.csv"), station).unwrap();

    config
}

#[test]
fn full_pass_over_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path());

    let scenario = Scenario::load(&config, None);
    assert!(scenario.statuses().iter().all(|(_, s)| s.is_loaded()), "{:?}", scenario.statuses());
    assert_eq!(scenario.crops(), vec!["Soja", "Milho"]);
    assert_eq!(scenario.herd_types(), vec!["Bovino", "Suíno"]);

    let params = ScenarioParams {
        crop: Some("Soja".into()),
        herd_type: Some("Bovino".into()),
        crop_quantity: 10.0,
        herd_quantity: 20.0,
        model: ModelKind::Linear,
        seed: None,
    };
    let outcome = scenario.run(&params).unwrap();

    // 2020 and 2021 from every source, 2020 twice from livestock, 2022 livestock only
    assert_eq!(outcome.unified.height(), 4);
    assert!(outcome.unified.get_columns().iter().all(|c| c.null_count() == 0));

    let total = &outcome.emission.total;
    assert_relative_eq!(total.get("2020").unwrap(), 100.0 / 200.5 * 10.0 + 10.0, epsilon = 1e-9);
    assert_relative_eq!(total.get("2021").unwrap(), 30.0, epsilon = 1e-9);
    assert_eq!(outcome.forecast.periods(), vec!["2022", "2023", "2024", "2025", "2026"]);

    let exporter = CsvExporter::new(dir.path().join("results"), false).unwrap();
    let written = exporter.export_scenario(&outcome).unwrap();
    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|p| p.is_file()));
    let forecast = read_series(&exporter.output_dir().join("previsao_linear.csv")).unwrap();
    assert_eq!(forecast.periods(), outcome.forecast.periods());
}

#[test]
fn missing_meteorology_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_fixtures(dir.path());
    config.meteorology_dir = dir.path().join("nowhere");

    let scenario = Scenario::load(&config, None);
    assert!(matches!(scenario.statuses()[2].1, SourceStatus::Missing(_)));
    assert!(scenario.meteorology().is_none());
    assert_eq!(scenario.unified().unwrap().height(), 4);
}

#[test]
fn cached_tables_are_reused() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixtures(dir.path());
    let cache = TableCache::new();

    let first = Scenario::load(&config, Some(&cache));
    assert_eq!(cache.len(), 3);
    let second = Scenario::load(&config, Some(&cache));
    assert_eq!(cache.len(), 3);
    assert_eq!(first.livestock(), second.livestock());

    let mut other_state = config.clone();
    other_state.state_code = "MT".into();
    let _ = Scenario::load(&other_state, Some(&cache));
    // meteorology does not depend on the state
    assert_eq!(cache.len(), 5);
}

#[test]
fn unify_keeps_every_input_row() {
    let agro = df!["Ano" => ["2019", "2020"], "Soja" => [1.0, 2.0]].unwrap();
    let live = df![
        "ano" => ["2020", "2020", "2021"],
        "tipo_rebanho" => ["Bovino", "Suíno", "Bovino"],
        "quantidade" => [5.0, 6.0, 7.0],
    ]
    .unwrap();
    let meteo = df!["ano" => [2020.0], "temperatura_media" => [24.5]].unwrap();

    let unified = unify(Some(&agro), Some(&live), Some(&meteo)).unwrap();
    assert!(unified.height() >= agro.height().max(live.height()).max(meteo.height()));
    assert_eq!(unified.height(), 4);
    assert_eq!(text_values(&unified, "ano").unwrap()[0].as_deref(), Some("2019"));
    assert_eq!(number_values(&unified, "temperatura_media").unwrap()[0], Some(0.0));
    assert_eq!(number_values(&unified, "temperatura_media").unwrap()[1], Some(24.5));

    let once = normalize_column_names(&unified).unwrap();
    assert_eq!(
        normalize_column_names(&once).unwrap().get_column_names(),
        once.get_column_names()
    );
}

#[test]
fn emission_scaling_edges() {
    let history = TimeSeries::from_years([(2020, 100.0), (2021, 200.0)]);
    assert_eq!(rescale(&history, 50.0), TimeSeries::from_years([(2020, 25.0), (2021, 50.0)]));
    assert!(rescale(&history, 0.0).values().iter().all(|v| *v == 0.0));

    let flat = TimeSeries::from_years([(2020, 0.0), (2021, 0.0)]);
    assert!(rescale(&flat, 10.0).values().iter().all(|v| *v == 0.0));

    let scenario = compute_emission(&history, &TimeSeries::new(), 50.0, 10.0).unwrap();
    assert_eq!(scenario.total, TimeSeries::from_years([(2020, 25.0), (2021, 50.0)]));
    assert!(compute_emission(&history, &flat, -1.0, 0.0).is_err());
}

#[test]
fn series_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("previsao.csv");
    let series = TimeSeries::from_years([(2023, 1.0 / 3.0), (2024, 12345.678901), (2025, -0.5)]);

    write_series(&path, &series, "emissao_total").unwrap();
    let back = read_series(&path).unwrap();

    assert_eq!(back.periods(), series.periods());
    for (a, b) in back.values().iter().zip(series.values()) {
        assert_relative_eq!(*a, b, epsilon = 1e-6);
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::normalize::{normalize_column_name, parse_measurement};

/// Weather station metadata read from the preamble of an export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: Option<String>,
    pub code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub file: PathBuf,
}

impl Station {
    /// Reads `Label: value` lines. Unknown labels are ignored.
    pub fn from_preamble<'a, I>(lines: I, file: PathBuf) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut station = Station {
            name: None,
            code: None,
            latitude: None,
            longitude: None,
            altitude: None,
            file,
        };

        for line in lines {
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_end_matches(';').trim();
            match normalize_column_name(label).as_str() {
                "nome" => station.name = Some(value.to_string()).filter(|v| !v.is_empty()),
                "codigo_estacao" => station.code = Some(value.to_string()).filter(|v| !v.is_empty()),
                "latitude" => station.latitude = parse_measurement(value),
                "longitude" => station.longitude = parse_measurement(value),
                "altitude" => station.altitude = parse_measurement(value),
                _ => {}
            }
        }

        station
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| self.file.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inmet_preamble() {
        let preamble = [
            "Nome: CAMPO GRANDE",
            "Codigo Estacao: A702",
            "Latitude: -20.44444444",
            "Longitude: -54.72222221",
            "Altitude: 530,00",
            "Situacao: Operante",
            "Periodo Solicitado dos Dados: 2020-01-01 a 2024-12-31",
        ];
        let station = Station::from_preamble(preamble, PathBuf::from("dados_A702_M.csv"));
        assert_eq!(station.name.as_deref(), Some("CAMPO GRANDE"));
        assert_eq!(station.code.as_deref(), Some("A702"));
        assert_eq!(station.latitude, Some(-20.44444444));
        assert_eq!(station.altitude, Some(530.0));
        assert_eq!(station.display_name(), "CAMPO GRANDE");
    }
}

//! Pipeline configuration loaded from the process environment (and `.env`).

use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::{log_debug, log_warn};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_ROLL_XML_URL: &str =
    "https://donneesouvertes.affmunqc.net/role/Roles_Donnees_Ouvertes_2022.zip";
pub const DEFAULT_HOUSING_CSV_URL: &str =
    "https://f005.backblazeb2.com/file/bit-data-public/hlms.csv";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub mapbox_token: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub google_signing_secret: Option<String>,
    pub roll_xml_url: String,
    /// Point dataset (`id,lng,lat` CSV, optionally zipped). No public default.
    pub roll_points_url: Option<String>,
    pub housing_csv_url: String,
    pub municipality_table: Option<PathBuf>,
}

impl PipelineConfig {
    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| {
            AppError::ValidationError("DATABASE_URL environment variable not found".to_string())
        })?;
        let database_url = Database::validate_database_url(&database_url)?;

        Ok(Self {
            database_url,
            mapbox_token: optional_var("MAPBOX_TOKEN"),
            google_maps_api_key: optional_var("GOOGLE_MAPS_API_KEY"),
            google_signing_secret: optional_var("GOOGLE_SIGNING_SECRET"),
            roll_xml_url: optional_var("ROLL_XML_URL")
                .unwrap_or_else(|| DEFAULT_ROLL_XML_URL.to_string()),
            roll_points_url: optional_var("ROLL_POINTS_URL"),
            housing_csv_url: optional_var("HOUSING_CSV_URL")
                .unwrap_or_else(|| DEFAULT_HOUSING_CSV_URL.to_string()),
            municipality_table: optional_var("MUNICIPALITY_TABLE").map(PathBuf::from),
        })
    }

    pub fn require_mapbox_token(&self) -> AppResult<&str> {
        require(&self.mapbox_token, "MAPBOX_TOKEN")
    }

    pub fn require_google_key(&self) -> AppResult<&str> {
        require(&self.google_maps_api_key, "GOOGLE_MAPS_API_KEY")
    }

    pub fn require_signing_secret(&self) -> AppResult<&str> {
        require(&self.google_signing_secret, "GOOGLE_SIGNING_SECRET")
    }

    /// Municipality code to name table. Empty when no table is configured.
    pub fn load_municipalities(&self) -> AppResult<MunicipalityTable> {
        match &self.municipality_table {
            Some(path) => MunicipalityTable::from_csv(path),
            None => {
                log_warn!("MUNICIPALITY_TABLE not set, municipality codes will be used as names");
                Ok(MunicipalityTable::default())
            }
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn require<'a>(value: &'a Option<String>, name: &str) -> AppResult<&'a str> {
    value.as_deref().ok_or_else(|| {
        AppError::ValidationError(format!("{} is required for this stage but is not set", name))
    })
}

/// Lookup from the roll's municipality code (e.g. `66023`) to its name.
#[derive(Debug, Clone, Default)]
pub struct MunicipalityTable {
    names: HashMap<String, String>,
}

impl MunicipalityTable {
    /// Reads a headered `code,name` CSV. Codes may carry the `RL` prefix.
    pub fn from_csv(path: &Path) -> AppResult<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut names = HashMap::new();

        for record in reader.records() {
            let record = record?;
            let (Some(code), Some(name)) = (record.get(0), record.get(1)) else {
                continue;
            };
            let code = code.trim().trim_start_matches("RL");
            names.insert(code.to_string(), name.trim().to_string());
        }

        log_debug!("Loaded {} municipality names from {}", names.len(), path.display());
        Ok(Self { names })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Unknown codes fall back to the raw code.
    pub fn resolve(&self, code: &str) -> String {
        match self.names.get(code) {
            Some(name) => name.clone(),
            None => {
                log_warn!("Unknown municipality code {}", code);
                code.to_string()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn municipality_table_strips_rl_prefix() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "code,name").unwrap();
        writeln!(file, "RL66023,Montréal").unwrap();
        writeln!(file, "23027,Québec").unwrap();

        let table = MunicipalityTable::from_csv(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("66023"), "Montréal");
        assert_eq!(table.resolve("23027"), "Québec");
    }

    #[test]
    fn unknown_code_passes_through() {
        let table = MunicipalityTable::from_pairs([("66023", "Montréal")]);
        assert_eq!(table.resolve("99999"), "99999");
    }

    #[test]
    fn missing_secret_is_a_validation_error() {
        let config = PipelineConfig {
            database_url: "postgres://user:pw@localhost/roll".into(),
            mapbox_token: None,
            google_maps_api_key: Some("key".into()),
            google_signing_secret: None,
            roll_xml_url: DEFAULT_ROLL_XML_URL.into(),
            roll_points_url: None,
            housing_csv_url: DEFAULT_HOUSING_CSV_URL.into(),
            municipality_table: None,
        };
        assert_eq!(config.require_google_key().unwrap(), "key");
        assert!(matches!(
            config.require_signing_secret(),
            Err(AppError::ValidationError(_))
        ));
    }
}

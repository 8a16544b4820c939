use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::http::HttpPolicy;
use crate::providers::bibliography::{CROSSREF_BASE, EUTILS_BASE};
use crate::pubchem::PUBCHEM_BASE;
use crate::uniprot::UNIPROT_BASE;

pub const CONFIG_FILE: &str = "mutant-ingest.json";
pub const CONFIG_ENV: &str = "MUTANT_INGEST_CONFIG";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub source_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub store_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub added_by: Option<String>,
    #[serde(default)]
    pub pubchem_base: Option<String>,
    #[serde(default)]
    pub crossref_base: Option<String>,
    #[serde(default)]
    pub eutils_base: Option<String>,
    #[serde(default)]
    pub uniprot_base: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    /// JSON protein index; the UniProt lookup is used when unset.
    #[serde(default)]
    pub protein_index: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub pubchem: String,
    pub crossref: String,
    pub eutils: String,
    pub uniprot: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub source_dir: Utf8PathBuf,
    pub store_dir: Utf8PathBuf,
    pub added_by: String,
    pub endpoints: Endpoints,
    pub http: HttpPolicy,
    pub protein_index: Option<Utf8PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the explicit path if one is given (it must exist), otherwise the
    /// first of `$MUTANT_INGEST_CONFIG`, `./mutant-ingest.json` and the user
    /// config directory that exists. With none of them, defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, IngestError> {
        let explicit = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|v| !v.is_empty()));
        let config_path = match explicit {
            Some(path) => Some(Utf8PathBuf::from(path)),
            None => Self::discover(),
        };

        let config = match config_path {
            Some(path) => Self::read(&path)?,
            None => Config::default(),
        };
        Self::resolve_config(config)
    }

    fn discover() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(CONFIG_FILE);
        if local.as_std_path().exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "mutant-ingest")
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.config_dir().join(CONFIG_FILE)).ok())
            .filter(|path| path.as_std_path().exists())
    }

    pub fn read(path: &Utf8Path) -> Result<Config, IngestError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| IngestError::ConfigRead(path.as_std_path().to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| IngestError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, IngestError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(IngestError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let defaults = HttpPolicy::default();
        let http = HttpPolicy {
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: config.max_retries.unwrap_or(defaults.max_retries),
            base_delay: defaults.base_delay,
        };

        Ok(ResolvedConfig {
            schema_version,
            source_dir: config
                .source_dir
                .unwrap_or_else(|| Utf8PathBuf::from("data/mutant_data")),
            store_dir: config
                .store_dir
                .unwrap_or_else(|| Utf8PathBuf::from(".mutant-ingest")),
            added_by: config
                .added_by
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "mutant-ingest".to_string()),
            endpoints: Endpoints {
                pubchem: config.pubchem_base.unwrap_or_else(|| PUBCHEM_BASE.to_string()),
                crossref: config
                    .crossref_base
                    .unwrap_or_else(|| CROSSREF_BASE.to_string()),
                eutils: config.eutils_base.unwrap_or_else(|| EUTILS_BASE.to_string()),
                uniprot: config.uniprot_base.unwrap_or_else(|| UNIPROT_BASE.to_string()),
            },
            http,
            protein_index: config.protein_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_field() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.source_dir, Utf8PathBuf::from("data/mutant_data"));
        assert_eq!(resolved.endpoints.pubchem, PUBCHEM_BASE);
        assert_eq!(resolved.http, HttpPolicy::default());
        assert!(resolved.protein_index.is_none());
    }

    #[test]
    fn overrides_reach_http_policy() {
        let config = Config {
            timeout_secs: Some(5),
            max_retries: Some(0),
            added_by: Some("  ".to_string()),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.http.timeout, Duration::from_secs(5));
        assert_eq!(resolved.http.max_retries, 0);
        assert_eq!(resolved.added_by, "mutant-ingest");
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let config = Config {
            schema_version: Some(2),
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::resolve_config(config),
            Err(IngestError::ConfigParse(_))
        ));
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::IngestError;
use crate::http::{self, HttpPolicy};
use crate::proteins::{ProteinLookup, ProteinRecord};

pub const UNIPROT_BASE: &str = "https://rest.uniprot.org/uniprotkb";

/// Resolves protein entry names (`adrb2_human`) through the UniProt search
/// API. Answers are memoized for the lifetime of the client, misses included.
pub struct UniprotProteinLookup {
    client: Client,
    base_url: String,
    policy: HttpPolicy,
    cache: Mutex<HashMap<String, Option<ProteinRecord>>>,
}

impl UniprotProteinLookup {
    pub fn new(base_url: &str, policy: HttpPolicy) -> Result<Self, IngestError> {
        let client = http::build_client(&policy, IngestError::UniprotHttp)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn search(&self, entry_name: &str) -> Result<Option<ProteinRecord>, IngestError> {
        let url = format!("{}/search", self.base_url);
        let query = format!("id:{}", entry_name.to_uppercase());
        let response = http::send_with_retries(
            &self.policy,
            || {
                self.client.get(&url).query(&[
                    ("query", query.as_str()),
                    ("fields", "accession,id,sequence"),
                    ("format", "json"),
                    ("size", "1"),
                ])
            },
            IngestError::UniprotHttp,
        )?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "UniProt request failed".to_string());
            return Err(IngestError::UniprotStatus { status, message });
        }
        let raw: Value = response
            .json()
            .map_err(|err| IngestError::UniprotHttp(err.to_string()))?;
        Ok(parse_search(&raw, entry_name))
    }
}

/// Picks the result whose UniProtKB id equals `entry_name`; the search is
/// fuzzy and may return neighbours.
pub fn parse_search(raw: &Value, entry_name: &str) -> Option<ProteinRecord> {
    raw.get("results")
        .and_then(|v| v.as_array())?
        .iter()
        .find(|entry| {
            entry
                .get("uniProtkbId")
                .and_then(|v| v.as_str())
                .is_some_and(|id| id.eq_ignore_ascii_case(entry_name))
        })
        .and_then(|entry| {
            let sequence = entry
                .get("sequence")
                .and_then(|v| v.get("value"))
                .and_then(|v| v.as_str())?;
            Some(ProteinRecord {
                entry_name: entry_name.to_lowercase(),
                accession: entry
                    .get("primaryAccession")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string()),
                sequence: sequence.to_string(),
            })
        })
}

impl ProteinLookup for UniprotProteinLookup {
    fn find_protein(&self, entry_name: &str) -> Result<Option<ProteinRecord>, IngestError> {
        let key = entry_name.to_lowercase();
        if let Some(hit) = self
            .cache
            .lock()
            .map_err(|_| IngestError::UniprotHttp("lookup cache poisoned".to_string()))?
            .get(&key)
        {
            return Ok(hit.clone());
        }
        let found = self.search(&key)?;
        debug!(entry_name = %key, found = found.is_some(), "uniprot lookup");
        self.cache
            .lock()
            .map_err(|_| IngestError::UniprotHttp("lookup cache poisoned".to_string()))?
            .insert(key, found.clone());
        Ok(found)
    }
}

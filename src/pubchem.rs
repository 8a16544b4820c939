use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use crate::domain::PubchemCid;
use crate::error::IngestError;
use crate::http::{self, HttpPolicy};

pub const PUBCHEM_BASE: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";
const PROPERTIES: &str = "CanonicalSMILES,InChIKey";

/// Canonical identity of a compound as reported by the resolution service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChemicalIdentity {
    pub cid: Option<PubchemCid>,
    pub canonical_smiles: String,
    pub inchikey: String,
}

pub trait ChemicalIdentityClient: Send + Sync {
    fn by_cid(&self, cid: PubchemCid) -> Result<ChemicalIdentity, IngestError>;
    fn by_smiles(&self, smiles: &str) -> Result<ChemicalIdentity, IngestError>;
    fn by_name(&self, name: &str) -> Result<ChemicalIdentity, IngestError>;
}

#[derive(Debug, Deserialize)]
struct PropertyResponse {
    #[serde(rename = "PropertyTable")]
    table: PropertyTable,
}

#[derive(Debug, Deserialize)]
struct PropertyTable {
    #[serde(rename = "Properties", default)]
    properties: Vec<PropertyRecord>,
}

#[derive(Debug, Deserialize)]
struct PropertyRecord {
    #[serde(rename = "CID")]
    cid: Option<u64>,
    #[serde(rename = "CanonicalSMILES")]
    canonical_smiles: Option<String>,
    #[serde(rename = "ConnectivitySMILES")]
    connectivity_smiles: Option<String>,
    #[serde(rename = "SMILES")]
    smiles: Option<String>,
    #[serde(rename = "InChIKey")]
    inchikey: Option<String>,
}

/// Reads the first record of a PUG REST property table. Both SMILES and
/// InChIKey must be present, otherwise the lookup counts as failed.
pub fn parse_property_table(body: &str) -> Result<ChemicalIdentity, IngestError> {
    let response: PropertyResponse = serde_json::from_str(body)
        .map_err(|err| IngestError::PubchemPayload(format!("property table ({err})")))?;
    let record = response
        .table
        .properties
        .into_iter()
        .next()
        .ok_or_else(|| IngestError::PubchemPayload("property records".to_string()))?;

    let canonical_smiles = record
        .canonical_smiles
        .or(record.connectivity_smiles)
        .or(record.smiles)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| IngestError::PubchemPayload("CanonicalSMILES".to_string()))?;
    let inchikey = record
        .inchikey
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| IngestError::PubchemPayload("InChIKey".to_string()))?;

    Ok(ChemicalIdentity {
        cid: record.cid.filter(|cid| *cid > 0).map(PubchemCid::new),
        canonical_smiles,
        inchikey,
    })
}

#[derive(Clone)]
pub struct PubchemHttpClient {
    client: Client,
    base_url: String,
    policy: HttpPolicy,
}

impl PubchemHttpClient {
    pub fn new(base_url: &str, policy: HttpPolicy) -> Result<Self, IngestError> {
        let client = http::build_client(&policy, IngestError::PubchemHttp)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        })
    }

    pub fn cid_url(&self, cid: PubchemCid) -> String {
        format!(
            "{}/compound/cid/{}/property/{}/JSON",
            self.base_url, cid, PROPERTIES
        )
    }

    fn read_identity(response: Response) -> Result<ChemicalIdentity, IngestError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "PubChem request failed".to_string());
            return Err(IngestError::PubchemStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| IngestError::PubchemHttp(err.to_string()))?;
        parse_property_table(&body)
    }
}

impl ChemicalIdentityClient for PubchemHttpClient {
    fn by_cid(&self, cid: PubchemCid) -> Result<ChemicalIdentity, IngestError> {
        let url = self.cid_url(cid);
        let response =
            http::send_with_retries(&self.policy, || self.client.get(&url), IngestError::PubchemHttp)?;
        let mut identity = Self::read_identity(response)?;
        identity.cid.get_or_insert(cid);
        Ok(identity)
    }

    fn by_smiles(&self, smiles: &str) -> Result<ChemicalIdentity, IngestError> {
        // SMILES carry '/', '#' and '=' which do not survive a URL path.
        let url = format!(
            "{}/compound/smiles/property/{}/JSON",
            self.base_url, PROPERTIES
        );
        let response = http::send_with_retries(
            &self.policy,
            || self.client.post(&url).form(&[("smiles", smiles)]),
            IngestError::PubchemHttp,
        )?;
        Self::read_identity(response)
    }

    fn by_name(&self, name: &str) -> Result<ChemicalIdentity, IngestError> {
        let url = format!(
            "{}/compound/name/{}/property/{}/JSON",
            self.base_url,
            http::encode_url_component(name),
            PROPERTIES
        );
        let response =
            http::send_with_retries(&self.policy, || self.client.get(&url), IngestError::PubchemHttp)?;
        Self::read_identity(response)
    }
}

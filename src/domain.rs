use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

fn doi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("static DOI pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Doi(String);

impl Doi {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Doi {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let stripped = [
            "https://doi.org/",
            "http://doi.org/",
            "https://dx.doi.org/",
            "http://dx.doi.org/",
            "doi:",
        ]
        .iter()
        .find(|prefix| lowered.starts_with(*prefix))
        .map(|prefix| trimmed[prefix.len()..].trim())
        .unwrap_or(trimmed);
        if !doi_regex().is_match(stripped) {
            return Err(IngestError::InvalidDoi(value.to_string()));
        }
        Ok(Self(stripped.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pmid(u64);

impl Pmid {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Pmid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bibliographic reference column, a DOI or a bare PubMed id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationRef {
    Doi(Doi),
    Pubmed(Pmid),
}

impl PublicationRef {
    pub fn resource(&self) -> WebResource {
        match self {
            PublicationRef::Doi(_) => WebResource::Doi,
            PublicationRef::Pubmed(_) => WebResource::Pubmed,
        }
    }

    pub fn index(&self) -> String {
        match self {
            PublicationRef::Doi(doi) => doi.to_string(),
            PublicationRef::Pubmed(pmid) => pmid.to_string(),
        }
    }
}

impl FromStr for PublicationRef {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            let id = trimmed
                .parse::<u64>()
                .map_err(|_| IngestError::InvalidReference(value.to_string()))?;
            return Ok(PublicationRef::Pubmed(Pmid(id)));
        }
        match trimmed.parse::<Doi>() {
            Ok(doi) => Ok(PublicationRef::Doi(doi)),
            Err(_) => Err(IngestError::InvalidReference(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebResource {
    Doi,
    Pubmed,
    Pubchem,
}

impl fmt::Display for WebResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebResource::Doi => write!(f, "doi"),
            WebResource::Pubmed => write!(f, "pubmed"),
            WebResource::Pubchem => write!(f, "pubchem"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PubchemCid(u64);

impl PubchemCid {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PubchemCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PubchemCid {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let trimmed = trimmed
            .strip_prefix("CID")
            .or_else(|| trimmed.strip_prefix("cid"))
            .map(str::trim)
            .unwrap_or(trimmed);
        trimmed
            .parse::<u64>()
            .ok()
            .filter(|cid| *cid > 0)
            .map(Self)
            .ok_or_else(|| IngestError::InvalidCid(value.to_string()))
    }
}

/// Hint from the ligand-type column telling which identifier space the
/// ligand id lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierType {
    PubchemCid,
    Smiles,
    Other,
}

impl IdentifierType {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "PubChem CID" => IdentifierType::PubchemCid,
            "SMILES" => IdentifierType::Smiles,
            _ => IdentifierType::Other,
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierType::PubchemCid => write!(f, "PubChem CID"),
            IdentifierType::Smiles => write!(f, "SMILES"),
            IdentifierType::Other => write!(f, "other"),
        }
    }
}

/// Sheets write entry names like `ADRB2__HUMAN`; the catalog keys on
/// `adrb2_human`.
pub fn normalize_protein_key(raw: &str) -> String {
    raw.trim().replace("__", "_").to_lowercase()
}

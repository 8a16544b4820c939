use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Doi, Pmid, PublicationRef};
use crate::error::IngestError;
use crate::http::{self, HttpPolicy};
use crate::model::PublicationMetadata;

pub const CROSSREF_BASE: &str = "https://api.crossref.org";
pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub trait PublicationMetadataClient: Send + Sync {
    fn fetch(&self, reference: &PublicationRef) -> Result<PublicationMetadata, IngestError>;
}

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossrefMessage {
    title: Option<Vec<String>>,
    author: Option<Vec<CrossrefAuthor>>,
    #[serde(rename = "container-title")]
    container_title: Option<Vec<String>>,
    issued: Option<CrossrefDate>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<Option<i32>>>>,
}

pub fn parse_crossref(body: &str) -> Result<PublicationMetadata, IngestError> {
    let payload: CrossrefResponse =
        serde_json::from_str(body).map_err(|err| IngestError::CrossrefHttp(err.to_string()))?;
    let message = payload.message;

    let authors = message.author.map(|authors| {
        authors
            .into_iter()
            .filter_map(|author| match (author.family, author.given, author.name) {
                (Some(family), Some(given), _) => Some(format!("{family} {}", initials(&given))),
                (Some(family), None, _) => Some(family),
                (None, _, Some(name)) => Some(name),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", ")
    });

    Ok(PublicationMetadata {
        title: message.title.and_then(|titles| titles.into_iter().next()),
        authors: authors.filter(|value| !value.is_empty()),
        journal: message
            .container_title
            .and_then(|titles| titles.into_iter().next()),
        year: message
            .issued
            .and_then(|issued| issued.date_parts)
            .and_then(|parts| parts.into_iter().next())
            .and_then(|first| first.into_iter().next())
            .flatten(),
    })
}

pub fn parse_esummary(body: &str, pmid: Pmid) -> Result<PublicationMetadata, IngestError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|err| IngestError::PubmedHttp(err.to_string()))?;
    let record = &payload["result"][pmid.to_string()];
    if !record.is_object() || record.get("error").is_some() {
        return Err(IngestError::PubmedStatus {
            status: 404,
            message: format!("no summary for PMID {pmid}"),
        });
    }

    let authors = record["authors"].as_array().map(|list| {
        list.iter()
            .filter_map(|author| author["name"].as_str())
            .collect::<Vec<_>>()
            .join(", ")
    });
    let journal = record["fulljournalname"]
        .as_str()
        .or_else(|| record["source"].as_str())
        .map(|value| value.to_string());
    let year = record["pubdate"]
        .as_str()
        .and_then(|date| date.split_whitespace().next())
        .and_then(|year| year.parse::<i32>().ok());

    Ok(PublicationMetadata {
        title: record["title"].as_str().map(|value| value.to_string()),
        authors: authors.filter(|value| !value.is_empty()),
        journal,
        year,
    })
}

fn initials(given: &str) -> String {
    given
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '.')
        .filter_map(|part| part.chars().next())
        .collect()
}

/// Crossref for DOIs, NCBI esummary for PubMed ids.
#[derive(Clone)]
pub struct BibliographyHttpClient {
    client: Client,
    crossref_base: String,
    eutils_base: String,
    policy: HttpPolicy,
}

impl BibliographyHttpClient {
    pub fn new(
        crossref_base: &str,
        eutils_base: &str,
        policy: HttpPolicy,
    ) -> Result<Self, IngestError> {
        let client = http::build_client(&policy, IngestError::CrossrefHttp)?;
        Ok(Self {
            client,
            crossref_base: crossref_base.trim_end_matches('/').to_string(),
            eutils_base: eutils_base.trim_end_matches('/').to_string(),
            policy,
        })
    }

    fn fetch_crossref(&self, doi: &Doi) -> Result<PublicationMetadata, IngestError> {
        let url = format!(
            "{}/works/{}",
            self.crossref_base,
            http::encode_url_component(doi.as_str())
        );
        let response =
            http::send_with_retries(&self.policy, || self.client.get(&url), IngestError::CrossrefHttp)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "Crossref request failed".to_string());
            return Err(IngestError::CrossrefStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| IngestError::CrossrefHttp(err.to_string()))?;
        parse_crossref(&body)
    }

    fn fetch_pubmed(&self, pmid: Pmid) -> Result<PublicationMetadata, IngestError> {
        let url = format!("{}/esummary.fcgi", self.eutils_base);
        let id = pmid.to_string();
        let response = http::send_with_retries(
            &self.policy,
            || {
                self.client
                    .get(&url)
                    .query(&[("db", "pubmed"), ("id", id.as_str()), ("retmode", "json")])
            },
            IngestError::PubmedHttp,
        )?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "PubMed request failed".to_string());
            return Err(IngestError::PubmedStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| IngestError::PubmedHttp(err.to_string()))?;
        parse_esummary(&body, pmid)
    }
}

impl PublicationMetadataClient for BibliographyHttpClient {
    fn fetch(&self, reference: &PublicationRef) -> Result<PublicationMetadata, IngestError> {
        match reference {
            PublicationRef::Doi(doi) => self.fetch_crossref(doi),
            PublicationRef::Pubmed(pmid) => self.fetch_pubmed(*pmid),
        }
    }
}

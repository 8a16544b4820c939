use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid PubChem CID: {0}")]
    InvalidCid(String),

    #[error("invalid publication reference: {0}")]
    InvalidReference(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("source file not found: {0}")]
    SourceNotFound(String),

    #[error("failed to read source file {path}: {message}")]
    SourceRead { path: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("catalog file is corrupt: {0}")]
    CatalogParse(String),

    #[error("catalog inconsistency: {0}")]
    CatalogIntegrity(String),

    #[error("PubChem request failed: {0}")]
    PubchemHttp(String),

    #[error("PubChem returned status {status}: {message}")]
    PubchemStatus { status: u16, message: String },

    #[error("PubChem response is missing {0}")]
    PubchemPayload(String),

    #[error("Crossref request failed: {0}")]
    CrossrefHttp(String),

    #[error("Crossref returned status {status}: {message}")]
    CrossrefStatus { status: u16, message: String },

    #[error("PubMed request failed: {0}")]
    PubmedHttp(String),

    #[error("PubMed returned status {status}: {message}")]
    PubmedStatus { status: u16, message: String },

    #[error("uniprot request failed: {0}")]
    UniprotHttp(String),

    #[error("uniprot returned status {status}: {message}")]
    UniprotStatus { status: u16, message: String },

    #[error("ligand resolution failed for {name}: {source}")]
    LigandResolution {
        name: String,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// True for failures raised by a remote service rather than local state.
    pub fn is_remote(&self) -> bool {
        match self {
            IngestError::PubchemHttp(_)
            | IngestError::PubchemStatus { .. }
            | IngestError::PubchemPayload(_)
            | IngestError::CrossrefHttp(_)
            | IngestError::CrossrefStatus { .. }
            | IngestError::PubmedHttp(_)
            | IngestError::PubmedStatus { .. }
            | IngestError::UniprotHttp(_)
            | IngestError::UniprotStatus { .. } => true,
            IngestError::LigandResolution { source, .. } => source.is_remote(),
            _ => false,
        }
    }
}

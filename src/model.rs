//! Catalog entities. Every entity lives in an arena keyed by its id; links
//! between entities are ids, never copies.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::WebResource;
use crate::rows::MutationRow;

macro_rules! entity_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<u64> for $name {
                fn from(value: u64) -> Self {
                    Self(value)
                }
            }
        )*
    };
}

entity_id!(
    WebLinkId,
    PublicationId,
    PropertiesId,
    LigandId,
    LigandRoleId,
    RawRecordId,
    MutationId,
    ExperimentalTypeId,
    FuncId,
    MeasureId,
    QualId,
    OptionalId,
    ExperimentId,
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebLink {
    pub resource: WebResource,
    pub index: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub web_link: WebLinkId,
    #[serde(flatten)]
    pub metadata: PublicationMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LigandProperties {
    pub smiles: Option<String>,
    pub inchikey: Option<String>,
    #[serde(default)]
    pub web_links: BTreeSet<WebLinkId>,
}

impl LigandProperties {
    pub fn is_empty(&self) -> bool {
        self.smiles.is_none() && self.inchikey.is_none() && self.web_links.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ligand {
    pub name: String,
    pub canonical: bool,
    pub ambiguous_alias: bool,
    pub properties: PropertiesId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LigandRole {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(flatten)]
    pub row: MutationRow,
    pub added_by: String,
    pub added_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mutation {
    pub protein: String,
    pub residue: i64,
    pub amino_acid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentalType {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Func {
    pub func: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub measure: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qual {
    pub qual: String,
    pub prop: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    pub wt: i64,
    pub mu: i64,
    pub sign: String,
    pub percentage: i64,
    pub qual: String,
    pub agonist: String,
}

/// Natural key of a mutation experiment. The fold change is derived from the
/// raw values and stays out of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentKey {
    pub publication: PublicationId,
    pub protein: String,
    pub residue: i64,
    pub ligand: LigandId,
    pub ligand_role: LigandRoleId,
    pub ligand_ref: LigandId,
    pub raw: RawRecordId,
    pub optional: OptionalId,
    pub exp_type: ExperimentalTypeId,
    pub exp_func: FuncId,
    pub exp_measure: MeasureId,
    pub exp_qual: QualId,
    pub mutation: MutationId,
    pub wt_value: i64,
    pub wt_unit: String,
    pub mu_value: i64,
    pub mu_sign: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationExperiment {
    #[serde(flatten)]
    pub key: ExperimentKey,
    pub foldchange: f64,
}

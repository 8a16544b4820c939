use std::collections::HashMap;
use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::domain::normalize_protein_key;
use crate::error::IngestError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProteinRecord {
    pub entry_name: String,
    #[serde(default)]
    pub accession: Option<String>,
    pub sequence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResidueRef {
    pub protein: String,
    pub sequence_number: i64,
    pub amino_acid: char,
}

impl ProteinRecord {
    /// Residues are numbered from 1 along the canonical sequence.
    pub fn residue(&self, position: i64) -> Option<ResidueRef> {
        if position < 1 {
            return None;
        }
        let amino_acid = self.sequence.chars().nth((position - 1) as usize)?;
        Some(ResidueRef {
            protein: self.entry_name.clone(),
            sequence_number: position,
            amino_acid,
        })
    }
}

pub trait ProteinLookup: Send + Sync {
    fn find_protein(&self, entry_name: &str) -> Result<Option<ProteinRecord>, IngestError>;

    fn find_residue(
        &self,
        protein: &ProteinRecord,
        position: i64,
    ) -> Result<Option<ResidueRef>, IngestError> {
        Ok(protein.residue(position))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProteinIndexFile {
    #[serde(default)]
    proteins: Vec<ProteinRecord>,
}

/// Proteins known ahead of time, loaded from a JSON index.
#[derive(Debug, Clone, Default)]
pub struct ProteinIndex {
    proteins: HashMap<String, ProteinRecord>,
}

impl ProteinIndex {
    pub fn new(records: impl IntoIterator<Item = ProteinRecord>) -> Self {
        let proteins = records
            .into_iter()
            .map(|mut record| {
                record.entry_name = normalize_protein_key(&record.entry_name);
                (record.entry_name.clone(), record)
            })
            .collect();
        Self { proteins }
    }

    pub fn load(path: &Utf8Path) -> Result<Self, IngestError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| IngestError::ConfigRead(path.as_std_path().to_path_buf()))?;
        let file: ProteinIndexFile = serde_json::from_str(&content)
            .map_err(|err| IngestError::ConfigParse(format!("{path}: {err}")))?;
        Ok(Self::new(file.proteins))
    }

    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }
}

impl ProteinLookup for ProteinIndex {
    fn find_protein(&self, entry_name: &str) -> Result<Option<ProteinRecord>, IngestError> {
        Ok(self
            .proteins
            .get(&normalize_protein_key(entry_name))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adrb2() -> ProteinRecord {
        ProteinRecord {
            entry_name: "ADRB2_HUMAN".to_string(),
            accession: Some("P07550".to_string()),
            sequence: "MGQPGNGSAF".to_string(),
        }
    }

    #[test]
    fn residue_bounds() {
        let protein = adrb2();
        assert_eq!(protein.residue(1).unwrap().amino_acid, 'M');
        assert_eq!(protein.residue(10).unwrap().amino_acid, 'F');
        assert!(protein.residue(0).is_none());
        assert!(protein.residue(11).is_none());
        assert!(protein.residue(-4).is_none());
    }

    #[test]
    fn index_matches_normalized_keys() {
        let index = ProteinIndex::new([adrb2()]);
        assert_eq!(index.len(), 1);
        let found = index.find_protein("adrb2__human").unwrap().unwrap();
        assert_eq!(found.entry_name, "adrb2_human");
        assert!(index.find_protein("oprm_mouse").unwrap().is_none());
    }

    #[test]
    fn load_index_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proteins.json");
        std::fs::write(
            &path,
            r#"{"proteins":[{"entry_name":"oprm_mouse","sequence":"MDSSAGPGNISDC"}]}"#,
        )
        .unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(path).unwrap();
        let index = ProteinIndex::load(&path).unwrap();
        let protein = index.find_protein("OPRM_MOUSE").unwrap().unwrap();
        assert_eq!(index.find_residue(&protein, 2).unwrap().unwrap().amino_acid, 'D');
    }
}

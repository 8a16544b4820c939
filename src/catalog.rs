use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::WebResource;
use crate::error::IngestError;
use crate::model::{
    ExperimentId, ExperimentKey, ExperimentalType, ExperimentalTypeId, Func, FuncId, Ligand,
    LigandId, LigandProperties, LigandRole, LigandRoleId, Measure, MeasureId, Mutation,
    MutationExperiment, MutationId, OptionalId, OptionalMetadata, PropertiesId, Publication,
    PublicationId, PublicationMetadata, Qual, QualId, RawRecord, RawRecordId, WebLink, WebLinkId,
};
use crate::rows::MutationRow;

/// Entity counts, reported after every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub raw_records: usize,
    pub publications: usize,
    pub ligands: usize,
    pub ligand_properties: usize,
    pub mutations: usize,
    pub experiments: usize,
}

/// Whether a get-or-create found an existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert<T> {
    Found(T),
    Created(T),
}

impl<T: Copy> Upsert<T> {
    pub fn id(&self) -> T {
        match self {
            Upsert::Found(id) | Upsert::Created(id) => *id,
        }
    }

    pub fn created(&self) -> bool {
        matches!(self, Upsert::Created(_))
    }
}

/// In-memory entity arenas backing every lookup the ingestion performs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "first_id")]
    next_id: u64,
    #[serde(default)]
    web_links: BTreeMap<WebLinkId, WebLink>,
    #[serde(default)]
    publications: BTreeMap<PublicationId, Publication>,
    #[serde(default)]
    properties: BTreeMap<PropertiesId, LigandProperties>,
    #[serde(default)]
    ligands: BTreeMap<LigandId, Ligand>,
    #[serde(default)]
    ligand_roles: BTreeMap<LigandRoleId, LigandRole>,
    #[serde(default)]
    raw_records: BTreeMap<RawRecordId, RawRecord>,
    #[serde(default)]
    mutations: BTreeMap<MutationId, Mutation>,
    #[serde(default)]
    experimental_types: BTreeMap<ExperimentalTypeId, ExperimentalType>,
    #[serde(default)]
    funcs: BTreeMap<FuncId, Func>,
    #[serde(default)]
    measures: BTreeMap<MeasureId, Measure>,
    #[serde(default)]
    quals: BTreeMap<QualId, Qual>,
    #[serde(default)]
    optionals: BTreeMap<OptionalId, OptionalMetadata>,
    #[serde(default)]
    experiments: BTreeMap<ExperimentId, MutationExperiment>,

    #[serde(skip)]
    raw_index: HashMap<MutationRow, RawRecordId>,
    #[serde(skip)]
    experiment_index: HashMap<ExperimentKey, ExperimentId>,
}

fn first_id() -> u64 {
    1
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            next_id: first_id(),
            ..Self::default()
        }
    }

    /// Rebuilds lookup indexes and checks that every link points at a live
    /// entity. Called after deserialization.
    pub fn reindex(&mut self) -> Result<(), IngestError> {
        self.raw_index = self
            .raw_records
            .iter()
            .map(|(id, raw)| (raw.row.clone(), *id))
            .collect();
        self.experiment_index = self
            .experiments
            .iter()
            .map(|(id, exp)| (exp.key.clone(), *id))
            .collect();

        for (id, ligand) in &self.ligands {
            if !self.properties.contains_key(&ligand.properties) {
                return Err(IngestError::CatalogIntegrity(format!(
                    "ligand {id} references missing properties {}",
                    ligand.properties
                )));
            }
        }
        for (id, publication) in &self.publications {
            if !self.web_links.contains_key(&publication.web_link) {
                return Err(IngestError::CatalogIntegrity(format!(
                    "publication {id} references missing web link {}",
                    publication.web_link
                )));
            }
        }

        let max_id = [
            self.web_links.keys().last().map(|id| id.0),
            self.publications.keys().last().map(|id| id.0),
            self.properties.keys().last().map(|id| id.0),
            self.ligands.keys().last().map(|id| id.0),
            self.ligand_roles.keys().last().map(|id| id.0),
            self.raw_records.keys().last().map(|id| id.0),
            self.mutations.keys().last().map(|id| id.0),
            self.experimental_types.keys().last().map(|id| id.0),
            self.funcs.keys().last().map(|id| id.0),
            self.measures.keys().last().map(|id| id.0),
            self.quals.keys().last().map(|id| id.0),
            self.optionals.keys().last().map(|id| id.0),
            self.experiments.keys().last().map(|id| id.0),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
        Ok(())
    }

    fn allocate<T: From<u64>>(&mut self) -> T {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        T::from(id)
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            raw_records: self.raw_records.len(),
            publications: self.publications.len(),
            ligands: self.ligands.len(),
            ligand_properties: self.properties.len(),
            mutations: self.mutations.len(),
            experiments: self.experiments.len(),
        }
    }

    // Web links

    pub fn find_web_link(&self, resource: WebResource, index: &str) -> Option<WebLinkId> {
        self.web_links
            .iter()
            .find(|(_, link)| link.resource == resource && link.index == index)
            .map(|(id, _)| *id)
    }

    pub fn get_or_create_web_link(&mut self, resource: WebResource, index: &str) -> WebLinkId {
        if let Some(id) = self.find_web_link(resource, index) {
            return id;
        }
        let id = self.allocate();
        self.web_links.insert(
            id,
            WebLink {
                resource,
                index: index.to_string(),
            },
        );
        id
    }

    pub fn web_link(&self, id: WebLinkId) -> Option<&WebLink> {
        self.web_links.get(&id)
    }

    // Publications

    pub fn find_publication(&self, resource: WebResource, index: &str) -> Option<PublicationId> {
        let link = self.find_web_link(resource, index)?;
        self.publications
            .iter()
            .find(|(_, publication)| publication.web_link == link)
            .map(|(id, _)| *id)
    }

    pub fn insert_publication(
        &mut self,
        resource: WebResource,
        index: &str,
        metadata: PublicationMetadata,
    ) -> PublicationId {
        let web_link = self.get_or_create_web_link(resource, index);
        let id = self.allocate();
        self.publications
            .insert(id, Publication { web_link, metadata });
        id
    }

    pub fn publication(&self, id: PublicationId) -> Option<&Publication> {
        self.publications.get(&id)
    }

    pub fn publication_count(&self) -> usize {
        self.publications.len()
    }

    // Raw records

    /// Stores the row once; later calls with an identical row return the
    /// original record and leave its audit fields untouched.
    pub fn insert_raw(
        &mut self,
        row: &MutationRow,
        added_by: &str,
        added_date: DateTime<Utc>,
    ) -> Upsert<RawRecordId> {
        if let Some(id) = self.raw_index.get(row) {
            return Upsert::Found(*id);
        }
        let id = self.allocate();
        self.raw_records.insert(
            id,
            RawRecord {
                row: row.clone(),
                added_by: added_by.to_string(),
                added_date,
            },
        );
        self.raw_index.insert(row.clone(), id);
        Upsert::Created(id)
    }

    pub fn raw_record(&self, id: RawRecordId) -> Option<&RawRecord> {
        self.raw_records.get(&id)
    }

    // Ligands

    pub fn ligand(&self, id: LigandId) -> Option<&Ligand> {
        self.ligands.get(&id)
    }

    pub fn properties(&self, id: PropertiesId) -> Option<&LigandProperties> {
        self.properties.get(&id)
    }

    pub fn ligand_properties(&self, id: LigandId) -> Option<&LigandProperties> {
        self.ligands
            .get(&id)
            .and_then(|ligand| self.properties.get(&ligand.properties))
    }

    pub fn ligands(&self) -> impl Iterator<Item = (LigandId, &Ligand)> {
        self.ligands.iter().map(|(id, ligand)| (*id, ligand))
    }

    /// First ligand, in creation order, accepted by `predicate`.
    pub fn find_ligand<F>(&self, mut predicate: F) -> Option<LigandId>
    where
        F: FnMut(&Ligand, &LigandProperties) -> bool,
    {
        self.ligands
            .iter()
            .find(|(_, ligand)| {
                self.properties
                    .get(&ligand.properties)
                    .is_some_and(|props| predicate(*ligand, props))
            })
            .map(|(id, _)| *id)
    }

    pub fn insert_properties(&mut self, properties: LigandProperties) -> PropertiesId {
        let id = self.allocate();
        self.properties.insert(id, properties);
        id
    }

    pub fn insert_ligand(
        &mut self,
        name: &str,
        canonical: bool,
        ambiguous_alias: bool,
        properties: PropertiesId,
    ) -> Result<LigandId, IngestError> {
        if !self.properties.contains_key(&properties) {
            return Err(IngestError::CatalogIntegrity(format!(
                "cannot attach ligand {name} to missing properties {properties}"
            )));
        }
        let id = self.allocate();
        self.ligands.insert(
            id,
            Ligand {
                name: name.to_string(),
                canonical,
                ambiguous_alias,
                properties,
            },
        );
        Ok(id)
    }

    pub fn add_properties_link(
        &mut self,
        properties: PropertiesId,
        link: WebLinkId,
    ) -> Result<(), IngestError> {
        let entry = self.properties.get_mut(&properties).ok_or_else(|| {
            IngestError::CatalogIntegrity(format!("missing properties {properties}"))
        })?;
        entry.web_links.insert(link);
        Ok(())
    }

    pub fn properties_mut(&mut self, id: PropertiesId) -> Option<&mut LigandProperties> {
        self.properties.get_mut(&id)
    }

    /// Points `ligand` at `properties` as a non-canonical alias, releasing the
    /// properties it held before if nothing else references them.
    pub fn demote_to_alias(
        &mut self,
        ligand: LigandId,
        properties: PropertiesId,
    ) -> Result<(), IngestError> {
        if !self.properties.contains_key(&properties) {
            return Err(IngestError::CatalogIntegrity(format!(
                "missing properties {properties}"
            )));
        }
        let entry = self
            .ligands
            .get_mut(&ligand)
            .ok_or_else(|| IngestError::CatalogIntegrity(format!("missing ligand {ligand}")))?;
        let previous = entry.properties;
        entry.properties = properties;
        entry.canonical = false;
        entry.ambiguous_alias = false;
        self.release_properties(previous);
        Ok(())
    }

    /// Deletes a ligand. Its properties go with it unless another ligand
    /// still shares them.
    pub fn remove_ligand(&mut self, id: LigandId) -> Option<Ligand> {
        let ligand = self.ligands.remove(&id)?;
        self.release_properties(ligand.properties);
        Some(ligand)
    }

    fn release_properties(&mut self, id: PropertiesId) {
        let referenced = self.ligands.values().any(|ligand| ligand.properties == id);
        if !referenced {
            debug!(properties = %id, "releasing unreferenced ligand properties");
            self.properties.remove(&id);
        }
    }

    pub fn property_share_count(&self, id: PropertiesId) -> usize {
        self.ligands
            .values()
            .filter(|ligand| ligand.properties == id)
            .count()
    }

    // Categorical lookups

    pub fn get_or_create_role(&mut self, name: &str) -> LigandRoleId {
        let value = LigandRole {
            name: name.to_string(),
        };
        get_or_create(&mut self.ligand_roles, &mut self.next_id, value)
    }

    pub fn get_or_create_exp_type(&mut self, kind: &str) -> ExperimentalTypeId {
        let value = ExperimentalType {
            kind: kind.to_string(),
        };
        get_or_create(&mut self.experimental_types, &mut self.next_id, value)
    }

    pub fn get_or_create_func(&mut self, func: &str) -> FuncId {
        let value = Func {
            func: func.to_string(),
        };
        get_or_create(&mut self.funcs, &mut self.next_id, value)
    }

    pub fn get_or_create_measure(&mut self, measure: &str) -> MeasureId {
        let value = Measure {
            measure: measure.to_string(),
        };
        get_or_create(&mut self.measures, &mut self.next_id, value)
    }

    pub fn get_or_create_qual(&mut self, qual: &str, prop: &str) -> QualId {
        let value = Qual {
            qual: qual.to_string(),
            prop: prop.to_string(),
        };
        get_or_create(&mut self.quals, &mut self.next_id, value)
    }

    pub fn get_or_create_optional(&mut self, value: OptionalMetadata) -> OptionalId {
        get_or_create(&mut self.optionals, &mut self.next_id, value)
    }

    pub fn get_or_create_mutation(&mut self, value: Mutation) -> MutationId {
        get_or_create(&mut self.mutations, &mut self.next_id, value)
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }

    /// Number of rows across every categorical lookup table.
    pub fn lookup_count(&self) -> usize {
        self.ligand_roles.len()
            + self.experimental_types.len()
            + self.funcs.len()
            + self.measures.len()
            + self.quals.len()
            + self.optionals.len()
    }

    // Experiments

    pub fn upsert_experiment(&mut self, key: ExperimentKey, foldchange: f64) -> Upsert<ExperimentId> {
        if let Some(id) = self.experiment_index.get(&key) {
            return Upsert::Found(*id);
        }
        let id = self.allocate();
        self.experiments.insert(
            id,
            MutationExperiment {
                key: key.clone(),
                foldchange,
            },
        );
        self.experiment_index.insert(key, id);
        Upsert::Created(id)
    }

    pub fn experiment(&self, id: ExperimentId) -> Option<&MutationExperiment> {
        self.experiments.get(&id)
    }

    pub fn experiments(&self) -> impl Iterator<Item = (ExperimentId, &MutationExperiment)> {
        self.experiments.iter().map(|(id, exp)| (*id, exp))
    }

    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Drops every mutation experiment. Everything they reference stays.
    pub fn purge_experiments(&mut self) -> usize {
        let removed = self.experiments.len();
        self.experiments.clear();
        self.experiment_index.clear();
        removed
    }
}

fn get_or_create<K, V>(arena: &mut BTreeMap<K, V>, next_id: &mut u64, value: V) -> K
where
    K: Ord + Copy + From<u64>,
    V: PartialEq,
{
    if let Some((id, _)) = arena.iter().find(|(_, existing)| **existing == value) {
        return *id;
    }
    let raw = (*next_id).max(1);
    *next_id = raw + 1;
    let id = K::from(raw);
    arena.insert(id, value);
    id
}

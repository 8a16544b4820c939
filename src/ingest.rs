//! The ingestion driver: walks row sources in order and threads every row
//! through raw storage, publication and ligand resolution, protein lookup,
//! categorical lookups, fold-change normalization and the experiment upsert.
//!
//! A file is all-or-nothing. The catalog is checkpointed before each file
//! and restored when a row fails fatally, so an aborted file leaves nothing
//! behind. Rows whose protein or residue cannot be found are skipped and
//! counted instead.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, CatalogStats, Upsert};
use crate::domain::IdentifierType;
use crate::effect::fold_change;
use crate::error::IngestError;
use crate::ligand::LigandResolver;
use crate::model::{ExperimentKey, Mutation, OptionalMetadata};
use crate::proteins::ProteinLookup;
use crate::providers::bibliography::PublicationMetadataClient;
use crate::publication::resolve_publication;
use crate::pubchem::ChemicalIdentityClient;
use crate::rows::{Cell, MutationRow, RowSource};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Recorded on every raw record this run creates.
    pub added_by: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            added_by: "mutant-ingest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    #[serde(rename = "no protein")]
    NoProtein,
    #[serde(rename = "no residue")]
    NoResidue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSkip {
    /// 1-based position among the file's data rows.
    pub row: usize,
    pub reason: SkipReason,
    pub protein: String,
    pub position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: String,
    pub status: FileStatus,
    pub inserted: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub skips: Vec<RowSkip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn new(source: String) -> Self {
        Self {
            source,
            status: FileStatus::Completed,
            inserted: 0,
            unchanged: 0,
            skipped: 0,
            skips: Vec::new(),
            failed_row: None,
            error: None,
        }
    }

    fn abort(&mut self, row: Option<usize>, err: &IngestError) {
        self.status = FileStatus::Aborted;
        self.inserted = 0;
        self.unchanged = 0;
        self.skipped = 0;
        self.skips.clear();
        self.failed_row = row;
        self.error = Some(err.to_string());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purged: Option<usize>,
    pub files: Vec<FileReport>,
    pub catalog: CatalogStats,
}

enum RowOutcome {
    Inserted,
    Unchanged,
    Skipped(SkipReason),
}

pub struct Ingestor<C, P, L>
where
    C: ChemicalIdentityClient,
    P: PublicationMetadataClient,
    L: ProteinLookup,
{
    catalog: Catalog,
    store: Option<Store>,
    chemistry: C,
    bibliography: P,
    proteins: L,
    options: IngestOptions,
}

impl<C, P, L> Ingestor<C, P, L>
where
    C: ChemicalIdentityClient,
    P: PublicationMetadataClient,
    L: ProteinLookup,
{
    pub fn new(catalog: Catalog, chemistry: C, bibliography: P, proteins: L) -> Self {
        Self {
            catalog,
            store: None,
            chemistry,
            bibliography,
            proteins,
            options: IngestOptions::default(),
        }
    }

    /// Persist the catalog to `store` after every file and after a purge.
    pub fn with_store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    /// Deletes every mutation experiment. A failure to persist the purge is
    /// logged and the in-memory purge stands.
    pub fn purge(&mut self) -> usize {
        let removed = self.catalog.purge_experiments();
        info!(removed, "purged mutation experiments");
        if let Err(err) = self.persist() {
            error!(error = %err, "failed to persist purge");
        }
        removed
    }

    pub fn ingest_all<S: RowSource>(
        &mut self,
        sources: &[S],
        purge: bool,
    ) -> Result<IngestReport, IngestError> {
        let purged = purge.then(|| self.purge());
        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            files.push(self.ingest_file(source)?);
        }
        Ok(IngestReport {
            purged,
            files,
            catalog: self.catalog.stats(),
        })
    }

    /// Purges first when asked, then ingests whatever `sources` yields. A
    /// purge stays in effect even when listing the sources fails.
    pub fn purge_and_ingest<S, F>(
        &mut self,
        purge: bool,
        sources: F,
    ) -> Result<IngestReport, IngestError>
    where
        S: RowSource,
        F: FnOnce() -> Result<Vec<S>, IngestError>,
    {
        let purged = purge.then(|| self.purge());
        let sources = sources()?;
        let mut report = self.ingest_all(&sources, false)?;
        report.purged = purged;
        Ok(report)
    }

    /// Ingests one source. Fatal row failures roll the catalog back to its
    /// state before the file and are reported, not returned; only a failure
    /// to persist the catalog is an `Err`.
    pub fn ingest_file<S: RowSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<FileReport, IngestError> {
        let label = source.label();
        let mut report = FileReport::new(label.clone());
        info!(source = %label, "ingesting");

        let rows = match source.read_rows() {
            Ok(rows) => rows,
            Err(err) => {
                error!(source = %label, error = %err, "cannot read source");
                report.abort(None, &err);
                return Ok(report);
            }
        };

        let checkpoint = self.catalog.clone();
        let added_date = Utc::now();
        for (index, cells) in rows.iter().enumerate() {
            let row_number = index + 1;
            match self.ingest_row(cells, added_date) {
                Ok(RowOutcome::Inserted) => report.inserted += 1,
                Ok(RowOutcome::Unchanged) => report.unchanged += 1,
                Ok(RowOutcome::Skipped(reason)) => {
                    let row = MutationRow::normalize(cells);
                    warn!(
                        source = %label,
                        row = row_number,
                        protein = %row.protein,
                        position = row.mutation_pos,
                        ?reason,
                        "row skipped"
                    );
                    report.skipped += 1;
                    report.skips.push(RowSkip {
                        row: row_number,
                        reason,
                        protein: row.protein,
                        position: row.mutation_pos,
                    });
                }
                Err(err) => {
                    error!(source = %label, row = row_number, error = %err, "aborting file, rolling back");
                    self.catalog = checkpoint;
                    report.abort(Some(row_number), &err);
                    return Ok(report);
                }
            }
        }

        info!(
            source = %label,
            inserted = report.inserted,
            unchanged = report.unchanged,
            skipped = report.skipped,
            "finished"
        );
        self.persist()?;
        Ok(report)
    }

    fn ingest_row(
        &mut self,
        cells: &[Cell],
        added_date: DateTime<Utc>,
    ) -> Result<RowOutcome, IngestError> {
        let row = MutationRow::normalize(cells);
        let raw = self
            .catalog
            .insert_raw(&row, &self.options.added_by, added_date)
            .id();

        let publication =
            resolve_publication(&mut self.catalog, &self.bibliography, &row.reference)?.id();

        let (ligand, ligand_ref) = {
            let mut resolver = LigandResolver::new(&mut self.catalog, &self.chemistry);
            let ligand = resolver.resolve(
                &row.ligand_name,
                IdentifierType::from_label(&row.ligand_type),
                &row.ligand_id,
            )?;
            let ligand_ref = resolver.resolve(&row.exp_mu_ligand_ref, IdentifierType::Other, "")?;
            (ligand.ligand, ligand_ref.ligand)
        };

        let protein = match self.proteins.find_protein(&row.protein) {
            Ok(Some(protein)) => protein,
            Ok(None) => return Ok(RowOutcome::Skipped(SkipReason::NoProtein)),
            Err(err) => {
                debug!(protein = %row.protein, error = %err, "protein lookup failed");
                return Ok(RowOutcome::Skipped(SkipReason::NoProtein));
            }
        };
        let residue = match self.proteins.find_residue(&protein, row.mutation_pos) {
            Ok(Some(residue)) => residue,
            Ok(None) => return Ok(RowOutcome::Skipped(SkipReason::NoResidue)),
            Err(err) => {
                debug!(protein = %row.protein, error = %err, "residue lookup failed");
                return Ok(RowOutcome::Skipped(SkipReason::NoResidue));
            }
        };

        let ligand_role = self.catalog.get_or_create_role(&row.ligand_class);
        let exp_type = self.catalog.get_or_create_exp_type(&row.exp_type);
        let exp_func = self.catalog.get_or_create_func(&row.exp_func);
        let exp_measure = self.catalog.get_or_create_measure(&row.exp_mu_effect_type);
        let exp_qual = self
            .catalog
            .get_or_create_qual(&row.exp_mu_effect_qual, &row.exp_mu_effect_ligand_prop);
        let optional = self.catalog.get_or_create_optional(OptionalMetadata {
            kind: row.opt_type.clone(),
            wt: row.opt_wt,
            mu: row.opt_mu,
            sign: row.opt_sign.clone(),
            percentage: row.opt_percentage,
            qual: row.opt_qual.clone(),
            agonist: row.opt_agonist.clone(),
        });
        let mutation = self.catalog.get_or_create_mutation(Mutation {
            protein: residue.protein.clone(),
            residue: residue.sequence_number,
            amino_acid: row.mutation_to.clone(),
        });

        let foldchange = fold_change(
            &row.exp_mu_effect_type,
            &row.exp_type,
            row.exp_wt_value,
            row.exp_mu_value_raw,
        );

        let key = ExperimentKey {
            publication,
            protein: protein.entry_name.clone(),
            residue: residue.sequence_number,
            ligand,
            ligand_role,
            ligand_ref,
            raw,
            optional,
            exp_type,
            exp_func,
            exp_measure,
            exp_qual,
            mutation,
            wt_value: row.exp_wt_value,
            wt_unit: row.exp_wt_unit.clone(),
            mu_value: row.exp_mu_value_raw,
            mu_sign: row.exp_mu_effect_sign.clone(),
        };
        match self.catalog.upsert_experiment(key, foldchange) {
            Upsert::Created(id) => {
                debug!(experiment = %id, foldchange, "experiment created");
                Ok(RowOutcome::Inserted)
            }
            Upsert::Found(id) => {
                debug!(experiment = %id, "experiment already stored");
                Ok(RowOutcome::Unchanged)
            }
        }
    }

    fn persist(&self) -> Result<(), IngestError> {
        match &self.store {
            Some(store) => store.save_catalog(&self.catalog),
            None => Ok(()),
        }
    }
}

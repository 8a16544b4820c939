//! Ligand identity resolution against the catalog.
//!
//! A ligand reference from a sheet row is a display name plus an identifier
//! in one of three spaces (PubChem CID, SMILES, or nothing useful). The
//! resolver walks a fixed tie-break order for every space: an exact
//! name-and-identifier match wins over sharing a canonical ligand's
//! properties under a new alias, and an alias wins over creating a new
//! canonical ligand. One chemical ends up with one canonical entry.

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::domain::{IdentifierType, PubchemCid, WebResource};
use crate::error::IngestError;
use crate::model::{Ligand, LigandId, LigandProperties, PropertiesId};
use crate::pubchem::{ChemicalIdentity, ChemicalIdentityClient};

/// Which branch produced the ligand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LigandMatch {
    /// An existing ligand matched by name and identifier.
    Matched,
    /// A new non-canonical ligand now shares a canonical ligand's properties.
    Aliased,
    /// An existing ligand matched by InChIKey and gained a CID link.
    CrossReferenced,
    /// A new canonical ligand.
    Created,
    /// A canonical ligand holding only the SMILES given in the sheet.
    Degraded,
    /// The name already belongs to a different chemical; the row points at
    /// the name's ambiguous alias.
    Ambiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub ligand: LigandId,
    pub outcome: LigandMatch,
}

impl Resolution {
    fn new(ligand: LigandId, outcome: LigandMatch) -> Self {
        Self { ligand, outcome }
    }
}

pub struct LigandResolver<'a, C: ChemicalIdentityClient + ?Sized> {
    catalog: &'a mut Catalog,
    chemistry: &'a C,
}

impl<'a, C: ChemicalIdentityClient + ?Sized> LigandResolver<'a, C> {
    pub fn new(catalog: &'a mut Catalog, chemistry: &'a C) -> Self {
        Self { catalog, chemistry }
    }

    pub fn resolve(
        &mut self,
        name: &str,
        identifier_type: IdentifierType,
        identifier_value: &str,
    ) -> Result<Resolution, IngestError> {
        let wrap = |source: IngestError| IngestError::LigandResolution {
            name: name.to_string(),
            source: Box::new(source),
        };
        let resolution = match identifier_type {
            IdentifierType::PubchemCid => self.resolve_cid(name, identifier_value).map_err(wrap)?,
            IdentifierType::Smiles if identifier_value.trim().is_empty() => {
                debug!(name, "blank SMILES, resolving by name");
                self.resolve_name(name).map_err(wrap)?
            }
            IdentifierType::Smiles => self
                .resolve_smiles(name, identifier_value.trim())
                .map_err(wrap)?,
            IdentifierType::Other => self.resolve_name(name).map_err(wrap)?,
        };
        debug!(
            name,
            %identifier_type,
            ligand = %resolution.ligand,
            outcome = ?resolution.outcome,
            "ligand resolved"
        );
        Ok(resolution)
    }

    fn resolve_cid(&mut self, name: &str, value: &str) -> Result<Resolution, IngestError> {
        let cid: PubchemCid = value.parse()?;
        let index = cid.to_string();

        if let Some(link) = self.catalog.find_web_link(WebResource::Pubchem, &index) {
            if let Some(ligand) = self
                .catalog
                .find_ligand(|l, p| l.name == name && p.web_links.contains(&link))
            {
                return Ok(Resolution::new(ligand, LigandMatch::Matched));
            }
            if let Some(canonical) = self
                .catalog
                .find_ligand(|l, p| l.canonical && p.web_links.contains(&link))
            {
                let ligand = self.alias_of(name, canonical)?;
                return Ok(Resolution::new(ligand, LigandMatch::Aliased));
            }
        }

        // No retry beyond the HTTP layer: a CID the service cannot describe
        // stops the file.
        let identity = self.chemistry.by_cid(cid)?;
        self.attach_identity(name, identity, Some(cid))
    }

    fn resolve_smiles(&mut self, name: &str, smiles: &str) -> Result<Resolution, IngestError> {
        if let Some(ligand) = self
            .catalog
            .find_ligand(|l, p| l.name == name && p.smiles.as_deref() == Some(smiles))
        {
            return Ok(Resolution::new(ligand, LigandMatch::Matched));
        }
        if let Some(canonical) = self
            .catalog
            .find_ligand(|l, p| l.canonical && p.smiles.as_deref() == Some(smiles))
        {
            let ligand = self.alias_of(name, canonical)?;
            return Ok(Resolution::new(ligand, LigandMatch::Aliased));
        }

        match self.chemistry.by_smiles(smiles) {
            Ok(identity) => {
                let cid = identity.cid;
                self.attach_identity(name, identity, cid)
            }
            Err(err) => {
                warn!(name, smiles, error = %err, "SMILES lookup failed, keeping sheet SMILES");
                if let Some((existing, properties)) = self.canonical_named(name) {
                    let empty = self
                        .catalog
                        .properties(properties)
                        .map(|p| p.smiles.is_none() && p.inchikey.is_none())
                        .unwrap_or(false);
                    if !empty {
                        return self.ambiguous(name);
                    }
                    if let Some(entry) = self.catalog.properties_mut(properties) {
                        entry.smiles = Some(smiles.to_string());
                    }
                    return Ok(Resolution::new(existing, LigandMatch::Degraded));
                }
                let properties = self.catalog.insert_properties(LigandProperties {
                    smiles: Some(smiles.to_string()),
                    ..LigandProperties::default()
                });
                let ligand = self.catalog.insert_ligand(name, true, false, properties)?;
                Ok(Resolution::new(ligand, LigandMatch::Degraded))
            }
        }
    }

    /// Name-only resolution, also used for the reference ligand column.
    pub fn resolve_name(&mut self, name: &str) -> Result<Resolution, IngestError> {
        let by_name = |canonical: bool, ambiguous: bool| {
            move |l: &Ligand, _: &LigandProperties| {
                l.name == name && l.canonical == canonical && (canonical || l.ambiguous_alias == ambiguous)
            }
        };

        if let Some(ligand) = self.catalog.find_ligand(by_name(true, false)) {
            return Ok(Resolution::new(ligand, LigandMatch::Matched));
        }
        if let Some(ligand) = self.catalog.find_ligand(by_name(false, false)) {
            return Ok(Resolution::new(ligand, LigandMatch::Matched));
        }
        if let Some(ligand) = self.catalog.find_ligand(by_name(false, true)) {
            debug!(name, "ambiguous alias, pending curation");
            return Ok(Resolution::new(ligand, LigandMatch::Matched));
        }

        let properties = self.catalog.insert_properties(LigandProperties::default());
        let ligand = self.catalog.insert_ligand(name, true, false, properties)?;
        self.enrich_by_name(ligand)?;
        Ok(Resolution::new(ligand, LigandMatch::Created))
    }

    /// Records a name as ambiguous: it gets private, empty properties until
    /// someone curates it.
    pub fn register_ambiguous_alias(&mut self, name: &str) -> Result<LigandId, IngestError> {
        if let Some(existing) = self
            .catalog
            .find_ligand(|l, _| l.name == name && l.ambiguous_alias)
        {
            return Ok(existing);
        }
        let properties = self.catalog.insert_properties(LigandProperties::default());
        self.catalog.insert_ligand(name, false, true, properties)
    }

    fn attach_identity(
        &mut self,
        name: &str,
        identity: ChemicalIdentity,
        cid: Option<PubchemCid>,
    ) -> Result<Resolution, IngestError> {
        let inchikey = identity.inchikey.as_str();

        if let Some(ligand) = self
            .catalog
            .find_ligand(|l, p| l.name == name && p.inchikey.as_deref() == Some(inchikey))
        {
            let properties = self.properties_of(ligand)?;
            if let Some(cid) = cid {
                self.link_cid(properties, cid)?;
            }
            return Ok(Resolution::new(ligand, LigandMatch::CrossReferenced));
        }

        if let Some(canonical) = self
            .catalog
            .find_ligand(|l, p| l.canonical && p.inchikey.as_deref() == Some(inchikey))
        {
            let ligand = self.alias_of(name, canonical)?;
            if let Some(cid) = cid {
                let properties = self.properties_of(canonical)?;
                self.link_cid(properties, cid)?;
            }
            return Ok(Resolution::new(ligand, LigandMatch::Aliased));
        }

        // A canonical ligand with this name but no InChIKey takes the identity
        // in place. One that already has another InChIKey keeps it.
        if let Some((existing, properties)) = self.canonical_named(name) {
            let known = self
                .catalog
                .properties(properties)
                .is_some_and(|p| p.inchikey.is_some());
            if known {
                return self.ambiguous(name);
            }
            if let Some(entry) = self.catalog.properties_mut(properties) {
                entry.smiles = Some(identity.canonical_smiles);
                entry.inchikey = Some(identity.inchikey);
            }
            if let Some(cid) = cid {
                self.link_cid(properties, cid)?;
            }
            return Ok(Resolution::new(existing, LigandMatch::CrossReferenced));
        }

        let properties = self.catalog.insert_properties(LigandProperties {
            smiles: Some(identity.canonical_smiles),
            inchikey: Some(identity.inchikey),
            ..LigandProperties::default()
        });
        if let Some(cid) = cid {
            self.link_cid(properties, cid)?;
        }
        let ligand = self.catalog.insert_ligand(name, true, false, properties)?;
        self.enrich_by_name(ligand)?;
        Ok(Resolution::new(ligand, LigandMatch::Created))
    }

    /// Looks the ligand's own name up in the resolution service. Ligands that
    /// already carry an InChIKey only pick up a missing CID link; empty ones
    /// either take the found identity or, when another canonical ligand
    /// already owns it, become an alias of that ligand. Lookup failures leave
    /// the ligand untouched.
    fn enrich_by_name(&mut self, ligand: LigandId) -> Result<(), IngestError> {
        let (name, properties) = match self.catalog.ligand(ligand) {
            Some(entry) => (entry.name.clone(), entry.properties),
            None => return Ok(()),
        };
        if name.trim().is_empty() {
            return Ok(());
        }

        let identity = match self.chemistry.by_name(&name) {
            Ok(identity) => identity,
            Err(err) => {
                debug!(name = %name, error = %err, "name enrichment unavailable");
                return Ok(());
            }
        };

        let current = self
            .catalog
            .properties(properties)
            .and_then(|p| p.inchikey.clone());
        match current {
            Some(inchikey) => {
                if inchikey == identity.inchikey {
                    if let Some(cid) = identity.cid {
                        self.link_cid(properties, cid)?;
                    }
                }
                Ok(())
            }
            None => {
                let owner = self.catalog.find_ligand(|l, p| {
                    l.canonical
                        && l.properties != properties
                        && p.inchikey.as_deref() == Some(identity.inchikey.as_str())
                });
                if let Some(owner) = owner {
                    let shared = self.properties_of(owner)?;
                    debug!(name = %name, canonical = %owner, "name resolves to a known ligand, aliasing");
                    return self.catalog.demote_to_alias(ligand, shared);
                }
                if let Some(entry) = self.catalog.properties_mut(properties) {
                    entry.smiles = Some(identity.canonical_smiles);
                    entry.inchikey = Some(identity.inchikey);
                }
                if let Some(cid) = identity.cid {
                    self.link_cid(properties, cid)?;
                }
                Ok(())
            }
        }
    }

    fn canonical_named(&self, name: &str) -> Option<(LigandId, PropertiesId)> {
        let ligand = self.catalog.find_ligand(|l, _| l.canonical && l.name == name)?;
        self.catalog.ligand(ligand).map(|l| (ligand, l.properties))
    }

    fn ambiguous(&mut self, name: &str) -> Result<Resolution, IngestError> {
        warn!(name, "name already names a different ligand, using its ambiguous alias");
        let ligand = self.register_ambiguous_alias(name)?;
        Ok(Resolution::new(ligand, LigandMatch::Ambiguous))
    }

    fn alias_of(&mut self, name: &str, canonical: LigandId) -> Result<LigandId, IngestError> {
        let properties = self.properties_of(canonical)?;
        self.catalog.insert_ligand(name, false, false, properties)
    }

    fn properties_of(&self, ligand: LigandId) -> Result<PropertiesId, IngestError> {
        self.catalog
            .ligand(ligand)
            .map(|l| l.properties)
            .ok_or_else(|| IngestError::CatalogIntegrity(format!("missing ligand {ligand}")))
    }

    fn link_cid(&mut self, properties: PropertiesId, cid: PubchemCid) -> Result<(), IngestError> {
        let link = self
            .catalog
            .get_or_create_web_link(WebResource::Pubchem, &cid.to_string());
        self.catalog.add_properties_link(properties, link)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;

    #[derive(Default)]
    struct FakeChemistry {
        by_cid: HashMap<u64, ChemicalIdentity>,
        by_smiles: HashMap<String, ChemicalIdentity>,
        by_name: HashMap<String, ChemicalIdentity>,
        calls: Mutex<usize>,
    }

    fn identity(cid: u64, smiles: &str, inchikey: &str) -> ChemicalIdentity {
        ChemicalIdentity {
            cid: Some(PubchemCid::new(cid)),
            canonical_smiles: smiles.to_string(),
            inchikey: inchikey.to_string(),
        }
    }

    impl FakeChemistry {
        fn bump(&self) {
            *self.calls.lock().unwrap() += 1;
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl ChemicalIdentityClient for FakeChemistry {
        fn by_cid(&self, cid: PubchemCid) -> Result<ChemicalIdentity, IngestError> {
            self.bump();
            self.by_cid
                .get(&cid.value())
                .cloned()
                .ok_or_else(|| IngestError::PubchemStatus {
                    status: 404,
                    message: "not found".to_string(),
                })
        }

        fn by_smiles(&self, smiles: &str) -> Result<ChemicalIdentity, IngestError> {
            self.bump();
            self.by_smiles
                .get(smiles)
                .cloned()
                .ok_or_else(|| IngestError::PubchemHttp("offline".to_string()))
        }

        fn by_name(&self, name: &str) -> Result<ChemicalIdentity, IngestError> {
            self.bump();
            self.by_name
                .get(name)
                .cloned()
                .ok_or_else(|| IngestError::PubchemHttp("offline".to_string()))
        }
    }

    const ADRENALINE_KEY: &str = "UCTWMZQNUQWSLP-VIFPVBQESA-N";

    fn chemistry() -> FakeChemistry {
        let mut fake = FakeChemistry::default();
        fake.by_cid
            .insert(5816, identity(5816, "CNC[C@H](O)c1ccc(O)c(O)c1", ADRENALINE_KEY));
        fake.by_cid
            .insert(838, identity(838, "CNCC(O)c1ccc(O)c(O)c1", "UCTWMZQNUQWSLP-UHFFFAOYSA-N"));
        fake.by_smiles.insert(
            "CNC[C@H](O)C1=CC(O)=C(O)C=C1".to_string(),
            identity(5816, "CNC[C@H](O)c1ccc(O)c(O)c1", ADRENALINE_KEY),
        );
        fake
    }

    #[test]
    fn cid_resolution_is_idempotent() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);

        let first = resolver
            .resolve("adrenaline", IdentifierType::PubchemCid, "5816")
            .unwrap();
        let second = resolver
            .resolve("adrenaline", IdentifierType::PubchemCid, "5816")
            .unwrap();
        assert_eq!(first.outcome, LigandMatch::Created);
        assert_eq!(second.outcome, LigandMatch::Matched);
        assert_eq!(first.ligand, second.ligand);
        // by_cid once, by_name enrichment once
        assert_eq!(fake.calls(), 2);
    }

    #[test]
    fn same_cid_under_new_name_becomes_alias() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let (canonical, alias) = {
            let mut resolver = LigandResolver::new(&mut catalog, &fake);
            let canonical = resolver
                .resolve("adrenaline", IdentifierType::PubchemCid, "5816")
                .unwrap();
            let alias = resolver
                .resolve("epinephrine", IdentifierType::PubchemCid, "5816")
                .unwrap();
            (canonical, alias)
        };
        assert_eq!(alias.outcome, LigandMatch::Aliased);

        let canonical_ligand = catalog.ligand(canonical.ligand).unwrap();
        let alias_ligand = catalog.ligand(alias.ligand).unwrap();
        assert!(canonical_ligand.canonical);
        assert!(!alias_ligand.canonical);
        assert_eq!(alias_ligand.properties, canonical_ligand.properties);
        assert_eq!(
            catalog.ligands().filter(|(_, l)| l.canonical).count(),
            1
        );
    }

    #[test]
    fn new_cid_with_known_inchikey_aliases_and_links() {
        let mut fake = chemistry();
        fake.by_cid
            .insert(9999, identity(9999, "CNC[C@H](O)c1ccc(O)c(O)c1", ADRENALINE_KEY));
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);

        let canonical = resolver
            .resolve("adrenaline", IdentifierType::PubchemCid, "5816")
            .unwrap();
        let other = resolver
            .resolve("adrenaline", IdentifierType::PubchemCid, "9999")
            .unwrap();
        assert_eq!(other.outcome, LigandMatch::CrossReferenced);
        assert_eq!(other.ligand, canonical.ligand);

        let aliased = resolver
            .resolve("Epi", IdentifierType::PubchemCid, "9999")
            .unwrap();
        // 9999 now sits on the canonical properties, no lookup needed
        assert_eq!(aliased.outcome, LigandMatch::Aliased);
        assert_ne!(aliased.ligand, canonical.ligand);
    }

    #[test]
    fn cid_service_failure_is_fatal() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);
        let err = resolver
            .resolve("mystery", IdentifierType::PubchemCid, "424242")
            .unwrap_err();
        assert_matches!(err, IngestError::LigandResolution { .. });
        assert_eq!(catalog.ligands().count(), 0);
    }

    #[test]
    fn invalid_cid_is_fatal() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);
        let err = resolver
            .resolve("mystery", IdentifierType::PubchemCid, "")
            .unwrap_err();
        assert_matches!(
            err,
            IngestError::LigandResolution { source, .. } if matches!(*source, IngestError::InvalidCid(_))
        );
    }

    #[test]
    fn smiles_lookup_dedups_on_inchikey() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);

        let canonical = resolver
            .resolve("adrenaline", IdentifierType::PubchemCid, "5816")
            .unwrap();
        let by_smiles = resolver
            .resolve(
                "(-)-epinephrine",
                IdentifierType::Smiles,
                "CNC[C@H](O)C1=CC(O)=C(O)C=C1",
            )
            .unwrap();
        assert_eq!(by_smiles.outcome, LigandMatch::Aliased);
        assert_eq!(
            catalog.ligand(by_smiles.ligand).unwrap().properties,
            catalog.ligand(canonical.ligand).unwrap().properties
        );
    }

    #[test]
    fn smiles_service_failure_degrades() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let (first, second) = {
            let mut resolver = LigandResolver::new(&mut catalog, &fake);
            let first = resolver
                .resolve("compound 7b", IdentifierType::Smiles, "c1ccccc1CN")
                .unwrap();
            let second = resolver
                .resolve("compound 7b", IdentifierType::Smiles, "c1ccccc1CN")
                .unwrap();
            (first, second)
        };
        assert_eq!(first.outcome, LigandMatch::Degraded);
        assert_eq!(second.outcome, LigandMatch::Matched);
        assert_eq!(first.ligand, second.ligand);

        let props = catalog.ligand_properties(first.ligand).unwrap();
        assert_eq!(props.smiles.as_deref(), Some("c1ccccc1CN"));
        assert!(props.inchikey.is_none());
    }

    #[test]
    fn smiles_alias_by_stored_smiles() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);
        let first = resolver
            .resolve("compound 7b", IdentifierType::Smiles, "c1ccccc1CN")
            .unwrap();
        let calls = fake.calls();
        let alias = resolver
            .resolve("benzylamine", IdentifierType::Smiles, "c1ccccc1CN")
            .unwrap();
        assert_eq!(alias.outcome, LigandMatch::Aliased);
        assert_ne!(alias.ligand, first.ligand);
        assert_eq!(fake.calls(), calls);
    }

    #[test]
    fn name_resolution_order() {
        let fake = FakeChemistry::default();
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);

        let created = resolver
            .resolve("Compound X", IdentifierType::Other, "")
            .unwrap();
        assert_eq!(created.outcome, LigandMatch::Created);
        let again = resolver
            .resolve("Compound X", IdentifierType::Other, "whatever")
            .unwrap();
        assert_eq!(again.ligand, created.ligand);

        let ambiguous = resolver.register_ambiguous_alias("GTP analogue").unwrap();
        let found = resolver.resolve_name("GTP analogue").unwrap();
        assert_eq!(found.ligand, ambiguous);
        assert_eq!(found.outcome, LigandMatch::Matched);

        let props = catalog.ligand_properties(ambiguous).unwrap();
        assert!(props.is_empty());
        assert_eq!(catalog.ligands().count(), 2);
    }

    #[test]
    fn name_resolution_prefers_plain_alias_over_ambiguous() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);
        resolver
            .resolve("adrenaline", IdentifierType::PubchemCid, "5816")
            .unwrap();
        let alias = resolver
            .resolve("epi", IdentifierType::PubchemCid, "5816")
            .unwrap();
        resolver.register_ambiguous_alias("epi").unwrap();

        let found = resolver.resolve("epi", IdentifierType::Other, "").unwrap();
        assert_eq!(found.ligand, alias.ligand);
    }

    #[test]
    fn enrichment_fills_empty_properties() {
        let mut fake = FakeChemistry::default();
        fake.by_name
            .insert("caffeine".to_string(), identity(2519, "CN1C=NC2=C1C(=O)N(C(=O)N2C)C", "RYYVLZVUVIJVGH-UHFFFAOYSA-N"));
        let mut catalog = Catalog::new();
        let resolution = LigandResolver::new(&mut catalog, &fake)
            .resolve("caffeine", IdentifierType::Other, "")
            .unwrap();

        let props = catalog.ligand_properties(resolution.ligand).unwrap();
        assert_eq!(props.inchikey.as_deref(), Some("RYYVLZVUVIJVGH-UHFFFAOYSA-N"));
        let link = catalog.find_web_link(WebResource::Pubchem, "2519").unwrap();
        assert!(props.web_links.contains(&link));
    }

    #[test]
    fn enrichment_demotes_to_existing_canonical() {
        let mut fake = chemistry();
        fake.by_name
            .insert("Adrenalin".to_string(), identity(5816, "CNC[C@H](O)c1ccc(O)c(O)c1", ADRENALINE_KEY));
        let mut catalog = Catalog::new();
        let (canonical, trade) = {
            let mut resolver = LigandResolver::new(&mut catalog, &fake);
            let canonical = resolver
                .resolve("adrenaline", IdentifierType::PubchemCid, "5816")
                .unwrap();
            let trade = resolver
                .resolve("Adrenalin", IdentifierType::Other, "")
                .unwrap();
            (canonical, trade)
        };

        let trade = catalog.ligand(trade.ligand).unwrap();
        assert!(!trade.canonical);
        assert_eq!(
            trade.properties,
            catalog.ligand(canonical.ligand).unwrap().properties
        );
        assert_eq!(catalog.stats().ligand_properties, 1);
    }

    #[test]
    fn name_only_ligand_takes_identity_from_later_cid() {
        let mut fake = FakeChemistry::default();
        fake.by_cid
            .insert(2519, identity(2519, "CN1C=NC2=C1C(=O)N(C(=O)N2C)C", "RYYVLZVUVIJVGH-UHFFFAOYSA-N"));
        let mut catalog = Catalog::new();
        let (by_name, by_cid) = {
            let mut resolver = LigandResolver::new(&mut catalog, &fake);
            let by_name = resolver
                .resolve("caffeine", IdentifierType::Other, "")
                .unwrap();
            let by_cid = resolver
                .resolve("caffeine", IdentifierType::PubchemCid, "2519")
                .unwrap();
            (by_name, by_cid)
        };
        assert_eq!(by_name.outcome, LigandMatch::Created);
        assert_eq!(by_cid.outcome, LigandMatch::CrossReferenced);
        assert_eq!(by_cid.ligand, by_name.ligand);
        assert_eq!(catalog.ligands().count(), 1);

        let props = catalog.ligand_properties(by_cid.ligand).unwrap();
        assert_eq!(props.inchikey.as_deref(), Some("RYYVLZVUVIJVGH-UHFFFAOYSA-N"));
        let link = catalog.find_web_link(WebResource::Pubchem, "2519").unwrap();
        assert!(props.web_links.contains(&link));
    }

    #[test]
    fn conflicting_smiles_for_one_name_registers_ambiguous_alias() {
        let fake = FakeChemistry::default();
        let mut catalog = Catalog::new();
        let (first, second, third) = {
            let mut resolver = LigandResolver::new(&mut catalog, &fake);
            let first = resolver.resolve("X", IdentifierType::Smiles, "CCO").unwrap();
            let second = resolver.resolve("X", IdentifierType::Smiles, "CCN").unwrap();
            let third = resolver.resolve("X", IdentifierType::Smiles, "CCN").unwrap();
            (first, second, third)
        };
        assert_eq!(first.outcome, LigandMatch::Degraded);
        assert_eq!(second.outcome, LigandMatch::Ambiguous);
        assert_eq!(third.ligand, second.ligand);

        let named: Vec<_> = catalog.ligands().filter(|(_, l)| l.name == "X").collect();
        assert_eq!(named.len(), 2);
        assert_eq!(named.iter().filter(|(_, l)| l.canonical).count(), 1);
        assert!(catalog.ligand(second.ligand).unwrap().ambiguous_alias);
        let props = catalog.ligand_properties(first.ligand).unwrap();
        assert_eq!(props.smiles.as_deref(), Some("CCO"));
    }

    #[test]
    fn cid_for_a_name_holding_another_inchikey_is_ambiguous() {
        let fake = chemistry();
        let mut catalog = Catalog::new();
        let mut resolver = LigandResolver::new(&mut catalog, &fake);
        let canonical = resolver
            .resolve("adrenaline", IdentifierType::PubchemCid, "5816")
            .unwrap();
        let racemic = resolver
            .resolve("adrenaline", IdentifierType::PubchemCid, "838")
            .unwrap();
        assert_eq!(racemic.outcome, LigandMatch::Ambiguous);
        assert_ne!(racemic.ligand, canonical.ligand);
        assert_eq!(
            catalog.ligands().filter(|(_, l)| l.canonical && l.name == "adrenaline").count(),
            1
        );
    }
}

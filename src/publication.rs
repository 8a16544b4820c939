use tracing::{debug, warn};

use crate::catalog::{Catalog, Upsert};
use crate::domain::PublicationRef;
use crate::error::IngestError;
use crate::model::{PublicationId, PublicationMetadata};
use crate::providers::bibliography::PublicationMetadataClient;

/// Finds the publication for a reference column, creating it on first sight.
/// Metadata is fetched once, at creation; a failed fetch still creates the
/// publication, just without metadata.
pub fn resolve_publication<P: PublicationMetadataClient + ?Sized>(
    catalog: &mut Catalog,
    bibliography: &P,
    reference: &str,
) -> Result<Upsert<PublicationId>, IngestError> {
    let reference: PublicationRef = reference.parse()?;
    let resource = reference.resource();
    let index = reference.index();

    if let Some(id) = catalog.find_publication(resource, &index) {
        return Ok(Upsert::Found(id));
    }

    let metadata = match bibliography.fetch(&reference) {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!(%resource, index = %index, error = %err, "publication metadata unavailable");
            PublicationMetadata::default()
        }
    };
    let id = catalog.insert_publication(resource, &index, metadata);
    debug!(%resource, index = %index, publication = %id, "publication created");
    Ok(Upsert::Created(id))
}

use anyhow::Result;
use async_trait::async_trait;

use crate::defs::CatalogLookup;
use crate::defs::CatalogMatch;

/// Catalog that never finds anything. Used when no catalog credentials are configured.
pub struct NoCatalog;

#[async_trait]
impl CatalogLookup for NoCatalog {
    fn catalog_name(&self) -> &str {
        "none"
    }

    async fn search(&self, _name: &str, _artist: &str) -> Result<Option<CatalogMatch>> {
        // Nothing to look up, every album goes out without enrichment.
        Ok(None)
    }
}

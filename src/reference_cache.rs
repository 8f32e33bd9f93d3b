use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::models::{RefKind, Reference};
use crate::repository::{CatalogRepository, RepoResult};

struct KindMaps {
    entries: Vec<Reference>,
    name_to_id: HashMap<String, i32>,
    id_to_name: HashMap<i32, String>,
}

impl KindMaps {
    fn build(entries: Vec<Reference>) -> Self {
        let name_to_id = entries.iter().map(|r| (r.name.clone(), r.id)).collect();
        let id_to_name = entries.iter().map(|r| (r.id, r.name.clone())).collect();
        KindMaps {
            entries,
            name_to_id,
            id_to_name,
        }
    }
}

/// Process-wide id<->name maps for Channel/Tag/Speaker, built lazily on first
/// access. Catalogue writes carry no invalidation signal, so writers must
/// call `invalidate` themselves.
pub struct ReferenceCache {
    kinds: RwLock<HashMap<RefKind, KindMaps>>,
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceCache {
    pub fn new() -> Self {
        ReferenceCache {
            kinds: RwLock::new(HashMap::new()),
        }
    }

    pub async fn name_to_id(
        &self,
        catalog: &dyn CatalogRepository,
        kind: RefKind,
        name: &str,
    ) -> RepoResult<Option<i32>> {
        self.ensure_loaded(catalog, kind).await?;
        let kinds = self.kinds.read().await;
        Ok(kinds
            .get(&kind)
            .and_then(|maps| maps.name_to_id.get(name).copied()))
    }

    pub async fn id_to_name(
        &self,
        catalog: &dyn CatalogRepository,
        kind: RefKind,
        id: i32,
    ) -> RepoResult<Option<String>> {
        self.ensure_loaded(catalog, kind).await?;
        let kinds = self.kinds.read().await;
        Ok(kinds
            .get(&kind)
            .and_then(|maps| maps.id_to_name.get(&id).cloned()))
    }

    /// All entries of one kind in reference-table order, for zero-filled
    /// facet output.
    pub async fn entries(
        &self,
        catalog: &dyn CatalogRepository,
        kind: RefKind,
    ) -> RepoResult<Vec<Reference>> {
        self.ensure_loaded(catalog, kind).await?;
        let kinds = self.kinds.read().await;
        Ok(kinds
            .get(&kind)
            .map(|maps| maps.entries.clone())
            .unwrap_or_default())
    }

    pub async fn invalidate(&self, kind: RefKind) {
        self.kinds.write().await.remove(&kind);
    }

    pub async fn invalidate_all(&self) {
        self.kinds.write().await.clear();
    }

    async fn ensure_loaded(&self, catalog: &dyn CatalogRepository, kind: RefKind) -> RepoResult<()> {
        if self.kinds.read().await.contains_key(&kind) {
            return Ok(());
        }
        let entries = catalog.reference_entities(kind).await?;
        let mut kinds = self.kinds.write().await;
        // A concurrent request may have loaded the same kind meanwhile.
        kinds.entry(kind).or_insert_with(|| KindMaps::build(entries));
        Ok(())
    }
}

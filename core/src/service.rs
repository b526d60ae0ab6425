use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::catalog::{CatalogFetcher, CatalogService, ListCache, LoadedPlan};
use crate::db::SqliteStore;
use crate::error::{Endpoint, GroceryError};
use crate::merge::MergedView;
use crate::missing::MissingItemsCache;
use crate::models::{ItemId, MissingItem};
use crate::mutator::{LocalConfirmer, MutationOutcome, OptimisticMutator, PurchaseConfirmer};
use crate::notify::{Notice, Notifier, NullNotifier};
use crate::overlay::PurchaseOverlayStore;
use crate::pantry::PantryStore;
use crate::storage::{KeyValueStore, Persistence, StorageUsage};

/// Entry point tying the local stores to the catalog service, the
/// confirmation boundary and the notification channel.
pub struct GroceryService {
    persistence: Persistence,
    overlay: PurchaseOverlayStore,
    pantry: PantryStore,
    missing: MissingItemsCache,
    list_cache: ListCache,
    confirmer: Arc<dyn PurchaseConfirmer>,
    notifier: Arc<dyn Notifier>,
}

impl GroceryService {
    pub fn new(db_path: &str) -> Result<Self> {
        let store = SqliteStore::open(Path::new(db_path))?;
        Ok(Self::with_store(Arc::new(store)))
    }

    pub fn new_in_memory() -> Result<Self> {
        let store = SqliteStore::open_in_memory()?;
        Ok(Self::with_store(Arc::new(store)))
    }

    #[must_use]
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_persistence(Persistence::new(store))
    }

    #[must_use]
    pub fn with_persistence(persistence: Persistence) -> Self {
        Self {
            overlay: PurchaseOverlayStore::new(persistence.clone()),
            pantry: PantryStore::new(persistence.clone()),
            missing: MissingItemsCache::new(persistence.clone()),
            list_cache: ListCache::new(persistence.clone()),
            persistence,
            confirmer: Arc::new(LocalConfirmer),
            notifier: Arc::new(NullNotifier),
        }
    }

    #[must_use]
    pub fn with_confirmer(mut self, confirmer: Arc<dyn PurchaseConfirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn fetcher<'a>(&self, service: &'a dyn CatalogService) -> CatalogFetcher<'a> {
        CatalogFetcher::new(
            service,
            self.overlay.clone(),
            self.list_cache.clone(),
            self.notifier.clone(),
        )
    }

    fn mutator(&self) -> OptimisticMutator {
        OptimisticMutator::new(
            self.confirmer.clone(),
            self.overlay.clone(),
            self.list_cache.clone(),
            self.notifier.clone(),
        )
    }

    // --- Catalog ---

    pub fn load(
        &self,
        service: &dyn CatalogService,
        meal_plan_id: &str,
    ) -> Result<LoadedPlan, GroceryError> {
        self.fetcher(service).load(meal_plan_id)
    }

    /// The last displayed list, without contacting the catalog service.
    #[must_use]
    pub fn cached_view(&self, meal_plan_id: &str) -> Option<MergedView> {
        self.list_cache.merged_view(meal_plan_id, &self.overlay)
    }

    #[must_use]
    pub fn cached_plan(&self, meal_plan_id: &str) -> Option<LoadedPlan> {
        self.cached_view(meal_plan_id).map(LoadedPlan::from_cached_view)
    }

    // --- Purchases ---

    pub fn toggle_item(
        &self,
        plan: &mut LoadedPlan,
        item_id: &ItemId,
        purchased: bool,
    ) -> Result<MutationOutcome, GroceryError> {
        self.mutator().toggle_item(plan, item_id, purchased)
    }

    pub fn bulk_toggle(
        &self,
        plan: &mut LoadedPlan,
        item_ids: &[ItemId],
        purchased: bool,
    ) -> Result<MutationOutcome, GroceryError> {
        self.mutator().bulk_toggle(plan, item_ids, purchased)
    }

    #[must_use]
    pub fn purchased_ids(&self, meal_plan_id: &str) -> Vec<ItemId> {
        self.overlay.purchased_ids(meal_plan_id).into_iter().collect()
    }

    // --- Pantry ---

    #[must_use]
    pub fn pantry_items(&self) -> Vec<String> {
        self.pantry.items()
    }

    pub fn add_pantry_item(&self, name: &str) -> bool {
        self.pantry.add(name)
    }

    pub fn remove_pantry_item(&self, name: &str) -> bool {
        self.pantry.remove(name)
    }

    pub fn clear_pantry(&self) -> bool {
        self.pantry.clear()
    }

    // --- Missing items ---

    /// Ask the catalog service which items `pantry_items` does not cover.
    ///
    /// The pantry used is saved, and a successful result replaces the cached
    /// one. A failed call leaves the cache as it was.
    pub fn find_missing(
        &self,
        service: &dyn CatalogService,
        meal_plan_id: &str,
        pantry_items: &[String],
    ) -> Result<Vec<MissingItem>, GroceryError> {
        self.pantry.set_items(pantry_items);

        match service.missing_items(meal_plan_id, pantry_items) {
            Ok(missing) => {
                self.missing.put(meal_plan_id, &missing);
                self.notifier.notify(Notice::success(format!(
                    "Found {} missing items",
                    missing.len()
                )));
                Ok(missing)
            }
            Err(source) => {
                let err = GroceryError::retrieval(Endpoint::MissingItems, meal_plan_id, source);
                tracing::warn!(meal_plan_id, error = %err, "missing items lookup failed");
                self.notifier
                    .notify(Notice::error("Failed to find missing items"));
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn cached_missing(&self, meal_plan_id: &str) -> Vec<MissingItem> {
        self.missing.get(meal_plan_id)
    }

    #[must_use]
    pub fn missing_last_updated(&self, meal_plan_id: &str) -> Option<DateTime<Utc>> {
        self.missing.last_updated(meal_plan_id)
    }

    // --- Housekeeping ---

    /// Drop the cached list, purchase overlay and missing items of one meal
    /// plan. The pantry is global and is kept.
    pub fn clear_meal_plan(&self, meal_plan_id: &str) {
        self.list_cache.clear(meal_plan_id);
        self.overlay.clear(meal_plan_id);
        self.missing.clear(meal_plan_id);
    }

    pub fn clear_all(&self) -> usize {
        self.persistence.clear_all()
    }

    #[must_use]
    pub fn storage_usage(&self) -> StorageUsage {
        self.persistence.usage()
    }
}

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::{Endpoint, GroceryError};
use crate::merge::{MergedView, merge};
use crate::models::{
    BudgetAlternative, CostEstimate, GroceryCatalog, GrocerySummary, MissingItem, StoreSuggestion,
};
use crate::notify::{Notice, Notifier};
use crate::overlay::PurchaseOverlayStore;
use crate::storage::Persistence;

/// The remote catalog service, read-only apart from the missing-items
/// computation.
///
/// Called synchronously; implementations backed by an async client block on
/// their own runtime.
pub trait CatalogService: Send + Sync {
    fn grocery_list(&self, meal_plan_id: &str) -> Result<GroceryCatalog>;
    fn grocery_summary(&self, meal_plan_id: &str) -> Result<GrocerySummary>;
    fn cost_estimate(&self, meal_plan_id: &str) -> Result<CostEstimate>;
    fn store_suggestions(&self, meal_plan_id: &str) -> Result<Vec<StoreSuggestion>>;
    fn budget_alternatives(&self, meal_plan_id: &str) -> Result<Vec<BudgetAlternative>>;
    fn missing_items(
        &self,
        meal_plan_id: &str,
        pantry_items: &[String],
    ) -> Result<Vec<MissingItem>>;

    /// Retrieve everything a grocery page shows. Fails on the first failing
    /// call; partial results are discarded.
    fn fetch_all(&self, meal_plan_id: &str) -> Result<RemoteBundle, GroceryError> {
        let failed = |endpoint: Endpoint, err: anyhow::Error| {
            GroceryError::retrieval(endpoint, meal_plan_id, err)
        };
        Ok(RemoteBundle {
            catalog: self
                .grocery_list(meal_plan_id)
                .map_err(|e| failed(Endpoint::GroceryList, e))?,
            summary: self
                .grocery_summary(meal_plan_id)
                .map_err(|e| failed(Endpoint::GrocerySummary, e))?,
            cost_estimate: self
                .cost_estimate(meal_plan_id)
                .map_err(|e| failed(Endpoint::CostEstimate, e))?,
            store_suggestions: self
                .store_suggestions(meal_plan_id)
                .map_err(|e| failed(Endpoint::StoreSuggestions, e))?,
            budget_alternatives: self
                .budget_alternatives(meal_plan_id)
                .map_err(|e| failed(Endpoint::BudgetAlternatives, e))?,
        })
    }
}

/// Raw results of the five catalog calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBundle {
    pub catalog: GroceryCatalog,
    pub summary: GrocerySummary,
    pub cost_estimate: CostEstimate,
    pub store_suggestions: Vec<StoreSuggestion>,
    pub budget_alternatives: Vec<BudgetAlternative>,
}

/// In-memory state of one meal plan's grocery page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedPlan {
    pub meal_plan_id: String,
    pub view: MergedView,
    pub summary: GrocerySummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<CostEstimate>,
    #[serde(default)]
    pub store_suggestions: Vec<StoreSuggestion>,
    #[serde(default)]
    pub budget_alternatives: Vec<BudgetAlternative>,
}

impl LoadedPlan {
    /// Rebuild a plan from a cached view alone, as used offline.
    #[must_use]
    pub fn from_cached_view(view: MergedView) -> Self {
        let summary = GrocerySummary {
            total_items: view.total_count,
            purchased_count: view.purchased_count,
            ..GrocerySummary::default()
        };
        Self {
            meal_plan_id: view.meal_plan_id.clone(),
            view,
            summary,
            cost_estimate: None,
            store_suggestions: Vec::new(),
            budget_alternatives: Vec::new(),
        }
    }
}

pub(crate) fn list_key(meal_plan_id: &str) -> String {
    format!("list_{meal_plan_id}")
}

/// Display cache of the last merged view per meal plan.
#[derive(Clone)]
pub struct ListCache {
    persistence: Persistence,
}

impl ListCache {
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    pub fn save(&self, view: &MergedView) -> bool {
        self.persistence
            .write_record(&list_key(&view.meal_plan_id), view)
    }

    #[must_use]
    pub fn get(&self, meal_plan_id: &str) -> Option<MergedView> {
        self.persistence
            .read_record::<MergedView>(&list_key(meal_plan_id))
            .map(|record| record.payload)
    }

    pub fn clear(&self, meal_plan_id: &str) -> bool {
        self.persistence.remove(&list_key(meal_plan_id))
    }

    /// The cached view re-merged with the current overlay, so purchases made
    /// after it was written still show.
    #[must_use]
    pub fn merged_view(
        &self,
        meal_plan_id: &str,
        overlay: &PurchaseOverlayStore,
    ) -> Option<MergedView> {
        let cached = self.get(meal_plan_id)?;
        Some(merge(&cached.catalog(), &overlay.purchased_ids(meal_plan_id)))
    }
}

pub struct CatalogFetcher<'a> {
    service: &'a dyn CatalogService,
    overlay: PurchaseOverlayStore,
    list_cache: ListCache,
    notifier: Arc<dyn Notifier>,
}

impl<'a> CatalogFetcher<'a> {
    #[must_use]
    pub fn new(
        service: &'a dyn CatalogService,
        overlay: PurchaseOverlayStore,
        list_cache: ListCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            service,
            overlay,
            list_cache,
            notifier,
        }
    }

    /// Fetch everything for `meal_plan_id`, overlay the local purchase state
    /// and cache the merged result for offline display.
    pub fn load(&self, meal_plan_id: &str) -> Result<LoadedPlan, GroceryError> {
        let bundle = match self.service.fetch_all(meal_plan_id) {
            Ok(bundle) => bundle,
            Err(err) => {
                tracing::warn!(meal_plan_id, error = %err, "grocery data load failed");
                self.notifier
                    .notify(Notice::error("Failed to load grocery data"));
                return Err(err);
            }
        };

        let mut catalog = bundle.catalog;
        catalog.meal_plan_id = meal_plan_id.to_string();

        let overlay = self.overlay.purchased_ids(meal_plan_id);
        let view = merge(&catalog, &overlay);

        // The server never sees purchase state; its count is replaced by ours.
        let mut summary = bundle.summary;
        summary.purchased_count = view.purchased_count;
        summary.total_items = summary.total_items.max(view.total_count);

        self.list_cache.save(&view);
        tracing::debug!(
            meal_plan_id,
            items = view.total_count,
            purchased = view.purchased_count,
            "grocery list loaded"
        );

        Ok(LoadedPlan {
            meal_plan_id: meal_plan_id.to_string(),
            view,
            summary,
            cost_estimate: Some(bundle.cost_estimate),
            store_suggestions: bundle.store_suggestions,
            budget_alternatives: bundle.budget_alternatives,
        })
    }

    /// The last cached view, re-merged with the current overlay.
    #[must_use]
    pub fn cached_view(&self, meal_plan_id: &str) -> Option<MergedView> {
        self.list_cache.merged_view(meal_plan_id, &self.overlay)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use anyhow::bail;

    use super::*;
    use crate::models::{GroceryCategory, GroceryItem, ItemId};
    use crate::notify::{NoticeLevel, NoticeLog};

    /// Canned catalog service. Any endpoint named in `failing` errors.
    pub(crate) struct StubCatalog {
        pub catalog: GroceryCatalog,
        pub failing: Vec<Endpoint>,
        pub pantry_seen: Mutex<Vec<Vec<String>>>,
    }

    impl StubCatalog {
        pub(crate) fn new(catalog: GroceryCatalog) -> Self {
            Self {
                catalog,
                failing: Vec::new(),
                pantry_seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing_at(mut self, endpoint: Endpoint) -> Self {
            self.failing.push(endpoint);
            self
        }

        fn check(&self, endpoint: Endpoint) -> Result<()> {
            if self.failing.contains(&endpoint) {
                bail!("{endpoint} returned 500");
            }
            Ok(())
        }
    }

    impl CatalogService for StubCatalog {
        fn grocery_list(&self, _meal_plan_id: &str) -> Result<GroceryCatalog> {
            self.check(Endpoint::GroceryList)?;
            Ok(self.catalog.clone())
        }

        fn grocery_summary(&self, _meal_plan_id: &str) -> Result<GrocerySummary> {
            self.check(Endpoint::GrocerySummary)?;
            Ok(GrocerySummary {
                total_items: self.catalog.items().count(),
                purchased_count: 0,
                total_cost: Some(12.5),
                ..GrocerySummary::default()
            })
        }

        fn cost_estimate(&self, _meal_plan_id: &str) -> Result<CostEstimate> {
            self.check(Endpoint::CostEstimate)?;
            Ok(CostEstimate {
                total_cost: 12.5,
                ..CostEstimate::default()
            })
        }

        fn store_suggestions(&self, _meal_plan_id: &str) -> Result<Vec<StoreSuggestion>> {
            self.check(Endpoint::StoreSuggestions)?;
            Ok(vec![StoreSuggestion {
                name: "Local Vegetable Market".to_string(),
                kind: Some("fresh".to_string()),
                price_range: None,
                estimated_total: None,
                distance: None,
                special_offers: Vec::new(),
            }])
        }

        fn budget_alternatives(&self, _meal_plan_id: &str) -> Result<Vec<BudgetAlternative>> {
            self.check(Endpoint::BudgetAlternatives)?;
            Ok(Vec::new())
        }

        fn missing_items(
            &self,
            _meal_plan_id: &str,
            pantry_items: &[String],
        ) -> Result<Vec<MissingItem>> {
            self.check(Endpoint::MissingItems)?;
            if let Ok(mut seen) = self.pantry_seen.lock() {
                seen.push(pantry_items.to_vec());
            }
            Ok(self
                .catalog
                .items()
                .filter(|item| !pantry_items.contains(&item.name))
                .map(|item| MissingItem {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit: item.unit.clone(),
                    priority: item.priority,
                    estimated_cost: item.estimated_cost,
                })
                .collect())
        }
    }

    pub(crate) fn item(id: &str, name: &str) -> GroceryItem {
        GroceryItem {
            id: ItemId::from(id),
            name: name.to_string(),
            quantity: 1.0,
            unit: "pcs".to_string(),
            category: "Produce".to_string(),
            priority: None,
            estimated_cost: None,
        }
    }

    /// Produce: apple(1), milk(2). The server leaves `mealPlanId` blank.
    pub(crate) fn produce_catalog() -> GroceryCatalog {
        GroceryCatalog {
            meal_plan_id: String::new(),
            categories: vec![GroceryCategory {
                name: "Produce".to_string(),
                items: vec![item("1", "apple"), item("2", "milk")],
            }],
        }
    }

    fn fetcher<'a>(
        stub: &'a StubCatalog,
        persistence: &Persistence,
    ) -> (CatalogFetcher<'a>, Arc<NoticeLog>) {
        let notices = Arc::new(NoticeLog::new());
        let fetcher = CatalogFetcher::new(
            stub,
            PurchaseOverlayStore::new(persistence.clone()),
            ListCache::new(persistence.clone()),
            notices.clone(),
        );
        (fetcher, notices)
    }

    fn ids(raw: &[&str]) -> BTreeSet<ItemId> {
        raw.iter().map(|id| ItemId::from(*id)).collect()
    }

    #[test]
    fn test_load_merges_overlay() {
        let persistence = Persistence::in_memory();
        PurchaseOverlayStore::new(persistence.clone()).set_purchased_ids("plan-1", &ids(&["1", "99"]));
        let stub = StubCatalog::new(produce_catalog());
        let (fetcher, notices) = fetcher(&stub, &persistence);

        let plan = fetcher.load("plan-1").unwrap();
        assert_eq!(plan.meal_plan_id, "plan-1");
        assert_eq!(plan.view.meal_plan_id, "plan-1");
        assert_eq!(plan.view.purchased_count, 1);
        assert_eq!(plan.view.total_count, 2);
        assert_eq!(plan.summary.purchased_count, 1);
        assert_eq!(plan.store_suggestions.len(), 1);
        assert!(plan.cost_estimate.is_some());
        assert!(notices.drain().is_empty());
    }

    #[test]
    fn test_load_writes_display_cache() {
        let persistence = Persistence::in_memory();
        let stub = StubCatalog::new(produce_catalog());
        let (fetcher, _) = fetcher(&stub, &persistence);
        let plan = fetcher.load("plan-1").unwrap();

        let cached = ListCache::new(persistence).get("plan-1").unwrap();
        assert_eq!(cached, plan.view);
    }

    #[test]
    fn test_any_failing_call_fails_the_load() {
        for endpoint in [
            Endpoint::GroceryList,
            Endpoint::GrocerySummary,
            Endpoint::CostEstimate,
            Endpoint::StoreSuggestions,
            Endpoint::BudgetAlternatives,
        ] {
            let persistence = Persistence::in_memory();
            let stub = StubCatalog::new(produce_catalog()).failing_at(endpoint);
            let (fetcher, notices) = fetcher(&stub, &persistence);

            let err = fetcher.load("plan-1").unwrap_err();
            match err {
                GroceryError::Retrieval { endpoint: failed, .. } => assert_eq!(failed, endpoint),
                other => panic!("unexpected error: {other}"),
            }
            // No partial data leaks into the display cache
            assert!(ListCache::new(persistence).get("plan-1").is_none());

            let notices = notices.drain();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].level, NoticeLevel::Error);
            assert_eq!(notices[0].message, "Failed to load grocery data");
        }
    }

    #[test]
    fn test_cached_view_reflects_current_overlay() {
        let persistence = Persistence::in_memory();
        let stub = StubCatalog::new(produce_catalog());
        let (fetcher, _) = fetcher(&stub, &persistence);
        fetcher.load("plan-1").unwrap();

        PurchaseOverlayStore::new(persistence.clone()).set_purchased_ids("plan-1", &ids(&["2"]));
        let view = fetcher.cached_view("plan-1").unwrap();
        assert!(view.item(&ItemId::from("2")).unwrap().purchased);
        assert_eq!(view.purchased_count, 1);

        assert!(fetcher.cached_view("plan-2").is_none());
    }

    #[test]
    fn test_loaded_plan_from_cached_view() {
        let view = merge(&produce_catalog(), &ids(&["1"]));
        let plan = LoadedPlan::from_cached_view(view);
        assert_eq!(plan.summary.total_items, 2);
        assert_eq!(plan.summary.purchased_count, 1);
        assert!(plan.cost_estimate.is_none());
    }
}

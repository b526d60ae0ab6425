//! Combine an immutable catalog with the local purchase overlay.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{GroceryCatalog, GroceryCategory, GroceryItem, ItemId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedItem {
    #[serde(flatten)]
    pub item: GroceryItem,
    pub purchased: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedCategory {
    pub name: String,
    pub items: Vec<MergedItem>,
    pub purchased_count: usize,
    pub total_count: usize,
}

/// Display view of a catalog. Derived, never the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedView {
    pub meal_plan_id: String,
    pub categories: Vec<MergedCategory>,
    pub purchased_count: usize,
    pub total_count: usize,
}

/// Flag every catalog item whose id is in `overlay`.
///
/// Overlay ids the catalog does not contain are ignored.
#[must_use]
pub fn merge(catalog: &GroceryCatalog, overlay: &BTreeSet<ItemId>) -> MergedView {
    let categories = catalog
        .categories
        .iter()
        .map(|category| MergedCategory {
            name: category.name.clone(),
            items: category
                .items
                .iter()
                .map(|item| MergedItem {
                    item: item.clone(),
                    purchased: overlay.contains(&item.id),
                })
                .collect(),
            purchased_count: 0,
            total_count: 0,
        })
        .collect();

    let mut view = MergedView {
        meal_plan_id: catalog.meal_plan_id.clone(),
        categories,
        purchased_count: 0,
        total_count: 0,
    };
    view.recount();
    view
}

impl MergedView {
    /// The catalog underneath, with every purchased flag stripped.
    #[must_use]
    pub fn catalog(&self) -> GroceryCatalog {
        GroceryCatalog {
            meal_plan_id: self.meal_plan_id.clone(),
            categories: self
                .categories
                .iter()
                .map(|category| GroceryCategory {
                    name: category.name.clone(),
                    items: category.items.iter().map(|m| m.item.clone()).collect(),
                })
                .collect(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &MergedItem> {
        self.categories.iter().flat_map(|c| c.items.iter())
    }

    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&MergedItem> {
        self.items().find(|m| &m.item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.item(id).is_some()
    }

    /// Ids currently flagged purchased in this view.
    #[must_use]
    pub fn purchased_ids(&self) -> BTreeSet<ItemId> {
        self.items()
            .filter(|m| m.purchased)
            .map(|m| m.item.id.clone())
            .collect()
    }

    /// Set the flag on every item whose id is `id`. Returns the previous flag,
    /// or `None` when no item carries that id.
    pub fn set_purchased(&mut self, id: &ItemId, purchased: bool) -> Option<bool> {
        let mut previous = None;
        for merged in self
            .categories
            .iter_mut()
            .flat_map(|c| c.items.iter_mut())
            .filter(|m| &m.item.id == id)
        {
            previous.get_or_insert(merged.purchased);
            merged.purchased = purchased;
        }
        previous
    }

    /// Recompute every count from the item flags.
    ///
    /// The overall purchased count is taken over distinct ids, so it always
    /// equals `|overlay ∩ catalog ids|` for a freshly merged view.
    pub fn recount(&mut self) {
        for category in &mut self.categories {
            category.total_count = category.items.len();
            category.purchased_count = category.items.iter().filter(|m| m.purchased).count();
        }
        self.total_count = self.categories.iter().map(|c| c.total_count).sum();
        self.purchased_count = self.purchased_ids().len();
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.purchased_count as f64 / self.total_count as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str) -> GroceryItem {
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

    fn produce_catalog() -> GroceryCatalog {
        GroceryCatalog {
            meal_plan_id: "plan-1".to_string(),
            categories: vec![GroceryCategory {
                name: "Produce".to_string(),
                items: vec![item("1", "apple"), item("2", "milk")],
            }],
        }
    }

    fn two_category_catalog() -> GroceryCatalog {
        GroceryCatalog {
            meal_plan_id: "plan-2".to_string(),
            categories: vec![
                GroceryCategory {
                    name: "Produce".to_string(),
                    items: vec![item("1", "apple"), item("2", "spinach")],
                },
                GroceryCategory {
                    name: "Dairy".to_string(),
                    items: vec![item("3", "milk"), item("4", "butter"), item("5", "cream")],
                },
            ],
        }
    }

    fn ids(raw: &[&str]) -> BTreeSet<ItemId> {
        raw.iter().map(|id| ItemId::from(*id)).collect()
    }

    #[test]
    fn test_merge_produce_scenario() {
        let view = merge(&produce_catalog(), &ids(&["1"]));
        let apple = view.item(&ItemId::from("1")).unwrap();
        let milk = view.item(&ItemId::from("2")).unwrap();
        assert!(apple.purchased);
        assert!(!milk.purchased);
        assert_eq!(view.purchased_count, 1);
        assert_eq!(view.total_count, 2);
        assert!((view.progress_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_ignores_orphaned_ids() {
        let view = merge(&produce_catalog(), &ids(&["1", "99"]));
        assert_eq!(view.purchased_count, 1);
        assert!(!view.contains(&ItemId::from("99")));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let overlay = ids(&["2", "4", "42"]);
        let first = merge(&two_category_catalog(), &overlay);
        let second = merge(&first.catalog(), &overlay);
        assert_eq!(first, second);
    }

    #[test]
    fn test_purchased_count_matches_source_sets() {
        let catalog = two_category_catalog();
        let cases: [&[&str]; 4] = [&[], &["1"], &["1", "3", "5"], &["2", "9", "10"]];
        for raw in cases {
            let overlay = ids(raw);
            let catalog_ids: BTreeSet<ItemId> = catalog.items().map(|i| i.id.clone()).collect();
            let expected = overlay.intersection(&catalog_ids).count();
            assert_eq!(merge(&catalog, &overlay).purchased_count, expected);
        }
    }

    #[test]
    fn test_per_category_counts() {
        let view = merge(&two_category_catalog(), &ids(&["1", "3", "4"]));
        assert_eq!(view.categories[0].purchased_count, 1);
        assert_eq!(view.categories[0].total_count, 2);
        assert_eq!(view.categories[1].purchased_count, 2);
        assert_eq!(view.categories[1].total_count, 3);
        assert_eq!(view.purchased_count, 3);
        assert_eq!(view.total_count, 5);
    }

    #[test]
    fn test_same_name_different_ids_stay_separate() {
        let catalog = GroceryCatalog {
            meal_plan_id: "plan-3".to_string(),
            categories: vec![GroceryCategory {
                name: "Dairy".to_string(),
                items: vec![item("10", "milk"), item("11", "milk")],
            }],
        };
        let view = merge(&catalog, &ids(&["10"]));
        assert!(view.item(&ItemId::from("10")).unwrap().purchased);
        assert!(!view.item(&ItemId::from("11")).unwrap().purchased);
        assert_eq!(view.purchased_count, 1);
    }

    #[test]
    fn test_catalog_roundtrip_strips_flags() {
        let catalog = two_category_catalog();
        let view = merge(&catalog, &ids(&["1", "2"]));
        assert_eq!(view.catalog(), catalog);
    }

    #[test]
    fn test_set_purchased_and_recount() {
        let mut view = merge(&produce_catalog(), &ids(&["1"]));
        assert_eq!(view.set_purchased(&ItemId::from("2"), true), Some(false));
        view.recount();
        assert_eq!(view.purchased_count, 2);
        assert_eq!(view.purchased_ids(), ids(&["1", "2"]));

        assert_eq!(view.set_purchased(&ItemId::from("404"), true), None);
    }

    #[test]
    fn test_empty_catalog() {
        let view = merge(&GroceryCatalog::default(), &ids(&["1"]));
        assert_eq!(view.total_count, 0);
        assert_eq!(view.purchased_count, 0);
        assert!(view.progress_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn test_view_serializes_flat_items() {
        let view = merge(&produce_catalog(), &ids(&["1"]));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["categories"][0]["items"][0]["name"], "apple");
        assert_eq!(json["categories"][0]["items"][0]["purchased"], true);
        assert_eq!(json["purchasedCount"], 1);

        let back: MergedView = serde_json::from_value(json).unwrap();
        assert_eq!(back, view);
    }
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a catalog item.
///
/// The catalog service emits ids either as strings or as integers; both are
/// normalized to their string form so overlay sets compare them uniformly.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

/// Read an explicit `null` the same way as a missing field.
///
/// The catalog service sends `null` for unknown quantities, units and lists;
/// one such field must not reject the whole response.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A canonical catalog item. The purchased flag is never part of it; see
/// [`crate::merge::MergedItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryItem {
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryCategory {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<GroceryItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryCatalog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meal_plan_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<GroceryCategory>,
}

impl GroceryCatalog {
    pub fn items(&self) -> impl Iterator<Item = &GroceryItem> {
        self.categories.iter().flat_map(|c| c.items.iter())
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items().any(|item| &item.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrocerySummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_items: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub purchased_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: BTreeMap<String, usize>,
}

impl GrocerySummary {
    /// Shift the displayed purchased count by `delta`, clamped to `0..=total_items`.
    ///
    /// Display shortcut only: the merged view's count is the source of truth.
    pub fn adjust_purchased(&mut self, delta: i64) {
        let current = i64::try_from(self.purchased_count).unwrap_or(i64::MAX);
        let upper = i64::try_from(self.total_items).unwrap_or(i64::MAX);
        let next = current.saturating_add(delta).clamp(0, upper.max(0));
        self.purchased_count = usize::try_from(next).unwrap_or(0);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category_breakdown: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nutrition_coverage: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSuggestion {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub special_offers: Vec<String>,
}

/// A cheaper substitute for a catalog item. Older service versions send
/// `ingredient` / `cheaperAlternative` / `estimatedSavings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlternative {
    #[serde(default, alias = "ingredient", skip_serializing_if = "Option::is_none")]
    pub original_item: Option<String>,
    #[serde(
        default,
        alias = "cheaperAlternative",
        skip_serializing_if = "Option::is_none"
    )]
    pub alternative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(
        default,
        alias = "estimatedSavings",
        skip_serializing_if = "Option::is_none"
    )]
    pub savings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_impact: Option<String>,
}

/// One entry of a mark-purchased request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseUpdate {
    pub id: ItemId,
    pub purchased: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_items: Vec<PurchaseUpdate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_accepts_numbers_and_strings() {
        let ids: Vec<ItemId> = serde_json::from_str(r#"[1, "2", "abc"]"#).unwrap();
        assert_eq!(ids, vec![ItemId::from("1"), ItemId::from("2"), ItemId::from("abc")]);

        // Always written back as strings
        assert_eq!(serde_json::to_string(&ItemId::from("7")).unwrap(), r#""7""#);
    }

    #[test]
    fn test_grocery_item_defaults() {
        let item: GroceryItem = serde_json::from_str(r#"{"id": 3, "name": "Rice"}"#).unwrap();
        assert_eq!(item.id.as_str(), "3");
        assert_eq!(item.quantity, 0.0);
        assert!(item.unit.is_empty());
        assert!(item.priority.is_none());
        assert!(item.estimated_cost.is_none());
    }

    #[test]
    fn test_grocery_item_ignores_server_purchased_flag() {
        let item: GroceryItem = serde_json::from_str(
            r#"{"id": "a", "name": "Milk", "purchased": true, "priority": "high", "estimatedCost": 2.5}"#,
        )
        .unwrap();
        assert_eq!(item.priority, Some(Priority::High));
        assert_eq!(item.estimated_cost, Some(2.5));
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("purchased").is_none());
    }

    #[test]
    fn test_budget_alternative_legacy_field_names() {
        let alt: BudgetAlternative = serde_json::from_str(
            r#"{"ingredient": "Basmati rice", "cheaperAlternative": "Seasonal Basmati rice", "estimatedSavings": 1.25}"#,
        )
        .unwrap();
        assert_eq!(alt.original_item.as_deref(), Some("Basmati rice"));
        assert_eq!(alt.alternative.as_deref(), Some("Seasonal Basmati rice"));
        assert_eq!(alt.savings, Some(1.25));
    }

    #[test]
    fn test_store_suggestion_type_field() {
        let store: StoreSuggestion =
            serde_json::from_str(r#"{"name": "Local Vegetable Market", "type": "fresh"}"#)
                .unwrap();
        assert_eq!(store.kind.as_deref(), Some("fresh"));
        assert!(store.special_offers.is_empty());
    }

    #[test]
    fn test_summary_adjust_clamps() {
        let mut summary = GrocerySummary {
            total_items: 3,
            purchased_count: 1,
            ..GrocerySummary::default()
        };
        summary.adjust_purchased(5);
        assert_eq!(summary.purchased_count, 3);
        summary.adjust_purchased(-10);
        assert_eq!(summary.purchased_count, 0);
        summary.adjust_purchased(2);
        assert_eq!(summary.purchased_count, 2);
    }

    #[test]
    fn test_catalog_contains() {
        let catalog: GroceryCatalog = serde_json::from_str(
            r#"{"categories": [{"name": "Produce", "items": [{"id": 1, "name": "apple"}]}]}"#,
        )
        .unwrap();
        assert!(catalog.meal_plan_id.is_empty());
        assert!(catalog.contains(&ItemId::from("1")));
        assert!(!catalog.contains(&ItemId::from("2")));
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let catalog: GroceryCatalog = serde_json::from_str(
            r#"{"mealPlanId": null, "categories": [{"name": "Produce", "items": [
                {"id": 1, "name": "apple", "quantity": null, "unit": null, "category": null, "priority": null}
            ]}]}"#,
        )
        .unwrap();
        let apple = catalog.items().next().unwrap();
        assert_eq!(apple.quantity, 0.0);
        assert!(apple.unit.is_empty());
        assert!(apple.category.is_empty());
        assert!(apple.priority.is_none());

        let summary: GrocerySummary = serde_json::from_str(
            r#"{"totalItems": 4, "purchasedCount": null, "totalCost": null, "categories": null}"#,
        )
        .unwrap();
        assert_eq!(summary.total_items, 4);
        assert_eq!(summary.purchased_count, 0);
        assert!(summary.categories.is_empty());

        let estimate: CostEstimate = serde_json::from_str(
            r#"{"totalCost": null, "categoryBreakdown": null, "nutritionCoverage": null}"#,
        )
        .unwrap();
        assert_eq!(estimate, CostEstimate::default());

        let store: StoreSuggestion =
            serde_json::from_str(r#"{"name": "Corner", "specialOffers": null}"#).unwrap();
        assert_eq!(store.name, "Corner");
        assert!(store.special_offers.is_empty());

        let missing: MissingItem =
            serde_json::from_str(r#"{"id": null, "name": "salt", "unit": null}"#).unwrap();
        assert_eq!(missing.id, ItemId::default());
    }

    #[test]
    fn test_item_id_new_matches_parsed() {
        let parsed: ItemId = serde_json::from_str("7").unwrap();
        assert_eq!(ItemId::new("7"), parsed);
        assert_eq!(ItemId::new("7").as_str(), "7");
    }

    #[test]
    fn test_null_item_list_is_empty() {
        let catalog: GroceryCatalog =
            serde_json::from_str(r#"{"categories": [{"name": "Dairy", "items": null}]}"#).unwrap();
        assert_eq!(catalog.categories.len(), 1);
        assert_eq!(catalog.items().count(), 0);
    }
}

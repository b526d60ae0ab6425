use std::fmt;

use crate::models::ItemId;
use crate::mutator::MutationState;

/// Catalog service endpoints, used to label retrieval failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    GroceryList,
    GrocerySummary,
    CostEstimate,
    StoreSuggestions,
    BudgetAlternatives,
    MissingItems,
    MarkPurchased,
}

impl Endpoint {
    /// Path segment under `/meal-plans/{id}/`.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::GroceryList => "grocery-list",
            Self::GrocerySummary => "grocery-summary",
            Self::CostEstimate => "cost-estimate",
            Self::StoreSuggestions => "store-suggestions",
            Self::BudgetAlternatives => "budget-alternatives",
            Self::MissingItems => "missing-items",
            Self::MarkPurchased => "mark-purchased",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GroceryError {
    #[error("failed to retrieve {endpoint} for meal plan {meal_plan_id}")]
    Retrieval {
        endpoint: Endpoint,
        meal_plan_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("purchase confirmation failed")]
    Confirmation(#[source] anyhow::Error),

    #[error("item {item_id} is not in the grocery list for meal plan {meal_plan_id}")]
    UnknownItem {
        meal_plan_id: String,
        item_id: ItemId,
    },

    #[error("storage failure for key {key}")]
    Persistence {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed record under key {key}")]
    MalformedData {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("mutation cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        from: MutationState,
        to: MutationState,
    },
}

impl GroceryError {
    pub fn retrieval(
        endpoint: Endpoint,
        meal_plan_id: &str,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Retrieval {
            endpoint,
            meal_plan_id: meal_plan_id.to_string(),
            source: source.into(),
        }
    }
}

use std::collections::BTreeSet;

use crate::models::{ItemId, PurchaseUpdate};
use crate::storage::{ItemsPayload, Persistence};

pub(crate) fn purchased_key(meal_plan_id: &str) -> String {
    format!("purchased_{meal_plan_id}")
}

/// Per-meal-plan set of item ids the user has marked purchased.
#[derive(Clone)]
pub struct PurchaseOverlayStore {
    persistence: Persistence,
}

impl PurchaseOverlayStore {
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    /// Empty when nothing was stored or the record is unreadable.
    #[must_use]
    pub fn purchased_ids(&self, meal_plan_id: &str) -> BTreeSet<ItemId> {
        self.persistence
            .read_record::<ItemsPayload<ItemId>>(&purchased_key(meal_plan_id))
            .map(|record| record.payload.items.into_iter().collect())
            .unwrap_or_default()
    }

    /// Replace the whole set for `meal_plan_id`.
    pub fn set_purchased_ids(&self, meal_plan_id: &str, ids: &BTreeSet<ItemId>) -> bool {
        let payload = ItemsPayload {
            items: ids.iter().collect::<Vec<_>>(),
        };
        self.persistence
            .write_record(&purchased_key(meal_plan_id), &payload)
    }

    /// Apply `updates` to the currently stored set and write the result back.
    ///
    /// The set is re-read here rather than taken from the caller, so two
    /// commits in a row never lose each other's ids.
    pub fn apply(&self, meal_plan_id: &str, updates: &[PurchaseUpdate]) -> BTreeSet<ItemId> {
        let mut ids = self.purchased_ids(meal_plan_id);
        for update in updates {
            if update.purchased {
                ids.insert(update.id.clone());
            } else {
                ids.remove(&update.id);
            }
        }
        if !self.set_purchased_ids(meal_plan_id, &ids) {
            tracing::warn!(meal_plan_id, "purchased items were not saved");
        }
        ids
    }

    pub fn clear(&self, meal_plan_id: &str) -> bool {
        self.persistence.remove(&purchased_key(meal_plan_id))
    }
}

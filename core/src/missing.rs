use chrono::{DateTime, Utc};

use crate::models::MissingItem;
use crate::storage::{ItemsPayload, Persistence};

pub(crate) fn missing_key(meal_plan_id: &str) -> String {
    format!("missing_{meal_plan_id}")
}

/// Last successful missing-items result per meal plan. Never invalidated on
/// its own; only a newer successful computation replaces it.
#[derive(Clone)]
pub struct MissingItemsCache {
    persistence: Persistence,
}

impl MissingItemsCache {
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    #[must_use]
    pub fn get(&self, meal_plan_id: &str) -> Vec<MissingItem> {
        self.persistence
            .read_record::<ItemsPayload<MissingItem>>(&missing_key(meal_plan_id))
            .map(|record| record.payload.items)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn last_updated(&self, meal_plan_id: &str) -> Option<DateTime<Utc>> {
        self.persistence
            .read_record::<ItemsPayload<MissingItem>>(&missing_key(meal_plan_id))
            .map(|record| record.last_updated)
    }

    pub fn put(&self, meal_plan_id: &str, items: &[MissingItem]) -> bool {
        self.persistence
            .write_record(
                &missing_key(meal_plan_id),
                &ItemsPayload {
                    items: items.iter().collect::<Vec<_>>(),
                },
            )
    }

    pub fn clear(&self, meal_plan_id: &str) -> bool {
        self.persistence.remove(&missing_key(meal_plan_id))
    }
}

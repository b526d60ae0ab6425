use crate::storage::{ItemsPayload, Persistence};

const PANTRY_KEY: &str = "pantry";

/// Trim a user-entered pantry name. `None` for blank input.
///
/// This is the only normalization applied: matching is exact and
/// case-sensitive, so "Milk" and "milk" are different entries.
#[must_use]
pub fn normalize_pantry_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Global, insertion-ordered list of pantry item names.
#[derive(Clone)]
pub struct PantryStore {
    persistence: Persistence,
}

impl PantryStore {
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    #[must_use]
    pub fn items(&self) -> Vec<String> {
        self.persistence
            .read_record::<ItemsPayload<String>>(PANTRY_KEY)
            .map(|record| record.payload.items)
            .unwrap_or_default()
    }

    /// Full replace. Duplicates in `names` are dropped, first occurrence wins.
    pub fn set_items(&self, names: &[String]) -> bool {
        let mut items: Vec<&String> = Vec::with_capacity(names.len());
        for name in names {
            if !items.contains(&name) {
                items.push(name);
            }
        }
        self.persistence
            .write_record(PANTRY_KEY, &ItemsPayload { items })
    }

    /// Append `name` unless it is already present. Returns whether it was added.
    pub fn add(&self, name: &str) -> bool {
        let mut items = self.items();
        if items.iter().any(|existing| existing == name) {
            return false;
        }
        items.push(name.to_string());
        self.set_items(&items)
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut items = self.items();
        let before = items.len();
        items.retain(|existing| existing != name);
        if items.len() == before {
            return false;
        }
        self.set_items(&items)
    }

    pub fn clear(&self) -> bool {
        self.persistence.remove(PANTRY_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::failing;

    #[test]
    fn test_empty_pantry() {
        let pantry = PantryStore::new(Persistence::in_memory());
        assert!(pantry.items().is_empty());
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let pantry = PantryStore::new(Persistence::in_memory());
        assert!(pantry.add("Salt"));
        assert!(pantry.add("Olive Oil"));
        assert!(pantry.add("Eggs"));
        assert_eq!(pantry.items(), vec!["Salt", "Olive Oil", "Eggs"]);
    }

    #[test]
    fn test_add_existing_is_noop() {
        let pantry = PantryStore::new(Persistence::in_memory());
        pantry.add("Salt");
        pantry.add("Pepper");
        let before = pantry.items().len();

        assert!(!pantry.add("Salt"));
        assert_eq!(pantry.items().len(), before);
        assert_eq!(pantry.items(), vec!["Salt", "Pepper"]);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let pantry = PantryStore::new(Persistence::in_memory());
        assert!(pantry.add("Milk"));
        assert!(pantry.add("milk"));
        assert_eq!(pantry.items().len(), 2);
    }

    #[test]
    fn test_remove() {
        let pantry = PantryStore::new(Persistence::in_memory());
        pantry.add("Salt");
        pantry.add("Rice");
        assert!(pantry.remove("Salt"));
        assert!(!pantry.remove("Salt"));
        assert_eq!(pantry.items(), vec!["Rice"]);
    }

    #[test]
    fn test_set_items_drops_duplicates() {
        let pantry = PantryStore::new(Persistence::in_memory());
        let names: Vec<String> = ["Rice", "Pasta", "Rice"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(pantry.set_items(&names));
        assert_eq!(pantry.items(), vec!["Rice", "Pasta"]);
    }

    #[test]
    fn test_clear() {
        let pantry = PantryStore::new(Persistence::in_memory());
        pantry.add("Flour");
        assert!(pantry.clear());
        assert!(pantry.items().is_empty());
    }

    #[test]
    fn test_normalize_pantry_name() {
        assert_eq!(normalize_pantry_name("  Garlic \n").as_deref(), Some("Garlic"));
        assert!(normalize_pantry_name("   ").is_none());
        assert!(normalize_pantry_name("").is_none());
    }

    #[test]
    fn test_failing_storage() {
        let pantry = PantryStore::new(failing());
        assert!(pantry.items().is_empty());
        assert!(!pantry.add("Salt"));
    }
}

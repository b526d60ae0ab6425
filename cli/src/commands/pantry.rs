use anyhow::{Result, bail};
use serde_json::json;

use grocer_core::pantry::normalize_pantry_name;
use grocer_core::service::GroceryService;

use super::helpers::print_json;

pub(crate) fn cmd_pantry_add(svc: &GroceryService, name: &str, json: bool) -> Result<()> {
    let Some(name) = normalize_pantry_name(name) else {
        bail!("Pantry item name cannot be empty");
    };
    let added = svc.add_pantry_item(&name);

    if json {
        return print_json(&json!({ "name": name, "added": added, "items": svc.pantry_items() }));
    }
    if added {
        println!("Added '{name}' to pantry");
    } else {
        println!("'{name}' is already in the pantry");
    }
    Ok(())
}

pub(crate) fn cmd_pantry_remove(svc: &GroceryService, name: &str, json: bool) -> Result<()> {
    let name = name.trim();
    let removed = svc.remove_pantry_item(name);

    if json {
        return print_json(&json!({ "name": name, "removed": removed, "items": svc.pantry_items() }));
    }
    if removed {
        println!("Removed '{name}' from pantry");
    } else {
        eprintln!("'{name}' is not in the pantry");
    }
    Ok(())
}

pub(crate) fn cmd_pantry_list(svc: &GroceryService, json: bool) -> Result<()> {
    let items = svc.pantry_items();

    if json {
        return print_json(&json!({ "items": items }));
    }
    if items.is_empty() {
        eprintln!("Pantry is empty");
        return Ok(());
    }
    for item in &items {
        println!("  - {item}");
    }
    Ok(())
}

pub(crate) fn cmd_pantry_clear(svc: &GroceryService, json: bool) -> Result<()> {
    let cleared = svc.clear_pantry();

    if json {
        return print_json(&json!({ "cleared": cleared }));
    }
    if cleared {
        println!("Pantry cleared");
    } else {
        println!("Pantry was already empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_absent_item_is_not_an_error() {
        let svc = GroceryService::new_in_memory().unwrap();
        assert!(cmd_pantry_remove(&svc, "saffron", false).is_ok());
        assert!(cmd_pantry_remove(&svc, "saffron", true).is_ok());
    }

    #[test]
    fn test_remove_trims_name() {
        let svc = GroceryService::new_in_memory().unwrap();
        cmd_pantry_add(&svc, "salt", false).unwrap();
        cmd_pantry_remove(&svc, "  salt ", false).unwrap();
        assert!(svc.pantry_items().is_empty());
    }

    #[test]
    fn test_add_rejects_blank_name() {
        let svc = GroceryService::new_in_memory().unwrap();
        assert!(cmd_pantry_add(&svc, "   ", false).is_err());
    }
}

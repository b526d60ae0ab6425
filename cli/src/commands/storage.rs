use anyhow::{Result, bail};
use serde_json::json;

use grocer_core::service::GroceryService;

use super::helpers::print_json;

pub(crate) fn cmd_clear(
    svc: &GroceryService,
    meal_plan_id: Option<&str>,
    all: bool,
    json: bool,
) -> Result<()> {
    match (meal_plan_id, all) {
        (_, true) => {
            let removed = svc.clear_all();
            if json {
                return print_json(&json!({ "removedKeys": removed }));
            }
            println!("Cleared all local grocery data ({removed} entries)");
        }
        (Some(id), false) => {
            svc.clear_meal_plan(id);
            if json {
                return print_json(&json!({ "mealPlanId": id, "cleared": true }));
            }
            println!("Cleared local data for meal plan {id}");
        }
        (None, false) => bail!("Give a meal plan id or --all"),
    }
    Ok(())
}

pub(crate) fn cmd_storage(svc: &GroceryService, json: bool) -> Result<()> {
    let usage = svc.storage_usage();

    if json {
        return print_json(&json!({
            "keyCount": usage.key_count,
            "totalBytes": usage.total_bytes,
            "formattedSize": usage.formatted_size(),
        }));
    }
    println!("Entries: {}", usage.key_count);
    println!("Size:    {}", usage.formatted_size());
    Ok(())
}

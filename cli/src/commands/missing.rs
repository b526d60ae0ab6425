use anyhow::Result;
use serde::Serialize;

use grocer_core::models::MissingItem;
use grocer_core::service::GroceryService;

use super::helpers::{print_json, print_missing_table};
use crate::client::Remote;

pub(crate) fn cmd_missing(
    svc: &GroceryService,
    remote: &Remote,
    meal_plan_id: &str,
    cached: bool,
    json: bool,
) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Output<'a> {
        meal_plan_id: &'a str,
        pantry_items: Vec<String>,
        missing: &'a [MissingItem],
        #[serde(skip_serializing_if = "Option::is_none")]
        last_updated: Option<String>,
    }

    let pantry = svc.pantry_items();
    let missing = if cached {
        svc.cached_missing(meal_plan_id)
    } else {
        svc.find_missing(remote.client()?.as_ref(), meal_plan_id, &pantry)?
    };
    let last_updated = svc
        .missing_last_updated(meal_plan_id)
        .map(|t| t.to_rfc3339());

    if json {
        return print_json(&Output {
            meal_plan_id,
            pantry_items: pantry,
            missing: &missing,
            last_updated,
        });
    }

    if missing.is_empty() {
        if cached && last_updated.is_none() {
            eprintln!("No cached missing items for meal plan {meal_plan_id}");
        } else {
            println!("Your pantry covers everything on this list");
        }
        return Ok(());
    }

    if cached {
        if let Some(at) = &last_updated {
            println!("Cached result from {at}");
        }
    }
    print_missing_table(&missing);
    Ok(())
}

use anyhow::Result;

use grocer_core::service::GroceryService;

use super::helpers::{load_plan, print_json, print_view};
use crate::client::Remote;

pub(crate) fn cmd_list(
    svc: &GroceryService,
    remote: &Remote,
    meal_plan_id: &str,
    offline: bool,
    json: bool,
) -> Result<()> {
    let plan = load_plan(svc, remote, meal_plan_id, offline)?;

    if json {
        return print_json(&plan.view);
    }

    if plan.view.total_count == 0 {
        eprintln!("No grocery items for meal plan {meal_plan_id}");
        return Ok(());
    }

    print_view(&plan.view);
    Ok(())
}

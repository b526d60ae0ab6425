use anyhow::{Result, bail};
use serde::Serialize;

use grocer_core::mutator::MutationOutcome;
use grocer_core::service::GroceryService;

use super::helpers::{load_plan, parse_item_ids, print_json, progress_line};
use crate::client::Remote;

/// Mark one or more items purchased (or not). A single id is a toggle, more
/// than one is a bulk change confirmed as a unit.
pub(crate) fn cmd_set_purchased(
    svc: &GroceryService,
    remote: &Remote,
    meal_plan_id: &str,
    raw_ids: &[String],
    purchased: bool,
    offline: bool,
    json: bool,
) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Output<'a> {
        #[serde(flatten)]
        outcome: &'a MutationOutcome,
        purchased_count: usize,
        total_count: usize,
    }

    let ids = parse_item_ids(raw_ids);
    if ids.is_empty() {
        bail!("No item ids given");
    }

    let mut plan = load_plan(svc, remote, meal_plan_id, offline)?;
    let outcome = match ids.as_slice() {
        [id] => svc.toggle_item(&mut plan, id, purchased)?,
        _ => svc.bulk_toggle(&mut plan, &ids, purchased)?,
    };

    if json {
        print_json(&Output {
            outcome: &outcome,
            purchased_count: plan.view.purchased_count,
            total_count: plan.view.total_count,
        })
    } else {
        println!("{}", progress_line(&plan.view));
        Ok(())
    }
}

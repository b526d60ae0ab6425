use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use grocer_core::models::{BudgetAlternative, CostEstimate, GrocerySummary, StoreSuggestion};
use grocer_core::service::GroceryService;

use super::helpers::{format_cost, print_json, progress_line, truncate};
use crate::client::Remote;

/// Summary, cost estimate, store suggestions and budget alternatives.
pub(crate) fn cmd_overview(
    svc: &GroceryService,
    remote: &Remote,
    meal_plan_id: &str,
    json: bool,
) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Output<'a> {
        meal_plan_id: &'a str,
        summary: &'a GrocerySummary,
        cost_estimate: Option<&'a CostEstimate>,
        store_suggestions: &'a [StoreSuggestion],
        budget_alternatives: &'a [BudgetAlternative],
    }

    let client = remote.client()?;
    let plan = svc.load(client.as_ref(), meal_plan_id)?;

    if json {
        return print_json(&Output {
            meal_plan_id,
            summary: &plan.summary,
            cost_estimate: plan.cost_estimate.as_ref(),
            store_suggestions: &plan.store_suggestions,
            budget_alternatives: &plan.budget_alternatives,
        });
    }

    println!("=== Meal plan {meal_plan_id} ===\n");
    println!("  {}", progress_line(&plan.view));
    if let Some(total) = plan.summary.total_cost {
        println!("  Total cost:  ${total:.2}");
    }

    if let Some(estimate) = &plan.cost_estimate {
        print_cost_estimate(estimate);
    }
    if !plan.store_suggestions.is_empty() {
        print_stores(&plan.store_suggestions);
    }
    if !plan.budget_alternatives.is_empty() {
        print_alternatives(&plan.budget_alternatives);
    }
    Ok(())
}

fn print_cost_estimate(estimate: &CostEstimate) {
    let level = estimate
        .budget_level
        .as_deref()
        .map(|l| format!(" ({l} budget)"))
        .unwrap_or_default();
    println!("\n  ESTIMATED COST: ${:.2}{level}", estimate.total_cost);
    for (category, cost) in &estimate.category_breakdown {
        println!("    {category:<20} ${cost:>8.2}");
    }
    if !estimate.nutrition_coverage.is_empty() {
        let coverage: Vec<String> = estimate
            .nutrition_coverage
            .iter()
            .map(|(k, v)| format!("{k} {v:.0}%"))
            .collect();
        println!("    Nutrition coverage: {}", coverage.join(", "));
    }
}

fn print_stores(stores: &[StoreSuggestion]) {
    #[derive(Tabled)]
    struct StoreRow {
        #[tabled(rename = "Store")]
        name: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Price")]
        price_range: String,
        #[tabled(rename = "Distance")]
        distance: String,
        #[tabled(rename = "Est. total")]
        total: String,
        #[tabled(rename = "Offers")]
        offers: String,
    }

    let rows: Vec<StoreRow> = stores
        .iter()
        .map(|s| StoreRow {
            name: truncate(&s.name, 30),
            kind: s.kind.clone().unwrap_or_default(),
            price_range: s.price_range.clone().unwrap_or_default(),
            distance: s.distance.clone().unwrap_or_default(),
            total: format_cost(s.estimated_total),
            offers: truncate(&s.special_offers.join("; "), 40),
        })
        .collect();

    println!("\n  STORES");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn print_alternatives(alternatives: &[BudgetAlternative]) {
    println!("\n  BUDGET ALTERNATIVES");
    for alt in alternatives {
        let original = alt.original_item.as_deref().unwrap_or("?");
        let cheaper = alt.alternative.as_deref().unwrap_or("?");
        let savings = match (alt.savings, alt.savings_percentage) {
            (Some(s), Some(p)) => format!(" (save ${s:.2}, {p:.0}%)"),
            (Some(s), None) => format!(" (save ${s:.2})"),
            (None, Some(p)) => format!(" (save {p:.0}%)"),
            (None, None) => String::new(),
        };
        println!("    {original} -> {cheaper}{savings}");
        if let Some(reason) = &alt.reason {
            println!("      {reason}");
        }
    }
}

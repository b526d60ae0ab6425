use anyhow::{Context, Result};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use grocer_core::catalog::LoadedPlan;
use grocer_core::merge::MergedView;
use grocer_core::models::{ItemId, MissingItem};
use grocer_core::notify::{Notice, NoticeLevel, Notifier};
use grocer_core::service::GroceryService;

use crate::client::Remote;

/// Prints notices to the terminal. With `--json` everything goes to stderr
/// so stdout stays machine-readable.
pub(crate) struct ConsoleNotifier {
    pub json: bool,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success if !self.json => println!("{}", notice.message),
            NoticeLevel::Success => eprintln!("{}", notice.message),
            NoticeLevel::Error => eprintln!("Error: {}", notice.message),
        }
    }
}

/// Load a plan from the catalog service, or from the local cache with `offline`.
pub(crate) fn load_plan(
    svc: &GroceryService,
    remote: &Remote,
    meal_plan_id: &str,
    offline: bool,
) -> Result<LoadedPlan> {
    if offline {
        return svc.cached_plan(meal_plan_id).with_context(|| {
            format!("No cached grocery list for meal plan '{meal_plan_id}'; run without --offline first")
        });
    }
    let client = remote.client()?;
    Ok(svc.load(client.as_ref(), meal_plan_id)?)
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn parse_item_ids(raw: &[String]) -> Vec<ItemId> {
    raw.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(ItemId::from)
        .collect()
}

pub(crate) fn format_cost(cost: Option<f64>) -> String {
    cost.map_or_else(|| "-".to_string(), |c| format!("${c:.2}"))
}

pub(crate) fn format_quantity(quantity: f64, unit: &str) -> String {
    let qty = if quantity.fract() == 0.0 {
        format!("{quantity:.0}")
    } else {
        format!("{quantity}")
    };
    if unit.is_empty() {
        qty
    } else {
        format!("{qty} {unit}")
    }
}

pub(crate) fn progress_line(view: &MergedView) -> String {
    format!(
        "{}/{} purchased ({:.0}%)",
        view.purchased_count,
        view.total_count,
        view.progress_percent()
    )
}

pub(crate) fn print_view(view: &MergedView) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = " ")]
        check: &'static str,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Priority")]
        priority: String,
        #[tabled(rename = "Est. cost")]
        cost: String,
    }

    println!("=== Meal plan {} ===", view.meal_plan_id);
    println!("{}\n", progress_line(view));

    for category in &view.categories {
        println!(
            "  {} ({}/{})",
            category.name, category.purchased_count, category.total_count
        );
        let rows: Vec<ItemRow> = category
            .items
            .iter()
            .map(|m| ItemRow {
                check: if m.purchased { "[x]" } else { "[ ]" },
                id: m.item.id.to_string(),
                name: truncate(&m.item.name, 35),
                quantity: format_quantity(m.item.quantity, &m.item.unit),
                priority: m.item.priority.map(|p| p.to_string()).unwrap_or_default(),
                cost: format_cost(m.item.estimated_cost),
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(5..6)).with(Alignment::right()))
            .to_string();
        println!("{table}\n");
    }
}

pub(crate) fn print_missing_table(items: &[MissingItem]) {
    #[derive(Tabled)]
    struct MissingRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Priority")]
        priority: String,
        #[tabled(rename = "Est. cost")]
        cost: String,
    }

    let rows: Vec<MissingRow> = items
        .iter()
        .map(|m| MissingRow {
            name: truncate(&m.name, 35),
            quantity: format_quantity(m.quantity, &m.unit),
            priority: m.priority.map(|p| p.to_string()).unwrap_or_default(),
            cost: format_cost(m.estimated_cost),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

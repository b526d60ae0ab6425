//! Optimistic purchase toggles.
//!
//! A [`Mutation`] is applied to the in-memory view first, then sent through
//! the [`PurchaseConfirmer`]. Only a confirmed mutation reaches the overlay
//! store; a rejected one restores the flags it captured before applying.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::catalog::{ListCache, LoadedPlan};
use crate::error::GroceryError;
use crate::merge::MergedView;
use crate::models::{ConfirmResponse, ItemId, PurchaseUpdate};
use crate::notify::{Notice, Notifier};
use crate::overlay::PurchaseOverlayStore;

/// Seam between the mutator and whoever acknowledges purchase changes.
pub trait PurchaseConfirmer: Send + Sync {
    fn confirm(&self, meal_plan_id: &str, items: &[PurchaseUpdate]) -> Result<ConfirmResponse>;
}

/// Client-side confirmation: there is no backend write, so it always succeeds.
pub struct LocalConfirmer;

impl PurchaseConfirmer for LocalConfirmer {
    fn confirm(&self, _meal_plan_id: &str, items: &[PurchaseUpdate]) -> Result<ConfirmResponse> {
        Ok(ConfirmResponse {
            message: format!("{} items updated", items.len()),
            updated_items: items.to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

/// One purchase change over a set of ids, with the flags it replaced.
#[derive(Debug, Clone)]
pub struct Mutation {
    meal_plan_id: String,
    updates: Vec<PurchaseUpdate>,
    previous: Vec<(ItemId, bool)>,
    state: MutationState,
}

impl Mutation {
    /// Duplicate ids collapse into one update.
    #[must_use]
    pub fn new(meal_plan_id: &str, ids: impl IntoIterator<Item = ItemId>, purchased: bool) -> Self {
        let ids: BTreeSet<ItemId> = ids.into_iter().collect();
        Self {
            meal_plan_id: meal_plan_id.to_string(),
            updates: ids
                .into_iter()
                .map(|id| PurchaseUpdate { id, purchased })
                .collect(),
            previous: Vec::new(),
            state: MutationState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> MutationState {
        self.state
    }

    #[must_use]
    pub fn updates(&self) -> &[PurchaseUpdate] {
        &self.updates
    }

    /// Signed number of flags this mutation actually flipped.
    #[must_use]
    pub fn delta(&self) -> i64 {
        let flipped = self
            .previous
            .iter()
            .zip(&self.updates)
            .filter(|((_, before), update)| *before != update.purchased)
            .count();
        let flipped = i64::try_from(flipped).unwrap_or(i64::MAX);
        match self.updates.first() {
            Some(update) if !update.purchased => -flipped,
            _ => flipped,
        }
    }

    fn transition(&mut self, from: MutationState, to: MutationState) -> Result<(), GroceryError> {
        if self.state != from {
            return Err(GroceryError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Idle -> Pending. Every id must be in `view`; otherwise nothing changes.
    pub fn apply(&mut self, view: &mut MergedView) -> Result<(), GroceryError> {
        if self.state != MutationState::Idle {
            return Err(GroceryError::InvalidTransition {
                from: self.state,
                to: MutationState::Pending,
            });
        }
        if let Some(unknown) = self.updates.iter().find(|u| !view.contains(&u.id)) {
            return Err(GroceryError::UnknownItem {
                meal_plan_id: self.meal_plan_id.clone(),
                item_id: unknown.id.clone(),
            });
        }

        self.previous = self
            .updates
            .iter()
            .filter_map(|u| {
                view.set_purchased(&u.id, u.purchased)
                    .map(|before| (u.id.clone(), before))
            })
            .collect();
        view.recount();
        self.transition(MutationState::Idle, MutationState::Pending)
    }

    /// Pending -> Committed. Writes the updates into the stored overlay.
    pub fn commit(
        &mut self,
        overlay: &PurchaseOverlayStore,
    ) -> Result<BTreeSet<ItemId>, GroceryError> {
        self.transition(MutationState::Pending, MutationState::Committed)?;
        Ok(overlay.apply(&self.meal_plan_id, &self.updates))
    }

    /// Pending -> RolledBack. Restores the captured flags in `view`.
    pub fn roll_back(&mut self, view: &mut MergedView) -> Result<(), GroceryError> {
        self.transition(MutationState::Pending, MutationState::RolledBack)?;
        for (id, before) in &self.previous {
            view.set_purchased(id, *before);
        }
        view.recount();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MutationOutcome {
    pub state: MutationState,
    pub updated: Vec<PurchaseUpdate>,
    pub message: String,
}

pub struct OptimisticMutator {
    confirmer: Arc<dyn PurchaseConfirmer>,
    overlay: PurchaseOverlayStore,
    list_cache: ListCache,
    notifier: Arc<dyn Notifier>,
}

impl OptimisticMutator {
    #[must_use]
    pub fn new(
        confirmer: Arc<dyn PurchaseConfirmer>,
        overlay: PurchaseOverlayStore,
        list_cache: ListCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            confirmer,
            overlay,
            list_cache,
            notifier,
        }
    }

    pub fn toggle_item(
        &self,
        plan: &mut LoadedPlan,
        item_id: &ItemId,
        purchased: bool,
    ) -> Result<MutationOutcome, GroceryError> {
        let mutation = Mutation::new(&plan.meal_plan_id, [item_id.clone()], purchased);
        let success = if purchased {
            "Item marked as purchased".to_string()
        } else {
            "Item marked as not purchased".to_string()
        };
        self.run(plan, mutation, success, "Failed to update item status")
    }

    /// Toggle every id in `item_ids` with a single confirmation. The batch
    /// commits or rolls back as a whole.
    pub fn bulk_toggle(
        &self,
        plan: &mut LoadedPlan,
        item_ids: &[ItemId],
        purchased: bool,
    ) -> Result<MutationOutcome, GroceryError> {
        let mutation = Mutation::new(&plan.meal_plan_id, item_ids.iter().cloned(), purchased);
        let count = mutation.updates().len();
        let success = if purchased {
            format!("{count} items marked as purchased")
        } else {
            format!("{count} items marked as not purchased")
        };
        self.run(plan, mutation, success, "Failed to update items status")
    }

    fn run(
        &self,
        plan: &mut LoadedPlan,
        mut mutation: Mutation,
        success: String,
        failure: &str,
    ) -> Result<MutationOutcome, GroceryError> {
        if mutation.updates().is_empty() {
            return Ok(MutationOutcome {
                state: mutation.state(),
                updated: Vec::new(),
                message: "Nothing to update".to_string(),
            });
        }

        if let Err(err) = mutation.apply(&mut plan.view) {
            self.notifier.notify(Notice::error(format!("{failure}: {err}")));
            return Err(err);
        }

        match self.confirmer.confirm(&plan.meal_plan_id, mutation.updates()) {
            Ok(response) => {
                let stored = mutation.commit(&self.overlay)?;
                plan.summary.adjust_purchased(mutation.delta());
                self.list_cache.save(&plan.view);
                tracing::info!(
                    meal_plan_id = %plan.meal_plan_id,
                    updated = mutation.updates().len(),
                    purchased_total = stored.len(),
                    confirmation = %response.message,
                    "purchase change committed"
                );
                self.notifier.notify(Notice::success(success.clone()));
                Ok(MutationOutcome {
                    state: mutation.state(),
                    updated: mutation.updates().to_vec(),
                    message: success,
                })
            }
            Err(source) => {
                mutation.roll_back(&mut plan.view)?;
                tracing::warn!(
                    meal_plan_id = %plan.meal_plan_id,
                    error = %source,
                    "purchase change rolled back"
                );
                self.notifier
                    .notify(Notice::error(format!("{failure}: {source:#}")));
                Err(GroceryError::Confirmation(source))
            }
        }
    }
}

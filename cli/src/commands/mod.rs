mod helpers;
mod list;
mod missing;
mod overview;
mod pantry;
mod purchase;
mod storage;

pub(crate) use helpers::ConsoleNotifier;
pub(crate) use list::cmd_list;
pub(crate) use missing::cmd_missing;
pub(crate) use overview::cmd_overview;
pub(crate) use pantry::{cmd_pantry_add, cmd_pantry_clear, cmd_pantry_list, cmd_pantry_remove};
pub(crate) use purchase::cmd_set_purchased;
pub(crate) use storage::{cmd_clear, cmd_storage};

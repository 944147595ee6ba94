//! Runnability predicate (spec §4.6.1): an item is runnable iff its state
//! is not `done`, every dependency is present and `done`, no worker
//! currently holds its claim, and it has not already failed (non-healably)
//! within this session (spec §4.6.3 "the item is not retried within the
//! same session unless Doctor healing applies").

use std::collections::{HashMap, HashSet};

use crate::artifact::index::IndexItem;
use crate::workflow::state::ItemState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runnability {
    Runnable,
    Done,
    Blocked,
    Claimed,
    Failed,
}

/// Evaluate runnability for one item against the current index snapshot,
/// the set of ids currently claimed by other workers, and the set of ids
/// this session has already given up on.
pub fn runnability(
    item: &IndexItem,
    index: &HashMap<String, ItemState>,
    claimed: &HashSet<String>,
    failed: &HashSet<String>,
) -> Runnability {
    if item.state.is_terminal() {
        return Runnability::Done;
    }
    if failed.contains(&item.id) {
        return Runnability::Failed;
    }
    if claimed.contains(&item.id) {
        return Runnability::Claimed;
    }
    let unmet = item
        .depends_on
        .iter()
        .any(|dep| index.get(dep) != Some(&ItemState::Done));
    if unmet {
        return Runnability::Blocked;
    }
    Runnability::Runnable
}

/// Select runnable items in ascending-id order (spec §4.6.2 "Selection
/// order among runnable items: ascending by id, stable, total order").
pub fn select_runnable(items: &[IndexItem], claimed: &HashSet<String>, failed: &HashSet<String>) -> Vec<String> {
    let index: HashMap<String, ItemState> = items.iter().map(|i| (i.id.clone(), i.state)).collect();
    let mut runnable: Vec<String> = items
        .iter()
        .filter(|i| runnability(i, &index, claimed, failed) == Runnability::Runnable)
        .map(|i| i.id.clone())
        .collect();
    runnable.sort();
    runnable
}

//! The derived `Index` (spec §3 "Index"): an O(1)-scannable cache of the
//! Item files, owned by the Orchestrator's write path.

use serde::{Deserialize, Serialize};

use crate::artifact::item::Item;
use crate::workflow::state::ItemState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexItem {
    pub id: String,
    pub state: ItemState,
    pub title: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl From<&Item> for IndexItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            state: item.state,
            title: item.title.clone(),
            depends_on: item.depends_on.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    pub items: Vec<IndexItem>,
}

impl Index {
    pub fn rebuild_from(items: &[Item]) -> Self {
        let mut index_items: Vec<IndexItem> = items.iter().map(IndexItem::from).collect();
        index_items.sort_by(|a, b| a.id.cmp(&b.id));
        Self { items: index_items }
    }

    pub fn find(&self, id: &str) -> Option<&IndexItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn upsert(&mut self, entry: IndexItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == entry.id) {
            *existing = entry;
        } else {
            self.items.push(entry);
            self.items.sort_by(|a, b| a.id.cmp(&b.id));
        }
    }
}

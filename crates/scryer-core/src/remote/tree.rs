//! The concrete remote-object set owned by the core context.

use crate::remote::{ChangeCounter, LookupTable, RemoteNode, StateHub, ViewScale};

/// Entry lengths for the static index table.
const INDEX_TABLE_LEN: usize = 24;

/// Every remote object the core mirrors.
///
/// Nodes are constructed once, unbound, and survive attach/detach cycles;
/// only their addresses and payloads change.
pub struct RemoteTree {
    pub(crate) state: StateHub,
    pub(crate) change_counter: ChangeCounter,
    pub(crate) view_scale: ViewScale,
    pub(crate) index_table: LookupTable,
}

impl Default for RemoteTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteTree {
    pub fn new() -> Self {
        Self {
            state: StateHub::new(),
            change_counter: ChangeCounter::new(),
            view_scale: ViewScale::new(),
            index_table: LookupTable::new(INDEX_TABLE_LEN),
        }
    }

    pub fn state(&self) -> &StateHub {
        &self.state
    }

    pub fn change_counter(&self) -> &ChangeCounter {
        &self.change_counter
    }

    pub fn view_scale(&self) -> &ViewScale {
        &self.view_scale
    }

    pub fn index_table(&self) -> &LookupTable {
        &self.index_table
    }

    /// Top-down reset after detach; no stale payload stays visible.
    pub fn reset_all(&mut self) {
        self.state.reset();
        self.change_counter.reset();
        self.view_scale.reset();
        self.index_table.reset();
    }

    /// True when no node is bound.
    pub fn is_unbound(&self) -> bool {
        self.state.address() == 0
            && self.change_counter.address() == 0
            && self.view_scale.address() == 0
            && self.index_table.address() == 0
    }
}

//! A single propagation pass and its undo journal.

use std::collections::HashSet;

use log::debug;
use uuid::Uuid;

use crate::artifact::{ArtifactTable, SlotRef, SlotState};
use crate::error::Result;
use crate::event::{Cause, ChangeEvent, Effect};
use crate::store::SymbolStore;
use crate::symbol::{Symbol, SymbolId, SymbolRef, Value};

/// A value write made during the pass, not yet committed to history.
#[derive(Debug, Clone)]
pub(crate) struct PendingChange {
    pub symbol: SymbolRef,
    pub id: SymbolId,
    pub from: Value,
    pub to: Value,
    pub cause: Cause,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingSwitch {
    pub slot: SlotRef,
    pub from: SlotState,
    pub to: SlotState,
}

/// Journaled state of one pass. Dropping it after [`Pass::rollback`] leaves
/// the store and artifact table exactly as they were before the pass.
#[derive(Debug)]
pub(crate) struct Pass {
    pub id: Uuid,
    /// Symbols on the active recomputation path.
    pub path: Vec<SymbolRef>,
    pub changes: Vec<PendingChange>,
    pub switches: Vec<PendingSwitch>,
    saved: Vec<(SymbolRef, Symbol)>,
    touched: HashSet<SymbolRef>,
}

impl Pass {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            path: Vec::new(),
            changes: Vec::new(),
            switches: Vec::new(),
            saved: Vec::new(),
            touched: HashSet::new(),
        }
    }

    /// Write `value` through the store. Returns the change event when the
    /// value actually changed.
    pub fn apply_value(
        &mut self,
        store: &mut SymbolStore,
        symbol: SymbolRef,
        value: Value,
        cause: Cause,
    ) -> Result<Option<ChangeEvent>> {
        store.validate(symbol, &value)?;
        if store.get(symbol)?.value() == &value {
            return Ok(None);
        }
        self.journal(store, symbol)?;
        let Some(previous) = store.assign(symbol, value.clone())? else {
            return Ok(None);
        };
        let id = store.get(symbol)?.id().clone();
        debug!("pass {}: {id} = {value} (was {previous})", self.id);
        self.changes.push(PendingChange {
            symbol,
            id: id.clone(),
            from: previous.clone(),
            to: value.clone(),
            cause: cause.clone(),
        });
        Ok(Some(ChangeEvent {
            symbol,
            id,
            value,
            previous,
            cause,
        }))
    }

    pub fn apply_visibility(
        &mut self,
        store: &mut SymbolStore,
        symbol: SymbolRef,
        visible: bool,
    ) -> Result<()> {
        if store.get(symbol)?.visible() == visible {
            return Ok(());
        }
        self.journal(store, symbol)?;
        store.set_visible(symbol, visible)?;
        Ok(())
    }

    /// Apply a rule effect to the rule's target.
    pub fn apply_effect(
        &mut self,
        store: &mut SymbolStore,
        target: SymbolRef,
        effect: Effect,
        cause: Cause,
    ) -> Result<Option<ChangeEvent>> {
        match effect {
            Effect::Keep => Ok(None),
            Effect::Value(value) => self.apply_value(store, target, value, cause),
            Effect::Visible(visible) => {
                self.apply_visibility(store, target, visible)?;
                Ok(None)
            }
        }
    }

    /// Single state assignment of a slot, journaled.
    pub fn switch_slot(&mut self, artifacts: &mut ArtifactTable, slot: SlotRef, to: SlotState) {
        let from = artifacts.assign(slot, to);
        if from != to {
            self.switches.push(PendingSwitch { slot, from, to });
        }
    }

    /// Symbols written during the pass, in first-write order.
    pub fn written(&self) -> Vec<SymbolRef> {
        let mut seen = HashSet::new();
        self.changes
            .iter()
            .map(|c| c.symbol)
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Undo every journaled mutation, newest first.
    pub fn rollback(self, store: &mut SymbolStore, artifacts: &mut ArtifactTable) {
        for switch in self.switches.iter().rev() {
            artifacts.assign(switch.slot, switch.from);
        }
        for (symbol, saved) in self.saved.into_iter().rev() {
            store.restore(symbol, saved);
        }
    }

    fn journal(&mut self, store: &SymbolStore, symbol: SymbolRef) -> Result<()> {
        if self.touched.insert(symbol) {
            self.saved.push((symbol, store.get(symbol)?.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolSpec;

    #[test]
    fn rollback_restores_values_and_visibility() {
        let mut store = SymbolStore::new();
        let mut artifacts = ArtifactTable::new();
        let a = store.create("i", SymbolSpec::integer("A", 1)).unwrap();
        let b = store.create("i", SymbolSpec::boolean("B", false)).unwrap();

        let mut pass = Pass::new();
        pass.apply_value(&mut store, a, Value::Int(2), Cause::External).unwrap();
        pass.apply_value(&mut store, a, Value::Int(3), Cause::External).unwrap();
        pass.apply_visibility(&mut store, b, false).unwrap();
        pass.apply_visibility(&mut store, a, false).unwrap();
        assert_eq!(pass.changes.len(), 2);

        pass.rollback(&mut store, &mut artifacts);
        let sym = store.get(a).unwrap();
        assert_eq!(sym.value(), &Value::Int(1));
        assert!(sym.visible());
    }

    #[test]
    fn written_lists_each_symbol_once() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::integer("A", 1)).unwrap();
        let b = store.create("i", SymbolSpec::integer("B", 1)).unwrap();
        let mut pass = Pass::new();
        pass.apply_value(&mut store, a, Value::Int(2), Cause::External).unwrap();
        pass.apply_value(&mut store, b, Value::Int(5), Cause::External).unwrap();
        pass.apply_value(&mut store, a, Value::Int(1), Cause::External).unwrap();
        assert_eq!(pass.written(), vec![a, b]);
        assert_eq!(pass.changes.len(), 3);
    }

    #[test]
    fn unchanged_write_is_not_an_event() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::integer("A", 1)).unwrap();
        let mut pass = Pass::new();
        assert!(pass.apply_value(&mut store, a, Value::Int(1), Cause::External).unwrap().is_none());
        assert!(pass.changes.is_empty());
    }
}

//! Record of every committed value change and artifact switch.
//!
//! Records are only appended when a pass commits; a rolled-back pass leaves
//! no trace here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Cause;
use crate::symbol::{SymbolId, Value};

/// One committed symbol write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Monotonically increasing across the session.
    pub sequence: u64,
    /// The propagation pass that made the change.
    pub pass: Uuid,
    pub symbol: SymbolId,
    pub from: Value,
    pub to: Value,
    pub cause: Cause,
}

/// One committed change of a slot's active descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSwitch {
    pub sequence: u64,
    pub pass: Uuid,
    pub slot: String,
    /// Output name of the previously active descriptor; `None` when the slot
    /// was unselected.
    pub from: Option<String>,
    pub to: String,
}

/// Session-wide history.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct History {
    pub changes: Vec<ChangeRecord>,
    pub switches: Vec<ArtifactSwitch>,
    next_sequence: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_change(
        &mut self,
        pass: Uuid,
        symbol: SymbolId,
        from: Value,
        to: Value,
        cause: Cause,
    ) -> ChangeRecord {
        let record = ChangeRecord {
            sequence: self.bump(),
            pass,
            symbol,
            from,
            to,
            cause,
        };
        self.changes.push(record.clone());
        record
    }

    pub(crate) fn record_switch(
        &mut self,
        pass: Uuid,
        slot: String,
        from: Option<String>,
        to: String,
    ) -> ArtifactSwitch {
        let record = ArtifactSwitch {
            sequence: self.bump(),
            pass,
            slot,
            from,
            to,
        };
        self.switches.push(record.clone());
        record
    }

    /// All changes made to one symbol, oldest first.
    pub fn changes_of<'a>(
        &'a self,
        symbol: &'a SymbolId,
    ) -> impl Iterator<Item = &'a ChangeRecord> + 'a {
        self.changes.iter().filter(move |c| &c.symbol == symbol)
    }

    /// All records of one pass.
    pub fn pass(&self, pass: Uuid) -> Vec<&ChangeRecord> {
        self.changes.iter().filter(|c| c.pass == pass).collect()
    }

    /// Drop every record mentioning symbols or slots of `instance`.
    pub(crate) fn forget_instance(&mut self, instance: &str) {
        self.changes.retain(|c| c.symbol.instance() != instance);
        self.switches
            .retain(|s| s.slot.split_once('.').map(|(i, _)| i) != Some(instance));
    }

    fn bump(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }
}

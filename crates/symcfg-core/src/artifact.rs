//! Output artifact descriptors and per-slot selection.
//!
//! Every logical output slot holds a list of mutually exclusive descriptors,
//! each guarded by a predicate over discriminator symbols. Exactly one
//! descriptor is active per slot; "no output" is an active descriptor of
//! kind [`ArtifactKind::Disabled`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::store::SymbolStore;
use crate::symbol::{SymbolRef, Value};

/// The type tag handed to the template renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Header,
    Source,
    Linker,
    /// Rendered text appended to a shared list such as system includes.
    StringList,
    /// A build option of the generated project. `destination` is the
    /// option category, `output_name` the key and `template` the value.
    Setting,
    Disabled,
}

/// `symbol` must hold one of `one_of`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub symbol: SymbolRef,
    pub one_of: Vec<Value>,
}

impl Condition {
    pub fn equals(symbol: SymbolRef, value: Value) -> Self {
        Self {
            symbol,
            one_of: vec![value],
        }
    }

    pub fn one_of(symbol: SymbolRef, values: Vec<Value>) -> Self {
        Self { symbol, one_of: values }
    }

    fn holds(&self, store: &SymbolStore) -> Result<bool> {
        let value = store.get(self.symbol)?.value();
        Ok(self.one_of.contains(value))
    }
}

/// One candidate output for a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactDescriptor {
    pub template: String,
    pub output_name: String,
    pub destination: String,
    pub project_path: String,
    pub kind: ArtifactKind,
    pub markup: bool,
    pub overwrite: bool,
    /// All conditions must hold for the descriptor to be active.
    pub when: Vec<Condition>,
}

impl ArtifactDescriptor {
    pub fn new(
        kind: ArtifactKind,
        template: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            template: template.into(),
            output_name: output_name.into(),
            destination: String::new(),
            project_path: String::new(),
            kind,
            markup: true,
            overwrite: true,
            when: Vec::new(),
        }
    }

    /// The "no output" descriptor.
    pub fn disabled() -> Self {
        Self::new(ArtifactKind::Disabled, "", "")
    }

    /// A build option appended with `;` to `key` in `category`.
    pub fn setting(
        category: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(ArtifactKind::Setting, value, key)
            .with_location(category, "")
            .with_markup(false)
    }

    /// Builder: set destination and project path.
    pub fn with_location(
        mut self,
        destination: impl Into<String>,
        project_path: impl Into<String>,
    ) -> Self {
        self.destination = destination.into();
        self.project_path = project_path.into();
        self
    }

    /// Builder: set the markup flag.
    pub fn with_markup(mut self, markup: bool) -> Self {
        self.markup = markup;
        self
    }

    /// Builder: set the overwrite flag.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Builder: add an activation condition.
    pub fn when(mut self, condition: Condition) -> Self {
        self.when.push(condition);
        self
    }

    pub fn when_equals(self, symbol: SymbolRef, value: Value) -> Self {
        self.when(Condition::equals(symbol, value))
    }

    pub fn is_disabled(&self) -> bool {
        self.kind == ArtifactKind::Disabled
    }

    /// Whether every activation condition holds in `store`.
    pub fn is_active_in(&self, store: &SymbolStore) -> Result<bool> {
        for condition in &self.when {
            if !condition.holds(store)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn discriminators(&self) -> impl Iterator<Item = SymbolRef> + '_ {
        self.when.iter().map(|c| c.symbol)
    }
}

/// Pure selection of the single active descriptor.
pub struct ArtifactSelector;

impl ArtifactSelector {
    /// Index of the one descriptor whose predicate holds.
    ///
    /// Zero or several matches are a declaration bug and fail with
    /// `AmbiguousArtifactSelection`.
    pub fn select(
        slot: &str,
        descriptors: &[ArtifactDescriptor],
        store: &SymbolStore,
    ) -> Result<usize> {
        let mut matched = Vec::new();
        for (i, descriptor) in descriptors.iter().enumerate() {
            if descriptor.is_active_in(store)? {
                matched.push(i);
            }
        }
        match matched.as_slice() {
            [only] => Ok(*only),
            _ => Err(ConfigError::AmbiguousArtifactSelection {
                slot: slot.to_string(),
                matches: matched.len(),
            }),
        }
    }
}

/// Per-slot state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unselected,
    Active(usize),
}

/// A logical output slot.
#[derive(Debug, Clone)]
pub struct Slot {
    pub(crate) id: String,
    pub(crate) owner: String,
    pub(crate) descriptors: Vec<ArtifactDescriptor>,
    pub(crate) state: SlotState,
}

impl Slot {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn descriptors(&self) -> &[ArtifactDescriptor] {
        &self.descriptors
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// The active descriptor, if the slot has been selected.
    pub fn active(&self) -> Option<&ArtifactDescriptor> {
        match self.state {
            SlotState::Active(i) => self.descriptors.get(i),
            SlotState::Unselected => None,
        }
    }
}

/// Handle to a declared slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef(pub(crate) usize);

/// All slots of a session with a discriminator → slot index.
#[derive(Debug, Default)]
pub struct ArtifactTable {
    slots: Vec<Option<Slot>>,
    by_id: HashMap<String, SlotRef>,
    by_discriminator: HashMap<SymbolRef, Vec<SlotRef>>,
}

impl ArtifactTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an unselected slot `<owner>.<name>`.
    pub(crate) fn declare(
        &mut self,
        owner: &str,
        name: &str,
        descriptors: Vec<ArtifactDescriptor>,
    ) -> Result<SlotRef> {
        let id = format!("{owner}.{name}");
        if descriptors.is_empty() {
            return Err(ConfigError::AmbiguousArtifactSelection { slot: id, matches: 0 });
        }
        if self.by_id.contains_key(&id) {
            return Err(ConfigError::DuplicateSymbolId(crate::SymbolId::new(owner, name)));
        }

        let slot_ref = SlotRef(self.slots.len());
        for descriptor in &descriptors {
            for symbol in descriptor.discriminators() {
                let slots = self.by_discriminator.entry(symbol).or_default();
                if !slots.contains(&slot_ref) {
                    slots.push(slot_ref);
                }
            }
        }
        self.slots.push(Some(Slot {
            id: id.clone(),
            owner: owner.to_string(),
            descriptors,
            state: SlotState::Unselected,
        }));
        self.by_id.insert(id, slot_ref);
        Ok(slot_ref)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, slot: SlotRef) -> Option<&Slot> {
        self.slots.get(slot.0).and_then(Option::as_ref)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Slot> {
        self.by_id.get(id).and_then(|r| self.get(*r))
    }

    /// Slots whose predicates read any of `symbols`, in declaration order.
    pub(crate) fn affected_by(&self, symbols: &[SymbolRef]) -> Vec<SlotRef> {
        let mut slots: Vec<SlotRef> = symbols
            .iter()
            .filter_map(|s| self.by_discriminator.get(s))
            .flatten()
            .copied()
            .collect();
        slots.sort();
        slots.dedup();
        slots
    }

    /// Evaluate a slot without changing it.
    pub(crate) fn evaluate(&self, slot: SlotRef, store: &SymbolStore) -> Result<SlotState> {
        match self.get(slot) {
            Some(s) => {
                ArtifactSelector::select(&s.id, &s.descriptors, store).map(SlotState::Active)
            }
            None => Ok(SlotState::Unselected),
        }
    }

    /// Single assignment of a slot's state. Returns the previous state.
    pub(crate) fn assign(&mut self, slot: SlotRef, state: SlotState) -> SlotState {
        match self.slots.get_mut(slot.0).and_then(Option::as_mut) {
            Some(s) => std::mem::replace(&mut s.state, state),
            None => SlotState::Unselected,
        }
    }

    /// Slots owned by `owner`, in declaration order.
    pub fn owned_by<'a>(
        &'a self,
        owner: &'a str,
    ) -> impl Iterator<Item = (SlotRef, &'a Slot)> + 'a {
        self.iter().filter(move |(_, s)| s.owner == owner)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotRef, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (SlotRef(i), s)))
    }

    /// Discard every slot of `owner`.
    pub(crate) fn remove_owner(&mut self, owner: &str) -> usize {
        let mut removed = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(|s| s.owner == owner) {
                if let Some(s) = slot.take() {
                    self.by_id.remove(&s.id);
                    removed.push(SlotRef(i));
                }
            }
        }
        for slots in self.by_discriminator.values_mut() {
            slots.retain(|s| !removed.contains(s));
        }
        self.by_discriminator.retain(|_, slots| !slots.is_empty());
        removed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::symbol::SymbolSpec;

    fn toolchain_store() -> (SymbolStore, SymbolRef, SymbolRef) {
        let mut store = SymbolStore::new();
        let compiler = store
            .create(
                "core",
                SymbolSpec::enum_key(
                    "COMPILER_CHOICE",
                    Domain::keys(["XC32", "IAR"]).options().to_vec(),
                    "XC32",
                ),
            )
            .unwrap();
        let memory = store
            .create(
                "core",
                SymbolSpec::enum_key(
                    "EXECUTION_MEMORY",
                    Domain::keys(["DDR", "SRAM"]).options().to_vec(),
                    "DDR",
                ),
            )
            .unwrap();
        (store, compiler, memory)
    }

    fn linker_descriptors(compiler: SymbolRef, memory: SymbolRef) -> Vec<ArtifactDescriptor> {
        let mut out = Vec::new();
        for (tc, mem, name) in [
            ("XC32", "DDR", "ddr.ld"),
            ("XC32", "SRAM", "sram.ld"),
            ("IAR", "DDR", "ddr.icf"),
            ("IAR", "SRAM", "sram.icf"),
        ] {
            out.push(
                ArtifactDescriptor::new(ArtifactKind::Linker, format!("{name}.ftl"), name)
                    .when_equals(compiler, Value::key(tc))
                    .when_equals(memory, Value::key(mem)),
            );
        }
        out
    }

    #[test]
    fn exactly_one_descriptor_per_combination() {
        let (mut store, compiler, memory) = toolchain_store();
        let descriptors = linker_descriptors(compiler, memory);
        let mut seen = Vec::new();
        for tc in ["XC32", "IAR"] {
            for mem in ["DDR", "SRAM"] {
                store.assign(compiler, Value::key(tc)).unwrap();
                store.assign(memory, Value::key(mem)).unwrap();
                let i = ArtifactSelector::select("core.LINKER", &descriptors, &store).unwrap();
                seen.push(descriptors[i].output_name.clone());
            }
        }
        assert_eq!(seen, ["ddr.ld", "sram.ld", "ddr.icf", "sram.icf"]);
    }

    #[test]
    fn zero_or_many_matches_are_ambiguous() {
        let (store, compiler, _) = toolchain_store();
        let none = vec![ArtifactDescriptor::new(ArtifactKind::Source, "a", "a.c")
            .when_equals(compiler, Value::key("IAR"))];
        let err = ArtifactSelector::select("core.X", &none, &store).unwrap_err();
        assert_eq!(
            err,
            ConfigError::AmbiguousArtifactSelection {
                slot: "core.X".into(),
                matches: 0
            }
        );

        let both = vec![
            ArtifactDescriptor::new(ArtifactKind::Source, "a", "a.c"),
            ArtifactDescriptor::new(ArtifactKind::Source, "b", "b.c"),
        ];
        let err = ArtifactSelector::select("core.X", &both, &store).unwrap_err();
        assert_eq!(
            err,
            ConfigError::AmbiguousArtifactSelection {
                slot: "core.X".into(),
                matches: 2
            }
        );
    }

    #[test]
    fn disabled_descriptor_counts_as_selection() {
        let mut store = SymbolStore::new();
        let enable =
            store.create("tmr1", SymbolSpec::boolean("TMR1_INTERRUPT_ENABLE", false)).unwrap();
        let descriptors = vec![
            ArtifactDescriptor::new(ArtifactKind::StringList, "handler.c.ftl", "handler")
                .when_equals(enable, Value::Bool(true)),
            ArtifactDescriptor::disabled().when_equals(enable, Value::Bool(false)),
        ];
        let i = ArtifactSelector::select("tmr1.HANDLER", &descriptors, &store).unwrap();
        assert!(descriptors[i].is_disabled());
    }

    #[test]
    fn settings_follow_the_compiler() {
        let (mut store, compiler, _) = toolchain_store();
        let descriptors = vec![
            ArtifactDescriptor::setting("C32", "preprocessor-macros", "__FPU_PRESENT=1")
                .when_equals(compiler, Value::key("XC32")),
            ArtifactDescriptor::disabled().when_equals(compiler, Value::key("IAR")),
        ];
        store.assign(compiler, Value::key("XC32")).unwrap();
        let i = ArtifactSelector::select("core.SETTING", &descriptors, &store).unwrap();
        let setting = &descriptors[i];
        assert_eq!(setting.kind, ArtifactKind::Setting);
        assert_eq!(setting.destination, "C32");
        assert_eq!(setting.output_name, "preprocessor-macros");
        assert_eq!(setting.template, "__FPU_PRESENT=1");
        assert!(!setting.markup);

        store.assign(compiler, Value::key("IAR")).unwrap();
        let i = ArtifactSelector::select("core.SETTING", &descriptors, &store).unwrap();
        assert!(descriptors[i].is_disabled());
    }

    #[test]
    fn table_indexes_discriminators() {
        let (store, compiler, memory) = toolchain_store();
        let mut table = ArtifactTable::new();
        let linker = table.declare("core", "LINKER", linker_descriptors(compiler, memory)).unwrap();
        let fault = table
            .declare(
                "core",
                "FAULT_HANDLERS",
                vec![ArtifactDescriptor::new(ArtifactKind::Source, "f.c", "fault_handlers.c")],
            )
            .unwrap();
        assert_eq!(table.affected_by(&[memory]), vec![linker]);
        assert!(table.affected_by(&[]).is_empty());

        let state = table.evaluate(fault, &store).unwrap();
        assert_eq!(table.assign(fault, state), SlotState::Unselected);
        assert_eq!(table.get(fault).unwrap().active().unwrap().output_name, "fault_handlers.c");

        assert!(matches!(
            table.declare("core", "LINKER", vec![ArtifactDescriptor::disabled()]),
            Err(ConfigError::DuplicateSymbolId(_))
        ));
        assert_eq!(table.remove_owner("core"), 2);
        assert!(table.affected_by(&[memory]).is_empty());
    }
}

//! A configuration session: the store, engine and artifact table of every
//! instance, plus the only public mutation paths.
//!
//! Every mutation runs as a journaled pass. A pass that fails is rolled
//! back completely and the instance the error is attributed to is aborted;
//! other instances keep working.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::artifact::{ArtifactDescriptor, ArtifactTable, SlotRef, SlotState};
use crate::context::Context;
use crate::engine::{PropagationEngine, RuleRef};
use crate::error::{ConfigError, Result};
use crate::event::{Cause, ChangeEvent, Effect};
use crate::history::{ArtifactSwitch, ChangeRecord, History};
use crate::pass::Pass;
use crate::snapshot::Snapshot;
use crate::store::SymbolStore;
use crate::symbol::{Symbol, SymbolId, SymbolRef, SymbolSpec, Value};

/// Lifecycle of a configuration instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    /// Declaring symbols, rules and slots.
    Building,
    Live,
    /// Generation stopped; the message is the error that caused it.
    Aborted(String),
}

/// One component instantiation owning a namespace.
#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    pub id: String,
    /// Numeric instance index (`sdramc0` has index 0).
    pub index: u32,
    pub state: InstanceState,
    #[serde(skip)]
    rules: Vec<RuleRef>,
    #[serde(skip)]
    slots: Vec<SlotRef>,
}

impl Instance {
    pub fn is_live(&self) -> bool {
        self.state == InstanceState::Live
    }
}

/// What one committed pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeReport {
    pub pass: Option<Uuid>,
    /// Net value changes, in order of first write.
    pub changes: Vec<ChangeRecord>,
    pub switches: Vec<ArtifactSwitch>,
}

impl CascadeReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.switches.is_empty()
    }

    pub fn changed(&self, id: &str) -> bool {
        self.changes.iter().any(|c| c.symbol.as_str() == id)
    }
}

/// All configuration state of one generation run.
#[derive(Debug, Default)]
pub struct Session {
    store: SymbolStore,
    engine: PropagationEngine,
    artifacts: ArtifactTable,
    instances: BTreeMap<String, Instance>,
    history: History,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring a new instance.
    pub fn instantiate(&mut self, id: &str, index: u32) -> Result<InstanceBuilder<'_>> {
        if self.instances.contains_key(id) {
            return Err(ConfigError::DuplicateInstance(id.to_string()));
        }
        if id.is_empty() || id.contains('.') {
            return Err(ConfigError::InstanceNotFound(id.to_string()));
        }
        self.instances.insert(
            id.to_string(),
            Instance {
                id: id.to_string(),
                index,
                state: InstanceState::Building,
                rules: Vec::new(),
                slots: Vec::new(),
            },
        );
        Ok(InstanceBuilder {
            session: self,
            id: id.to_string(),
        })
    }

    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    pub fn engine(&self) -> &PropagationEngine {
        &self.engine
    }

    pub fn artifacts(&self) -> &ArtifactTable {
        &self.artifacts
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn instance(&self, id: &str) -> Result<&Instance> {
        self.instances
            .get(id)
            .ok_or_else(|| ConfigError::InstanceNotFound(id.to_string()))
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    pub fn lookup(&self, id: &str) -> Result<SymbolRef> {
        self.store.lookup(id)
    }

    pub fn symbol(&self, symbol: SymbolRef) -> Result<&Symbol> {
        self.store.get(symbol)
    }

    /// Current value of a symbol addressed as `instance.NAME`.
    pub fn value(&self, id: &str) -> Result<&Value> {
        Ok(self.store.get(self.store.lookup(id)?)?.value())
    }

    /// Output name of the active descriptor of a slot.
    pub fn active_artifact(&self, slot: &str) -> Result<&ArtifactDescriptor> {
        self.artifacts
            .get_by_id(slot)
            .and_then(|s| s.active())
            .ok_or_else(|| ConfigError::SymbolNotFound(slot.to_string()))
    }

    /// External write to a symbol, followed by the full cascade.
    ///
    /// The write is validated before the pass starts: unknown symbols,
    /// locked symbols, rule targets and out-of-domain values are rejected
    /// without touching the instance. Any error during the pass itself rolls the pass back and
    /// aborts the instance the error is attributed to.
    pub fn set_value(&mut self, symbol: SymbolRef, value: Value) -> Result<CascadeReport> {
        let sym = self.store.get(symbol)?;
        let owner = sym.id().instance().to_string();
        self.ensure_usable(&owner)?;
        if sym.locked() {
            return Err(ConfigError::SymbolLocked(sym.id().clone()));
        }
        if !sym.upstream().is_empty() {
            return Err(ConfigError::DerivedSymbol(sym.id().clone()));
        }
        self.store.validate(symbol, &value)?;

        let skip = self.blocked(None);
        self.run_pass(&owner, |engine, store, pass| {
            engine.check_acyclic_from(store, &skip, symbol)?;
            if let Some(event) = pass.apply_value(store, symbol, value, Cause::External)? {
                engine.cascade(store, &skip, pass, &event)?;
            }
            Ok(())
        })
    }

    /// [`Session::set_value`] by textual id.
    pub fn set(&mut self, id: &str, value: Value) -> Result<CascadeReport> {
        let symbol = self.store.lookup(id)?;
        self.set_value(symbol, value)
    }

    /// Side-channel visibility flag; triggers no propagation.
    pub fn set_visible(&mut self, symbol: SymbolRef, visible: bool) -> Result<()> {
        let owner = self.store.get(symbol)?.id().instance().to_string();
        self.ensure_usable(&owner)?;
        self.store.set_visible(symbol, visible)?;
        Ok(())
    }

    /// Side-channel lock flag; triggers no propagation.
    pub fn set_locked(&mut self, symbol: SymbolRef, locked: bool) -> Result<()> {
        let owner = self.store.get(symbol)?.id().instance().to_string();
        self.ensure_usable(&owner)?;
        self.store.set_locked(symbol, locked)
    }

    /// Re-run every rule of every live instance once, in declaration order.
    /// At a fixed point the report is empty.
    pub fn settle(&mut self) -> Result<CascadeReport> {
        let skip = self.blocked(None);
        let rules: Vec<RuleRef> = self.engine.rules().map(|(r, _)| r).collect();
        self.run_pass("", |engine, store, pass| {
            engine.check_acyclic(store, &skip)?;
            engine.settle(store, &skip, pass, &rules)
        })
    }

    /// Discard an instance with all its symbols, rules and slots.
    pub fn teardown(&mut self, id: &str) -> Result<()> {
        let instance = self
            .instances
            .remove(id)
            .ok_or_else(|| ConfigError::InstanceNotFound(id.to_string()))?;
        let rules = self.engine.remove_owner(id);
        let slots = self.artifacts.remove_owner(id);
        let symbols = self.store.remove_instance(id);
        self.engine.forget_symbols(&self.store);
        self.history.forget_instance(id);
        info!(
            "tore down {} ({symbols} symbols, {rules} rules, {slots} slots, was {:?})",
            instance.id, instance.state
        );
        Ok(())
    }

    /// Resolved state of all live instances.
    pub fn snapshot(&self) -> Result<Snapshot> {
        Snapshot::capture(&self.store, &self.artifacts, |instance| {
            self.instances.get(instance).is_some_and(Instance::is_live)
        })
    }

    fn ensure_usable(&self, instance: &str) -> Result<()> {
        match self.instance(instance)?.state {
            InstanceState::Aborted(_) => Err(ConfigError::InstanceAborted(instance.to_string())),
            _ => Ok(()),
        }
    }

    /// Instances whose rules must not run: everything not live, except
    /// `allow`.
    fn blocked(&self, allow: Option<&str>) -> HashSet<String> {
        self.instances
            .values()
            .filter(|i| !i.is_live() && Some(i.id.as_str()) != allow)
            .map(|i| i.id.clone())
            .collect()
    }

    /// Run `body` as one journaled pass, reselect affected slots, and commit
    /// or roll back.
    fn run_pass<F>(&mut self, trigger_owner: &str, body: F) -> Result<CascadeReport>
    where
        F: FnOnce(&PropagationEngine, &mut SymbolStore, &mut Pass) -> Result<()>,
    {
        let mut pass = Pass::new();
        let outcome = body(&self.engine, &mut self.store, &mut pass)
            .and_then(|()| self.reselect(&mut pass, None));
        match outcome {
            Ok(()) => Ok(self.commit(pass)),
            Err(err) => {
                pass.rollback(&mut self.store, &mut self.artifacts);
                let culprit = err
                    .instance()
                    .filter(|i| self.instances.contains_key(*i))
                    .unwrap_or(trigger_owner)
                    .to_string();
                self.abort(&culprit, &err);
                Err(err)
            }
        }
    }

    /// Re-evaluate slots affected by this pass's writes, plus `extra`.
    fn reselect(&mut self, pass: &mut Pass, extra: Option<&[SlotRef]>) -> Result<()> {
        let mut slots = self.artifacts.affected_by(&pass.written());
        if let Some(extra) = extra {
            slots.extend_from_slice(extra);
            slots.sort();
            slots.dedup();
        }
        for slot in slots {
            let Some(owner) = self.artifacts.get(slot).map(|s| s.owner().to_string()) else {
                continue;
            };
            let building = extra.is_some_and(|e| e.contains(&slot));
            if !building && !self.instances.get(&owner).is_some_and(Instance::is_live) {
                continue;
            }
            let state = self.artifacts.evaluate(slot, &self.store)?;
            pass.switch_slot(&mut self.artifacts, slot, state);
        }
        Ok(())
    }

    fn commit(&mut self, pass: Pass) -> CascadeReport {
        let mut written = Vec::with_capacity(pass.changes.len());
        for change in &pass.changes {
            written.push(self.history.record_change(
                pass.id,
                change.id.clone(),
                change.from.clone(),
                change.to.clone(),
                change.cause.clone(),
            ));
        }
        let mut report = CascadeReport {
            pass: Some(pass.id),
            changes: net_changes(written),
            switches: Vec::new(),
        };
        for switch in &pass.switches {
            let Some(slot) = self.artifacts.get(switch.slot) else {
                continue;
            };
            let name = |state: SlotState| match state {
                SlotState::Active(i) => slot.descriptors().get(i).map(|d| {
                    if d.is_disabled() {
                        "(disabled)".to_string()
                    } else {
                        d.output_name.clone()
                    }
                }),
                SlotState::Unselected => None,
            };
            let record = self.history.record_switch(
                pass.id,
                slot.id().to_string(),
                name(switch.from),
                name(switch.to).unwrap_or_default(),
            );
            debug!("pass {}: slot {} -> {}", pass.id, record.slot, record.to);
            report.switches.push(record);
        }
        report
    }

    fn abort(&mut self, instance: &str, err: &ConfigError) {
        if let Some(inst) = self.instances.get_mut(instance) {
            warn!("pass rolled back; aborting generation for {instance}: {err}");
            inst.state = InstanceState::Aborted(err.to_string());
        }
    }
}

/// Collapse per-write records into one record per symbol: first `from`,
/// last `to`. Symbols that ended where they started are dropped.
fn net_changes(records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    let mut net: Vec<ChangeRecord> = Vec::new();
    for record in records {
        match net.iter_mut().find(|c| c.symbol == record.symbol) {
            Some(existing) => {
                existing.sequence = record.sequence;
                existing.to = record.to;
                existing.cause = record.cause;
            }
            None => net.push(record),
        }
    }
    net.retain(|c| c.from != c.to);
    net
}

/// Declares the symbols, rules and slots of one instance.
///
/// Errors from any declaration abort the instance. [`InstanceBuilder::finish`]
/// runs the settle pass and makes the instance live.
pub struct InstanceBuilder<'s> {
    session: &'s mut Session,
    id: String,
}

impl<'s> InstanceBuilder<'s> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> u32 {
        self.session.instances.get(&self.id).map_or(0, |i| i.index)
    }

    /// Create a symbol in this instance's namespace.
    pub fn symbol(&mut self, spec: SymbolSpec) -> Result<SymbolRef> {
        let slot_id = format!("{}.{}", self.id, spec.name);
        let result = if self.session.artifacts.contains(&slot_id) {
            Err(ConfigError::DuplicateSymbolId(SymbolId::new(&self.id, &spec.name)))
        } else {
            self.session.store.create(&self.id, spec)
        };
        self.track(result)
    }

    /// Resolve any symbol by `instance.NAME`, typically a shared core symbol.
    pub fn lookup(&mut self, id: &str) -> Result<SymbolRef> {
        let result = self.session.store.lookup(id);
        self.track(result)
    }

    /// Resolve a symbol of this instance by name.
    pub fn local(&mut self, name: &str) -> Result<SymbolRef> {
        let result = self.session.store.resolve(&SymbolId::new(&self.id, name));
        self.track(result)
    }

    /// Current value of any symbol, for seeding declarations.
    pub fn value(&self, symbol: SymbolRef) -> Result<&Value> {
        Ok(self.session.store.get(symbol)?.value())
    }

    /// Declare a rule recomputing `target` from `upstream`. The target must
    /// belong to this instance; upstream symbols may belong to any.
    pub fn rule<F>(
        &mut self,
        target: SymbolRef,
        upstream: &[SymbolRef],
        recompute: F,
    ) -> Result<RuleRef>
    where
        F: Fn(&Context<'_>, &ChangeEvent) -> Result<Effect> + 'static,
    {
        let result = self.declare_rule(target, upstream, Box::new(recompute));
        self.track(result)
    }

    /// Declare an output slot `<instance>.<name>`.
    pub fn slot(&mut self, name: &str, descriptors: Vec<ArtifactDescriptor>) -> Result<SlotRef> {
        let result = if self.session.store.contains(&SymbolId::new(&self.id, name)) {
            Err(ConfigError::DuplicateSymbolId(SymbolId::new(&self.id, name)))
        } else {
            self.session.artifacts.declare(&self.id, name, descriptors)
        };
        let slot = self.track(result)?;
        if let Some(instance) = self.session.instances.get_mut(&self.id) {
            instance.slots.push(slot);
        }
        Ok(slot)
    }

    /// Check the graph, settle this instance's rules in declaration order,
    /// select every slot, and make the instance live.
    pub fn finish(self) -> Result<CascadeReport> {
        let session = self.session;
        let id = self.id;
        let (rules, slots) = match session.instances.get(&id) {
            Some(i) => (i.rules.clone(), i.slots.clone()),
            None => return Err(ConfigError::InstanceNotFound(id)),
        };
        if let InstanceState::Aborted(_) = session.instance(&id)?.state {
            return Err(ConfigError::InstanceAborted(id));
        }

        let skip = session.blocked(Some(id.as_str()));
        let mut pass = Pass::new();
        let outcome = session
            .engine
            .check_acyclic(&session.store, &skip)
            .and_then(|()| session.engine.settle(&mut session.store, &skip, &mut pass, &rules))
            .and_then(|()| session.reselect(&mut pass, Some(&slots)));

        match outcome {
            Ok(()) => {
                if let Some(instance) = session.instances.get_mut(&id) {
                    instance.state = InstanceState::Live;
                }
                let report = session.commit(pass);
                info!(
                    "instantiated {id}: {} symbols, {} rules, {} slots",
                    session.store.instance_symbols(&id).count(),
                    rules.len(),
                    slots.len()
                );
                Ok(report)
            }
            Err(err) => {
                pass.rollback(&mut session.store, &mut session.artifacts);
                session.abort(&id, &err);
                Err(err)
            }
        }
    }

    /// Abort the instance for an error raised outside the builder's own
    /// declarations, handing the error back to the caller.
    pub fn abort(self, err: ConfigError) -> ConfigError {
        self.session.abort(&self.id, &err);
        err
    }

    fn declare_rule(
        &mut self,
        target: SymbolRef,
        upstream: &[SymbolRef],
        recompute: crate::engine::RecomputeFn,
    ) -> Result<RuleRef> {
        let target_id = self.session.store.get(target)?.id().clone();
        if target_id.instance() != self.id {
            return Err(ConfigError::ForeignTarget {
                instance: self.id.clone(),
                symbol: target_id,
            });
        }
        for up in upstream {
            self.session.store.get(*up)?;
        }
        self.session.store.add_upstream(target, upstream)?;
        let rule = self
            .session
            .engine
            .add_rule(&self.id, target, upstream.to_vec(), recompute);
        if let Some(instance) = self.session.instances.get_mut(&self.id) {
            instance.rules.push(rule);
        }
        Ok(rule)
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.session.abort(&self.id, err);
        }
        result
    }
}

//! Dependency rules and depth-first recomputation cascades.
//!
//! A rule binds one recompute callback to a downstream target and an
//! ordered list of upstream symbols. The dispatch table maps each upstream
//! symbol to the rules it feeds, in declaration order, which is also the
//! tie-break when one change fires several rules.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::trace;

use crate::context::Context;
use crate::error::{ConfigError, Result};
use crate::event::{Cause, ChangeEvent, Effect};
use crate::pass::Pass;
use crate::store::SymbolStore;
use crate::symbol::SymbolRef;

/// A recompute callback. It sees the store only through [`Context`].
pub type RecomputeFn = Box<dyn Fn(&Context<'_>, &ChangeEvent) -> Result<Effect>>;

/// Handle to a declared rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleRef(usize);

/// One recompute callback and its edges.
pub struct Rule {
    pub(crate) owner: String,
    pub(crate) target: SymbolRef,
    pub(crate) upstream: Vec<SymbolRef>,
    recompute: RecomputeFn,
}

impl Rule {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn target(&self) -> SymbolRef {
        self.target
    }

    pub fn upstream(&self) -> &[SymbolRef] {
        &self.upstream
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("owner", &self.owner)
            .field("target", &self.target)
            .field("upstream", &self.upstream)
            .finish_non_exhaustive()
    }
}

/// Rule registry plus the symbol → rules dispatch table.
#[derive(Debug, Default)]
pub struct PropagationEngine {
    rules: Vec<Option<Rule>>,
    dispatch: HashMap<SymbolRef, Vec<RuleRef>>,
}

impl PropagationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a rule. One edge is recorded per distinct upstream symbol.
    pub fn add_rule(
        &mut self,
        owner: &str,
        target: SymbolRef,
        upstream: Vec<SymbolRef>,
        recompute: RecomputeFn,
    ) -> RuleRef {
        let rule_ref = RuleRef(self.rules.len());
        for up in &upstream {
            let rules = self.dispatch.entry(*up).or_default();
            if !rules.contains(&rule_ref) {
                rules.push(rule_ref);
            }
        }
        self.rules.push(Some(Rule {
            owner: owner.to_string(),
            target,
            upstream,
            recompute,
        }));
        rule_ref
    }

    pub fn rule(&self, rule: RuleRef) -> Option<&Rule> {
        self.rules.get(rule.0).and_then(Option::as_ref)
    }

    /// Rules fed by `symbol`, in declaration order.
    pub fn subscribers(&self, symbol: SymbolRef) -> &[RuleRef] {
        self.dispatch.get(&symbol).map_or(&[], Vec::as_slice)
    }

    /// Live rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleRef, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|r| (RuleRef(i), r)))
    }

    /// Distinct `(upstream, downstream)` pairs in declaration order.
    pub fn edges(&self) -> Vec<(SymbolRef, SymbolRef)> {
        let mut edges = Vec::new();
        for (_, rule) in self.rules() {
            for up in &rule.upstream {
                let edge = (*up, rule.target);
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Check the subgraph reachable from `start` for cycles, ignoring rules
    /// owned by instances in `skip`.
    pub fn check_acyclic_from(
        &self,
        store: &SymbolStore,
        skip: &HashSet<String>,
        start: SymbolRef,
    ) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        self.dfs(store, skip, start, &mut visited, &mut stack)
    }

    /// Check the whole graph for cycles, ignoring rules owned by instances
    /// in `skip`.
    pub fn check_acyclic(&self, store: &SymbolStore, skip: &HashSet<String>) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut roots: Vec<SymbolRef> = self.dispatch.keys().copied().collect();
        roots.sort();
        for root in roots {
            self.dfs(store, skip, root, &mut visited, &mut stack)?;
        }
        Ok(())
    }

    fn dfs(
        &self,
        store: &SymbolStore,
        skip: &HashSet<String>,
        node: SymbolRef,
        visited: &mut HashSet<SymbolRef>,
        stack: &mut HashSet<SymbolRef>,
    ) -> Result<()> {
        if stack.contains(&node) {
            return Err(cycle(store, node));
        }
        if visited.contains(&node) {
            return Ok(());
        }

        visited.insert(node);
        stack.insert(node);

        for rule_ref in self.subscribers(node) {
            match self.rule(*rule_ref) {
                Some(rule) if !skip.contains(&rule.owner) => {
                    self.dfs(store, skip, rule.target, visited, stack)?;
                }
                _ => {}
            }
        }

        stack.remove(&node);
        Ok(())
    }

    /// Run every rule fed by `event.symbol`, recursing depth-first into each
    /// target whose value changed. Rules owned by instances in `skip` are
    /// not evaluated.
    pub(crate) fn cascade(
        &self,
        store: &mut SymbolStore,
        skip: &HashSet<String>,
        pass: &mut Pass,
        event: &ChangeEvent,
    ) -> Result<()> {
        pass.path.push(event.symbol);
        for rule_ref in self.subscribers(event.symbol) {
            let Some(rule) = self.rule(*rule_ref) else {
                continue;
            };
            if skip.contains(&rule.owner) {
                continue;
            }
            if pass.path.contains(&rule.target) {
                return Err(cycle(store, rule.target));
            }
            let effect = self.evaluate(store, *rule_ref, rule, event)?;
            let cause = Cause::Rule {
                trigger: event.id.clone(),
            };
            if let Some(child) = pass.apply_effect(store, rule.target, effect, cause)? {
                self.cascade(store, skip, pass, &child)?;
            }
        }
        pass.path.pop();
        Ok(())
    }

    /// Evaluate `rules` once each, in the given order, cascading from every
    /// target that changes.
    pub(crate) fn settle(
        &self,
        store: &mut SymbolStore,
        skip: &HashSet<String>,
        pass: &mut Pass,
        rules: &[RuleRef],
    ) -> Result<()> {
        for rule_ref in rules {
            let Some(rule) = self.rule(*rule_ref) else {
                continue;
            };
            if skip.contains(&rule.owner) {
                continue;
            }
            let target = store.get(rule.target)?;
            let event = ChangeEvent {
                symbol: rule.target,
                id: target.id().clone(),
                value: target.value().clone(),
                previous: target.value().clone(),
                cause: Cause::Settle,
            };
            let effect = self.evaluate(store, *rule_ref, rule, &event)?;
            if let Some(child) = pass.apply_effect(store, rule.target, effect, Cause::Settle)? {
                self.cascade(store, skip, pass, &child)?;
            }
        }
        Ok(())
    }

    /// Drop every rule owned by `owner`. Returns how many were removed.
    pub(crate) fn remove_owner(&mut self, owner: &str) -> usize {
        let mut removed = Vec::new();
        for (i, slot) in self.rules.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(|r| r.owner == owner) {
                *slot = None;
                removed.push(RuleRef(i));
            }
        }
        for rules in self.dispatch.values_mut() {
            rules.retain(|r| !removed.contains(r));
        }
        self.dispatch.retain(|_, rules| !rules.is_empty());
        removed.len()
    }

    /// Drop dispatch entries keyed by symbols that no longer exist.
    pub(crate) fn forget_symbols(&mut self, store: &SymbolStore) {
        self.dispatch.retain(|symbol, _| store.get(*symbol).is_ok());
    }

    fn evaluate(
        &self,
        store: &SymbolStore,
        rule_ref: RuleRef,
        rule: &Rule,
        event: &ChangeEvent,
    ) -> Result<Effect> {
        let ctx = Context::new(store, &rule.owner, rule.target, &rule.upstream);
        let effect = (rule.recompute)(&ctx, event)?;
        trace!(
            "rule {} of {} on {}: {:?}",
            rule_ref.0,
            rule.owner,
            event.id,
            effect
        );
        Ok(effect)
    }
}

fn cycle(store: &SymbolStore, symbol: SymbolRef) -> ConfigError {
    match store.get(symbol) {
        Ok(sym) => ConfigError::CycleDetected(sym.id().clone()),
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{SymbolSpec, Value};

    fn doubling(from: SymbolRef) -> RecomputeFn {
        Box::new(move |ctx, _| Ok(Effect::Value(Value::Int(ctx.integer(from)? * 2))))
    }

    fn plus_one(from: SymbolRef) -> RecomputeFn {
        Box::new(move |ctx, _| Ok(Value::Int(ctx.integer(from)? + 1).into()))
    }

    fn external(
        store: &mut SymbolStore,
        pass: &mut Pass,
        symbol: SymbolRef,
        v: i64,
    ) -> ChangeEvent {
        pass.apply_value(store, symbol, Value::Int(v), Cause::External)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn chain_cascades_depth_first() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::integer("A", 1)).unwrap();
        let b = store.create("i", SymbolSpec::integer("B", 2)).unwrap();
        let c = store.create("i", SymbolSpec::integer("C", 4)).unwrap();
        let mut engine = PropagationEngine::new();
        engine.add_rule("i", b, vec![a], doubling(a));
        engine.add_rule("i", c, vec![b], doubling(b));

        let mut pass = Pass::new();
        let event = external(&mut store, &mut pass, a, 5);
        engine.cascade(&mut store, &HashSet::new(), &mut pass, &event).unwrap();
        assert_eq!(store.get(b).unwrap().value(), &Value::Int(10));
        assert_eq!(store.get(c).unwrap().value(), &Value::Int(20));
        assert!(pass.path.is_empty());
        let order: Vec<_> = pass.changes.iter().map(|c| c.id.name().to_string()).collect();
        assert_eq!(order, ["A", "B", "C"]);
    }

    #[test]
    fn unchanged_target_stops_cascade() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::integer("A", 1)).unwrap();
        let b = store.create("i", SymbolSpec::boolean("B", true)).unwrap();
        let c = store.create("i", SymbolSpec::integer("C", 0)).unwrap();
        let mut engine = PropagationEngine::new();
        engine.add_rule(
            "i",
            b,
            vec![a],
            Box::new(move |ctx, _| Ok(Value::Bool(ctx.integer(a)? > 0).into())),
        );
        engine.add_rule("i", c, vec![b], Box::new(|_, _| Ok(Value::Int(99).into())));

        let mut pass = Pass::new();
        let event = external(&mut store, &mut pass, a, 7);
        engine.cascade(&mut store, &HashSet::new(), &mut pass, &event).unwrap();
        assert_eq!(store.get(c).unwrap().value(), &Value::Int(0));
    }

    #[test]
    fn static_cycle_check() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::integer("A", 0)).unwrap();
        let b = store.create("i", SymbolSpec::integer("B", 0)).unwrap();
        let c = store.create("i", SymbolSpec::integer("C", 0)).unwrap();
        let mut engine = PropagationEngine::new();
        engine.add_rule("i", b, vec![a], doubling(a));
        let none = HashSet::new();
        assert!(engine.check_acyclic(&store, &none).is_ok());
        engine.add_rule("i", a, vec![b], doubling(b));
        engine.add_rule("j", c, vec![c], doubling(c));

        assert!(matches!(
            engine.check_acyclic_from(&store, &none, a),
            Err(ConfigError::CycleDetected(_))
        ));
        let err = engine.check_acyclic_from(&store, &none, c).unwrap_err();
        assert_eq!(err, ConfigError::CycleDetected(store.get(c).unwrap().id().clone()));

        let skip_j: HashSet<String> = ["j".to_string()].into();
        assert!(engine.check_acyclic_from(&store, &skip_j, c).is_ok());
    }

    #[test]
    fn path_check_fails_fast_on_revisit() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::integer("A", 0)).unwrap();
        let b = store.create("i", SymbolSpec::integer("B", 0)).unwrap();
        let mut engine = PropagationEngine::new();
        engine.add_rule("i", b, vec![a], plus_one(a));
        engine.add_rule("i", a, vec![b], plus_one(b));

        let mut pass = Pass::new();
        let event = external(&mut store, &mut pass, a, 1);
        let err = engine.cascade(&mut store, &HashSet::new(), &mut pass, &event).unwrap_err();
        assert!(matches!(err, ConfigError::CycleDetected(_)));
    }

    #[test]
    fn skipped_owners_do_not_run() {
        let mut store = SymbolStore::new();
        let a = store.create("core", SymbolSpec::integer("A", 1)).unwrap();
        let b = store.create("tmr1", SymbolSpec::integer("B", 0)).unwrap();
        let mut engine = PropagationEngine::new();
        let rule = engine.add_rule("tmr1", b, vec![a], doubling(a));

        let skip: HashSet<String> = ["tmr1".to_string()].into();
        let mut pass = Pass::new();
        engine.settle(&mut store, &skip, &mut pass, &[rule]).unwrap();
        assert_eq!(store.get(b).unwrap().value(), &Value::Int(0));
        engine.settle(&mut store, &HashSet::new(), &mut pass, &[rule]).unwrap();
        assert_eq!(store.get(b).unwrap().value(), &Value::Int(2));
    }

    #[test]
    fn remove_owner_clears_dispatch() {
        let mut store = SymbolStore::new();
        let a = store.create("core", SymbolSpec::integer("A", 1)).unwrap();
        let b = store.create("tmr1", SymbolSpec::integer("B", 0)).unwrap();
        let mut engine = PropagationEngine::new();
        engine.add_rule("tmr1", b, vec![a, a], doubling(a));
        assert_eq!(engine.subscribers(a).len(), 1);
        assert_eq!(engine.edges(), vec![(a, b)]);
        assert_eq!(engine.remove_owner("tmr1"), 1);
        assert!(engine.subscribers(a).is_empty());
        assert_eq!(engine.rules().count(), 0);
    }

    #[test]
    fn edges_are_distinct() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::integer("A", 1)).unwrap();
        let b = store.create("i", SymbolSpec::integer("B", 0)).unwrap();
        let c = store.create("i", SymbolSpec::integer("C", 0)).unwrap();
        let mut engine = PropagationEngine::new();
        engine.add_rule("i", b, vec![a, a], doubling(a));
        engine.add_rule("i", b, vec![a], plus_one(a));
        engine.add_rule("i", c, vec![b, a], doubling(b));
        assert_eq!(engine.edges(), vec![(a, b), (b, c), (a, c)]);
        assert_eq!(engine.subscribers(a).len(), 3);
    }
}

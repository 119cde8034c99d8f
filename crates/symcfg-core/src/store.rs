//! Typed key/value store of configuration symbols.
//!
//! The store owns symbol identity and domain validation. Values are only
//! changed through [`crate::Session`], which journals every write so a
//! failed propagation pass can be rolled back.

use std::collections::HashMap;

use crate::domain::Domain;
use crate::error::{ConfigError, Result};
use crate::symbol::{Symbol, SymbolId, SymbolKind, SymbolRef, SymbolSpec, Value};

/// Symbols of every live instance, in creation order.
#[derive(Debug, Default)]
pub struct SymbolStore {
    slots: Vec<Option<Symbol>>,
    index: HashMap<SymbolId, SymbolRef>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a symbol in `instance`'s namespace.
    ///
    /// Fails with `DuplicateSymbolId` when the id exists and with
    /// `DomainViolation` when the initial value does not fit.
    pub fn create(&mut self, instance: &str, spec: SymbolSpec) -> Result<SymbolRef> {
        let id = SymbolId::new(instance, &spec.name);
        if self.index.contains_key(&id) {
            return Err(ConfigError::DuplicateSymbolId(id));
        }
        if !spec.domain.fits(spec.kind) || !spec.domain.admits(spec.kind, &spec.value) {
            return Err(domain_violation(&id, spec.kind, &spec.domain, &spec.value));
        }
        if let Some(parent) = spec.parent {
            self.get(parent)?;
        }

        let symbol_ref = SymbolRef(self.slots.len());
        self.slots.push(Some(Symbol {
            id: id.clone(),
            kind: spec.kind,
            label: spec.label,
            default: spec.value.clone(),
            value: spec.value,
            domain: spec.domain,
            visible: spec.visible,
            locked: spec.locked,
            parent: spec.parent,
            upstream: Vec::new(),
        }));
        self.index.insert(id, symbol_ref);
        Ok(symbol_ref)
    }

    pub fn get(&self, symbol: SymbolRef) -> Result<&Symbol> {
        self.slots
            .get(symbol.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| ConfigError::SymbolNotFound(format!("#{}", symbol.0)))
    }

    pub fn get_by_id(&self, id: &SymbolId) -> Result<&Symbol> {
        self.get(self.resolve(id)?)
    }

    /// Resolve an id to its handle.
    pub fn resolve(&self, id: &SymbolId) -> Result<SymbolRef> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ConfigError::SymbolNotFound(id.to_string()))
    }

    /// Resolve a textual `instance.NAME` id.
    pub fn lookup(&self, id: &str) -> Result<SymbolRef> {
        let parsed =
            SymbolId::parse(id).ok_or_else(|| ConfigError::SymbolNotFound(id.to_string()))?;
        self.resolve(&parsed)
    }

    pub fn contains(&self, id: &SymbolId) -> bool {
        self.index.contains_key(id)
    }

    /// Check `value` against the symbol's declared kind and domain.
    pub fn validate(&self, symbol: SymbolRef, value: &Value) -> Result<()> {
        let sym = self.get(symbol)?;
        if sym.domain.admits(sym.kind, value) {
            Ok(())
        } else {
            Err(domain_violation(&sym.id, sym.kind, &sym.domain, value))
        }
    }

    /// Write a validated value. Returns the previous value when it changed.
    pub(crate) fn assign(&mut self, symbol: SymbolRef, value: Value) -> Result<Option<Value>> {
        self.validate(symbol, &value)?;
        let sym = self.get_mut(symbol)?;
        if sym.value == value {
            return Ok(None);
        }
        Ok(Some(std::mem::replace(&mut sym.value, value)))
    }

    /// Returns the previous flag when it changed.
    pub(crate) fn set_visible(&mut self, symbol: SymbolRef, visible: bool) -> Result<Option<bool>> {
        let sym = self.get_mut(symbol)?;
        if sym.visible == visible {
            return Ok(None);
        }
        sym.visible = visible;
        Ok(Some(!visible))
    }

    pub(crate) fn set_locked(&mut self, symbol: SymbolRef, locked: bool) -> Result<()> {
        self.get_mut(symbol)?.locked = locked;
        Ok(())
    }

    pub(crate) fn add_upstream(&mut self, symbol: SymbolRef, upstream: &[SymbolRef]) -> Result<()> {
        let sym = self.get_mut(symbol)?;
        for up in upstream {
            if !sym.upstream.contains(up) {
                sym.upstream.push(*up);
            }
        }
        Ok(())
    }

    /// Put back a journaled copy of a symbol.
    pub(crate) fn restore(&mut self, symbol: SymbolRef, saved: Symbol) {
        if let Some(slot) = self.slots.get_mut(symbol.0) {
            *slot = Some(saved);
        }
    }

    /// Discard every symbol in `instance`'s namespace. Returns how many were
    /// removed.
    pub(crate) fn remove_instance(&mut self, instance: &str) -> usize {
        let mut removed = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|s| s.id.instance() == instance) {
                if let Some(sym) = slot.take() {
                    self.index.remove(&sym.id);
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Live symbols in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolRef, &Symbol)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (SymbolRef(i), s)))
    }

    /// Live symbols of one instance in creation order.
    pub fn instance_symbols<'a>(
        &'a self,
        instance: &'a str,
    ) -> impl Iterator<Item = (SymbolRef, &'a Symbol)> + 'a {
        self.iter().filter(move |(_, s)| s.id.instance() == instance)
    }

    /// Visible when the symbol and all of its parents are visible.
    pub fn is_effectively_visible(&self, symbol: SymbolRef) -> bool {
        let mut cursor = Some(symbol);
        while let Some(current) = cursor {
            match self.get(current) {
                Ok(sym) if sym.visible => cursor = sym.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn get_mut(&mut self, symbol: SymbolRef) -> Result<&mut Symbol> {
        self.slots
            .get_mut(symbol.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| ConfigError::SymbolNotFound(format!("#{}", symbol.0)))
    }
}

fn domain_violation(
    id: &SymbolId,
    kind: SymbolKind,
    domain: &Domain,
    value: &Value,
) -> ConfigError {
    ConfigError::DomainViolation {
        symbol: id.clone(),
        kind,
        value: value.to_string(),
        domain: domain.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnumOption;

    #[test]
    fn create_and_get() {
        let mut store = SymbolStore::new();
        let r = store
            .create("sdramc0", SymbolSpec::integer("SDRAMC_CR_TRCD", 3).range(0, 15))
            .unwrap();
        let sym = store.get(r).unwrap();
        assert_eq!(sym.id().to_string(), "sdramc0.SDRAMC_CR_TRCD");
        assert_eq!(sym.value(), &Value::Int(3));
        assert_eq!(sym.default_value(), &Value::Int(3));
        assert_eq!(store.lookup("sdramc0.SDRAMC_CR_TRCD").unwrap(), r);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut store = SymbolStore::new();
        store.create("core", SymbolSpec::boolean("USE_FREERTOS_VECTORS", false)).unwrap();
        let err = store
            .create("core", SymbolSpec::boolean("USE_FREERTOS_VECTORS", true))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSymbolId(_)));
        // Same name in another namespace is fine.
        store.create("tmr1", SymbolSpec::boolean("USE_FREERTOS_VECTORS", true)).unwrap();
    }

    #[test]
    fn initial_value_checked() {
        let mut store = SymbolStore::new();
        let err = store
            .create("sdramc0", SymbolSpec::integer("SDRAMC_CR_CAS", 4).range(1, 3))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DomainViolation { .. }));
        assert!(store.is_empty());

        let err = store
            .create(
                "sdramc0",
                SymbolSpec::enum_key(
                    "SDRAMC_MDR_MD",
                    vec![EnumOption::new("SDRAM", 0, "SDRAM")],
                    "DDR2",
                ),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::DomainViolation { .. }));
    }

    #[test]
    fn out_of_domain_write_keeps_prior_value() {
        let mut store = SymbolStore::new();
        let r = store
            .create("sdramc0", SymbolSpec::integer("SDRAMC_CR_TRP", 3).range(0, 15))
            .unwrap();
        assert!(store.assign(r, Value::Int(16)).is_err());
        assert!(store.assign(r, Value::Hex(1)).is_err());
        assert_eq!(store.get(r).unwrap().value(), &Value::Int(3));
        assert_eq!(store.assign(r, Value::Int(3)).unwrap(), None);
        assert_eq!(store.assign(r, Value::Int(5)).unwrap(), Some(Value::Int(3)));
    }

    #[test]
    fn unknown_symbols() {
        let store = SymbolStore::new();
        assert!(matches!(store.lookup("core.NOPE"), Err(ConfigError::SymbolNotFound(_))));
        assert!(matches!(store.lookup("garbage"), Err(ConfigError::SymbolNotFound(_))));
    }

    #[test]
    fn visibility_follows_parents() {
        let mut store = SymbolStore::new();
        let menu = store.create("sdramc0", SymbolSpec::menu("SDRAMC_LPR_MENU").hidden()).unwrap();
        let child = store
            .create("sdramc0", SymbolSpec::integer("SDRAMC_LPR_PASR", 0).parent(menu))
            .unwrap();
        assert!(store.get(child).unwrap().visible());
        assert!(!store.is_effectively_visible(child));
        store.set_visible(menu, true).unwrap();
        assert!(store.is_effectively_visible(child));
    }

    #[test]
    fn remove_instance_discards_namespace() {
        let mut store = SymbolStore::new();
        store.create("core", SymbolSpec::integer("MASTERCLK_FREQ", 1)).unwrap();
        let r = store.create("rstc0", SymbolSpec::boolean("RSTC_ENABLE", true)).unwrap();
        store.create("rstc0", SymbolSpec::integer("RSTC_INDEX", 0)).unwrap();
        assert_eq!(store.remove_instance("rstc0"), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(r).is_err());
        assert!(store.lookup("rstc0.RSTC_ENABLE").is_err());
    }
}

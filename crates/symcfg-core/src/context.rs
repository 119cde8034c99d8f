//! Read access handed to recompute callbacks.

use crate::error::{ConfigError, Result};
use crate::store::SymbolStore;
use crate::symbol::{Symbol, SymbolRef, Value};

/// Per-evaluation view of the store.
///
/// A callback may read its own target symbol and the upstream symbols its
/// rule declared, nothing else.
pub struct Context<'a> {
    store: &'a SymbolStore,
    instance: &'a str,
    target: SymbolRef,
    upstream: &'a [SymbolRef],
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        store: &'a SymbolStore,
        instance: &'a str,
        target: SymbolRef,
        upstream: &'a [SymbolRef],
    ) -> Self {
        Self {
            store,
            instance,
            target,
            upstream,
        }
    }

    /// The instance owning the rule being evaluated.
    pub fn instance(&self) -> &str {
        self.instance
    }

    /// The symbol the rule recomputes.
    pub fn target(&self) -> Result<&Symbol> {
        self.store.get(self.target)
    }

    pub fn symbol(&self, symbol: SymbolRef) -> Result<&Symbol> {
        if symbol != self.target && !self.upstream.contains(&symbol) {
            let target = self.store.get(self.target)?.id().clone();
            let read = self.store.get(symbol)?.id().clone();
            return Err(ConfigError::UndeclaredRead { target, read });
        }
        self.store.get(symbol)
    }

    pub fn value(&self, symbol: SymbolRef) -> Result<&Value> {
        Ok(self.symbol(symbol)?.value())
    }

    pub fn boolean(&self, symbol: SymbolRef) -> Result<bool> {
        let value = self.value(symbol)?;
        value.as_bool().ok_or_else(|| self.type_error(symbol, "boolean", value))
    }

    pub fn integer(&self, symbol: SymbolRef) -> Result<i64> {
        let value = self.value(symbol)?;
        value.as_int().ok_or_else(|| self.type_error(symbol, "integer", value))
    }

    pub fn hex(&self, symbol: SymbolRef) -> Result<u64> {
        let value = self.value(symbol)?;
        value.as_hex().ok_or_else(|| self.type_error(symbol, "hex", value))
    }

    pub fn key(&self, symbol: SymbolRef) -> Result<&str> {
        let value = self.value(symbol)?;
        value.as_key().ok_or_else(|| self.type_error(symbol, "enum key", value))
    }

    pub fn string(&self, symbol: SymbolRef) -> Result<&str> {
        let value = self.value(symbol)?;
        value.as_str().ok_or_else(|| self.type_error(symbol, "string", value))
    }

    /// Numeric value of the enumerated option selected in `symbol`.
    pub fn selected_value(&self, symbol: SymbolRef) -> Result<u64> {
        let sym = self.symbol(symbol)?;
        sym.selected_value()
            .ok_or_else(|| self.type_error(symbol, "enum key", sym.value()))
    }

    /// Build a `Recompute` error attributed to the target symbol.
    pub fn fail(&self, detail: impl Into<String>) -> ConfigError {
        match self.store.get(self.target) {
            Ok(target) => ConfigError::Recompute {
                symbol: target.id().clone(),
                detail: detail.into(),
            },
            Err(e) => e,
        }
    }

    fn type_error(&self, symbol: SymbolRef, expected: &str, found: &Value) -> ConfigError {
        let name = self
            .store
            .get(symbol)
            .map(|s| s.id().to_string())
            .unwrap_or_default();
        self.fail(format!("expected {expected} in {name}, found {found}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolSpec;

    #[test]
    fn reads_are_limited_to_declared_upstream() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::integer("A", 2)).unwrap();
        let b = store.create("i", SymbolSpec::integer("B", 3)).unwrap();
        let t = store.create("i", SymbolSpec::integer("T", 0)).unwrap();

        let upstream = [a];
        let ctx = Context::new(&store, "i", t, &upstream);
        assert_eq!(ctx.integer(a).unwrap(), 2);
        assert_eq!(ctx.integer(t).unwrap(), 0);
        let err = ctx.integer(b).unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredRead { .. }));
    }

    #[test]
    fn type_mismatch_is_a_recompute_error() {
        let mut store = SymbolStore::new();
        let a = store.create("i", SymbolSpec::string("A", "ROW11")).unwrap();
        let t = store.create("i", SymbolSpec::integer("T", 0)).unwrap();
        let upstream = [a];
        let ctx = Context::new(&store, "i", t, &upstream);
        let err = ctx.integer(a).unwrap_err();
        assert!(matches!(err, ConfigError::Recompute { ref symbol, .. } if symbol.name() == "T"));
        assert_eq!(ctx.string(a).unwrap(), "ROW11");
    }
}

//! Name resolution for global and local bindings.

use std::collections::HashMap;

/// Where a binding lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Slot in the VM's globals array.
    Global,
    /// Slot relative to the current frame's base pointer.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// One scope level. The outermost table holds globals; each function body
/// gets an enclosed table for its parameters and locals.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    num_definitions: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Bind `name` in this scope. Rebinding an existing name keeps its slot;
    /// new names get the next slot.
    pub fn define(&mut self, name: &str) -> Symbol {
        if let Some(existing) = self.store.get(name) {
            return existing.clone();
        }

        let scope = if self.outer.is_some() {
            SymbolScope::Local
        } else {
            SymbolScope::Global
        };

        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    /// Look `name` up here, then in enclosing scopes. Locals of an enclosing
    /// function are not reachable: only globals are visible across functions.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }

        self.outer
            .as_ref()?
            .resolve(name)
            .filter(|symbol| symbol.scope == SymbolScope::Global)
    }

    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// Drop this scope and return the enclosing one.
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|outer| *outer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn symbol(name: &str, scope: SymbolScope, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope,
            index,
        }
    }

    #[test]
    fn test_define_assigns_increasing_slots() {
        let mut global = SymbolTable::new();
        assert_eq!(global.define("a"), symbol("a", SymbolScope::Global, 0));
        assert_eq!(global.define("b"), symbol("b", SymbolScope::Global, 1));
        assert_eq!(global.num_definitions(), 2);
    }

    #[test]
    fn test_rebinding_reuses_slot() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");
        assert_eq!(global.define("a"), symbol("a", SymbolScope::Global, 0));
        assert_eq!(global.define("c").index, 2);
    }

    #[test]
    fn test_resolve_nested() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut first = SymbolTable::new_enclosed(global);
        first.define("c");

        let mut second = SymbolTable::new_enclosed(first);
        second.define("e");

        assert_eq!(second.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
        assert_eq!(second.resolve("e"), Some(symbol("e", SymbolScope::Local, 0)));
        // Locals of the enclosing function are out of reach
        assert_eq!(second.resolve("c"), None);
        assert_eq!(second.resolve("missing"), None);

        let first = second.into_outer().unwrap();
        assert_eq!(first.resolve("c"), Some(symbol("c", SymbolScope::Local, 0)));
        assert!(!first.is_global());
        assert!(first.into_outer().unwrap().is_global());
    }
}

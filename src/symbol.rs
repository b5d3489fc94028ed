///! Symbol table: interning so that identical identifier text maps to the
///! same u32 id. Symbols are immediate values (no heap allocation) and the
///! table only grows; ids stay valid for the life of the interpreter.

use std::collections::HashMap;

use crate::value::Val;

#[derive(Default)]
pub struct SymbolTable {
    /// name → id
    map: HashMap<String, u32>,
    /// id → name
    names: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Intern a symbol name, returning its id. Idempotent.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.map.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.map.insert(name.to_string(), id);
        id
    }

    /// Intern and box in one step.
    pub fn intern_val(&mut self, name: &str) -> Val {
        Val::symbol(self.intern(name))
    }

    /// Look up name by id.
    pub fn name(&self, id: u32) -> &str {
        &self.names[id as usize]
    }

    /// Id of an already-interned name, without interning it.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.map.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut syms = SymbolTable::new();
        let a = syms.intern("foo");
        let b = syms.intern("foo");
        assert_eq!(a, b);
        assert_eq!(syms.intern_val("foo"), Val::symbol(a));
        assert_eq!(syms.len(), 1);
    }

    #[test]
    fn distinct_text_distinct_symbol() {
        let mut syms = SymbolTable::new();
        let names = ["a", "b", "+", "<=", "eq?", "A"];
        let ids: Vec<u32> = names.iter().map(|n| syms.intern(n)).collect();
        for (i, x) in ids.iter().enumerate() {
            for (j, y) in ids.iter().enumerate() {
                assert_eq!(i == j, x == y);
            }
            assert_eq!(syms.name(*x), names[i]);
        }
        assert_eq!(syms.lookup("nope"), None);
    }
}

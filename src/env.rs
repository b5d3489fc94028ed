///! Contexts (environments) for Sic.
///!
///! A context maps symbol ids to values and has an optional parent. Contexts
///! live in an arena and are referenced by index, so a closure can hold on to
///! its defining context without any ownership games.
///!
///! The store reports failure with Option/bool; turning that into a named
///! error is the interpreter's job since only it can see the symbol table.

use std::collections::BTreeMap;

use crate::value::Val;

/// Handle to a context in the store.
pub type EnvId = usize;

#[derive(Default)]
struct Env {
    bindings: BTreeMap<u32, Val>,
    parent: Option<EnvId>,
}

#[derive(Default)]
pub struct EnvStore {
    envs: Vec<Env>,
}

impl EnvStore {
    pub fn new() -> Self {
        EnvStore::default()
    }

    /// Create a new empty context with no parent.
    pub fn new_top_level(&mut self) -> EnvId {
        let id = self.envs.len();
        self.envs.push(Env::default());
        id
    }

    /// Create a child context.
    pub fn new_child(&mut self, parent: EnvId) -> EnvId {
        let id = self.envs.len();
        self.envs.push(Env {
            bindings: BTreeMap::new(),
            parent: Some(parent),
        });
        id
    }

    /// Does this frame (not its ancestors) bind `sym`?
    pub fn has(&self, env_id: EnvId, sym: u32) -> bool {
        self.envs[env_id].bindings.contains_key(&sym)
    }

    /// Bind `sym` in this frame only. Returns false, leaving the frame
    /// untouched, if the frame already binds it.
    pub fn define(&mut self, env_id: EnvId, sym: u32, val: Val) -> bool {
        if self.has(env_id, sym) {
            return false;
        }
        self.envs[env_id].bindings.insert(sym, val);
        true
    }

    /// Overwrite the nearest existing binding (walks up parent chain).
    /// Returns false if no frame binds `sym`.
    pub fn set(&mut self, env_id: EnvId, sym: u32, val: Val) -> bool {
        match self.find_frame(env_id, sym) {
            Some(frame) => {
                self.envs[frame].bindings.insert(sym, val);
                true
            }
            None => false,
        }
    }

    /// Like `set`, but an unbound name is created in the root frame.
    pub fn root_set(&mut self, env_id: EnvId, sym: u32, val: Val) {
        let frame = self
            .find_frame(env_id, sym)
            .unwrap_or_else(|| self.root(env_id));
        self.envs[frame].bindings.insert(sym, val);
    }

    /// Look up a binding (walks up parent chain).
    pub fn get(&self, env_id: EnvId, sym: u32) -> Option<Val> {
        let frame = self.find_frame(env_id, sym)?;
        self.envs[frame].bindings.get(&sym).copied()
    }

    /// The ultimate ancestor.
    pub fn root(&self, mut env_id: EnvId) -> EnvId {
        while let Some(parent) = self.envs[env_id].parent {
            env_id = parent;
        }
        env_id
    }

    /// Reverse lookup: the first name bound to exactly `val`, scanning each
    /// frame in symbol-id order from `env_id` outward. Linear in the number
    /// of bindings on the chain; only used for diagnostics.
    pub fn name_of(&self, env_id: EnvId, val: Val) -> Option<u32> {
        let mut current = Some(env_id);
        while let Some(id) = current {
            let env = &self.envs[id];
            if let Some((&sym, _)) = env.bindings.iter().find(|(_, v)| **v == val) {
                return Some(sym);
            }
            current = env.parent;
        }
        None
    }

    fn find_frame(&self, env_id: EnvId, sym: u32) -> Option<EnvId> {
        let mut current = Some(env_id);
        while let Some(id) = current {
            if self.envs[id].bindings.contains_key(&sym) {
                return Some(id);
            }
            current = self.envs[id].parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: u32 = 0;
    const Y: u32 = 1;

    fn num(n: f64) -> Val {
        Val::number(n)
    }

    #[test]
    fn define_rejects_same_frame_but_allows_shadowing() {
        let mut envs = EnvStore::new();
        let root = envs.new_top_level();
        assert!(envs.define(root, X, num(1.0)));
        assert!(!envs.define(root, X, num(2.0)));
        assert_eq!(envs.get(root, X), Some(num(1.0)));

        let child = envs.new_child(root);
        assert!(envs.define(child, X, num(3.0)));
        assert_eq!(envs.get(child, X), Some(num(3.0)));
        assert_eq!(envs.get(root, X), Some(num(1.0)));
    }

    #[test]
    fn set_updates_the_frame_that_owns_the_name() {
        let mut envs = EnvStore::new();
        let root = envs.new_top_level();
        let mid = envs.new_child(root);
        let leaf = envs.new_child(mid);
        let sibling = envs.new_child(root);

        envs.define(root, X, num(1.0));
        assert!(envs.set(leaf, X, num(5.0)));
        assert!(!envs.has(leaf, X));
        assert_eq!(envs.get(sibling, X), Some(num(5.0)));

        assert!(!envs.set(leaf, Y, num(0.0)));
        assert_eq!(envs.get(leaf, Y), None);
    }

    #[test]
    fn root_set_falls_back_to_root_frame() {
        let mut envs = EnvStore::new();
        let root = envs.new_top_level();
        let child = envs.new_child(root);
        envs.define(child, X, num(1.0));

        envs.root_set(child, X, num(2.0));
        assert_eq!(envs.get(child, X), Some(num(2.0)));
        assert!(!envs.has(root, X));

        envs.root_set(child, Y, num(3.0));
        assert!(envs.has(root, Y));
        assert!(!envs.has(child, Y));
        assert_eq!(envs.root(child), root);
    }

    #[test]
    fn name_of_scans_outward() {
        let mut envs = EnvStore::new();
        let root = envs.new_top_level();
        let child = envs.new_child(root);
        envs.define(root, Y, num(7.0));
        assert_eq!(envs.name_of(child, num(7.0)), Some(Y));
        assert_eq!(envs.name_of(child, num(8.0)), None);
    }
}

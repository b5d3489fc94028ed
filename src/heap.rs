///! Object heap.
///!
///! Every compound value (pair, string, closure) lives in an arena and is
///! addressed by its index. Objects are immutable once allocated: lists are
///! only ever built back-to-front from a finished slice, so no cell is
///! touched after its index has been handed out.
///!
///! There is no collector; the arena only grows.

use crate::env::EnvId;
use crate::value::Val;

/// The kinds of objects stored on the heap.
#[derive(Debug, Clone)]
pub enum HeapObject {
    /// (first, rest)
    Pair(Val, Val),
    /// Immutable string
    Str(String),
    /// User-defined procedure
    Closure(Closure),
}

#[derive(Debug, Clone)]
pub struct Closure {
    /// Parameter names as symbol ids, in order.
    pub formals: Vec<u32>,
    /// Proper list of body expressions.
    pub body: Val,
    /// Captured defining context.
    pub env: EnvId,
    pub is_macro: bool,
}

#[derive(Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    fn alloc(&mut self, obj: HeapObject) -> Val {
        let index = self.objects.len();
        self.objects.push(obj);
        Val::heap_ref(index)
    }

    // ── Allocation ──

    pub fn cons(&mut self, first: Val, rest: Val) -> Val {
        self.alloc(HeapObject::Pair(first, rest))
    }

    pub fn alloc_string(&mut self, s: &str) -> Val {
        self.alloc(HeapObject::Str(s.to_string()))
    }

    pub fn alloc_closure(&mut self, closure: Closure) -> Val {
        self.alloc(HeapObject::Closure(closure))
    }

    /// Build a proper list from a slice of values.
    pub fn list(&mut self, vals: &[Val]) -> Val {
        let mut result = Val::nil();
        for v in vals.iter().rev() {
            result = self.cons(*v, result);
        }
        result
    }

    // ── Access ──

    pub fn get(&self, val: Val) -> Option<&HeapObject> {
        self.objects.get(val.as_heap_ref()?)
    }

    /// First of a pair; None for anything else (including Nil).
    pub fn first(&self, val: Val) -> Option<Val> {
        match self.get(val)? {
            HeapObject::Pair(a, _) => Some(*a),
            _ => None,
        }
    }

    pub fn rest(&self, val: Val) -> Option<Val> {
        match self.get(val)? {
            HeapObject::Pair(_, b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_string(&self, val: Val) -> Option<&str> {
        match self.get(val)? {
            HeapObject::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_closure(&self, val: Val) -> Option<&Closure> {
        match self.get(val)? {
            HeapObject::Closure(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_pair(&self, val: Val) -> bool {
        matches!(self.get(val), Some(HeapObject::Pair(_, _)))
    }

    pub fn is_closure(&self, val: Val) -> bool {
        matches!(self.get(val), Some(HeapObject::Closure(_)))
    }

    /// Atoms are everything that is not a pair. Nil counts as an atom.
    pub fn is_atom(&self, val: Val) -> bool {
        !self.is_pair(val)
    }

    /// Nil, or a chain of pairs ending in Nil.
    pub fn is_list(&self, val: Val) -> bool {
        let mut current = val;
        loop {
            if current.is_nil() {
                return true;
            }
            match self.rest(current) {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    /// Convert a proper list to a Vec. Returns None if not a proper list.
    pub fn list_to_vec(&self, mut val: Val) -> Option<Vec<Val>> {
        let mut result = Vec::new();
        while !val.is_nil() {
            match self.get(val)? {
                HeapObject::Pair(first, rest) => {
                    result.push(*first);
                    val = *rest;
                }
                _ => return None,
            }
        }
        Some(result)
    }

    /// Zero-based element access; Nil past the end or on an improper tail.
    pub fn nth(&self, list: Val, index: usize) -> Val {
        let mut current = list;
        for _ in 0..index {
            match self.rest(current) {
                Some(next) => current = next,
                None => return Val::nil(),
            }
        }
        self.first(current).unwrap_or(Val::nil())
    }

    /// Structural for pairs, numbers and strings; identity for the rest.
    pub fn equals(&self, a: Val, b: Val) -> bool {
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            return x == y;
        }
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Some(HeapObject::Pair(a1, a2)), Some(HeapObject::Pair(b1, b2))) => {
                self.equals(*a1, *b1) && self.equals(*a2, *b2)
            }
            (Some(HeapObject::Str(s1)), Some(HeapObject::Str(s2))) => s1 == s2,
            _ => false,
        }
    }
}

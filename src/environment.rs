use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to a local frame. Closures keep their defining frame alive
/// through this.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One local scope. Bindings are addressed by slot, assigned in declaration
/// order by the resolver; the global scope lives in the interpreter as a
/// name-keyed map and is never an `Environment`.
#[derive(Debug, Default)]
pub struct Environment {
    values: Vec<Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame whose parent is `enclosing`; `None` means the parent is global.
    pub fn with_enclosing(enclosing: Option<EnvRef>) -> Self {
        Environment {
            values: Vec::new(),
            enclosing,
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Append a binding; its slot is the number of bindings before it.
    pub fn define(&mut self, value: Value) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    /// Walk `distance` parent links from `env`. `None` if the chain is shorter.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut frame: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let parent = frame.borrow().enclosing.clone()?;
            frame = parent;
        }

        Some(frame)
    }

    pub fn get(&self, slot: usize) -> Option<Value> {
        self.values.get(slot).cloned()
    }

    /// Overwrite an existing slot. Returns `false` if the slot does not exist.
    pub fn assign(&mut self, slot: usize, value: Value) -> bool {
        match self.values.get_mut(slot) {
            Some(v) => {
                *v = value;
                true
            }
            None => false,
        }
    }

    pub fn get_at(env: &EnvRef, distance: usize, slot: usize) -> Option<Value> {
        let frame: EnvRef = Self::ancestor(env, distance)?;
        let value = frame.borrow().get(slot);
        value
    }

    pub fn assign_at(env: &EnvRef, distance: usize, slot: usize, value: Value) -> bool {
        match Self::ancestor(env, distance) {
            Some(frame) => frame.borrow_mut().assign(slot, value),
            None => false,
        }
    }
}

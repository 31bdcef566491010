/*!
  A chain-linked variable scope: a symbol table mapping variable names to
  local slot indices, with an optional parent consulted on lookup misses.
  A scope is really just a convenience wrapper around a locked `HashMap`
  plus the parent link.

  Lookup walks the parent chain with an explicit loop, so the depth of
  block nesting never translates into call stack depth. Mutation is
  guarded by an internal lock: sibling subtrees compiled concurrently
  against scopes that share an ancestor read the ancestor safely while
  writing only to their own level.
*/

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use string_cache::DefaultAtom;

use crate::error::{Error, Result};

pub struct Scope {
  bindings: Mutex<HashMap<DefaultAtom, u16>>,
  parent: Option<Arc<Scope>>,
}

impl Scope {
  /// Creates a root scope with no parent.
  pub fn new() -> Arc<Scope> {
    Arc::new(Scope {
      bindings: Mutex::new(HashMap::new()),
      parent: None,
    })
  }

  /// Creates a new scope whose lookups fall back to `self`. The child
  /// starts with no bindings of its own.
  pub fn create_child(self: &Arc<Scope>) -> Arc<Scope> {
    Arc::new(Scope {
      bindings: Mutex::new(HashMap::new()),
      parent: Some(Arc::clone(self)),
    })
  }

  /**
    Binds `name` to `index` at this level.

    Fails with `IndexOutOfRange` if `index` does not fit the instruction
    set's 16-bit local index width, and with `DuplicateBinding` if this
    level already binds `name`. Parent levels are not consulted: shadowing
    an outer binding is permitted.
  */
  pub fn add(&self, name: &str, index: usize) -> Result<()> {
    if index > u16::max_value() as usize {
      return Err(Error::IndexOutOfRange { index });
    }

    let mut bindings = self.bindings.lock().expect("poisoned scope lock");
    let atom = DefaultAtom::from(name);
    if bindings.contains_key(&atom) {
      return Err(Error::DuplicateBinding { name: name.to_string() });
    }

    bindings.insert(atom, index as u16);
    Ok(())
  }

  /// Returns the slot index bound to `name`, searching this level and then
  /// each ancestor in order.
  pub fn get(&self, name: &str) -> Result<u16> {
    let atom = DefaultAtom::from(name);

    let mut level = Some(self);
    while let Some(scope) = level {
      let bindings = scope.bindings.lock().expect("poisoned scope lock");
      if let Some(&index) = bindings.get(&atom) {
        return Ok(index);
      }
      level = scope.parent.as_deref();
    }

    Err(Error::UnboundVariable { name: name.to_string() })
  }
}

//! State Store - current value of every signal seen so far
//!
//! Entries are inserted or overwritten, never removed. The store is owned by
//! the dispatcher and only mutated on the dispatch task, so it needs no
//! locking.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::{Result, RuleError};
use crate::value::Value;

/// Signal name → current value, iterated in key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    signals: BTreeMap<String, Value>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from initial-state entries of the form `name = value`
    ///
    /// Each entry is split on its first `=`, both sides trimmed, and the
    /// value coerced.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            let (name, raw) = entry
                .split_once('=')
                .ok_or_else(|| RuleError::invalid_state(entry, "expected 'name = value'"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(RuleError::invalid_state(entry, "empty signal name"));
            }
            store.set(name, Value::coerce(raw));
        }
        debug!("Seeded state with {} signals", store.len());
        Ok(store)
    }

    /// Write a signal value, returning the previous one
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.signals.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.signals.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Sorted snapshot: `{a=1, b="x", c=true}`
impl fmt::Display for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.signals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value.to_literal())?;
        }
        write!(f, "}}")
    }
}

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tainttrace_core::constants::is_trackable_identifier;
use tainttrace_core::types::Slot;

/// A function's accumulated taint state: local variable names known to
/// carry tainted data, and the slots (parameters/returns) of *callers* that
/// should be considered tainted when calling into this function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaintEntry {
    pub locals: HashSet<String>,
    pub slots: HashSet<String>,
}

/// `function name -> (tainted locals, tainted slots)`, matching the engine's
/// `TaintMap` one-to-one.
#[derive(Debug, Clone, Default)]
pub struct TaintMap(HashMap<String, TaintEntry>);

impl Serialize for TaintMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let sorted: BTreeMap<&String, &TaintEntry> = self.0.iter().collect();
        sorted.serialize(serializer)
    }
}

impl TaintMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, function: &str) -> &mut TaintEntry {
        self.0.entry(function.to_string()).or_default()
    }

    pub fn get(&self, function: &str) -> Option<&TaintEntry> {
        self.0.get(function)
    }

    pub fn contains(&self, function: &str) -> bool {
        self.0.contains_key(function)
    }

    pub fn locals_of(&self, function: &str) -> HashSet<String> {
        self.0
            .get(function)
            .map(|e| e.locals.clone())
            .unwrap_or_default()
    }

    pub fn slots_of(&self, function: &str) -> HashSet<String> {
        self.0
            .get(function)
            .map(|e| e.slots.clone())
            .unwrap_or_default()
    }

    /// Seeds a function's entry directly, used to load pollution-info
    /// starting taint before any propagation runs.
    pub fn seed(&mut self, function: &str, locals: HashSet<String>, slots: HashSet<String>) {
        let entry = self.entry(function);
        entry.locals = locals;
        entry.slots = slots;
    }

    /// Records `var` as a tainted local of `function`, unless it is a
    /// numeric literal, reserved keyword, or denylisted substring — the
    /// invariant that no fabricated or constant name ever ends up tainted.
    pub fn insert_local(&mut self, function: &str, var: &str) {
        if is_trackable_identifier(var) {
            self.entry(function).locals.insert(var.to_string());
        }
    }

    /// Records `slot` (already rendered, e.g. `"#2"`/`"$0"`/`"$*"`) as a
    /// tainted slot of `function`.
    pub fn insert_slot(&mut self, function: &str, slot: Slot) {
        self.entry(function).slots.insert(slot.to_string());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TaintEntry)> {
        self.0.iter()
    }
}

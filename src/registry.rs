//! Variable slot assignment.
//!
//! Names are collected while parsing into a [`Registry`] and only turned into slots once
//! the whole formula has been seen. [`Registry::finalize`] sorts the names by code point,
//! so the slot of a variable never depends on where it first appears in the source:
//! `"y + x"` and `"x + y"` both bind `x` to slot 0.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

/// Identifiers collected during parsing, not yet assigned to slots.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    names: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a variable name. Repeated names are ignored.
    pub fn register(&mut self, name: &str) {
        if !self.names.contains(name) {
            self.names.insert(name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Assigns slots by ascending code-point order of the names.
    pub fn finalize(self) -> Variables {
        Variables::from_names(self.names)
    }
}

/// The immutable name-to-slot mapping of a parsed formula.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Variables {
    sorted_names: Vec<String>,
    indices: HashMap<String, u32>,
}

impl Variables {
    /// Builds the mapping from any collection of names, deduplicating and sorting them.
    ///
    /// # Example
    /// ```
    /// use mexpress::registry::Variables;
    ///
    /// let vars = Variables::from_names(["Δ", "x", "z", "x"]);
    /// assert_eq!(vars.names(), &["x", "z", "Δ"]);
    /// assert_eq!(vars.index_of("Δ"), Some(2));
    /// ```
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // byte order of UTF-8 strings equals code-point order
        let sorted_names: Vec<String> =
            names.into_iter().map(Into::into).sorted().dedup().collect();
        let indices = sorted_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i as u32))
            .collect();

        Self {
            sorted_names,
            indices,
        }
    }

    /// Number of distinct variables.
    pub fn len(&self) -> usize {
        self.sorted_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_names.is_empty()
    }

    /// Names in slot order.
    pub fn names(&self) -> &[String] {
        &self.sorted_names
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.indices.get(name).copied()
    }

    pub fn name(&self, index: u32) -> Option<&str> {
        self.sorted_names.get(index as usize).map(String::as_str)
    }
}

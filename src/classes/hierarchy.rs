//! Documentation inheritance across a type hierarchy
//!
//! Types are registered with their direct bases and their own method docs.
//! Resolution follows the C3 linearization of the hierarchy, the same order
//! multiple-inheritance languages use to resolve methods.

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("type '{0}' is already defined")]
    AlreadyDefined(String),

    #[error("inconsistent hierarchy, no C3 linearization is possible (stuck on {0:?})")]
    Inconsistent(Vec<String>),

    #[error("'{ty}' does not define method '{method}'")]
    UnknownMethod { ty: String, method: String },

    #[error("'{ty}.{method}' already has documentation")]
    AlreadyDocumented { ty: String, method: String },

    #[error("cannot inherit documentation for '{ty}.{method}': no ancestor defines it")]
    NotInAncestors { ty: String, method: String },
}

#[derive(Debug, Clone, Default)]
struct TypeEntry {
    bases: Vec<String>,
    /// Method name to its own doc, `None` when undocumented
    methods: BTreeMap<String, Option<String>>,
}

/// Registry of types, their bases and their method documentation
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    types: HashMap<String, TypeEntry>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with its direct `bases` and its own methods.
    ///
    /// Bases must already be registered and must admit a consistent
    /// linearization.
    pub fn define<I, M, D>(&mut self, name: &str, bases: &[&str], methods: I) -> Result<(), HierarchyError>
    where
        I: IntoIterator<Item = (M, Option<D>)>,
        M: Into<String>,
        D: Into<String>,
    {
        if self.types.contains_key(name) {
            return Err(HierarchyError::AlreadyDefined(name.to_string()));
        }
        self.mro(bases)?;

        let entry = TypeEntry {
            bases: bases.iter().map(|base| base.to_string()).collect(),
            methods: methods
                .into_iter()
                .map(|(method, doc)| (method.into(), doc.map(Into::into)))
                .collect(),
        };
        self.types.insert(name.to_string(), entry);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// C3 linearization of `name`, starting with `name` itself
    pub fn linearize(&self, name: &str) -> Result<Vec<String>, HierarchyError> {
        let entry = self.entry(name)?;
        let bases: Vec<&str> = entry.bases.iter().map(String::as_str).collect();
        let mut order = vec![name.to_string()];
        order.extend(self.mro(&bases)?);
        Ok(order)
    }

    /// Linearization a new type with these `bases` would have, excluding the
    /// new type itself
    pub fn mro(&self, bases: &[&str]) -> Result<Vec<String>, HierarchyError> {
        let mut sequences = Vec::with_capacity(bases.len() + 1);
        for base in bases {
            sequences.push(self.linearize(base)?);
        }
        sequences.push(bases.iter().map(|base| base.to_string()).collect());
        c3_merge(sequences)
    }

    /// Doc of `method` as seen from `name`: the doc of the first type in the
    /// linearization that defines the method
    pub fn doc(&self, name: &str, method: &str) -> Result<Option<&str>, HierarchyError> {
        for ty in self.linearize(name)? {
            if let Some(doc) = self.entry(&ty)?.methods.get(method) {
                return Ok(doc.as_deref());
            }
        }
        Err(HierarchyError::UnknownMethod {
            ty: name.to_string(),
            method: method.to_string(),
        })
    }

    /// Copy the doc of `method` from the nearest ancestor that defines it.
    ///
    /// `name` must define `method` without documentation of its own.
    pub fn inherit_doc(&mut self, name: &str, method: &str) -> Result<Option<String>, HierarchyError> {
        match self.entry(name)?.methods.get(method) {
            None => {
                return Err(HierarchyError::UnknownMethod {
                    ty: name.to_string(),
                    method: method.to_string(),
                });
            }
            Some(Some(_)) => {
                return Err(HierarchyError::AlreadyDocumented {
                    ty: name.to_string(),
                    method: method.to_string(),
                });
            }
            Some(None) => {}
        }

        let ancestors = self.linearize(name)?;
        let inherited = ancestors
            .iter()
            .skip(1)
            .find_map(|ancestor| self.types.get(ancestor)?.methods.get(method).cloned())
            .ok_or_else(|| HierarchyError::NotInAncestors {
                ty: name.to_string(),
                method: method.to_string(),
            })?;

        if let Some(entry) = self.types.get_mut(name) {
            entry.methods.insert(method.to_string(), inherited.clone());
        }
        Ok(inherited)
    }

    fn entry(&self, name: &str) -> Result<&TypeEntry, HierarchyError> {
        self.types
            .get(name)
            .ok_or_else(|| HierarchyError::UnknownType(name.to_string()))
    }
}

/// Merge step of the C3 algorithm
fn c3_merge(mut sequences: Vec<Vec<String>>) -> Result<Vec<String>, HierarchyError> {
    let mut result = Vec::new();
    loop {
        sequences.retain(|seq| !seq.is_empty());
        if sequences.is_empty() {
            return Ok(result);
        }

        // A head is a valid candidate when it appears in no other tail.
        let candidate = sequences
            .iter()
            .map(|seq| &seq[0])
            .find(|head| sequences.iter().all(|seq| !seq[1..].contains(*head)))
            .cloned()
            .ok_or_else(|| {
                HierarchyError::Inconsistent(sequences.iter().map(|seq| seq[0].clone()).collect())
            })?;

        for seq in &mut sequences {
            if seq[0] == candidate {
                seq.remove(0);
            }
        }
        result.push(candidate);
    }
}

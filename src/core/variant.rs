//! Build variants (named build options) attached to a spec node.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The value a variant is set to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantValue {
    /// `+name` / `~name`
    Bool(bool),
    /// `name=value`
    Value(String),
}

impl fmt::Display for VariantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantValue::Bool(b) => write!(f, "{}", b),
            VariantValue::Value(v) => f.write_str(v),
        }
    }
}

/// Variants of one node, kept sorted by name so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VariantMap {
    inner: BTreeMap<String, VariantValue>,
}

impl VariantMap {
    pub fn new() -> Self {
        VariantMap::default()
    }

    pub fn get(&self, name: &str) -> Option<&VariantValue> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Set a variant, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: VariantValue) -> Option<VariantValue> {
        self.inner.insert(name.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariantValue)> {
        self.inner.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Every variant in `other` is set to the same value here.
    pub fn satisfies(&self, other: &VariantMap) -> bool {
        other
            .iter()
            .all(|(name, value)| self.get(name).map_or(true, |v| v == value))
    }

    /// Like [`satisfies`](Self::satisfies), but a variant missing here fails.
    pub fn satisfies_strict(&self, other: &VariantMap) -> bool {
        other.iter().all(|(name, value)| self.get(name) == Some(value))
    }

    /// Merge `other` into this map; returns the name of the first conflicting variant.
    pub fn constrain(&mut self, other: &VariantMap) -> Result<bool, String> {
        let mut changed = false;
        for (name, value) in other.iter() {
            match self.inner.get(name) {
                Some(existing) if existing != value => return Err(name.clone()),
                Some(_) => {}
                None => {
                    self.inner.insert(name.clone(), value.clone());
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

impl fmt::Display for VariantMap {
    /// Boolean variants first as `+a~b`, then valued ones as ` k=v`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.inner {
            if let VariantValue::Bool(b) = value {
                write!(f, "{}{}", if *b { '+' } else { '~' }, name)?;
            }
        }
        for (name, value) in &self.inner {
            if let VariantValue::Value(v) = value {
                write!(f, " {}={}", name, v)?;
            }
        }
        Ok(())
    }
}

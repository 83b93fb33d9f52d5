//! Configuration diffs handed over by the diff engine.

use crate::error::{TranslateError, TranslateResult};
use crate::path::ConfigPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Write operation derived from a change's before/after presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Before and after values of one data node.
///
/// Only `before` means delete, only `after` means create, both mean update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl DataChange {
    pub fn create(after: Value) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn update(before: Value, after: Value) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn delete(before: Value) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }

    /// The operation this change calls for; `None` when both sides are absent.
    pub fn operation(&self) -> Option<Operation> {
        match (&self.before, &self.after) {
            (None, Some(_)) => Some(Operation::Create),
            (Some(_), Some(_)) => Some(Operation::Update),
            (Some(_), None) => Some(Operation::Delete),
            (None, None) => None,
        }
    }
}

/// A set of changes keyed by configuration path.
///
/// Serializes as a JSON object mapping each path to its `before`/`after`.
/// The orchestrator only reads it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: BTreeMap<ConfigPath, DataChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a change, replacing any earlier change for the same path.
    pub fn insert(&mut self, path: ConfigPath, change: DataChange) -> &mut Self {
        self.changes.insert(path, change);
        self
    }

    /// Parses `path` and records a create.
    pub fn create(&mut self, path: &str, after: Value) -> TranslateResult<&mut Self> {
        Ok(self.insert(path.parse()?, DataChange::create(after)))
    }

    /// Parses `path` and records an update.
    pub fn update(&mut self, path: &str, before: Value, after: Value) -> TranslateResult<&mut Self> {
        Ok(self.insert(path.parse()?, DataChange::update(before, after)))
    }

    /// Parses `path` and records a delete.
    pub fn delete(&mut self, path: &str, before: Value) -> TranslateResult<&mut Self> {
        Ok(self.insert(path.parse()?, DataChange::delete(before)))
    }

    pub fn get(&self, path: &ConfigPath) -> Option<&DataChange> {
        self.changes.get(path)
    }

    pub fn contains(&self, path: &ConfigPath) -> bool {
        self.changes.contains_key(path)
    }

    /// Changes in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&ConfigPath, &DataChange)> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// True if every change is a delete.
    pub fn is_teardown(&self) -> bool {
        self.changes
            .values()
            .all(|change| change.operation() == Some(Operation::Delete))
    }

    /// Rejects entries that have neither a before nor an after value.
    pub fn validate(&self) -> TranslateResult<()> {
        for (path, change) in &self.changes {
            if change.operation().is_none() {
                return Err(TranslateError::validation(
                    path,
                    "change has neither before nor after data",
                ));
            }
        }
        Ok(())
    }
}

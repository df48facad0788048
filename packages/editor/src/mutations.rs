//! # Document Mutations
//!
//! Every change to an annotation document, whether typed into a property
//! field or produced by dragging a handle, is a [`Mutation`]: a path plus an
//! [`Edit`].
//!
//! ## Mutation Semantics
//!
//! ### Set / Input
//! - Missing intermediate containers are created, kind inferred from the
//!   following segment
//! - Writing a value loosely equal to the current one is a no-op
//! - `Input` carries raw field text and is coerced first
//!
//! ### Delete
//! - Removes a mapping key, or a list element by position
//! - Deleting something absent is a no-op and creates nothing
//!
//! ### Rename
//! - Atomic move of a value to a new key of the same mapping
//! - Geometry and identity keys are protected
//! - A blank new name deletes the property
//!
//! All checks run before the document is touched, so a rejected mutation
//! leaves no half-created containers behind.

use crate::coerce::coerce;
use crate::path::{ContainerKind, Path, PathError};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Keys whose names cannot be changed from the properties panel
pub const PROTECTED_KEYS: [&str; 7] = ["id", "parent_id", "component_type", "x", "y", "width", "height"];

pub fn is_protected_key(key: &str) -> bool {
    PROTECTED_KEYS.contains(&key)
}

/// What to do at the addressed location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Edit {
    /// Store a typed value as-is
    Set(Value),

    /// Store raw text after coercion
    Input(String),

    /// Remove the addressed key or element
    Delete,

    /// Move the addressed property to a new key
    Rename(String),
}

/// Path-addressed edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub path: Path,
    pub edit: Edit,
}

/// Result of applying a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Document changed; carries what used to live at the path
    Changed { previous: Option<Value> },

    /// Nothing to do
    Unchanged,
}

impl MutationOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, MutationOutcome::Changed { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Property '{0}' cannot be renamed")]
    ProtectedKey(String),

    #[error("Cannot rename '{path}': key '{key}' already exists")]
    KeyExists { path: String, key: String },

    #[error("Nothing to rename at '{0}'")]
    MissingKey(String),

    #[error("'{0}' is a list element and has no name")]
    NotRenamable(String),

    #[error("Invalid property name '{0}'")]
    InvalidKey(String),
}

impl Mutation {
    pub fn new(path: Path, edit: Edit) -> Self {
        Self { path, edit }
    }

    pub fn set(path: &str, value: impl Into<Value>) -> Result<Self, PathError> {
        Ok(Self::new(Path::parse(path)?, Edit::Set(value.into())))
    }

    pub fn input(path: &str, raw: impl Into<String>) -> Result<Self, PathError> {
        Ok(Self::new(Path::parse(path)?, Edit::Input(raw.into())))
    }

    pub fn delete(path: &str) -> Result<Self, PathError> {
        Ok(Self::new(Path::parse(path)?, Edit::Delete))
    }

    pub fn rename(path: &str, new_key: impl Into<String>) -> Result<Self, PathError> {
        Ok(Self::new(Path::parse(path)?, Edit::Rename(new_key.into())))
    }

    /// Value that would be stored by a `Set` or `Input` edit
    pub fn written_value(&self) -> Option<Value> {
        match &self.edit {
            Edit::Set(value) => Some(value.clone()),
            Edit::Input(raw) => Some(coerce(raw)),
            Edit::Delete | Edit::Rename(_) => None,
        }
    }

    /// Check the mutation against a document without applying it
    pub fn validate(&self, root: &Value) -> Result<(), MutationError> {
        match &self.edit {
            Edit::Set(_) | Edit::Input(_) => Ok(self.path.check_writable(root)?),
            Edit::Delete => self.path.resolve(root).map(|_| ()).map_err(Into::into),
            Edit::Rename(new_key) => self.validate_rename(root, new_key.trim()).map(|_| ()),
        }
    }

    /// Apply mutation to a document with validation
    pub fn apply(&self, root: &mut Value) -> Result<MutationOutcome, MutationError> {
        self.validate(root)?;

        match &self.edit {
            Edit::Set(value) => self.apply_write(root, value.clone()),
            Edit::Input(raw) => self.apply_write(root, coerce(raw)),
            Edit::Delete => Ok(self.apply_delete(root)),
            Edit::Rename(new_key) => self.apply_rename(root, new_key.trim()),
        }
    }

    fn apply_write(&self, root: &mut Value, value: Value) -> Result<MutationOutcome, MutationError> {
        if let Some(current) = self.path.resolve(root)? {
            if current.loosely_equals(&value) {
                return Ok(MutationOutcome::Unchanged);
            }
        }

        let previous = write(root, &self.path, value)?;
        Ok(MutationOutcome::Changed { previous })
    }

    fn apply_delete(&self, root: &mut Value) -> MutationOutcome {
        let parent = match self.path.parent() {
            Some(parent) => lookup_mut(root, parent.segments()),
            None => Some(root),
        };

        let removed = match parent {
            Some(Value::Map(map)) => map.remove(self.path.last()),
            Some(Value::List(items)) => match self.path.last().parse::<usize>() {
                Ok(index) if index < items.len() => Some(items.remove(index)),
                _ => None,
            },
            _ => None,
        };

        match removed {
            Some(previous) => MutationOutcome::Changed {
                previous: Some(previous),
            },
            None => MutationOutcome::Unchanged,
        }
    }

    /// Returns `false` when the rename would not change anything
    fn validate_rename(&self, root: &Value, new_key: &str) -> Result<bool, MutationError> {
        let old_key = self.path.last();
        let parent = match self.path.parent() {
            Some(parent) => parent.resolve(root)?,
            None => Some(root),
        };

        let map = match parent {
            Some(Value::Map(map)) => map,
            Some(Value::List(_)) => return Err(MutationError::NotRenamable(self.path.to_string())),
            Some(other) => {
                return Err(PathError::NotAContainer {
                    path: self.path.to_string(),
                    segment: old_key.to_string(),
                    kind: other.kind(),
                }
                .into())
            }
            None => return Err(MutationError::MissingKey(self.path.to_string())),
        };

        if !map.contains_key(old_key) {
            return Err(MutationError::MissingKey(self.path.to_string()));
        }
        if is_protected_key(old_key) {
            return Err(MutationError::ProtectedKey(old_key.to_string()));
        }
        if new_key == old_key {
            return Ok(false);
        }
        if new_key.contains('.') {
            return Err(MutationError::InvalidKey(new_key.to_string()));
        }
        if !new_key.is_empty() && map.contains_key(new_key) {
            return Err(MutationError::KeyExists {
                path: self.path.to_string(),
                key: new_key.to_string(),
            });
        }
        Ok(true)
    }

    fn apply_rename(&self, root: &mut Value, new_key: &str) -> Result<MutationOutcome, MutationError> {
        if !self.validate_rename(root, new_key)? {
            return Ok(MutationOutcome::Unchanged);
        }

        let parent = match self.path.parent() {
            Some(parent) => lookup_mut(root, parent.segments()),
            None => Some(root),
        };
        let Some(Value::Map(map)) = parent else {
            return Err(MutationError::MissingKey(self.path.to_string()));
        };
        let Some(value) = map.remove(self.path.last()) else {
            return Err(MutationError::MissingKey(self.path.to_string()));
        };

        if !new_key.is_empty() {
            map.insert(new_key.to_string(), value.clone());
        }
        Ok(MutationOutcome::Changed {
            previous: Some(value),
        })
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.edit {
            Edit::Set(value) => write!(f, "set {} = {}", self.path, value),
            Edit::Input(raw) => write!(f, "input {} = {:?}", self.path, raw),
            Edit::Delete => write!(f, "delete {}", self.path),
            Edit::Rename(key) => write!(f, "rename {} -> {:?}", self.path, key),
        }
    }
}

/// Walk existing containers only
fn lookup_mut<'a>(root: &'a mut Value, segments: &[String]) -> Option<&'a mut Value> {
    let mut scope = root;
    for segment in segments {
        scope = match scope {
            Value::Map(map) => map.get_mut(segment)?,
            Value::List(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(scope)
}

/// Write `value` at `path`, creating missing containers on the way.
///
/// Returns the value that was replaced, if any.
fn write(root: &mut Value, path: &Path, value: Value) -> Result<Option<Value>, PathError> {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        return Err(PathError::Empty(path.to_string()));
    };

    let mut scope = root;
    for (i, segment) in parents.iter().enumerate() {
        let next = ContainerKind::for_segment(&segments[i + 1]);
        scope = match scope {
            Value::Map(map) => map.entry(segment.clone()).or_insert_with(|| next.empty()),
            Value::List(items) => {
                let index = path.index_in(segment, items.len())?;
                if index == items.len() {
                    items.push(next.empty());
                } else if index > items.len() {
                    return Err(path.out_of_range(index, items.len()));
                }
                &mut items[index]
            }
            other => return Err(path.not_a_container(segment, other)),
        };
    }

    match scope {
        Value::Map(map) => Ok(map.insert(last.clone(), value)),
        Value::List(items) => {
            let index = path.index_in(last, items.len())?;
            match index.cmp(&items.len()) {
                std::cmp::Ordering::Less => Ok(Some(std::mem::replace(&mut items[index], value))),
                std::cmp::Ordering::Equal => {
                    items.push(value);
                    Ok(None)
                }
                std::cmp::Ordering::Greater => Err(path.out_of_range(index, items.len())),
            }
        }
        other => Err(path.not_a_container(last, other)),
    }
}

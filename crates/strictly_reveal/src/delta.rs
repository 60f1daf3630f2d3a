//! Structural diff and patch over JSON trees.
//!
//! A [`Delta`] is an ordered list of [`Edit`]s. Applying `diff(a, b)` to a
//! copy of `a` with [`patch`] yields `b`. Deltas are plain owned data and
//! serialize to a transport-safe JSON shape:
//!
//! ```json
//! [{"op": "set", "path": ["openDoors", "1"], "value": "goat"},
//!  {"op": "remove", "path": ["hands", "a", 1]}]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, trace};

/// One step of a path into a JSON tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object member name.
    #[display("{}", _0)]
    Key(String),
    /// Array position.
    #[display("{}", _0)]
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A primitive edit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Edit {
    /// Sets an object member, replaces an array element, or (with an empty
    /// path) replaces the whole tree.
    Set {
        /// Location being written.
        path: Vec<PathSegment>,
        /// New value.
        value: Value,
    },
    /// Inserts into an array, shifting later elements up.
    Insert {
        /// Location of the new element.
        path: Vec<PathSegment>,
        /// Inserted value.
        value: Value,
    },
    /// Deletes an object member or an array element.
    Remove {
        /// Location being removed.
        path: Vec<PathSegment>,
    },
}

impl Edit {
    /// Returns the path this edit targets.
    pub fn path(&self) -> &[PathSegment] {
        match self {
            Edit::Set { path, .. } | Edit::Insert { path, .. } | Edit::Remove { path } => path,
        }
    }

    /// Returns the value carried by a set or insert.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Edit::Set { value, .. } | Edit::Insert { value, .. } => Some(value),
            Edit::Remove { .. } => None,
        }
    }
}

/// Ordered list of edits between two snapshots of one view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta(Vec<Edit>);

impl Delta {
    /// Creates a delta from a list of edits.
    pub fn new(edits: Vec<Edit>) -> Self {
        Self(edits)
    }

    /// Returns true if the delta changes nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of edits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the edits in application order.
    pub fn edits(&self) -> &[Edit] {
        &self.0
    }

    /// Iterates the edits in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Edit> {
        self.0.iter()
    }
}

impl From<Vec<Edit>> for Delta {
    fn from(edits: Vec<Edit>) -> Self {
        Self(edits)
    }
}

impl<'a> IntoIterator for &'a Delta {
    type Item = &'a Edit;
    type IntoIter = std::slice::Iter<'a, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Error applying a delta to a tree.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum PatchError {
    /// An intermediate segment does not exist in the tree.
    #[display("Path not found: {}", render_path(path))]
    PathNotFound {
        /// Path prefix that failed to resolve.
        path: Vec<PathSegment>,
    },

    /// An array index lies beyond the array.
    #[display("Index {} out of bounds (len {}) at {}", index, len, render_path(path))]
    IndexOutOfBounds {
        /// Full path of the edit.
        path: Vec<PathSegment>,
        /// Requested index.
        index: usize,
        /// Array length at the time of the edit.
        len: usize,
    },

    /// The parent of the target is a scalar, or the segment kind does not fit it.
    #[display("Cannot address {} inside a non-container", render_path(path))]
    NotAContainer {
        /// Full path of the edit.
        path: Vec<PathSegment>,
    },

    /// A remove or insert with an empty path.
    #[display("Cannot remove or insert at the root")]
    RootRemoval,
}

impl std::error::Error for PatchError {}

fn render_path(path: &[PathSegment]) -> String {
    let parts: Vec<String> = path.iter().map(ToString::to_string).collect();
    format!("/{}", parts.join("/"))
}

/// Computes the edits that turn `before` into `after`.
#[instrument(level = "trace", skip_all)]
pub fn diff(before: &Value, after: &Value) -> Delta {
    let mut edits = Vec::new();
    let mut path = Vec::new();
    diff_into(&mut path, before, after, &mut edits);
    trace!(edits = edits.len(), "Computed delta");
    Delta(edits)
}

fn child(path: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut next = path.to_vec();
    next.push(segment);
    next
}

fn diff_into(path: &mut Vec<PathSegment>, before: &Value, after: &Value, out: &mut Vec<Edit>) {
    if before == after {
        return;
    }

    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for key in old.keys().filter(|k| !new.contains_key(*k)) {
                out.push(Edit::Remove {
                    path: child(path, PathSegment::Key(key.clone())),
                });
            }
            for (key, new_value) in new {
                match old.get(key) {
                    Some(old_value) => {
                        path.push(PathSegment::Key(key.clone()));
                        diff_into(path, old_value, new_value, out);
                        path.pop();
                    }
                    None => out.push(Edit::Set {
                        path: child(path, PathSegment::Key(key.clone())),
                        value: new_value.clone(),
                    }),
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => diff_arrays(path, old, new, out),
        _ => out.push(Edit::Set {
            path: path.clone(),
            value: after.clone(),
        }),
    }
}

fn diff_arrays(path: &mut Vec<PathSegment>, old: &[Value], new: &[Value], out: &mut Vec<Edit>) {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    let shared = old_mid.len().min(new_mid.len());

    for i in 0..shared {
        path.push(PathSegment::Index(prefix + i));
        diff_into(path, &old_mid[i], &new_mid[i], out);
        path.pop();
    }

    // Highest index first so earlier removals don't shift later targets.
    for i in (shared..old_mid.len()).rev() {
        out.push(Edit::Remove {
            path: child(path, PathSegment::Index(prefix + i)),
        });
    }

    for (i, value) in new_mid.iter().enumerate().skip(shared) {
        out.push(Edit::Insert {
            path: child(path, PathSegment::Index(prefix + i)),
            value: value.clone(),
        });
    }
}

/// Applies `delta` to `tree` in place, edit by edit.
///
/// # Errors
///
/// Returns a [`PatchError`] if an edit's path does not resolve against the
/// tree. Edits before the failing one remain applied.
#[instrument(level = "trace", skip_all, fields(edits = delta.len()))]
pub fn patch(tree: &mut Value, delta: &Delta) -> Result<(), PatchError> {
    for edit in delta {
        apply_edit(tree, edit)?;
    }
    Ok(())
}

fn apply_edit(tree: &mut Value, edit: &Edit) -> Result<(), PatchError> {
    let path = edit.path();
    let Some((last, parents)) = path.split_last() else {
        return match edit {
            Edit::Set { value, .. } => {
                *tree = value.clone();
                Ok(())
            }
            Edit::Insert { .. } | Edit::Remove { .. } => Err(PatchError::RootRemoval),
        };
    };

    let mut target = &mut *tree;
    for (depth, segment) in parents.iter().enumerate() {
        target = descend(target, segment).ok_or_else(|| PatchError::PathNotFound {
            path: path[..=depth].to_vec(),
        })?;
    }

    match target {
        Value::Object(map) => {
            let key = match last {
                PathSegment::Key(key) => key.clone(),
                PathSegment::Index(index) => index.to_string(),
            };
            match edit {
                Edit::Set { value, .. } => {
                    map.insert(key, value.clone());
                    Ok(())
                }
                Edit::Remove { .. } => map
                    .remove(&key)
                    .map(|_| ())
                    .ok_or_else(|| PatchError::PathNotFound {
                        path: path.to_vec(),
                    }),
                Edit::Insert { .. } => Err(PatchError::NotAContainer {
                    path: path.to_vec(),
                }),
            }
        }
        Value::Array(items) => {
            let index = array_index(last).ok_or_else(|| PatchError::NotAContainer {
                path: path.to_vec(),
            })?;
            let len = items.len();
            let out_of_bounds = || PatchError::IndexOutOfBounds {
                path: path.to_vec(),
                index,
                len,
            };
            match edit {
                Edit::Set { value, .. } if index < len => {
                    items[index] = value.clone();
                    Ok(())
                }
                Edit::Set { value, .. } if index == len => {
                    items.push(value.clone());
                    Ok(())
                }
                Edit::Insert { value, .. } if index <= len => {
                    items.insert(index, value.clone());
                    Ok(())
                }
                Edit::Remove { .. } if index < len => {
                    items.remove(index);
                    Ok(())
                }
                _ => Err(out_of_bounds()),
            }
        }
        _ => Err(PatchError::NotAContainer {
            path: path.to_vec(),
        }),
    }
}

fn array_index(segment: &PathSegment) -> Option<usize> {
    match segment {
        PathSegment::Index(index) => Some(*index),
        PathSegment::Key(key) => key.parse().ok(),
    }
}

fn descend<'v>(value: &'v mut Value, segment: &PathSegment) -> Option<&'v mut Value> {
    match value {
        Value::Object(map) => match segment {
            PathSegment::Key(key) => map.get_mut(key),
            PathSegment::Index(index) => map.get_mut(&index.to_string()),
        },
        Value::Array(items) => array_index(segment).and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

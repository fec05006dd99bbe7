//! Owned JSON tree with path helpers.
//!
//! Paths are sequences of object keys. The `ensure_*` helpers create missing
//! nodes on the way down and fail with a conflict when an existing node has
//! the wrong type, instead of replacing it.

use serde_json::{Map, Value};
use unirun_shared::errors::{UnirunError, UnirunResult};

/// A guest configuration document. The root is always a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuestConfig {
    root: Map<String, Value>,
}

impl GuestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> UnirunResult<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(UnirunError::Config(format!(
                "guest configuration must be a JSON object, found {}",
                kind(&other)
            ))),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> UnirunResult<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec(&self) -> UnirunResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.root)?)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.get(*first)?;
        for key in rest {
            node = node.as_object()?.get(*key)?;
        }
        Some(node)
    }

    pub fn exists(&self, path: &[&str]) -> bool {
        self.get(path).is_some()
    }

    /// Set the value at `path`, creating parent objects as needed.
    pub fn set(&mut self, path: &[&str], value: impl Into<Value>) -> UnirunResult<()> {
        let (last, parents) = split_path(path)?;
        self.ensure_object_at(parents)?
            .insert(last.to_string(), value.into());
        Ok(())
    }

    /// Object at `path`, created (with its parents) when absent.
    pub fn ensure_object_at(&mut self, path: &[&str]) -> UnirunResult<&mut Map<String, Value>> {
        let mut map = &mut self.root;
        for (depth, key) in path.iter().enumerate() {
            let node = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            map = match node {
                Value::Object(child) => child,
                other => return Err(type_conflict(&path[..=depth], "an object", other)),
            };
        }
        Ok(map)
    }

    /// Array at `path` holding at least `size` elements.
    ///
    /// A missing array is created filled with `null`; a shorter one is
    /// padded with `null`.
    pub fn ensure_array_at(&mut self, path: &[&str], size: usize) -> UnirunResult<&mut Vec<Value>> {
        let (last, parents) = split_path(path)?;
        let node = self
            .ensure_object_at(parents)?
            .entry(last.to_string())
            .or_insert_with(|| Value::Array(Vec::with_capacity(size)));
        match node {
            Value::Array(items) => {
                if items.len() < size {
                    items.resize(size, Value::Null);
                }
                Ok(items)
            }
            other => Err(type_conflict(path, "an array", other)),
        }
    }
}

/// Object at `items[index]`; a `null` slot becomes an empty object.
pub fn ensure_object_in_array(
    items: &mut [Value],
    index: usize,
) -> UnirunResult<&mut Map<String, Value>> {
    let len = items.len();
    let slot = items.get_mut(index).ok_or_else(|| {
        UnirunError::Internal(format!("array index {index} out of bounds (len {len})"))
    })?;
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => Ok(map),
        other => Err(UnirunError::Conflict(format!(
            "array element {} is {}, expected an object",
            index,
            kind(other)
        ))),
    }
}

fn split_path<'p, 'k>(path: &'p [&'k str]) -> UnirunResult<(&'k str, &'p [&'k str])> {
    path.split_last()
        .map(|(last, parents)| (*last, parents))
        .ok_or_else(|| UnirunError::Internal("empty guest configuration path".into()))
}

fn type_conflict(path: &[&str], expected: &str, found: &Value) -> UnirunError {
    UnirunError::Conflict(format!(
        "`{}` is {}, expected {}",
        path.join("."),
        kind(found),
        expected
    ))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

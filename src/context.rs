//! context.rs
//! Caller-facing context values and the bounded sanitization walk.
//!
//! `ContextValue` is the type callers build contexts out of. Unlike
//! `serde_json::Value` it can be cyclic (`Ref` wraps an `Rc<RefCell<_>>`), because
//! nothing stops a caller from doing `let mut a = ...; a["x"] = a.clone()`-style
//! aliasing by hand. `sanitize` walks a `ContextValue` tree and produces a plain,
//! guaranteed-acyclic `serde_json::Value` bounded in depth, key count, string
//! length, and sequence length — that bounded value is what actually gets stored
//! on a `Record`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde_json::{json, Map, Value};

const MAX_DEPTH: usize = 10;
const MAX_KEYS: usize = 100;
const MAX_STRING_LEN: usize = 10_000;
const TRUNCATED_STRING_LEN: usize = 1_000;
const MAX_SEQUENCE_LEN: usize = 1_000;

#[derive(Debug, Clone)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ContextValue>),
    Map(Vec<(String, ContextValue)>),
    /// A shared, mutable cell. Two `Ref`s to the same cell are the same object;
    /// a `Ref` reachable from its own contents is a cycle.
    Ref(Rc<RefCell<ContextValue>>),
}

impl ContextValue {
    pub fn map(pairs: impl IntoIterator<Item = (impl Into<String>, ContextValue)>) -> ContextValue {
        ContextValue::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn cell(self) -> Rc<RefCell<ContextValue>> {
        Rc::new(RefCell::new(self))
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::String(s.to_owned())
    }
}
impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::String(s)
    }
}
impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        ContextValue::Int(n)
    }
}
impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        ContextValue::Float(n)
    }
}
impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}

/// Converts a plain (necessarily acyclic) JSON value, such as one produced by a
/// context provider, into a `ContextValue` tree.
impl From<&Value> for ContextValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => ContextValue::Null,
            Value::Bool(b) => ContextValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ContextValue::Int(i)
                } else {
                    ContextValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => ContextValue::String(s.clone()),
            Value::Array(items) => ContextValue::Array(items.iter().map(ContextValue::from).collect()),
            Value::Object(map) => {
                ContextValue::Map(map.iter().map(|(k, v)| (k.clone(), ContextValue::from(v))).collect())
            }
        }
    }
}

/// Sanitizes a top-level context mapping into a bounded, acyclic JSON object.
/// Returns `None` if the mapping has no entries (callers should omit empty context
/// rather than serializing `{}`, per the formatter contract).
pub fn sanitize(root: &ContextValue) -> Option<Map<String, Value>> {
    let mut visited = HashSet::new();
    match sanitize_value(root, 0, &mut visited) {
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => Some(map),
        other => {
            let mut wrapper = Map::new();
            wrapper.insert("_value".to_string(), other);
            Some(wrapper)
        }
    }
}

fn sanitize_value(value: &ContextValue, depth: usize, visited: &mut HashSet<usize>) -> Value {
    match value {
        ContextValue::Null => Value::Null,
        ContextValue::Bool(b) => Value::Bool(*b),
        ContextValue::Int(n) => json!(*n),
        ContextValue::Float(n) => json!(*n),
        ContextValue::String(s) => sanitize_string(s),
        ContextValue::Ref(cell) => {
            let ptr = Rc::as_ptr(cell) as usize;
            if !visited.insert(ptr) {
                return json!({"_circular": "Circular reference detected"});
            }
            let inner = cell.borrow();
            let result = sanitize_value(&inner, depth, visited);
            visited.remove(&ptr);
            result
        }
        ContextValue::Array(items) => {
            if depth > MAX_DEPTH {
                return json!({"_depth": "Max depth exceeded"});
            }
            if items.len() > MAX_SEQUENCE_LEN {
                return json!({"_error": "List too large", "_length": items.len()});
            }
            Value::Array(
                items
                    .iter()
                    .map(|item| sanitize_value(item, depth + 1, visited))
                    .collect(),
            )
        }
        ContextValue::Map(entries) => {
            if depth > MAX_DEPTH {
                return json!({"_depth": "Max depth exceeded"});
            }
            let mut out = Map::new();
            let truncated = entries.len() > MAX_KEYS;
            for (k, v) in entries.iter().take(MAX_KEYS) {
                out.insert(k.clone(), sanitize_value(v, depth + 1, visited));
            }
            if truncated {
                out.insert("_truncated".to_string(), json!(entries.len() - MAX_KEYS));
            }
            Value::Object(out)
        }
    }
}

fn sanitize_string(s: &str) -> Value {
    let len = s.chars().count();
    if len <= MAX_STRING_LEN {
        return Value::String(s.to_owned());
    }
    let head: String = s.chars().take(TRUNCATED_STRING_LEN).collect();
    Value::String(format!("{head}...[truncated]"))
}

/// Merges two acyclic provider contexts, with keys from `overlay` overwriting keys
/// of the same name in `base`. Used to fold `contextProviders` output into the
/// caller-supplied context before sanitization.
pub fn merge_maps(base: &mut Vec<(String, ContextValue)>, overlay: Vec<(String, ContextValue)>) {
    for (key, value) in overlay {
        if let Some(slot) = base.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            base.push((key, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallow_string_passes_through() {
        let ctx = ContextValue::map([("name", ContextValue::from("alice"))]);
        let out = sanitize(&ctx).unwrap();
        assert_eq!(out.get("name").unwrap(), "alice");
    }

    #[test]
    fn empty_context_sanitizes_to_none() {
        let ctx = ContextValue::Map(vec![]);
        assert!(sanitize(&ctx).is_none());
    }

    #[test]
    fn long_string_is_truncated_with_marker() {
        let long = "a".repeat(10_001);
        let ctx = ContextValue::map([("big", ContextValue::from(long.as_str()))]);
        let out = sanitize(&ctx).unwrap();
        let v = out.get("big").unwrap().as_str().unwrap();
        assert!(v.ends_with("...[truncated]"));
        assert_eq!(v.len(), TRUNCATED_STRING_LEN + "...[truncated]".len());
    }

    #[test]
    fn oversized_sequence_becomes_error_marker() {
        let items: Vec<ContextValue> = (0..1001).map(|i| ContextValue::Int(i)).collect();
        let ctx = ContextValue::map([("list", ContextValue::Array(items))]);
        let out = sanitize(&ctx).unwrap();
        let list = out.get("list").unwrap();
        assert_eq!(list.get("_error").unwrap(), "List too large");
        assert_eq!(list.get("_length").unwrap(), 1001);
    }

    #[test]
    fn oversized_mapping_is_truncated() {
        let entries: Vec<(String, ContextValue)> =
            (0..150).map(|i| (format!("k{i}"), ContextValue::Bool(true))).collect();
        let ctx = ContextValue::Map(entries);
        let out = sanitize(&ctx).unwrap();
        assert!(out.contains_key("_truncated"));
        assert_eq!(out.len(), MAX_KEYS + 1);
    }

    #[test]
    fn excessive_nesting_hits_depth_marker() {
        let mut current = ContextValue::map([("leaf", ContextValue::from("v"))]);
        for _ in 0..15 {
            current = ContextValue::map([("inner", current)]);
        }
        let out = sanitize(&current).unwrap();
        let mut cursor = Value::Object(out);
        let mut descended = 0;
        while cursor.get("_depth").is_none() {
            cursor = cursor
                .get("inner")
                .expect("should hit the depth marker before running out of nesting")
                .clone();
            descended += 1;
            assert!(descended <= MAX_DEPTH + 1, "marker should land by depth {}", MAX_DEPTH + 1);
        }
        assert_eq!(cursor.get("_depth").unwrap(), "Max depth exceeded");
    }

    #[test]
    fn self_referential_map_is_flagged_circular() {
        let cell = ContextValue::Map(vec![]).cell();
        {
            let wrapped = ContextValue::Ref(cell.clone());
            *cell.borrow_mut() = ContextValue::Map(vec![("x".to_string(), wrapped)]);
        }
        let root = ContextValue::Ref(cell);
        let out = sanitize(&root).unwrap();
        let inner = out.get("x").unwrap();
        assert_eq!(inner.get("_circular").unwrap(), "Circular reference detected");
    }
}

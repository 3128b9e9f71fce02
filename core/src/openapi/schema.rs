//! Shape inference over observed JSON values.
//!
//! # Design
//! Every observed body becomes a [`Node`]; observations of the same route
//! are folded together with [`Node::merge`]. Each node counts how many
//! observations it covers, which is what makes an object key optional: a
//! key whose count is lower than its parent's was missing somewhere.

use std::fmt;
use std::mem;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null {
        count: u64,
    },
    Bool {
        count: u64,
    },
    Int {
        count: u64,
        min: Option<i64>,
        max: Option<i64>,
    },
    Float {
        count: u64,
        min: Option<f64>,
        max: Option<f64>,
    },
    Str {
        count: u64,
    },
    Object {
        count: u64,
        /// In the order keys were first seen.
        keys: IndexMap<String, Node>,
    },
    Array {
        count: u64,
        element: Option<Box<Node>>,
        min_len: Option<u64>,
        max_len: Option<u64>,
    },
    Union {
        count: u64,
        types: Vec<Node>,
    },
}

impl Node {
    /// Shape of a single observed value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Node::Null { count: 1 },
            Value::Bool(_) => Node::Bool { count: 1 },
            Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Int {
                    count: 1,
                    min: Some(i),
                    max: Some(i),
                },
                None => {
                    let f = n.as_f64();
                    Node::Float {
                        count: 1,
                        min: f,
                        max: f,
                    }
                }
            },
            Value::String(_) => Node::Str { count: 1 },
            Value::Object(map) => Node::Object {
                count: 1,
                keys: map
                    .iter()
                    .map(|(k, v)| (k.clone(), Node::from_value(v)))
                    .collect(),
            },
            Value::Array(items) => {
                let element = items
                    .iter()
                    .map(Node::from_value)
                    .reduce(Node::merge)
                    .map(Box::new);
                let len = items.len() as u64;
                Node::Array {
                    count: 1,
                    element,
                    min_len: Some(len),
                    max_len: Some(len),
                }
            }
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Node::Null { count }
            | Node::Bool { count }
            | Node::Int { count, .. }
            | Node::Float { count, .. }
            | Node::Str { count }
            | Node::Object { count, .. }
            | Node::Array { count, .. }
            | Node::Union { count, .. } => *count,
        }
    }

    fn same_kind(&self, other: &Node) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    /// Fold two observations into one shape.
    ///
    /// Same kinds add their counts and widen their bounds; objects merge key
    /// by key; different kinds end up as alternatives of a union.
    pub fn merge(self, other: Node) -> Node {
        match (self, other) {
            (Node::Union { count, mut types }, other) => {
                let count = count + other.count();
                match other {
                    Node::Union { types: others, .. } => {
                        for t in others {
                            add_or_merge(&mut types, t);
                        }
                    }
                    other => add_or_merge(&mut types, other),
                }
                Node::Union { count, types }
            }
            (node, union @ Node::Union { .. }) => union.merge(node),
            (Node::Null { count: a }, Node::Null { count: b }) => Node::Null { count: a + b },
            (Node::Bool { count: a }, Node::Bool { count: b }) => Node::Bool { count: a + b },
            (Node::Str { count: a }, Node::Str { count: b }) => Node::Str { count: a + b },
            (
                Node::Int {
                    count: a,
                    min: min_a,
                    max: max_a,
                },
                Node::Int {
                    count: b,
                    min: min_b,
                    max: max_b,
                },
            ) => Node::Int {
                count: a + b,
                min: merge_opt(min_a, min_b, i64::min),
                max: merge_opt(max_a, max_b, i64::max),
            },
            (
                Node::Float {
                    count: a,
                    min: min_a,
                    max: max_a,
                },
                Node::Float {
                    count: b,
                    min: min_b,
                    max: max_b,
                },
            ) => Node::Float {
                count: a + b,
                min: merge_opt(min_a, min_b, f64::min),
                max: merge_opt(max_a, max_b, f64::max),
            },
            (
                Node::Object {
                    count: a,
                    keys: mut keys_a,
                },
                Node::Object {
                    count: b,
                    keys: keys_b,
                },
            ) => {
                for (key, node) in keys_b {
                    match keys_a.get_mut(&key) {
                        Some(slot) => {
                            let existing = mem::replace(slot, Node::Null { count: 0 });
                            *slot = existing.merge(node);
                        }
                        None => {
                            keys_a.insert(key, node);
                        }
                    }
                }
                Node::Object {
                    count: a + b,
                    keys: keys_a,
                }
            }
            (
                Node::Array {
                    count: a,
                    element: el_a,
                    min_len: min_a,
                    max_len: max_a,
                },
                Node::Array {
                    count: b,
                    element: el_b,
                    min_len: min_b,
                    max_len: max_b,
                },
            ) => Node::Array {
                count: a + b,
                element: merge_opt(el_a, el_b, |x, y| Box::new((*x).merge(*y))),
                min_len: merge_opt(min_a, min_b, u64::min),
                max_len: merge_opt(max_a, max_b, u64::max),
            },
            (a, b) => Node::Union {
                count: a.count() + b.count(),
                types: vec![a, b],
            },
        }
    }

    /// JSON Schema for this shape. Without constraints, numeric bounds and
    /// array lengths are left out.
    pub fn to_json_schema(&self, include_constraints: bool) -> Value {
        match self {
            Node::Null { .. } => json!({"type": "null"}),
            Node::Bool { .. } => json!({"type": "boolean"}),
            Node::Str { .. } => json!({"type": "string"}),
            Node::Int { min, max, .. } => {
                let mut schema = json!({"type": "integer"});
                if include_constraints {
                    insert_opt(&mut schema, "minimum", *min);
                    insert_opt(&mut schema, "maximum", *max);
                }
                schema
            }
            Node::Float { min, max, .. } => {
                let mut schema = json!({"type": "number"});
                if include_constraints {
                    insert_opt(&mut schema, "minimum", *min);
                    insert_opt(&mut schema, "maximum", *max);
                }
                schema
            }
            Node::Object { count, keys } => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for (key, child) in keys {
                    properties.insert(key.clone(), child.to_json_schema(include_constraints));
                    if child.count() == *count {
                        required.push(Value::String(key.clone()));
                    }
                }
                let mut schema = json!({"type": "object", "properties": properties});
                if !required.is_empty() {
                    schema["required"] = Value::Array(required);
                }
                schema
            }
            Node::Array {
                element,
                min_len,
                max_len,
                ..
            } => {
                let items = element
                    .as_ref()
                    .map(|e| e.to_json_schema(include_constraints))
                    .unwrap_or_else(|| json!({}));
                let mut schema = json!({"type": "array", "items": items});
                if include_constraints {
                    insert_opt(&mut schema, "minItems", *min_len);
                    insert_opt(&mut schema, "maxItems", *max_len);
                }
                schema
            }
            Node::Union { types, .. } => {
                let any_of: Vec<Value> = types
                    .iter()
                    .map(|t| t.to_json_schema(include_constraints))
                    .collect();
                json!({"anyOf": any_of})
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Node::Null { .. } => "Null",
            Node::Bool { .. } => "Bool",
            Node::Int { .. } => "Int",
            Node::Float { .. } => "Float",
            Node::Str { .. } => "Str",
            Node::Object { .. } => "Object",
            Node::Array { .. } => "Array",
            Node::Union { .. } => "Union",
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{}(count={}", self.kind(), self.count())?;
        match self {
            Node::Int { min, max, .. } => {
                write_bound(f, "min", min)?;
                write_bound(f, "max", max)?;
            }
            Node::Float { min, max, .. } => {
                write_bound(f, "min", min)?;
                write_bound(f, "max", max)?;
            }
            Node::Object { count, keys } if !keys.is_empty() => {
                writeln!(f, ", keys={{")?;
                for (i, (key, child)) in keys.iter().enumerate() {
                    let optional = if child.count() != *count { "?" } else { "" };
                    write!(f, "{:pad$}'{key}{optional}': ", "", pad = indent + 4)?;
                    child.write_indented(f, indent + 4)?;
                    writeln!(f, "{}", if i + 1 < keys.len() { "," } else { "" })?;
                }
                write!(f, "{:pad$}}}", "", pad = indent)?;
            }
            Node::Array {
                element,
                min_len,
                max_len,
                ..
            } => {
                write_bound(f, "min_len", min_len)?;
                write_bound(f, "max_len", max_len)?;
                if let Some(element) = element {
                    write!(f, ", element=")?;
                    element.write_indented(f, indent)?;
                }
            }
            Node::Union { types, .. } if !types.is_empty() => {
                writeln!(f, ", types=[")?;
                for (i, t) in types.iter().enumerate() {
                    write!(f, "{:pad$}", "", pad = indent + 4)?;
                    t.write_indented(f, indent + 4)?;
                    writeln!(f, "{}", if i + 1 < types.len() { "," } else { "" })?;
                }
                write!(f, "{:pad$}]", "", pad = indent)?;
            }
            _ => {}
        }
        write!(f, ")")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn add_or_merge(types: &mut Vec<Node>, node: Node) {
    match types.iter().position(|t| t.same_kind(&node)) {
        Some(i) => {
            let existing = types.remove(i);
            types.insert(i, existing.merge(node));
        }
        None => types.push(node),
    }
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: impl FnOnce(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (a, b) => a.or(b),
    }
}

fn insert_opt<T: Into<Value>>(schema: &mut Value, key: &str, value: Option<T>) {
    if let (Some(value), Some(map)) = (value, schema.as_object_mut()) {
        map.insert(key.to_string(), value.into());
    }
}

fn write_bound<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    value: &Option<T>,
) -> fmt::Result {
    match value {
        Some(v) => write!(f, ", {name}={v}"),
        None => Ok(()),
    }
}

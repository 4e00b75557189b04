//! Deterministic identity for tool invocations.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::{Map, Value};

use super::tool::ToolId;

/// Digest of `(tool id, canonicalized arguments)`.
///
/// Origin, server and name are hashed as separate fields, so a builtin named
/// `web:search` never collides with the `search` tool of server `web`.
/// The value is process-local: it comes from `DefaultHasher`, whose output may
/// change between Rust releases, so it serializes for logs but is never read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(tool: &ToolId, arguments: &Map<String, Value>) -> Self {
        let mut hasher = DefaultHasher::new();
        tool.origin.hash(&mut hasher);
        tool.server.hash(&mut hasher);
        tool.name.hash(&mut hasher);
        0xffu8.hash(&mut hasher);
        canonical_object(arguments).hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Serialize a value with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn canonical_object(map: &Map<String, Value>) -> String {
    let mut out = String::new();
    write_object(map, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_object(map: &Map<String, Value>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_canonical(&map[key], out);
    }
    out.push('}');
}

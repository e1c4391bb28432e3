//! Canonical serialization of snapshot payloads.
//!
//! The output is compact JSON with a fixed shape so that the same value
//! always produces the same bytes, whatever order the storage layer or a
//! client happened to keep object keys in:
//!
//! - object keys are sorted by their UTF-8 bytes, at every depth;
//! - arrays keep their element order;
//! - strings use JSON escapes only for `"`, `\` and control characters;
//! - integers are plain decimal, floats use the shortest round-trip form
//!   (so `4` and `4.0` are different values);
//! - no whitespace, locale or timezone dependent formatting.
//!
//! Stored checksums depend on these rules. Changing them requires a new
//! [`CANONICAL_FORMAT`] identifier.

use std::fmt::Write;

use serde_json::Value;

/// Identifier of the serialization rules implemented here.
pub const CANONICAL_FORMAT: &str = "sitevault-canonical-json/v1";

/// Serialize `value` into its canonical string form.
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Serialize `value` into canonical UTF-8 bytes.
pub fn to_canonical_bytes(value: &Value) -> Vec<u8> {
    to_canonical_string(value).into_bytes()
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            // `Number`'s Display is locale-free: itoa for integers, ryu for floats.
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

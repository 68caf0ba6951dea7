//! Deterministic JSON text used as the byte-exact input to signatures.
//!
//! Object keys are sorted by byte order at every level and no whitespace is
//! emitted. Signers and verifiers must both go through [`canonicalize`];
//! ordinary `serde_json` output is not guaranteed to be stable.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Largest integer a double holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(&mut out, value);
    out
}

/// Serialize any value to JSON first, then canonicalize it.
pub fn canonicalize_serializable<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value)?;
    Ok(canonicalize(&json))
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_canonical(out, &map[key]);
            }
            out.push('}');
        }
    }
}

/// Integral doubles print without a fractional part, so `1.0` and `1` sign alike.
fn write_number(out: &mut String, n: &serde_json::Number) {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            out.push_str(&(f as i64).to_string());
        }
        _ => out.push_str(&n.to_string()),
    }
}

fn write_string(out: &mut String, s: &str) {
    // serde_json string escaping cannot fail for a &str.
    out.push_str(&serde_json::to_string(s).unwrap_or_default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_is_irrelevant() {
        let a = canonicalize(&json!({"b": 2, "a": 1}));
        let b = canonicalize(&json!({"a": 1, "b": 2}));
        assert_eq!(a, b);
        assert_eq!(a, "{\"a\":1,\"b\":2}");
    }

    #[test]
    fn test_nested_objects_sorted_arrays_kept() {
        let value = json!({"z": [3, {"y": null, "x": true}], "m": "s"});
        assert_eq!(canonicalize(&value), r#"{"m":"s","z":[3,{"x":true,"y":null}]}"#);
    }

    #[test]
    fn test_byte_order_sorting() {
        let value = json!({"a": 1, "B": 2, "_": 3, "é": 4});
        assert_eq!(canonicalize(&value), r#"{"B":2,"_":3,"a":1,"é":4}"#);
    }

    #[test]
    fn test_string_escaping() {
        let value = json!({"k": "line\n\"quoted\""});
        assert_eq!(canonicalize(&value), r#"{"k":"line\n\"quoted\""}"#);
    }

    #[test]
    fn test_integral_floats_print_as_integers() {
        assert_eq!(canonicalize(&json!(1.0)), "1");
        assert_eq!(canonicalize(&json!(-2.5)), "-2.5");
        assert_eq!(canonicalize(&json!(u64::MAX)), u64::MAX.to_string());
    }

    #[test]
    fn test_serializable_struct() {
        #[derive(Serialize)]
        struct Payload {
            zeta: u8,
            alpha: &'static str,
        }
        let text = canonicalize_serializable(&Payload { zeta: 1, alpha: "x" }).unwrap();
        assert_eq!(text, r#"{"alpha":"x","zeta":1}"#);
    }
}

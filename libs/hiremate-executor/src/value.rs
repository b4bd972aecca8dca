/// JavaScript values as seen by the grading pipeline.
///
/// Arguments flow Rust -> engine and return values flow engine -> Rust as
/// `Value`s. The type is richer than JSON: `undefined`, `NaN`
/// and the infinities all occur in real submissions and must survive the
/// trip so the comparator can see them.
///
/// **Serde form:**
/// The derived serde representation is a self-describing tagged form
/// (`{"t":"number","v":"NaN"}`), used between the engine harness, the
/// worker process and the executor. Plain JSON from test cases goes through
/// [`Value::from_json`] instead.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(#[serde(with = "js_number")] f64),
    String(String),
    Array(Vec<Value>),
    /// Own enumerable properties in JavaScript property order.
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Build an object the way a JavaScript engine would store it: a repeated
    /// key keeps its first position and takes the last value, and array-index
    /// keys enumerate before all other keys in ascending numeric order.
    pub fn object<I>(entries: I) -> Value
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut deduped: Vec<(String, Value)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (key, value) in entries {
            match positions.get(&key) {
                Some(&at) => deduped[at].1 = value,
                None => {
                    positions.insert(key.clone(), deduped.len());
                    deduped.push((key, value));
                }
            }
        }
        Self::ordered(deduped)
    }

    /// Index keys first, then the rest in insertion order. Keys must
    /// already be unique.
    fn ordered(entries: Vec<(String, Value)>) -> Value {
        let (mut indexed, named): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|(k, _)| array_index(k).is_some());
        indexed.sort_by_cached_key(|(k, _)| array_index(k));
        indexed.extend(named);
        Value::Object(indexed)
    }

    /// Convert parsed JSON, keeping object key order.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            // serde_json maps hold each key once
            serde_json::Value::Object(map) => {
                Self::ordered(map.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect())
            }
        }
    }

    /// Property lookup on objects; `None` for every other variant.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// `JSON.stringify` semantics. Returns `None` where JavaScript would
    /// return `undefined` (a top-level `undefined`).
    pub fn to_json(&self) -> Option<String> {
        let mut out = String::new();
        if self.write_json(&mut out) {
            Some(out)
        } else {
            None
        }
    }

    fn write_json(&self, out: &mut String) -> bool {
        match self {
            Value::Undefined => return false,
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) if n.is_finite() => out.push_str(&format_number(*n)),
            Value::Number(_) => out.push_str("null"),
            Value::String(s) => quote_into(s, out),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if !item.write_json(out) {
                        out.push_str("null");
                    }
                }
                out.push(']');
            }
            Value::Object(entries) => {
                out.push('{');
                let mut first = true;
                for (key, value) in entries {
                    if matches!(value, Value::Undefined) {
                        continue;
                    }
                    if !first {
                        out.push(',');
                    }
                    first = false;
                    quote_into(key, out);
                    out.push(':');
                    value.write_json(out);
                }
                out.push('}');
            }
        }
        true
    }
}

/// Canonical array index: decimal, no leading zeros, below 2^32 - 1.
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<u32>().ok().filter(|n| *n != u32::MAX)
}

/// ECMAScript `Number::toString` for finite, radix-10 numbers.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", format_number(-n));
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e2"
    let sci = format!("{:e}", n);
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return sci;
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let e = (point - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, sign, e)
        } else {
            let (lead, rest) = digits.split_at(1);
            format!("{}.{}e{}{}", lead, rest, sign, e)
        }
    }
}

fn quote_into(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Finite numbers as JSON numbers, the rest as their JavaScript names.
mod js_number {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if n.is_finite() {
            serializer.serialize_f64(*n)
        } else if n.is_nan() {
            serializer.serialize_str("NaN")
        } else if *n > 0.0 {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Named(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(n) => Ok(n),
            Repr::Named(name) => match name.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid number '{}'", other))),
            },
        }
    }
}

/// Input Normalizer
///
/// Converts the string encodings stored with a test case into concrete
/// values: an ordered argument list for the input, a single value for the
/// expected output.
///
/// **Input strategies (first success wins):**
/// 1. JSON object -> its values in JavaScript property order
/// 2. JSON array -> used as the positional argument list
/// 3. Any other JSON value -> a single argument
/// 4. `[` + raw + `]` as JSON (comma-separated legacy inputs)
/// 5. `[` + raw + `]` through the restricted literal parser
///
/// Object inputs rely on key order matching the function's parameter order
/// unless the problem declares its parameter names, see
/// [`normalize_input_with_parameters`].
use crate::error::ExecutionError;
use crate::literal::parse_literal;
use crate::value::Value;
use tracing::debug;

/// Normalize a raw test-case input into positional arguments.
pub fn normalize_input(raw: &str) -> Result<Vec<Value>, ExecutionError> {
    normalize(raw, None)
}

/// Like [`normalize_input`], but JSON-object inputs are mapped by parameter
/// name. Names missing from the object become `undefined`.
pub fn normalize_input_with_parameters(
    raw: &str,
    parameters: &[String],
) -> Result<Vec<Value>, ExecutionError> {
    normalize(raw, Some(parameters))
}

fn normalize(raw: &str, parameters: Option<&[String]>) -> Result<Vec<Value>, ExecutionError> {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(raw) {
        return Ok(match Value::from_json(parsed) {
            Value::Object(entries) => match parameters {
                Some(names) => names
                    .iter()
                    .map(|name| {
                        entries
                            .iter()
                            .find(|(k, _)| k == name)
                            .map(|(_, v)| v.clone())
                            .unwrap_or(Value::Undefined)
                    })
                    .collect(),
                None => entries.into_iter().map(|(_, v)| v).collect(),
            },
            Value::Array(items) => items,
            scalar => vec![scalar],
        });
    }

    let wrapped = format!("[{}]", raw);

    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(&wrapped) {
        debug!("input parsed as comma-separated JSON");
        return Ok(items.into_iter().map(Value::from_json).collect());
    }

    match parse_literal(&wrapped) {
        Ok(Value::Array(items)) => {
            debug!("input parsed as JavaScript literal");
            Ok(items)
        }
        Ok(_) | Err(_) => Err(ExecutionError::InvalidInputFormat(raw.to_string())),
    }
}

/// Normalize a raw expected output: JSON when it parses, otherwise the raw
/// text itself as a string.
pub fn normalize_output(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(parsed) => Value::from_json(parsed),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Keys of a JSON-object input in the order they would be passed as
/// arguments. `None` for inputs that are not JSON objects.
pub fn object_keys(raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<serde_json::Value>(raw).ok().map(Value::from_json)? {
        Value::Object(entries) => Some(entries.into_iter().map(|(k, _)| k).collect()),
        _ => None,
    }
}

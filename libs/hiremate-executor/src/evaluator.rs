/// Result Comparator - Language-Agnostic Grading
///
/// **Core Responsibility:**
/// Decide whether a returned value matches the expected value and shape
/// the per-case and per-run records handed back to callers.
///
/// **Critical Properties:**
/// - Knows nothing about interpreters or worker processes
/// - Pure functions: (actual, expected) -> verdict
///
/// **Equality Rules:**
/// - Deep structural equality over arrays, objects and primitives
/// - Object keys: order-insensitive, set-sensitive (`{a: undefined}` != `{}`)
/// - `NaN` equals `NaN`
/// - `+0` equals `-0`
/// - Arrays never equal objects, `null` never equals `undefined`
use crate::value::Value;
use hiremate_common::types::{CaseReport, ExecutionResult, RunReport, RunStatus, TestCase};
use std::collections::HashMap;

pub const MISMATCH_MESSAGE: &str = "Output doesn't match expected result";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub passed: bool,
    pub error: Option<String>,
}

pub fn deep_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            if a.len() != b.len() {
                return false;
            }
            let by_key: HashMap<&str, &Value> = b.iter().map(|(k, v)| (k.as_str(), v)).collect();
            a.iter().all(|(key, x)| {
                by_key
                    .get(key.as_str())
                    .is_some_and(|y| deep_equal(x, y))
            })
        }
        _ => false,
    }
}

pub fn compare(actual: &Value, expected: &Value) -> Comparison {
    if deep_equal(actual, expected) {
        Comparison {
            passed: true,
            error: None,
        }
    } else {
        Comparison {
            passed: false,
            error: Some(MISMATCH_MESSAGE.to_string()),
        }
    }
}

/// Grade one case that produced a value.
///
/// `output` is the `JSON.stringify` of the actual value (absent for
/// `undefined`); `expectedOutput` is the stringified normalized expectation,
/// falling back to the raw test-case text.
pub fn evaluate_case(test_case: &TestCase, actual: &Value, expected: &Value) -> ExecutionResult {
    let comparison = compare(actual, expected);
    ExecutionResult {
        passed: comparison.passed,
        output: actual.to_json(),
        expected_output: expected
            .to_json()
            .unwrap_or_else(|| test_case.expected_output.clone()),
        error: comparison.error,
        test_case_id: test_case.id.clone(),
    }
}

/// Build the "Run" response from results in test-case order.
pub fn aggregate(test_cases: &[TestCase], results: &[ExecutionResult]) -> RunReport {
    let cases: Vec<CaseReport> = test_cases
        .iter()
        .zip(results)
        .map(|(test_case, result)| CaseReport {
            input: test_case.input.clone(),
            expected: result.expected_output.clone(),
            actual: result
                .output
                .clone()
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| "Error".to_string()),
            passed: result.passed,
            error: result.error.clone(),
        })
        .collect();

    let passed_tests = cases.iter().filter(|c| c.passed).count();
    let total_tests = cases.len();

    RunReport {
        status: if passed_tests == total_tests {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        },
        results: cases,
        total_tests,
        passed_tests,
    }
}

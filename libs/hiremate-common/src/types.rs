use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the grading engine accepts.
///
/// TypeScript is executed exactly like JavaScript: nothing is transpiled, so
/// type annotations in a submission surface as compile errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
}

impl Language {
    /// Exact, case-sensitive match against the allow-list.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "javascript" => Some(Language::JavaScript),
            "typescript" => Some(Language::TypeScript),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (input, expected output, visibility) triple used to grade a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            id: None,
            input: input.into(),
            expected_output: expected_output.into(),
            is_hidden: false,
        }
    }
}

/// Outcome of grading a single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub passed: bool,
    /// `JSON.stringify` of the returned value; absent when the invocation
    /// failed or returned something with no JSON form (e.g. `undefined`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub expected_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
}

impl ExecutionResult {
    /// A failed result for a case that never produced a value. The expected
    /// output is echoed verbatim from the test case.
    pub fn errored(test_case: &TestCase, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            output: None,
            expected_output: test_case.expected_output.clone(),
            error: Some(message.into()),
            test_case_id: test_case.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Passed,
    Failed,
}

/// Per-case row of a run report, shaped for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body of a "Run" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub status: RunStatus,
    pub results: Vec<CaseReport>,
    pub total_tests: usize,
    pub passed_tests: usize,
}

/// Dispatcher - Submission Orchestration
///
/// **Responsibility:**
/// Take a submission and its test cases, drive every case through
/// normalize -> invoke -> compare, and return one `ExecutionResult` per case
/// in input order. Nothing escapes as an error: every failure is folded
/// into the affected case's `error` field.
///
/// **Flow:**
/// 1. Reject unsupported languages (every case fails, nothing runs)
/// 2. Wait for an admission permit (bounded, FIFO)
/// 3. Run the case loop under the Timeout Governor
///
/// This module is the glue layer. It knows nothing about:
/// - How code executes (engine's job)
/// - How values are compared (evaluator's job)
use crate::engine::{CodeRunner, InProcessEngine, Invocation, Limits, RunPermit};
use crate::error::ExecutionError;
use crate::evaluator;
use crate::normalizer::{normalize_input, normalize_input_with_parameters, normalize_output};
use crate::process::ProcessEngine;
use hiremate_common::config::{Backend, ExecutorConfig, TimeoutPolicy};
use hiremate_common::types::{ExecutionResult, Language, TestCase};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

const WORKER_BIN: &str = "hiremate-worker";

/// A piece of code to grade.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub language: String,
    pub source_code: String,
    pub function_name: String,
    /// Declared parameter names; JSON-object inputs are mapped by name when set.
    pub parameters: Option<Vec<String>>,
}

pub struct Executor {
    config: ExecutorConfig,
    runner: Arc<dyn CodeRunner>,
    admission: Arc<Semaphore>,
}

impl Executor {
    pub fn new(config: ExecutorConfig, runner: Arc<dyn CodeRunner>) -> Self {
        let permits = config.max_concurrent_runs.max(1);
        Self {
            config,
            runner,
            admission: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Build the backend named by the configuration.
    pub fn from_config(config: ExecutorConfig) -> Self {
        let runner: Arc<dyn CodeRunner> = match config.backend {
            Backend::InProcess => Arc::new(InProcessEngine::new()),
            Backend::Process => {
                let worker = config.worker_bin.clone().unwrap_or_else(default_worker_bin);
                if !worker.exists() {
                    warn!(
                        worker = %worker.display(),
                        "Worker binary not found; build hiremate-worker or set HIREMATE_WORKER_BIN"
                    );
                }
                Arc::new(ProcessEngine::new(worker))
            }
        };
        info!(backend = runner.name(), "Executor initialised");
        Self::new(config, runner)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.runner.name()
    }

    /// Admission slots not held by a run or by code a run left executing.
    pub fn available_permits(&self) -> usize {
        self.admission.available_permits()
    }

    /// Grade `source` against `test_cases`, calling `function_name`.
    pub async fn execute_code(
        &self,
        language: &str,
        source: &str,
        test_cases: &[TestCase],
        function_name: &str,
    ) -> Vec<ExecutionResult> {
        let submission = Submission {
            language: language.to_string(),
            source_code: source.to_string(),
            function_name: function_name.to_string(),
            parameters: None,
        };
        self.execute(&submission, test_cases).await
    }

    #[instrument(
        skip_all,
        fields(
            language = %submission.language,
            function = %submission.function_name,
            test_count = test_cases.len()
        )
    )]
    pub async fn execute(&self, submission: &Submission, test_cases: &[TestCase]) -> Vec<ExecutionResult> {
        if Language::from_str(&submission.language).is_none() {
            warn!("Rejected unsupported language");
            let err = ExecutionError::UnsupportedLanguage(submission.language.clone());
            return fail_all(test_cases, &err);
        }

        if test_cases.is_empty() {
            return Vec::new();
        }

        // Engine threads share this permit; the slot is free again only when
        // the run is over and none of its code is still executing
        let permit = match self.admission.clone().acquire_owned().await {
            Ok(permit) => RunPermit::new(permit),
            Err(_) => {
                let err = ExecutionError::Backend("executor is shutting down".to_string());
                return fail_all(test_cases, &err);
            }
        };

        if submission.source_code.len() > self.config.max_source_bytes {
            let err = ExecutionError::SourceTooLarge {
                max: self.config.max_source_bytes,
            };
            return fail_all(test_cases, &err);
        }

        let start = Instant::now();
        let deadline = Duration::from_millis(self.config.timeout_ms);

        let results = match self.config.timeout_policy {
            TimeoutPolicy::Submission => {
                match timeout(deadline, self.run_all(submission, test_cases, &permit)).await {
                    Ok(results) => results,
                    Err(_) => {
                        warn!(timeout_ms = self.config.timeout_ms, "Submission timed out");
                        fail_all(test_cases, &ExecutionError::Timeout)
                    }
                }
            }
            TimeoutPolicy::PerTestCase => {
                let mut results = Vec::with_capacity(test_cases.len());
                for (index, test_case) in test_cases.iter().enumerate() {
                    match timeout(deadline, self.run_case(submission, test_case, &permit)).await {
                        Ok(result) => results.push(result),
                        Err(_) => {
                            warn!(
                                test_num = index + 1,
                                timeout_ms = self.config.timeout_ms,
                                "Test case timed out"
                            );
                            results.push(ExecutionResult::errored(test_case, ExecutionError::Timeout.to_string()));
                        }
                    }
                }
                results
            }
        };

        let passed = results.iter().filter(|r| r.passed).count();
        info!(
            backend = self.runner.name(),
            passed,
            total = results.len(),
            execution_ms = start.elapsed().as_millis() as u64,
            "Submission graded"
        );

        results
    }

    async fn run_all(
        &self,
        submission: &Submission,
        test_cases: &[TestCase],
        permit: &RunPermit,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(test_cases.len());
        for test_case in test_cases {
            results.push(self.run_case(submission, test_case, permit).await);
        }
        results
    }

    async fn run_case(&self, submission: &Submission, test_case: &TestCase, permit: &RunPermit) -> ExecutionResult {
        let result = match self.grade(submission, test_case, permit).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::errored(test_case, e.to_string()),
        };

        debug!(
            test_case_id = ?test_case.id,
            passed = result.passed,
            error = ?result.error,
            "Test case graded"
        );
        result
    }

    async fn grade(
        &self,
        submission: &Submission,
        test_case: &TestCase,
        permit: &RunPermit,
    ) -> Result<ExecutionResult, ExecutionError> {
        if test_case.input.len() > self.config.max_input_bytes {
            return Err(ExecutionError::InputTooLarge {
                max: self.config.max_input_bytes,
            });
        }

        let args = match &submission.parameters {
            Some(names) => normalize_input_with_parameters(&test_case.input, names)?,
            None => normalize_input(&test_case.input)?,
        };

        let invocation = Invocation {
            source: submission.source_code.clone(),
            function_name: submission.function_name.clone(),
            args,
            limits: Limits {
                loop_iteration_limit: self.config.loop_iteration_limit,
                recursion_limit: self.config.recursion_limit,
            },
        };

        let actual = self.runner.invoke_with_permit(&invocation, permit.clone()).await?;
        let expected = normalize_output(&test_case.expected_output);

        Ok(evaluator::evaluate_case(test_case, &actual, &expected))
    }
}

fn fail_all(test_cases: &[TestCase], err: &ExecutionError) -> Vec<ExecutionResult> {
    let message = err.to_string();
    test_cases
        .iter()
        .map(|tc| ExecutionResult::errored(tc, message.clone()))
        .collect()
}

/// `hiremate-worker` next to the running executable.
fn default_worker_bin() -> PathBuf {
    let name = format!("{}{}", WORKER_BIN, std::env::consts::EXE_SUFFIX);
    match std::env::current_exe() {
        Ok(exe) => exe.with_file_name(name),
        Err(_) => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TWO_SUM: &str = r#"
function twoSum(nums, target) {
  if (nums.length === 0) throw new Error("Index out of range");
  for (let i = 0; i < nums.length; i++) {
    for (let j = i + 1; j < nums.length; j++) {
      if (nums[i] + nums[j] === target) return [i, j];
    }
  }
  return [];
}
"#;

    fn real_executor(config: ExecutorConfig) -> Executor {
        Executor::new(config, Arc::new(InProcessEngine::new()))
    }

    /// Echoes its first argument after sleeping that many milliseconds.
    #[derive(Default)]
    struct SleepyRunner {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl CodeRunner for SleepyRunner {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        async fn invoke(&self, invocation: &Invocation) -> Result<Value, ExecutionError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let first = invocation.args.first().cloned().unwrap_or(Value::Undefined);
            if let Value::Number(ms) = first {
                tokio::time::sleep(Duration::from_millis(ms as u64)).await;
            }

            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(first)
        }
    }

    fn sleepy_config(policy: TimeoutPolicy) -> ExecutorConfig {
        ExecutorConfig {
            timeout_ms: 300,
            timeout_policy: policy,
            ..ExecutorConfig::default()
        }
    }

    fn sleepy_cases() -> Vec<TestCase> {
        vec![
            TestCase::new("10", "10"),
            TestCase::new("2000", "2000"),
            TestCase::new("10", "10"),
        ]
    }

    #[tokio::test]
    async fn test_unsupported_language_fails_every_case() {
        let executor = real_executor(ExecutorConfig::default());
        let cases = vec![TestCase::new("1", "1"), TestCase::new("2", "2")];

        let results = executor.execute_code("python", "def f(x): return x", &cases, "f").await;
        assert_eq!(results.len(), 2);
        for (result, case) in results.iter().zip(&cases) {
            assert!(!result.passed);
            assert_eq!(result.output, None);
            assert_eq!(result.expected_output, case.expected_output);
            assert_eq!(
                result.error.as_deref(),
                Some("Language 'python' is not supported. Please use JavaScript or TypeScript.")
            );
        }

        let results = executor.execute_code("JavaScript", TWO_SUM, &cases, "twoSum").await;
        assert!(results.iter().all(|r| r.error.as_deref().unwrap_or("").contains("not supported")));
    }

    #[tokio::test]
    async fn test_empty_test_list_returns_empty() {
        let executor = real_executor(ExecutorConfig::default());
        assert!(executor.execute_code("javascript", TWO_SUM, &[], "twoSum").await.is_empty());
    }

    #[tokio::test]
    async fn test_runtime_error_is_isolated_to_its_case() {
        let executor = real_executor(ExecutorConfig::default());
        let cases = vec![
            TestCase::new(r#"{"nums":[2,7,11,15],"target":9}"#, "[0,1]"),
            TestCase::new(r#"{"nums":[],"target":1}"#, "[]"),
            TestCase::new("[3,2,4], 6", "[1,2]"),
        ];

        let results = executor.execute_code("javascript", TWO_SUM, &cases, "twoSum").await;
        assert_eq!(results.len(), 3);

        assert!(results[0].passed);
        assert_eq!(results[0].output.as_deref(), Some("[0,1]"));

        assert!(!results[1].passed);
        assert_eq!(results[1].output, None);
        assert_eq!(results[1].expected_output, "[]");
        assert_eq!(results[1].error.as_deref(), Some("Index out of range"));

        assert!(results[2].passed);
        assert_eq!(results[2].expected_output, "[1,2]");
    }

    #[tokio::test]
    async fn test_wrong_answer_reports_mismatch() {
        let executor = real_executor(ExecutorConfig::default());
        let cases = vec![TestCase::new("[[3,3], 6]", "[0,1]")];
        let source = "function twoSum(nums, target) { return [1, 0]; }";

        let results = executor.execute_code("javascript", source, &cases, "twoSum").await;
        assert!(!results[0].passed);
        assert_eq!(results[0].output.as_deref(), Some("[1,0]"));
        assert_eq!(results[0].error.as_deref(), Some("Output doesn't match expected result"));
    }

    #[tokio::test]
    async fn test_syntax_error_fails_every_case_identically() {
        let executor = real_executor(ExecutorConfig::default());
        let cases = vec![TestCase::new("1", "1"), TestCase::new("2", "2")];

        let results = executor
            .execute_code("javascript", "function f(x) { return x +; }", &cases, "f")
            .await;
        assert!(results.iter().all(|r| !r.passed && r.output.is_none()));
        assert!(results[0].error.is_some());
        assert_eq!(results[0].error, results[1].error);
    }

    #[tokio::test]
    async fn test_typescript_runs_as_javascript() {
        let executor = real_executor(ExecutorConfig::default());
        let cases = vec![TestCase::new("[2, 3]", "5")];

        let plain = executor
            .execute_code("typescript", "function add(a, b) { return a + b; }", &cases, "add")
            .await;
        assert!(plain[0].passed);

        let annotated = executor
            .execute_code(
                "typescript",
                "function add(a: number, b: number): number { return a + b; }",
                &cases,
                "add",
            )
            .await;
        assert!(!annotated[0].passed);
        assert!(annotated[0].error.is_some());
    }

    #[tokio::test]
    async fn test_invalid_input_only_fails_that_case() {
        let executor = real_executor(ExecutorConfig::default());
        let cases = vec![TestCase::new("{nums: [1,2}", "0"), TestCase::new("'abc'", "3")];
        let source = "function len(x) { return x.length; }";

        let results = executor.execute_code("javascript", source, &cases, "len").await;
        assert_eq!(results[0].error.as_deref(), Some("Invalid input format: {nums: [1,2}"));
        assert!(results[1].passed);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let executor = real_executor(ExecutorConfig::default());
        let source = "var calls = 0; function f(x) { calls++; return [x, calls]; }";
        let cases = vec![TestCase::new("7", "[7,1]"), TestCase::new("8", "[8,1]")];

        let first = executor.execute_code("javascript", source, &cases, "f").await;
        let second = executor.execute_code("javascript", source, &cases, "f").await;
        assert_eq!(first, second);
        assert!(first.iter().all(|r| r.passed));
    }

    #[tokio::test]
    async fn test_parameters_map_object_inputs_by_name() {
        let executor = real_executor(ExecutorConfig::default());
        let submission = Submission {
            language: "javascript".to_string(),
            source_code: "function sub(a, b) { return a - b; }".to_string(),
            function_name: "sub".to_string(),
            parameters: Some(vec!["a".to_string(), "b".to_string()]),
        };
        let cases = vec![TestCase::new(r#"{"b":1,"a":10}"#, "9")];

        let results = executor.execute(&submission, &cases).await;
        assert!(results[0].passed, "{:?}", results[0]);

        let positional = executor
            .execute_code("javascript", &submission.source_code, &cases, "sub")
            .await;
        assert!(!positional[0].passed);
        assert_eq!(positional[0].output.as_deref(), Some("-9"));
    }

    #[tokio::test]
    async fn test_test_case_id_is_echoed() {
        let executor = real_executor(ExecutorConfig::default());
        let mut case = TestCase::new("1", "1");
        case.id = Some("case-42".to_string());

        let results = executor
            .execute_code("javascript", "function id(x) { return x; }", &[case], "id")
            .await;
        assert_eq!(results[0].test_case_id.as_deref(), Some("case-42"));
    }

    #[tokio::test]
    async fn test_oversized_source_rejected() {
        let config = ExecutorConfig {
            max_source_bytes: 16,
            ..ExecutorConfig::default()
        };
        let executor = real_executor(config);
        let cases = vec![TestCase::new("1", "1")];

        let results = executor
            .execute_code("javascript", "function id(x) { return x; }", &cases, "id")
            .await;
        assert_eq!(
            results[0].error.as_deref(),
            Some("Source code exceeds maximum size of 16 bytes")
        );
    }

    #[tokio::test]
    async fn test_submission_timeout_discards_finished_cases() {
        let executor = Executor::new(
            sleepy_config(TimeoutPolicy::Submission),
            Arc::new(SleepyRunner::default()),
        );

        let cases = sleepy_cases();
        let results = executor.execute_code("javascript", "", &cases, "f").await;
        assert_eq!(results.len(), 3);
        for (result, case) in results.iter().zip(&cases) {
            assert!(!result.passed);
            assert_eq!(result.error.as_deref(), Some("Execution timeout"));
            assert_eq!(result.expected_output, case.expected_output);
        }
    }

    #[tokio::test]
    async fn test_per_case_timeout_keeps_other_results() {
        let executor = Executor::new(
            sleepy_config(TimeoutPolicy::PerTestCase),
            Arc::new(SleepyRunner::default()),
        );

        let results = executor.execute_code("javascript", "", &sleepy_cases(), "f").await;
        assert!(results[0].passed);
        assert_eq!(results[1].error.as_deref(), Some("Execution timeout"));
        assert!(results[2].passed);
    }

    #[tokio::test]
    async fn test_admission_bounds_concurrent_runs() {
        let runner = Arc::new(SleepyRunner::default());
        let config = ExecutorConfig {
            max_concurrent_runs: 1,
            ..ExecutorConfig::default()
        };
        let executor = Executor::new(config, runner.clone());
        let cases = vec![TestCase::new("50", "50")];

        let (a, b) = tokio::join!(
            executor.execute_code("javascript", "", &cases, "f"),
            executor.execute_code("javascript", "", &cases, "f"),
        );
        assert!(a[0].passed && b[0].passed);
        assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_engine_thread_keeps_its_permit() {
        let config = ExecutorConfig {
            timeout_ms: 200,
            max_concurrent_runs: 1,
            loop_iteration_limit: u64::MAX,
            ..ExecutorConfig::default()
        };
        let executor = real_executor(config);
        let source = "function spin(ms) { const end = Date.now() + ms; while (Date.now() < end) {} return ms; }";

        let results = executor
            .execute_code("javascript", source, &[TestCase::new("1500", "1500")], "spin")
            .await;
        assert_eq!(results[0].error.as_deref(), Some("Execution timeout"));
        assert_eq!(executor.available_permits(), 0);

        let start = Instant::now();
        while executor.available_permits() == 0 && start.elapsed() < Duration::from_secs(15) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(executor.available_permits(), 1);

        let results = executor
            .execute_code("javascript", source, &[TestCase::new("0", "0")], "spin")
            .await;
        assert!(results[0].passed, "{:?}", results[0]);
    }

    #[tokio::test]
    async fn test_from_config_selects_backend() {
        let executor = Executor::from_config(ExecutorConfig {
            backend: Backend::InProcess,
            ..ExecutorConfig::default()
        });
        assert_eq!(executor.backend_name(), "in_process");

        let config = ExecutorConfig {
            worker_bin: Some(PathBuf::from("/nonexistent/hiremate-worker")),
            ..ExecutorConfig::default()
        };
        let executor = Executor::from_config(config);
        assert_eq!(executor.backend_name(), "process");

        let results = executor
            .execute_code("javascript", "function f() {}", &[TestCase::new("1", "1")], "f")
            .await;
        assert!(results[0]
            .error
            .as_deref()
            .unwrap_or("")
            .starts_with("Execution backend failure"));
    }
}

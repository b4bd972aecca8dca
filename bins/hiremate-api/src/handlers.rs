// HTTP route handlers for the HireMate grading API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hiremate_common::types::RunStatus;
use hiremate_executor::evaluator;
use hiremate_executor::Submission;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// POST /api/problems/{problem_id}/run - Grade code against the public test cases
pub async fn run_problem(
    State(state): State<Arc<AppState>>,
    Path(problem_id): Path<String>,
    Json(payload): Json<RunRequest>,
) -> Response {
    let run_id = Uuid::new_v4();

    let (code, language) = match (payload.code, payload.language) {
        (Some(code), Some(language)) if !code.is_empty() && !language.is_empty() => (code, language),
        _ => {
            warn!(run_id = %run_id, problem_id = %problem_id, "Run request missing code or language");
            return error_response(StatusCode::BAD_REQUEST, "Code and language are required");
        }
    };

    let Some(problem) = state.catalog.get(&problem_id) else {
        info!(run_id = %run_id, problem_id = %problem_id, "Problem not found");
        return error_response(StatusCode::NOT_FOUND, "Problem not found");
    };

    let test_cases = problem.public_test_cases();
    if test_cases.is_empty() {
        return error_response(StatusCode::NOT_FOUND, "No test cases found for this problem");
    }

    let submission = Submission {
        language,
        source_code: code,
        function_name: problem.function_name.clone().unwrap_or_default(),
        parameters: problem.parameters.clone(),
    };

    info!(
        run_id = %run_id,
        problem_id = %problem_id,
        language = %submission.language,
        source_size = submission.source_code.len(),
        test_cases = test_cases.len(),
        "Run received"
    );

    let start = Instant::now();
    let results = state.executor.execute(&submission, &test_cases).await;
    metrics::RUN_LATENCY.observe(start.elapsed().as_secs_f64());

    for result in &results {
        let outcome = if result.passed {
            "passed"
        } else if result.output.is_none() {
            "error"
        } else {
            "failed"
        };
        metrics::TEST_CASES_TOTAL.with_label_values(&[outcome]).inc();
    }

    let report = evaluator::aggregate(&test_cases, &results);
    let status = match report.status {
        RunStatus::Passed => "PASSED",
        RunStatus::Failed => "FAILED",
    };
    metrics::RUNS_TOTAL.with_label_values(&[status]).inc();

    info!(
        run_id = %run_id,
        status,
        passed = report.passed_tests,
        total = report.total_tests,
        execution_ms = start.elapsed().as_millis() as u64,
        "Run graded"
    );

    (StatusCode::OK, Json(report)).into_response()
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics() -> Response {
    match metrics::render_metrics() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render metrics")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiremate_common::catalog::{Problem, ProblemCatalog};
    use hiremate_common::config::{Backend, ExecutorConfig};
    use hiremate_common::types::RunReport;
    use hiremate_executor::Executor;
    use serde_json::{json, Value};

    fn state() -> Arc<AppState> {
        let problems: Vec<Problem> = serde_json::from_value(json!([
            {
                "id": "two-sum",
                "title": "Two Sum",
                "functionName": "twoSum",
                "parameters": ["nums", "target"],
                "testCases": [
                    { "input": "{\"nums\":[2,7,11,15],\"target\":9}", "expectedOutput": "[0,1]", "isHidden": false },
                    { "input": "{\"target\":6,\"nums\":[3,2,4]}", "expectedOutput": "[1,2]", "isHidden": false },
                    { "input": "{\"nums\":[3,3],\"target\":6}", "expectedOutput": "[0,1]", "isHidden": true }
                ]
            },
            {
                "id": "hidden-only",
                "title": "Hidden Only",
                "functionName": "f",
                "testCases": [
                    { "input": "1", "expectedOutput": "1", "isHidden": true }
                ]
            }
        ]))
        .unwrap();

        Arc::new(AppState {
            executor: Arc::new(Executor::from_config(ExecutorConfig {
                backend: Backend::InProcess,
                ..ExecutorConfig::default()
            })),
            catalog: Arc::new(ProblemCatalog::from_problems(problems).unwrap()),
        })
    }

    fn request(code: &str, language: &str) -> Json<RunRequest> {
        Json(RunRequest {
            code: Some(code.to_string()),
            language: Some(language.to_string()),
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const TWO_SUM: &str = r#"
function twoSum(nums, target) {
  for (let i = 0; i < nums.length; i++)
    for (let j = i + 1; j < nums.length; j++)
      if (nums[i] + nums[j] === target) return [i, j];
  return [];
}"#;

    #[tokio::test]
    async fn test_run_passes_public_cases() {
        let response = run_problem(State(state()), Path("two-sum".to_string()), request(TWO_SUM, "javascript")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: RunReport = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report.status, RunStatus::Passed);
        assert_eq!(report.total_tests, 2);
        assert_eq!(report.passed_tests, 2);
        assert_eq!(report.results[1].input, "{\"target\":6,\"nums\":[3,2,4]}");
        assert_eq!(report.results[1].actual, "[1,2]");
    }

    #[tokio::test]
    async fn test_run_reports_failures() {
        let code = "function twoSum(nums, target) { if (target === 6) throw new Error('nope'); return [0, 1]; }";
        let response = run_problem(State(state()), Path("two-sum".to_string()), request(code, "javascript")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "FAILED");
        assert_eq!(body["passedTests"], 1);
        assert_eq!(body["results"][1]["actual"], "Error");
        assert_eq!(body["results"][1]["error"], "nope");
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let response = run_problem(
            State(state()),
            Path("two-sum".to_string()),
            Json(RunRequest {
                code: Some(TWO_SUM.to_string()),
                language: None,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "Code and language are required" }));

        let response = run_problem(State(state()), Path("two-sum".to_string()), request("", "javascript")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_problem_and_no_public_cases() {
        let response = run_problem(State(state()), Path("nope".to_string()), request(TWO_SUM, "javascript")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "error": "Problem not found" }));

        let response = run_problem(State(state()), Path("hidden-only".to_string()), request(TWO_SUM, "javascript")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "No test cases found for this problem" })
        );
    }

    #[tokio::test]
    async fn test_unsupported_language_is_a_failed_run() {
        let response = run_problem(State(state()), Path("two-sum".to_string()), request(TWO_SUM, "python")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "FAILED");
        assert_eq!(
            body["results"][0]["error"],
            "Language 'python' is not supported. Please use JavaScript or TypeScript."
        );
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let _ = metrics::register_metrics();
        metrics::RUNS_TOTAL.with_label_values(&["PASSED"]).inc();

        let response = super::metrics().await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("hiremate_runs_total"));
    }
}

// CLI commands for working with problem catalogs
use anyhow::{bail, Context, Result};
use hiremate_common::catalog::{Problem, ProblemCatalog};
use hiremate_common::config::ExecutorConfig;
use hiremate_common::types::{Language, RunReport, RunStatus, TestCase};
use hiremate_executor::normalizer::object_keys;
use hiremate_executor::{evaluator, Executor, Submission};
use std::fs;
use std::path::Path;

fn load_catalog(path: &Path) -> Result<ProblemCatalog> {
    ProblemCatalog::load_from_file(path)
        .with_context(|| format!("Failed to load catalog {}", path.display()))
}

pub fn load_executor() -> Result<Executor> {
    let config = ExecutorConfig::load_default().context("Failed to load executor configuration")?;
    Ok(Executor::from_config(config))
}

fn submission_for(problem: &Problem, language: &str, source_code: String) -> Submission {
    Submission {
        language: language.to_string(),
        source_code,
        function_name: problem.function_name.clone().unwrap_or_default(),
        parameters: problem.parameters.clone(),
    }
}

/// List problems with difficulty and test-case counts
pub fn list_problems(catalog_path: &Path) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;

    println!("📚 {} problems in {}", catalog.len(), catalog_path.display());
    println!();
    for problem in catalog.list() {
        let difficulty = problem
            .difficulty
            .map(|d| format!("{:?}", d).to_uppercase())
            .unwrap_or_else(|| "-".to_string());
        let hidden = problem.test_cases.iter().filter(|tc| tc.is_hidden).count();
        println!(
            "  {:<48} {:<8} {} public / {} hidden  fn: {}",
            problem.id,
            difficulty,
            problem.test_cases.len() - hidden,
            hidden,
            problem.function_name.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

/// Grade a solution file against a problem
pub async fn run_solution(
    executor: &Executor,
    catalog_path: &Path,
    problem_id: &str,
    code_path: &Path,
    language: &str,
    include_hidden: bool,
    json: bool,
) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let Some(problem) = catalog.get(problem_id) else {
        bail!("Problem '{}' not found in {}", problem_id, catalog_path.display());
    };

    let source = fs::read_to_string(code_path)
        .with_context(|| format!("Failed to read {}", code_path.display()))?;

    let test_cases: Vec<TestCase> = if include_hidden {
        problem.test_cases.clone()
    } else {
        problem.public_test_cases()
    };
    if test_cases.is_empty() {
        bail!("No test cases found for this problem");
    }

    let submission = submission_for(problem, language, source);
    let results = executor.execute(&submission, &test_cases).await;
    let report = evaluator::aggregate(&test_cases, &results);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&problem.title, &report);
    }

    if report.status == RunStatus::Failed {
        bail!("{} of {} test cases failed", report.total_tests - report.passed_tests, report.total_tests);
    }
    Ok(())
}

fn print_report(title: &str, report: &RunReport) {
    println!("🚀 {}", title);
    println!();
    for (index, case) in report.results.iter().enumerate() {
        let mark = if case.passed { "✓" } else { "✗" };
        println!("  {} Test {}", mark, index + 1);
        println!("    Input:    {}", case.input);
        println!("    Expected: {}", case.expected);
        println!("    Actual:   {}", case.actual);
        if let Some(error) = &case.error {
            println!("    Error:    {}", error);
        }
    }
    println!();
    println!("→ {} / {} passed", report.passed_tests, report.total_tests);
}

/// Problems with parameter-order issues for JSON-object inputs.
///
/// With declared parameters, object keys must name exactly those
/// parameters. A key order that differs from the declared order is only
/// reported as a warning, since inputs are mapped by name.
pub fn check_parameter_contract(problem: &Problem) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let Some(parameters) = &problem.parameters else {
        return (errors, warnings);
    };

    for (index, test_case) in problem.test_cases.iter().enumerate() {
        let Some(keys) = object_keys(&test_case.input) else {
            continue;
        };

        let unknown: Vec<&String> = keys.iter().filter(|k| !parameters.contains(k)).collect();
        let missing: Vec<&String> = parameters.iter().filter(|p| !keys.contains(p)).collect();

        if !unknown.is_empty() {
            errors.push(format!("test {}: unknown keys {:?}", index + 1, unknown));
        }
        if !missing.is_empty() {
            errors.push(format!("test {}: missing keys {:?}", index + 1, missing));
        }
        if unknown.is_empty() && missing.is_empty() && &keys != parameters {
            warnings.push(format!(
                "test {}: key order {:?} differs from parameters {:?}",
                index + 1,
                keys,
                parameters
            ));
        }
    }

    (errors, warnings)
}

/// Run every reference solution against all of its problem's test cases
pub async fn verify_catalog(executor: &Executor, catalog_path: &Path, only: Option<&str>) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;

    let problems: Vec<&Problem> = match only {
        Some(id) => match catalog.get(id) {
            Some(problem) => vec![problem],
            None => bail!("Problem '{}' not found in {}", id, catalog_path.display()),
        },
        None => catalog.list(),
    };

    println!("🔍 Verifying {} problems", problems.len());
    println!();

    let mut failures = 0usize;

    for problem in problems {
        println!("  {}", problem.id);

        let (errors, warnings) = check_parameter_contract(problem);
        for warning in &warnings {
            println!("    ⚠ {}", warning);
        }
        for error in &errors {
            println!("    ✗ {}", error);
        }
        failures += errors.len();

        if problem.reference_solution.is_empty() {
            println!("    ⚠ no reference solution");
            continue;
        }

        for (language, source) in &problem.reference_solution {
            if Language::from_str(language).is_none() {
                println!("    ⚠ skipping unsupported language '{}'", language);
                continue;
            }

            let submission = submission_for(problem, language, source.clone());
            let results = executor.execute(&submission, &problem.test_cases).await;
            let passed = results.iter().filter(|r| r.passed).count();

            if passed == results.len() {
                println!("    ✓ {} ({} / {})", language, passed, results.len());
            } else {
                failures += 1;
                println!("    ✗ {} ({} / {})", language, passed, results.len());
                for (index, result) in results.iter().enumerate().filter(|(_, r)| !r.passed) {
                    println!(
                        "      test {}: {}",
                        index + 1,
                        result.error.as_deref().unwrap_or("failed")
                    );
                }
            }
        }
    }

    println!();
    if failures > 0 {
        bail!("Verification failed with {} problem(s)", failures);
    }
    println!("→ Catalog verified");
    Ok(())
}

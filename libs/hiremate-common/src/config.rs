// Executor configuration: defaults, optional JSON file, HIREMATE_* overrides
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/executor.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },
}

/// How the wall-clock deadline is applied to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// One deadline over the whole test-case loop. On expiry every case is
    /// reported as timed out and finished results are discarded.
    Submission,
    /// One deadline per test case. Only the hung case is reported as timed
    /// out; earlier and later cases keep their own results.
    PerTestCase,
}

impl TimeoutPolicy {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "submission" => Some(TimeoutPolicy::Submission),
            "per_test_case" => Some(TimeoutPolicy::PerTestCase),
            _ => None,
        }
    }
}

/// Where submitted code runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Embedded interpreter on a dedicated thread, fresh realm per invocation.
    /// A timed-out invocation cannot be stopped and keeps its run's admission
    /// slot until it finishes.
    InProcess,
    /// One `hiremate-worker` child process per invocation, killed when its
    /// deadline passes.
    Process,
}

impl Backend {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "in_process" => Some(Backend::InProcess),
            "process" => Some(Backend::Process),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub timeout_ms: u64,
    pub timeout_policy: TimeoutPolicy,
    pub backend: Backend,
    /// Worker executable for the process backend. Defaults to
    /// `hiremate-worker` next to the current executable.
    pub worker_bin: Option<PathBuf>,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    pub max_source_bytes: usize,
    pub max_input_bytes: usize,
    pub max_concurrent_runs: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            timeout_policy: TimeoutPolicy::Submission,
            backend: Backend::Process,
            worker_bin: None,
            loop_iteration_limit: 10_000_000,
            recursion_limit: 10_000,
            max_source_bytes: 1024 * 1024,
            max_input_bytes: 1024 * 1024,
            max_concurrent_runs: 8,
        }
    }
}

impl ExecutorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `config/executor.json` if it exists, defaults otherwise, then
    /// environment overrides.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        let config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `HIREMATE_*` overrides from any key lookup (the process
    /// environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HIREMATE_TIMEOUT_MS") {
            self.timeout_ms = parse_number("HIREMATE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("HIREMATE_TIMEOUT_POLICY") {
            self.timeout_policy = TimeoutPolicy::parse(&v).ok_or_else(|| invalid("HIREMATE_TIMEOUT_POLICY", &v))?;
        }
        if let Some(v) = lookup("HIREMATE_BACKEND") {
            self.backend = Backend::parse(&v).ok_or_else(|| invalid("HIREMATE_BACKEND", &v))?;
        }
        if let Some(v) = lookup("HIREMATE_WORKER_BIN") {
            self.worker_bin = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HIREMATE_LOOP_LIMIT") {
            self.loop_iteration_limit = parse_number("HIREMATE_LOOP_LIMIT", &v)?;
        }
        if let Some(v) = lookup("HIREMATE_RECURSION_LIMIT") {
            self.recursion_limit = parse_number("HIREMATE_RECURSION_LIMIT", &v)?;
        }
        if let Some(v) = lookup("HIREMATE_MAX_CONCURRENT_RUNS") {
            self.max_concurrent_runs = parse_number("HIREMATE_MAX_CONCURRENT_RUNS", &v)?;
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_baseline() {
        let config = ExecutorConfig::default();
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.timeout_policy, TimeoutPolicy::Submission);
        assert_eq!(config.backend, Backend::Process);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ExecutorConfig =
            serde_json::from_str(r#"{"timeout_ms": 250, "timeout_policy": "per_test_case"}"#).unwrap();
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.timeout_policy, TimeoutPolicy::PerTestCase);
        assert_eq!(config.max_concurrent_runs, 8);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HIREMATE_TIMEOUT_MS", "1200"),
            ("HIREMATE_BACKEND", "in_process"),
            ("HIREMATE_WORKER_BIN", "/usr/local/bin/hiremate-worker"),
        ]
        .into_iter()
        .collect();

        let config = ExecutorConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.timeout_ms, 1200);
        assert_eq!(config.backend, Backend::InProcess);
        assert_eq!(
            config.worker_bin.as_deref(),
            Some(Path::new("/usr/local/bin/hiremate-worker"))
        );
    }

    #[test]
    fn test_bad_env_value_is_rejected() {
        let err = ExecutorConfig::default()
            .with_overrides(|k| (k == "HIREMATE_TIMEOUT_POLICY").then(|| "sometimes".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("HIREMATE_TIMEOUT_POLICY"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ExecutorConfig::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

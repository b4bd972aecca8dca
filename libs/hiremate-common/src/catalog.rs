// Problem catalog: loads problems and their test cases from a JSON file
use crate::types::TestCase;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate problem id '{0}' in catalog")]
    DuplicateId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub function_name: Option<String>,
    /// Declared parameter order. When present, JSON-object inputs are
    /// mapped by name rather than by key order.
    #[serde(default)]
    pub parameters: Option<Vec<String>>,
    #[serde(default)]
    pub starter_code: BTreeMap<String, String>,
    #[serde(default)]
    pub reference_solution: BTreeMap<String, String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl Problem {
    /// Test cases shown to the user on "Run".
    pub fn public_test_cases(&self) -> Vec<TestCase> {
        self.test_cases
            .iter()
            .filter(|tc| !tc.is_hidden)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    problems: Vec<Problem>,
}

#[derive(Debug, Clone, Default)]
pub struct ProblemCatalog {
    problems: HashMap<String, Problem>,
}

impl ProblemCatalog {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file: CatalogFile = serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_problems(file.problems)
    }

    pub fn from_problems(problems: Vec<Problem>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(problems.len());
        for problem in problems {
            if by_id.contains_key(&problem.id) {
                return Err(CatalogError::DuplicateId(problem.id));
            }
            by_id.insert(problem.id.clone(), problem);
        }
        Ok(Self { problems: by_id })
    }

    pub fn get(&self, id: &str) -> Option<&Problem> {
        self.problems.get(id)
    }

    /// All problems ordered by id.
    pub fn list(&self) -> Vec<&Problem> {
        let mut problems: Vec<&Problem> = self.problems.values().collect();
        problems.sort_by(|a, b| a.id.cmp(&b.id));
        problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

use thiserror::Error;

/// Every way a test case can fail to produce a gradable value.
///
/// These never escape the dispatcher: each one is rendered into the
/// `error` field of the affected `ExecutionResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Language '{0}' is not supported. Please use JavaScript or TypeScript.")]
    UnsupportedLanguage(String),

    #[error("Invalid input format: {0}")]
    InvalidInputFormat(String),

    /// Source failed to load, or the named function does not exist.
    #[error("{0}")]
    Compile(String),

    /// The function threw (or hit an engine limit) while running.
    #[error("{0}")]
    Runtime(String),

    #[error("Execution timeout")]
    Timeout,

    #[error("Source code exceeds maximum size of {max} bytes")]
    SourceTooLarge { max: usize },

    #[error("Test input exceeds maximum size of {max} bytes")]
    InputTooLarge { max: usize },

    /// The execution backend itself failed (worker crashed, thread died).
    #[error("Execution backend failure: {0}")]
    Backend(String),
}

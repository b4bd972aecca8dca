//! Code execution and grading engine.
//!
//! Pipeline per test case: [`normalizer`] turns stored strings into values,
//! an [`engine::CodeRunner`] invokes the submitted function, [`evaluator`]
//! grades the return value. [`executor::Executor`] drives the loop under the
//! configured timeout policy.

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod literal;
pub mod normalizer;
pub mod process;
pub mod value;


pub use engine::{CodeRunner, InProcessEngine, Invocation, Limits, Outcome, RunPermit};
pub use error::ExecutionError;
pub use executor::{Executor, Submission};
pub use process::ProcessEngine;
pub use value::Value;

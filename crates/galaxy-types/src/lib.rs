//! Shared types for the RxGalaxy mission evaluator.
//!
//! This crate defines the AST of the mission language, source spans,
//! structured compile errors, and the mission/test-case data model shared
//! by the evaluator, the test harness and the mission registry.

mod error;
mod span;
pub mod ast;
pub mod mission;

pub use error::{CompileErrors, ErrorCategory, ErrorCode, GalaxyError, Severity, MAX_ERRORS};
pub use mission::{
    mission_complete, trace_eq, Difficulty, Mission, Reward, TestCase, TestResult,
};
pub use span::{SourceFile, Span};

/// Result type used by the front-end stages.
pub type Result<T> = std::result::Result<T, GalaxyError>;

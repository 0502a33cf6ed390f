pub mod types;
pub mod config;

// Re-export commonly used types for convenience
pub use types::{
    BatchResult, ExecutionOutcome, FailureKind, FunctionSignature, HarnessProgram, Language,
    TestCase, TestResult, Value,
};
pub use config::{Config, EntryPointPolicy};

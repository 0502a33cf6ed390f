use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongly-typed language enum
/// Every supported source language has exactly one adapter in the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "py")]
    Python,
    #[serde(alias = "js", alias = "node")]
    JavaScript,
    Java,
    #[serde(alias = "c++")]
    Cpp,
}

impl Language {
    /// Returns all language variants
    /// This is the single source of truth for available languages
    pub fn all_variants() -> &'static [Language] {
        &[
            Language::Python,
            Language::JavaScript,
            Language::Java,
            Language::Cpp,
        ]
    }

    /// Parse a language from string (case-insensitive, common aliases accepted)
    pub fn from_str(s: &str) -> Option<Language> {
        match s.trim().to_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "javascript" | "js" | "node" => Some(Language::JavaScript),
            "java" => Some(Language::Java),
            "cpp" | "c++" => Some(Language::Cpp),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::JavaScript => write!(f, "javascript"),
            Language::Java => write!(f, "java"),
            Language::Cpp => write!(f, "cpp"),
        }
    }
}

/// Language-neutral test value
///
/// Closed variant: anything a fixture can express and a harness can print back.
/// Serialized as plain JSON; JSON objects are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Parse JSON text into a Value. Returns None for invalid JSON or objects.
    pub fn parse(text: &str) -> Option<Value> {
        serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|json| Value::try_from(json).ok())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Compact JSON rendering (strings quoted)
    pub fn to_json(&self) -> String {
        serde_json::Value::from(self).to_string()
    }
}

/// Strings display raw, everything else as JSON
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = String;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => Ok(Value::Number(n)),
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            serde_json::Value::Object(_) => {
                Err("objects are not supported as test values".to_string())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        serde_json::Value::from(&value)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Test Case Definition (Immutable Input)
/// Ordering matters: results correlate to test cases by position only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Value,
    #[serde(alias = "expected")]
    pub expected_output: Value,
}

impl TestCase {
    pub fn new(input: impl Into<Value>, expected_output: impl Into<Value>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Discovered entry point of user code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<String>,
}

impl FunctionSignature {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

/// Synthesized program ready for dispatch
/// Built fresh per execution and never mutated afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessProgram {
    pub source_text: String,
    pub entry_filename: String,
    pub language: Language,
}

/// Classified sandbox response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    CompileError { message: String },
    RuntimeError { message: String },
    Success { raw_stdout_lines: Vec<String> },
}

/// Why a batch failed as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SignatureNotFound,
    UnsupportedLanguage,
    CompileError,
    RuntimeError,
    RateLimited,
    Transport,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::SignatureNotFound => "signature_not_found",
            FailureKind::UnsupportedLanguage => "unsupported_language",
            FailureKind::CompileError => "compile_error",
            FailureKind::RuntimeError => "runtime_error",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Transport => "transport",
            FailureKind::Internal => "internal",
        };
        write!(f, "{}", label)
    }
}

/// Per-Test Result
/// `index` is the position of the originating test case in the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub index: usize,
    pub passed: bool,
    pub actual: Option<Value>,
    pub expected: Value,
    pub error: Option<String>,
}

/// Batch Result
/// The unit returned to callers and stored in the batch cache
///
/// **Invariant:** `results.len()` equals the number of submitted test cases
/// whenever `success` is true. Failed batches carry no fabricated results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub success: bool,
    pub results: Vec<TestResult>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    pub tests_passed: usize,
    pub total_tests: usize,
}

impl BatchResult {
    pub fn from_results(results: Vec<TestResult>) -> Self {
        let tests_passed = results.iter().filter(|r| r.passed).count();
        let total_tests = results.len();
        Self {
            success: true,
            results,
            error: None,
            error_kind: None,
            tests_passed,
            total_tests,
        }
    }

    pub fn failure(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            error: Some(error.into()),
            error_kind: Some(kind),
            tests_passed: 0,
            total_tests: 0,
        }
    }

    /// True when the batch ran and every test case passed
    pub fn all_passed(&self) -> bool {
        self.success && self.tests_passed == self.total_tests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_str_accepts_aliases() {
        assert_eq!(Language::from_str("Python"), Some(Language::Python));
        assert_eq!(Language::from_str("js"), Some(Language::JavaScript));
        assert_eq!(Language::from_str("C++"), Some(Language::Cpp));
        assert_eq!(Language::from_str("rust"), None);
    }

    #[test]
    fn test_language_serde_roundtrip_is_lowercase() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
        let parsed: Language = serde_json::from_str("\"node\"").unwrap();
        assert_eq!(parsed, Language::JavaScript);
    }

    #[test]
    fn test_all_variants_display_parses_back() {
        for language in Language::all_variants() {
            assert_eq!(Language::from_str(&language.to_string()), Some(*language));
        }
    }

    #[test]
    fn test_value_deserializes_nested_lists() {
        let value: Value = serde_json::from_str(r#"[1, [2.5, "x"], null, true]"#).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::from(1),
                Value::List(vec![Value::from(2.5), Value::from("x")]),
                Value::Null,
                Value::Bool(true),
            ])
        );
    }

    #[test]
    fn test_value_rejects_objects() {
        assert!(serde_json::from_str::<Value>(r#"{"a": 1}"#).is_err());
        assert_eq!(Value::parse(r#"{"a": 1}"#), None);
    }

    #[test]
    fn test_value_display_leaves_strings_unquoted() {
        assert_eq!(Value::from("hello").to_string(), "hello");
        assert_eq!(Value::from("hello").to_json(), "\"hello\"");
        assert_eq!(
            Value::List(vec![Value::from(1), Value::from("a")]).to_string(),
            "[1,\"a\"]"
        );
    }

    #[test]
    fn test_test_case_accepts_expected_alias() {
        let case: TestCase = serde_json::from_str(r#"{"input": [2, 3], "expected": 5}"#).unwrap();
        assert_eq!(case.expected_output, Value::from(5));
    }

    #[test]
    fn test_batch_result_counts() {
        let results = vec![
            TestResult {
                index: 0,
                passed: true,
                actual: Some(Value::from(1)),
                expected: Value::from(1),
                error: None,
            },
            TestResult {
                index: 1,
                passed: false,
                actual: None,
                expected: Value::from(2),
                error: Some("no output received".to_string()),
            },
        ];
        let batch = BatchResult::from_results(results);
        assert!(batch.success);
        assert_eq!(batch.tests_passed, 1);
        assert_eq!(batch.total_tests, 2);
        assert!(!batch.all_passed());
    }

    #[test]
    fn test_failure_has_no_results() {
        let batch = BatchResult::failure(FailureKind::RateLimited, "rate limit exceeded");
        assert!(!batch.success);
        assert!(batch.results.is_empty());
        assert_eq!(batch.error.as_deref(), Some("rate limit exceeded"));

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["error_kind"], "rate_limited");
    }

    #[test]
    fn test_outcome_is_tagged() {
        let outcome = ExecutionOutcome::CompileError {
            message: "boom".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "compile_error");
    }
}

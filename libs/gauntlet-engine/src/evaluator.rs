/// Result Normalizer & Comparator - Language-Agnostic Scoring Logic
///
/// **Core Responsibility:**
/// Turn positional harness output lines into typed values and decide, per
/// test case, whether the actual value matches the expected one.
///
/// **Critical Properties:**
/// - Knows nothing about the sandbox or the source language
/// - Pure functions: (output lines, test cases) → test results
/// - Output line `i` belongs to test case `i`; nothing else correlates them
///
/// **Smart Comparison:**
/// Expected values usually come from text fixtures while actual values come
/// from program stdout, so comparison coerces in a fixed, asymmetric way:
/// - A string expected value shaped like `[...]` is parsed as a list first
/// - Null matches only null
/// - Numbers compare numerically; a numeric string on either side is parsed
/// - Strings compare after trimming
/// - Booleans match `true`/`false` text in any case (`True` included)
/// - Lists compare element by element with the same rules
/// - Everything else compares trimmed display text
use gauntlet_common::{TestCase, TestResult, Value};
use tracing::debug;

pub const NO_OUTPUT: &str = "no output received";
pub const ERROR_SENTINEL: &str = "ERROR:";

const RELATIVE_EPSILON: f64 = 1e-9;

/// Parse one harness output line
pub fn parse_line(line: &str) -> Value {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "none" | "null" => return Value::Null,
        _ => {}
    }
    Value::parse(trimmed).unwrap_or_else(|| Value::String(trimmed.to_string()))
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    match trimmed.to_lowercase().as_str() {
        "" | "null" | "none" | "nan" => None,
        _ => trimmed.parse::<f64>().ok().filter(|n| n.is_finite()),
    }
}

fn floats_equal(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= RELATIVE_EPSILON * scale
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => floats_equal(x, y),
        _ => false,
    }
}

fn looks_like_list(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with('[') && trimmed.ends_with(']')
}

/// Smart equality between an actual value and an expected value
pub fn compare(actual: &Value, expected: &Value) -> bool {
    if let Value::String(text) = expected {
        if looks_like_list(text) {
            if let Some(parsed) = Value::parse(text.trim()) {
                return compare(actual, &parsed);
            }
        }
    }

    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a.trim() == b.trim(),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| compare(x, y))
        }
        (Value::String(a), Value::Number(b)) => match (parse_number(a), b.as_f64()) {
            (Some(x), Some(y)) => floats_equal(x, y),
            _ => false,
        },
        (Value::Number(a), Value::String(b)) => match (a.as_f64(), parse_number(b)) {
            (Some(x), Some(y)) => floats_equal(x, y),
            _ => false,
        },
        (Value::Bool(a), Value::String(b)) | (Value::String(b), Value::Bool(a)) => {
            b.trim().eq_ignore_ascii_case(if *a { "true" } else { "false" })
        }
        (a, b) => a.to_string().trim() == b.to_string().trim(),
    }
}

/// Evaluate every test case against the positional output lines
///
/// Always returns exactly one result per test case, in order.
pub fn evaluate(test_cases: &[TestCase], lines: &[String]) -> Vec<TestResult> {
    test_cases
        .iter()
        .enumerate()
        .map(|(index, case)| {
            let expected = case.expected_output.clone();

            let result = match lines.get(index).map(|l| l.trim()) {
                None => TestResult {
                    index,
                    passed: false,
                    actual: None,
                    expected,
                    error: Some(NO_OUTPUT.to_string()),
                },
                Some(line) if line.starts_with(ERROR_SENTINEL) => TestResult {
                    index,
                    passed: false,
                    actual: None,
                    expected,
                    error: Some(line[ERROR_SENTINEL.len()..].trim().to_string()),
                },
                Some(line) => {
                    let actual = parse_line(line);
                    let passed = compare(&actual, &expected);
                    TestResult {
                        index,
                        passed,
                        actual: Some(actual),
                        expected,
                        error: None,
                    }
                }
            };

            debug!(
                index,
                passed = result.passed,
                error = result.error.as_deref().unwrap_or(""),
                "Evaluated test case"
            );
            result
        })
        .collect()
}

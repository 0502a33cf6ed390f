// Literal Converter: language-neutral test inputs to one source-syntax line each

use gauntlet_common::{TestCase, Value};

use crate::languages::LanguageAdapter;

/// Fixtures stored as text: a string input that is valid JSON means the parsed value
pub fn coerce_input(input: &Value) -> Value {
    match input {
        Value::String(text) => Value::parse(text.trim()).unwrap_or_else(|| input.clone()),
        other => other.clone(),
    }
}

/// One encoded line per test case, in order
pub fn encode_inputs(adapter: &dyn LanguageAdapter, test_cases: &[TestCase]) -> Vec<String> {
    test_cases
        .iter()
        .map(|case| adapter.render_literal(&coerce_input(&case.input)))
        .collect()
}

/// Newline-delimited stdin payload
pub fn stdin_payload(encoded_inputs: &[String]) -> String {
    let mut payload = encoded_inputs.join("\n");
    payload.push('\n');
    payload
}

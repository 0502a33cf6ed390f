/// Harness Synthesizer
///
/// **Core Responsibility:**
/// Turn raw user code plus test cases into one program and one stdin payload.
/// The program reads one encoded input per line, calls the entry point and
/// prints exactly one result line (or an `ERROR: <message>` line) per input.
///
/// **Pipeline:** clean → discover → encode literals → render template.
/// Discovery failures stop the pipeline before anything is rendered.
use gauntlet_common::{EntryPointPolicy, FunctionSignature, HarnessProgram, Language, TestCase};
use handlebars::Handlebars;
use tracing::debug;

use crate::error::ExecutionError;
use crate::languages::LanguageAdapter;
use crate::literal;

/// Everything needed to dispatch one batch
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub signature: FunctionSignature,
    pub program: HarnessProgram,
    pub stdin: String,
}

/// Render a harness template with raw (unescaped) substitution
pub fn render(
    language: Language,
    template: &str,
    data: &serde_json::Value,
) -> Result<String, ExecutionError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .render_template(template, data)
        .map_err(|e| ExecutionError::Template {
            language,
            message: e.to_string(),
        })
}

pub fn synthesize(
    adapter: &dyn LanguageAdapter,
    code: &str,
    test_cases: &[TestCase],
    policy: EntryPointPolicy,
) -> Result<PreparedRun, ExecutionError> {
    let cleaned = adapter.clean_code(code);
    let signature = adapter.discover_signature(&cleaned, policy)?;

    debug!(
        language = %adapter.language(),
        function = %signature.name,
        arity = signature.arity(),
        "Discovered entry point"
    );

    let encoded = literal::encode_inputs(adapter, test_cases);
    let program = adapter.build_harness(&cleaned, &signature, &encoded)?;

    Ok(PreparedRun {
        signature,
        program,
        stdin: literal::stdin_payload(&encoded),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::adapter_for;
    use gauntlet_common::Value;
    use serde_json::json;

    fn make_test_case(input: Value, expected: Value) -> TestCase {
        TestCase::new(input, expected)
    }

    #[test]
    fn test_render_does_not_html_escape() {
        let out = render(
            Language::Cpp,
            "{{user_code}}",
            &json!({ "user_code": "vector<int> f() { return {}; } // a && b" }),
        )
        .unwrap();
        assert_eq!(out, "vector<int> f() { return {}; } // a && b");
    }

    #[test]
    fn test_render_reports_missing_fields() {
        let err = render(Language::Python, "{{missing}}", &json!({})).unwrap_err();
        assert!(matches!(err, ExecutionError::Template { .. }));
    }

    #[test]
    fn test_python_add_spreads_list_input() {
        let adapter = adapter_for(Language::Python);
        let cases = vec![make_test_case(
            Value::List(vec![Value::from(2), Value::from(3)]),
            Value::from(5),
        )];

        let run = synthesize(
            adapter,
            "def add(a, b):\n    return a + b\n",
            &cases,
            EntryPointPolicy::FirstDeclared,
        )
        .unwrap();

        assert_eq!(run.signature.name, "add");
        assert_eq!(run.signature.parameters, vec!["a", "b"]);
        assert_eq!(run.stdin, "[2, 3]\n");
        assert_eq!(run.program.entry_filename, "main.py");
        assert!(run.program.source_text.contains("def add(a, b):"));
        assert!(run.program.source_text.contains("__gauntlet_fn(*args)"));
    }

    #[test]
    fn test_python_single_argument_fallback_is_arity_checked() {
        let run = synthesize(
            adapter_for(Language::Python),
            "def add(a, b):\n    return a + b\n",
            &[make_test_case(
                Value::List(vec![Value::from(1), Value::from("x")]),
                Value::from(5),
            )],
            EntryPointPolicy::FirstDeclared,
        )
        .unwrap();

        let source = &run.program.source_text;
        assert!(source.contains("import inspect"));
        assert!(source.contains("inspect.signature(__gauntlet_fn).bind(*args)"));
        // errors raised by the function body propagate instead of retrying
        assert!(!source.contains("except TypeError:\n            return __gauntlet_fn(list(args))"));
    }

    #[test]
    fn test_discovery_failure_builds_nothing() {
        let adapter = adapter_for(Language::JavaScript);
        let err = synthesize(
            adapter,
            "const x = 5;",
            &[make_test_case(Value::from(1), Value::from(1))],
            EntryPointPolicy::FirstDeclared,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ExecutionError::SignatureNotFound {
                language: Language::JavaScript
            }
        ));
    }

    #[test]
    fn test_every_template_renders() {
        let cases = vec![make_test_case(
            Value::List(vec![Value::from(1), Value::from(2)]),
            Value::from(3),
        )];
        let sources = [
            (Language::Python, "def solve(a, b):\n    return a + b"),
            (Language::JavaScript, "function solve(a, b) { return a + b; }"),
            (
                Language::Java,
                "public static int solve(int a, int b) { return a + b; }",
            ),
            (Language::Cpp, "int solve(int a, int b) { return a + b; }"),
        ];

        for (language, code) in sources {
            let run = synthesize(
                adapter_for(language),
                code,
                &cases,
                EntryPointPolicy::FirstDeclared,
            )
            .unwrap();
            assert_eq!(run.signature.name, "solve");
            assert!(run.program.source_text.contains(code));
            assert!(!run.program.source_text.contains("{{"));
        }
    }
}

use gauntlet_common::{FunctionSignature, Language, Value};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use super::{drop_test_lines, split_params, LanguageAdapter};

lazy_static! {
    static ref FUNCTION: Regex = Regex::new(
        r"(?m)(?:^|[^\w$.])(?:async\s+)?function(?:\s*\*\s*|\s+)([A-Za-z_$][\w$]*)\s*\(([^)]*)\)"
    )
    .expect("valid regex");
}

pub struct JavaScriptAdapter;

fn parameter_name(param: &str) -> String {
    param
        .split('=')
        .next()
        .unwrap_or(param)
        .trim()
        .trim_start_matches("...")
        .to_string()
}

/// Declared shape of `name`: (required parameter count, trailing rest parameter)
fn parameter_shape(code: &str, name: &str) -> (usize, bool) {
    let Some(raw) = FUNCTION
        .captures_iter(code)
        .find(|caps| caps.get(1).map(|m| m.as_str()) == Some(name))
        .and_then(|caps| caps.get(2))
    else {
        return (0, false);
    };

    let params = split_params(raw.as_str());
    let has_rest = params.last().is_some_and(|p| p.trim_start().starts_with("..."));
    let required = params
        .iter()
        .take_while(|p| !p.contains('=') && !p.trim_start().starts_with("..."))
        .count();
    (required, has_rest)
}

fn is_top_level_test_line(line: &str) -> bool {
    let lowered = line.to_lowercase();
    let trimmed = lowered.trim_start();

    if trimmed.starts_with("//test") || trimmed.starts_with("// test") {
        return true;
    }
    if line.starts_with(|c: char| c.is_whitespace()) {
        return false;
    }
    trimmed.starts_with("console.log(") || trimmed.contains("test_input")
}

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn entry_filename(&self) -> &'static str {
        "main.js"
    }

    fn template(&self) -> &'static str {
        include_str!("../../templates/javascript.hbs")
    }

    fn discover_signatures(&self, code: &str) -> Vec<FunctionSignature> {
        FUNCTION
            .captures_iter(code)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str().to_string();
                let parameters = split_params(caps.get(2).map_or("", |m| m.as_str()))
                    .iter()
                    .map(|p| parameter_name(p))
                    .filter(|p| !p.is_empty())
                    .collect();
                Some(FunctionSignature { name, parameters })
            })
            .collect()
    }

    /// JSON is valid JavaScript literal syntax
    fn render_literal(&self, value: &Value) -> String {
        value.to_json()
    }

    fn clean_code(&self, code: &str) -> String {
        drop_test_lines(code, is_top_level_test_line)
    }

    fn template_data(
        &self,
        cleaned_code: &str,
        signature: &FunctionSignature,
        case_count: usize,
    ) -> serde_json::Value {
        let (required_count, has_rest) = parameter_shape(cleaned_code, &signature.name);
        json!({
            "user_code": cleaned_code,
            "func_name": signature.name,
            "param_count": signature.arity(),
            "required_count": required_count,
            "has_rest": has_rest,
            "case_count": case_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_common::{EntryPointPolicy, TestCase};

    #[test]
    fn test_discovers_function_declarations() {
        let code = "async function fetchAll(urls, ...opts) {}\nfunction sum(arr = []) {\n  return arr.reduce((a, b) => a + b, 0);\n}";
        let found = JavaScriptAdapter.discover_signatures(code);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "fetchAll");
        assert_eq!(found[0].parameters, vec!["urls", "opts"]);
        assert_eq!(found[1].parameters, vec!["arr"]);
    }

    #[test]
    fn test_ignores_method_calls_named_function() {
        let code = "const x = obj.function(1);";
        assert!(JavaScriptAdapter.discover_signatures(code).is_empty());
    }

    #[test]
    fn test_arrow_functions_are_not_declarations() {
        let result = JavaScriptAdapter
            .discover_signature("const add = (a, b) => a + b;", EntryPointPolicy::FirstDeclared);
        assert!(result.is_err());
    }

    #[test]
    fn test_render_literal_is_json() {
        let value = Value::List(vec![Value::from("a"), Value::Null, Value::Bool(false)]);
        assert_eq!(JavaScriptAdapter.render_literal(&value), r#"["a",null,false]"#);
    }

    #[test]
    fn test_clean_code_keeps_nested_logging() {
        let code = "function f(x) {\n  console.log(x);\n  return x;\n}\nconsole.log(f(2));\n// test\nconst test_input = [1];";
        let cleaned = JavaScriptAdapter.clean_code(code);
        assert!(cleaned.contains("  console.log(x);"));
        assert!(!cleaned.contains("console.log(f(2))"));
        assert!(!cleaned.contains("test_input"));
    }

    #[test]
    fn test_single_array_parameter_harness() {
        let code = "function sum(arr) {\n  return arr.reduce((a, b) => a + b, 0);\n}";
        let signature = JavaScriptAdapter
            .discover_signature(code, EntryPointPolicy::FirstDeclared)
            .unwrap();
        assert_eq!(signature.arity(), 1);

        let cases = vec![TestCase::new(
            Value::List(vec![Value::from(1), Value::from(2), Value::from(3)]),
            6,
        )];
        let encoded = crate::literal::encode_inputs(&JavaScriptAdapter, &cases);
        assert_eq!(encoded, vec!["[1,2,3]"]);

        let program = JavaScriptAdapter
            .build_harness(code, &signature, &encoded)
            .unwrap();
        assert_eq!(program.entry_filename, "main.js");
        assert!(program.source_text.contains("const __gauntletFn = sum;"));
        assert!(program.source_text.contains("const __gauntletArity = 1;"));
        assert!(program.source_text.contains("const __gauntletRest = false;"));
        assert!(program.source_text.contains(".slice(0, 1)"));
    }

    #[test]
    fn test_default_parameters_still_spread() {
        let code = "function add(a, b = 0) {\n  return a + b;\n}";
        let signature = JavaScriptAdapter
            .discover_signature(code, EntryPointPolicy::FirstDeclared)
            .unwrap();
        assert_eq!(signature.parameters, vec!["a", "b"]);

        let data = JavaScriptAdapter.template_data(code, &signature, 1);
        assert_eq!(data["param_count"], 2);
        assert_eq!(data["required_count"], 1);
        assert_eq!(data["has_rest"], false);

        let program = JavaScriptAdapter
            .build_harness(code, &signature, &["[2,3]".to_string()])
            .unwrap();
        assert!(program.source_text.contains("const __gauntletArity = 2;"));
        assert!(program.source_text.contains("const __gauntletRequired = 1;"));
        assert!(!program.source_text.contains("__gauntletFn.length"));
    }

    #[test]
    fn test_rest_parameter_is_flagged() {
        let code = "function total(...nums) {\n  return nums.reduce((a, b) => a + b, 0);\n}";
        let signature = JavaScriptAdapter
            .discover_signature(code, EntryPointPolicy::FirstDeclared)
            .unwrap();
        assert_eq!(parameter_shape(code, &signature.name), (0, true));

        let data = JavaScriptAdapter.template_data(code, &signature, 1);
        assert_eq!(data["has_rest"], true);
        assert_eq!(data["required_count"], 0);
    }

    #[test]
    fn test_required_count_stops_at_first_default() {
        assert_eq!(
            parameter_shape("function f(a, { x } = {}, c) {}", "f"),
            (1, false)
        );
        assert_eq!(parameter_shape("function g(a, b, ...more) {}", "g"), (2, true));
    }
}

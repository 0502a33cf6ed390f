use gauntlet_common::{FunctionSignature, Language, Value};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use super::{
    block_end, drop_test_lines, last_identifier, quote_string, render_list, split_params,
    strip_block, LanguageAdapter,
};

lazy_static! {
    static ref FUNCTION: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?:static|inline|constexpr|virtual)\s+)*((?:const\s+)?(?:unsigned\s+|signed\s+)?(?:long\s+long|long\s+double|long|int|void|bool|double|float|char|short|auto|size_t|(?:std::)?string|(?:std::)?(?:vector|pair|map|set|unordered_map|unordered_set|deque|array|tuple)\s*<[^;{}()]*>)\s*[&*]*)\s*\b([A-Za-z_]\w*)\s*\(([^)]*)\)\s*(?:const\s*)?(?:noexcept\s*)?\{"
    )
    .expect("valid regex");
    static ref MAIN: Regex = Regex::new(r"(?m)^[ \t]*(?:int|void)\s+main\s*\(").expect("valid regex");
    static ref RECORD: Regex =
        Regex::new(r"(?m)^[ \t]*(?:class|struct)\s+([A-Za-z_]\w*)[^;{]*\{").expect("valid regex");
}

pub struct CppAdapter;

/// Qualified name of the entry point: `Class::method` for member functions
fn qualified_target(code: &str, name: &str) -> String {
    let position = FUNCTION
        .captures_iter(code)
        .find(|caps| caps.get(2).map(|m| m.as_str()) == Some(name))
        .and_then(|caps| caps.get(0))
        .map(|m| m.start());

    let Some(position) = position else {
        return name.to_string();
    };

    RECORD
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let end = block_end(code, whole.start())?;
            if whole.start() < position && position < end {
                Some((end - whole.start(), caps.get(1)?.as_str().to_string()))
            } else {
                None
            }
        })
        .min_by_key(|(span, _)| *span)
        .map(|(_, owner)| format!("{}::{}", owner, name))
        .unwrap_or_else(|| name.to_string())
}

fn strip_main(code: &str) -> String {
    match MAIN.find(code) {
        Some(found) => strip_block(code, found.start()),
        None => code.to_string(),
    }
}

fn is_test_line(line: &str) -> bool {
    let lowered = line.to_lowercase();
    let trimmed = lowered.trim_start();
    trimmed.starts_with("//test")
        || trimmed.starts_with("// test")
        || (!line.starts_with(|c: char| c.is_whitespace()) && trimmed.contains("test_input"))
}

impl LanguageAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn entry_filename(&self) -> &'static str {
        "main.cpp"
    }

    fn template(&self) -> &'static str {
        include_str!("../../templates/cpp.hbs")
    }

    fn discover_signatures(&self, code: &str) -> Vec<FunctionSignature> {
        FUNCTION
            .captures_iter(code)
            .filter_map(|caps| {
                let name = caps.get(2)?.as_str();
                if name == "main" {
                    return None;
                }
                let raw = caps.get(3).map_or("", |m| m.as_str());
                let parameters = if raw.trim() == "void" {
                    Vec::new()
                } else {
                    split_params(raw)
                        .iter()
                        .filter_map(|p| last_identifier(p))
                        .collect()
                };
                Some(FunctionSignature {
                    name: name.to_string(),
                    parameters,
                })
            })
            .collect()
    }

    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "nullptr".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => quote_string(s),
            Value::List(items) => render_list(items, "{", "}", |v| self.render_literal(v)),
        }
    }

    fn clean_code(&self, code: &str) -> String {
        drop_test_lines(&strip_main(code), is_test_line)
    }

    fn template_data(
        &self,
        cleaned_code: &str,
        signature: &FunctionSignature,
        case_count: usize,
    ) -> serde_json::Value {
        json!({
            "user_code": cleaned_code,
            "func_name": signature.name,
            "target": qualified_target(cleaned_code, &signature.name),
            "param_count": signature.arity(),
            "case_count": case_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_common::EntryPointPolicy;

    #[test]
    fn test_discovers_typed_free_functions() {
        let code = "#include <vector>\nusing namespace std;\n\nvector<vector<int>> pairs(const vector<int>& nums, int k) {\n  return {};\n}\n\nlong long total(int n) const {\n  return n;\n}\n";
        let found = CppAdapter.discover_signatures(code);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "pairs");
        assert_eq!(found[0].parameters, vec!["nums", "k"]);
        assert_eq!(found[1].name, "total");
    }

    #[test]
    fn test_ignores_prototypes_and_main() {
        let code = "int helper(int x);\nint main() {\n  return 0;\n}";
        assert!(CppAdapter
            .discover_signature(code, EntryPointPolicy::FirstDeclared)
            .is_err());
    }

    #[test]
    fn test_void_parameter_list_has_no_parameters() {
        let found = CppAdapter.discover_signatures("int answer(void) {\n  return 42;\n}");
        assert_eq!(found[0].arity(), 0);
    }

    #[test]
    fn test_render_literal_uses_braces_and_nullptr() {
        let value = Value::List(vec![
            Value::List(vec![Value::from(1)]),
            Value::from("a\"b"),
            Value::Null,
            Value::Bool(true),
        ]);
        assert_eq!(
            CppAdapter.render_literal(&value),
            r#"{{1}, "a\"b", nullptr, true}"#
        );
    }

    #[test]
    fn test_clean_code_removes_main() {
        let code = "int sq(int x) {\n  return x * x;\n}\n\nint main() {\n  vector<int> test_input = {1, 2};\n  cout << sq(3) << endl;\n  return 0;\n}\n";
        let cleaned = CppAdapter.clean_code(code);
        assert!(cleaned.contains("int sq(int x)"));
        assert!(!cleaned.contains("main"));
        assert!(!cleaned.contains("cout"));
    }

    #[test]
    fn test_member_functions_are_qualified() {
        let code = "struct ListNode {\n  int val;\n};\n\nclass Solution {\npublic:\n  int climbStairs(int n) {\n    return n;\n  }\n};\n";
        let signature = CppAdapter
            .discover_signature(code, EntryPointPolicy::FirstDeclared)
            .unwrap();
        assert_eq!(signature.name, "climbStairs");

        let program = CppAdapter
            .build_harness(code, &signature, &["{5}".to_string()])
            .unwrap();
        assert!(program
            .source_text
            .contains("gauntlet::invoke(&Solution::climbStairs, parser.parse())"));
        assert!(program.source_text.contains("const int case_count = 1;"));
    }

    #[test]
    fn test_free_functions_are_not_qualified() {
        let code = "int sq(int x) {\n  return x * x;\n}";
        assert_eq!(qualified_target(code, "sq"), "sq");
    }

    #[test]
    fn test_innermost_record_owns_member() {
        let code = "struct Outer {\n  struct Inner {\n    int depth(int n) {\n      return n;\n    }\n  };\n};\n";
        assert_eq!(qualified_target(code, "depth"), "Inner::depth");
    }
}

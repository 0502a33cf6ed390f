use gauntlet_common::{FunctionSignature, Language, Value};
use lazy_static::lazy_static;
use regex::Regex;

use super::{drop_test_lines, quote_string, render_list, split_params, LanguageAdapter};

lazy_static! {
    static ref DEF: Regex =
        Regex::new(r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)[ \t]*\(([^)]*)\)")
            .expect("valid regex");
    static ref MAIN_GUARD: Regex =
        Regex::new(r#"^if\s+__name__\s*==\s*['"]__main__['"]\s*:"#).expect("valid regex");
}

pub struct PythonAdapter;

fn parameter_name(param: &str) -> Option<String> {
    let name = param
        .split(|c| c == ':' || c == '=')
        .next()
        .unwrap_or(param)
        .trim()
        .trim_start_matches('*')
        .trim();

    match name {
        "" | "/" | "self" | "cls" => None,
        other => Some(other.to_string()),
    }
}

fn is_top_level_test_line(line: &str) -> bool {
    let lowered = line.to_lowercase();
    let trimmed = lowered.trim_start();

    if trimmed.starts_with("#test") || trimmed.starts_with("# test") {
        return true;
    }
    if line.starts_with(|c: char| c.is_whitespace()) {
        return false;
    }
    trimmed.starts_with("print(") || trimmed.contains("test_input")
}

/// Drop `if __name__ == "__main__":` and everything indented under it
fn strip_main_guard(code: &str) -> String {
    let mut kept = Vec::new();
    let mut in_guard = false;

    for line in code.lines() {
        if MAIN_GUARD.is_match(line) {
            in_guard = true;
            continue;
        }
        if in_guard {
            let indented = line.starts_with(|c: char| c.is_whitespace());
            if indented || line.trim().is_empty() {
                continue;
            }
            in_guard = false;
        }
        kept.push(line);
    }

    kept.join("\n")
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn entry_filename(&self) -> &'static str {
        "main.py"
    }

    fn template(&self) -> &'static str {
        include_str!("../../templates/python.hbs")
    }

    fn discover_signatures(&self, code: &str) -> Vec<FunctionSignature> {
        DEF.captures_iter(code)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str();
                if name.starts_with("__") && name.ends_with("__") {
                    return None;
                }
                let parameters = split_params(caps.get(2).map_or("", |m| m.as_str()))
                    .iter()
                    .filter_map(|p| parameter_name(p))
                    .collect();
                Some(FunctionSignature {
                    name: name.to_string(),
                    parameters,
                })
            })
            .collect()
    }

    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => quote_string(s),
            Value::List(items) => render_list(items, "[", "]", |v| self.render_literal(v)),
        }
    }

    fn clean_code(&self, code: &str) -> String {
        drop_test_lines(&strip_main_guard(code), is_top_level_test_line)
    }
}

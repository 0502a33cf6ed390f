use gauntlet_common::{FunctionSignature, Language, Value};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use super::{
    block_end, drop_test_lines, last_identifier, quote_string, render_list, split_params,
    strip_block, LanguageAdapter,
};

lazy_static! {
    static ref METHOD: Regex = Regex::new(
        r"(?m)(?:(?:public|private|protected|static|final|synchronized)\s+)+(?:<[^>]*>\s*)?([\w.$]+(?:\s*<[^;{()]*?>)?(?:\s*\[\s*\])*)\s+([A-Za-z_$][\w$]*)\s*\(([^)]*)\)"
    )
    .expect("valid regex");
    static ref MAIN: Regex =
        Regex::new(r"(?:public\s+)?static\s+void\s+main\s*\(").expect("valid regex");
    static ref CLASS: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?:public|final|abstract)\s+)*class\s+([A-Za-z_$][\w$]*)"
    )
    .expect("valid regex");
    static ref PUBLIC_TYPE: Regex =
        Regex::new(r"\bpublic\s+((?:(?:final|abstract)\s+)*)(class|interface|enum)\b")
            .expect("valid regex");
    static ref MAIN_IDENT: Regex = Regex::new(r"\bMain\b").expect("valid regex");
}

const RESERVED_TYPES: &[&str] = &["class", "interface", "enum", "new", "return", "throw"];

/// The generated driver owns `public class Main`; a user class of that name is renamed
const RENAMED_MAIN: &str = "UserMain";

pub struct JavaAdapter;

struct ClassSpan {
    name: String,
    start: usize,
    end: usize,
}

fn class_spans(code: &str) -> Vec<ClassSpan> {
    CLASS
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let end = block_end(code, whole.end())?;
            Some(ClassSpan {
                name: caps.get(1)?.as_str().to_string(),
                start: whole.start(),
                end,
            })
        })
        .collect()
}

/// Innermost class whose body contains the declaration of `method`
fn owning_class(code: &str, method: &str) -> Option<String> {
    let position = METHOD
        .captures_iter(code)
        .find(|caps| caps.get(2).map(|m| m.as_str()) == Some(method))
        .and_then(|caps| caps.get(0))
        .map(|m| m.start())?;

    class_spans(code)
        .into_iter()
        .filter(|span| span.start < position && position < span.end)
        .min_by_key(|span| span.end - span.start)
        .map(|span| span.name)
}

/// Hoist `import` lines out of the body; `package` lines are dropped
fn split_imports(code: &str) -> (String, String) {
    let mut imports = Vec::new();
    let mut body = Vec::new();

    for line in code.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("import ") {
            imports.push(trimmed);
        } else if !trimmed.starts_with("package ") {
            body.push(line);
        }
    }

    (imports.join("\n"), body.join("\n"))
}

fn strip_main_methods(code: &str) -> String {
    let mut code = code.to_string();
    while let Some(found) = MAIN.find(&code) {
        let stripped = strip_block(&code, found.start());
        if stripped.len() == code.len() {
            break;
        }
        code = stripped;
    }
    code
}

fn is_test_line(line: &str) -> bool {
    let trimmed = line.trim_start().to_lowercase();
    trimmed.starts_with("//test") || trimmed.starts_with("// test")
}

impl LanguageAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn entry_filename(&self) -> &'static str {
        "Main.java"
    }

    fn template(&self) -> &'static str {
        include_str!("../../templates/java.hbs")
    }

    fn discover_signatures(&self, code: &str) -> Vec<FunctionSignature> {
        METHOD
            .captures_iter(code)
            .filter_map(|caps| {
                let return_type = caps.get(1)?.as_str();
                let name = caps.get(2)?.as_str();
                if name == "main" || RESERVED_TYPES.contains(&return_type) {
                    return None;
                }
                let parameters = split_params(caps.get(3).map_or("", |m| m.as_str()))
                    .iter()
                    .filter_map(|p| last_identifier(p))
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
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => quote_string(s),
            Value::List(items) => render_list(items, "{", "}", |v| self.render_literal(v)),
        }
    }

    fn clean_code(&self, code: &str) -> String {
        drop_test_lines(&strip_main_methods(code), is_test_line)
    }

    fn template_data(
        &self,
        cleaned_code: &str,
        signature: &FunctionSignature,
        case_count: usize,
    ) -> serde_json::Value {
        let (imports, body) = split_imports(cleaned_code);

        let (user_code, target_class, wrap_user_code) =
            match owning_class(&body, &signature.name) {
                Some(owner) => {
                    let mut user_code = PUBLIC_TYPE.replace_all(&body, "$1$2").into_owned();
                    let mut owner = owner;
                    if owner == "Main" {
                        user_code = MAIN_IDENT.replace_all(&user_code, RENAMED_MAIN).into_owned();
                        owner = RENAMED_MAIN.to_string();
                    }
                    (user_code, owner, false)
                }
                None => (body, "Main".to_string(), true),
            };

        json!({
            "user_code": user_code,
            "imports": imports,
            "func_name": signature.name,
            "param_count": signature.arity(),
            "case_count": case_count,
            "target_class": target_class,
            "wrap_user_code": wrap_user_code,
        })
    }
}

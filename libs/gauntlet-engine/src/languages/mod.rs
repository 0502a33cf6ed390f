/// Language Adapters
///
/// **Core Responsibility:**
/// Everything that depends on the syntax of one source language lives behind
/// the `LanguageAdapter` trait: finding the entry point, rendering literals,
/// stripping ad-hoc test calls and supplying the harness template.
///
/// **Critical Architectural Boundary:**
/// - Adapters never touch the network or the cache
/// - Discovery is best-effort declaration matching, not parsing
/// - Adding a language means adding one adapter and one template file
pub mod cpp;
pub mod java;
pub mod javascript;
pub mod python;

use gauntlet_common::{EntryPointPolicy, FunctionSignature, HarnessProgram, Language, Value};
use serde_json::json;

use crate::error::ExecutionError;
use crate::harness;

pub use cpp::CppAdapter;
pub use java::JavaAdapter;
pub use javascript::JavaScriptAdapter;
pub use python::PythonAdapter;

pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// File name the sandbox stores the harness under
    fn entry_filename(&self) -> &'static str;

    /// Handlebars source of the harness driver
    fn template(&self) -> &'static str;

    /// Every candidate declaration, in source order
    fn discover_signatures(&self, code: &str) -> Vec<FunctionSignature>;

    fn discover_signature(
        &self,
        code: &str,
        policy: EntryPointPolicy,
    ) -> Result<FunctionSignature, ExecutionError> {
        select_entry_point(self.discover_signatures(code), policy).ok_or(
            ExecutionError::SignatureNotFound {
                language: self.language(),
            },
        )
    }

    /// Single-line literal in this language's syntax
    fn render_literal(&self, value: &Value) -> String;

    /// Strip ad-hoc test calls and any user-supplied program entry point
    fn clean_code(&self, code: &str) -> String;

    fn template_data(
        &self,
        cleaned_code: &str,
        signature: &FunctionSignature,
        case_count: usize,
    ) -> serde_json::Value {
        json!({
            "user_code": cleaned_code,
            "func_name": signature.name,
            "param_count": signature.arity(),
            "case_count": case_count,
        })
    }

    fn build_harness(
        &self,
        cleaned_code: &str,
        signature: &FunctionSignature,
        encoded_inputs: &[String],
    ) -> Result<HarnessProgram, ExecutionError> {
        let data = self.template_data(cleaned_code, signature, encoded_inputs.len());
        let source_text = harness::render(self.language(), self.template(), &data)?;

        Ok(HarnessProgram {
            source_text,
            entry_filename: self.entry_filename().to_string(),
            language: self.language(),
        })
    }
}

static PYTHON: PythonAdapter = PythonAdapter;
static JAVASCRIPT: JavaScriptAdapter = JavaScriptAdapter;
static JAVA: JavaAdapter = JavaAdapter;
static CPP: CppAdapter = CppAdapter;

/// Adapter registry
pub fn adapter_for(language: Language) -> &'static dyn LanguageAdapter {
    match language {
        Language::Python => &PYTHON,
        Language::JavaScript => &JAVASCRIPT,
        Language::Java => &JAVA,
        Language::Cpp => &CPP,
    }
}

/// Pick the entry point among discovered candidates
pub fn select_entry_point(
    candidates: Vec<FunctionSignature>,
    policy: EntryPointPolicy,
) -> Option<FunctionSignature> {
    match policy {
        EntryPointPolicy::FirstDeclared => candidates.into_iter().next(),
        EntryPointPolicy::LargestArity => {
            let mut best: Option<FunctionSignature> = None;
            for candidate in candidates {
                let better = best
                    .as_ref()
                    .map_or(true, |b| candidate.arity() > b.arity());
                if better {
                    best = Some(candidate);
                }
            }
            best
        }
    }
}

/// Split a parameter list on top-level commas
pub(crate) fn split_params(raw: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();

    for c in raw.chars() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            ',' if depth <= 0 => {
                params.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    params.push(current.trim().to_string());

    params.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Name of a typed parameter: the last identifier before any default value
pub(crate) fn last_identifier(param: &str) -> Option<String> {
    let declaration = param.split('=').next().unwrap_or(param);
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';

    let trimmed = declaration.trim_end_matches(|c: char| !is_ident(c));
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident(*c))
        .last()
        .map(|(i, _)| i)?;

    let name = &trimmed[start..];
    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(name.to_string())
    }
}

/// JSON string escaping, valid as a string literal in every supported language
pub(crate) fn quote_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Render a nested list with the given delimiters and element renderer
pub(crate) fn render_list<F>(items: &[Value], open: &str, close: &str, render: F) -> String
where
    F: Fn(&Value) -> String,
{
    let inner: Vec<String> = items.iter().map(render).collect();
    format!("{}{}{}", open, inner.join(", "), close)
}

/// Remove the block starting at byte `start` whose body is the first `{...}`
/// after it. Unbalanced code is returned unchanged.
pub(crate) fn strip_block(code: &str, start: usize) -> String {
    match block_end(code, start) {
        Some(end) => {
            let mut out = String::with_capacity(code.len());
            out.push_str(&code[..start]);
            out.push_str(&code[end..]);
            out
        }
        None => code.to_string(),
    }
}

/// Byte offset just past the `}` closing the first `{` at or after `start`.
/// Braces inside string and char literals and comments are ignored.
pub(crate) fn block_end(code: &str, start: usize) -> Option<usize> {
    let bytes = code.as_bytes();
    let open = code.get(start..)?.find('{').map(|i| start + i)?;

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Drop lines that look like leftover manual testing
pub(crate) fn drop_test_lines<F>(code: &str, is_test_line: F) -> String
where
    F: Fn(&str) -> bool,
{
    code.lines()
        .filter(|line| !is_test_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// CLI commands for running and inspecting Gauntlet executions
use anyhow::{bail, Context, Result};
use gauntlet_common::{BatchResult, Config, Language, TestCase, TestResult, Value};
use gauntlet_engine::harness;
use gauntlet_engine::languages::select_entry_point;
use gauntlet_engine::{adapter_for, ExecutionCache, Executor, LanguageConfigManager, PistonEngine};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn read_code(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Parse a JSON array of test cases
pub fn parse_test_cases(content: &str) -> Result<Vec<TestCase>> {
    serde_json::from_str(content).context("Test file must be a JSON array of {input, expected_output}")
}

fn load_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_test_cases(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse a JSON argument; bare words fall back to strings
pub fn parse_value_arg(raw: &str) -> Value {
    Value::parse(raw.trim()).unwrap_or_else(|| Value::String(raw.to_string()))
}

fn build_executor(config: &Config) -> Result<Executor> {
    let runtimes = LanguageConfigManager::load_or_default(Path::new(&config.languages_config_path))?;
    let engine = PistonEngine::new(config, runtimes)?;
    let cache = ExecutionCache::in_memory(config.single_cache_ttl(), config.batch_cache_ttl());
    Ok(Executor::new(Arc::new(engine), cache, config.entry_point))
}

/// One report line for a test result
pub fn format_result(result: &TestResult) -> String {
    let mark = if result.passed { "✅" } else { "❌" };
    let actual = result
        .actual
        .as_ref()
        .map(|v| v.to_json())
        .unwrap_or_else(|| "-".to_string());

    match &result.error {
        Some(error) => format!("{} #{:<3} error: {}", mark, result.index + 1, error),
        None => format!(
            "{} #{:<3} expected {} got {}",
            mark,
            result.index + 1,
            result.expected.to_json(),
            actual
        ),
    }
}

fn print_batch(result: &BatchResult) -> Result<()> {
    if !result.success {
        bail!(
            "{}",
            result.error.as_deref().unwrap_or("execution failed")
        );
    }

    for test in &result.results {
        println!("{}", format_result(test));
    }
    println!(
        "\n📊 Passed {}/{} test(s)",
        result.tests_passed, result.total_tests
    );

    if !result.all_passed() {
        bail!(
            "{} test(s) failed",
            result.total_tests - result.tests_passed
        );
    }
    Ok(())
}

/// Execute code against a test file
pub async fn run_tests(language: Language, code_path: &Path, tests_path: &Path) -> Result<()> {
    let code = read_code(code_path)?;
    let test_cases = load_test_cases(tests_path)?;
    let config = Config::from_env();
    let executor = build_executor(&config)?;

    println!(
        "🚀 Running {} test(s) for {} via {}\n",
        test_cases.len(),
        language,
        config.sandbox_url
    );

    let result = executor.execute(&code, language, &test_cases).await;
    print_batch(&result)
}

/// Execute code once with a single input
pub async fn try_input(
    language: Language,
    code_path: &Path,
    input: &str,
    expected: Option<&str>,
) -> Result<()> {
    let code = read_code(code_path)?;
    let config = Config::from_env();
    let executor = build_executor(&config)?;

    let expected = expected.map(parse_value_arg).unwrap_or(Value::Null);
    let test_case = TestCase::new(parse_value_arg(input), expected.clone());
    let result = executor.execute_single(&code, language, &test_case).await;

    if !result.success {
        bail!("{}", result.error.as_deref().unwrap_or("execution failed"));
    }

    let Some(outcome) = result.results.first() else {
        bail!("no result returned");
    };

    if let Some(error) = &outcome.error {
        bail!("{}", error);
    }

    let actual = outcome.actual.as_ref().map(|v| v.to_json()).unwrap_or_default();
    println!("{}", actual);

    if !expected.is_null() && !outcome.passed {
        bail!("expected {} got {}", expected.to_json(), actual);
    }
    Ok(())
}

/// Print discovered declarations and the chosen entry point
pub fn discover(language: Language, code_path: &Path) -> Result<()> {
    let code = read_code(code_path)?;
    let config = Config::from_env();
    let adapter = adapter_for(language);

    let candidates = adapter.discover_signatures(&adapter.clean_code(&code));
    if candidates.is_empty() {
        bail!("No {} function declaration found in {}", language, code_path.display());
    }

    println!("🔍 {} declaration(s):\n", candidates.len());
    for signature in &candidates {
        println!("  {}({})", signature.name, signature.parameters.join(", "));
    }

    if let Some(chosen) = select_entry_point(candidates, config.entry_point) {
        println!("\n➡️  Entry point: {} (arity {})", chosen.name, chosen.arity());
    }
    Ok(())
}

/// Print the harness program and stdin payload
pub fn print_harness(language: Language, code_path: &Path, tests_path: &Path) -> Result<()> {
    let code = read_code(code_path)?;
    let test_cases = load_test_cases(tests_path)?;
    let config = Config::from_env();

    let prepared = harness::synthesize(adapter_for(language), &code, &test_cases, config.entry_point)?;

    println!("// ===== {} =====", prepared.program.entry_filename);
    println!("{}", prepared.program.source_text);
    println!("// ===== stdin =====");
    print!("{}", prepared.stdin);
    Ok(())
}

/// List configured languages
pub fn list_languages() -> Result<()> {
    let config = Config::from_env();
    let runtimes = LanguageConfigManager::load_or_default(Path::new(&config.languages_config_path))?;

    println!("📋 Configured Languages:\n");
    println!("{:<12} {:<12} {:<10} {:<12}", "Name", "Runtime", "Version", "Entry file");
    println!("{}", "─".repeat(50));

    let enabled = runtimes.enabled_languages();
    for language in &enabled {
        if let Some(runtime) = runtimes.get(*language) {
            println!(
                "{:<12} {:<12} {:<10} {:<12}",
                language,
                runtime.runtime,
                runtime.version,
                adapter_for(*language).entry_filename()
            );
        }
    }

    println!("\n✅ Total: {} language(s)", enabled.len());
    Ok(())
}

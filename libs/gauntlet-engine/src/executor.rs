/// Orchestrator - Batch Execution Pipeline
///
/// **Flow (per call):**
/// 1. Cache lookup (batch tier for `execute`, single tier for `execute_single`)
/// 2. Clean → discover → encode literals → synthesize harness
/// 3. One dispatch to the sandbox
/// 4. Normalize output lines and compare per test case
/// 5. Store and return
///
/// **Failure Semantics:**
/// - Discovery failure: no dispatch, nothing cached
/// - Compile/runtime failure: batch fails with the sandbox message, result cached
/// - Rate limit/transport failure: batch fails, nothing cached
/// - No fabricated per-test results on any failed batch
use gauntlet_common::{
    BatchResult, EntryPointPolicy, ExecutionOutcome, FailureKind, Language, TestCase,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::{CacheKey, CacheStats, ExecutionCache};
use crate::engine::ExecutionEngine;
use crate::error::ExecutionError;
use crate::evaluator;
use crate::harness;
use crate::languages::adapter_for;

pub struct Executor {
    engine: Arc<dyn ExecutionEngine>,
    cache: ExecutionCache,
    policy: EntryPointPolicy,
}

/// Batch-level view of a sandbox outcome
fn outcome_to_batch(outcome: &ExecutionOutcome, test_cases: &[TestCase]) -> BatchResult {
    match outcome {
        ExecutionOutcome::CompileError { message } => BatchResult::failure(
            FailureKind::CompileError,
            format!("Compilation error: {}", message),
        ),
        ExecutionOutcome::RuntimeError { message } => BatchResult::failure(
            FailureKind::RuntimeError,
            format!("Runtime error: {}", message),
        ),
        ExecutionOutcome::Success { raw_stdout_lines } => {
            BatchResult::from_results(evaluator::evaluate(test_cases, raw_stdout_lines))
        }
    }
}

fn error_to_batch(err: &ExecutionError) -> BatchResult {
    BatchResult::failure(err.kind(), err.to_string())
}

impl Executor {
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        cache: ExecutionCache,
        policy: EntryPointPolicy,
    ) -> Self {
        Self {
            engine,
            cache,
            policy,
        }
    }

    /// Synthesize and dispatch one program for `test_cases`
    async fn run(
        &self,
        code: &str,
        language: Language,
        test_cases: &[TestCase],
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let adapter = adapter_for(language);
        let prepared = harness::synthesize(adapter, code, test_cases, self.policy)?;

        info!(
            function = %prepared.signature.name,
            cases = test_cases.len(),
            "Dispatching harness"
        );

        self.engine
            .dispatch(&prepared.program, &prepared.stdin)
            .await
    }

    /// Run every test case against `code` in one sandbox execution
    #[tracing::instrument(skip(self, code, test_cases), fields(cases = test_cases.len()))]
    pub async fn execute(
        &self,
        code: &str,
        language: Language,
        test_cases: &[TestCase],
    ) -> BatchResult {
        let key = CacheKey::for_request(code, language, test_cases);
        if let Some(cached) = self.cache.get_batch(&key) {
            return cached;
        }

        if test_cases.is_empty() {
            // Still fail closed on code with no entry point
            let adapter = adapter_for(language);
            return match adapter.discover_signature(&adapter.clean_code(code), self.policy) {
                Ok(_) => BatchResult::from_results(Vec::new()),
                Err(err) => error_to_batch(&err),
            };
        }

        match self.run(code, language, test_cases).await {
            Ok(outcome) => {
                let result = outcome_to_batch(&outcome, test_cases);
                info!(
                    success = result.success,
                    passed = result.tests_passed,
                    total = result.total_tests,
                    "Batch evaluated"
                );
                self.cache.put_batch(key, result.clone());
                result
            }
            Err(err) => {
                error!(error = %err, kind = %err.kind(), "Batch execution failed");
                error_to_batch(&err)
            }
        }
    }

    /// Run a single test case; the raw sandbox outcome is cached in the single tier
    #[tracing::instrument(skip(self, code, test_case))]
    pub async fn execute_single(
        &self,
        code: &str,
        language: Language,
        test_case: &TestCase,
    ) -> BatchResult {
        let cases = std::slice::from_ref(test_case);
        let key = CacheKey::for_request(code, language, cases);

        let outcome = match self.cache.get_outcome(&key) {
            Some(outcome) => outcome,
            None => match self.run(code, language, cases).await {
                Ok(outcome) => {
                    self.cache.put_outcome(key, outcome.clone());
                    outcome
                }
                Err(err) => {
                    error!(error = %err, kind = %err.kind(), "Single execution failed");
                    return error_to_batch(&err);
                }
            },
        };

        outcome_to_batch(&outcome, cases)
    }

    /// Drop both cache tiers
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Execution cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gauntlet_common::{HarnessProgram, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays one scripted reply and records every dispatched program
    struct MockEngine {
        reply: Box<dyn Fn() -> Result<ExecutionOutcome, ExecutionError> + Send + Sync>,
        dispatched: Mutex<Vec<(HarnessProgram, String)>>,
    }

    impl MockEngine {
        fn new(
            reply: impl Fn() -> Result<ExecutionOutcome, ExecutionError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                dispatched: Mutex::new(Vec::new()),
            })
        }

        fn printing(lines: &'static [&'static str]) -> Arc<Self> {
            Self::new(move || {
                Ok(ExecutionOutcome::Success {
                    raw_stdout_lines: lines.iter().map(|l| l.to_string()).collect(),
                })
            })
        }

        fn calls(&self) -> usize {
            self.dispatched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExecutionEngine for MockEngine {
        async fn dispatch(
            &self,
            program: &HarnessProgram,
            stdin: &str,
        ) -> Result<ExecutionOutcome, ExecutionError> {
            self.dispatched
                .lock()
                .unwrap()
                .push((program.clone(), stdin.to_string()));
            (self.reply)()
        }
    }

    fn make_executor(engine: Arc<MockEngine>) -> Executor {
        Executor::new(
            engine,
            ExecutionCache::in_memory(Duration::from_secs(300), Duration::from_secs(600)),
            EntryPointPolicy::FirstDeclared,
        )
    }

    fn pair(a: i64, b: i64) -> Value {
        Value::List(vec![Value::from(a), Value::from(b)])
    }

    const ADD: &str = "def add(a, b):\n    return a + b\n";

    #[tokio::test]
    async fn test_execute_scores_each_case() {
        let engine = MockEngine::printing(&["5", "ERROR: boom", "0"]);
        let executor = make_executor(engine.clone());
        let cases = vec![
            TestCase::new(pair(2, 3), 5),
            TestCase::new(pair(1, 1), 2),
            TestCase::new(pair(0, 1), 1),
        ];

        let result = executor.execute(ADD, Language::Python, &cases).await;

        assert!(result.success);
        assert_eq!(result.results.len(), 3);
        assert_eq!(result.tests_passed, 1);
        assert_eq!(result.results[1].error.as_deref(), Some("boom"));
        assert!(!result.results[2].passed);

        let dispatched = engine.dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].0.entry_filename, "main.py");
        assert_eq!(dispatched[0].1, "[2, 3]\n[1, 1]\n[0, 1]\n");
    }

    #[tokio::test]
    async fn test_identical_requests_hit_the_cache() {
        let engine = MockEngine::printing(&["5"]);
        let executor = make_executor(engine.clone());
        let cases = vec![TestCase::new(pair(2, 3), 5)];

        let first = executor.execute(ADD, Language::Python, &cases).await;
        let second = executor.execute(ADD, Language::Python, &cases).await;

        assert_eq!(first, second);
        assert_eq!(engine.calls(), 1);
        assert_eq!(executor.cache_stats().batch.hits, 1);

        executor.clear_cache();
        executor.execute(ADD, Language::Python, &cases).await;
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_signature_never_dispatches() {
        let engine = MockEngine::printing(&["1"]);
        let executor = make_executor(engine.clone());

        let result = executor
            .execute("x = 1\n", Language::Python, &[TestCase::new(1, 1)])
            .await;

        assert!(!result.success);
        assert!(result.results.is_empty());
        assert_eq!(result.error_kind, Some(FailureKind::SignatureNotFound));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_compile_error_short_circuits() {
        let engine = MockEngine::new(|| {
            Ok(ExecutionOutcome::CompileError {
                message: "error: expected ';'".to_string(),
            })
        });
        let executor = make_executor(engine.clone());
        let code = "int sq(int x) {\n  return x * x\n}";

        let result = executor
            .execute(code, Language::Cpp, &[TestCase::new(3, 9)])
            .await;

        assert!(!result.success);
        assert!(result.results.is_empty());
        assert_eq!(result.error.as_deref(), Some("Compilation error: error: expected ';'"));
        assert_eq!(result.error_kind, Some(FailureKind::CompileError));
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported_verbatim_and_not_cached() {
        let engine = MockEngine::new(|| Err(ExecutionError::RateLimited { attempts: 3 }));
        let executor = make_executor(engine.clone());
        let cases = vec![TestCase::new(pair(2, 3), 5)];

        let result = executor.execute(ADD, Language::Python, &cases).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("rate limit exceeded"));
        assert!(result.results.is_empty());

        executor.execute(ADD, Language::Python, &cases).await;
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test]
    async fn test_short_output_marks_missing_cases() {
        let engine = MockEngine::printing(&["5"]);
        let executor = make_executor(engine);
        let cases = vec![TestCase::new(pair(2, 3), 5), TestCase::new(pair(4, 4), 8)];

        let result = executor.execute(ADD, Language::Python, &cases).await;
        assert_eq!(result.results.len(), 2);
        assert_eq!(
            result.results[1].error.as_deref(),
            Some(evaluator::NO_OUTPUT)
        );
    }

    #[tokio::test]
    async fn test_empty_case_list_succeeds_without_dispatch() {
        let engine = MockEngine::printing(&[]);
        let executor = make_executor(engine.clone());

        let result = executor.execute(ADD, Language::Python, &[]).await;
        assert!(result.success);
        assert!(result.results.is_empty());
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_execute_single_caches_outcome() {
        let engine = MockEngine::printing(&["5"]);
        let executor = make_executor(engine.clone());
        let case = TestCase::new(pair(2, 3), 5);

        let first = executor.execute_single(ADD, Language::Python, &case).await;
        let second = executor.execute_single(ADD, Language::Python, &case).await;

        assert!(first.all_passed());
        assert_eq!(first, second);
        assert_eq!(engine.calls(), 1);
        assert_eq!(executor.cache_stats().single.entries, 1);
        assert_eq!(executor.cache_stats().batch.entries, 0);
    }

    #[tokio::test]
    async fn test_concurrent_executions_are_independent() {
        let engine = MockEngine::printing(&["5"]);
        let executor = Arc::new(make_executor(engine.clone()));

        let runs = (0..8).map(|n| {
            let executor = executor.clone();
            async move {
                let code = format!("def add{}(a, b):\n    return a + b\n", n);
                executor
                    .execute(&code, Language::Python, &[TestCase::new(pair(2, 3), 5)])
                    .await
            }
        });
        let results = futures_util::future::join_all(runs).await;

        assert!(results.iter().all(|r| r.all_passed()));
        assert_eq!(engine.calls(), 8);
        assert_eq!(executor.cache_stats().batch.entries, 8);
    }
}

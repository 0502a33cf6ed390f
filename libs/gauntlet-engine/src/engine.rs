/// Execution Dispatcher - Abstraction for Remote Code Execution
///
/// **Core Responsibility:**
/// Submit one synthesized program plus its stdin payload to the sandbox and
/// classify the response.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to reach the sandbox (HTTP, retries, timeouts)
/// - Engine does NOT parse per-test output or judge correctness
/// - Engine holds no state between dispatches
///
/// **Retry Policy:**
/// - HTTP 429: up to `max_rate_limit_retries` retries, exponential backoff
/// - Other non-2xx or network failure: up to `max_transport_retries` retries
/// - Backoff sleeps on the async timer; dropping the future abandons the loop
///
/// **Classification:**
/// - compile stderr non-empty → `CompileError`
/// - run stderr non-empty, or the run was killed by a signal → `RuntimeError`
/// - otherwise → `Success` with stdout split into lines
use anyhow::{Context, Result};
use async_trait::async_trait;
use gauntlet_common::{Config, ExecutionOutcome, HarnessProgram};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::ExecutionError;
use crate::language_config::LanguageConfigManager;

/// Execution engine trait
///
/// Any implementation must guarantee:
/// 1. One logical execution per call (retries are internal)
/// 2. A bounded wait: no call blocks indefinitely
/// 3. Compile and runtime failures come back as outcomes, not errors
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn dispatch(
        &self,
        program: &HarnessProgram,
        stdin: &str,
    ) -> Result<ExecutionOutcome, ExecutionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_rate_limit_retries: u32,
    pub max_transport_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): base, 2×base, 4×base, ...
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(retry.min(16)))
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_rate_limit_retries: config.max_rate_limit_retries,
            max_transport_retries: config.max_transport_retries,
            base_backoff: config.backoff_base(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SandboxFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct SandboxRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<SandboxFile<'a>>,
    stdin: &'a str,
    compile_timeout: u64,
    run_timeout: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub signal: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SandboxResponse {
    #[serde(default)]
    pub compile: Option<StageOutput>,
    #[serde(default)]
    pub run: Option<StageOutput>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Trimmed stdout, one entry per line
pub fn split_stdout(stdout: &str) -> Vec<String> {
    stdout
        .trim()
        .lines()
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn classify(response: SandboxResponse) -> Result<ExecutionOutcome, ExecutionError> {
    if let Some(compile) = &response.compile {
        let stderr = compile.stderr.trim();
        if !stderr.is_empty() {
            return Ok(ExecutionOutcome::CompileError {
                message: stderr.to_string(),
            });
        }
    }

    let Some(run) = response.run else {
        let message = response
            .message
            .unwrap_or_else(|| "response has no run stage".to_string());
        return Err(ExecutionError::InvalidResponse(message));
    };

    let stderr = run.stderr.trim();
    if !stderr.is_empty() {
        return Ok(ExecutionOutcome::RuntimeError {
            message: stderr.to_string(),
        });
    }

    if let Some(signal) = run.signal.filter(|s| !s.is_empty()) {
        return Ok(ExecutionOutcome::RuntimeError {
            message: format!("process killed by {} (time or memory limit exceeded)", signal),
        });
    }

    Ok(ExecutionOutcome::Success {
        raw_stdout_lines: split_stdout(&run.stdout),
    })
}

/// Client for a Piston-compatible `POST /execute` sandbox
pub struct PistonEngine {
    client: reqwest::Client,
    base_url: String,
    runtimes: LanguageConfigManager,
    retry: RetryPolicy,
    request_timeout: Duration,
    compile_timeout_ms: u64,
    run_timeout_ms: u64,
}

impl PistonEngine {
    pub fn new(config: &Config, runtimes: LanguageConfigManager) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .context("Failed to build sandbox HTTP client")?;

        Ok(Self {
            client,
            base_url: config.sandbox_url.trim_end_matches('/').to_string(),
            runtimes,
            retry: RetryPolicy::from(config),
            request_timeout: config.request_timeout(),
            compile_timeout_ms: config.compile_timeout_ms,
            run_timeout_ms: config.run_timeout_ms,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send_once(&self, request: &SandboxRequest<'_>) -> Result<SandboxResponse, ExecutionError> {
        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExecutionError::RateLimited { attempts: 1 });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SandboxResponse>(&body)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or(body);
            return Err(ExecutionError::Sandbox {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SandboxResponse>()
            .await
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()))
    }

    async fn send(&self, request: &SandboxRequest<'_>) -> Result<SandboxResponse, ExecutionError> {
        match tokio::time::timeout(self.request_timeout, self.send_once(request)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::Transport(format!(
                "no response within {}ms",
                self.request_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl ExecutionEngine for PistonEngine {
    #[tracing::instrument(
        skip(self, program, stdin),
        fields(language = %program.language, file = %program.entry_filename)
    )]
    async fn dispatch(
        &self,
        program: &HarnessProgram,
        stdin: &str,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let runtime = self
            .runtimes
            .get(program.language)
            .ok_or_else(|| ExecutionError::UnsupportedLanguage(program.language.to_string()))?;

        let request = SandboxRequest {
            language: &runtime.runtime,
            version: &runtime.version,
            files: vec![SandboxFile {
                name: &program.entry_filename,
                content: &program.source_text,
            }],
            stdin,
            compile_timeout: self.compile_timeout_ms,
            run_timeout: self.run_timeout_ms,
        };

        let mut rate_limit_retries = 0u32;
        let mut transport_retries = 0u32;

        loop {
            let attempt = 1 + rate_limit_retries + transport_retries;

            let err = match self.send(&request).await {
                Ok(response) => {
                    let outcome = classify(response)?;
                    debug!(attempt, "Sandbox responded");
                    return Ok(outcome);
                }
                Err(err) => err,
            };

            let delay = match &err {
                ExecutionError::RateLimited { .. }
                    if rate_limit_retries < self.retry.max_rate_limit_retries =>
                {
                    rate_limit_retries += 1;
                    self.retry.backoff(rate_limit_retries - 1)
                }
                ExecutionError::RateLimited { .. } => {
                    error!(attempts = attempt, "Sandbox rate limit retries exhausted");
                    return Err(ExecutionError::RateLimited { attempts: attempt });
                }
                e if e.is_retryable() && transport_retries < self.retry.max_transport_retries => {
                    transport_retries += 1;
                    self.retry.backoff(transport_retries - 1)
                }
                e => {
                    error!(attempts = attempt, error = %e, "Sandbox request failed");
                    return Err(err);
                }
            };

            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying sandbox request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

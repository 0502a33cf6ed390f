pub mod cache;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod harness;
pub mod language_config;
pub mod languages;
pub mod literal;

// Re-export the orchestration surface
pub use cache::{CacheKey, CacheStats, CacheStore, CacheTier, ExecutionCache, InMemoryCache, TierStats};
pub use engine::{ExecutionEngine, PistonEngine, RetryPolicy};
pub use error::ExecutionError;
pub use executor::Executor;
pub use language_config::{LanguageConfigManager, RuntimeConfig};
pub use languages::{adapter_for, LanguageAdapter};

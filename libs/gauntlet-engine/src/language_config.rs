// Sandbox runtime table: which runtime name and version each language runs under

use anyhow::{bail, Context, Result};
use gauntlet_common::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub name: String,
    /// Runtime identifier understood by the sandbox
    pub runtime: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<RuntimeConfig>,
}

/// Language runtime manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, RuntimeConfig>,
}

impl LanguageConfigManager {
    /// Load runtime configuration from a languages.json file
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let languages_json: LanguagesJson = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let mut configs = HashMap::new();
        for runtime in languages_json.languages {
            let Some(language) = Language::from_str(&runtime.name) else {
                bail!("Unknown language '{}' in {}", runtime.name, config_path.display());
            };
            configs.insert(language, runtime);
        }

        if configs.is_empty() {
            bail!("No languages configured in {}", config_path.display());
        }

        Ok(Self { configs })
    }

    /// Load from `config_path`, falling back to built-in runtimes when the file is absent
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            warn!(
                path = %config_path.display(),
                "Language config not found, using built-in runtimes"
            );
            return Ok(Self::default());
        }

        let manager = Self::load(config_path)?;
        info!(
            path = %config_path.display(),
            languages = manager.configs.len(),
            "Loaded language runtimes"
        );
        Ok(manager)
    }

    pub fn get(&self, language: Language) -> Option<&RuntimeConfig> {
        self.configs.get(&language)
    }

    pub fn is_enabled(&self, language: Language) -> bool {
        self.configs.contains_key(&language)
    }

    /// Enabled languages in declaration order
    pub fn enabled_languages(&self) -> Vec<Language> {
        Language::all_variants()
            .iter()
            .copied()
            .filter(|l| self.is_enabled(*l))
            .collect()
    }
}

impl Default for LanguageConfigManager {
    fn default() -> Self {
        let builtin = [
            (Language::Python, "python", "3.10.0"),
            (Language::JavaScript, "javascript", "18.15.0"),
            (Language::Java, "java", "15.0.2"),
            (Language::Cpp, "cpp", "10.2.0"),
        ];

        let configs = builtin
            .into_iter()
            .map(|(language, runtime, version)| {
                (
                    language,
                    RuntimeConfig {
                        name: language.to_string(),
                        runtime: runtime.to_string(),
                        version: version.to_string(),
                    },
                )
            })
            .collect();

        Self { configs }
    }
}

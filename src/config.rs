use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_MAX_PAGES: usize = 10;
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Which text-classification backend ranks the clauses. `Disabled` is a
/// normal state: the crawl still runs and simply returns no findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassifierConfig {
    #[default]
    Disabled,
    Gemini {
        api_key: String,
        model: String,
    },
    OpenAi {
        api_key: String,
        model: String,
        base_url: String,
    },
}

impl ClassifierConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ClassifierConfig::Disabled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClassifierConfig::Disabled => "disabled",
            ClassifierConfig::Gemini { .. } => "gemini",
            ClassifierConfig::OpenAi { .. } => "openai",
        }
    }
}

/// Knobs for one crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    pub max_pages: usize,
    pub min_words: usize,
    pub concurrency: usize,
    pub use_sitemap: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            min_words: 60,
            concurrency: 4,
            use_sitemap: true,
        }
    }
}

/// Raw `SCOUT_*` environment settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: Option<String>,
    pub gemini_key: Option<String>,
    pub openai_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub model: Option<String>,
    pub max_pages: Option<usize>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub sitemap: Option<bool>,
}

impl Settings {
    /// Read `SCOUT_PROVIDER`, `SCOUT_GEMINI_KEY`, `SCOUT_MAX_PAGES`, ...
    pub fn from_env() -> Result<Self> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("SCOUT").try_parsing(true))
            .build()
            .context("Failed to read SCOUT_* settings")?
            .try_deserialize()
            .context("Invalid SCOUT_* settings")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(15).max(1))
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        let defaults = CrawlConfig::default();
        CrawlConfig {
            max_pages: self.max_pages.filter(|n| *n > 0).unwrap_or(defaults.max_pages),
            concurrency: self.concurrency.filter(|n| *n > 0).unwrap_or(defaults.concurrency),
            use_sitemap: self.sitemap.unwrap_or(defaults.use_sitemap),
            ..defaults
        }
    }

    /// No provider, or a provider without its key, means disabled. Only an
    /// unknown provider name is an error.
    pub fn classifier(&self) -> Result<ClassifierConfig> {
        let provider = self
            .provider
            .as_deref()
            .map(|p| p.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let key = |k: &Option<String>| k.as_deref().map(str::trim).filter(|k| !k.is_empty()).map(String::from);

        match provider.as_str() {
            "" | "none" | "disabled" => Ok(ClassifierConfig::Disabled),
            "gemini" => {
                let Some(api_key) = key(&self.gemini_key) else {
                    warn!("SCOUT_PROVIDER=gemini set without SCOUT_GEMINI_KEY; risk ranking disabled");
                    return Ok(ClassifierConfig::Disabled);
                };
                Ok(ClassifierConfig::Gemini {
                    api_key,
                    model: self.model.clone().unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
                })
            }
            "openai" => {
                let Some(api_key) = key(&self.openai_key) else {
                    warn!("SCOUT_PROVIDER=openai set without SCOUT_OPENAI_KEY; risk ranking disabled");
                    return Ok(ClassifierConfig::Disabled);
                };
                Ok(ClassifierConfig::OpenAi {
                    api_key,
                    model: self.model.clone().unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
                    base_url: self
                        .openai_base_url
                        .clone()
                        .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into())
                        .trim_end_matches('/')
                        .to_string(),
                })
            }
            other => bail!("Unknown SCOUT_PROVIDER '{}' (expected gemini, openai or none)", other),
        }
    }
}

// ── Tests ──

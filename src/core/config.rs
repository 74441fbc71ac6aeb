use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_CHART_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_PAGE_URL: &str = "https://finance.yahoo.com";
pub const DEFAULT_CRYPTO_URL: &str = "https://api.coinbase.com";
pub const DEFAULT_LOGO_TEMPLATE: &str = "https://www.google.com/s2/favicons?domain={domain}&sz=128";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
}

impl ProviderConfig {
    fn new(base_url: &str) -> Option<Self> {
        Some(ProviderConfig {
            base_url: base_url.to_string(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    /// Structured quote and quote summary API.
    pub yahoo: Option<ProviderConfig>,
    /// Unofficial chart API used as the second fallback.
    pub chart: Option<ProviderConfig>,
    /// Rendered quote pages used as the last fallback.
    pub page: Option<ProviderConfig>,
    /// Crypto spot price API.
    pub crypto: Option<ProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: ProviderConfig::new(DEFAULT_YAHOO_URL),
            chart: ProviderConfig::new(DEFAULT_CHART_URL),
            page: ProviderConfig::new(DEFAULT_PAGE_URL),
            crypto: ProviderConfig::new(DEFAULT_CRYPTO_URL),
        }
    }
}

impl ProvidersConfig {
    pub fn yahoo_url(&self) -> &str {
        self.yahoo.as_ref().map_or(DEFAULT_YAHOO_URL, |p| &p.base_url)
    }

    pub fn chart_url(&self) -> &str {
        self.chart.as_ref().map_or(DEFAULT_CHART_URL, |p| &p.base_url)
    }

    pub fn page_url(&self) -> &str {
        self.page.as_ref().map_or(DEFAULT_PAGE_URL, |p| &p.base_url)
    }

    pub fn crypto_url(&self) -> &str {
        self.crypto.as_ref().map_or(DEFAULT_CRYPTO_URL, |p| &p.base_url)
    }
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_logo_template() -> String {
    DEFAULT_LOGO_TEMPLATE.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_logo_template")]
    pub logo_url_template: String,
    /// Watch list resolved when no symbols are passed on the command line.
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            timeout_secs: default_timeout_secs(),
            logo_url_template: default_logo_template(),
            symbols: Vec::new(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or built-in defaults if there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "xquote", "xquote")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// A zero timeout would fail every upstream call before it starts.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

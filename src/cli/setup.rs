use crate::core::config::AppConfig;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use super::ui;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example config to `config_path`, or to the platform config dir.
pub fn run(config_path: Option<&str>) -> Result<()> {
    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_config_path()?,
    };
    let config = write_example_config(&path)?;
    println!("{}", describe_created(&path, &config));
    Ok(())
}

/// Returns the config that was written so callers can report what it resolves.
pub fn write_example_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        bail!(
            "Configuration file already exists at {}; edit it or pass --config-path",
            path.display()
        );
    }

    let config: AppConfig =
        serde_yaml::from_str(EXAMPLE_CONFIG).context("Bundled example config is not valid YAML")?;
    config.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!(path = %path.display(), symbols = config.symbols.len(), "Created example configuration");
    Ok(config)
}

fn describe_created(path: &Path, config: &AppConfig) -> String {
    let watch_list = if config.symbols.is_empty() {
        "an empty watch list".to_string()
    } else {
        format!("watch list {}", config.symbols.join(", "))
    };
    format!(
        "Created {} with {} priced in {}.\nRun {} to resolve it.",
        ui::style_text(&path.display().to_string(), ui::StyleType::Title),
        watch_list,
        config.currency,
        ui::style_text("xquote resolve", ui::StyleType::Subtle),
    )
}

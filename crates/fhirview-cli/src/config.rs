use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

/// Overrides `~/.fhirview` as the config directory
pub const CONFIG_DIR_ENV: &str = "FHIRVIEW_CONFIG_DIR";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub format: Option<String>,
}

impl ProfileConfig {
    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        self.format
            .as_deref()
            .map(|f| {
                OutputFormat::from_str(f, true)
                    .map_err(|_| anyhow::anyhow!("Invalid format in config: {f}. Valid: table, json"))
            })
            .transpose()
    }
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

fn config_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .context("Cannot determine home directory")?
            .join(".fhirview"),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn load_all_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg: ConfigFile =
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(cfg)
}

pub fn save_profile_to(path: &Path, profile: &str, config: &ProfileConfig) -> Result<()> {
    let mut all = load_all_from(path)?;
    all.insert(profile.to_string(), config.clone());
    let content = toml::to_string_pretty(&all)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    let mut all = load_all_from(&config_path()?)?;
    Ok(all.remove(profile).unwrap_or_default())
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    save_profile_to(&config_path()?, profile, config)
}

/// Apply `config set <key> <value>` to a profile.
pub fn set_key(config: &mut ProfileConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "server" => {
            url::Url::parse(value).with_context(|| format!("Invalid server URL: {value}"))?;
            config.server = Some(value.to_string());
        }
        "format" => {
            OutputFormat::from_str(value, true)
                .map_err(|_| anyhow::anyhow!("Invalid format: {value}. Valid: table, json"))?;
            config.format = Some(value.to_lowercase());
        }
        other => anyhow::bail!("Unknown config key: {other}. Valid keys: server, format"),
    }
    Ok(())
}

pub fn resolve_server(cli_server: &Option<String>, profile: &str) -> Result<String> {
    // 1. --server flag / FHIRVIEW_URL env
    if let Some(s) = cli_server {
        return Ok(s.clone());
    }
    // 2. config.toml profile
    if let Some(s) = load_profile(profile)?.server {
        return Ok(s);
    }
    anyhow::bail!(
        "No server URL configured. Use --server, set FHIRVIEW_URL env var, or run: fhirview config set server <url>"
    )
}

pub fn resolve_format(cli_format: Option<OutputFormat>, profile: &str) -> Result<OutputFormat> {
    if let Some(f) = cli_format {
        return Ok(f);
    }
    Ok(load_profile(profile)?.output_format()?.unwrap_or_default())
}

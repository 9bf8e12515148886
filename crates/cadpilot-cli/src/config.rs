//! Configuration file management for cadpilot.
//!
//! Provides a TOML-based config file at `~/.config/cadpilot/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use cadpilot_core::{MachineProfile, PlanLimits};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Machine capability limits checked during sanitization.
    pub machine: MachineProfile,
    /// Plan-level limits (operation count, prompt length, duration).
    pub limits: PlanLimits,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the cadpilot config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/cadpilot` or
/// `~/.config/cadpilot`. We intentionally ignore the platform-specific
/// `dirs::config_dir()` (which returns `~/Library/Application Support`
/// on macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("cadpilot");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("cadpilot")
}

/// Return the default path to the cadpilot config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Resolve which config file to use: CLI flag > `CADPILOT_CONFIG` env
/// var > default XDG path.
pub fn resolved_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(env_path) = std::env::var("CADPILOT_CONFIG") {
        return PathBuf::from(env_path);
    }
    config_path()
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse a config file. A missing file is not an error (built-in
/// defaults apply); a file that exists but does not parse is.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct CadpilotConfig {
    pub machine: MachineProfile,
    pub limits: PlanLimits,
}

impl CadpilotConfig {
    /// Resolve configuration using the chain: CLI flag > `CADPILOT_CONFIG`
    /// env var > XDG config file > built-in defaults.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        let path = resolved_path(cli_path);
        let file = load_config(&path)?;
        Ok(Self {
            machine: file.machine,
            limits: file.limits,
        })
    }
}

// -----------------------------------------------------------------------
// cadpilot init
// -----------------------------------------------------------------------

/// Write a config file populated with the built-in defaults.
pub fn cmd_init(cli_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolved_path(cli_path);
    if path.exists() && !force {
        bail!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    save_config(&path, &ConfigFile::default())?;
    println!("Wrote config file to {}", path.display());
    Ok(())
}

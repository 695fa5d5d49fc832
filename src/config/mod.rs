//! Configuration management for cardboard
//!
//! Static settings come from a TOML file; every section is optional and
//! falls back to its defaults. Paths that depend on the session (the IPC
//! socket and the user's config script) are resolved from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::input::parse_modifiers;

/// Environment variable overriding the IPC socket path
pub const SOCKET_ENV_VAR: &str = "CARDBOARD_SOCKET";

/// Main configuration struct containing all cardboard settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CardboardConfig {
    /// Tiling behaviour
    #[serde(default)]
    pub layout: LayoutConfig,

    /// View movement animations
    #[serde(default)]
    pub animation: AnimationConfig,

    /// Input handling
    #[serde(default)]
    pub input: InputConfig,

    /// Command socket
    #[serde(default)]
    pub ipc: IpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between tiles, in pixels
    pub gap: i32,

    /// Number of workspaces created at startup
    pub workspaces: usize,

    /// Whether `focus left/right` wraps around at the ends of the column list
    pub focus_wrap: bool,

    /// Scroll the viewport to the newly focused view
    pub auto_scroll: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Enable animations
    pub enabled: bool,

    /// Duration of one movement (milliseconds)
    pub duration_ms: u64,

    /// Interval between animation frames (milliseconds)
    pub frame_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Modifiers that turn a pointer press into a move/resize grab
    pub mouse_mods: String,

    /// Keyboard repeat rate (keys per second)
    pub keyboard_repeat_rate: u32,

    /// Keyboard repeat delay (milliseconds)
    pub keyboard_repeat_delay: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct IpcConfig {
    /// Socket path; wins over the environment when set
    pub socket_path: Option<PathBuf>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap: 10,
            workspaces: 6,
            focus_wrap: false,
            auto_scroll: true,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 300,
            frame_interval_ms: 16,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mouse_mods: "super".to_string(),
            keyboard_repeat_rate: 25,
            keyboard_repeat_delay: 600,
        }
    }
}

impl CardboardConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = env::var("HOME").context("Failed to get HOME environment variable")?;
            let rest = path.strip_prefix("~").unwrap_or(path);
            Path::new(&home).join(rest)
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: CardboardConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.layout.gap < 0 {
            anyhow::bail!("Invalid gap: {} (must not be negative)", self.layout.gap);
        }

        if self.layout.workspaces == 0 {
            anyhow::bail!("Invalid workspaces: at least one workspace is required");
        }

        if self.animation.duration_ms == 0 {
            anyhow::bail!("Invalid animation duration: must be greater than 0");
        }

        if self.animation.frame_interval_ms == 0 {
            anyhow::bail!("Invalid animation frame interval: must be greater than 0");
        }

        parse_modifiers(&self.input.mouse_mods)
            .with_context(|| format!("Invalid mouse_mods: {}", self.input.mouse_mods))?;

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Socket path: the TOML override, else the environment.
    pub fn ipc_socket_path(&self) -> PathBuf {
        match &self.ipc.socket_path {
            Some(path) => path.clone(),
            None => ipc_socket_path(),
        }
    }
}

/// Resolves the IPC socket path from the process environment.
pub fn ipc_socket_path() -> PathBuf {
    resolve_socket_path(
        env::var(SOCKET_ENV_VAR).ok(),
        env::var("WAYLAND_DISPLAY").ok(),
    )
}

/// `$CARDBOARD_SOCKET`, else `/tmp/cardboard-$WAYLAND_DISPLAY` (`wayland-0` when unset).
pub fn resolve_socket_path(socket_override: Option<String>, wayland_display: Option<String>) -> PathBuf {
    if let Some(path) = socket_override.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    let display = wayland_display
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "wayland-0".to_string());
    PathBuf::from(format!("/tmp/cardboard-{display}"))
}

/// Resolves the user's config script from the process environment.
pub fn config_script_path() -> Result<PathBuf> {
    resolve_config_home(env::var("XDG_CONFIG_HOME").ok(), env::var("HOME").ok())
        .map(|dir| dir.join("cardboard").join("cardboardrc"))
}

/// Default location of the TOML file.
pub fn default_config_path() -> Result<PathBuf> {
    resolve_config_home(env::var("XDG_CONFIG_HOME").ok(), env::var("HOME").ok())
        .map(|dir| dir.join("cardboard").join("cardboard.toml"))
}

/// `$XDG_CONFIG_HOME`, else `$HOME/.config`.
pub fn resolve_config_home(xdg_config_home: Option<String>, home: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = xdg_config_home.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let home = home
        .filter(|h| !h.is_empty())
        .context("Neither XDG_CONFIG_HOME nor HOME is set")?;
    Ok(PathBuf::from(home).join(".config"))
}

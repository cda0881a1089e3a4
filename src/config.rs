//! Configuration file support
//!
//! Settings live in an optional `fmvars.toml`:
//!
//! ```toml
//! [render]
//! link_class = "internal-link"
//! broken_link_class = "broken-link"
//! line_break = "<br />"
//! spread_separator = ", "
//!
//! [watch]
//! debounce_ms = 100
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use crate::error::Result;
use crate::render::RenderOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File name looked up in the working directory
pub const CONFIG_FILE: &str = "fmvars.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub render: RenderConfig,
    pub watch: WatchConfig,
}

/// `[render]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub link_class: String,
    pub broken_link_class: String,
    pub line_break: String,
    pub spread_separator: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let options = RenderOptions::default();
        Self {
            link_class: options.link_class,
            broken_link_class: options.broken_link_class,
            line_break: options.line_break,
            spread_separator: options.spread_separator,
        }
    }
}

/// `[watch]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet period after the last change before re-rendering
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded configuration");
        Self::from_toml_str(&content)
    }

    /// Load `explicit` if given, else `fmvars.toml` from the working directory,
    /// else the defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Self::load(local);
        }
        Ok(Self::default())
    }

    /// Render options described by the `[render]` section
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            link_class: self.render.link_class.clone(),
            broken_link_class: self.render.broken_link_class.clone(),
            line_break: self.render.line_break.clone(),
            spread_separator: self.render.spread_separator.clone(),
            ..RenderOptions::default()
        }
    }
}

//! Engine configuration
//!
//! All fields are optional in the TOML source; missing keys take the
//! defaults below.
//!
//! ```toml
//! # montage.toml
//! builder_delay_ms = 50
//! busy_slowdown_factor = 15
//! start_active = true
//! ```

use std::path::Path;
use std::time::Duration;

use montage_core::{Result, SessionError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUILDER_DELAY_MS: u64 = 50;
pub const DEFAULT_BUSY_SLOWDOWN_FACTOR: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Quiet time after the last command before an idle build runs
    pub builder_delay_ms: u64,
    /// Multiplier on the builder delay while commands keep arriving
    pub busy_slowdown_factor: u32,
    /// Whether the dispatcher processes commands right after start
    pub start_active: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            builder_delay_ms: DEFAULT_BUILDER_DELAY_MS,
            busy_slowdown_factor: DEFAULT_BUSY_SLOWDOWN_FACTOR,
            start_active: true,
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// `Config` on malformed TOML, unknown keys or a zero slowdown factor.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(source).map_err(|e| SessionError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `Config` if the file can't be read or doesn't parse.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| SessionError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<()> {
        if self.busy_slowdown_factor == 0 {
            return Err(SessionError::Config {
                message: "busy_slowdown_factor must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn builder_delay(&self) -> Duration {
        Duration::from_millis(self.builder_delay_ms)
    }

    /// Longest a build may be postponed while the loop stays busy
    pub fn forced_build_delay(&self) -> Duration {
        self.builder_delay() * self.busy_slowdown_factor
    }
}

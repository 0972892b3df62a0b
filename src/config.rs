//! Library configuration.
//!
//! ```toml
//! [marshal]
//! narrowing = "wrap"      # or "checked" (default)
//!
//! [memory_stack]
//! size = 1048576          # bytes, default 4 MiB
//! alignment = 16          # default 8
//!
//! # Lay out structs for another target instead of the host.
//! [platform]
//! pointer_width = 8       # bytes
//! long_width = 4          # bytes
//! ```
//!
//! Every section is optional. Loading from TOML needs the `config` feature;
//! without it [`FfiConfig`] is still available through `Default` and the
//! builder methods.

#[cfg(feature = "config")]
use std::path::Path;

use crate::call::Narrowing;
use crate::memory::{MemoryError, MemoryStack};
use crate::platform::Platform;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize), serde(default))]
pub struct FfiConfig {
    pub marshal: MarshalConfig,
    pub memory_stack: MemoryStackConfig,
    /// Target platform override; the host when absent.
    pub platform: Option<PlatformConfig>,
}

/// Managed/native conversion settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize), serde(default))]
pub struct MarshalConfig {
    pub narrowing: Narrowing,
}

/// Scratch stack settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize), serde(default))]
pub struct MemoryStackConfig {
    pub size: usize,
    pub alignment: usize,
}

impl Default for MemoryStackConfig {
    fn default() -> Self {
        Self {
            size: MemoryStack::DEFAULT_SIZE,
            alignment: MemoryStack::ALIGNMENT,
        }
    }
}

/// Pointer and `long` widths in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
pub struct PlatformConfig {
    pub pointer_width: usize,
    pub long_width: usize,
}

impl FfiConfig {
    /// Load configuration from a TOML file.
    #[cfg(feature = "config")]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[cfg(feature = "config")]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.platform()?;
        Ok(config)
    }

    pub fn with_narrowing(mut self, narrowing: Narrowing) -> Self {
        self.marshal.narrowing = narrowing;
        self
    }

    pub fn with_memory_stack(mut self, size: usize, alignment: usize) -> Self {
        self.memory_stack = MemoryStackConfig { size, alignment };
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(PlatformConfig {
            pointer_width: platform.pointer_width().bytes(),
            long_width: platform.long_width().bytes(),
        });
        self
    }

    /// The platform layouts and descriptors are computed for.
    pub fn platform(&self) -> Result<Platform, ConfigError> {
        match self.platform {
            None => Ok(Platform::host()),
            Some(PlatformConfig {
                pointer_width,
                long_width,
            }) => Platform::from_bytes(pointer_width, long_width).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unsupported platform: pointer width {} and long width {} (each must be 4 or 8, long no wider than a pointer)",
                    pointer_width, long_width
                ))
            }),
        }
    }

    /// Create a scratch stack with the configured size and alignment.
    pub fn memory_stack(&self) -> Result<MemoryStack, MemoryError> {
        MemoryStack::with_alignment(self.memory_stack.size, self.memory_stack.alignment)
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(String, std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Parse(toml::de::Error),
    /// Well-formed but unusable value.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Failed to read config file '{}': {}", path, e),
            #[cfg(feature = "config")]
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(message) => write!(f, "Invalid config: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FfiConfig::default();
        assert_eq!(config.marshal.narrowing, Narrowing::Checked);
        assert_eq!(config.memory_stack.size, 4 * 1024 * 1024);
        assert_eq!(config.memory_stack.alignment, 8);
        assert_eq!(config.platform().unwrap(), Platform::host());
    }

    #[test]
    fn test_builder() {
        let config = FfiConfig::default()
            .with_narrowing(Narrowing::Wrap)
            .with_memory_stack(256, 16)
            .with_platform(Platform::LLP64);
        assert_eq!(config.platform().unwrap(), Platform::LLP64);
        let stack = config.memory_stack().unwrap();
        assert_eq!(stack.size(), 256);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_parse_config() {
        let toml = r#"
[marshal]
narrowing = "wrap"

[memory_stack]
size = 1024

[platform]
pointer_width = 4
long_width = 4
"#;
        let config = FfiConfig::from_str(toml).unwrap();
        assert_eq!(config.marshal.narrowing, Narrowing::Wrap);
        assert_eq!(config.memory_stack.size, 1024);
        assert_eq!(config.memory_stack.alignment, 8);
        assert_eq!(config.platform().unwrap(), Platform::ILP32);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_empty_config() {
        assert_eq!(FfiConfig::from_str("").unwrap(), FfiConfig::default());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_invalid_config() {
        let err = FfiConfig::from_str("[marshal]\nnarrowing = \"saturate\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = FfiConfig::from_str("[platform]\npointer_width = 2\nlong_width = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = FfiConfig::from_str("[platform]\npointer_width = 4\nlong_width = 8").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}

//! Configuration loading and resolution
//!
//! Settings resolve with a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TOML configuration file contents
///
/// All fields are optional; absent fields fall through to environment
/// variables and compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Listen address for the kiosk HTTP API (e.g. "127.0.0.1:5180")
    pub bind_addr: Option<String>,
    /// Base URL of the realtime store (absent = in-memory store)
    pub store_url: Option<String>,
    /// Base URL of the face-verification service
    pub face_service_url: Option<String>,
    /// Duration of the commit feedback indication, milliseconds
    pub feedback_pulse_ms: Option<u64>,
    /// Verification timeout overrides
    pub timeouts: Option<TimeoutsToml>,
}

/// Timeout overrides from the TOML file, milliseconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutsToml {
    /// Availability probe bound
    pub probe_ms: Option<u64>,
    /// Verification call bound
    pub verify_ms: Option<u64>,
    /// Registration call bound
    pub register_ms: Option<u64>,
}

/// Get the default configuration file path for the platform
///
/// Linux: `~/.config/rollcall/kiosk.toml`, then `/etc/rollcall/kiosk.toml`.
/// macOS/Windows: the user config directory equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("rollcall").join("kiosk.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/rollcall/kiosk.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load the TOML configuration
///
/// An explicitly given path must exist and parse; a discovered default path
/// is used when present; otherwise an empty configuration is returned and
/// every setting falls through to environment variables and defaults.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(p) => {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    tracing::info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Resolve a single string setting by priority order
///
/// CLI argument, then environment variable, then TOML value; `None` when no
/// tier provides a value (caller applies its compiled default).
pub fn resolve_value(
    cli_arg: Option<String>,
    env_var_name: &str,
    toml_value: Option<String>,
) -> Option<String> {
    if let Some(value) = cli_arg {
        return Some(value);
    }
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    toml_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            bind_addr = "0.0.0.0:5180"
            store_url = "https://demo-rtdb.example.com"
            face_service_url = "http://localhost:5001"
            feedback_pulse_ms = 1500

            [timeouts]
            probe_ms = 2000
            verify_ms = 20000
            register_ms = 30000
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bind_addr.as_deref(), Some("0.0.0.0:5180"));
        assert_eq!(
            config.store_url.as_deref(),
            Some("https://demo-rtdb.example.com")
        );
        assert_eq!(config.feedback_pulse_ms, Some(1500));
        let timeouts = config.timeouts.unwrap();
        assert_eq!(timeouts.probe_ms, Some(2000));
        assert_eq!(timeouts.verify_ms, Some(20000));
        assert_eq!(timeouts.register_ms, Some(30000));
    }

    #[test]
    fn test_empty_config_parses_to_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert!(config.bind_addr.is_none());
        assert!(config.store_url.is_none());
        assert!(config.timeouts.is_none());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"127.0.0.1:9999\"").unwrap();

        let config = load_toml_config(Some(file.path())).unwrap();
        assert_eq!(config.bind_addr.as_deref(), Some("127.0.0.1:9999"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = load_toml_config(Some(Path::new("/nonexistent/kiosk.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_value_priority() {
        // CLI wins over everything
        let resolved = resolve_value(
            Some("from-cli".to_string()),
            "ROLLCALL_TEST_UNSET_VAR",
            Some("from-toml".to_string()),
        );
        assert_eq!(resolved.as_deref(), Some("from-cli"));

        // TOML applies when CLI and env are absent
        let resolved = resolve_value(
            None,
            "ROLLCALL_TEST_UNSET_VAR",
            Some("from-toml".to_string()),
        );
        assert_eq!(resolved.as_deref(), Some("from-toml"));

        // Nothing set -> None
        let resolved = resolve_value(None, "ROLLCALL_TEST_UNSET_VAR", None);
        assert!(resolved.is_none());
    }
}

//! Compiler configuration
//!
//! A plain builder-style struct with a TOML form loadable from a file,
//! surfaced on the CLI as `--config PATH`.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Emit numbered virtual registers `t<n>` instead of staging every
    /// intermediate through `rbx`. Produces readable listings that are not
    /// directly assemblable; off by default.
    pub use_virtual_registers: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_virtual_registers(mut self, enabled: bool) -> Self {
        self.use_virtual_registers = enabled;
        self
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("invalid config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_single_scratch() {
        assert!(!CompilerConfig::default().use_virtual_registers);
    }

    #[test]
    fn test_from_toml() {
        let config = CompilerConfig::from_toml("use_virtual_registers = true").unwrap();
        assert!(config.use_virtual_registers);

        let config = CompilerConfig::from_toml("").unwrap();
        assert!(!config.use_virtual_registers);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = CompilerConfig::from_toml("optimize = 3").unwrap_err();
        assert!(err.contains("invalid config"), "{}", err);
    }

    #[test]
    fn test_from_toml_file_round_trip() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "use_virtual_registers = true").unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let config = CompilerConfig::from_toml(&text).unwrap();
        assert!(config.use_virtual_registers);
    }
}

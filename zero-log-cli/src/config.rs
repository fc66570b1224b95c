//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use zero_log_decoder::{DecoderConfig, OutputFormat};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// Primary log to decode; only the first entry is used
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Secondary logs merged into the primary one, by source key
    #[serde(default)]
    pub secondary: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub omit_units: bool,
    /// Output file (`-` for stdout); defaults to the input path with the format's extension
    pub output: Option<PathBuf>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .decoder
        .validate()
        .with_context(|| format!("Invalid [decoder] section in {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            files = ["538SD9Z37GCG06073_MBB_2018-05-21.txt"]

            [input.secondary]
            bms0 = "538SD9Z37GCG06073_BMS0_2018-05-21.txt"

            [output]
            format = "tsv"
            omit_units = true

            [decoder]
            timestamp_formats = ["%m/%d/%Y %H:%M:%S"]
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.files.len(), 1);
        assert_eq!(
            config.input.secondary.get("bms0"),
            Some(&PathBuf::from("538SD9Z37GCG06073_BMS0_2018-05-21.txt"))
        );
        assert_eq!(config.output.format, OutputFormat::Tsv);
        assert!(config.output.omit_units);
        assert_eq!(config.output.output, None);
        assert_eq!(config.decoder.timestamp_formats.len(), 1);
        assert!(config.decoder.use_header_columns);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.input.files.is_empty());
        assert_eq!(config.output.format, OutputFormat::Tsv);
        assert_eq!(config.decoder.min_line_length, 6);
    }

    #[test]
    fn test_load_config_rejects_invalid_decoder() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[decoder]\ntimestamp_formats = []").unwrap();
        assert!(load_config(file.path()).is_err());
        assert!(load_config(Path::new("missing/config.toml")).is_err());
    }
}

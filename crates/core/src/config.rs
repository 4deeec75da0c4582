use std::path::Path;

use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `ADLIFT__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Row filters applied to the transaction log.
#[derive(Debug, Clone, Deserialize)]
pub struct CleaningConfig {
    /// A channel equal to this, or starting with `<prefix>.`, is Amazon.
    #[serde(default = "default_amazon_channel_prefix")]
    pub amazon_channel_prefix: String,
    /// Order statuses to keep, case-insensitive. Empty keeps every status;
    /// a table without a status column is never filtered.
    #[serde(default = "default_accepted_order_statuses")]
    pub accepted_order_statuses: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_undefined_label")]
    pub undefined_label: String,
    #[serde(default = "default_precision")]
    pub precision: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_amazon_channel_prefix() -> String {
    "amazon".to_string()
}
fn default_accepted_order_statuses() -> Vec<String> {
    vec!["Shipped".to_string()]
}
fn default_undefined_label() -> String {
    "N/A".to_string()
}
fn default_precision() -> usize {
    2
}
fn default_delimiter() -> char {
    ','
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            amazon_channel_prefix: default_amazon_channel_prefix(),
            accepted_order_statuses: default_accepted_order_statuses(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            undefined_label: default_undefined_label(),
            precision: default_precision(),
            delimiter: default_delimiter(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("adlift").required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("ADLIFT")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cleaning.accepted_order_statuses"),
            )
            .build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cleaning.amazon_channel_prefix, "amazon");
        assert_eq!(config.cleaning.accepted_order_statuses, vec!["Shipped"]);
        assert_eq!(config.export.undefined_label, "N/A");
        assert_eq!(config.export.precision, 2);
        assert_eq!(config.export.delimiter, ',');
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[cleaning]\naccepted_order_statuses = [\"Shipped\", \"Pending\"]\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.cleaning.accepted_order_statuses, vec!["Shipped", "Pending"]);
        assert_eq!(config.cleaning.amazon_channel_prefix, "amazon");
        assert_eq!(config.export.precision, 2);
    }
}

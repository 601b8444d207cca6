//! Set configuration types.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::template::{RecordTemplate, DEFAULT_RECORD};
use crate::{Error, Result};

/// First allocation when no earlier generation left a growth seed.
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

/// Configuration for an IPv4 set.
///
/// Can be loaded from YAML; every field is optional:
///
/// ```yaml
/// name: spamhaus-drop
/// initial_capacity: 4096
/// max_capacity: 16777216
/// default_record: "127.0.0.2:Listed, see https://example.org/?$"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SetConfig {
    /// Name used in log messages
    pub name: String,
    /// Buffer size for a cold first load
    pub initial_capacity: usize,
    /// Ceiling on the key buffer; growing past it fails the load
    pub max_capacity: Option<usize>,
    /// Template for sets without a directive line
    #[serde(deserialize_with = "deserialize_record")]
    pub default_record: Arc<RecordTemplate>,
}

impl SetConfig {
    /// Create a config with the given name and default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the buffer size for a cold first load.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the ceiling on the key buffer.
    pub fn with_max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Set the fallback answer template.
    pub fn with_default_record(mut self, record: RecordTemplate) -> Self {
        self.default_record = Arc::new(record);
        self
    }

    /// Parse a config from YAML text.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(Error::Config("initial_capacity must be positive".to_string()));
        }
        if self.max_capacity == Some(0) {
            return Err(Error::Config("max_capacity must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            name: "ip4set".to_string(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: None,
            default_record: DEFAULT_RECORD.clone(),
        }
    }
}

fn deserialize_record<'de, D>(
    deserializer: D,
) -> std::result::Result<Arc<RecordTemplate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    RecordTemplate::deserialize(deserializer).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_defaults() {
        let config = SetConfig::default();
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.max_capacity, None);
        assert_eq!(*config.default_record, RecordTemplate::default());
    }

    #[test]
    fn test_from_yaml() {
        let config = SetConfig::from_yaml_str(
            "name: drop\nmax_capacity: 1024\ndefault_record: \"127.0.0.3:Dropped $\"\n",
        )
        .unwrap();
        assert_eq!(config.name, "drop");
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.max_capacity, Some(1024));
        assert_eq!(config.default_record.a(), Ipv4Addr::new(127, 0, 0, 3));
    }

    #[test]
    fn test_from_yaml_rejects() {
        assert!(SetConfig::from_yaml_str("initial_capacity: 0").is_err());
        assert!(SetConfig::from_yaml_str("default_record: \"1.2.3.4\"").is_err());
    }

    #[test]
    fn test_builder_setters() {
        let config = SetConfig::new("bl")
            .with_initial_capacity(8)
            .with_max_capacity(32)
            .with_default_record(RecordTemplate::parse(":5").unwrap());
        assert_eq!(config.name, "bl");
        assert_eq!(config.initial_capacity, 8);
        assert_eq!(config.max_capacity, Some(32));
        assert_eq!(config.default_record.a(), Ipv4Addr::new(127, 0, 0, 5));
    }
}

//! Configuration system for graphson imports.

use serde::{Deserialize, Serialize};

use crate::error::{GraphsonError, GraphsonResult};

/// Default number of records materialized between commits.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Policy for edge endpoints that are not materialized yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingVertexPolicy {
    /// Fail the import with `VertexNotFound`.
    #[default]
    Fail,
    /// Create a bare vertex carrying only the referenced id.
    CreateOnReference,
}

impl std::str::FromStr for MissingVertexPolicy {
    type Err = GraphsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "create_on_reference" | "create" => Ok(Self::CreateOnReference),
            other => Err(GraphsonError::Configuration(format!(
                "unknown missing vertex policy '{}'",
                other
            ))),
        }
    }
}

/// Main import configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Records materialized between commits on transactional stores.
    pub buffer_size: usize,
    /// What to do when an edge references a vertex that does not exist.
    pub missing_vertex_policy: MissingVertexPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            missing_vertex_policy: MissingVertexPolicy::Fail,
        }
    }
}

impl ImportConfig {
    /// Configuration with the given buffer size and defaults otherwise.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            ..Default::default()
        }
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> GraphsonResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| GraphsonError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GraphsonError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| GraphsonError::Configuration(e.to_string()))?,
            _ => {
                return Err(GraphsonError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(size) = std::env::var("GRAPHSON_BUFFER_SIZE") {
            match size.parse::<usize>() {
                Ok(size) if size > 0 => config.buffer_size = size,
                _ => tracing::warn!(value = %size, "ignoring invalid GRAPHSON_BUFFER_SIZE"),
            }
        }
        if let Ok(policy) = std::env::var("GRAPHSON_MISSING_VERTEX_POLICY") {
            match policy.parse() {
                Ok(policy) => config.missing_vertex_policy = policy,
                Err(e) => tracing::warn!(error = %e, "ignoring GRAPHSON_MISSING_VERTEX_POLICY"),
            }
        }

        config
    }

    /// Check the configuration for values the importer can not run with.
    pub fn validate(&self) -> GraphsonResult<()> {
        if self.buffer_size == 0 {
            return Err(GraphsonError::Configuration(
                "buffer_size must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> ImportConfigBuilder {
        ImportConfigBuilder::default()
    }
}

/// Builder for ImportConfig.
#[derive(Default)]
pub struct ImportConfigBuilder {
    config: ImportConfig,
}

impl ImportConfigBuilder {
    /// Set the commit buffer size.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    /// Set the missing vertex policy.
    pub fn missing_vertex_policy(mut self, policy: MissingVertexPolicy) -> Self {
        self.config.missing_vertex_policy = policy;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> GraphsonResult<ImportConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.buffer_size, 1000);
        assert_eq!(config.missing_vertex_policy, MissingVertexPolicy::Fail);
    }

    #[test]
    fn test_builder_rejects_zero_buffer() {
        let err = ImportConfig::builder().buffer_size(0).build().unwrap_err();
        assert!(matches!(err, GraphsonError::Configuration(_)));

        let config = ImportConfig::builder()
            .buffer_size(10)
            .missing_vertex_policy(MissingVertexPolicy::CreateOnReference)
            .build()
            .unwrap();
        assert_eq!(config.buffer_size, 10);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "buffer_size = 250").unwrap();
        writeln!(file, "missing_vertex_policy = \"create_on_reference\"").unwrap();

        let config = ImportConfig::from_file(file.path()).unwrap();
        assert_eq!(config.buffer_size, 250);
        assert_eq!(
            config.missing_vertex_policy,
            MissingVertexPolicy::CreateOnReference
        );
    }

    #[test]
    fn test_from_yaml_and_json_files() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "buffer_size: 5").unwrap();
        assert_eq!(ImportConfig::from_file(yaml.path()).unwrap().buffer_size, 5);

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(json, r#"{{"buffer_size": 7}}"#).unwrap();
        let config = ImportConfig::from_file(json.path()).unwrap();
        assert_eq!(config.buffer_size, 7);
        assert_eq!(config.missing_vertex_policy, MissingVertexPolicy::Fail);
    }

    #[test]
    fn test_from_file_validates() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "buffer_size = 0").unwrap();
        assert!(ImportConfig::from_file(file.path()).is_err());

        let other = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(ImportConfig::from_file(other.path()).is_err());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "FAIL".parse::<MissingVertexPolicy>().unwrap(),
            MissingVertexPolicy::Fail
        );
        assert_eq!(
            "create_on_reference".parse::<MissingVertexPolicy>().unwrap(),
            MissingVertexPolicy::CreateOnReference
        );
        assert!("lazy".parse::<MissingVertexPolicy>().is_err());
    }
}

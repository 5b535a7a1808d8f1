use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::upload::{FieldRule, IntakeLimits, SizeLimit};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub uploads: UploadConfig,
    /// Upload policy per form field name.
    pub fields: BTreeMap<String, FieldRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Host-level ceilings, enforced while the request body is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Parent directory for the staging area; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
    /// Host temp root that `/api/uploads/check` accepts `tmp_name` paths
    /// from. Must not contain the staging directory. When unset, checked
    /// tables never count as received.
    pub check_temp_dir: Option<PathBuf>,
    pub upload_max_filesize: String,
    pub post_max_size: String,
    pub max_file_uploads: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            "file".to_string(),
            FieldRule {
                required: false,
                allowed_extensions: ["jpg", "jpeg", "png", "gif", "pdf"]
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect(),
                max_size: Some("2M".to_string()),
            },
        );

        Self {
            server: ServerConfig::default(),
            uploads: UploadConfig::default(),
            fields,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            check_temp_dir: None,
            upload_max_filesize: "2M".to_string(),
            post_max_size: "8M".to_string(),
            max_file_uploads: 20,
        }
    }
}

impl UploadConfig {
    pub fn upload_max_filesize(&self) -> Result<SizeLimit, ConfigError> {
        parse_size("uploads.upload_max_filesize", &self.upload_max_filesize)
    }

    pub fn post_max_size(&self) -> Result<SizeLimit, ConfigError> {
        parse_size("uploads.post_max_size", &self.post_max_size)
    }

    pub fn intake_limits(&self) -> Result<IntakeLimits, ConfigError> {
        Ok(IntakeLimits {
            max_file_size: self.upload_max_filesize()?,
            max_file_uploads: self.max_file_uploads,
        })
    }
}

fn parse_size(key: &str, spec: &str) -> Result<SizeLimit, ConfigError> {
    spec.parse()
        .map_err(|e| ConfigError::Message(format!("Invalid {}: {}", key, e)))
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        let max_file = self.uploads.upload_max_filesize()?;
        let max_post = self.uploads.post_max_size()?;

        if max_post < max_file {
            return Err(ConfigError::Message(format!(
                "post_max_size ({}) must not be smaller than upload_max_filesize ({})",
                max_post, max_file
            )));
        }

        if self.uploads.max_file_uploads == 0 {
            return Err(ConfigError::Message(
                "Max file uploads must be greater than 0".to_string(),
            ));
        }

        for (field, rule) in &self.fields {
            if let Some(max_size) = &rule.max_size {
                parse_size(&format!("fields.{}.max_size", field), max_size)?;
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

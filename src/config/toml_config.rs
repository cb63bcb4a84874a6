use crate::config::{
    DatabaseSettings, DestinationScheme, DestinationSettings, ExportConfig, StorageSettings,
    DEFAULT_DB_ALIAS, DEFAULT_SECRET_NAME, DEFAULT_STORE_PATH,
};
use crate::domain::model::{Compression, OutputFormat, RemoteKind, TableRef, UrlStyle};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Raw settings as read from a TOML file and/or the command line.
///
/// Every field is optional here; [`TomlConfig::into_export_config`] checks
/// that the required ones are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub store: StoreSection,
    pub storage: StorageSection,
    pub database: DatabaseSection,
    pub source: SourceSection,
    pub destination: DestinationSection,
    pub transfer: TransferSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: Option<String>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub url_style: Option<UrlStyle>,
    pub secret_name: Option<String>,
    /// Cloudflare account, required for `r2` destinations.
    pub account_id: Option<String>,
}

impl fmt::Debug for StorageSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSection")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "***"),
            )
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("url_style", &self.url_style)
            .field("secret_name", &self.secret_name)
            .field("account_id", &self.account_id)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub kind: Option<RemoteKind>,
    pub connection_string: Option<String>,
    pub alias: Option<String>,
}

impl fmt::Debug for DatabaseSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSection")
            .field("kind", &self.kind)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "***"),
            )
            .field("alias", &self.alias)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub schema: Option<String>,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationSection {
    pub scheme: Option<DestinationScheme>,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSection {
    pub format: Option<OutputFormat>,
    pub compression: Option<Compression>,
    pub row_group_size: Option<usize>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AWS_ACCESS_KEY_ID})
    ///
    /// Unset variables become empty strings so a missing credential is
    /// reported as a missing field instead of being sent to the engine.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                tracing::debug!("Environment variable {} is not set", var_name);
                String::new()
            })
        });

        Ok(result.to_string())
    }

    /// Checks every field and produces the settings the pipeline runs with.
    pub fn into_export_config(self) -> Result<ExportConfig> {
        self.validate()?;

        let storage = StorageSettings {
            access_key_id: validation::require_non_empty(
                "storage.access_key_id",
                &self.storage.access_key_id,
            )?,
            secret_access_key: validation::require_non_empty(
                "storage.secret_access_key",
                &self.storage.secret_access_key,
            )?,
            region: validation::require_non_empty("storage.region", &self.storage.region)?,
            endpoint: non_blank(self.storage.endpoint),
            url_style: self.storage.url_style,
            secret_name: non_blank(self.storage.secret_name)
                .unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string()),
            account_id: non_blank(self.storage.account_id),
        };

        let database = DatabaseSettings {
            kind: self.database.kind.unwrap_or_default(),
            connection_string: validation::require_non_empty(
                "database.connection_string",
                &self.database.connection_string,
            )?,
            alias: non_blank(self.database.alias).unwrap_or_else(|| DEFAULT_DB_ALIAS.to_string()),
        };

        let table = validation::require_non_empty("source.table", &self.source.table)?;
        let source = match non_blank(self.source.schema) {
            Some(schema) => TableRef::with_schema(schema, table),
            None => TableRef::new(table),
        };

        let destination = DestinationSettings {
            scheme: self.destination.scheme.unwrap_or_default(),
            bucket: validation::require_non_empty("destination.bucket", &self.destination.bucket)?,
            prefix: self.destination.prefix.unwrap_or_default(),
        };

        Ok(ExportConfig {
            store_path: PathBuf::from(
                non_blank(self.store.path).unwrap_or_else(|| DEFAULT_STORE_PATH.to_string()),
            ),
            storage,
            database,
            source,
            destination,
            format: self.transfer.format.unwrap_or_default(),
            compression: self.transfer.compression.unwrap_or_default(),
            row_group_size: self.transfer.row_group_size,
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        // Credentials first: nothing else matters if the run cannot authenticate.
        let region = validation::require_non_empty("storage.region", &self.storage.region)?;
        validation::require_non_empty("storage.access_key_id", &self.storage.access_key_id)?;
        validation::require_non_empty(
            "storage.secret_access_key",
            &self.storage.secret_access_key,
        )?;
        validation::validate_region("storage.region", &region)?;

        if let Some(endpoint) = self.storage.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            validation::validate_endpoint("storage.endpoint", endpoint)?;
        }
        if let Some(name) = &self.storage.secret_name {
            validate_simple_name("storage.secret_name", name)?;
        }

        validation::require_non_empty(
            "database.connection_string",
            &self.database.connection_string,
        )?;
        if let Some(alias) = &self.database.alias {
            validate_simple_name("database.alias", alias)?;
        }

        validation::require_non_empty("source.table", &self.source.table)?;

        let scheme = self.destination.scheme.unwrap_or_default();
        if scheme == DestinationScheme::R2 {
            let account_id =
                validation::require_non_empty("storage.account_id", &self.storage.account_id)?;
            validate_simple_name("storage.account_id", &account_id)?;
        }

        let bucket = validation::require_non_empty("destination.bucket", &self.destination.bucket)?;
        match scheme {
            DestinationScheme::S3 | DestinationScheme::R2 => {
                validation::validate_bucket_name("destination.bucket", &bucket)?
            }
            DestinationScheme::Gcs => {
                if bucket.contains('/') {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "destination.bucket".to_string(),
                        value: bucket,
                        reason: "Bucket name cannot contain '/'; use destination.prefix"
                            .to_string(),
                    });
                }
            }
            DestinationScheme::File => validation::validate_path("destination.bucket", &bucket)?,
        }

        if let Some(path) = &self.store.path {
            validation::validate_path("store.path", path)?;
        }

        let format = self.transfer.format.unwrap_or_default();
        let compression = self.transfer.compression.unwrap_or_default();
        if !format.supports(compression) {
            return Err(EtlError::InvalidConfigValueError {
                field: "transfer.compression".to_string(),
                value: format!("{:?}", compression).to_lowercase(),
                reason: format!("Not supported for {} output", format.extension()),
            });
        }
        if let Some(size) = self.transfer.row_group_size {
            validation::validate_positive_number("transfer.row_group_size", size, 1)?;
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Secret names and aliases: letters, digits and underscores.
fn validate_simple_name(field_name: &str, value: &str) -> Result<()> {
    validation::validate_non_empty_string(field_name, value)?;
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Only letters, digits and underscores are allowed".to_string(),
        });
    }
    Ok(())
}

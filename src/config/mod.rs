#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::{
    Attachment, Compression, OutputFormat, RemoteKind, SecretRecord, StorageProvider, TableRef,
    TransferDescriptor, UrlStyle,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_STORE_PATH: &str = "table_export.duckdb";
pub const DEFAULT_SECRET_NAME: &str = "table_export_s3";
pub const DEFAULT_DB_ALIAS: &str = "remote_db";

/// URL scheme of the export destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DestinationScheme {
    #[default]
    S3,
    #[serde(alias = "gs")]
    #[cfg_attr(feature = "cli", value(alias = "gs"))]
    Gcs,
    R2,
    /// Local directory; the bucket is the directory path.
    File,
}

impl DestinationScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            DestinationScheme::S3 => "s3",
            DestinationScheme::Gcs => "gcs",
            DestinationScheme::R2 => "r2",
            DestinationScheme::File => "file",
        }
    }

    /// Secret provider whose scope covers this scheme's URLs.
    pub fn storage_provider(self) -> StorageProvider {
        match self {
            DestinationScheme::S3 | DestinationScheme::File => StorageProvider::S3,
            DestinationScheme::Gcs => StorageProvider::Gcs,
            DestinationScheme::R2 => StorageProvider::R2,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub url_style: Option<UrlStyle>,
    pub secret_name: String,
    pub account_id: Option<String>,
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("url_style", &self.url_style)
            .field("secret_name", &self.secret_name)
            .field("account_id", &self.account_id)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub kind: RemoteKind,
    pub connection_string: String,
    pub alias: String,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("kind", &self.kind)
            .field("connection_string", &"***")
            .field("alias", &self.alias)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSettings {
    pub scheme: DestinationScheme,
    pub bucket: String,
    pub prefix: String,
}

/// Fully validated settings for one export run.
///
/// Built once at the process boundary (see [`toml_config::TomlConfig::into_export_config`])
/// and passed by reference into the pipeline; nothing downstream reads the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub store_path: PathBuf,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    pub source: TableRef,
    pub destination: DestinationSettings,
    pub format: OutputFormat,
    pub compression: Compression,
    pub row_group_size: Option<usize>,
}

impl ExportConfig {
    /// `<scheme>://<bucket>/<prefix>/<table>.<ext>`, or a plain path for local directories.
    pub fn destination_path(&self) -> String {
        let prefix = self.destination.prefix.trim_matches('/');
        let filename = format!("{}.{}", self.source.name, self.format.extension());

        let mut segments = Vec::with_capacity(3);
        match self.destination.scheme {
            DestinationScheme::File => {
                segments.push(self.destination.bucket.trim_end_matches('/').to_string())
            }
            scheme => segments.push(format!(
                "{}://{}",
                scheme.as_str(),
                self.destination.bucket.trim_matches('/')
            )),
        }
        if !prefix.is_empty() {
            segments.push(prefix.to_string());
        }
        segments.push(filename);
        segments.join("/")
    }

    pub fn secret_record(&self) -> SecretRecord {
        let (endpoint, use_ssl) = match self.storage.endpoint.as_deref() {
            Some(endpoint) => split_endpoint(endpoint),
            None => (None, None),
        };

        let provider = self.destination.scheme.storage_provider();

        SecretRecord {
            name: self.storage.secret_name.clone(),
            provider,
            access_key_id: self.storage.access_key_id.clone(),
            secret_access_key: self.storage.secret_access_key.clone(),
            region: self.storage.region.clone(),
            endpoint,
            url_style: self.storage.url_style,
            use_ssl,
            account_id: self
                .storage
                .account_id
                .clone()
                .filter(|_| provider == StorageProvider::R2),
        }
    }

    pub fn attachment(&self) -> Attachment {
        Attachment {
            alias: self.database.alias.clone(),
            kind: self.database.kind,
            connection_string: self.database.connection_string.clone(),
        }
    }

    pub fn transfer(&self) -> TransferDescriptor {
        TransferDescriptor::new(
            self.source.clone(),
            self.destination_path(),
            self.format,
            self.compression,
        )
        .with_row_group_size(self.row_group_size)
    }
}

/// DuckDB wants `host[:port]` plus a separate SSL flag.
fn split_endpoint(endpoint: &str) -> (Option<String>, Option<bool>) {
    if let Some(rest) = endpoint.strip_prefix("http://") {
        (Some(rest.trim_end_matches('/').to_string()), Some(false))
    } else if let Some(rest) = endpoint.strip_prefix("https://") {
        (Some(rest.trim_end_matches('/').to_string()), Some(true))
    } else {
        (Some(endpoint.trim_end_matches('/').to_string()), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> ExportConfig {
        ExportConfig {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            storage: StorageSettings {
                access_key_id: "AKIAEXAMPLE".to_string(),
                secret_access_key: "very-secret".to_string(),
                region: "us-east-2".to_string(),
                endpoint: None,
                url_style: None,
                secret_name: DEFAULT_SECRET_NAME.to_string(),
                account_id: None,
            },
            database: DatabaseSettings {
                kind: RemoteKind::Mysql,
                connection_string: "host=db user=etl password=pw database=shop".to_string(),
                alias: DEFAULT_DB_ALIAS.to_string(),
            },
            source: TableRef::new("CUSTOMER"),
            destination: DestinationSettings {
                scheme: DestinationScheme::S3,
                bucket: "my-bucket".to_string(),
                prefix: "/my_parquet_uploads/".to_string(),
            },
            format: OutputFormat::Parquet,
            compression: Compression::Snappy,
            row_group_size: None,
        }
    }

    #[test]
    fn test_destination_path() {
        let config = sample_config();
        assert_eq!(
            config.destination_path(),
            "s3://my-bucket/my_parquet_uploads/CUSTOMER.parquet"
        );
    }

    #[test]
    fn test_destination_path_without_prefix() {
        let mut config = sample_config();
        config.destination.prefix = String::new();
        config.format = OutputFormat::Csv;
        assert_eq!(config.destination_path(), "s3://my-bucket/CUSTOMER.csv");
    }

    #[test]
    fn test_destination_uses_unqualified_table_name() {
        let mut config = sample_config();
        config.source = TableRef::with_schema("shop", "orders");
        config.destination.scheme = DestinationScheme::Gcs;
        assert_eq!(
            config.destination_path(),
            "gcs://my-bucket/my_parquet_uploads/orders.parquet"
        );
    }

    #[test]
    fn test_local_destination_is_plain_path() {
        let mut config = sample_config();
        config.destination.scheme = DestinationScheme::File;
        config.destination.bucket = "/tmp/exports/".to_string();
        config.destination.prefix = "daily".to_string();
        assert_eq!(
            config.destination_path(),
            "/tmp/exports/daily/CUSTOMER.parquet"
        );
    }

    #[test]
    fn test_secret_record_splits_endpoint() {
        let mut config = sample_config();
        config.storage.endpoint = Some("http://localhost:9000/".to_string());
        let secret = config.secret_record();
        assert_eq!(secret.endpoint.as_deref(), Some("localhost:9000"));
        assert_eq!(secret.use_ssl, Some(false));
    }

    #[test]
    fn test_secret_provider_follows_scheme() {
        let mut config = sample_config();
        config.storage.account_id = Some("f1e2d3c4".to_string());

        let s3 = config.secret_record();
        assert_eq!(s3.provider, StorageProvider::S3);
        assert_eq!(s3.account_id, None);

        config.destination.scheme = DestinationScheme::Gcs;
        assert_eq!(config.secret_record().provider, StorageProvider::Gcs);

        config.destination.scheme = DestinationScheme::R2;
        let r2 = config.secret_record();
        assert_eq!(r2.provider, StorageProvider::R2);
        assert_eq!(r2.account_id.as_deref(), Some("f1e2d3c4"));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let rendered = format!("{:?}", sample_config());
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("password=pw"));
    }
}

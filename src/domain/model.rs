use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Kind of remote database the engine scans through an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum RemoteKind {
    #[default]
    Mysql,
    Postgres,
    Sqlite,
    Duckdb,
}

impl RemoteKind {
    /// Extension providing the scanner, if the engine does not ship it built in.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            RemoteKind::Mysql => Some("mysql"),
            RemoteKind::Postgres => Some("postgres"),
            RemoteKind::Sqlite => Some("sqlite"),
            RemoteKind::Duckdb => None,
        }
    }

    /// Value of the `TYPE` option in `ATTACH`.
    pub fn attach_type(self) -> &'static str {
        match self {
            RemoteKind::Mysql => "mysql_scanner",
            RemoteKind::Postgres => "postgres",
            RemoteKind::Sqlite => "sqlite",
            RemoteKind::Duckdb => "duckdb",
        }
    }
}

/// Optional engine feature that must be enabled before it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RemoteStorage,
    RemoteDatabase(RemoteKind),
}

impl Capability {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Capability::RemoteStorage => Some("httpfs"),
            Capability::RemoteDatabase(kind) => kind.extension(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.extension() {
            Some(name) => f.write_str(name),
            None => match self {
                Capability::RemoteStorage => f.write_str("remote-storage"),
                Capability::RemoteDatabase(kind) => write!(f, "{}-builtin", kind.attach_type()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    S3,
    Gcs,
    R2,
}

impl StorageProvider {
    /// Secret `TYPE`; each type is scoped to its own URL prefixes
    /// (`s3://`, `gcs://`/`gs://`, `r2://`).
    pub fn secret_type(self) -> &'static str {
        match self {
            StorageProvider::S3 => "S3",
            StorageProvider::Gcs => "GCS",
            StorageProvider::R2 => "R2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum UrlStyle {
    #[default]
    Vhost,
    Path,
}

impl UrlStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            UrlStyle::Vhost => "vhost",
            UrlStyle::Path => "path",
        }
    }
}

/// Named credential bundle for one storage provider.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub name: String,
    pub provider: StorageProvider,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub url_style: Option<UrlStyle>,
    pub use_ssl: Option<bool>,
    /// Cloudflare account, R2 only.
    pub account_id: Option<String>,
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("url_style", &self.url_style)
            .field("use_ssl", &self.use_ssl)
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Read-only binding of a remote database under a local alias.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub alias: String,
    pub kind: RemoteKind,
    pub connection_string: String,
}

impl fmt::Debug for Attachment {
    // connection strings usually embed a password
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("alias", &self.alias)
            .field("kind", &self.kind)
            .field("connection_string", &"***")
            .finish()
    }
}

/// Source table, optionally qualified by schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    pub fn supports(self, compression: Compression) -> bool {
        match self {
            OutputFormat::Parquet => true,
            OutputFormat::Csv | OutputFormat::Json => matches!(
                compression,
                Compression::Gzip | Compression::Zstd | Compression::Uncompressed
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Compression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    Lz4,
    Brotli,
    Uncompressed,
}

impl Compression {
    /// Codec name as the engine's COPY option expects it for `format`.
    pub fn codec_name(self, format: OutputFormat) -> &'static str {
        match (self, format) {
            (Compression::Uncompressed, OutputFormat::Parquet) => "uncompressed",
            (Compression::Uncompressed, _) => "none",
            (Compression::Snappy, _) => "snappy",
            (Compression::Zstd, _) => "zstd",
            (Compression::Gzip, _) => "gzip",
            (Compression::Lz4, _) => "lz4",
            (Compression::Brotli, _) => "brotli",
        }
    }
}

/// Source table, destination and encoding of one copy-export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    source: TableRef,
    destination: String,
    format: OutputFormat,
    compression: Compression,
    row_group_size: Option<usize>,
}

impl TransferDescriptor {
    pub fn new(
        source: TableRef,
        destination: impl Into<String>,
        format: OutputFormat,
        compression: Compression,
    ) -> Self {
        Self {
            source,
            destination: destination.into(),
            format,
            compression,
            row_group_size: None,
        }
    }

    pub fn with_row_group_size(mut self, row_group_size: Option<usize>) -> Self {
        // only meaningful for parquet
        self.row_group_size = row_group_size.filter(|_| self.format == OutputFormat::Parquet);
        self
    }

    pub fn source(&self) -> &TableRef {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The destination as a filesystem path, when it has no URL scheme.
    pub fn local_path(&self) -> Option<&Path> {
        if self.destination.contains("://") {
            None
        } else {
            Some(Path::new(&self.destination))
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn row_group_size(&self) -> Option<usize> {
        self.row_group_size
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub source_table: String,
    pub destination: String,
    /// `None` when the diagnostic count could not be read.
    pub row_count: Option<u64>,
    #[serde(serialize_with = "serialize_secs")]
    pub export_duration: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub states: Vec<String>,
}

fn serialize_secs<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_extensions() {
        assert_eq!(Capability::RemoteStorage.extension(), Some("httpfs"));
        assert_eq!(
            Capability::RemoteDatabase(RemoteKind::Mysql).extension(),
            Some("mysql")
        );
        assert_eq!(Capability::RemoteDatabase(RemoteKind::Duckdb).extension(), None);
        assert_eq!(RemoteKind::Mysql.attach_type(), "mysql_scanner");
    }

    #[test]
    fn test_format_compression_compatibility() {
        assert!(OutputFormat::Parquet.supports(Compression::Snappy));
        assert!(OutputFormat::Csv.supports(Compression::Gzip));
        assert!(!OutputFormat::Csv.supports(Compression::Snappy));
        assert!(!OutputFormat::Json.supports(Compression::Lz4));
        assert_eq!(Compression::Uncompressed.codec_name(OutputFormat::Csv), "none");
        assert_eq!(
            Compression::Uncompressed.codec_name(OutputFormat::Parquet),
            "uncompressed"
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SecretRecord {
            name: "export_s3".to_string(),
            provider: StorageProvider::S3,
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "very-secret".to_string(),
            region: "us-east-2".to_string(),
            endpoint: None,
            url_style: None,
            use_ssl: None,
            account_id: None,
        };
        let rendered = format!("{:?}", secret);
        assert!(rendered.contains("AKIAEXAMPLE"));
        assert!(!rendered.contains("very-secret"));
    }

    #[test]
    fn test_row_group_size_ignored_for_csv() {
        let transfer = TransferDescriptor::new(
            TableRef::new("CUSTOMER"),
            "s3://bucket/CUSTOMER.csv",
            OutputFormat::Csv,
            Compression::Gzip,
        )
        .with_row_group_size(Some(100_000));
        assert_eq!(transfer.row_group_size(), None);
    }

    #[test]
    fn test_local_path_only_without_scheme() {
        let remote = TransferDescriptor::new(
            TableRef::new("CUSTOMER"),
            "s3://bucket/daily/CUSTOMER.parquet",
            OutputFormat::Parquet,
            Compression::Snappy,
        );
        assert_eq!(remote.local_path(), None);

        let local = TransferDescriptor::new(
            TableRef::new("CUSTOMER"),
            "/data/exports/daily/CUSTOMER.parquet",
            OutputFormat::Parquet,
            Compression::Snappy,
        );
        assert_eq!(
            local.local_path().and_then(Path::parent),
            Some(Path::new("/data/exports/daily"))
        );
    }

    #[test]
    fn test_secret_types_per_provider() {
        assert_eq!(StorageProvider::S3.secret_type(), "S3");
        assert_eq!(StorageProvider::Gcs.secret_type(), "GCS");
        assert_eq!(StorageProvider::R2.secret_type(), "R2");
    }
}

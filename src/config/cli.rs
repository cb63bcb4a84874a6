use crate::config::toml_config::TomlConfig;
use crate::config::DestinationScheme;
use crate::domain::model::{Compression, OutputFormat, RemoteKind, UrlStyle};
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Command line of the `table-export` binary.
///
/// Flags override values from `--config`; credentials fall back to the usual
/// environment variables.
#[derive(Clone, Parser)]
#[command(name = "table-export")]
#[command(about = "Export one database table to object storage as a compressed columnar file")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Local engine store (created if absent)
    #[arg(long, env = "TABLE_EXPORT_STORE")]
    pub store_path: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// S3-compatible endpoint, e.g. http://localhost:9000
    #[arg(long, env = "S3_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, value_enum)]
    pub url_style: Option<UrlStyle>,

    #[arg(long)]
    pub secret_name: Option<String>,

    /// Cloudflare account, for r2 destinations
    #[arg(long, env = "R2_ACCOUNT_ID")]
    pub account_id: Option<String>,

    #[arg(long, value_enum)]
    pub db_kind: Option<RemoteKind>,

    /// Remote database connection string, passed to the engine verbatim
    #[arg(long, env = "DB_URL", hide_env_values = true)]
    pub db_url: Option<String>,

    #[arg(long)]
    pub db_alias: Option<String>,

    #[arg(long)]
    pub schema: Option<String>,

    #[arg(long, env = "SOURCE_TABLE")]
    pub table: Option<String>,

    #[arg(long, value_enum)]
    pub scheme: Option<DestinationScheme>,

    #[arg(long, env = "S3_BUCKET")]
    pub bucket: Option<String>,

    #[arg(long)]
    pub prefix: Option<String>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[arg(long, value_enum)]
    pub compression: Option<Compression>,

    #[arg(long)]
    pub row_group_size: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Check the destination object after a successful export
    #[arg(long)]
    pub verify: bool,

    /// Print the export result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Validate configuration and show the plan without touching the engine
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Loads `--config` (if any) and layers the command line on top of it.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn apply_to(&self, config: &mut TomlConfig) {
        fn set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut config.store.path, &self.store_path);
        set(&mut config.storage.access_key_id, &self.access_key_id);
        set(&mut config.storage.secret_access_key, &self.secret_access_key);
        set(&mut config.storage.region, &self.region);
        set(&mut config.storage.endpoint, &self.endpoint);
        set(&mut config.storage.url_style, &self.url_style);
        set(&mut config.storage.secret_name, &self.secret_name);
        set(&mut config.storage.account_id, &self.account_id);
        set(&mut config.database.kind, &self.db_kind);
        set(&mut config.database.connection_string, &self.db_url);
        set(&mut config.database.alias, &self.db_alias);
        set(&mut config.source.schema, &self.schema);
        set(&mut config.source.table, &self.table);
        set(&mut config.destination.scheme, &self.scheme);
        set(&mut config.destination.bucket, &self.bucket);
        set(&mut config.destination.prefix, &self.prefix);
        set(&mut config.transfer.format, &self.format);
        set(&mut config.transfer.compression, &self.compression);
        set(&mut config.transfer.row_group_size, &self.row_group_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["table-export"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_file_values() {
        let mut config = TomlConfig::from_toml_str(
            r#"
[source]
table = "CUSTOMER"

[transfer]
format = "csv"
compression = "gzip"
"#,
        )
        .unwrap();

        let args = parse(&["--table", "ORDERS", "--format", "parquet", "--compression", "zstd"]);
        args.apply_to(&mut config);

        assert_eq!(config.source.table.as_deref(), Some("ORDERS"));
        assert_eq!(config.transfer.format, Some(OutputFormat::Parquet));
        assert_eq!(config.transfer.compression, Some(Compression::Zstd));
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let mut config = TomlConfig::from_toml_str(
            r#"
[destination]
bucket = "my-bucket"
prefix = "exports"
"#,
        )
        .unwrap();

        let args = parse(&["--verbose"]);
        let bucket_before = config.destination.bucket.clone();
        args.apply_to(&mut config);

        assert_eq!(config.destination.prefix.as_deref(), Some("exports"));
        if args.bucket.is_none() {
            assert_eq!(config.destination.bucket, bucket_before);
        }
    }

    #[test]
    fn test_value_enums_parse() {
        let args = parse(&[
            "--db-kind",
            "postgres",
            "--scheme",
            "file",
            "--url-style",
            "path",
            "--log-format",
            "json",
        ]);
        assert_eq!(args.db_kind, Some(RemoteKind::Postgres));
        assert_eq!(args.scheme, Some(DestinationScheme::File));
        assert_eq!(args.url_style, Some(UrlStyle::Path));
        assert_eq!(args.log_format, LogFormat::Json);
    }
}

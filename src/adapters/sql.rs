//! Rendering of the engine statements the pipeline issues.
//!
//! DuckDB does not accept bind parameters in `CREATE SECRET`, `ATTACH` or
//! `COPY ... TO`, so values are embedded as properly quoted literals and
//! identifiers. Keywords and option names only ever come from enums.

use crate::domain::model::{Attachment, SecretRecord, TableRef, TransferDescriptor};

/// `"name"` with embedded double quotes doubled.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `'value'` with embedded single quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn qualified_table(table: &TableRef) -> String {
    match &table.schema {
        Some(schema) => format!(
            "{}.{}",
            quote_identifier(schema),
            quote_identifier(&table.name)
        ),
        None => quote_identifier(&table.name),
    }
}

pub fn install_extension(extension: &str) -> String {
    format!("INSTALL {}", quote_identifier(extension))
}

pub fn load_extension(extension: &str) -> String {
    format!("LOAD {}", quote_identifier(extension))
}

pub fn create_or_replace_secret(secret: &SecretRecord) -> String {
    let mut options = vec![
        format!("TYPE {}", secret.provider.secret_type()),
        format!("KEY_ID {}", quote_literal(&secret.access_key_id)),
        format!("SECRET {}", quote_literal(&secret.secret_access_key)),
        format!("REGION {}", quote_literal(&secret.region)),
    ];
    if let Some(endpoint) = &secret.endpoint {
        options.push(format!("ENDPOINT {}", quote_literal(endpoint)));
    }
    if let Some(url_style) = secret.url_style {
        options.push(format!("URL_STYLE {}", quote_literal(url_style.as_str())));
    }
    if let Some(use_ssl) = secret.use_ssl {
        options.push(format!("USE_SSL {}", use_ssl));
    }
    if let Some(account_id) = &secret.account_id {
        options.push(format!("ACCOUNT_ID {}", quote_literal(account_id)));
    }

    format!(
        "CREATE OR REPLACE SECRET {} ({})",
        quote_identifier(&secret.name),
        options.join(", ")
    )
}

pub fn attach_read_only(attachment: &Attachment) -> String {
    format!(
        "ATTACH {} AS {} (TYPE {}, READ_ONLY)",
        quote_literal(&attachment.connection_string),
        quote_identifier(&attachment.alias),
        attachment.kind.attach_type()
    )
}

pub fn use_database(alias: &str) -> String {
    format!("USE {}", quote_identifier(alias))
}

pub fn count_rows(table: &TableRef) -> String {
    format!("SELECT COUNT(*) FROM {}", qualified_table(table))
}

pub fn copy_to(transfer: &TransferDescriptor) -> String {
    let format = transfer.format();
    let mut options = vec![
        format!("FORMAT {}", quote_literal(format.extension())),
        format!(
            "COMPRESSION {}",
            quote_literal(transfer.compression().codec_name(format))
        ),
    ];
    if let Some(row_group_size) = transfer.row_group_size() {
        options.push(format!("ROW_GROUP_SIZE {}", row_group_size));
    }

    format!(
        "COPY (SELECT * FROM {}) TO {} ({})",
        qualified_table(transfer.source()),
        quote_literal(transfer.destination()),
        options.join(", ")
    )
}

/// Statement text safe for logs: the secret key is masked.
pub fn redacted_secret_statement(secret: &SecretRecord) -> String {
    let mut masked = secret.clone();
    masked.secret_access_key = "***".to_string();
    create_or_replace_secret(&masked)
}

use crate::adapters::sql;
use crate::domain::model::{Attachment, Capability, SecretRecord, TableRef, TransferDescriptor};
use crate::domain::ports::{Engine, EngineConnector};
use crate::utils::error::{EtlError, Result};
use duckdb::Connection;
use std::path::Path;

/// Engine session backed by a file-based DuckDB database.
pub struct DuckDbEngine {
    conn: Connection,
    store: String,
}

impl DuckDbEngine {
    pub fn open(store_path: &Path) -> Result<Self> {
        let store = store_path.display().to_string();

        if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| EtlError::ConnectionError {
                path: store.clone(),
                message: e.to_string(),
            })?;
        }

        let conn = Connection::open(store_path).map_err(|e| EtlError::ConnectionError {
            path: store.clone(),
            message: e.to_string(),
        })?;

        Ok(Self { conn, store })
    }

    pub fn store(&self) -> &str {
        &self.store
    }
}

impl Engine for DuckDbEngine {
    fn enable_capability(&mut self, capability: Capability) -> Result<()> {
        let Some(extension) = capability.extension() else {
            tracing::debug!("Capability {} is built in, nothing to load", capability);
            return Ok(());
        };

        for statement in [
            sql::install_extension(extension),
            sql::load_extension(extension),
        ] {
            tracing::debug!("Executing: {}", statement);
            self.conn
                .execute_batch(&statement)
                .map_err(|e| EtlError::CapabilityError {
                    capability: capability.to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn create_secret(&mut self, secret: &SecretRecord) -> Result<()> {
        tracing::debug!("Executing: {}", sql::redacted_secret_statement(secret));
        self.conn
            .execute_batch(&sql::create_or_replace_secret(secret))
            .map_err(|e| EtlError::CredentialError {
                secret: secret.name.clone(),
                message: e.to_string(),
            })
    }

    fn attach(&mut self, attachment: &Attachment) -> Result<()> {
        let to_attachment_error = |e: duckdb::Error| EtlError::AttachmentError {
            alias: attachment.alias.clone(),
            message: e.to_string(),
        };

        tracing::debug!(
            "Attaching {} database as {} (read-only)",
            attachment.kind.attach_type(),
            attachment.alias
        );
        self.conn
            .execute_batch(&sql::attach_read_only(attachment))
            .map_err(to_attachment_error)?;
        self.conn
            .execute_batch(&sql::use_database(&attachment.alias))
            .map_err(to_attachment_error)
    }

    fn count_rows(&mut self, table: &TableRef) -> Result<Option<u64>> {
        let statement = sql::count_rows(table);
        tracing::debug!("Executing: {}", statement);

        match self
            .conn
            .query_row(&statement, [], |row| row.get::<_, i64>(0))
        {
            Ok(count) => Ok(Some(count.max(0) as u64)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(EtlError::DiagnosticError {
                table: table.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn copy_to(&mut self, transfer: &TransferDescriptor) -> Result<()> {
        let to_export_error = |message: String| EtlError::ExportError {
            destination: transfer.destination().to_string(),
            message,
        };

        // COPY TO does not create missing directories.
        if let Some(parent) = transfer
            .local_path()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent).map_err(|e| to_export_error(e.to_string()))?;
        }

        let statement = sql::copy_to(transfer);
        tracing::debug!("Executing: {}", statement);

        self.conn
            .execute_batch(&statement)
            .map_err(|e| to_export_error(e.to_string()))
    }

    fn close(self) -> Result<()> {
        tracing::debug!("Closing DuckDB store {}", self.store);
        self.conn
            .close()
            .map_err(|(_conn, e)| EtlError::CloseError {
                message: format!("{}: {}", self.store, e),
            })
    }
}

/// Opens [`DuckDbEngine`] sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbConnector;

impl EngineConnector for DuckDbConnector {
    type Engine = DuckDbEngine;

    fn open(&self, store_path: &Path) -> Result<DuckDbEngine> {
        DuckDbEngine::open(store_path)
    }
}

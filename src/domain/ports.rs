use crate::domain::model::{Attachment, Capability, SecretRecord, TableRef, TransferDescriptor};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// One open session against the local analytical store.
///
/// Every call blocks until the engine finishes; implementations map their
/// native failures onto the matching [`crate::EtlError`] stage variant.
pub trait Engine {
    /// Install-if-absent then load-if-unloaded. Safe to call repeatedly.
    fn enable_capability(&mut self, capability: Capability) -> Result<()>;

    /// Create the secret, replacing any record with the same name.
    fn create_secret(&mut self, secret: &SecretRecord) -> Result<()>;

    /// Attach read-only under `attachment.alias` and make it the active database.
    fn attach(&mut self, attachment: &Attachment) -> Result<()>;

    /// `Ok(None)` when the query produced no row.
    fn count_rows(&mut self, table: &TableRef) -> Result<Option<u64>>;

    fn copy_to(&mut self, transfer: &TransferDescriptor) -> Result<()>;

    /// Flush and release the store.
    fn close(self) -> Result<()>;
}

/// Opens engine sessions on a local store path.
pub trait EngineConnector {
    type Engine: Engine;

    fn open(&self, store_path: &Path) -> Result<Self::Engine>;
}

/// Checks that an exported object exists at its destination.
#[async_trait]
pub trait ObjectVerifier: Send + Sync {
    /// Size of the object in bytes, when the backend reports one.
    async fn verify(&self, destination: &str) -> Result<Option<u64>>;
}

use crate::domain::ports::{Engine, EngineConnector};
use crate::utils::error::{EtlError, Result};
use std::path::Path;

/// Exclusive owner of an open engine.
///
/// The engine is closed exactly once: through [`EngineSession::release`] on
/// the normal path, or on drop when the session is abandoned by an early
/// return or a panic.
pub struct EngineSession<E: Engine> {
    engine: Option<E>,
    store: String,
}

impl<E: Engine> EngineSession<E> {
    pub fn open<C>(connector: &C, store_path: &Path) -> Result<Self>
    where
        C: EngineConnector<Engine = E>,
    {
        let engine = connector.open(store_path)?;
        Ok(Self {
            engine: Some(engine),
            store: store_path.display().to_string(),
        })
    }

    pub fn engine(&mut self) -> Result<&mut E> {
        self.engine.as_mut().ok_or_else(|| EtlError::InvalidState {
            step: "engine access".to_string(),
            expected: "an open engine handle".to_string(),
            actual: "released".to_string(),
        })
    }

    pub fn release(mut self) -> Result<()> {
        match self.engine.take() {
            Some(engine) => engine.close(),
            None => Ok(()),
        }
    }
}

impl<E: Engine> Drop for EngineSession<E> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            tracing::warn!("Engine handle on {} dropped without release, closing", self.store);
            if let Err(e) = engine.close() {
                tracing::error!("[release] {}", e);
            }
        }
    }
}

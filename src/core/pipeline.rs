use crate::config::ExportConfig;
use crate::core::session::EngineSession;
use crate::core::state::{PipelineState, StateMachine};
use crate::domain::model::{Capability, ExportResult};
use crate::domain::ports::{Engine, EngineConnector};
use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use std::time::{Duration, Instant};

/// Runs one export: acquire, enable capabilities, register credentials,
/// attach, count, copy, release.
pub fn run_export<C: EngineConnector>(connector: &C, config: &ExportConfig) -> Result<ExportResult> {
    PipelineRunner::new(connector, config).run()
}

pub struct PipelineRunner<'a, C: EngineConnector> {
    connector: &'a C,
    config: &'a ExportConfig,
    state: StateMachine,
}

/// What steps 2-7 produce when they succeed.
struct Transfer {
    row_count: Option<u64>,
    export_duration: Duration,
}

impl<'a, C: EngineConnector> PipelineRunner<'a, C> {
    pub fn new(connector: &'a C, config: &'a ExportConfig) -> Self {
        Self {
            connector,
            config,
            state: StateMachine::new(),
        }
    }

    pub fn run(mut self) -> Result<ExportResult> {
        let started_at = Utc::now();
        let destination = self.config.destination_path();
        tracing::info!(
            "🚀 Starting export of {} to {}",
            self.config.source,
            destination
        );

        // 1) Acquire. Nothing exists yet, so a failure here has nothing to release.
        self.state.require("acquire", PipelineState::Connected)?;
        let mut session = match EngineSession::open(self.connector, &self.config.store_path) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("[{}] {}", e.stage(), e);
                self.state.close();
                return Err(e);
            }
        };
        self.state.advance("acquire", PipelineState::Connected)?;
        tracing::info!(
            "Connected to local store {}",
            self.config.store_path.display()
        );

        let outcome = match session.engine() {
            Ok(engine) => self.transfer(engine),
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            tracing::error!("[{}] {}", e.stage(), e);
            self.state.fail();
        }

        // 8) Release, whatever happened above.
        let released = session.release();

        match (outcome, released) {
            (Ok(transfer), Ok(())) => {
                self.state.close();
                tracing::info!("Engine handle closed");
                Ok(ExportResult {
                    source_table: self.config.source.to_string(),
                    destination,
                    row_count: transfer.row_count,
                    export_duration: transfer.export_duration,
                    started_at,
                    finished_at: Utc::now(),
                    states: self.visited_states(),
                })
            }
            (Ok(_), Err(close_error)) => {
                tracing::error!("[{}] {}", close_error.stage(), close_error);
                self.state.fail();
                self.state.close();
                Err(close_error)
            }
            (Err(e), released) => {
                if let Err(close_error) = released {
                    // logged only; the original failure is what the caller sees
                    tracing::error!("[{}] {}", close_error.stage(), close_error);
                } else {
                    tracing::info!("Engine handle closed after failure");
                }
                self.state.close();
                Err(e)
            }
        }
    }

    /// Steps 2-7 against an open engine.
    fn transfer(&mut self, engine: &mut C::Engine) -> Result<Transfer> {
        // 2) Remote storage
        self.state
            .require("enable remote storage", PipelineState::StorageEnabled)?;
        engine.enable_capability(Capability::RemoteStorage)?;
        self.state
            .advance("enable remote storage", PipelineState::StorageEnabled)?;
        tracing::info!("Remote storage capability enabled");

        // 3) Credentials, replacing any record left by an earlier run
        let secret = self.config.secret_record();
        self.state
            .require("register credentials", PipelineState::SecretSet)?;
        engine.create_secret(&secret)?;
        self.state
            .advance("register credentials", PipelineState::SecretSet)?;
        tracing::info!(
            "Secret {} registered for region {}",
            secret.name,
            secret.region
        );

        // 4) Remote database
        let attachment = self.config.attachment();
        self.state
            .require("enable remote database", PipelineState::DbEnabled)?;
        engine.enable_capability(Capability::RemoteDatabase(attachment.kind))?;
        self.state
            .advance("enable remote database", PipelineState::DbEnabled)?;
        tracing::info!(
            "Remote database capability enabled ({})",
            attachment.kind.attach_type()
        );

        // 5) Attach
        self.state.require("attach", PipelineState::Attached)?;
        engine.attach(&attachment)?;
        self.state.advance("attach", PipelineState::Attached)?;
        tracing::info!(
            "Attached remote database read-only as '{}' and switched context",
            attachment.alias
        );

        // 6) Diagnostic count, never fatal
        self.state.require("count", PipelineState::Counted)?;
        let row_count = count_rows(engine, self.config);
        self.state.advance("count", PipelineState::Counted)?;
        match row_count {
            Some(count) => tracing::info!("Row count in {}: {}", self.config.source, count),
            None => tracing::info!("Row count in {}: unknown", self.config.source),
        }

        // 7) Copy
        let transfer = self.config.transfer();
        self.state.require("export", PipelineState::Exported)?;
        tracing::info!(
            "Exporting {} to {} ({} / {})",
            transfer.source(),
            transfer.destination(),
            transfer.format().extension(),
            transfer.compression().codec_name(transfer.format())
        );
        let start = Instant::now();
        engine.copy_to(&transfer)?;
        let export_duration = start.elapsed();
        self.state.advance("export", PipelineState::Exported)?;
        tracing::info!("Export complete: {}", transfer.destination());
        tracing::info!(
            "Export duration: {:.2} seconds",
            export_duration.as_secs_f64()
        );

        Ok(Transfer {
            row_count,
            export_duration,
        })
    }

    fn visited_states(&self) -> Vec<String> {
        self.state
            .history()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }
}

fn count_rows<E: Engine>(engine: &mut E, config: &ExportConfig) -> Option<u64> {
    match engine.count_rows(&config.source) {
        Ok(Some(count)) => Some(count),
        Ok(None) => {
            tracing::warn!("[count] Row count query for {} returned no row", config.source);
            None
        }
        Err(e) => {
            let e = match e {
                e @ EtlError::DiagnosticError { .. } => e,
                other => EtlError::DiagnosticError {
                    table: config.source.to_string(),
                    message: other.to_string(),
                },
            };
            tracing::warn!("[{}] {}; continuing with export", e.stage(), e);
            None
        }
    }
}

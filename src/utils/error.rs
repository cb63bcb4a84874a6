use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to open local store '{path}': {message}")]
    ConnectionError { path: String, message: String },

    #[error("Failed to enable capability '{capability}': {message}")]
    CapabilityError { capability: String, message: String },

    #[error("Failed to register secret '{secret}': {message}")]
    CredentialError { secret: String, message: String },

    #[error("Failed to attach remote database as '{alias}': {message}")]
    AttachmentError { alias: String, message: String },

    #[error("Row count for {table} unavailable: {message}")]
    DiagnosticError { table: String, message: String },

    #[error("Export to '{destination}' failed: {message}")]
    ExportError {
        destination: String,
        message: String,
    },

    #[error("Failed to close engine handle: {message}")]
    CloseError { message: String },

    #[error("Pipeline step '{step}' requires state {expected}, found {actual}")]
    InvalidState {
        step: String,
        expected: String,
        actual: String,
    },

    #[error("Verification of '{destination}' failed: {message}")]
    VerificationError {
        destination: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Engine,
    Remote,
    Diagnostic,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl EtlError {
    /// Pipeline stage the error belongs to, used as the prefix of failure log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => "configure",
            EtlError::ConnectionError { .. } => "acquire",
            EtlError::CapabilityError { .. } => "enable-capability",
            EtlError::CredentialError { .. } => "register-credentials",
            EtlError::AttachmentError { .. } => "attach",
            EtlError::DiagnosticError { .. } => "count",
            EtlError::ExportError { .. } => "export",
            EtlError::CloseError { .. } => "release",
            EtlError::InvalidState { .. } => "state",
            EtlError::VerificationError { .. } => "verify",
            EtlError::IoError(_) => "io",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::ConnectionError { .. }
            | EtlError::CapabilityError { .. }
            | EtlError::CredentialError { .. }
            | EtlError::CloseError { .. }
            | EtlError::InvalidState { .. } => ErrorCategory::Engine,
            EtlError::AttachmentError { .. }
            | EtlError::ExportError { .. }
            | EtlError::VerificationError { .. } => ErrorCategory::Remote,
            EtlError::DiagnosticError { .. } => ErrorCategory::Diagnostic,
            EtlError::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::DiagnosticError { .. } => ErrorSeverity::Low,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorSeverity::Medium,
            EtlError::AttachmentError { .. }
            | EtlError::ExportError { .. }
            | EtlError::CloseError { .. }
            | EtlError::VerificationError { .. } => ErrorSeverity::High,
            EtlError::ConnectionError { .. }
            | EtlError::CapabilityError { .. }
            | EtlError::CredentialError { .. }
            | EtlError::InvalidState { .. }
            | EtlError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Everything except a failed diagnostic count aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EtlError::DiagnosticError { .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Check the CLI flags, environment variables and config file values"
            }
            EtlError::ConnectionError { .. } => {
                "Check permissions on the local store path and that no other run holds it"
            }
            EtlError::CapabilityError { .. } => {
                "Make sure the extension repository is reachable or pre-install the extension"
            }
            EtlError::CredentialError { .. } => "Check the storage access key, secret key and region",
            EtlError::AttachmentError { .. } => {
                "Check the database connection string, network access and credentials"
            }
            EtlError::DiagnosticError { .. } => "The export continues; check the source table name",
            EtlError::ExportError { .. } => {
                "Check write permissions on the destination bucket and network connectivity"
            }
            EtlError::CloseError { .. } => "Inspect the local store file; it may need to be removed",
            EtlError::InvalidState { .. } => "This is a bug in the pipeline ordering; please report it",
            EtlError::VerificationError { .. } => {
                "Check that the destination object exists and the credentials allow reading it"
            }
            EtlError::IoError(_) => "Check file system permissions and free disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        format!("[{}] {}", self.stage(), self)
    }

    /// Single-line report for the terminal: stage, message and what to try next.
    pub fn report_line(&self) -> String {
        let message = self
            .user_friendly_message()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} ({})", message, self.recovery_suggestion())
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_diagnostic_is_recoverable() {
        let diagnostic = EtlError::DiagnosticError {
            table: "CUSTOMER".to_string(),
            message: "no such table".to_string(),
        };
        let export = EtlError::ExportError {
            destination: "s3://bucket/CUSTOMER.parquet".to_string(),
            message: "access denied".to_string(),
        };

        assert!(!diagnostic.is_fatal());
        assert!(export.is_fatal());
        assert_eq!(diagnostic.severity().exit_code(), 0);
        assert_ne!(export.severity().exit_code(), 0);
    }

    #[test]
    fn test_every_fatal_error_exits_non_zero() {
        let errors = vec![
            EtlError::MissingConfigError {
                field: "storage.access_key_id".to_string(),
            },
            EtlError::ConnectionError {
                path: "store.duckdb".to_string(),
                message: "locked".to_string(),
            },
            EtlError::CapabilityError {
                capability: "httpfs".to_string(),
                message: "offline".to_string(),
            },
            EtlError::CredentialError {
                secret: "export_s3".to_string(),
                message: "rejected".to_string(),
            },
            EtlError::AttachmentError {
                alias: "remote_db".to_string(),
                message: "auth failed".to_string(),
            },
            EtlError::CloseError {
                message: "flush failed".to_string(),
            },
        ];

        for error in errors {
            assert!(error.is_fatal());
            assert!(error.severity().exit_code() > 0, "{error}");
        }
    }

    #[test]
    fn test_user_friendly_message_names_stage() {
        let error = EtlError::AttachmentError {
            alias: "remote_db".to_string(),
            message: "connection refused".to_string(),
        };
        let message = error.user_friendly_message();
        assert!(message.starts_with("[attach]"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_report_line_is_single_line() {
        let error = EtlError::ExportError {
            destination: "s3://my-bucket/CUSTOMER.parquet".to_string(),
            message: "IO Error: Cannot open file\n\nHTTP 403".to_string(),
        };
        let line = error.report_line();
        assert!(!line.contains('\n'));
        assert!(line.starts_with("[export]"));
        assert!(line.contains("HTTP 403"));
        assert!(line.ends_with(&format!("({})", error.recovery_suggestion())));
    }
}

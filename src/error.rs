use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Main error type for the conversion server
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Errors raised while converting a single upload
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to launch encoder {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoder exited with {status}: {stderr}")]
    Encoding { status: ExitStatus, stderr: String },

    #[error("Encoder exited successfully but produced no output")]
    EmptyOutput,

    #[error("Staging I/O error while {context}: {source}")]
    StagingIo {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoder timed out after {0:?}")]
    Timeout(Duration),

    #[error("Conversion cancelled")]
    Cancelled,
}

impl ConversionError {
    pub fn staging(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| ConversionError::StagingIo { context, source }
    }

    /// Text shown to the requester.
    ///
    /// For encoder failures this is the captured stderr verbatim, falling
    /// back to the exit status when the encoder wrote nothing.
    pub fn diagnostic(&self) -> String {
        match self {
            ConversionError::Encoding { status, stderr } => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    format!("Encoder exited with {} and no error output", status)
                } else {
                    stderr.to_string()
                }
            }
            other => other.to_string(),
        }
    }

    pub fn cause(&self) -> FailureCause {
        match self {
            ConversionError::Launch { .. } => FailureCause::Launch,
            ConversionError::Encoding { .. } | ConversionError::EmptyOutput => {
                FailureCause::Encoding
            }
            ConversionError::StagingIo { .. } => FailureCause::StagingIo,
            ConversionError::Timeout(_) => FailureCause::Timeout,
            ConversionError::Cancelled => FailureCause::Cancelled,
        }
    }
}

/// Coarse failure category carried by a failed conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    Launch,
    Encoding,
    StagingIo,
    Timeout,
    Cancelled,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

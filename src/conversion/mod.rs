//! WAV to MP3 conversion
//!
//! This module drives a single conversion:
//! - Stages the uploaded bytes in a uniquely named input file
//! - Runs the external encoder against input and output staging files
//! - Reads the encoded result back into memory
//! - Releases both staging files on every exit path

pub mod encoder;
pub mod staging;

use std::path::PathBuf;
use std::time::Instant;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::EncoderConfig;
use crate::error::{ConversionError, FailureCause};

pub use encoder::Encoder;
use staging::StagingPair;

/// Extension given to every converted file
pub const OUTPUT_EXTENSION: &str = "mp3";

/// Stem used when the upload name has none
const FALLBACK_STEM: &str = "output";

/// An uploaded file awaiting conversion
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Raw upload, passed to the encoder untouched
    pub data: Bytes,
    /// Name the client gave the upload
    pub file_name: String,
}

impl ConversionRequest {
    pub fn new(data: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            file_name: file_name.into(),
        }
    }
}

/// Outcome of a conversion
#[derive(Debug, Clone)]
pub enum ConversionResult {
    Success {
        data: Bytes,
        suggested_file_name: String,
    },
    Failure {
        diagnostic: String,
        cause: FailureCause,
    },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }
}

/// Derive the download name for an upload: last path component with its
/// extension replaced by `mp3`.
///
/// A leading dot does not start an extension, so `.wav` becomes `.wav.mp3`.
pub fn suggested_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);

    let stem = match base.rfind('.') {
        Some(dot) if base[..dot].chars().any(|c| c != '.') => &base[..dot],
        _ => base,
    };

    if stem.is_empty() {
        format!("{}.{}", FALLBACK_STEM, OUTPUT_EXTENSION)
    } else {
        format!("{}.{}", stem, OUTPUT_EXTENSION)
    }
}

/// Converts uploads by staging them on disk and running the encoder
#[derive(Debug, Clone)]
pub struct ConversionService {
    encoder: Encoder,
    staging_dir: PathBuf,
}

impl ConversionService {
    pub fn new(encoder: Encoder, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn from_config(config: &EncoderConfig) -> Self {
        Self::new(
            Encoder::new(config.program.clone(), config.timeout()),
            config.staging_dir(),
        )
    }

    /// Convert one upload.
    ///
    /// Never fails: every error is folded into [`ConversionResult::Failure`].
    pub async fn convert(
        &self,
        request: ConversionRequest,
        cancel: &CancellationToken,
    ) -> ConversionResult {
        let start = Instant::now();
        let input_bytes = request.data.len();

        match self.run(&request.data, cancel).await {
            Ok(data) => {
                let suggested_file_name = suggested_file_name(&request.file_name);
                info!(
                    file_name = %request.file_name,
                    output = %suggested_file_name,
                    input_bytes,
                    output_bytes = data.len(),
                    elapsed = ?start.elapsed(),
                    "conversion succeeded"
                );
                ConversionResult::Success {
                    data,
                    suggested_file_name,
                }
            }
            Err(e) => {
                warn!(
                    file_name = %request.file_name,
                    input_bytes,
                    elapsed = ?start.elapsed(),
                    error = %e,
                    "conversion failed"
                );
                ConversionResult::Failure {
                    diagnostic: e.diagnostic(),
                    cause: e.cause(),
                }
            }
        }
    }

    async fn run(&self, input: &[u8], cancel: &CancellationToken) -> Result<Bytes, ConversionError> {
        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        // Both slots are removed when `staging` goes out of scope, including
        // when this future is dropped mid-encode.
        let staging = StagingPair::acquire(&self.staging_dir)
            .await
            .map_err(ConversionError::staging("creating staging files"))?;

        tokio::fs::write(staging.input.path(), input)
            .await
            .map_err(ConversionError::staging("writing input"))?;

        self.encoder
            .encode(staging.input.path(), staging.output.path(), cancel)
            .await?;

        let data = tokio::fs::read(staging.output.path())
            .await
            .map_err(ConversionError::staging("reading output"))?;
        if data.is_empty() {
            return Err(ConversionError::EmptyOutput);
        }

        Ok(Bytes::from(data))
    }
}

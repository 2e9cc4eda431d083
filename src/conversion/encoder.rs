//! External encoder invocation
//!
//! Runs ffmpeg as a subprocess with a fixed argument set, captures its
//! stderr, and bounds the run by a timeout and a cancellation token.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ConversionError;

/// Output sample rate in Hz
pub const SAMPLE_RATE: u32 = 44_100;

/// Output channel count (stereo)
pub const CHANNELS: u32 = 2;

/// Output audio bitrate
pub const AUDIO_BITRATE: &str = "192k";

/// How long `-version` may take before the encoder is considered unusable
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the encoder argument list.
///
/// -y    : overwrite the (pre-created) output file
/// -vn   : drop any video stream
/// -ar   : output sample rate
/// -ac   : output channel count
/// -b:a  : output audio bitrate
pub fn encoder_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-vn".into(),
        "-ar".into(),
        SAMPLE_RATE.to_string().into(),
        "-ac".into(),
        CHANNELS.to_string().into(),
        "-b:a".into(),
        AUDIO_BITRATE.into(),
        output.as_os_str().to_owned(),
    ]
}

/// Handle to the external encoder binary
#[derive(Debug, Clone)]
pub struct Encoder {
    program: PathBuf,
    timeout: Duration,
}

impl Encoder {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Transcode `input` into `output`.
    ///
    /// Returns once the encoder has exited. A non-zero exit becomes
    /// [`ConversionError::Encoding`] carrying the captured stderr. On timeout
    /// or cancellation the child is killed before the error is returned.
    pub async fn encode(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ConversionError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(encoder_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Dropping the wait future (timeout, cancel, client gone) kills ffmpeg.
            .kill_on_drop(true);

        debug!(
            program = %self.program.display(),
            input = %input.display(),
            output = %output.display(),
            "spawning encoder"
        );

        let child = cmd.spawn().map_err(|source| ConversionError::Launch {
            program: self.program.display().to_string(),
            source,
        })?;

        let waited = tokio::select! {
            waited = tokio::time::timeout(self.timeout, child.wait_with_output()) => waited,
            _ = cancel.cancelled() => {
                warn!(program = %self.program.display(), "conversion cancelled, encoder killed");
                return Err(ConversionError::Cancelled);
            }
        };

        let result = match waited {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(
                    program = %self.program.display(),
                    timeout = ?self.timeout,
                    "encoder timed out, killed"
                );
                return Err(ConversionError::Timeout(self.timeout));
            }
        };

        let result = result.map_err(ConversionError::staging("waiting for encoder"))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).to_string();
            warn!(
                status = %result.status,
                last_line = stderr.lines().last().unwrap_or(""),
                "encoder failed"
            );
            return Err(ConversionError::Encoding {
                status: result.status,
                stderr,
            });
        }

        Ok(())
    }
}

/// Ask the encoder for its version banner (first line of `-version`).
///
/// Returns `None` when the binary is missing, fails, or hangs.
pub async fn probe_version(program: &Path) -> Option<String> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(PROBE_TIMEOUT, output).await.ok()?.ok()?;
    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

//! Test fixtures for integration tests
//!
//! Provides generated WAV payloads, MP3 inspection helpers, and scripted
//! stand-ins for the ffmpeg binary so conversions can be exercised without
//! a real encoder.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Generate a 16-bit PCM mono WAV file containing a 440 Hz tone
pub fn pcm_wav(sample_rate: u32, seconds: u32) -> Vec<u8> {
    let samples = sample_rate * seconds;
    let data_len = samples * 2;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());

    for n in 0..samples {
        let t = n as f64 / sample_rate as f64;
        let sample = (t * 440.0 * std::f64::consts::TAU).sin() * i16::MAX as f64 * 0.5;
        wav.extend_from_slice(&(sample as i16).to_le_bytes());
    }

    wav
}

/// Offset of the first MP3 frame, skipping a leading ID3v2 tag.
///
/// Returns `None` when no frame sync is found at that offset.
pub fn mp3_frame_offset(data: &[u8]) -> Option<usize> {
    let mut offset = 0;
    if data.len() >= 10 && &data[..3] == b"ID3" {
        // Tag size is a 28-bit syncsafe integer.
        let size = data[6..10]
            .iter()
            .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7F));
        offset = 10 + size;
        if data[5] & 0x10 != 0 {
            offset += 10; // footer
        }
    }

    let header = data.get(offset..offset + 2)?;
    (header[0] == 0xFF && header[1] & 0xE0 == 0xE0).then_some(offset)
}

/// Whether a real ffmpeg binary is on PATH
pub fn ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A shell script standing in for ffmpeg
#[cfg(unix)]
pub struct FakeEncoder {
    _dir: TempDir,
    pub program: PathBuf,
}

#[cfg(unix)]
impl FakeEncoder {
    /// Behaves like a working encoder: rejects input that does not start
    /// with `RIFF`, otherwise writes an MP3 frame header followed by the input.
    pub fn mp3() -> Self {
        Self::with_body(
            r#"in="$3"
out="${11}"
if [ "$(head -c 4 "$in")" != "RIFF" ]; then
  echo "$in: Invalid data found when processing input" >&2
  exit 1
fi
printf '\377\373\220\144' > "$out"
cat "$in" >> "$out"
"#,
        )
    }

    /// Always exits with `code` after writing `stderr`
    pub fn failing(stderr: &str, code: i32) -> Self {
        Self::with_body(&format!("echo '{}' >&2\nexit {}\n", stderr, code))
    }

    /// Exits successfully without writing any output
    pub fn silent() -> Self {
        Self::with_body("exit 0\n")
    }

    /// Never finishes on its own
    pub fn hanging() -> Self {
        Self::with_body("exec sleep 30\n")
    }

    /// Arguments of the last invocation, one per entry
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.args_file())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn args_file(&self) -> PathBuf {
        args_file_for(&self.program)
    }

    fn with_body(body: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("ffmpeg");
        let script = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"-version\" ]; then\n  echo 'ffmpeg version fake-1.0'\n  exit 0\nfi\n\
             printf '%s\\n' \"$@\" > '{}'\n\
             {}",
            args_file_for(&program).display(),
            body
        );
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { _dir: dir, program }
    }
}

fn args_file_for(program: &Path) -> PathBuf {
    program.with_file_name("args.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_wav_layout() {
        let wav = pcm_wav(8000, 10);
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 8000 * 10 * 2);
    }

    #[test]
    fn test_mp3_frame_offset() {
        assert_eq!(mp3_frame_offset(&[0xFF, 0xFB, 0x90, 0x64]), Some(0));
        assert_eq!(mp3_frame_offset(b"RIFF"), None);
        assert_eq!(mp3_frame_offset(&[]), None);

        let mut tagged = b"ID3\x04\x00\x00\x00\x00\x00\x02".to_vec();
        tagged.extend_from_slice(&[0, 0, 0xFF, 0xFB]);
        assert_eq!(mp3_frame_offset(&tagged), Some(12));
    }
}

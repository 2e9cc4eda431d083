//! End-to-end integration tests
//!
//! Scenarios against a real ffmpeg binary skip themselves when ffmpeg is
//! not installed.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::conversion::{ConversionRequest, ConversionResult, ConversionService, Encoder};
use crate::error::FailureCause;
use crate::http::create_router;
use crate::integration::fixtures::{ffmpeg_available, mp3_frame_offset, pcm_wav};
use crate::state::AppState;

fn real_service(staging: &Path) -> ConversionService {
    ConversionService::new(Encoder::new("ffmpeg", Duration::from_secs(120)), staging)
}

fn staging_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Ten seconds of 8 kHz mono PCM converts to a stereo 44.1 kHz MP3
pub async fn scenario_pcm_to_mp3(staging: &Path) -> Result<(), String> {
    let result = real_service(staging)
        .convert(
            ConversionRequest::new(pcm_wav(8000, 10), "sample.wav"),
            &CancellationToken::new(),
        )
        .await;

    match result {
        ConversionResult::Success {
            data,
            suggested_file_name,
        } => {
            if suggested_file_name != "sample.mp3" {
                return Err(format!("unexpected name {}", suggested_file_name));
            }
            if mp3_frame_offset(&data).is_none() {
                return Err("output does not start with an MP3 frame".to_string());
            }
            Ok(())
        }
        ConversionResult::Failure { diagnostic, .. } => Err(diagnostic),
    }
}

/// A payload that is not audio fails with ffmpeg's own diagnostic
pub async fn scenario_corrupt_header(staging: &Path) -> Result<(), String> {
    let mut wav = pcm_wav(8000, 1);
    wav.truncate(20);
    wav[0..4].copy_from_slice(b"JUNK");

    match real_service(staging)
        .convert(
            ConversionRequest::new(wav, "broken.wav"),
            &CancellationToken::new(),
        )
        .await
    {
        ConversionResult::Failure { diagnostic, cause } => {
            if cause != FailureCause::Encoding {
                return Err(format!("unexpected cause {:?}", cause));
            }
            if !diagnostic.contains("Invalid data found") {
                return Err(format!("diagnostic is not from the encoder: {}", diagnostic));
            }
            Ok(())
        }
        ConversionResult::Success { .. } => Err("corrupt input converted".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pcm_to_mp3_e2e() {
        if !ffmpeg_available() {
            return; // Skip if ffmpeg missing
        }
        let staging = tempfile::tempdir().unwrap();
        scenario_pcm_to_mp3(staging.path()).await.unwrap();
        assert_eq!(staging_entries(staging.path()), 0);
    }

    #[tokio::test]
    async fn test_corrupt_header_e2e() {
        if !ffmpeg_available() {
            return;
        }
        let staging = tempfile::tempdir().unwrap();
        scenario_corrupt_header(staging.path()).await.unwrap();
        assert_eq!(staging_entries(staging.path()), 0);
    }

    #[tokio::test]
    async fn test_empty_payload_e2e() {
        if !ffmpeg_available() {
            return;
        }
        let staging = tempfile::tempdir().unwrap();
        let result = real_service(staging.path())
            .convert(
                ConversionRequest::new(Vec::new(), "empty.wav"),
                &CancellationToken::new(),
            )
            .await;

        match result {
            ConversionResult::Failure { diagnostic, .. } => assert!(!diagnostic.is_empty()),
            ConversionResult::Success { .. } => panic!("empty input converted"),
        }
        assert_eq!(staging_entries(staging.path()), 0);
    }

    #[tokio::test]
    async fn test_repeated_conversion_is_deterministic_e2e() {
        if !ffmpeg_available() {
            return;
        }
        let staging = tempfile::tempdir().unwrap();
        let service = real_service(staging.path());
        let wav = pcm_wav(8000, 2);

        let mut outputs = Vec::new();
        for _ in 0..2 {
            match service
                .convert(
                    ConversionRequest::new(wav.clone(), "loop.wav"),
                    &CancellationToken::new(),
                )
                .await
            {
                ConversionResult::Success { data, .. } => outputs.push(data),
                ConversionResult::Failure { diagnostic, .. } => panic!("{}", diagnostic),
            }
            assert_eq!(staging_entries(staging.path()), 0);
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn test_http_upload_e2e() {
        if !ffmpeg_available() {
            return;
        }
        let staging = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.encoder.staging_dir = Some(staging.path().to_path_buf());
        let state = Arc::new(AppState::new(config));
        let shutdown = CancellationToken::new();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_shutdown = shutdown.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, create_router(state))
                .with_graceful_shutdown(server_shutdown.cancelled_owned())
                .await
                .unwrap();
        });

        let part = reqwest::multipart::Part::bytes(pcm_wav(8000, 3))
            .file_name("voice memo.wav")
            .mime_str("audio/wav")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = reqwest::Client::new()
            .post(format!("http://{}/convert", addr))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "audio/mp3"
        );
        assert!(response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("filename=\"voice memo.mp3\""));
        let body = response.bytes().await.unwrap();
        assert!(mp3_frame_offset(&body).is_some());
        assert_eq!(staging_entries(staging.path()), 0);

        shutdown.cancel();
        server.abort();
    }
}

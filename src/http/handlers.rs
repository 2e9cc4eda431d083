//! HTTP request handlers
//!
//! Implements the upload form, the conversion endpoint, and the
//! health/version/debug endpoints.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use crate::conversion::{ConversionRequest, ConversionResult};
use crate::error::FailureCause;
use crate::state::{AppState, StatsSnapshot};

/// Multipart field carrying the upload
pub const UPLOAD_FIELD: &str = "file";

/// Extension accepted for uploads
const ACCEPTED_EXTENSION: &str = ".wav";

/// MIME type of the converted download
pub const MP3_CONTENT_TYPE: &str = "audio/mp3";

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    UnsupportedMediaType(String),
    Upload { status: StatusCode, message: String },
    Unavailable(String),
    Conversion { cause: FailureCause, diagnostic: String },
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            HttpError::Upload { status, .. } => *status,
            HttpError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            HttpError::Conversion { cause, .. } => match cause {
                FailureCause::Encoding => StatusCode::UNPROCESSABLE_ENTITY,
                FailureCause::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FailureCause::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                FailureCause::Launch | FailureCause::StagingIo => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            HttpError::BadRequest(msg)
            | HttpError::UnsupportedMediaType(msg)
            | HttpError::Unavailable(msg) => msg,
            HttpError::Upload { message, .. } => message,
            HttpError::Conversion { diagnostic, .. } => diagnostic,
        };

        (status, body).into_response()
    }
}

impl From<MultipartError> for HttpError {
    fn from(err: MultipartError) -> Self {
        HttpError::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("wav2mp3-server v", env!("CARGO_PKG_VERSION"))
}

/// Conversion counters
/// GET /debug/stats
pub async fn conversion_stats(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    Json(state.snapshot())
}

/// Upload form
/// GET /
pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// Convert an uploaded WAV file
/// POST /convert
pub async fn convert_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let request = read_upload(&mut multipart).await?;

    if !has_wav_extension(&request.file_name) {
        return Err(HttpError::UnsupportedMediaType(format!(
            "Only WAV files are accepted, got {:?}",
            request.file_name
        )));
    }

    let _permit = state
        .acquire_permit()
        .await
        .ok_or_else(|| HttpError::Unavailable("Server is shutting down".to_string()))?;
    let cancel = state.request_token();

    let in_flight = state.record_started();
    let result = state.service.convert(request, &cancel).await;
    in_flight.finish(result.is_success());

    match result {
        ConversionResult::Success {
            data,
            suggested_file_name,
        } => Ok(download_response(data, &suggested_file_name)),
        ConversionResult::Failure { diagnostic, cause } => {
            Err(HttpError::Conversion { cause, diagnostic })
        }
    }
}

/// Pull the upload out of the multipart body; other fields are ignored.
async fn read_upload(multipart: &mut Multipart) -> Result<ConversionRequest, HttpError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = ?field.name(), "ignoring multipart field");
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        debug!(file_name = %file_name, size_bytes = data.len(), "received upload");
        return Ok(ConversionRequest::new(data, file_name));
    }

    Err(HttpError::BadRequest(format!(
        "Missing multipart field {:?}",
        UPLOAD_FIELD
    )))
}

fn has_wav_extension(file_name: &str) -> bool {
    file_name.len() > ACCEPTED_EXTENSION.len()
        && file_name
            .get(file_name.len() - ACCEPTED_EXTENSION.len()..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ACCEPTED_EXTENSION))
}

fn download_response(data: Bytes, file_name: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(MP3_CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(file_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    (headers, data).into_response()
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// encoded UTF-8 name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(file_name.len());
    for b in file_name.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{:02X}", b));
        }
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>WAV to MP3 Converter</title>
</head>
<body>
<h1>WAV to MP3 Converter</h1>
<p>Upload a WAV file and download it as a 192 kbps stereo MP3.</p>
<form action="/convert" method="post" enctype="multipart/form-data">
<input type="file" name="file" accept=".wav,audio/wav" required>
<button type="submit">Convert</button>
</form>
<p>Uploads are deleted as soon as the conversion finishes. Conversion is powered by ffmpeg.</p>
</body>
</html>
"#;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::AppError;

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Inclusive byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    Full,
    Partial(ByteRange),
    Unsatisfiable,
}

/// Interpret a `Range` header against a file of `file_size` bytes.
/// Headers that are not a single `bytes=` range are ignored.
pub fn parse_range(header: Option<&str>, file_size: u64) -> RangeRequest {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeRequest::Full;
    };
    if spec.contains(',') {
        return RangeRequest::Full;
    }
    let Some((start, end)) = spec.trim().split_once('-') else {
        return RangeRequest::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // Suffix range: the last N bytes.
        let Ok(suffix) = end.parse::<u64>() else {
            return RangeRequest::Full;
        };
        if suffix == 0 || file_size == 0 {
            return RangeRequest::Unsatisfiable;
        }
        return RangeRequest::Partial(ByteRange {
            start: file_size.saturating_sub(suffix),
            end: file_size - 1,
        });
    }

    let Ok(start) = start.parse::<u64>() else {
        return RangeRequest::Full;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<u64>() {
            Ok(e) => Some(e),
            Err(_) => return RangeRequest::Full,
        }
    };

    if start >= file_size {
        return RangeRequest::Unsatisfiable;
    }
    let last = file_size - 1;
    match end {
        Some(e) if start > e => RangeRequest::Unsatisfiable,
        Some(e) => RangeRequest::Partial(ByteRange {
            start,
            end: e.min(last),
        }),
        None => RangeRequest::Partial(ByteRange { start, end: last }),
    }
}

/// Serve `path`, honoring a `Range` header from `headers`.
pub async fn serve_file(path: &Path, headers: &HeaderMap) -> Result<Response, AppError> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Media file missing on disk: {}", path.display());
            return Err(AppError::NotFound("Media file not found on disk".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let file_size = file.metadata().await?.len();
    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    match parse_range(range_header, file_size) {
        RangeRequest::Full => {
            let body = Body::from_stream(ReaderStream::new(file));
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(VIDEO_CONTENT_TYPE)),
                    (header::CONTENT_LENGTH, HeaderValue::from(file_size)),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                ],
                body,
            )
                .into_response())
        }
        RangeRequest::Partial(range) => {
            tracing::debug!(
                "Range {}-{}/{} for {}",
                range.start,
                range.end,
                file_size,
                path.display()
            );
            file.seek(std::io::SeekFrom::Start(range.start)).await?;
            let body = Body::from_stream(ReaderStream::new(file.take(range.len())));
            let content_range = format!("bytes {}-{}/{}", range.start, range.end, file_size);
            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(VIDEO_CONTENT_TYPE)),
                    (header::CONTENT_LENGTH, HeaderValue::from(range.len())),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                    (header::CONTENT_RANGE, header_value(&content_range)?),
                ],
                body,
            )
                .into_response())
        }
        RangeRequest::Unsatisfiable => {
            let content_range = format!("bytes */{file_size}");
            Ok((
                StatusCode::RANGE_NOT_SATISFIABLE,
                [
                    (header::CONTENT_RANGE, header_value(&content_range)?),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                ],
                axum::Json(serde_json::json!({ "message": "Requested range not satisfiable" })),
            )
                .into_response())
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value).map_err(|e| AppError::Internal(e.to_string()))
}

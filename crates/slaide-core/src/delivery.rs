//! Turning an artifact path into something that can be served.
//!
//! PDFs and unknown files are opened for streaming with their exact length.
//! HTML is read whole and sanitized, since sanitizing changes its length.

use std::path::Path;

use crate::error::DeliveryError;
use crate::sanitize::sanitize;

/// How a file is served, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Html,
    Binary,
}

impl ContentKind {
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            ContentKind::Pdf
        } else if lower.ends_with(".html") || lower.ends_with(".htm") {
            ContentKind::Html
        } else {
            ContentKind::Binary
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ContentKind::Pdf => "application/pdf",
            ContentKind::Html => HTML_CONTENT_TYPE,
            ContentKind::Binary => "application/octet-stream",
        }
    }
}

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug)]
pub enum ArtifactBody {
    /// Raw bytes to stream; `len` is the size reported by stat.
    Stream { file: tokio::fs::File, len: u64 },
    /// Sanitized HTML.
    Html(String),
}

/// An opened artifact, ready to be written to a response.
#[derive(Debug)]
pub struct Artifact {
    pub kind: ContentKind,
    /// Basename, for `Content-Disposition`.
    pub file_name: String,
    pub body: ArtifactBody,
}

impl Artifact {
    /// Length in bytes of what will be sent.
    pub fn content_length(&self) -> u64 {
        match &self.body {
            ArtifactBody::Stream { len, .. } => *len,
            ArtifactBody::Html(text) => text.len() as u64,
        }
    }
}

/// Open the artifact at `path` for delivery.
///
/// The path is used as given. Anything that cannot be stat'ed or opened,
/// including directories, is reported as [`DeliveryError::NotFound`].
pub async fn open_artifact(path: &str) -> Result<Artifact, DeliveryError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| DeliveryError::not_found(path, e))?;
    if meta.is_dir() {
        return Err(DeliveryError::not_found(path, "is a directory"));
    }

    let kind = ContentKind::from_path(path);
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let body = match kind {
        ContentKind::Html => {
            let raw = tokio::fs::read(path)
                .await
                .map_err(|e| DeliveryError::not_found(path, e))?;
            ArtifactBody::Html(sanitize(&String::from_utf8_lossy(&raw)))
        }
        ContentKind::Pdf | ContentKind::Binary => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| DeliveryError::not_found(path, e))?;
            ArtifactBody::Stream {
                file,
                len: meta.len(),
            }
        }
    };

    Ok(Artifact {
        kind,
        file_name,
        body,
    })
}

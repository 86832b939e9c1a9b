//! The external Host agent: its HTTP contract and its loosely-shaped replies.
//!
//! The Host does not commit to field names for the artifact it produced, so
//! replies are resolved against ordered alias tables. PDF paths win over HTML
//! paths, which win over inline HTML.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HostError;
use crate::stability::ArtifactKind;

/// Keys that may carry the path of a generated PDF, in priority order.
pub const PDF_PATH_ALIASES: &[&str] = &["pdf_path", "pdf", "path_pdf"];

/// Keys that may carry the path of a generated HTML deck, in priority order.
pub const HTML_PATH_ALIASES: &[&str] = &[
    "html_path",
    "mine_path",
    "mine_html_path",
    "mine_html",
    "path",
];

/// Keys that may carry a whole HTML document inline, in priority order.
pub const INLINE_HTML_ALIASES: &[&str] = &["result", "html", "content"];

/// Normalized description of what the Host produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ArtifactDescriptor {
    #[serde(rename = "html")]
    Html {
        #[serde(rename = "filePath")]
        file_path: String,
    },
    #[serde(rename = "pdf")]
    Pdf {
        #[serde(rename = "filePath")]
        file_path: String,
    },
    #[serde(rename = "html-inline")]
    HtmlInline { html: String },
}

impl ArtifactDescriptor {
    /// The on-disk path and its kind, for file-backed artifacts.
    pub fn file(&self) -> Option<(&str, ArtifactKind)> {
        match self {
            ArtifactDescriptor::Html { file_path } => Some((file_path.as_str(), ArtifactKind::Html)),
            ArtifactDescriptor::Pdf { file_path } => Some((file_path.as_str(), ArtifactKind::Pdf)),
            ArtifactDescriptor::HtmlInline { .. } => None,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ArtifactDescriptor::Html { .. } => "html",
            ArtifactDescriptor::Pdf { .. } => "pdf",
            ArtifactDescriptor::HtmlInline { .. } => "html-inline",
        }
    }
}

/// First alias in `aliases` whose value is a non-empty string.
fn first_string<'a>(body: &'a Value, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|key| body.get(key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

/// True if `text` contains an `<html` root tag (case-insensitive).
pub fn looks_like_html_document(text: &str) -> bool {
    static ROOT: OnceLock<Regex> = OnceLock::new();
    ROOT.get_or_init(|| Regex::new(r"(?i)<\s*html[\s>]").expect("html root pattern"))
        .is_match(text)
}

/// Map a Host reply onto an [`ArtifactDescriptor`].
///
/// Returns `None` when no alias matches; the caller decides how to report
/// the raw body.
pub fn resolve_artifact(body: &Value) -> Option<ArtifactDescriptor> {
    if let Some(path) = first_string(body, PDF_PATH_ALIASES) {
        return Some(ArtifactDescriptor::Pdf {
            file_path: path.to_string(),
        });
    }
    if let Some(path) = first_string(body, HTML_PATH_ALIASES) {
        return Some(ArtifactDescriptor::Html {
            file_path: path.to_string(),
        });
    }
    first_string(body, INLINE_HTML_ALIASES)
        .filter(|html| looks_like_html_document(html))
        .map(|html| ArtifactDescriptor::HtmlInline {
            html: html.to_string(),
        })
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    prompt: &'a str,
}

/// HTTP client for the Host's render endpoint.
#[derive(Debug, Clone)]
pub struct HostClient {
    client: reqwest::Client,
    render_url: String,
    base_url: String,
}

impl HostClient {
    pub fn new(config: &slaide_config::HostSection) -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(HostError::Transport)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &slaide_config::HostSection) -> Self {
        Self {
            client,
            render_url: config.render_url(),
            base_url: config.url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn render_url(&self) -> &str {
        &self.render_url
    }

    /// Ask the Host to generate an artifact for `prompt`.
    ///
    /// A 2xx reply whose body is not JSON yields an empty object.
    pub async fn render(&self, prompt: &str) -> Result<Value, HostError> {
        let response = self
            .client
            .post(&self.render_url)
            .json(&RenderRequest { prompt })
            .send()
            .await
            .map_err(HostError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(HostError::Transport)?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Host reply is not JSON; treating it as empty");
            Value::Object(Default::default())
        }))
    }

    /// Returns true if anything answers HTTP at the Host base URL.
    pub async fn is_reachable(&self, timeout: Duration) -> bool {
        self.client
            .get(&self.base_url)
            .timeout(timeout)
            .send()
            .await
            .is_ok()
    }
}

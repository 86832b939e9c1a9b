use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::defaults;

/// A configuration value that must never show up in logs or dumps.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Return the raw value. Only call this at the point of use.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Secret)
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlaideConfig {
    #[serde(default)]
    pub server: ServerSection,

    /// The external generation service.
    #[serde(default)]
    pub host: HostSection,

    #[serde(default)]
    pub stability: StabilitySection,

    /// Discord OAuth application. Login is disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordSection>,

    /// Supabase project that stores logged-in users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase: Option<SupabaseSection>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
    pub concurrency_limit: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: defaults::BIND.to_string(),
            port: defaults::PORT,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            body_limit_bytes: defaults::BODY_LIMIT_BYTES,
            concurrency_limit: defaults::CONCURRENCY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSection {
    /// Base URL, e.g. `http://localhost:8000`.
    pub url: String,
    /// Path of the render endpoint, appended to `url`.
    pub render_path: String,
    /// Upper bound on a single render call.
    pub timeout_secs: u64,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            url: defaults::HOST_URL.to_string(),
            render_path: defaults::RENDER_PATH.to_string(),
            timeout_secs: defaults::HOST_TIMEOUT_SECS,
        }
    }
}

impl HostSection {
    /// Full URL of the render endpoint.
    pub fn render_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.render_path)
    }
}

/// Polling parameters for waiting on artifacts written by the Host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilitySection {
    pub timeout_ms: u64,
    pub interval_ms: u64,
}

impl Default for StabilitySection {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::STABILITY_TIMEOUT_MS,
            interval_ms: defaults::STABILITY_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordSection {
    pub client_id: String,
    pub client_secret: Secret,
    pub redirect_uri: String,
    #[serde(default = "defaults::discord_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseSection {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    pub key: Secret,
    #[serde(default = "defaults::users_table")]
    pub users_table: String,
}

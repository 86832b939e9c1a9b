//! Discord OAuth login with users persisted to Supabase.
//!
//! The callback flow is: exchange the authorization code for an access token,
//! fetch the Discord profile, then upsert a row keyed by `discord_id` into the
//! Supabase users table through PostgREST.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slaide_config::{DiscordSection, Secret, SupabaseSection};

use crate::error::AuthError;

/// The subset of Discord's `/users/@me` reply we keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Row written to the users table.
#[derive(Debug, Clone, Serialize)]
pub struct UserRow<'a> {
    pub discord_id: &'a str,
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub avatar: Option<&'a str>,
    pub access_token: &'a str,
}

fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Parse a reply body as JSON, keeping non-JSON text as a string value.
async fn json_or_text(response: reqwest::Response) -> Value {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Client for Discord's OAuth2 and user endpoints.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: reqwest::Client,
    config: DiscordSection,
}

impl DiscordClient {
    pub fn new(config: DiscordSection) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<Secret, AuthError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let response = self
            .client
            .post(self.endpoint("/oauth2/token"))
            .form(&form)
            .send()
            .await
            .map_err(AuthError::TokenTransport)?;

        let body = json_or_text(response).await;
        match body.get("access_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => Ok(Secret::new(token)),
            _ => Err(AuthError::TokenRejected(body)),
        }
    }

    /// Fetch the profile of the user owning `token`.
    pub async fn fetch_user(&self, token: &Secret) -> Result<DiscordUser, AuthError> {
        let response = self
            .client
            .get(self.endpoint("/users/@me"))
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(AuthError::ProfileTransport)?;

        let body = json_or_text(response).await;
        let has_id = body
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty());
        if !has_id {
            return Err(AuthError::ProfileRejected(body));
        }
        serde_json::from_value(body.clone()).map_err(|_| AuthError::ProfileRejected(body))
    }
}

/// Writes users into a Supabase table via PostgREST.
#[derive(Debug, Clone)]
pub struct UserStore {
    client: reqwest::Client,
    config: SupabaseSection,
}

impl UserStore {
    pub fn new(config: SupabaseSection) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.users_table
        )
    }

    /// Insert or update the row for `row.discord_id`; returns the stored rows.
    pub async fn upsert(&self, row: &UserRow<'_>) -> Result<Value, AuthError> {
        let key = self.config.key.expose();
        let response = self
            .client
            .post(self.table_url())
            .query(&[("on_conflict", "discord_id")])
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(|e| AuthError::Store {
                status: None,
                body: Value::String(e.to_string()),
            })?;

        let status = response.status();
        let body = json_or_text(response).await;
        if !status.is_success() {
            return Err(AuthError::Store {
                status: Some(status.as_u16()),
                body,
            });
        }
        Ok(body)
    }
}

/// The whole callback flow.
#[derive(Debug, Clone)]
pub struct DiscordLogin {
    discord: DiscordClient,
    store: UserStore,
}

impl DiscordLogin {
    pub fn new(discord: DiscordClient, store: UserStore) -> Self {
        Self { discord, store }
    }

    /// Build from config; `None` if either side is not configured.
    pub fn from_config(
        discord: Option<&DiscordSection>,
        supabase: Option<&SupabaseSection>,
    ) -> Result<Option<Self>, reqwest::Error> {
        match (discord, supabase) {
            (Some(discord), Some(supabase)) => Ok(Some(Self::new(
                DiscordClient::new(discord.clone())?,
                UserStore::new(supabase.clone())?,
            ))),
            _ => Ok(None),
        }
    }

    /// Complete a login for `code` and return the stored user rows.
    pub async fn complete(&self, code: &str) -> Result<Value, AuthError> {
        let token = self.discord.exchange_code(code).await?;
        let user = self.discord.fetch_user(&token).await?;
        let row = UserRow {
            discord_id: &user.id,
            username: &user.username,
            email: user.email.as_deref(),
            avatar: user.avatar.as_deref(),
            access_token: token.expose(),
        };
        let stored = self.store.upsert(&row).await?;
        tracing::info!(discord_id = %user.id, username = %user.username, "user logged in with Discord");
        Ok(stored)
    }
}

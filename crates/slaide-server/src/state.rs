//! Shared application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use slaide_config::SlaideConfig;
use slaide_core::{DiscordLogin, Generator, HostClient, StabilityWaiter};

use crate::ServerError;

/// Shared state accessible to all route handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    generator: Generator,
    login: Option<DiscordLogin>,
    started_at: Instant,
}

impl AppState {
    /// Create new app state around a generator and an optional Discord login.
    pub fn new(generator: Generator, login: Option<DiscordLogin>) -> Self {
        Self {
            inner: Arc::new(Inner {
                generator,
                login,
                started_at: Instant::now(),
            }),
        }
    }

    /// Build the Host client, waiter and login flow described by `config`.
    pub fn from_config(config: &SlaideConfig) -> Result<Self, ServerError> {
        let host = HostClient::new(&config.host)?;
        let waiter = StabilityWaiter::from(config.stability);
        let login = DiscordLogin::from_config(config.discord.as_ref(), config.supabase.as_ref())
            .map_err(ServerError::HttpClient)?;
        if login.is_none() {
            tracing::info!("Discord login disabled; discord or supabase section missing");
        }
        Ok(Self::new(Generator::new(host, waiter), login))
    }

    pub fn generator(&self) -> &Generator {
        &self.inner.generator
    }

    /// The Discord login flow, if configured.
    pub fn login(&self) -> Option<&DiscordLogin> {
        self.inner.login.as_ref()
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}

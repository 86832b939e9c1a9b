//! Default values shared by the config sections.

pub const BIND: &str = "127.0.0.1";
pub const PORT: u16 = 3000;
/// Must outlast a Host call plus the stability wait that follows it.
pub const REQUEST_TIMEOUT_SECS: u64 = 660;
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;
pub const CONCURRENCY_LIMIT: usize = 64;

pub const HOST_URL: &str = "http://localhost:8000";
pub const RENDER_PATH: &str = "/render-html";
pub const HOST_TIMEOUT_SECS: u64 = 600;

pub const STABILITY_TIMEOUT_MS: u64 = 5000;
pub const STABILITY_INTERVAL_MS: u64 = 150;

pub const DISCORD_API_BASE: &str = "https://discord.com/api";
pub const USERS_TABLE: &str = "users";

pub(crate) fn discord_api_base() -> String {
    DISCORD_API_BASE.to_string()
}

pub(crate) fn users_table() -> String {
    USERS_TABLE.to_string()
}

//! Core of the slaide artifact gateway.
//!
//! - [`sanitize`]: strip stray Markdown fences from generated HTML
//! - [`stability`]: wait for a file written by another process to settle
//! - [`host`]: the Host agent's HTTP contract and reply resolution
//! - [`generate`]: prompt to artifact descriptor
//! - [`delivery`]: open an artifact path for serving
//! - [`auth`]: Discord login backed by Supabase

pub mod auth;
pub mod delivery;
mod error;
pub mod generate;
pub mod host;
pub mod sanitize;
pub mod stability;

pub use auth::{DiscordClient, DiscordLogin, DiscordUser, UserStore};
pub use delivery::{open_artifact, Artifact, ArtifactBody, ContentKind, HTML_CONTENT_TYPE};
pub use error::{AuthError, DeliveryError, GenerateError, HostError};
pub use generate::Generator;
pub use host::{resolve_artifact, ArtifactDescriptor, HostClient};
pub use sanitize::sanitize;
pub use stability::{ArtifactKind, StabilityOutcome, StabilityWaiter};

//! Prompt in, normalized artifact descriptor out.

use crate::error::GenerateError;
use crate::host::{resolve_artifact, ArtifactDescriptor, HostClient};
use crate::stability::{StabilityOutcome, StabilityWaiter};

/// Drives one generation: call the Host, resolve its reply, wait for the file.
#[derive(Debug, Clone)]
pub struct Generator {
    host: HostClient,
    waiter: StabilityWaiter,
}

impl Generator {
    pub fn new(host: HostClient, waiter: StabilityWaiter) -> Self {
        Self { host, waiter }
    }

    pub fn host(&self) -> &HostClient {
        &self.host
    }

    /// Generate an artifact for `prompt`.
    ///
    /// For file artifacts this waits for the file to settle, but a timeout is
    /// only logged: the descriptor is returned either way.
    pub async fn generate(&self, prompt: &str) -> Result<ArtifactDescriptor, GenerateError> {
        let body = self.host.render(prompt).await?;
        let descriptor = resolve_artifact(&body).ok_or(GenerateError::Unrecognized(body))?;

        if let Some((path, kind)) = descriptor.file() {
            match self.waiter.wait(path, kind).await {
                StabilityOutcome::Stable { size, waited } => {
                    tracing::info!(
                        %kind,
                        path,
                        size,
                        waited_ms = waited.as_millis() as u64,
                        "artifact ready"
                    );
                }
                StabilityOutcome::TimedOut { waited, last_size } => {
                    tracing::warn!(
                        %kind,
                        path,
                        ?last_size,
                        waited_ms = waited.as_millis() as u64,
                        "artifact did not settle before timeout; returning it anyway"
                    );
                }
            }
        } else {
            tracing::info!(kind = descriptor.kind_str(), "inline artifact received");
        }

        Ok(descriptor)
    }
}

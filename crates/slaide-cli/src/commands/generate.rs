use slaide_config::SlaideConfig;
use slaide_core::{GenerateError, Generator, HostClient, HostError, StabilityWaiter};

pub async fn run(config: &SlaideConfig, prompt: &str) -> Result<(), Box<dyn std::error::Error>> {
    let host = HostClient::new(&config.host)?;
    let generator = Generator::new(host, StabilityWaiter::from(config.stability));

    let descriptor = match generator.generate(prompt).await {
        Ok(descriptor) => descriptor,
        Err(GenerateError::Unrecognized(body)) => {
            return Err(format!("Unrecognized Host response: {body}").into());
        }
        Err(GenerateError::Host(HostError::Status { status, body })) => {
            return Err(format!("Host error {status}: {body}").into());
        }
        Err(e) => return Err(e.into()),
    };
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

use slaide_config::SlaideConfig;

pub async fn run(
    mut config: SlaideConfig,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    eprintln!(
        "Starting slaide on http://{}:{} (Host: {})",
        config.server.bind, config.server.port, config.host.url
    );
    eprintln!("Endpoints: /health, /api/artifact, /api/generate, /api/auth/discord/callback");

    slaide_server::serve(config).await?;
    Ok(())
}

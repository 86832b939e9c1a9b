use slaide_config::SlaideConfig;

pub fn run(config: &SlaideConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Secrets serialize as "***".
    print!("{}", config.to_yaml()?);
    Ok(())
}

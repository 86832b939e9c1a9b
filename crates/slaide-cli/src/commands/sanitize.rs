use std::path::Path;

use slaide_core::sanitize;

pub fn run(file: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read(file)?;
    let cleaned = sanitize(&String::from_utf8_lossy(&raw));

    match output {
        Some(output) => {
            std::fs::write(output, &cleaned)?;
            eprintln!(
                "Wrote {} bytes to {} ({} removed)",
                cleaned.len(),
                output.display(),
                raw.len().saturating_sub(cleaned.len())
            );
        }
        None => print!("{}", cleaned),
    }
    Ok(())
}

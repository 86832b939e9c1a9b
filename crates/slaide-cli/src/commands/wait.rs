use std::path::Path;
use std::time::Duration;

use slaide_config::StabilitySection;
use slaide_core::{ArtifactKind, ContentKind, StabilityOutcome, StabilityWaiter};

/// Guess the kind from the extension; anything that is not a PDF is HTML.
fn infer_kind(path: &Path) -> ArtifactKind {
    match ContentKind::from_path(&path.to_string_lossy()) {
        ContentKind::Pdf => ArtifactKind::Pdf,
        _ => ArtifactKind::Html,
    }
}

fn waiter(defaults: StabilitySection, timeout_ms: Option<u64>, interval_ms: Option<u64>) -> StabilityWaiter {
    StabilityWaiter::new(
        Duration::from_millis(timeout_ms.unwrap_or(defaults.timeout_ms)),
        Duration::from_millis(interval_ms.unwrap_or(defaults.interval_ms).max(1)),
    )
}

/// Exit code 0 if the file settled, 1 on timeout.
pub async fn run(
    defaults: StabilitySection,
    path: &Path,
    kind: Option<ArtifactKind>,
    timeout_ms: Option<u64>,
    interval_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = kind.unwrap_or_else(|| infer_kind(path));
    let waiter = waiter(defaults, timeout_ms, interval_ms);

    match waiter.wait(path, kind).await {
        StabilityOutcome::Stable { size, waited } => {
            println!(
                "{} is stable ({} bytes, {} ms)",
                path.display(),
                size,
                waited.as_millis()
            );
            std::process::exit(0);
        }
        StabilityOutcome::TimedOut { waited, last_size } => {
            let last = last_size.map_or_else(|| "none".to_string(), |s| format!("{s} bytes"));
            println!(
                "{} did not settle within {} ms (last size: {})",
                path.display(),
                waited.as_millis(),
                last
            );
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_kind() {
        assert_eq!(infer_kind(Path::new("/out/summary.PDF")), ArtifactKind::Pdf);
        assert_eq!(infer_kind(Path::new("/out/mine.html")), ArtifactKind::Html);
        assert_eq!(infer_kind(Path::new("/out/mine")), ArtifactKind::Html);
    }

    #[test]
    fn test_waiter_overrides() {
        let defaults = StabilitySection::default();
        let w = waiter(defaults, Some(900), None);
        assert_eq!(w.timeout(), Duration::from_millis(900));
        assert_eq!(w.interval(), Duration::from_millis(defaults.interval_ms));

        let w = waiter(defaults, None, Some(0));
        assert_eq!(w.interval(), Duration::from_millis(1));
    }
}

//! Waiting for an artifact file to finish being written.
//!
//! The Host writes artifacts asynchronously and gives no completion signal.
//! A file is considered complete once two consecutive polls observe the same
//! non-zero size; HTML files must additionally end with a closing `</html>`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Number of trailing bytes searched for the closing document tag.
const HTML_TAIL_BYTES: usize = 4096;
const HTML_CLOSING_TAG: &[u8] = b"</html>";

/// What kind of file is being waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Html,
    Pdf,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Html => "html",
            ArtifactKind::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(ArtifactKind::Html),
            "pdf" => Ok(ArtifactKind::Pdf),
            other => Err(format!("unknown artifact kind '{other}' (expected html or pdf)")),
        }
    }
}

/// Result of a stability wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityOutcome {
    /// The file stopped changing.
    Stable { size: u64, waited: Duration },
    /// The timeout elapsed first. `last_size` is the most recent non-zero
    /// size observed, if any.
    TimedOut {
        waited: Duration,
        last_size: Option<u64>,
    },
}

impl StabilityOutcome {
    pub fn is_stable(&self) -> bool {
        matches!(self, StabilityOutcome::Stable { .. })
    }

    pub fn waited(&self) -> Duration {
        match self {
            StabilityOutcome::Stable { waited, .. } | StabilityOutcome::TimedOut { waited, .. } => {
                *waited
            }
        }
    }
}

/// Polls a path until its size settles, bounded by a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityWaiter {
    timeout: Duration,
    interval: Duration,
}

impl Default for StabilityWaiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000), Duration::from_millis(150))
    }
}

impl From<slaide_config::StabilitySection> for StabilityWaiter {
    fn from(section: slaide_config::StabilitySection) -> Self {
        Self::new(
            Duration::from_millis(section.timeout_ms),
            Duration::from_millis(section.interval_ms),
        )
    }
}

impl StabilityWaiter {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until `path` looks completely written.
    ///
    /// Never fails: a missing or unreadable file counts as "not ready yet".
    pub async fn wait(&self, path: impl AsRef<Path>, kind: ArtifactKind) -> StabilityOutcome {
        let path = path.as_ref();
        let started = Instant::now();
        let mut last_size: Option<u64> = None;

        while started.elapsed() < self.timeout {
            if let Some(size) = observe(path, kind).await {
                if size.complete && last_size == Some(size.bytes) {
                    tracing::debug!(path = %path.display(), size = size.bytes, "artifact is stable");
                    return StabilityOutcome::Stable {
                        size: size.bytes,
                        waited: started.elapsed(),
                    };
                }
                tracing::debug!(
                    path = %path.display(),
                    size = size.bytes,
                    complete = size.complete,
                    "artifact still changing"
                );
                last_size = Some(size.bytes);
            }
            tokio::time::sleep(self.interval).await;
        }

        StabilityOutcome::TimedOut {
            waited: started.elapsed(),
            last_size,
        }
    }
}

struct Observation {
    bytes: u64,
    /// Structural completeness; always true for PDFs.
    complete: bool,
}

async fn observe(path: &Path, kind: ArtifactKind) -> Option<Observation> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() || meta.len() == 0 {
        return None;
    }
    match kind {
        ArtifactKind::Pdf => Some(Observation {
            bytes: meta.len(),
            complete: true,
        }),
        ArtifactKind::Html => {
            // Size and tail check must describe the same snapshot.
            let content = tokio::fs::read(path).await.ok()?;
            if content.is_empty() {
                return None;
            }
            Some(Observation {
                bytes: content.len() as u64,
                complete: has_closing_html_tag(&content),
            })
        }
    }
}

/// True if the last few KiB of `content` contain `</html>` (any case).
pub fn has_closing_html_tag(content: &[u8]) -> bool {
    let tail = &content[content.len().saturating_sub(HTML_TAIL_BYTES)..];
    tail.windows(HTML_CLOSING_TAG.len())
        .any(|w| w.eq_ignore_ascii_case(HTML_CLOSING_TAG))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fast() -> StabilityWaiter {
        StabilityWaiter::new(Duration::from_millis(600), Duration::from_millis(20))
    }

    #[test]
    fn test_closing_tag_detection() {
        assert!(has_closing_html_tag(b"<html><body></body></html>\n"));
        assert!(has_closing_html_tag(b"<HTML></HTML>"));
        assert!(!has_closing_html_tag(b"<html><body>"));
        assert!(!has_closing_html_tag(b""));
    }

    #[test]
    fn test_closing_tag_only_in_tail() {
        let mut content = b"<html></html>".to_vec();
        content.extend(std::iter::repeat(b' ').take(HTML_TAIL_BYTES + 10));
        assert!(!has_closing_html_tag(&content));
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("PDF".parse::<ArtifactKind>().unwrap(), ArtifactKind::Pdf);
        assert_eq!("htm".parse::<ArtifactKind>().unwrap(), ArtifactKind::Html);
        assert!("docx".parse::<ArtifactKind>().is_err());
    }

    #[tokio::test]
    async fn test_pdf_with_settled_size_is_stable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("summary.pdf");
        std::fs::write(&path, b"%PDF-1.7 fake").unwrap();

        let outcome = fast().wait(&path, ArtifactKind::Pdf).await;
        assert_eq!(
            outcome,
            StabilityOutcome::Stable {
                size: 13,
                waited: outcome.waited()
            }
        );
        assert!(outcome.waited() < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_complete_html_is_stable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mine.html");
        std::fs::write(&path, "<html><body>slides</body></html>").unwrap();

        assert!(fast().wait(&path, ArtifactKind::Html).await.is_stable());
    }

    #[tokio::test]
    async fn test_truncated_html_times_out() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mine.html");
        std::fs::write(&path, "<html><body>half written").unwrap();

        let outcome = fast().wait(&path, ArtifactKind::Html).await;
        assert_eq!(
            outcome,
            StabilityOutcome::TimedOut {
                waited: outcome.waited(),
                last_size: Some(24)
            }
        );
    }

    #[tokio::test]
    async fn test_missing_file_times_out() {
        let tmp = TempDir::new().unwrap();
        let outcome = fast().wait(tmp.path().join("nope.pdf"), ArtifactKind::Pdf).await;
        assert!(!outcome.is_stable());
        assert!(outcome.waited() >= Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_empty_file_is_not_stable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();

        let outcome = fast().wait(&path, ArtifactKind::Pdf).await;
        assert_eq!(
            outcome,
            StabilityOutcome::TimedOut {
                waited: outcome.waited(),
                last_size: None
            }
        );
    }

    #[tokio::test]
    async fn test_html_observation_uses_read_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.html");
        std::fs::write(&path, "<html><body>ok</body></html>").unwrap();

        let seen = observe(&path, ArtifactKind::Html).await.unwrap();
        assert_eq!(seen.bytes, 28);
        assert!(seen.complete);

        std::fs::write(&path, "<html><body>more to come").unwrap();
        let seen = observe(&path, ArtifactKind::Html).await.unwrap();
        assert_eq!(seen.bytes, 24);
        assert!(!seen.complete);

        std::fs::write(&path, "").unwrap();
        assert!(observe(&path, ArtifactKind::Html).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_growing_file_never_stabilizes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("growing.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let writer = {
            let stop = stop.clone();
            let path = path.clone();
            std::thread::spawn(move || {
                let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
                while !stop.load(Ordering::Relaxed) {
                    file.write_all(b"more bytes").unwrap();
                    std::thread::sleep(Duration::from_millis(2));
                }
            })
        };

        let waiter = StabilityWaiter::new(Duration::from_millis(300), Duration::from_millis(40));
        let outcome = waiter.wait(&path, ArtifactKind::Pdf).await;
        stop.store(true, Ordering::Relaxed);
        writer.join().unwrap();

        assert!(!outcome.is_stable());
        assert!(matches!(
            outcome,
            StabilityOutcome::TimedOut { last_size: Some(size), .. } if size > 4
        ));
    }

    #[tokio::test]
    async fn test_file_appearing_later_becomes_stable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("late.html");

        let writer_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            tokio::fs::write(&writer_path, "<html><p>late</p></html>")
                .await
                .unwrap();
        });

        let outcome = fast().wait(&path, ArtifactKind::Html).await;
        assert!(outcome.is_stable());
        assert!(outcome.waited() >= Duration::from_millis(60));
    }

    #[test]
    fn test_from_config_section() {
        let waiter = StabilityWaiter::from(slaide_config::StabilitySection {
            timeout_ms: 1000,
            interval_ms: 50,
        });
        assert_eq!(waiter.timeout(), Duration::from_millis(1000));
        assert_eq!(waiter.interval(), Duration::from_millis(50));
    }
}

//! Section extraction: materialize each inferred section as a standalone PDF
//! containing only its page range.
//!
//! The page copy is delegated to qpdf rather than re-encoding the document —
//! a deliberate trade: page content survives intact, but hyperlinks crossing
//! the cut do not (accepted limitation). Existence of the destination path is
//! the sole cache check; there is no content hashing and no lock, so two
//! processes extracting the same section concurrently race (known
//! limitation).

use std::path::Path;

use tokio::process::Command;

use crate::{ManualStats, Section};

/// Outcome of one section extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// qpdf ran and reported success.
    Extracted,
    /// The destination file already existed; nothing was run.
    Cached,
    /// qpdf failed to start or exited non-zero. The section has no file and
    /// is treated as missing text downstream.
    Failed(String),
}

/// Extract a single section, unless its output file already exists.
///
/// qpdf takes a 1-indexed inclusive page range, so the section's
/// `[page_from, page_to)` becomes `page_from+1 .. page_to`.
pub async fn extract_section(qpdf: &str, source: &Path, section: &Section) -> SectionOutcome {
    if section.path.is_file() {
        return SectionOutcome::Cached;
    }

    let range = format!("{}-{}", section.page_from + 1, section.page_to);
    let status = Command::new(qpdf)
        .arg("--empty")
        .arg("--pages")
        .arg(source)
        .arg(&range)
        .arg("--")
        .arg(&section.path)
        .status()
        .await;

    match status {
        Ok(status) if status.success() => SectionOutcome::Extracted,
        Ok(status) => SectionOutcome::Failed(format!("qpdf exited with {status}")),
        Err(e) => SectionOutcome::Failed(format!("failed to run {qpdf}: {e}")),
    }
}

/// Extract every section of a manual, observing each outcome.
///
/// Failures are confined to the section they occur in; the remaining
/// sections are still attempted.
pub async fn extract_sections(
    qpdf: &str,
    source: &Path,
    sections: &[Section],
    mut observe: impl FnMut(&Section, &SectionOutcome),
) -> ManualStats {
    let mut stats = ManualStats {
        sections: sections.len(),
        ..ManualStats::default()
    };

    for section in sections {
        let outcome = extract_section(qpdf, source, section).await;
        match &outcome {
            SectionOutcome::Extracted => stats.extracted += 1,
            SectionOutcome::Cached => stats.cached += 1,
            SectionOutcome::Failed(error) => {
                tracing::warn!(
                    source = %source.display(),
                    section = %section.title,
                    error,
                    "section extraction failed"
                );
                stats.failed += 1;
            }
        }
        observe(section, &outcome);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn section(title: &str, from: u32, to: u32, path: PathBuf) -> Section {
        Section {
            title: title.to_string(),
            page_from: from,
            page_to: to,
            path,
        }
    }

    #[tokio::test]
    async fn existing_output_is_never_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("RM.pdf.USART.pdf");
        std::fs::write(&out, b"cached").unwrap();

        // A qpdf binary that cannot exist: if the cache check were skipped,
        // the outcome would be Failed.
        let s = section("USART", 10, 20, out.clone());
        let outcome = extract_section("/nonexistent/qpdf", dir.path(), &s).await;

        assert_eq!(outcome, SectionOutcome::Cached);
        assert_eq!(std::fs::read(&out).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn missing_binary_fails_only_that_section() {
        let dir = tempfile::tempdir().unwrap();
        let sections = vec![
            section("FOO", 0, 5, dir.path().join("a.pdf")),
            section("BAR", 5, 9, dir.path().join("b.pdf")),
        ];

        let mut seen = Vec::new();
        let stats = extract_sections(
            "/nonexistent/qpdf",
            Path::new("/nonexistent/src.pdf"),
            &sections,
            |s, o| seen.push((s.title.clone(), o.clone())),
        )
        .await;

        assert_eq!(stats.sections, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.extracted, 0);
        // Both sections were attempted despite the first failure.
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn successful_exit_counts_as_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let s = section("FOO", 0, 5, dir.path().join("a.pdf"));

        // `true` accepts any arguments and exits 0 — stands in for qpdf.
        let stats = extract_sections("true", Path::new("/src.pdf"), &[s], |_, _| {}).await;
        assert_eq!(stats.extracted, 1);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn mixed_cached_and_failed() {
        let dir = tempfile::tempdir().unwrap();
        let cached_path = dir.path().join("cached.pdf");
        std::fs::write(&cached_path, b"x").unwrap();

        let sections = vec![
            section("FOO", 0, 5, cached_path),
            section("BAR", 5, 9, dir.path().join("missing.pdf")),
        ];
        let stats = extract_sections(
            "/nonexistent/qpdf",
            Path::new("/src.pdf"),
            &sections,
            |_, _| {},
        )
        .await;

        assert_eq!(stats.cached, 1);
        assert_eq!(stats.failed, 1);
    }
}

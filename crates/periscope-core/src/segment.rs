//! Outline segmentation: infer ordered, non-overlapping page ranges for
//! named peripheral sections from a document's bookmark tree.
//!
//! The outline is treated as a flat ordered sequence, not a tree. A single
//! linear pass pairs each qualifying entry (one with a parenthesized
//! abbreviation in its title) with the next qualifying entry's page; the
//! outline provides section boundaries only implicitly, via ordering.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::{BackendError, OutlineEntry, PdfBackend};
use crate::Section;

/// Matches titles like "Universal synchronous/asynchronous receiver (USART)"
/// and captures the abbreviation. Entries without such a token are structural
/// headers, not peripherals.
static PERIPHERAL_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".+\(([A-Za-z0-9/]+)\).*").unwrap());

/// Extract the peripheral abbreviation from an outline title, if present.
pub fn peripheral_abbreviation(title: &str) -> Option<&str> {
    PERIPHERAL_TITLE
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Destination path for an extracted section: `<manual path>.<abbrev>.pdf`,
/// with path-illegal characters in the abbreviation replaced.
fn section_path(manual_path: &Path, abbreviation: &str) -> PathBuf {
    let sanitized = abbreviation.replace('/', "_");
    let mut os = manual_path.as_os_str().to_owned();
    os.push(format!(".{sanitized}.pdf"));
    PathBuf::from(os)
}

/// Segment a flattened outline into ordered, non-overlapping sections.
///
/// Each qualifying entry opens a section at its destination page; the next
/// qualifying entry closes it. The final section has no successor and is
/// closed at the document's last page. Outlines are not trusted to be
/// page-monotonic: a qualifying entry pointing before the previously opened
/// section is skipped, so retained sections stay ordered and closing one
/// against its successor can never produce an overlap. Degenerate ranges
/// (outline entries pointing at or past the end of the document, or two
/// peripherals sharing a page) are dropped with a warning.
pub fn segment_outline(
    entries: &[OutlineEntry],
    page_count: u32,
    manual_path: &Path,
) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    for entry in entries {
        let Some(abbrev) = peripheral_abbreviation(&entry.title) else {
            continue;
        };
        if let Some(open) = sections.last_mut() {
            if entry.page < open.page_from {
                tracing::warn!(
                    manual = %manual_path.display(),
                    section = abbrev,
                    page = entry.page,
                    "skipping out-of-order outline entry"
                );
                continue;
            }
            open.page_to = entry.page;
        }
        sections.push(Section {
            title: abbrev.to_string(),
            page_from: entry.page,
            page_to: page_count,
            path: section_path(manual_path, abbrev),
        });
    }

    sections.retain(|s| {
        let well_formed = s.page_from < s.page_to && s.page_to <= page_count;
        if !well_formed {
            tracing::warn!(
                manual = %manual_path.display(),
                section = %s.title,
                from = s.page_from,
                to = s.page_to,
                pages = page_count,
                "dropping degenerate section range"
            );
        }
        well_formed
    });

    sections
}

/// Segment one manual: read its outline and page count, then infer sections.
///
/// Any backend failure (corrupt file, missing outline) fails the whole
/// manual — callers record it as analyzed-but-empty rather than retrying.
/// Pure read: no files are written here.
pub fn analyze_manual(
    backend: &dyn PdfBackend,
    manual_path: &Path,
) -> Result<Vec<Section>, BackendError> {
    let entries = backend.read_outline(manual_path)?;
    let page_count = backend.page_count(manual_path)?;
    Ok(segment_outline(&entries, page_count, manual_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, page: u32) -> OutlineEntry {
        OutlineEntry {
            title: title.to_string(),
            page,
        }
    }

    #[test]
    fn abbreviation_extraction() {
        assert_eq!(
            peripheral_abbreviation("Universal synchronous/asynchronous receiver (USART)"),
            Some("USART")
        );
        assert_eq!(
            peripheral_abbreviation("Inter-integrated circuit (I2C) interface"),
            Some("I2C")
        );
        assert_eq!(peripheral_abbreviation("Memory and bus architecture"), None);
        // A bare parenthesized token with no preceding text is not a title.
        assert_eq!(peripheral_abbreviation("(USART)"), None);
    }

    #[test]
    fn interleaved_non_matching_entries_are_ignored() {
        let entries = vec![
            entry("A (FOO)", 10),
            entry("B", 40),
            entry("C (BAR)", 55),
            entry("D (BAZ)", 90),
        ];
        let sections = segment_outline(&entries, 120, Path::new("/data/RM0001.pdf"));

        assert_eq!(sections.len(), 3);
        assert_eq!(
            sections
                .iter()
                .map(|s| (s.title.as_str(), s.page_from, s.page_to))
                .collect::<Vec<_>>(),
            vec![("FOO", 10, 55), ("BAR", 55, 90), ("BAZ", 90, 120)]
        );
    }

    #[test]
    fn adjacent_sections_share_boundaries_and_never_overlap() {
        let entries = vec![
            entry("General-purpose I/Os (GPIO)", 3),
            entry("Direct memory access (DMA)", 17),
            entry("Reset and clock control (RCC)", 17 + 20),
            entry("Power control (PWR)", 80),
        ];
        let sections = segment_outline(&entries, 200, Path::new("/data/RM.pdf"));

        for pair in sections.windows(2) {
            assert_eq!(pair[0].page_to, pair[1].page_from);
        }
        for s in &sections {
            assert!(s.page_to > s.page_from);
        }
    }

    #[test]
    fn last_section_is_closed_at_document_end() {
        let entries = vec![entry("Watchdog (IWDG)", 100)];
        let sections = segment_outline(&entries, 150, Path::new("/data/RM.pdf"));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].page_to, 150);
    }

    #[test]
    fn slash_in_abbreviation_is_sanitized_in_path_only() {
        let entries = vec![entry("Filesystem controller (FS/HS)", 5)];
        let sections = segment_outline(&entries, 30, Path::new("/data/RM0002.pdf"));
        assert_eq!(sections[0].title, "FS/HS");
        assert_eq!(
            sections[0].path,
            PathBuf::from("/data/RM0002.pdf.FS_HS.pdf")
        );
    }

    #[test]
    fn degenerate_ranges_are_dropped() {
        // Entry at the very last page cannot hold a non-empty range; two
        // peripherals on the same page leave the first one empty.
        let entries = vec![
            entry("A (FOO)", 12),
            entry("B (BAR)", 12),
            entry("C (BAZ)", 29),
        ];
        let sections = segment_outline(&entries, 30, Path::new("/data/RM.pdf"));
        assert_eq!(
            sections
                .iter()
                .map(|s| s.title.as_str())
                .collect::<Vec<_>>(),
            vec!["BAR", "BAZ"]
        );
    }

    #[test]
    fn out_of_order_entries_are_skipped_without_overlap() {
        // A bookmark jumping backwards must not carve a range overlapping
        // its neighbours.
        let entries = vec![
            entry("A (FOO)", 10),
            entry("B (BAR)", 60),
            entry("C (BAZ)", 20),
        ];
        let sections = segment_outline(&entries, 120, Path::new("/data/RM.pdf"));

        assert_eq!(
            sections
                .iter()
                .map(|s| (s.title.as_str(), s.page_from, s.page_to))
                .collect::<Vec<_>>(),
            vec![("FOO", 10, 60), ("BAR", 60, 120)]
        );
        for pair in sections.windows(2) {
            assert!(pair[0].page_to <= pair[1].page_from);
        }
    }

    #[test]
    fn empty_outline_yields_no_sections() {
        let sections = segment_outline(&[], 100, Path::new("/data/RM.pdf"));
        assert!(sections.is_empty());
    }
}

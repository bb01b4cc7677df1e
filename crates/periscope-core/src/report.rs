//! Cross-manual similarity report for one named section.
//!
//! For a requested section title, collect that section's text from every
//! manual (empty placeholder where it is missing, so matrix rows stay
//! aligned with the manual list), vectorize, cluster, and group the manuals.

use std::io::Write;

use thiserror::Error;

use crate::cluster::cluster_similarity;
use crate::vectorize::vectorize;
use crate::{Manual, PdfBackend};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("no manuals to compare")]
    NoManuals,
    #[error(
        "section '{0}' produced an empty vocabulary — no manual has any text for it \
         (not yet analyzed, or every extraction failed)"
    )]
    EmptyCorpus(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One manual's row in a similarity group.
#[derive(Debug, Clone)]
pub struct GroupMember {
    /// Index into the manual list the report was built from.
    pub index: usize,
    pub title: String,
    /// Length of the extracted section text — a crude proxy for how rich
    /// the section is. Zero means the section was missing in this manual.
    pub text_len: usize,
    pub description: String,
}

/// A cluster of manuals whose requested section reads alike.
#[derive(Debug, Clone)]
pub struct SectionGroup {
    pub id: usize,
    pub members: Vec<GroupMember>,
}

/// Grouped similarity result for one section title across all manuals.
#[derive(Debug, Clone)]
pub struct SimilarityReport {
    pub section_title: String,
    pub groups: Vec<SectionGroup>,
}

impl SimilarityReport {
    /// Render the human-readable grouped listing.
    pub fn render(&self, w: &mut impl Write) -> std::io::Result<()> {
        for group in &self.groups {
            writeln!(
                w,
                "Similar {} peripherals (group {}):",
                self.section_title,
                group.id + 1
            )?;
            for m in &group.members {
                writeln!(
                    w,
                    "\t[{:2}] {}, {} chars: {}",
                    m.index, m.title, m.text_len, m.description
                )?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

/// Locate `section_title` in a manual and pull its text.
///
/// Missing section, duplicate title, or unreadable section file all reduce
/// to an empty placeholder — logged, never fatal, so the manual keeps its
/// row in the comparison matrix.
fn section_text(manual: &Manual, section_title: &str, backend: &dyn PdfBackend) -> String {
    let Some(sections) = manual.sections.as_ref() else {
        tracing::warn!(manual = %manual.title, "manual not yet analyzed, using empty text");
        return String::new();
    };

    let mut matches = sections.iter().filter(|s| s.title == section_title);
    let Some(section) = matches.next() else {
        tracing::warn!(
            manual = %manual.title,
            section = section_title,
            "section not found, using empty text"
        );
        return String::new();
    };
    if matches.next().is_some() {
        tracing::warn!(
            manual = %manual.title,
            section = section_title,
            "section title appears multiple times, using first match"
        );
    }

    match backend.extract_text(&section.path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                manual = %manual.title,
                section = section_title,
                path = %section.path.display(),
                error = %e,
                "section text unavailable, using empty text"
            );
            String::new()
        }
    }
}

/// Build the similarity report for `section_title` across `manuals`.
///
/// Exact title match only. Every manual participates — manuals without the
/// section become zero-length documents. Fails only when there is nothing
/// to compare at all.
pub fn build_report(
    manuals: &[Manual],
    section_title: &str,
    backend: &dyn PdfBackend,
) -> Result<SimilarityReport, ReportError> {
    if manuals.is_empty() {
        return Err(ReportError::NoManuals);
    }

    let texts: Vec<String> = manuals
        .iter()
        .map(|m| section_text(m, section_title, backend))
        .collect();

    let vectorized = vectorize(&texts);
    if vectorized.vocabulary_len == 0 {
        return Err(ReportError::EmptyCorpus(section_title.to_string()));
    }

    let labels = cluster_similarity(&vectorized.similarity);

    let group_count = labels.iter().max().map_or(0, |&m| m + 1);
    let mut groups: Vec<SectionGroup> = (0..group_count)
        .map(|id| SectionGroup {
            id,
            members: Vec::new(),
        })
        .collect();

    for (index, (&label, manual)) in labels.iter().zip(manuals).enumerate() {
        groups[label].members.push(GroupMember {
            index,
            title: manual.title.clone(),
            text_len: texts[index].len(),
            description: manual.description.clone(),
        });
    }

    tracing::info!(
        section = section_title,
        manuals = manuals.len(),
        groups = groups.len(),
        "similarity report built"
    );

    Ok(SimilarityReport {
        section_title: section_title.to_string(),
        groups,
    })
}

use std::io::Write;

use owo_colors::OwoColorize;

use periscope_core::{ProgressEvent, SimilarityReport};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print a real-time analysis progress event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::Analyzing {
            index,
            total,
            title,
        } => {
            writeln!(w, "[{}/{}] Analyzing: {}", index + 1, total, title)?;
        }
        ProgressEvent::Segmented {
            index,
            total,
            title,
            sections,
        } => {
            writeln!(
                w,
                "[{}/{}] {}: {} sections found",
                index + 1,
                total,
                title,
                sections
            )?;
        }
        ProgressEvent::SegmentationFailed {
            index,
            total,
            title,
            error,
        } => {
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] {}: {} ({})",
                    index + 1,
                    total,
                    title,
                    "SEGMENTATION FAILED".red(),
                    error
                )?;
            } else {
                writeln!(
                    w,
                    "[{}/{}] {}: SEGMENTATION FAILED ({})",
                    index + 1,
                    total,
                    title,
                    error
                )?;
            }
        }
        ProgressEvent::SectionFailed {
            section, error, ..
        } => {
            if color.enabled() {
                writeln!(w, "  {} {} ({})", "FAILED".red(), section, error)?;
            } else {
                writeln!(w, "  FAILED {} ({})", section, error)?;
            }
        }
        // Per-section successes are high-volume noise at the console; the
        // per-manual summary covers them.
        ProgressEvent::SectionExtracted { .. } | ProgressEvent::SectionCached { .. } => {}
        ProgressEvent::ManualComplete {
            index,
            total,
            title,
            stats,
        } => {
            let summary = format!(
                "{} sections ({} extracted, {} cached, {} failed)",
                stats.sections, stats.extracted, stats.cached, stats.failed
            );
            if color.enabled() && stats.failed > 0 {
                writeln!(
                    w,
                    "[{}/{}] {}: {}",
                    index + 1,
                    total,
                    title,
                    summary.yellow()
                )?;
            } else {
                writeln!(w, "[{}/{}] {}: {}", index + 1, total, title, summary)?;
            }
        }
    }
    Ok(())
}

/// Print the grouped similarity report.
pub fn print_report(
    mut w: &mut dyn Write,
    report: &SimilarityReport,
    color: ColorMode,
) -> std::io::Result<()> {
    if !color.enabled() {
        return report.render(&mut w);
    }

    for group in &report.groups {
        writeln!(
            w,
            "{}",
            format!(
                "Similar {} peripherals (group {}):",
                report.section_title,
                group.id + 1
            )
            .bold()
        )?;
        for m in &group.members {
            if m.text_len == 0 {
                writeln!(
                    w,
                    "\t[{:2}] {}, {}: {}",
                    m.index,
                    m.title.cyan(),
                    "no text".dimmed(),
                    m.description
                )?;
            } else {
                writeln!(
                    w,
                    "\t[{:2}] {}, {} chars: {}",
                    m.index,
                    m.title.cyan(),
                    m.text_len,
                    m.description
                )?;
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

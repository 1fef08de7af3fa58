//! Removal of sections that overlap non-structural content.

use crate::config::NONSECTION_CATEGORIES;
use crate::error::{ParserError, Result};
use crate::sanitize::{merge_overlapping, SanitizedAnnotations};
use crate::types::{Annotation, Section};

/// Effective `[start, end)` range of a section.
///
/// Starts at the header (or first paragraph) and ends at the last paragraph
/// (or header). Returns `None` for a section with neither.
#[must_use]
pub fn section_range(section: &Section) -> Option<(usize, usize)> {
    let first = section.paragraphs.first();
    let last = section.paragraphs.last();

    let start = section
        .header
        .as_ref()
        .map(|h| h.start)
        .or_else(|| first.map(|p| p.start))?;
    let end = last
        .map(|p| p.end)
        .or_else(|| section.header.as_ref().map(|h| h.end))?;

    Some((start, end))
}

/// Drop sections overlapping titles, abstracts, author and bibliography
/// metadata, figures or tables.
///
/// # Errors
/// Returns `ParserError::InvariantViolation` when a section has neither a
/// header nor paragraphs.
pub fn remove_nonsection_sections(
    corpusid: i64,
    annotations: &SanitizedAnnotations,
    sections: Vec<Section>,
) -> Result<Vec<Section>> {
    let mut ranges: Vec<Annotation> = NONSECTION_CATEGORIES
        .iter()
        .flat_map(|category| annotations.get(category).iter())
        .map(|ann| Annotation::new(ann.start, ann.end))
        .collect();
    ranges.sort_by_key(|r| r.start);
    let ranges = merge_overlapping(ranges);

    let mut kept = Vec::with_capacity(sections.len());
    for (index, section) in sections.into_iter().enumerate() {
        let Some((start, end)) = section_range(&section) else {
            return Err(ParserError::InvariantViolation {
                corpusid,
                message: format!("section {index} has neither a header nor paragraphs"),
            });
        };

        if overlaps_any(&ranges, start, end) {
            tracing::trace!(
                start,
                end,
                numbering = %section.numbering,
                "dropping non-structural section"
            );
            continue;
        }
        kept.push(section);
    }

    Ok(kept)
}

/// Check `[start, end)` against sorted, disjoint ranges.
fn overlaps_any(ranges: &[Annotation], start: usize, end: usize) -> bool {
    // Ranges ending at or before `start` cannot overlap; the first one that
    // ends later is the only candidate.
    let candidate = ranges.partition_point(|r| r.end <= start);
    ranges.get(candidate).is_some_and(|r| r.start < end)
}

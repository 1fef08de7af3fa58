//! Grouping paragraphs under section headers.

use crate::config::{ATTR_NUMBERING, SECTION_HEADER};
use crate::sanitize::SanitizedAnnotations;
use crate::text::SourceText;
use crate::types::{Paragraph, Section};

/// Build one section per header and distribute paragraphs over them.
///
/// Paragraphs ending before the first header (or all paragraphs, when there
/// are no headers) go to a synthetic headerless section, which is prepended
/// only when it received paragraphs. Any other paragraph belongs to the last
/// section whose header ends before the paragraph starts; a paragraph with
/// no such section is dropped.
pub fn assign_paragraphs_to_sections(
    annotations: &SanitizedAnnotations,
    source: &SourceText<'_>,
    paragraphs: Vec<Paragraph>,
) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    // Header (start, end) per section, parallel to `sections`.
    let mut bounds: Vec<(usize, usize)> = Vec::new();

    for ann in annotations.get(SECTION_HEADER) {
        let header = source.span(ann.start, ann.end);

        let repeated = sections
            .last()
            .and_then(|s| s.header.as_ref())
            .is_some_and(|prev| prev.text == header.text);
        if repeated {
            continue;
        }

        let numbering = ann.attributes.get(ATTR_NUMBERING).cloned().unwrap_or_default();
        bounds.push((ann.start, ann.end));
        sections.push(Section::with_header(numbering, header));
    }

    let mut leading = Section::synthetic();
    let mut dropped = 0usize;

    for paragraph in paragraphs {
        match bounds.first() {
            Some(&(first_start, _)) if paragraph.end >= first_start => {
                // Header ends increase with header starts, so the sections
                // ending before the paragraph form a prefix.
                let preceding = bounds.partition_point(|&(_, end)| end < paragraph.start);
                match preceding.checked_sub(1) {
                    Some(index) => sections[index].paragraphs.push(paragraph),
                    None => dropped += 1,
                }
            }
            _ => leading.paragraphs.push(paragraph),
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "paragraphs overlapping the first section header were dropped");
    }

    if !leading.paragraphs.is_empty() {
        sections.insert(0, leading);
    }

    sections
}

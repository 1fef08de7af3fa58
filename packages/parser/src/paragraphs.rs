//! Paragraph assembly.
//!
//! Attaches in-text references (citations, figure, table and formula
//! pointers) to the paragraphs that fully contain them, then collapses runs
//! of partially duplicated paragraph extractions.

use crate::config::{ATTR_REF_ID, PARAGRAPH};
use crate::sanitize::SanitizedAnnotations;
use crate::text::SourceText;
use crate::types::{Paragraph, RefType, Reference};

/// A reference span before it is attached to a paragraph.
#[derive(Debug, Clone)]
struct ReferenceSpan {
    ref_id: Option<String>,
    ref_type: RefType,
    start: usize,
    end: usize,
}

/// Build the deduplicated paragraph list of a record.
pub fn build_paragraphs(
    annotations: &SanitizedAnnotations,
    source: &SourceText<'_>,
) -> Vec<Paragraph> {
    let refs = collect_reference_spans(annotations);

    let paragraphs = annotations
        .get(PARAGRAPH)
        .iter()
        .map(|ann| {
            let mut paragraph = Paragraph {
                start: ann.start,
                end: ann.end,
                text: source.slice(ann.start, ann.end).to_string(),
                refs: Vec::new(),
            };
            attach_references(&mut paragraph, &refs, source);
            paragraph
        })
        .collect();

    dedup_paragraphs(paragraphs)
}

/// Gather all reference spans sorted by start.
///
/// `ref_id` is passed through as written; an empty id stays `Some("")`.
fn collect_reference_spans(annotations: &SanitizedAnnotations) -> Vec<ReferenceSpan> {
    let mut refs: Vec<ReferenceSpan> = RefType::ALL
        .iter()
        .flat_map(|ref_type| {
            annotations
                .get(ref_type.category())
                .iter()
                .map(move |ann| ReferenceSpan {
                    ref_id: ann.attributes.get(ATTR_REF_ID).cloned(),
                    ref_type: *ref_type,
                    start: ann.start,
                    end: ann.end,
                })
        })
        .collect();

    refs.sort_by_key(|r| r.start);
    refs
}

/// Attach every reference contained in the paragraph bounds.
fn attach_references(paragraph: &mut Paragraph, refs: &[ReferenceSpan], source: &SourceText<'_>) {
    let first = refs.partition_point(|r| r.start < paragraph.start);

    for r in &refs[first..] {
        // A contained reference must start before the paragraph ends.
        if r.start >= paragraph.end {
            break;
        }
        if r.end > paragraph.end {
            continue;
        }

        paragraph.refs.push(Reference {
            ref_id: r.ref_id.clone(),
            ref_type: r.ref_type,
            start: r.start,
            end: r.end,
            text: source.slice(r.start, r.end).to_string(),
            relative_start: r.start - paragraph.start,
            relative_end: r.end - paragraph.start,
        });
    }
}

/// Collapse consecutive near-duplicate paragraphs.
///
/// The kept paragraph is replaced by the current one when the current text
/// starts with the kept text, or when the texts are equal and the current
/// paragraph carries strictly more references.
#[must_use]
pub fn dedup_paragraphs(paragraphs: Vec<Paragraph>) -> Vec<Paragraph> {
    let mut kept: Vec<Paragraph> = Vec::with_capacity(paragraphs.len());

    for current in paragraphs {
        match kept.last_mut() {
            Some(prev) if supersedes(&current, prev) => *prev = current,
            _ => kept.push(current),
        }
    }

    kept
}

fn supersedes(current: &Paragraph, prev: &Paragraph) -> bool {
    current.text.starts_with(&prev.text)
        || (current.text == prev.text && current.refs.len() > prev.refs.len())
}

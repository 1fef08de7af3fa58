//! Reference index construction.
//!
//! Builds the bibliography, formula, table and figure indices of a record.
//! Every indexed item gets an identifier: the explicit `id` attribute when
//! present, otherwise one minted from a counter shared by all categories of
//! the record.

use std::collections::BTreeMap;

use crate::config::{
    ATTR_ID, ATTR_MATCHED_PAPER_ID, ATTR_TYPE, BIB_ENTRY, FIGURE, FORMULA, UNREF_PREFIX,
};
use crate::sanitize::SanitizedAnnotations;
use crate::text::SourceText;
use crate::types::{Annotation, BibliographyEntry, ReferencedItem};

/// Mints synthetic identifiers for items without an explicit id.
///
/// One minter belongs to exactly one record.
#[derive(Debug, Default)]
pub struct IdMinter {
    next: usize,
}

impl IdMinter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next synthetic identifier (`unref_0`, `unref_1`, ...).
    pub fn mint(&mut self) -> String {
        let id = format!("{UNREF_PREFIX}{}", self.next);
        self.next += 1;
        id
    }

    /// The explicit `id` attribute of an annotation, or a minted one.
    pub fn resolve(&mut self, annotation: &Annotation) -> String {
        match annotation.attribute(ATTR_ID) {
            Some(id) => id.to_string(),
            None => self.mint(),
        }
    }
}

/// The four reference indices of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    pub bibliography: BTreeMap<String, BibliographyEntry>,
    pub formulas: BTreeMap<String, ReferencedItem>,
    pub tables: BTreeMap<String, ReferencedItem>,
    pub figures: BTreeMap<String, ReferencedItem>,
}

/// Build all reference indices.
///
/// Categories are processed in a fixed order (bibliography, formulas,
/// figures/tables) so synthetic identifiers are deterministic. Within each
/// index the first occurrence of an identifier wins.
pub fn build_referenced_items(
    annotations: &SanitizedAnnotations,
    source: &SourceText<'_>,
    minter: &mut IdMinter,
) -> ReferenceIndex {
    let mut index = ReferenceIndex::default();

    for ann in annotations.get(BIB_ENTRY) {
        let ref_id = minter.resolve(ann);
        index
            .bibliography
            .entry(ref_id.clone())
            .or_insert_with(|| bibliography_entry(ref_id, ann, source));
    }

    for ann in annotations.get(FORMULA) {
        let ref_id = minter.resolve(ann);
        index
            .formulas
            .entry(ref_id.clone())
            .or_insert_with(|| referenced_item(ref_id, ann, source));
    }

    // Tables are read from the figure category, which carries the `type`
    // attribute; the separate table category is not indexed.
    for ann in annotations.get(FIGURE) {
        let ref_id = minter.resolve(ann);
        let target = if ann.attribute(ATTR_TYPE) == Some("table") {
            &mut index.tables
        } else {
            &mut index.figures
        };
        target
            .entry(ref_id.clone())
            .or_insert_with(|| referenced_item(ref_id, ann, source));
    }

    index
}

fn referenced_item(ref_id: String, ann: &Annotation, source: &SourceText<'_>) -> ReferencedItem {
    ReferencedItem {
        ref_id,
        text: source.slice(ann.start, ann.end).to_string(),
        start: ann.start,
        end: ann.end,
    }
}

fn bibliography_entry(
    ref_id: String,
    ann: &Annotation,
    source: &SourceText<'_>,
) -> BibliographyEntry {
    let corpusid = ann
        .attribute(ATTR_MATCHED_PAPER_ID)
        .and_then(|id| id.trim().parse().ok());

    let externalids = ann
        .attributes
        .iter()
        .filter(|(k, _)| k.as_str() != ATTR_ID && k.as_str() != ATTR_MATCHED_PAPER_ID)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    BibliographyEntry {
        ref_id,
        text: source.slice(ann.start, ann.end).to_string(),
        start: ann.start,
        end: ann.end,
        corpusid,
        externalids,
    }
}

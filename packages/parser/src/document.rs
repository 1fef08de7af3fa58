//! Document builder that ties all components together.

use crate::config::{ABSTRACT, TITLE};
use crate::error::Result;
use crate::paragraphs::build_paragraphs;
use crate::references::{build_referenced_items, IdMinter};
use crate::sanitize::{sanitize_annotations, SanitizedAnnotations};
use crate::sections::{assign_paragraphs_to_sections, nest_sections, remove_nonsection_sections};
use crate::text::SourceText;
use crate::types::{Document, RawRecord, Span};

/// Build the hierarchical document for one raw record.
///
/// Runs sanitization, reference resolution, paragraph assembly, section
/// assignment, filtering and nesting in that order. The function is pure:
/// it shares no state with other invocations and may run concurrently for
/// different records.
///
/// # Arguments
/// * `record` - The decoded corpus record
///
/// # Returns
/// A `Document` whose `warnings` list any annotation categories that could
/// only be partially sanitized
///
/// # Errors
/// Returns `ParserError::InvariantViolation` if section construction
/// produced a section without header and paragraphs.
pub fn build_document(record: &RawRecord) -> Result<Document> {
    let _span = tracing::debug_span!("build_document", corpusid = record.corpusid).entered();

    let text = record.content.text.as_deref().unwrap_or_default();
    let source = SourceText::new(text);

    let (annotations, sanitize_warnings) =
        sanitize_annotations(&record.content.annotations, source.len());

    let mut minter = IdMinter::new();
    let index = build_referenced_items(&annotations, &source, &mut minter);

    let paragraphs = build_paragraphs(&annotations, &source);
    let sections = assign_paragraphs_to_sections(&annotations, &source, paragraphs);
    let sections = remove_nonsection_sections(record.corpusid, &annotations, sections)?;
    let sections = nest_sections(sections);

    tracing::debug!(
        sections = sections.len(),
        bibliography = index.bibliography.len(),
        warnings = sanitize_warnings.len(),
        "built document"
    );

    Ok(Document {
        corpusid: record.corpusid,
        externalids: record.externalids.clone(),
        title: first_span(&annotations, &source, TITLE),
        abstract_: first_span(&annotations, &source, ABSTRACT),
        sections,
        bibliography: index.bibliography,
        figures: index.figures,
        tables: index.tables,
        formulas: index.formulas,
        warnings: sanitize_warnings.iter().map(ToString::to_string).collect(),
    })
}

/// The earliest span of a category, if any.
fn first_span(
    annotations: &SanitizedAnnotations,
    source: &SourceText<'_>,
    category: &str,
) -> Option<Span> {
    annotations
        .get(category)
        .first()
        .map(|ann| source.span(ann.start, ann.end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RefType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_single_paragraph_with_citation() {
        let raw = record(json!({
            "corpusid": 1,
            "externalids": {},
            "content": {
                "text": "Hello world. See [1]. [1] Smith 2020.",
                "annotations": {
                    "paragraph": [{"start": 0, "end": 21}],
                    "bibref": [{"start": 17, "end": 20, "attributes": {"ref_id": "1"}}],
                    "bibentry": [{"start": 22, "end": 37, "attributes": {"id": "1"}}]
                }
            }
        }));

        let document = build_document(&raw).unwrap();

        assert_eq!(document.sections.len(), 1);
        let section = &document.sections[0];
        assert!(section.header.is_none());
        assert_eq!(section.paragraphs.len(), 1);
        let paragraph = &section.paragraphs[0];
        assert_eq!(paragraph.text, "Hello world. See [1].");
        assert_eq!(paragraph.refs.len(), 1);
        assert_eq!(paragraph.refs[0].ref_type, RefType::Bibref);
        assert_eq!(paragraph.refs[0].ref_id.as_deref(), Some("1"));
        assert_eq!(document.bibliography.len(), 1);
        assert_eq!(document.bibliography["1"].text, "[1] Smith 2020.");
    }

    #[test]
    fn test_malformed_categories_do_not_drop_paragraphs() {
        let raw = record(json!({
            "corpusid": 3,
            "externalids": {},
            "content": {
                "text": "Hello world. See [1]. [1] Smith 2020.",
                "annotations": {
                    "paragraph": [{"start": 0, "end": 21}],
                    "bibentry": [{"start": 22, "end": 37, "attributes": "oops"}],
                    "figure": 7
                }
            }
        }));

        let document = build_document(&raw).unwrap();

        assert_eq!(document.sections.len(), 1);
        assert_eq!(document.sections[0].paragraphs[0].text, "Hello world. See [1].");
        assert!(document.bibliography.is_empty());
        assert!(document.figures.is_empty());
        assert_eq!(document.warnings.len(), 2);
        assert!(document.warnings.iter().any(|w| w.starts_with("bibentry annotations")));
        assert!(document.warnings.iter().any(|w| w.starts_with("figure annotations")));
    }

    #[test]
    fn test_null_text_and_missing_categories() {
        let raw = record(json!({
            "corpusid": 2,
            "externalids": {"DOI": null},
            "content": {"text": null, "annotations": {}}
        }));

        let document = build_document(&raw).unwrap();

        assert!(document.title.is_none());
        assert!(document.abstract_.is_none());
        assert!(document.sections.is_empty());
        assert!(document.bibliography.is_empty());
        assert_eq!(document.externalids.get("DOI"), Some(&None));
    }

    #[test]
    fn test_title_and_abstract_take_earliest_span() {
        let raw = record(json!({
            "corpusid": 3,
            "externalids": {},
            "content": {
                "text": "A Title. Abstract text. Another Title.",
                "annotations": {
                    "title": [{"start": 24, "end": 37}, {"start": 0, "end": 8}],
                    "abstract": "[{\"start\": 9, \"end\": 23}]"
                }
            }
        }));

        let document = build_document(&raw).unwrap();

        assert_eq!(document.title.map(|t| t.text), Some("A Title.".to_string()));
        assert_eq!(
            document.abstract_.map(|a| a.text),
            Some("Abstract text.".to_string())
        );
    }

    #[test]
    fn test_sanitize_warnings_are_attached() {
        let raw = record(json!({
            "corpusid": 4,
            "externalids": {},
            "content": {
                "text": "Body.",
                "annotations": {
                    "paragraph": [{"start": 0, "end": 5}],
                    "sectionheader": "{broken"
                }
            }
        }));

        let document = build_document(&raw).unwrap();

        assert_eq!(document.warnings.len(), 1);
        assert!(document.warnings[0].starts_with("sectionheader annotations (normalize)"));
        assert_eq!(document.paragraphs_flat().len(), 1);
    }

    #[test]
    fn test_build_is_deterministic() {
        let raw = record(json!({
            "corpusid": 5,
            "externalids": {},
            "content": {
                "text": "[a] [b] Figure 1.",
                "annotations": {
                    "bibentry": [{"start": 0, "end": 3}, {"start": 4, "end": 7}],
                    "figure": [{"start": 8, "end": 17}]
                }
            }
        }));

        let first = build_document(&raw).unwrap();
        let second = build_document(&raw).unwrap();

        assert_eq!(first, second);
        let ids: Vec<&str> = first.bibliography.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["unref_0", "unref_1"]);
        assert!(first.figures.contains_key("unref_2"));
    }
}

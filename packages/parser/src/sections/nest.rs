//! Section nesting by numbering labels.

use crate::config::is_well_formed_numbering;
use crate::types::Section;

/// Split a numbering label into its non-empty dot-separated components.
///
/// # Examples
/// ```
/// use s2orc_parser::sections::numbering_components;
///
/// assert_eq!(numbering_components("2.1."), vec!["2", "1"]);
/// assert!(numbering_components("").is_empty());
/// ```
#[must_use]
pub fn numbering_components(numbering: &str) -> Vec<&str> {
    numbering.split('.').filter(|c| !c.is_empty()).collect()
}

/// Reconstruct the section hierarchy from numbering labels.
///
/// Each section becomes a child of the nearest preceding section whose
/// numbering equals its own numbering without the last component ("2.1"
/// under "2"), or a top-level section when there is none. When no section
/// is numbered the list is returned unchanged.
///
/// Labels that are not dot-separated integers are compared as opaque text.
#[must_use]
pub fn nest_sections(mut sections: Vec<Section>) -> Vec<Section> {
    if sections.iter().all(|s| s.numbering.is_empty()) {
        return sections;
    }

    for section in &mut sections {
        section.subsections.clear();
        if !section.numbering.is_empty() && !is_well_formed_numbering(&section.numbering) {
            tracing::debug!(
                numbering = %section.numbering,
                "malformed section numbering, comparing as text"
            );
        }
    }

    let parents = parent_indices(&sections);
    assemble_forest(sections, &parents)
}

/// Parent index of every section, found with an explicit ancestor stack.
fn parent_indices(sections: &[Section]) -> Vec<Option<usize>> {
    let mut parents = Vec::with_capacity(sections.len());
    let mut stack: Vec<usize> = Vec::new();

    for (index, section) in sections.iter().enumerate() {
        let current = numbering_components(&section.numbering);
        let parent_prefix = current.split_last().map_or(&[][..], |(_, init)| init);

        while let Some(&top) = stack.last() {
            let top_components = numbering_components(&sections[top].numbering);
            if !top_components.is_empty() && top_components.as_slice() == parent_prefix {
                break;
            }
            stack.pop();
        }

        parents.push(stack.last().copied());
        stack.push(index);
    }

    parents
}

/// Move sections into their parents, preserving document order.
///
/// Parents always precede their children, so walking backwards guarantees
/// that a section's children are complete before it is moved.
fn assemble_forest(sections: Vec<Section>, parents: &[Option<usize>]) -> Vec<Section> {
    let mut children: Vec<Vec<Section>> = vec![Vec::new(); sections.len()];
    let mut roots = Vec::new();

    for (index, mut section) in sections.into_iter().enumerate().rev() {
        let mut own = std::mem::take(&mut children[index]);
        own.reverse();
        section.subsections = own;

        match parents[index] {
            Some(parent) => children[parent].push(section),
            None => roots.push(section),
        }
    }

    roots.reverse();
    roots
}

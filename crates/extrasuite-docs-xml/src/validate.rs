//! Pre-reconcile validation across the pristine/desired pair.
//!
//! The Docs API can neither insert nor delete horizontal rules, inline
//! images, auto-text, or column breaks, so a push in which their counts
//! changed can never be reconciled. Rejecting here gives the agent a
//! clear message instead of a mid-script API error.

use crate::error::{Result, XmlError};
use extrasuite_docs_types::{StructuralElement, Tab};

const IMMUTABLE_KINDS: [&str; 4] = ["horizontalRule", "inlineObjectElement", "autoText", "columnBreak"];

fn count_kind(elements: &[StructuralElement], kind: &str, total: &mut usize) {
    for el in elements {
        match el {
            StructuralElement::Paragraph(p) => {
                *total += p
                    .elements
                    .iter()
                    .filter(|pe| pe.is_immutable() && pe.kind_name() == kind)
                    .count();
            }
            StructuralElement::Table(t) => {
                for row in &t.rows {
                    for cell in &row.cells {
                        count_kind(&cell.content, kind, total);
                    }
                }
            }
            StructuralElement::TableOfContents(toc) => count_kind(&toc.content, kind, total),
            StructuralElement::SectionBreak(_) => {}
        }
    }
}

fn tab_count(tab: &Tab, kind: &str) -> usize {
    let mut total = 0;
    for segment in tab.segments() {
        count_kind(&segment.content, kind, &mut total);
    }
    total
}

fn element_tag(kind: &str) -> &'static str {
    match kind {
        "horizontalRule" => "<hr/>",
        "inlineObjectElement" => "<image/>",
        "autoText" => "<autotext/>",
        _ => "<columnbreak/>",
    }
}

/// Verify that the desired tab keeps every immutable element count from
/// the pristine tab.
pub fn validate_immutable_elements(pristine: &Tab, desired: &Tab) -> Result<()> {
    for kind in IMMUTABLE_KINDS {
        let before = tab_count(pristine, kind);
        let after = tab_count(desired, kind);
        if before != after {
            return Err(XmlError::ImmutableElementCountChanged {
                file: "document.xml".to_string(),
                element: element_tag(kind).to_string(),
                pristine: before,
                desired: after,
            });
        }
    }
    Ok(())
}

//! Content fingerprints for the sequence-level diff.
//!
//! Fingerprints are deliberately style-blind: two paragraphs with the
//! same text but different formatting hash equal, so they pair up as an
//! "equal" block and the recursion emits precise style updates instead
//! of a delete-and-reinsert of identical text.

use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement};
use extrasuite_docs_types::{StructuralElement, Table};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Fingerprint of a structural element: element kind plus a hash of its
/// content (text and atom identities), ignoring styles and bullets.
pub(crate) fn element_fingerprint(el: &StructuralElement) -> u64 {
    let mut hasher = FxHasher::default();
    hash_element(el, &mut hasher);
    hasher.finish()
}

fn hash_element(el: &StructuralElement, hasher: &mut FxHasher) {
    match el {
        StructuralElement::Paragraph(p) => {
            "paragraph".hash(hasher);
            hash_paragraph_content(p, hasher);
        }
        StructuralElement::Table(t) => {
            "table".hash(hasher);
            hash_table_content(t, hasher);
        }
        StructuralElement::SectionBreak(_) => "sectionBreak".hash(hasher),
        // TOC content is server-owned; presence is its whole identity.
        StructuralElement::TableOfContents(_) => "tableOfContents".hash(hasher),
    }
}

fn hash_paragraph_content(p: &Paragraph, hasher: &mut FxHasher) {
    // Hash per character, not per run, so run boundaries are invisible.
    for el in &p.elements {
        match el {
            ParagraphElement::TextRun(run) => {
                for c in run.text.chars() {
                    1u8.hash(hasher);
                    c.hash(hasher);
                }
            }
            atom => {
                2u8.hash(hasher);
                hash_atom_identity(atom, hasher);
            }
        }
    }
}

pub(crate) fn hash_table_content(t: &Table, hasher: &mut FxHasher) {
    t.rows.len().hash(hasher);
    for row in &t.rows {
        row.cells.len().hash(hasher);
        for cell in &row.cells {
            for el in &cell.content {
                hash_element(el, hasher);
            }
        }
    }
}

/// The identity of an atom element, excluding its text style and any
/// server-assigned ids (which differ between mock and real runs).
pub(crate) fn hash_atom_identity(atom: &ParagraphElement, hasher: &mut FxHasher) {
    atom.kind_name().hash(hasher);
    match atom {
        ParagraphElement::InlineObject(obj) => obj.inline_object_id.hash(hasher),
        ParagraphElement::Person(p) => p.email.hash(hasher),
        ParagraphElement::RichLink(r) => r.url.hash(hasher),
        ParagraphElement::DateChip(d) => {
            d.timestamp.hash(hasher);
            d.date_format.hash(hasher);
            d.time_format.hash(hasher);
            d.time_zone_id.hash(hasher);
            d.locale.hash(hasher);
        }
        ParagraphElement::Equation(eq) => eq.length.hash(hasher),
        ParagraphElement::FootnoteReference(fr) => fr.footnote_id.hash(hasher),
        ParagraphElement::AutoText(at) => at.auto_text_type.hash(hasher),
        ParagraphElement::PageBreak(_)
        | ParagraphElement::ColumnBreak(_)
        | ParagraphElement::HorizontalRule(_) => {}
        ParagraphElement::TextRun(_) => unreachable!("runs are hashed as text"),
    }
}

pub(crate) fn atom_identity(atom: &ParagraphElement) -> u64 {
    let mut hasher = FxHasher::default();
    hash_atom_identity(atom, &mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use extrasuite_docs_types::paragraph::TextRun;
    use extrasuite_docs_types::style::TextStyle;

    fn para(text: &str, style: TextStyle) -> StructuralElement {
        StructuralElement::Paragraph(Paragraph {
            elements: vec![ParagraphElement::TextRun(TextRun {
                text: text.to_string(),
                style,
                ..TextRun::default()
            })],
            ..Paragraph::default()
        })
    }

    #[test]
    fn fingerprints_ignore_styles() {
        let plain = para("same\n", TextStyle::default());
        let bold = para(
            "same\n",
            TextStyle {
                bold: Some(true),
                ..TextStyle::default()
            },
        );
        assert_eq!(element_fingerprint(&plain), element_fingerprint(&bold));
    }

    #[test]
    fn fingerprints_see_text() {
        let a = para("one\n", TextStyle::default());
        let b = para("two\n", TextStyle::default());
        assert_ne!(element_fingerprint(&a), element_fingerprint(&b));
    }

    #[test]
    fn run_boundaries_do_not_matter() {
        let split = StructuralElement::Paragraph(Paragraph {
            elements: vec![
                ParagraphElement::TextRun(TextRun {
                    text: "ab".to_string(),
                    ..TextRun::default()
                }),
                ParagraphElement::TextRun(TextRun {
                    text: "c\n".to_string(),
                    ..TextRun::default()
                }),
            ],
            ..Paragraph::default()
        });
        let merged = para("abc\n", TextStyle::default());
        assert_eq!(element_fingerprint(&split), element_fingerprint(&merged));
    }
}

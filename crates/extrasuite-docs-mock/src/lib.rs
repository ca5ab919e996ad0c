//! In-memory mock of the Google Docs `batchUpdate` API.
//!
//! A pure function from `(Document, [Request])` to `(Document,
//! [Reply])`: no I/O, no concurrency, strict list order, atomic
//! failure. Handlers mutate content only; after every request a
//! centralized pass re-normalizes runs and paragraphs, recomputes all
//! UTF-16 indices, and re-checks the structural invariants.

mod bullets;
mod engine;
mod error;
mod normalize;
mod structure;
mod styles;
mod tables;
mod text;

pub use engine::{IdGen, apply_batch};
pub use error::{MockError, Result};
pub use normalize::{normalize_segment, normalize_tab};

use extrasuite_docs_types::Document;

/// Clear the `explicit` provenance sets on every text style in the
/// document. Provenance is a session-internal bookkeeping detail and is
/// stripped before a document is exposed to callers.
pub fn strip_provenance(doc: &mut Document) {
    use extrasuite_docs_types::{StructuralElement, paragraph::Paragraph};

    fn strip_paragraph(p: &mut Paragraph) {
        for el in &mut p.elements {
            if let Some(style) = el.text_style_mut() {
                style.explicit = Default::default();
            }
        }
        if let Some(bullet) = &mut p.bullet {
            bullet.text_style.explicit = Default::default();
        }
    }

    fn strip_elements(elements: &mut [StructuralElement]) {
        for el in elements {
            match el {
                StructuralElement::Paragraph(p) => strip_paragraph(p),
                StructuralElement::Table(t) => {
                    for row in &mut t.rows {
                        for cell in &mut row.cells {
                            strip_elements(&mut cell.content);
                        }
                    }
                }
                StructuralElement::TableOfContents(toc) => strip_elements(&mut toc.content),
                StructuralElement::SectionBreak(_) => {}
            }
        }
    }

    for tab in &mut doc.tabs {
        for segment in tab.segments_mut() {
            strip_elements(&mut segment.content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement, TextRun};
    use extrasuite_docs_types::style::{
        BulletPreset, FieldSet, NamedStyleType, ParagraphField, ParagraphFieldSet,
        ParagraphStyle, StyleField, TextStyle,
    };
    use extrasuite_docs_types::{
        CreateFootnoteRequest, CreateHeaderRequest, CreateParagraphBulletsRequest,
        DeleteContentRangeRequest, Document, InsertTableRequest, InsertTextRequest, Link,
        Location, Range, Reply, Request, SectionBreak, Segment, SegmentId, StructuralElement,
        Tab, UpdateParagraphStyleRequest, UpdateTextStyleRequest,
    };

    fn run(text: &str, style: TextStyle) -> ParagraphElement {
        ParagraphElement::TextRun(TextRun {
            text: text.to_string(),
            style,
            ..TextRun::default()
        })
    }

    fn doc_of(paragraphs: Vec<Vec<ParagraphElement>>) -> Document {
        let mut content = vec![StructuralElement::SectionBreak(SectionBreak::default())];
        content.extend(paragraphs.into_iter().map(|elements| {
            StructuralElement::Paragraph(Paragraph {
                elements,
                ..Paragraph::default()
            })
        }));
        let mut doc = Document {
            document_id: "doc1".to_string(),
            title: "test".to_string(),
            tabs: vec![Tab {
                tab_id: "t.0".to_string(),
                body: Segment {
                    id: SegmentId::Body,
                    content,
                },
                ..Tab::default()
            }],
        };
        doc.reindex();
        doc
    }

    fn simple_doc(text: &str) -> Document {
        doc_of(vec![vec![run(text, TextStyle::default())]])
    }

    fn body_text(doc: &Document) -> String {
        let mut out = String::new();
        for el in &doc.tabs[0].body.content {
            if let StructuralElement::Paragraph(p) = el {
                out.push_str(&p.plain_text());
            }
        }
        out
    }

    #[test]
    fn insert_text_mid_run() {
        let doc = simple_doc("Hello World\n");
        let (result, replies) = apply_batch(
            &doc,
            &[Request::InsertText(InsertTextRequest {
                location: Location::at(6),
                text: " Beautiful".to_string(),
            })],
        )
        .unwrap();
        assert_eq!(body_text(&result), "Hello Beautiful World\n");
        assert_eq!(replies, vec![Reply::Empty]);
        result.check_invariants().unwrap();
    }

    #[test]
    fn insert_text_with_newline_splits_paragraph() {
        let doc = simple_doc("ab\n");
        let (result, _) = apply_batch(
            &doc,
            &[Request::InsertText(InsertTextRequest {
                location: Location::at(2),
                text: "X\nY".to_string(),
            })],
        )
        .unwrap();
        let body = &result.tabs[0].body;
        assert_eq!(body.content.len(), 3);
        assert_eq!(body.content[1].as_paragraph().unwrap().plain_text(), "aX\n");
        assert_eq!(body.content[2].as_paragraph().unwrap().plain_text(), "Yb\n");
        result.check_invariants().unwrap();
    }

    #[test]
    fn insert_after_emoji_lands_on_code_unit_boundary() {
        let doc = simple_doc("🎉x\n");
        // The emoji spans [1,3); inserting at 3 targets the boundary.
        let (result, _) = apply_batch(
            &doc,
            &[Request::InsertText(InsertTextRequest {
                location: Location::at(3),
                text: "!".to_string(),
            })],
        )
        .unwrap();
        assert_eq!(body_text(&result), "🎉!x\n");
        // Mid-surrogate insertion is rejected.
        let err = apply_batch(
            &doc,
            &[Request::InsertText(InsertTextRequest {
                location: Location::at(2),
                text: "!".to_string(),
            })],
        )
        .unwrap_err();
        assert!(matches!(err, MockError::SurrogateSplit { index: 2 }));
    }

    #[test]
    fn insert_at_body_zero_rejected() {
        let doc = simple_doc("x\n");
        let err = apply_batch(
            &doc,
            &[Request::InsertText(InsertTextRequest {
                location: Location::at(0),
                text: "y".to_string(),
            })],
        )
        .unwrap_err();
        assert!(matches!(err, MockError::InvalidRequest { .. }));
    }

    #[test]
    fn insert_inherits_donor_style() {
        let bold = TextStyle {
            bold: Some(true),
            ..TextStyle::default()
        };
        let doc = doc_of(vec![vec![
            run("ab", bold.clone()),
            run("cd\n", TextStyle::default()),
        ]]);
        // Index 2 is interior to the bold run [1,3): insertion extends it.
        let (result, _) = apply_batch(
            &doc,
            &[Request::InsertText(InsertTextRequest {
                location: Location::at(2),
                text: "XX".to_string(),
            })],
        )
        .unwrap();
        let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
        let first = p.elements[0].as_text_run().unwrap();
        assert_eq!(first.text, "aXXb");
        assert_eq!(first.style.bold, Some(true));
    }

    #[test]
    fn insert_at_link_boundary_strips_auto_styling() {
        let linked = TextStyle {
            link: Some(Link {
                url: "https://example.com".to_string(),
            }),
            foreground_color: Some(extrasuite_docs_types::RgbColor {
                red: 0.0,
                green: 0.0,
                blue: 0.8,
            }),
            ..TextStyle::default()
        };
        let doc = doc_of(vec![vec![
            run("link", linked),
            run("\n", TextStyle::default()),
        ]]);
        // Index 5 is the boundary right after the link run [1,5).
        let (result, _) = apply_batch(
            &doc,
            &[Request::InsertText(InsertTextRequest {
                location: Location::at(5),
                text: "tail".to_string(),
            })],
        )
        .unwrap();
        let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
        let tail = p
            .elements
            .iter()
            .filter_map(ParagraphElement::as_text_run)
            .find(|r| r.text.contains("tail"))
            .unwrap();
        assert_eq!(tail.style.link, None);
        assert_eq!(tail.style.foreground_color, None);
    }

    #[test]
    fn delete_range_merges_paragraphs_keeping_earlier_style() {
        let mut doc = doc_of(vec![
            vec![run("one\n", TextStyle::default())],
            vec![run("two\n", TextStyle::default())],
        ]);
        doc.tabs[0].body.content[1]
            .as_paragraph_mut()
            .unwrap()
            .style = ParagraphStyle {
            named_style_type: Some(NamedStyleType::Heading1),
            ..ParagraphStyle::default()
        };
        doc.reindex();
        // Delete "one" paragraph's newline at [4,5): paragraphs merge.
        let (result, _) = apply_batch(
            &doc,
            &[Request::DeleteContentRange(DeleteContentRangeRequest {
                range: Range::new(4, 5),
            })],
        )
        .unwrap();
        let body = &result.tabs[0].body;
        assert_eq!(body.content.len(), 2);
        let p = body.content[1].as_paragraph().unwrap();
        assert_eq!(p.plain_text(), "onetwo\n");
        assert_eq!(p.style.named_style_type, Some(NamedStyleType::Heading1));
    }

    #[test]
    fn delete_final_newline_rejected() {
        let doc = simple_doc("abc\n");
        let err = apply_batch(
            &doc,
            &[Request::DeleteContentRange(DeleteContentRangeRequest {
                range: Range::new(3, 5),
            })],
        )
        .unwrap_err();
        assert!(matches!(err, MockError::InvalidRequest { .. }));
    }

    #[test]
    fn failed_batch_leaves_input_unchanged() {
        let doc = simple_doc("abc\n");
        let before = doc.clone();
        let result = apply_batch(
            &doc,
            &[
                Request::InsertText(InsertTextRequest {
                    location: Location::at(1),
                    text: "x".to_string(),
                }),
                // Out of bounds: whole batch must fail.
                Request::InsertText(InsertTextRequest {
                    location: Location::at(99),
                    text: "y".to_string(),
                }),
            ],
        );
        assert!(result.is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn update_text_style_splits_and_records_provenance() {
        let doc = simple_doc("Hello World\n");
        let (result, _) = apply_batch(
            &doc,
            &[Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: Range::new(7, 12),
                text_style: TextStyle {
                    bold: Some(true),
                    ..TextStyle::default()
                },
                fields: FieldSet::of(&[StyleField::Bold]),
            })],
        )
        .unwrap();
        let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
        assert_eq!(p.elements.len(), 3);
        let head = p.elements[0].as_text_run().unwrap();
        let word = p.elements[1].as_text_run().unwrap();
        let newline = p.elements[2].as_text_run().unwrap();
        assert_eq!(head.text, "Hello ");
        assert_eq!(head.style.bold, None);
        assert_eq!(word.text, "World");
        assert_eq!(word.style.bold, Some(true));
        assert!(word.style.explicit.contains(StyleField::Bold));
        assert_eq!(newline.text, "\n");
        assert_eq!(newline.style.bold, None);
        result.check_invariants().unwrap();
    }

    #[test]
    fn clearing_a_field_via_mask_with_unset_value() {
        let bold = TextStyle {
            bold: Some(true),
            ..TextStyle::default()
        };
        let doc = doc_of(vec![vec![run("ab\n", bold)]]);
        let (result, _) = apply_batch(
            &doc,
            &[Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: Range::new(1, 4),
                text_style: TextStyle::default(),
                fields: FieldSet::of(&[StyleField::Bold]),
            })],
        )
        .unwrap();
        let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
        assert_eq!(p.elements[0].as_text_run().unwrap().style.bold, None);
    }

    #[test]
    fn heading_promotion_clears_bold_but_honors_explicit_italic() {
        let doc = simple_doc("Chapter One\n");
        let (result, _) = apply_batch(
            &doc,
            &[
                // Make "Chapter" explicitly italic, and all of it bold.
                Request::UpdateTextStyle(UpdateTextStyleRequest {
                    range: Range::new(1, 8),
                    text_style: TextStyle {
                        italic: Some(true),
                        ..TextStyle::default()
                    },
                    fields: FieldSet::of(&[StyleField::Italic]),
                }),
                Request::UpdateTextStyle(UpdateTextStyleRequest {
                    range: Range::new(1, 12),
                    text_style: TextStyle {
                        bold: Some(true),
                        ..TextStyle::default()
                    },
                    fields: FieldSet::of(&[StyleField::Bold]),
                }),
                Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
                    range: Range::new(1, 12),
                    paragraph_style: ParagraphStyle {
                        named_style_type: Some(NamedStyleType::Heading1),
                        ..ParagraphStyle::default()
                    },
                    fields: ParagraphFieldSet::of(&[ParagraphField::NamedStyleType]),
                }),
            ],
        )
        .unwrap();
        let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
        assert_eq!(p.style.named_style_type, Some(NamedStyleType::Heading1));
        assert!(p.style.heading_id.is_some());
        let italic_run = p.elements[0].as_text_run().unwrap();
        // Bold cleared everywhere, explicit italic preserved.
        assert_eq!(italic_run.style.bold, None);
        assert_eq!(italic_run.style.italic, Some(true));
    }

    #[test]
    fn heading_promotion_clears_inherited_italic() {
        let italic = TextStyle {
            italic: Some(true),
            ..TextStyle::default()
        };
        // Italic present in the input document: not explicit.
        let doc = doc_of(vec![vec![run("Title\n", italic)]]);
        let (result, _) = apply_batch(
            &doc,
            &[Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
                range: Range::new(1, 6),
                paragraph_style: ParagraphStyle {
                    named_style_type: Some(NamedStyleType::Heading2),
                    ..ParagraphStyle::default()
                },
                fields: ParagraphFieldSet::of(&[ParagraphField::NamedStyleType]),
            })],
        )
        .unwrap();
        let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
        assert_eq!(p.elements[0].as_text_run().unwrap().style.italic, None);
    }

    #[test]
    fn bullets_consume_leading_tabs_and_mirror_explicit_italic() {
        let doc = doc_of(vec![
            vec![run("alpha\n", TextStyle::default())],
            vec![run("\tbeta\n", TextStyle::default())],
        ]);
        let (result, _) = apply_batch(
            &doc,
            &[
                Request::UpdateTextStyle(UpdateTextStyleRequest {
                    range: Range::new(1, 6),
                    text_style: TextStyle {
                        italic: Some(true),
                        ..TextStyle::default()
                    },
                    fields: FieldSet::of(&[StyleField::Italic]),
                }),
                Request::CreateParagraphBullets(CreateParagraphBulletsRequest {
                    range: Range::new(1, 13),
                    bullet_preset: BulletPreset::DiscCircleSquare,
                }),
            ],
        )
        .unwrap();
        let body = &result.tabs[0].body;
        let p1 = body.content[1].as_paragraph().unwrap();
        let p2 = body.content[2].as_paragraph().unwrap();
        let b1 = p1.bullet.as_ref().unwrap();
        let b2 = p2.bullet.as_ref().unwrap();
        assert_eq!(b1.list_id, b2.list_id);
        assert_eq!(b1.nesting_level, 0);
        assert_eq!(b2.nesting_level, 1);
        assert_eq!(p2.plain_text(), "beta\n");
        // Explicit italic mirrors into the bullet; the plain paragraph stays off.
        assert_eq!(b1.text_style.italic, Some(true));
        assert_eq!(b2.text_style.italic, None);
        result.check_invariants().unwrap();
    }

    #[test]
    fn insert_table_lands_before_the_addressed_paragraph() {
        let doc = doc_of(vec![
            vec![run("Hello\n", TextStyle::default())],
            vec![run("\n", TextStyle::default())],
        ]);
        let (result, _) = apply_batch(
            &doc,
            &[Request::InsertTable(InsertTableRequest {
                location: Location::at(7),
                rows: 3,
                columns: 3,
            })],
        )
        .unwrap();
        let body = &result.tabs[0].body;
        assert_eq!(body.content.len(), 4);
        assert_eq!(body.content[1].as_paragraph().unwrap().plain_text(), "Hello\n");
        let table = body.content[2].as_table().unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.start_index, 7);
        // Empty 3x3 table spans 1 + 3*(1 + 3*2) = 22 units.
        assert_eq!(table.end_index, 29);
        assert_eq!(body.content[3].as_paragraph().unwrap().plain_text(), "\n");
        result.check_invariants().unwrap();
    }

    #[test]
    fn insert_table_rejects_a_mid_paragraph_index() {
        let doc = simple_doc("Hello\n");
        let err = apply_batch(
            &doc,
            &[Request::InsertTable(InsertTableRequest {
                location: Location::at(3),
                rows: 1,
                columns: 1,
            })],
        )
        .unwrap_err();
        assert!(matches!(err, MockError::InvalidRequest { .. }));
    }

    #[test]
    fn insert_text_into_table_cell() {
        let doc = doc_of(vec![
            vec![run("Hello\n", TextStyle::default())],
            vec![run("\n", TextStyle::default())],
        ]);
        let (result, _) = apply_batch(
            &doc,
            &[
                Request::InsertTable(InsertTableRequest {
                    location: Location::at(7),
                    rows: 2,
                    columns: 2,
                }),
                // First cell's paragraph starts at 10 (table 7, row 8, cell 9).
                Request::InsertText(InsertTextRequest {
                    location: Location::at(10),
                    text: "Q1".to_string(),
                }),
            ],
        )
        .unwrap();
        let table = result.tabs[0].body.content[2].as_table().unwrap();
        let cell_para = table.rows[0].cells[0].content[0].as_paragraph().unwrap();
        assert_eq!(cell_para.plain_text(), "Q1\n");
        result.check_invariants().unwrap();
    }

    #[test]
    fn create_header_once_then_reject() {
        let doc = simple_doc("x\n");
        let (result, replies) = apply_batch(
            &doc,
            &[Request::CreateHeader(CreateHeaderRequest::default())],
        )
        .unwrap();
        let Reply::CreateHeader(reply) = &replies[0] else {
            panic!("expected createHeader reply");
        };
        assert!(result.tabs[0].headers.contains_key(&reply.header_id));
        let err = apply_batch(
            &result,
            &[Request::CreateHeader(CreateHeaderRequest::default())],
        )
        .unwrap_err();
        assert!(matches!(err, MockError::InvalidRequest { .. }));
    }

    #[test]
    fn create_footnote_inserts_reference_and_segment() {
        let doc = simple_doc("text\n");
        let (result, replies) = apply_batch(
            &doc,
            &[Request::CreateFootnote(CreateFootnoteRequest {
                location: Location::at(5),
            })],
        )
        .unwrap();
        let Reply::CreateFootnote(reply) = &replies[0] else {
            panic!("expected createFootnote reply");
        };
        assert!(result.tabs[0].footnotes.contains_key(&reply.footnote_id));
        let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
        assert!(p.elements.iter().any(|el| matches!(
            el,
            ParagraphElement::FootnoteReference(fr) if fr.footnote_id == reply.footnote_id
        )));
        result.check_invariants().unwrap();
    }

    #[test]
    fn unimplemented_kinds_reply_empty() {
        let doc = simple_doc("x\n");
        let (result, replies) = apply_batch(
            &doc,
            &[Request::MergeTableCells(serde_json::json!({}))],
        )
        .unwrap();
        assert_eq!(replies, vec![Reply::Empty]);
        assert_eq!(result, doc);
    }

    #[test]
    fn indices_stay_contiguous_after_every_request() {
        let doc = simple_doc("The quick brown fox\n");
        let requests = vec![
            Request::InsertText(InsertTextRequest {
                location: Location::at(5),
                text: "very ".to_string(),
            }),
            Request::DeleteContentRange(DeleteContentRangeRequest {
                range: Range::new(1, 5),
            }),
            Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: Range::new(1, 6),
                text_style: TextStyle {
                    bold: Some(true),
                    ..TextStyle::default()
                },
                fields: FieldSet::of(&[StyleField::Bold]),
            }),
        ];
        // Apply one request at a time and re-check after each.
        let mut current = doc;
        for req in requests {
            let (next, _) = apply_batch(&current, std::slice::from_ref(&req)).unwrap();
            next.check_invariants().unwrap();
            current = next;
        }
        assert_eq!(body_text(&current), "very quick brown fox\n");
    }

    #[test]
    fn strip_provenance_clears_every_run() {
        let doc = simple_doc("abc\n");
        let (mut result, _) = apply_batch(
            &doc,
            &[Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: Range::new(1, 4),
                text_style: TextStyle {
                    bold: Some(true),
                    ..TextStyle::default()
                },
                fields: FieldSet::of(&[StyleField::Bold]),
            })],
        )
        .unwrap();
        strip_provenance(&mut result);
        let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
        assert!(p.elements[0].as_text_run().unwrap().style.explicit.is_empty());
    }
}

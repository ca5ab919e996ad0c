//! Exact request-level expectations for representative edits.
//!
//! These tests pin down the emitted script, not just its effect: the
//! operation kinds, their order, and their final-state indices.

use extrasuite_docs_reconcile::{ReconcileError, reconcile};
use extrasuite_docs_types::style::{
    BulletPreset, FieldSet, NamedStyleType, ParagraphField, ParagraphFieldSet, ParagraphStyle,
    RgbColor, StyleField, TextStyle,
};
use extrasuite_docs_types::{
    DeleteContentRangeRequest, Document, InsertTableRequest, InsertTextRequest, Location, Range,
    Request, UpdateParagraphStyleRequest, UpdateTextStyleRequest,
};
use extrasuite_docs_xml::{DOCUMENT_XML, STYLES_XML, TabFiles, deserialize_tab};

fn doc(document_xml: &str) -> Document {
    doc_with_styles(document_xml, None)
}

fn doc_with_styles(document_xml: &str, styles_xml: Option<&str>) -> Document {
    let mut files = TabFiles::default();
    files.insert(DOCUMENT_XML, document_xml.to_string());
    if let Some(styles) = styles_xml {
        files.insert(STYLES_XML, styles.to_string());
    }
    Document {
        document_id: "doc1".to_string(),
        title: String::new(),
        tabs: vec![deserialize_tab(&files).unwrap()],
    }
}

#[test]
fn no_edits_emit_the_empty_script() {
    let base = doc("<document id=\"t.0\"><h1>Title</h1><p>Hello <b>World</b></p></document>");
    let desired = doc("<document id=\"t.0\"><h1>Title</h1><p>Hello <b>World</b></p></document>");
    let plan = reconcile(&base, &desired).unwrap();
    assert!(plan.is_empty(), "unexpected requests: {:?}", plan.requests);
}

#[test]
fn insert_and_bold_one_word() {
    let base = doc("<document id=\"t.0\"><p>Hello World</p></document>");
    let desired = doc("<document id=\"t.0\"><p>Hello Beautiful <b>World</b></p></document>");
    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(
        plan.requests,
        vec![
            Request::InsertText(InsertTextRequest {
                location: Location::at(7),
                text: "Beautiful ".to_string(),
            }),
            Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: Range::new(17, 22),
                text_style: TextStyle {
                    bold: Some(true),
                    ..TextStyle::default()
                },
                fields: FieldSet::of(&[StyleField::Bold]),
            }),
        ]
    );
}

#[test]
fn heading_promotion_is_one_paragraph_update() {
    let base = doc("<document id=\"t.0\"><p>Chapter One</p></document>");
    let desired = doc("<document id=\"t.0\"><h1>Chapter One</h1></document>");
    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(
        plan.requests,
        vec![Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
            range: Range::new(1, 13),
            paragraph_style: ParagraphStyle {
                named_style_type: Some(NamedStyleType::Heading1),
                ..ParagraphStyle::default()
            },
            fields: ParagraphFieldSet::of(&[ParagraphField::NamedStyleType]),
        })]
    );
}

#[test]
fn bulleting_three_paragraphs_is_one_request() {
    let base = doc("<document id=\"t.0\"><p>one</p><p>two</p><p>three</p></document>");
    let desired = doc("<document id=\"t.0\"><li>one</li><li>two</li><li>three</li></document>");
    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(plan.requests.len(), 1, "requests: {:?}", plan.requests);
    let Request::CreateParagraphBullets(req) = &plan.requests[0] else {
        panic!("expected createParagraphBullets, got {:?}", plan.requests[0]);
    };
    // "one\n" [1,5), "two\n" [5,9), "three\n" [9,15): one range for all.
    assert_eq!(req.range, Range::new(1, 15));
    assert_eq!(req.bullet_preset, BulletPreset::DiscCircleSquare);
}

#[test]
fn table_insert_then_header_cells() {
    let base = doc("<document id=\"t.0\"><p>first</p></document>");
    let desired = doc(
        "<document id=\"t.0\"><p>first</p><table>\
         <tr><td><p>Product</p></td><td><p>Q1</p></td><td><p>Q2</p></td></tr>\
         <tr><td><p/></td><td><p/></td><td><p/></td></tr>\
         <tr><td><p/></td><td><p/></td><td><p/></td></tr>\
         </table></document>",
    );
    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(
        plan.requests,
        vec![
            Request::InsertTable(InsertTableRequest {
                location: Location::at(7),
                rows: 3,
                columns: 3,
            }),
            Request::InsertText(InsertTextRequest {
                location: Location::at(10),
                text: "Product".to_string(),
            }),
            Request::InsertText(InsertTextRequest {
                location: Location::at(19),
                text: "Q1".to_string(),
            }),
            Request::InsertText(InsertTextRequest {
                location: Location::at(23),
                text: "Q2".to_string(),
            }),
        ]
    );
}

#[test]
fn multi_block_replaces_carry_the_net_shift() {
    let base = doc("<document id=\"t.0\"><p>aaa</p><p>keep</p><p>bbb</p></document>");
    let desired = doc("<document id=\"t.0\"><p>aXXXa</p><p>keep</p><p>bYYb</p></document>");
    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(
        plan.requests,
        vec![
            Request::DeleteContentRange(DeleteContentRangeRequest {
                range: Range::new(2, 3),
            }),
            Request::InsertText(InsertTextRequest {
                location: Location::at(2),
                text: "XXX".to_string(),
            }),
            // The second block's base indices are offset by the first
            // block's net growth of two units.
            Request::DeleteContentRange(DeleteContentRangeRequest {
                range: Range::new(13, 14),
            }),
            Request::InsertText(InsertTextRequest {
                location: Location::at(13),
                text: "YY".to_string(),
            }),
        ]
    );
}

#[test]
fn class_application_installs_named_style_and_run_deviations() {
    let base = doc("<document id=\"t.0\"><p>careful</p></document>");
    let desired = doc_with_styles(
        "<document id=\"t.0\"><p class=\"warn\">careful</p></document>",
        Some("<styles><style class=\"warn\" color=\"#FF8800\" bold=\"1\"/></styles>"),
    );
    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(
        plan.requests,
        vec![
            Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
                range: Range::new(1, 9),
                paragraph_style: ParagraphStyle {
                    named_style_type: Some(NamedStyleType::NormalText),
                    ..ParagraphStyle::default()
                },
                fields: ParagraphFieldSet::of(&[ParagraphField::NamedStyleType]),
            }),
            Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: Range::new(1, 9),
                text_style: TextStyle {
                    bold: Some(true),
                    foreground_color: RgbColor::from_hex("#FF8800"),
                    ..TextStyle::default()
                },
                fields: FieldSet::of(&[StyleField::Bold, StyleField::ForegroundColor]),
            }),
        ]
    );
}

#[test]
fn style_only_change_uses_a_precise_mask() {
    let base = doc("<document id=\"t.0\"><p>plain here</p></document>");
    let desired = doc("<document id=\"t.0\"><p>plain <i>here</i></p></document>");
    let plan = reconcile(&base, &desired).unwrap();
    assert_eq!(
        plan.requests,
        vec![Request::UpdateTextStyle(UpdateTextStyleRequest {
            // "here" sits at [7, 11); the trailing newline stays plain.
            range: Range::new(7, 11),
            text_style: TextStyle {
                italic: Some(true),
                ..TextStyle::default()
            },
            fields: FieldSet::of(&[StyleField::Italic]),
        })]
    );
}

#[test]
fn adding_a_horizontal_rule_is_refused() {
    let base = doc("<document id=\"t.0\"><p>text</p></document>");
    let desired = doc("<document id=\"t.0\"><p>text</p><hr/></document>");
    let err = reconcile(&base, &desired).unwrap_err();
    assert!(matches!(err, ReconcileError::Unreconcilable(_)));
}

#[test]
fn editing_the_document_style_sidecar_is_refused() {
    let base = doc("<document id=\"t.0\"><p>x</p></document>");
    let mut desired = doc("<document id=\"t.0\"><p>x</p></document>");
    desired.tabs[0].document_style = serde_json::json!({"marginTop": 10});
    let err = reconcile(&base, &desired).unwrap_err();
    assert!(matches!(err, ReconcileError::Unreconcilable(_)));
}

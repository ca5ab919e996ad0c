//! End-to-end scenarios: deserialize a pristine/edited folder pair,
//! reconcile, run the script through the mock, and require the result
//! to equal the edited document.

use extrasuite_docs_mock::normalize_tab;
use extrasuite_docs_reconcile::{CommentOp, reconcile};
use extrasuite_docs_types::paragraph::ParagraphElement;
use extrasuite_docs_types::style::NamedStyleType;
use extrasuite_docs_types::{Document, Request, StructuralElement, Tolerance, compare_documents};
use extrasuite_docs_verify::apply_plan_with_mock;
use extrasuite_docs_xml::{COMMENTS_XML, DOCUMENT_XML, STYLES_XML, TabFiles, deserialize_tab};

struct Folder<'a> {
    document: &'a str,
    styles: Option<&'a str>,
    comments: Option<&'a str>,
}

impl<'a> Folder<'a> {
    fn new(document: &'a str) -> Folder<'a> {
        Folder {
            document,
            styles: None,
            comments: None,
        }
    }

    fn doc(&self) -> Document {
        let mut files = TabFiles::default();
        files.insert(DOCUMENT_XML, self.document.to_string());
        if let Some(styles) = self.styles {
            files.insert(STYLES_XML, styles.to_string());
        }
        if let Some(comments) = self.comments {
            files.insert(COMMENTS_XML, comments.to_string());
        }
        Document {
            document_id: "doc1".to_string(),
            title: String::new(),
            tabs: vec![deserialize_tab(&files).unwrap()],
        }
    }
}

/// Reconcile, apply through the mock, and compare against the desired
/// document under strict equality (modulo ids and provenance).
fn round_trip(base: Folder<'_>, desired: Folder<'_>) -> Document {
    let base_doc = base.doc();
    let mut desired_doc = desired.doc();
    let plan = reconcile(&base_doc, &desired_doc).unwrap();
    let (result, _replies) = apply_plan_with_mock(&base_doc, &plan).unwrap();
    // The reader does not merge equal-styled neighbor runs; the mock
    // does. Normalize the expectation the same way before comparing.
    for tab in &mut desired_doc.tabs {
        normalize_tab(tab);
    }
    let mismatches = compare_documents(&result, &desired_doc, Tolerance::strict());
    assert!(
        mismatches.is_empty(),
        "mock result diverges from desired:\n{}",
        mismatches
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
    result
}

#[test]
fn push_with_no_edits_is_a_no_op() {
    let xml = "<document id=\"t.0\"><h1 id=\"h.abc\">Title</h1><p>Hello <b>World</b></p><li>item</li></document>";
    let base = Folder::new(xml).doc();
    let desired = Folder::new(xml).doc();
    let plan = reconcile(&base, &desired).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn insert_text_and_bold() {
    round_trip(
        Folder::new("<document id=\"t.0\"><p>Hello World</p></document>"),
        Folder::new("<document id=\"t.0\"><p>Hello Beautiful <b>World</b></p></document>"),
    );
}

#[test]
fn heading_promotion_clears_inherited_weight() {
    let result = round_trip(
        Folder::new("<document id=\"t.0\"><p><b>Chapter One</b></p></document>"),
        Folder::new("<document id=\"t.0\"><h1>Chapter One</h1></document>"),
    );
    let p = result.tabs[0].body.content[1].as_paragraph().unwrap();
    assert_eq!(p.style.named_style_type, Some(NamedStyleType::Heading1));
    assert!(p.style.heading_id.is_some());
}

#[test]
fn paragraphs_become_a_list() {
    let result = round_trip(
        Folder::new("<document id=\"t.0\"><p>one</p><p>two</p><p>three</p></document>"),
        Folder::new("<document id=\"t.0\"><li>one</li><li>two</li><li>three</li></document>"),
    );
    let bullets: Vec<_> = result.tabs[0]
        .body
        .content
        .iter()
        .filter_map(StructuralElement::as_paragraph)
        .filter_map(|p| p.bullet.as_ref())
        .collect();
    assert_eq!(bullets.len(), 3);
    assert!(bullets.windows(2).all(|w| w[0].list_id == w[1].list_id));
}

#[test]
fn list_nesting_through_tab_consumption() {
    round_trip(
        Folder::new("<document id=\"t.0\"><li>alpha</li><li>beta</li></document>"),
        Folder::new("<document id=\"t.0\"><li>alpha</li><li level=\"1\">beta</li></document>"),
    );
}

#[test]
fn unbulleting_a_list() {
    round_trip(
        Folder::new("<document id=\"t.0\"><li>alpha</li><li>beta</li></document>"),
        Folder::new("<document id=\"t.0\"><p>alpha</p><p>beta</p></document>"),
    );
}

#[test]
fn table_with_header_row() {
    let result = round_trip(
        Folder::new("<document id=\"t.0\"><p>first</p></document>"),
        Folder::new(
            "<document id=\"t.0\"><p>first</p><table>\
             <tr><td><p>Product</p></td><td><p>Q1</p></td><td><p>Q2</p></td></tr>\
             <tr><td><p/></td><td><p/></td><td><p/></td></tr>\
             <tr><td><p/></td><td><p/></td><td><p/></td></tr>\
             </table></document>",
        ),
    );
    let table = result.tabs[0].body.content[2].as_table().unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(
        table.rows[0].cells[0].content[0]
            .as_paragraph()
            .unwrap()
            .plain_text(),
        "Product\n"
    );
}

#[test]
fn growing_and_filling_a_table() {
    round_trip(
        Folder::new(
            "<document id=\"t.0\"><table>\
             <tr><td><p>a</p></td><td><p>b</p></td></tr>\
             </table></document>",
        ),
        Folder::new(
            "<document id=\"t.0\"><table>\
             <tr><td><p>a</p></td><td><p>b2</p></td></tr>\
             <tr><td><p>c</p></td><td><p>d</p></td></tr>\
             </table></document>",
        ),
    );
}

#[test]
fn shrinking_a_table() {
    round_trip(
        Folder::new(
            "<document id=\"t.0\"><table>\
             <tr><td><p>a</p></td><td><p>b</p></td></tr>\
             <tr><td><p>c</p></td><td><p>d</p></td></tr>\
             </table></document>",
        ),
        Folder::new(
            "<document id=\"t.0\"><table>\
             <tr><td><p>a</p></td><td><p>b</p></td></tr>\
             </table></document>",
        ),
    );
}

#[test]
fn deleting_a_whole_table() {
    round_trip(
        Folder::new(
            "<document id=\"t.0\"><p>before</p><table>\
             <tr><td><p>x</p></td></tr></table><p>after</p></document>",
        ),
        Folder::new("<document id=\"t.0\"><p>before</p><p>after</p></document>"),
    );
}

#[test]
fn multi_block_replace() {
    round_trip(
        Folder::new("<document id=\"t.0\"><p>aaa</p><p>keep</p><p>bbb</p></document>"),
        Folder::new("<document id=\"t.0\"><p>aXXXa</p><p>keep</p><p>bYYb</p></document>"),
    );
}

#[test]
fn replacing_the_first_styled_run() {
    round_trip(
        Folder::new("<document id=\"t.0\"><p><b>Alpha</b> rest</p></document>"),
        Folder::new("<document id=\"t.0\"><p><b>Beta</b> rest</p></document>"),
    );
}

#[test]
fn class_application_round_trips() {
    let mut desired = Folder::new("<document id=\"t.0\"><p class=\"warn\">careful</p></document>");
    desired.styles =
        Some("<styles><style class=\"warn\" color=\"#FF8800\" bold=\"1\"/></styles>");
    round_trip(
        Folder::new("<document id=\"t.0\"><p>careful</p></document>"),
        desired,
    );
}

#[test]
fn paragraph_split_and_merge() {
    round_trip(
        Folder::new("<document id=\"t.0\"><p>one two</p></document>"),
        Folder::new("<document id=\"t.0\"><p>one</p><p>two</p></document>"),
    );
    round_trip(
        Folder::new("<document id=\"t.0\"><p>one</p><p>two</p></document>"),
        Folder::new("<document id=\"t.0\"><p>one two</p></document>"),
    );
}

#[test]
fn deleting_a_middle_paragraph() {
    round_trip(
        Folder::new("<document id=\"t.0\"><p>one</p><p>two</p><p>three</p></document>"),
        Folder::new("<document id=\"t.0\"><p>one</p><p>three</p></document>"),
    );
}

#[test]
fn deleting_the_last_paragraph() {
    round_trip(
        Folder::new("<document id=\"t.0\"><p>one</p><p>two</p></document>"),
        Folder::new("<document id=\"t.0\"><p>one</p></document>"),
    );
}

#[test]
fn appending_a_paragraph() {
    round_trip(
        Folder::new("<document id=\"t.0\"><p>one</p></document>"),
        Folder::new("<document id=\"t.0\"><p>one</p><p>two</p></document>"),
    );
}

#[test]
fn emoji_keeps_utf16_indices_straight() {
    let base = Folder::new("<document id=\"t.0\"><p>\u{1F389}X</p></document>");
    let desired = Folder::new("<document id=\"t.0\"><p>\u{1F389}ZX</p></document>");
    let base_doc = base.doc();
    let plan = reconcile(&base_doc, &desired.doc()).unwrap();
    let Request::InsertText(req) = &plan.requests[0] else {
        panic!("expected insertText, got {:?}", plan.requests[0]);
    };
    // The emoji occupies [1,3): the insertion lands at 3, not 2.
    assert_eq!(req.location.index, 3);
    assert_eq!(req.text, "Z");
    round_trip(base, desired);
}

#[test]
fn creating_a_header() {
    let result = round_trip(
        Folder::new("<document id=\"t.0\"><p>body</p></document>"),
        Folder::new(
            "<document id=\"t.0\"><p>body</p><header><p>Draft</p></header></document>",
        ),
    );
    assert_eq!(result.tabs[0].headers.len(), 1);
    let header = result.tabs[0].headers.values().next().unwrap();
    assert_eq!(
        header.content[0].as_paragraph().unwrap().plain_text(),
        "Draft\n"
    );
}

#[test]
fn removing_a_header_is_refused() {
    let base = Folder::new(
        "<document id=\"t.0\"><p>body</p><header id=\"kix.h1\"><p>Draft</p></header></document>",
    )
    .doc();
    let desired = Folder::new("<document id=\"t.0\"><p>body</p></document>").doc();
    assert!(reconcile(&base, &desired).is_err());
}

#[test]
fn creating_a_footnote() {
    let result = round_trip(
        Folder::new("<document id=\"t.0\"><p>text</p></document>"),
        Folder::new(
            "<document id=\"t.0\"><p>text<footnote><p>note body</p></footnote></p></document>",
        ),
    );
    assert_eq!(result.tabs[0].footnotes.len(), 1);
    let note = result.tabs[0].footnotes.values().next().unwrap();
    assert_eq!(
        note.content[0].as_paragraph().unwrap().plain_text(),
        "note body\n"
    );
    let body_para = result.tabs[0].body.content[1].as_paragraph().unwrap();
    assert!(
        body_para
            .elements
            .iter()
            .any(|el| matches!(el, ParagraphElement::FootnoteReference(_)))
    );
}

#[test]
fn deleting_a_footnote_reference_removes_the_footnote() {
    round_trip(
        Folder::new(
            "<document id=\"t.0\"><p>text<footnote id=\"kix.fn1\"><p>old note</p></footnote></p></document>",
        ),
        Folder::new("<document id=\"t.0\"><p>text</p></document>"),
    );
}

#[test]
fn editing_inside_a_footnote() {
    round_trip(
        Folder::new(
            "<document id=\"t.0\"><p>x<footnote id=\"kix.fn1\"><p>old</p></footnote></p></document>",
        ),
        Folder::new(
            "<document id=\"t.0\"><p>x<footnote id=\"kix.fn1\"><p>new text</p></footnote></p></document>",
        ),
    );
}

#[test]
fn comment_reply_and_resolve_go_to_the_sibling_script() {
    let comments = |resolved: bool, replies: &str| {
        format!(
            "<json>[{{\"commentId\": \"cmt.1\", \"author\": \"reviewer\", \
             \"content\": \"please fix\", \"resolved\": {resolved}, \"replies\": [{replies}]}}]</json>"
        )
    };
    let base_comments = comments(false, "");
    let desired_comments = comments(
        true,
        "{\"replyId\": \"cmt.1.r1\", \"author\": \"me\", \"content\": \"done\"}",
    );
    let mut base = Folder::new("<document id=\"t.0\"><p>x</p></document>");
    base.comments = Some(&base_comments);
    let mut desired = Folder::new("<document id=\"t.0\"><p>x</p></document>");
    desired.comments = Some(&desired_comments);

    let plan = reconcile(&base.doc(), &desired.doc()).unwrap();
    assert!(plan.requests.is_empty());
    assert_eq!(
        plan.comment_ops,
        vec![
            CommentOp::AddReply {
                comment_id: "cmt.1".to_string(),
                content: "done".to_string(),
            },
            CommentOp::Resolve {
                comment_id: "cmt.1".to_string(),
            },
        ]
    );
}

#[test]
fn chip_elements_survive_unrelated_edits() {
    round_trip(
        Folder::new(
            "<document id=\"t.0\"><p>meet <person email=\"a@b.c\"/> at <date timestamp=\"1700000000000\"/></p><p>tail</p></document>",
        ),
        Folder::new(
            "<document id=\"t.0\"><p>meet <person email=\"a@b.c\"/> at <date timestamp=\"1700000000000\"/></p><p>new tail</p></document>",
        ),
    );
}

#[test]
fn deleting_a_chip_is_allowed_but_adding_one_is_not() {
    round_trip(
        Folder::new("<document id=\"t.0\"><p>hi <person email=\"a@b.c\"/> there</p></document>"),
        Folder::new("<document id=\"t.0\"><p>hi there</p></document>"),
    );
    let base = Folder::new("<document id=\"t.0\"><p>hi there</p></document>").doc();
    let desired =
        Folder::new("<document id=\"t.0\"><p>hi <person email=\"a@b.c\"/> there</p></document>")
            .doc();
    assert!(reconcile(&base, &desired).is_err());
}

#[test]
fn scripts_are_deterministic() {
    let base = Folder::new("<document id=\"t.0\"><p>one</p><p>two</p></document>").doc();
    let desired =
        Folder::new("<document id=\"t.0\"><p>one!</p><li>two</li><p>three</p></document>").doc();
    let plan_a = reconcile(&base, &desired).unwrap();
    let plan_b = reconcile(&base, &desired).unwrap();
    assert_eq!(plan_a.requests, plan_b.requests);
}

#[test]
fn mixed_edit_storm() {
    let result = round_trip(
        Folder::new(
            "<document id=\"t.0\"><h2 id=\"h.s1\">Notes</h2><p>intro text</p>\
             <li>alpha</li><li>beta</li>\
             <table><tr><td><p>k</p></td><td><p>v</p></td></tr></table>\
             <p>closing</p></document>",
        ),
        Folder::new(
            "<document id=\"t.0\"><h1 id=\"h.s1\">Notes</h1><p>intro text, expanded</p>\
             <li>alpha</li><li>beta</li><li>gamma</li>\
             <table><tr><td><p>k</p></td><td><p>v2</p></td></tr></table>\
             <p>closing</p></document>",
        ),
    );
    let heading = result.tabs[0].body.content[1].as_paragraph().unwrap();
    assert_eq!(heading.style.named_style_type, Some(NamedStyleType::Heading1));
    let bullets = result.tabs[0]
        .body
        .content
        .iter()
        .filter_map(StructuralElement::as_paragraph)
        .filter(|p| p.bullet.is_some())
        .count();
    assert_eq!(bullets, 3);
}

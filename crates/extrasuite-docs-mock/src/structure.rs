//! Container creation: headers, footers, footnotes, tabs.

use crate::engine::IdGen;
use crate::error::{MockError, Result};
use crate::text::{check_insert_index, insert_atom, paragraph_at_mut};
use extrasuite_docs_types::paragraph::{FootnoteReference, ParagraphElement};
use extrasuite_docs_types::{
    AddDocumentTabReply, CreateFooterReply, CreateFootnoteReply, CreateHeaderReply, Document,
    Reply, Segment, SegmentId, Tab,
};

pub(crate) fn create_header(tab: &mut Tab, ids: &mut IdGen) -> Result<Reply> {
    if !tab.headers.is_empty() {
        return Err(MockError::invalid(
            "createHeader",
            "tab already has a header",
        ));
    }
    let id = ids.header();
    tab.headers
        .insert(id.clone(), Segment::empty(SegmentId::Header(id.clone())));
    Ok(Reply::CreateHeader(CreateHeaderReply { header_id: id }))
}

pub(crate) fn create_footer(tab: &mut Tab, ids: &mut IdGen) -> Result<Reply> {
    if !tab.footers.is_empty() {
        return Err(MockError::invalid(
            "createFooter",
            "tab already has a footer",
        ));
    }
    let id = ids.footer();
    tab.footers
        .insert(id.clone(), Segment::empty(SegmentId::Footer(id.clone())));
    Ok(Reply::CreateFooter(CreateFooterReply { footer_id: id }))
}

/// Insert a footnote reference at the given body index and create the
/// footnote segment it points to.
pub(crate) fn create_footnote(tab: &mut Tab, index: usize, ids: &mut IdGen) -> Result<Reply> {
    const KIND: &str = "createFootnote";
    check_insert_index(&tab.body, index, KIND)?;
    let id = ids.footnote();
    let number = tab.footnotes.len() + 1;
    let Some(p) = paragraph_at_mut(&mut tab.body.content, index) else {
        return Err(MockError::invalid(
            KIND,
            format!("index {index} does not address text content"),
        ));
    };
    let style = crate::text::derive_insert_style(p, index);
    insert_atom(
        p,
        index,
        ParagraphElement::FootnoteReference(FootnoteReference {
            footnote_id: id.clone(),
            footnote_number: Some(number.to_string()),
            text_style: style,
            ..FootnoteReference::default()
        }),
    )?;
    tab.footnotes
        .insert(id.clone(), Segment::empty(SegmentId::Footnote(id.clone())));
    Ok(Reply::CreateFootnote(CreateFootnoteReply {
        footnote_id: id,
    }))
}

pub(crate) fn add_document_tab(doc: &mut Document, title: &str, ids: &mut IdGen) -> Result<Reply> {
    let id = ids.tab();
    doc.tabs.push(Tab::empty(id.clone(), title));
    Ok(Reply::AddDocumentTab(AddDocumentTabReply { tab_id: id }))
}

pub(crate) fn delete_tab(doc: &mut Document, tab_id: &str) -> Result<Reply> {
    let Some(pos) = doc.tabs.iter().position(|t| t.tab_id == tab_id) else {
        return Err(MockError::UnknownTab(tab_id.to_string()));
    };
    if doc.tabs.len() == 1 {
        return Err(MockError::invalid(
            "deleteTab",
            "cannot delete a document's only tab",
        ));
    }
    doc.tabs.remove(pos);
    Ok(Reply::Empty)
}

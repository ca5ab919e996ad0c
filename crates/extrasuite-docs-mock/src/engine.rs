//! The batch execution loop.
//!
//! `ready → (for each request: dispatch → reindex → validate) → done |
//! failed`. Failure is terminal: handlers run against a clone, so the
//! caller's document is untouched unless the whole batch succeeds.

use crate::error::{MockError, Result};
use crate::normalize::normalize_tab;
use crate::{bullets, structure, styles, tables, text};
use extrasuite_docs_types::{Document, Range, Reply, Request, Segment, Tab};
use tracing::debug;

/// Generates ids in the mock's own namespaces. They pattern-match as
/// server ids, so the equality relation normalizes them away.
#[derive(Debug, Default)]
pub struct IdGen {
    headers: usize,
    footers: usize,
    footnotes: usize,
    tabs: usize,
    lists: usize,
    headings: usize,
}

impl IdGen {
    pub fn header(&mut self) -> String {
        self.headers += 1;
        format!("kix.mockhdr{}", self.headers)
    }

    pub fn footer(&mut self) -> String {
        self.footers += 1;
        format!("kix.mockftr{}", self.footers)
    }

    pub fn footnote(&mut self) -> String {
        self.footnotes += 1;
        format!("kix.mockfn{}", self.footnotes)
    }

    pub fn tab(&mut self) -> String {
        self.tabs += 1;
        format!("t.mock{}", self.tabs)
    }

    pub fn list(&mut self) -> String {
        self.lists += 1;
        format!("kix.mocklist{}", self.lists)
    }

    pub fn heading(&mut self) -> String {
        self.headings += 1;
        format!("h.mock{}", self.headings)
    }
}

/// Apply a request list to a document, returning the resulting document
/// and one reply per request.
///
/// Pure: no I/O, no shared state. The input document is cloned; on any
/// error the clone is discarded, matching the real API's atomicity.
pub fn apply_batch(doc: &Document, requests: &[Request]) -> Result<(Document, Vec<Reply>)> {
    let mut work = doc.clone();
    let mut ids = IdGen::default();
    let mut replies = Vec::with_capacity(requests.len());
    for request in requests {
        debug!(kind = request.kind_name(), "dispatching request");
        let reply = dispatch(&mut work, request, &mut ids)?;
        for tab in &mut work.tabs {
            normalize_tab(tab);
        }
        if let Err(source) = work.check_invariants() {
            // A handler broke a structural invariant: a bug in the mock,
            // not in the caller's request. Loud in debug builds, an
            // error in release.
            debug_assert!(
                false,
                "invariant violated after {}: {source}",
                request.kind_name()
            );
            return Err(MockError::InvariantViolated {
                kind: request.kind_name(),
                source,
            });
        }
        replies.push(reply);
    }
    Ok((work, replies))
}

fn dispatch(doc: &mut Document, request: &Request, ids: &mut IdGen) -> Result<Reply> {
    match request {
        Request::InsertText(r) => {
            let segment = resolve_segment(
                doc,
                r.location.tab_id.as_deref(),
                r.location.segment_id.as_deref(),
            )?;
            text::insert_text(segment, r.location.index, &r.text)?;
            Ok(Reply::Empty)
        }
        Request::DeleteContentRange(r) => {
            let segment = resolve_range_segment(doc, &r.range)?;
            text::delete_content_range(segment, r.range.start_index, r.range.end_index)?;
            Ok(Reply::Empty)
        }
        Request::UpdateTextStyle(r) => {
            let segment = resolve_range_segment(doc, &r.range)?;
            styles::update_text_style(
                segment,
                r.range.start_index,
                r.range.end_index,
                &r.text_style,
                r.fields,
            )?;
            Ok(Reply::Empty)
        }
        Request::UpdateParagraphStyle(r) => {
            let segment = resolve_range_segment(doc, &r.range)?;
            styles::update_paragraph_style(
                segment,
                r.range.start_index,
                r.range.end_index,
                &r.paragraph_style,
                r.fields,
                ids,
            )?;
            Ok(Reply::Empty)
        }
        Request::CreateParagraphBullets(r) => {
            let segment = resolve_range_segment(doc, &r.range)?;
            bullets::create_paragraph_bullets(
                segment,
                r.range.start_index,
                r.range.end_index,
                r.bullet_preset,
                ids,
            )?;
            Ok(Reply::Empty)
        }
        Request::DeleteParagraphBullets(r) => {
            let segment = resolve_range_segment(doc, &r.range)?;
            bullets::delete_paragraph_bullets(segment, r.range.start_index, r.range.end_index)?;
            Ok(Reply::Empty)
        }
        Request::InsertTable(r) => {
            let segment = resolve_segment(
                doc,
                r.location.tab_id.as_deref(),
                r.location.segment_id.as_deref(),
            )?;
            tables::insert_table(segment, r.location.index, r.rows, r.columns)?;
            Ok(Reply::Empty)
        }
        Request::InsertTableRow(r) => {
            let loc = &r.table_cell_location;
            let segment = resolve_segment(
                doc,
                loc.table_start_location.tab_id.as_deref(),
                loc.table_start_location.segment_id.as_deref(),
            )?;
            tables::insert_table_row(
                segment,
                loc.table_start_location.index,
                loc.row_index,
                r.insert_below,
            )?;
            Ok(Reply::Empty)
        }
        Request::InsertTableColumn(r) => {
            let loc = &r.table_cell_location;
            let segment = resolve_segment(
                doc,
                loc.table_start_location.tab_id.as_deref(),
                loc.table_start_location.segment_id.as_deref(),
            )?;
            tables::insert_table_column(
                segment,
                loc.table_start_location.index,
                loc.column_index,
                r.insert_right,
            )?;
            Ok(Reply::Empty)
        }
        Request::DeleteTableRow(r) => {
            let loc = &r.table_cell_location;
            let segment = resolve_segment(
                doc,
                loc.table_start_location.tab_id.as_deref(),
                loc.table_start_location.segment_id.as_deref(),
            )?;
            tables::delete_table_row(segment, loc.table_start_location.index, loc.row_index)?;
            Ok(Reply::Empty)
        }
        Request::DeleteTableColumn(r) => {
            let loc = &r.table_cell_location;
            let segment = resolve_segment(
                doc,
                loc.table_start_location.tab_id.as_deref(),
                loc.table_start_location.segment_id.as_deref(),
            )?;
            tables::delete_table_column(segment, loc.table_start_location.index, loc.column_index)?;
            Ok(Reply::Empty)
        }
        Request::CreateHeader(r) => {
            let tab = resolve_tab(doc, r.tab_id.as_deref())?;
            structure::create_header(tab, ids)
        }
        Request::CreateFooter(r) => {
            let tab = resolve_tab(doc, r.tab_id.as_deref())?;
            structure::create_footer(tab, ids)
        }
        Request::CreateFootnote(r) => {
            if r.location.segment_id.as_deref().is_some_and(|s| !s.is_empty()) {
                return Err(MockError::invalid(
                    "createFootnote",
                    "footnote references can only be created in the body",
                ));
            }
            let tab = resolve_tab(doc, r.location.tab_id.as_deref())?;
            structure::create_footnote(tab, r.location.index, ids)
        }
        Request::AddDocumentTab(r) => structure::add_document_tab(doc, &r.title, ids),
        Request::DeleteTab(r) => structure::delete_tab(doc, &r.tab_id),
        // Out of the reconciler's vocabulary; reply empty so a stray
        // occurrence cannot poison a run.
        Request::MergeTableCells(_)
        | Request::InsertInlineImage(_)
        | Request::InsertPageBreak(_) => {
            debug!(kind = request.kind_name(), "unimplemented request kind, replying empty");
            Ok(Reply::Empty)
        }
    }
}

fn resolve_tab<'a>(doc: &'a mut Document, tab_id: Option<&str>) -> Result<&'a mut Tab> {
    match tab_id {
        None | Some("") => doc
            .tabs
            .first_mut()
            .ok_or_else(|| MockError::UnknownTab(String::new())),
        Some(id) => doc
            .find_tab_mut(id)
            .ok_or_else(|| MockError::UnknownTab(id.to_string())),
    }
}

fn resolve_segment<'a>(
    doc: &'a mut Document,
    tab_id: Option<&str>,
    segment_id: Option<&str>,
) -> Result<&'a mut Segment> {
    let tab = resolve_tab(doc, tab_id)?;
    let id = segment_id.unwrap_or("");
    tab.segment_mut(if id.is_empty() { None } else { Some(id) })
        .ok_or_else(|| MockError::UnknownSegment(id.to_string()))
}

fn resolve_range_segment<'a>(doc: &'a mut Document, range: &Range) -> Result<&'a mut Segment> {
    resolve_segment(doc, range.tab_id.as_deref(), range.segment_id.as_deref())
}

//! Reconciliation: derive the `batchUpdate` script that turns a base
//! document into a desired document.
//!
//! The reconciler walks the two documents in parallel by tab, then by
//! segment, then by structural element. Inside a segment it runs an
//! LCS over content fingerprints and processes the resulting blocks
//! sequentially, maintaining a running net shift so every request's
//! indices are correct in the state produced by all prior requests.
//! It either returns a complete plan or fails; there is no partial
//! output.

mod comments;
mod emit;
mod error;
mod fingerprint;
mod lcs;
mod paragraphs;
mod planner;
mod segment;
mod tables;

pub use comments::CommentOp;
pub use emit::{PlaceholderBinding, ReconcileStats};
pub use error::{ReconcileError, Result};

use emit::{Emitter, SegmentCtx};
use extrasuite_docs_types::{Document, Request, Segment, SegmentId, Tab};
use hashlink::LinkedHashMap;
use segment::Walk;
use serde::Serialize;
use tracing::debug;

type SegmentMap = LinkedHashMap<String, Segment>;

/// The reconciler's output: an ordered `batchUpdate` request list, a
/// sibling Drive script for comments, and the placeholder bindings for
/// containers the script itself creates.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcilePlan {
    pub requests: Vec<Request>,
    pub comment_ops: Vec<CommentOp>,
    pub placeholders: Vec<PlaceholderBinding>,
    pub stats: ReconcileStats,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.comment_ops.is_empty()
    }
}

/// Reconcile `base` into `desired`.
pub fn reconcile(base: &Document, desired: &Document) -> Result<ReconcilePlan> {
    let mut em = Emitter::default();
    let mut comment_ops = Vec::new();

    let multi_tab = base.tabs.len() > 1 || desired.tabs.len() > 1;

    for desired_tab in &desired.tabs {
        match base.find_tab(&desired_tab.tab_id) {
            Some(base_tab) => {
                reconcile_tab(&mut em, &mut comment_ops, base_tab, desired_tab, multi_tab)?;
            }
            None => {
                let request_index = em.requests.len();
                em.push(Request::AddDocumentTab(
                    extrasuite_docs_types::AddDocumentTabRequest {
                        title: desired_tab.title.clone(),
                    },
                ));
                em.bind_placeholder(request_index, &desired_tab.tab_id);
                let empty = Tab::empty(desired_tab.tab_id.clone(), desired_tab.title.clone());
                reconcile_tab(&mut em, &mut comment_ops, &empty, desired_tab, true)?;
            }
        }
    }
    if desired.tabs.is_empty() {
        return Err(ReconcileError::unsupported(
            "a document must keep at least one tab",
        ));
    }
    for base_tab in &base.tabs {
        if desired.find_tab(&base_tab.tab_id).is_none() {
            em.push(Request::DeleteTab(extrasuite_docs_types::DeleteTabRequest {
                tab_id: base_tab.tab_id.clone(),
            }));
        }
    }

    planner::check_script(&em.requests, base, desired)?;
    debug!(
        requests = em.requests.len(),
        comment_ops = comment_ops.len(),
        "reconcile complete"
    );
    Ok(ReconcilePlan {
        requests: em.requests,
        comment_ops,
        placeholders: em.placeholders,
        stats: em.stats,
    })
}

fn reconcile_tab(
    em: &mut Emitter,
    comment_ops: &mut Vec<CommentOp>,
    base: &Tab,
    desired: &Tab,
    multi_tab: bool,
) -> Result<()> {
    if !base.title.is_empty() && !desired.title.is_empty() && base.title != desired.title {
        return Err(ReconcileError::unsupported("tab titles cannot be changed"));
    }
    for (name, b, d) in [
        ("document style", &base.document_style, &desired.document_style),
        ("named styles", &base.named_styles, &desired.named_styles),
        ("inline objects", &base.inline_objects, &desired.inline_objects),
        (
            "positioned objects",
            &base.positioned_objects,
            &desired.positioned_objects,
        ),
        ("named ranges", &base.named_ranges, &desired.named_ranges),
    ] {
        if b != d {
            return Err(ReconcileError::unsupported(format!(
                "{name} cannot be edited"
            )));
        }
    }

    let tab_id = multi_tab.then_some(desired.tab_id.as_str());
    let mut walk = Walk {
        base_footnote_ids: base.footnotes.keys().cloned().collect(),
        ..Walk::default()
    };

    segment::reconcile_segment(
        em,
        &mut walk,
        SegmentCtx {
            tab_id,
            segment_id: None,
        },
        &base.body,
        &desired.body,
    )?;

    reconcile_keyed_segments(
        em,
        &mut walk,
        tab_id,
        "header",
        &base.headers,
        &desired.headers,
        |em, ctx_tab| {
            em.push(Request::CreateHeader(
                extrasuite_docs_types::CreateHeaderRequest {
                    header_type: Default::default(),
                    tab_id: ctx_tab.map(str::to_string),
                },
            ));
        },
    )?;
    reconcile_keyed_segments(
        em,
        &mut walk,
        tab_id,
        "footer",
        &base.footers,
        &desired.footers,
        |em, ctx_tab| {
            em.push(Request::CreateFooter(
                extrasuite_docs_types::CreateFooterRequest {
                    footer_type: Default::default(),
                    tab_id: ctx_tab.map(str::to_string),
                },
            ));
        },
    )?;

    // Footnote segments: common ids diff normally; ids created during
    // the body walk are populated against an empty segment.
    for (id, desired_seg) in &desired.footnotes {
        if let Some(base_seg) = base.footnotes.get(id) {
            segment::reconcile_segment(
                em,
                &mut walk,
                SegmentCtx {
                    tab_id,
                    segment_id: Some(id),
                },
                base_seg,
                desired_seg,
            )?;
        } else if walk.new_footnotes.contains(id) {
            let empty = Segment::empty(SegmentId::Footnote(id.clone()));
            segment::reconcile_segment(
                em,
                &mut walk,
                SegmentCtx {
                    tab_id,
                    segment_id: Some(id),
                },
                &empty,
                desired_seg,
            )?;
        }
        // An unreferenced desired footnote cannot exist: the XML layer
        // only materializes footnotes from their references.
    }

    comment_ops.extend(comments::reconcile_comments(&base.comments, &desired.comments)?);
    Ok(())
}

fn reconcile_keyed_segments(
    em: &mut Emitter,
    walk: &mut Walk,
    tab_id: Option<&str>,
    kind: &str,
    base: &SegmentMap,
    desired: &SegmentMap,
    create: impl Fn(&mut Emitter, Option<&str>),
) -> Result<()> {
    for id in base.keys() {
        if !desired.contains_key(id) {
            return Err(ReconcileError::unsupported(format!(
                "a {kind} cannot be removed"
            )));
        }
    }
    for (id, desired_seg) in desired {
        match base.get(id) {
            Some(base_seg) => {
                segment::reconcile_segment(
                    em,
                    walk,
                    SegmentCtx {
                        tab_id,
                        segment_id: Some(id),
                    },
                    base_seg,
                    desired_seg,
                )?;
            }
            None => {
                let request_index = em.requests.len();
                create(em, tab_id);
                em.bind_placeholder(request_index, id);
                let segment_id = match kind {
                    "header" => SegmentId::Header(id.clone()),
                    _ => SegmentId::Footer(id.clone()),
                };
                let empty = Segment::empty(segment_id);
                segment::reconcile_segment(
                    em,
                    walk,
                    SegmentCtx {
                        tab_id,
                        segment_id: Some(id),
                    },
                    &empty,
                    desired_seg,
                )?;
            }
        }
    }
    Ok(())
}

/// Rewrite every reference to `placeholder` in the request list to the
/// server-assigned `actual` id. Drivers call this as create replies
/// arrive, before dispatching the requests that follow the create.
pub fn bind_placeholder(requests: &mut [Request], placeholder: &str, actual: &str) {
    let rebind = |slot: &mut Option<String>| {
        if slot.as_deref() == Some(placeholder) {
            *slot = Some(actual.to_string());
        }
    };
    for request in requests {
        match request {
            Request::InsertText(r) => {
                rebind(&mut r.location.segment_id);
                rebind(&mut r.location.tab_id);
            }
            Request::DeleteContentRange(r) => {
                rebind(&mut r.range.segment_id);
                rebind(&mut r.range.tab_id);
            }
            Request::UpdateTextStyle(r) => {
                rebind(&mut r.range.segment_id);
                rebind(&mut r.range.tab_id);
            }
            Request::UpdateParagraphStyle(r) => {
                rebind(&mut r.range.segment_id);
                rebind(&mut r.range.tab_id);
            }
            Request::CreateParagraphBullets(r) => {
                rebind(&mut r.range.segment_id);
                rebind(&mut r.range.tab_id);
            }
            Request::DeleteParagraphBullets(r) => {
                rebind(&mut r.range.segment_id);
                rebind(&mut r.range.tab_id);
            }
            Request::InsertTable(r) => {
                rebind(&mut r.location.segment_id);
                rebind(&mut r.location.tab_id);
            }
            Request::InsertTableRow(r) => {
                rebind(&mut r.table_cell_location.table_start_location.segment_id);
                rebind(&mut r.table_cell_location.table_start_location.tab_id);
            }
            Request::InsertTableColumn(r) => {
                rebind(&mut r.table_cell_location.table_start_location.segment_id);
                rebind(&mut r.table_cell_location.table_start_location.tab_id);
            }
            Request::DeleteTableRow(r) => {
                rebind(&mut r.table_cell_location.table_start_location.segment_id);
                rebind(&mut r.table_cell_location.table_start_location.tab_id);
            }
            Request::DeleteTableColumn(r) => {
                rebind(&mut r.table_cell_location.table_start_location.segment_id);
                rebind(&mut r.table_cell_location.table_start_location.tab_id);
            }
            Request::CreateHeader(r) => rebind(&mut r.tab_id),
            Request::CreateFooter(r) => rebind(&mut r.tab_id),
            Request::CreateFootnote(r) => {
                rebind(&mut r.location.segment_id);
                rebind(&mut r.location.tab_id);
            }
            Request::DeleteTab(r) => {
                if r.tab_id == placeholder {
                    r.tab_id = actual.to_string();
                }
            }
            Request::AddDocumentTab(_)
            | Request::MergeTableCells(_)
            | Request::InsertInlineImage(_)
            | Request::InsertPageBreak(_) => {}
        }
    }
}

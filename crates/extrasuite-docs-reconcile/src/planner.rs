//! Post-emission index self-check.
//!
//! By the time emission finishes, every index is supposed to be in
//! final-state coordinates (inserts, styles) or pre-block coordinates
//! (deletes). This pass re-verifies the arithmetic: content inserts
//! must be non-decreasing, consecutive delete ranges must not overlap,
//! and everything must fall inside its segment's bounds. A failure here
//! is an internal bug and aborts with the full script attached.

use crate::error::{ReconcileError, Result};
use extrasuite_docs_types::{Document, Range, Request};

fn fail(message: String, requests: &[Request]) -> ReconcileError {
    ReconcileError::IndexCheck {
        message,
        script: serde_json::to_string_pretty(requests)
            .unwrap_or_else(|_| "<unserializable script>".to_string()),
    }
}

fn segment_key(tab_id: &Option<String>, segment_id: &Option<String>) -> (String, String) {
    (
        tab_id.clone().unwrap_or_default(),
        segment_id.clone().unwrap_or_default(),
    )
}

/// Upper bound for indices in one segment across the whole batch: the
/// larger of the base and final extents, plus any transient nesting
/// tabs (inserted and then consumed by a bullet request).
fn segment_bound(base: &Document, desired: &Document, key: &(String, String)) -> usize {
    let end_of = |doc: &Document| -> usize {
        let tab = if key.0.is_empty() {
            doc.tabs.first()
        } else {
            doc.find_tab(&key.0)
        };
        tab.and_then(|t| {
            t.segment(if key.1.is_empty() {
                None
            } else {
                Some(key.1.as_str())
            })
        })
        .map_or(0, |s| s.end_index())
    };
    end_of(base).max(end_of(desired))
}

fn is_nesting_tabs(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c == '\t')
}

pub(crate) fn check_script(
    requests: &[Request],
    base: &Document,
    desired: &Document,
) -> Result<()> {
    use std::collections::HashMap;

    #[derive(Default)]
    struct SegmentState {
        last_insert: Option<usize>,
        pending_deletes: Vec<(usize, usize)>,
    }
    let mut segments: HashMap<(String, String), SegmentState> = HashMap::new();

    let check_range = |range: &Range, kind: &str| -> Result<()> {
        if range.start_index >= range.end_index {
            return Err(fail(
                format!("{kind} range [{}, {}) is empty or inverted", range.start_index, range.end_index),
                requests,
            ));
        }
        Ok(())
    };

    for request in requests {
        match request {
            Request::InsertText(r) => {
                let key = segment_key(&r.location.tab_id, &r.location.segment_id);
                let state = segments.entry(key).or_default();
                state.pending_deletes.clear();
                if is_nesting_tabs(&r.text) {
                    // Nesting tabs are transient and may land below an
                    // earlier content insert; they are exempt here.
                    continue;
                }
                if let Some(last) = state.last_insert
                    && r.location.index < last
                {
                    return Err(fail(
                        format!(
                            "insert at {} after an insert at {last}; inserts must not move backwards",
                            r.location.index
                        ),
                        requests,
                    ));
                }
                state.last_insert = Some(r.location.index);
            }
            Request::InsertTable(r) => {
                let key = segment_key(&r.location.tab_id, &r.location.segment_id);
                let state = segments.entry(key).or_default();
                state.pending_deletes.clear();
                if let Some(last) = state.last_insert
                    && r.location.index < last
                {
                    return Err(fail(
                        format!("table insert at {} moves backwards", r.location.index),
                        requests,
                    ));
                }
                state.last_insert = Some(r.location.index);
            }
            Request::DeleteContentRange(r) => {
                check_range(&r.range, "delete")?;
                let key = segment_key(&r.range.tab_id, &r.range.segment_id);
                let state = segments.entry(key).or_default();
                let span = (r.range.start_index, r.range.end_index);
                for (s, e) in &state.pending_deletes {
                    if span.0 < *e && *s < span.1 {
                        return Err(fail(
                            format!(
                                "delete [{}, {}) overlaps earlier delete [{s}, {e})",
                                span.0, span.1
                            ),
                            requests,
                        ));
                    }
                }
                state.pending_deletes.push(span);
            }
            Request::UpdateTextStyle(r) => check_range(&r.range, "updateTextStyle")?,
            Request::CreateParagraphBullets(r) => check_range(&r.range, "createParagraphBullets")?,
            Request::DeleteParagraphBullets(r) => check_range(&r.range, "deleteParagraphBullets")?,
            _ => {}
        }
    }

    // Bounds, with the per-segment envelope.
    let mut allowances: HashMap<(String, String), usize> = HashMap::new();
    for request in requests {
        if let Request::InsertText(r) = request
            && is_nesting_tabs(&r.text)
        {
            let key = segment_key(&r.location.tab_id, &r.location.segment_id);
            *allowances.entry(key).or_default() += r.text.len();
        }
    }
    for request in requests {
        let (key, max_index) = match request {
            Request::InsertText(r) => (
                segment_key(&r.location.tab_id, &r.location.segment_id),
                r.location.index,
            ),
            Request::InsertTable(r) => (
                segment_key(&r.location.tab_id, &r.location.segment_id),
                r.location.index,
            ),
            Request::CreateFootnote(r) => (
                segment_key(&r.location.tab_id, &r.location.segment_id),
                r.location.index,
            ),
            Request::DeleteContentRange(r) => (
                segment_key(&r.range.tab_id, &r.range.segment_id),
                r.range.end_index,
            ),
            Request::UpdateTextStyle(r) => (
                segment_key(&r.range.tab_id, &r.range.segment_id),
                r.range.end_index,
            ),
            Request::UpdateParagraphStyle(r) => (
                segment_key(&r.range.tab_id, &r.range.segment_id),
                r.range.end_index,
            ),
            Request::CreateParagraphBullets(r) => (
                segment_key(&r.range.tab_id, &r.range.segment_id),
                r.range.end_index,
            ),
            Request::DeleteParagraphBullets(r) => (
                segment_key(&r.range.tab_id, &r.range.segment_id),
                r.range.end_index,
            ),
            _ => continue,
        };
        let bound = segment_bound(base, desired, &key)
            + allowances.get(&key).copied().unwrap_or_default();
        if max_index > bound {
            return Err(fail(
                format!(
                    "{} references index {max_index} beyond segment bound {bound}",
                    request.kind_name()
                ),
                requests,
            ));
        }
    }
    Ok(())
}

//! Request emission helpers and reconciliation statistics.

use extrasuite_docs_types::style::{
    BulletPreset, FieldSet, ParagraphFieldSet, ParagraphStyle, TextStyle,
};
use extrasuite_docs_types::{
    CreateFootnoteRequest, CreateParagraphBulletsRequest, DeleteContentRangeRequest,
    DeleteParagraphBulletsRequest, InsertTableRequest, InsertTextRequest, Location, Range,
    Request, UpdateParagraphStyleRequest, UpdateTextStyleRequest,
};
use serde::Serialize;

/// Counters summarizing what the reconciler decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub blocks_equal: usize,
    pub blocks_replaced: usize,
    pub blocks_inserted: usize,
    pub blocks_deleted: usize,
    pub requests: usize,
}

/// A request position whose segment/tab id refers to a container that
/// only exists after an earlier create request is applied. The driver
/// rebinds `placeholder_id` to the id in that create's reply before the
/// later requests are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderBinding {
    /// Index of the create request in the emitted list.
    pub request_index: usize,
    pub placeholder_id: String,
}

/// Addressing context: which tab and segment the current walk targets.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SegmentCtx<'a> {
    pub tab_id: Option<&'a str>,
    pub segment_id: Option<&'a str>,
}

impl SegmentCtx<'_> {
    fn location(&self, index: usize) -> Location {
        Location {
            segment_id: self.segment_id.map(str::to_string),
            tab_id: self.tab_id.map(str::to_string),
            index,
        }
    }

    fn range(&self, start: usize, end: usize) -> Range {
        Range {
            segment_id: self.segment_id.map(str::to_string),
            tab_id: self.tab_id.map(str::to_string),
            start_index: start,
            end_index: end,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Emitter {
    pub requests: Vec<Request>,
    pub placeholders: Vec<PlaceholderBinding>,
    pub stats: ReconcileStats,
}

impl Emitter {
    pub fn push(&mut self, request: Request) {
        tracing::trace!(kind = request.kind_name(), "emit");
        self.requests.push(request);
        self.stats.requests += 1;
    }

    pub fn insert_text(&mut self, ctx: SegmentCtx<'_>, index: usize, text: String) {
        self.push(Request::InsertText(InsertTextRequest {
            location: ctx.location(index),
            text,
        }));
    }

    pub fn delete_range(&mut self, ctx: SegmentCtx<'_>, start: usize, end: usize) {
        self.push(Request::DeleteContentRange(DeleteContentRangeRequest {
            range: ctx.range(start, end),
        }));
    }

    pub fn update_text_style(
        &mut self,
        ctx: SegmentCtx<'_>,
        start: usize,
        end: usize,
        style: TextStyle,
        fields: FieldSet,
    ) {
        self.push(Request::UpdateTextStyle(UpdateTextStyleRequest {
            range: ctx.range(start, end),
            text_style: style,
            fields,
        }));
    }

    pub fn update_paragraph_style(
        &mut self,
        ctx: SegmentCtx<'_>,
        start: usize,
        end: usize,
        style: ParagraphStyle,
        fields: ParagraphFieldSet,
    ) {
        self.push(Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
            range: ctx.range(start, end),
            paragraph_style: style,
            fields,
        }));
    }

    pub fn create_bullets(
        &mut self,
        ctx: SegmentCtx<'_>,
        start: usize,
        end: usize,
        preset: BulletPreset,
    ) {
        self.push(Request::CreateParagraphBullets(
            CreateParagraphBulletsRequest {
                range: ctx.range(start, end),
                bullet_preset: preset,
            },
        ));
    }

    pub fn delete_bullets(&mut self, ctx: SegmentCtx<'_>, start: usize, end: usize) {
        self.push(Request::DeleteParagraphBullets(
            DeleteParagraphBulletsRequest {
                range: ctx.range(start, end),
            },
        ));
    }

    pub fn insert_table(&mut self, ctx: SegmentCtx<'_>, index: usize, rows: usize, columns: usize) {
        self.push(Request::InsertTable(InsertTableRequest {
            location: ctx.location(index),
            rows,
            columns,
        }));
    }

    /// Emit a createFootnote and record the placeholder binding for the
    /// footnote id the desired folder invented.
    pub fn create_footnote(&mut self, ctx: SegmentCtx<'_>, index: usize, placeholder_id: &str) {
        let request_index = self.requests.len();
        self.push(Request::CreateFootnote(CreateFootnoteRequest {
            location: ctx.location(index),
        }));
        self.placeholders.push(PlaceholderBinding {
            request_index,
            placeholder_id: placeholder_id.to_string(),
        });
    }

    pub fn bind_placeholder(&mut self, request_index: usize, placeholder_id: &str) {
        self.placeholders.push(PlaceholderBinding {
            request_index,
            placeholder_id: placeholder_id.to_string(),
        });
    }
}

//! Typed document model for the ExtraSuite Google Docs pipeline.
//!
//! Mirrors the Docs REST `Document` resource as a tree of tagged
//! variants, with one addition the wire shape does not have: the
//! `explicit` style-provenance set each [`TextStyle`] carries during a
//! mock session. Everything is addressed in UTF-16 code units; indices
//! are derived from content by [`Segment::reindex`], never authored.

pub mod comment;
pub mod document;
pub mod equality;
pub mod error;
pub mod paragraph;
pub mod request;
pub mod style;
pub mod table;
pub mod utf16;

pub use comment::{Comment, CommentReply};
pub use document::{
    Document, SectionBreak, Segment, SegmentId, StructuralElement, Tab, TableOfContents,
};
pub use equality::{Mismatch, Tolerance, compare_documents, documents_equivalent};
pub use error::ModelError;
pub use paragraph::{
    AutoText, ColumnBreak, DateChip, Equation, FootnoteReference, HorizontalRule,
    InlineObjectElement, PageBreak, Paragraph, ParagraphElement, Person, RichLink, TextRun,
};
pub use request::{
    AddDocumentTabReply, AddDocumentTabRequest, CreateFooterReply, CreateFooterRequest,
    CreateFootnoteReply, CreateFootnoteRequest, CreateHeaderReply, CreateHeaderRequest,
    CreateParagraphBulletsRequest, DeleteContentRangeRequest, DeleteParagraphBulletsRequest,
    DeleteTabRequest, DeleteTableColumnRequest, DeleteTableRowRequest, HeaderFooterType,
    InsertTableColumnRequest, InsertTableRequest, InsertTableRowRequest, InsertTextRequest,
    Location, Range, Reply, Request, TableCellLocation, UpdateParagraphStyleRequest,
    UpdateTextStyleRequest,
};
pub use style::{
    Alignment, BaselineOffset, Bullet, BulletPreset, ContentDirection, FieldSet, Link, Mask,
    MaskField, NamedStyleType, ParagraphField, ParagraphFieldSet, ParagraphStyle, RgbColor,
    StyleField, TextStyle,
};
pub use table::{Table, TableCell, TableCellStyle, TableRow};
pub use utf16::{common_prefix, common_suffix, utf16_len, utf16_slice, utf16_to_byte};

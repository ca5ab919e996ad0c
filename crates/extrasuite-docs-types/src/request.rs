//! `batchUpdate` requests and replies.
//!
//! Each request is a tagged variant carrying its kind-specific payload,
//! serialized externally-tagged so a request list matches the REST wire
//! shape (`{"insertText": {...}}`). Indices inside a request are UTF-16
//! offsets into the document state produced by all prior requests in
//! the same batch.

use crate::style::{
    BulletPreset, FieldSet, ParagraphFieldSet, ParagraphStyle, TextStyle,
};
use serde::{Deserialize, Serialize};

/// A position inside one segment of one tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
    pub index: usize,
}

impl Location {
    pub fn at(index: usize) -> Location {
        Location {
            index,
            ..Location::default()
        }
    }

    pub fn in_segment(segment_id: Option<String>, index: usize) -> Location {
        Location {
            segment_id,
            tab_id: None,
            index,
        }
    }
}

/// A half-open `[start, end)` range inside one segment of one tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Range {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
    pub start_index: usize,
    pub end_index: usize,
}

impl Range {
    pub fn new(start_index: usize, end_index: usize) -> Range {
        Range {
            start_index,
            end_index,
            ..Range::default()
        }
    }

    pub fn in_segment(segment_id: Option<String>, start_index: usize, end_index: usize) -> Range {
        Range {
            segment_id,
            tab_id: None,
            start_index,
            end_index,
        }
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Address of a table cell: the table's start location plus row/column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCellLocation {
    pub table_start_location: Location,
    pub row_index: usize,
    pub column_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    InsertText(InsertTextRequest),
    DeleteContentRange(DeleteContentRangeRequest),
    UpdateTextStyle(UpdateTextStyleRequest),
    UpdateParagraphStyle(UpdateParagraphStyleRequest),
    CreateParagraphBullets(CreateParagraphBulletsRequest),
    DeleteParagraphBullets(DeleteParagraphBulletsRequest),
    InsertTable(InsertTableRequest),
    InsertTableRow(InsertTableRowRequest),
    InsertTableColumn(InsertTableColumnRequest),
    DeleteTableRow(DeleteTableRowRequest),
    DeleteTableColumn(DeleteTableColumnRequest),
    CreateHeader(CreateHeaderRequest),
    CreateFooter(CreateFooterRequest),
    CreateFootnote(CreateFootnoteRequest),
    AddDocumentTab(AddDocumentTabRequest),
    DeleteTab(DeleteTabRequest),
    // Accepted but not implemented by the mock; they reply empty so a
    // stray occurrence cannot poison a test run.
    MergeTableCells(serde_json::Value),
    InsertInlineImage(serde_json::Value),
    InsertPageBreak(serde_json::Value),
}

impl Request {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Request::InsertText(_) => "insertText",
            Request::DeleteContentRange(_) => "deleteContentRange",
            Request::UpdateTextStyle(_) => "updateTextStyle",
            Request::UpdateParagraphStyle(_) => "updateParagraphStyle",
            Request::CreateParagraphBullets(_) => "createParagraphBullets",
            Request::DeleteParagraphBullets(_) => "deleteParagraphBullets",
            Request::InsertTable(_) => "insertTable",
            Request::InsertTableRow(_) => "insertTableRow",
            Request::InsertTableColumn(_) => "insertTableColumn",
            Request::DeleteTableRow(_) => "deleteTableRow",
            Request::DeleteTableColumn(_) => "deleteTableColumn",
            Request::CreateHeader(_) => "createHeader",
            Request::CreateFooter(_) => "createFooter",
            Request::CreateFootnote(_) => "createFootnote",
            Request::AddDocumentTab(_) => "addDocumentTab",
            Request::DeleteTab(_) => "deleteTab",
            Request::MergeTableCells(_) => "mergeTableCells",
            Request::InsertInlineImage(_) => "insertInlineImage",
            Request::InsertPageBreak(_) => "insertPageBreak",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsertTextRequest {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteContentRangeRequest {
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTextStyleRequest {
    pub range: Range,
    pub text_style: TextStyle,
    pub fields: FieldSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateParagraphStyleRequest {
    pub range: Range,
    pub paragraph_style: ParagraphStyle,
    pub fields: ParagraphFieldSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParagraphBulletsRequest {
    pub range: Range,
    pub bullet_preset: BulletPreset,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteParagraphBulletsRequest {
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsertTableRequest {
    pub location: Location,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsertTableRowRequest {
    pub table_cell_location: TableCellLocation,
    pub insert_below: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsertTableColumnRequest {
    pub table_cell_location: TableCellLocation,
    pub insert_right: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteTableRowRequest {
    pub table_cell_location: TableCellLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteTableColumnRequest {
    pub table_cell_location: TableCellLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateHeaderRequest {
    #[serde(rename = "type")]
    pub header_type: HeaderFooterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFooterRequest {
    #[serde(rename = "type")]
    pub footer_type: HeaderFooterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderFooterType {
    #[default]
    #[serde(rename = "DEFAULT")]
    Default,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFootnoteRequest {
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddDocumentTabRequest {
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteTabRequest {
    pub tab_id: String,
}

/// Per-request reply. Most requests reply empty; creates report the
/// server-assigned id so callers can rebind placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reply {
    Empty,
    CreateHeader(CreateHeaderReply),
    CreateFooter(CreateFooterReply),
    CreateFootnote(CreateFootnoteReply),
    AddDocumentTab(AddDocumentTabReply),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateHeaderReply {
    pub header_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFooterReply {
    pub footer_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFootnoteReply {
    pub footnote_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddDocumentTabReply {
    pub tab_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleField;

    #[test]
    fn requests_serialize_externally_tagged() {
        let req = Request::InsertText(InsertTextRequest {
            location: Location::at(6),
            text: " Beautiful".to_string(),
        });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["insertText"]["location"]["index"], 6);
        assert_eq!(json["insertText"]["text"], " Beautiful");
    }

    #[test]
    fn field_masks_serialize_as_strings() {
        let req = Request::UpdateTextStyle(UpdateTextStyleRequest {
            range: Range::new(16, 21),
            text_style: TextStyle {
                bold: Some(true),
                ..TextStyle::default()
            },
            fields: FieldSet::of(&[StyleField::Bold]),
        });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["updateTextStyle"]["fields"], "bold");
        assert_eq!(json["updateTextStyle"]["textStyle"]["bold"], true);
        assert_eq!(json["updateTextStyle"]["range"]["startIndex"], 16);
    }

    #[test]
    fn request_round_trips_through_json() {
        let req = Request::InsertTable(InsertTableRequest {
            location: Location::at(7),
            rows: 3,
            columns: 3,
        });
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }
}

//! Tables.
//!
//! Index scheme: the table occupies one marker unit, then each row one
//! marker unit, then each cell one marker unit followed by its content.
//! The table's end index is the last row's end; an empty R×C table spans
//! `1 + R*(1 + 2C)` units.

use crate::document::StructuralElement;
use crate::style::RgbColor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub start_index: usize,
    pub end_index: usize,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableRow {
    pub start_index: usize,
    pub end_index: usize,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCell {
    pub start_index: usize,
    pub end_index: usize,
    #[serde(rename = "tableCellStyle")]
    pub style: TableCellStyle,
    pub content: Vec<StructuralElement>,
}

/// Cell attributes. Defaults (`columnSpan: 1`, `rowSpan: 1`, no
/// background) are omitted by the XML layer and restored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCellStyle {
    pub column_span: usize,
    pub row_span: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<RgbColor>,
}

impl Default for TableCellStyle {
    fn default() -> Self {
        TableCellStyle {
            column_span: 1,
            row_span: 1,
            background_color: None,
        }
    }
}

impl TableCellStyle {
    pub fn is_default(&self) -> bool {
        *self == TableCellStyle::default()
    }
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of physical cell slots per row. Merged cells keep their
    /// placeholder slots, so every row reports the same count on a
    /// well-formed table.
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, |r| r.cells.len())
    }

    /// True when every row has the same number of physical cell slots.
    pub fn is_rectangular(&self) -> bool {
        let cols = self.column_count();
        self.rows.iter().all(|r| r.cells.len() == cols)
    }

    pub fn len_utf16(&self) -> usize {
        1 + self.rows.iter().map(TableRow::len_utf16).sum::<usize>()
    }

    /// An R×C table of empty cells, indices unassigned.
    pub fn empty(rows: usize, columns: usize) -> Table {
        Table {
            start_index: 0,
            end_index: 0,
            rows: (0..rows)
                .map(|_| TableRow {
                    start_index: 0,
                    end_index: 0,
                    cells: (0..columns).map(|_| TableCell::empty()).collect(),
                })
                .collect(),
        }
    }
}

impl TableRow {
    pub fn len_utf16(&self) -> usize {
        1 + self.cells.iter().map(TableCell::len_utf16).sum::<usize>()
    }
}

impl TableCell {
    pub fn len_utf16(&self) -> usize {
        1 + self
            .content
            .iter()
            .map(StructuralElement::len_utf16)
            .sum::<usize>()
    }

    /// A cell holding one empty paragraph.
    pub fn empty() -> TableCell {
        TableCell {
            start_index: 0,
            end_index: 0,
            style: TableCellStyle::default(),
            content: vec![StructuralElement::Paragraph(
                crate::paragraph::Paragraph::empty(Default::default(), Default::default()),
            )],
        }
    }
}

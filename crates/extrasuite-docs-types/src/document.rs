//! The document tree: tabs, segments, and structural elements.

use crate::comment::Comment;
use crate::error::ModelError;
use crate::paragraph::{Paragraph, ParagraphElement};
use crate::table::Table;
use crate::utf16::utf16_len;
use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Google Docs document: an ordered collection of tabs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub document_id: String,
    pub title: String,
    pub tabs: Vec<Tab>,
}

impl Document {
    pub fn find_tab(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.tab_id == tab_id)
    }

    pub fn find_tab_mut(&mut self, tab_id: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.tab_id == tab_id)
    }

    /// Reindex every segment of every tab.
    pub fn reindex(&mut self) {
        for tab in &mut self.tabs {
            tab.reindex();
        }
    }

    /// Check the structural invariants of every segment.
    pub fn check_invariants(&self) -> Result<(), ModelError> {
        for tab in &self.tabs {
            tab.check_invariants()?;
        }
        Ok(())
    }
}

/// One tab of a document: a body plus optional header/footer/footnote
/// segments and the per-tab style tables.
///
/// The style tables (document style, named styles, objects, named
/// ranges) are opaque to the core: they are carried as JSON, diffed for
/// equality, and round-tripped through their sidecar files untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tab {
    pub tab_id: String,
    pub title: String,
    pub body: Segment,
    #[serde(skip_serializing_if = "LinkedHashMap::is_empty")]
    pub headers: LinkedHashMap<String, Segment>,
    #[serde(skip_serializing_if = "LinkedHashMap::is_empty")]
    pub footers: LinkedHashMap<String, Segment>,
    #[serde(skip_serializing_if = "LinkedHashMap::is_empty")]
    pub footnotes: LinkedHashMap<String, Segment>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub document_style: serde_json::Value,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub named_styles: serde_json::Value,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub inline_objects: serde_json::Value,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub positioned_objects: serde_json::Value,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub named_ranges: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

impl Tab {
    /// A tab with an empty body (leading section break plus one empty
    /// paragraph), indices assigned.
    pub fn empty(tab_id: impl Into<String>, title: impl Into<String>) -> Tab {
        let mut tab = Tab {
            tab_id: tab_id.into(),
            title: title.into(),
            body: Segment {
                id: SegmentId::Body,
                content: vec![
                    StructuralElement::SectionBreak(SectionBreak::default()),
                    StructuralElement::Paragraph(Paragraph::empty(
                        Default::default(),
                        Default::default(),
                    )),
                ],
            },
            ..Tab::default()
        };
        tab.reindex();
        tab
    }

    /// Look up a segment by the optional string id used in request
    /// locations (`None`/empty means the body).
    pub fn segment(&self, segment_id: Option<&str>) -> Option<&Segment> {
        match segment_id {
            None | Some("") => Some(&self.body),
            Some(id) => self
                .headers
                .get(id)
                .or_else(|| self.footers.get(id))
                .or_else(|| self.footnotes.get(id)),
        }
    }

    pub fn segment_mut(&mut self, segment_id: Option<&str>) -> Option<&mut Segment> {
        match segment_id {
            None | Some("") => Some(&mut self.body),
            Some(id) => {
                if self.headers.contains_key(id) {
                    self.headers.get_mut(id)
                } else if self.footers.contains_key(id) {
                    self.footers.get_mut(id)
                } else {
                    self.footnotes.get_mut(id)
                }
            }
        }
    }

    /// All segments in a fixed order: body, headers, footers, footnotes.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        std::iter::once(&self.body)
            .chain(self.headers.values())
            .chain(self.footers.values())
            .chain(self.footnotes.values())
    }

    pub fn segments_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        std::iter::once(&mut self.body)
            .chain(self.headers.values_mut())
            .chain(self.footers.values_mut())
            .chain(self.footnotes.values_mut())
    }

    pub fn reindex(&mut self) {
        for segment in self.segments_mut() {
            segment.reindex();
        }
    }

    pub fn check_invariants(&self) -> Result<(), ModelError> {
        for segment in self.segments() {
            segment.check_invariants()?;
        }
        Ok(())
    }
}

/// Identity of a segment. The body has no id; every other segment kind
/// carries the server-assigned id referenced by request locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentId {
    Body,
    Header(String),
    Footer(String),
    Footnote(String),
}

impl Default for SegmentId {
    fn default() -> Self {
        SegmentId::Body
    }
}

impl SegmentId {
    /// The string id used in request `Location`s; `None` for the body.
    pub fn as_str_id(&self) -> Option<&str> {
        match self {
            SegmentId::Body => None,
            SegmentId::Header(id) | SegmentId::Footer(id) | SegmentId::Footnote(id) => Some(id),
        }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentId::Body => write!(f, "body"),
            SegmentId::Header(id) => write!(f, "header {id}"),
            SegmentId::Footer(id) => write!(f, "footer {id}"),
            SegmentId::Footnote(id) => write!(f, "footnote {id}"),
        }
    }
}

/// A segment: an ordered sequence of structural elements with its own
/// independent index space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Segment {
    pub id: SegmentId,
    pub content: Vec<StructuralElement>,
}

impl Segment {
    /// An empty non-body segment: one empty paragraph, indices assigned.
    pub fn empty(id: SegmentId) -> Segment {
        let mut seg = Segment {
            id,
            content: vec![StructuralElement::Paragraph(Paragraph::empty(
                Default::default(),
                Default::default(),
            ))],
        };
        seg.reindex();
        seg
    }

    /// One past the last index in this segment (0 for an empty one).
    pub fn end_index(&self) -> usize {
        self.content.last().map_or(0, StructuralElement::end_index)
    }

    /// Recompute every `startIndex`/`endIndex` in the segment from the
    /// actual content. Indices are derived, never authored; this is the
    /// only place they are written.
    pub fn reindex(&mut self) {
        let mut pos = 0usize;
        for el in &mut self.content {
            reindex_element(el, &mut pos);
        }
    }

    /// Verify the structural invariants that must hold after any
    /// mutation: trailing paragraph, trailing newline runs, contiguous
    /// indices, run lengths, no interior newlines, non-empty cells,
    /// rectangular tables.
    pub fn check_invariants(&self) -> Result<(), ModelError> {
        check_elements(&self.id, &self.content, 0)?;
        match self.content.last() {
            Some(StructuralElement::Paragraph(_)) => Ok(()),
            _ => Err(ModelError::SegmentMustEndInParagraph {
                segment: self.id.to_string(),
            }),
        }
    }
}

fn reindex_element(el: &mut StructuralElement, pos: &mut usize) {
    match el {
        StructuralElement::Paragraph(p) => {
            p.start_index = *pos;
            for e in &mut p.elements {
                let len = e.len_utf16();
                e.set_indices(*pos, *pos + len);
                *pos += len;
            }
            p.end_index = *pos;
        }
        StructuralElement::Table(t) => {
            t.start_index = *pos;
            *pos += 1;
            for row in &mut t.rows {
                row.start_index = *pos;
                *pos += 1;
                for cell in &mut row.cells {
                    cell.start_index = *pos;
                    *pos += 1;
                    for inner in &mut cell.content {
                        reindex_element(inner, pos);
                    }
                    cell.end_index = *pos;
                }
                row.end_index = *pos;
            }
            t.end_index = *pos;
        }
        StructuralElement::SectionBreak(sb) => {
            sb.start_index = *pos;
            *pos += 1;
            sb.end_index = *pos;
        }
        StructuralElement::TableOfContents(toc) => {
            toc.start_index = *pos;
            *pos += 1;
            for inner in &mut toc.content {
                reindex_element(inner, pos);
            }
            toc.end_index = *pos;
        }
    }
}

fn check_elements(
    segment: &SegmentId,
    elements: &[StructuralElement],
    mut expected: usize,
) -> Result<(), ModelError> {
    for el in elements {
        if el.start_index() != expected {
            return Err(ModelError::NonContiguousIndex {
                segment: segment.to_string(),
                expected,
                found: el.start_index(),
            });
        }
        match el {
            StructuralElement::Paragraph(p) => check_paragraph(segment, p)?,
            StructuralElement::Table(t) => {
                if !t.is_rectangular() {
                    return Err(ModelError::RaggedTable {
                        segment: segment.to_string(),
                        index: t.start_index,
                    });
                }
                for row in &t.rows {
                    for cell in &row.cells {
                        if !matches!(
                            cell.content.last(),
                            Some(StructuralElement::Paragraph(_))
                        ) {
                            return Err(ModelError::CellMustEndInParagraph {
                                segment: segment.to_string(),
                                index: cell.start_index,
                            });
                        }
                        check_elements(segment, &cell.content, cell.start_index + 1)?;
                    }
                }
            }
            StructuralElement::SectionBreak(_) => {}
            StructuralElement::TableOfContents(toc) => {
                check_elements(segment, &toc.content, toc.start_index + 1)?;
            }
        }
        expected = el.end_index();
    }
    Ok(())
}

fn check_paragraph(segment: &SegmentId, p: &Paragraph) -> Result<(), ModelError> {
    let mut expected = p.start_index;
    for (i, el) in p.elements.iter().enumerate() {
        if el.start_index() != expected {
            return Err(ModelError::NonContiguousIndex {
                segment: segment.to_string(),
                expected,
                found: el.start_index(),
            });
        }
        if let ParagraphElement::TextRun(run) = el {
            let len = utf16_len(&run.text);
            if run.end_index - run.start_index != len {
                return Err(ModelError::RunLengthMismatch {
                    segment: segment.to_string(),
                    index: run.start_index,
                    span: run.end_index - run.start_index,
                    actual: len,
                });
            }
            if let Some(pos) = run.text.find('\n')
                && pos + 1 != run.text.len()
            {
                return Err(ModelError::InteriorNewline {
                    segment: segment.to_string(),
                    index: run.start_index,
                });
            }
            if run.text.ends_with('\n') && i + 1 != p.elements.len() {
                return Err(ModelError::InteriorNewline {
                    segment: segment.to_string(),
                    index: run.start_index,
                });
            }
        }
        expected = el.end_index();
    }
    if !p.ends_with_newline() {
        return Err(ModelError::ParagraphMustEndInNewline {
            segment: segment.to_string(),
            index: p.start_index,
        });
    }
    if expected != p.end_index {
        return Err(ModelError::NonContiguousIndex {
            segment: segment.to_string(),
            expected,
            found: p.end_index,
        });
    }
    Ok(())
}

/// A top-level element of a segment or table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructuralElement {
    Paragraph(Paragraph),
    Table(Table),
    SectionBreak(SectionBreak),
    TableOfContents(TableOfContents),
}

impl StructuralElement {
    pub fn start_index(&self) -> usize {
        match self {
            StructuralElement::Paragraph(e) => e.start_index,
            StructuralElement::Table(e) => e.start_index,
            StructuralElement::SectionBreak(e) => e.start_index,
            StructuralElement::TableOfContents(e) => e.start_index,
        }
    }

    pub fn end_index(&self) -> usize {
        match self {
            StructuralElement::Paragraph(e) => e.end_index,
            StructuralElement::Table(e) => e.end_index,
            StructuralElement::SectionBreak(e) => e.end_index,
            StructuralElement::TableOfContents(e) => e.end_index,
        }
    }

    pub fn len_utf16(&self) -> usize {
        match self {
            StructuralElement::Paragraph(p) => p.len_utf16(),
            StructuralElement::Table(t) => t.len_utf16(),
            StructuralElement::SectionBreak(_) => 1,
            StructuralElement::TableOfContents(toc) => {
                1 + toc
                    .content
                    .iter()
                    .map(StructuralElement::len_utf16)
                    .sum::<usize>()
            }
        }
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            StructuralElement::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            StructuralElement::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            StructuralElement::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            StructuralElement::Paragraph(_) => "paragraph",
            StructuralElement::Table(_) => "table",
            StructuralElement::SectionBreak(_) => "sectionBreak",
            StructuralElement::TableOfContents(_) => "tableOfContents",
        }
    }
}

/// A section break. The body's first element is always one, occupying
/// index 0, which is why body content starts at index 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionBreak {
    pub start_index: usize,
    pub end_index: usize,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub section_style: serde_json::Value,
}

/// A table of contents. Content is refreshed by the server and excluded
/// from reconciliation; it is carried only so indices stay consistent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOfContents {
    pub start_index: usize,
    pub end_index: usize,
    pub content: Vec<StructuralElement>,
}

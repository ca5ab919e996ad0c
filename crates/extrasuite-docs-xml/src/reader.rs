//! `document.xml` → [`Tab`].
//!
//! The reader inflates the four-level style cascade onto every run,
//! restores the transparent normalizations (trailing newline runs,
//! synthetic trailing paragraphs, default cell attributes), and rejects
//! the constructs that corrupt pushes, above all literal newlines
//! inside content elements.

use crate::classes::{ResolvedStyle, StyleSheet, parse_align, parse_color};
use crate::error::{Result, XmlError};
use crate::tree::{XmlElement, XmlNode, parse};
use extrasuite_docs_types::paragraph::{
    AutoText, ColumnBreak, DateChip, Equation, FootnoteReference, HorizontalRule,
    InlineObjectElement, PageBreak, Paragraph, ParagraphElement, Person, RichLink, TextRun,
};
use extrasuite_docs_types::style::{
    Bullet, BulletPreset, ContentDirection, Link, NamedStyleType, ParagraphStyle, TextStyle,
};
use extrasuite_docs_types::{Segment, SegmentId, SectionBreak, StructuralElement, Tab};

const DOCUMENT_FILE: &str = "document.xml";

pub(crate) struct DocReader<'a> {
    sheet: &'a StyleSheet,
    base: ResolvedStyle,
    list_counter: usize,
    footnote_counter: usize,
    footnotes: Vec<(String, Segment)>,
}

impl<'a> DocReader<'a> {
    pub(crate) fn new(sheet: &'a StyleSheet) -> Result<DocReader<'a>> {
        let base = sheet.resolve(crate::classes::BASE_CLASS, DOCUMENT_FILE, 0)?;
        Ok(DocReader {
            sheet,
            base,
            list_counter: 0,
            footnote_counter: 0,
            footnotes: Vec::new(),
        })
    }

    pub(crate) fn read_document(&mut self, source: &str) -> Result<Tab> {
        let root = parse(source, DOCUMENT_FILE)?;
        if root.name != "document" {
            return Err(XmlError::UnexpectedElement {
                file: DOCUMENT_FILE.to_string(),
                line: root.line,
                element: root.name.clone(),
            });
        }
        let mut tab = Tab {
            tab_id: root.attr("id").unwrap_or_default().to_string(),
            title: root.attr("title").unwrap_or_default().to_string(),
            ..Tab::default()
        };

        let base = self.base.clone();
        let mut body_blocks = Vec::new();
        for node in &root.children {
            match node {
                XmlNode::Text { text, line } => reject_stray_text(text, *line, "document")?,
                XmlNode::Element(el) => match el.name.as_str() {
                    "header" | "footer" => {
                        // A missing id marks a container the push must
                        // create; the placeholder stays in the server
                        // namespace so id normalization covers it.
                        let fallback = if el.name == "header" {
                            "kix.newheader"
                        } else {
                            "kix.newfooter"
                        };
                        let id = el.attr("id").unwrap_or(fallback).to_string();
                        let segment_id = if el.name == "header" {
                            SegmentId::Header(id.clone())
                        } else {
                            SegmentId::Footer(id.clone())
                        };
                        let content = self.read_segment_content(&el.children, &base)?;
                        let segment = Segment {
                            id: segment_id,
                            content,
                        };
                        if el.name == "header" {
                            tab.headers.insert(id, segment);
                        } else {
                            tab.footers.insert(id, segment);
                        }
                    }
                    _ => self.read_block(el, &base, &mut body_blocks)?,
                },
            }
        }

        let mut body = vec![StructuralElement::SectionBreak(SectionBreak::default())];
        body.extend(body_blocks);
        body.push(synthetic_paragraph(&base));
        assign_list_ids(&mut body, &mut self.list_counter);
        tab.body = Segment {
            id: SegmentId::Body,
            content: body,
        };

        for (id, segment) in self.footnotes.drain(..) {
            tab.footnotes.insert(id, segment);
        }
        tab.reindex();
        Ok(tab)
    }

    /// Blocks of a header/footer/footnote segment, with the synthetic
    /// trailing paragraph restored and list ids assigned.
    fn read_segment_content(
        &mut self,
        children: &[XmlNode],
        inherited: &ResolvedStyle,
    ) -> Result<Vec<StructuralElement>> {
        let mut blocks = Vec::new();
        self.read_blocks(children, inherited, &mut blocks)?;
        blocks.push(synthetic_paragraph(inherited));
        assign_list_ids(&mut blocks, &mut self.list_counter);
        Ok(blocks)
    }

    fn read_blocks(
        &mut self,
        children: &[XmlNode],
        inherited: &ResolvedStyle,
        out: &mut Vec<StructuralElement>,
    ) -> Result<()> {
        for node in children {
            match node {
                XmlNode::Text { text, line } => reject_stray_text(text, *line, "container")?,
                XmlNode::Element(el) => self.read_block(el, inherited, out)?,
            }
        }
        Ok(())
    }

    fn read_block(
        &mut self,
        el: &XmlElement,
        inherited: &ResolvedStyle,
        out: &mut Vec<StructuralElement>,
    ) -> Result<()> {
        match el.name.as_str() {
            "p" => out.push(self.read_paragraph(el, NamedStyleType::NormalText, inherited)?),
            "title" => out.push(self.read_paragraph(el, NamedStyleType::Title, inherited)?),
            "subtitle" => out.push(self.read_paragraph(el, NamedStyleType::Subtitle, inherited)?),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level: u8 = el.name[1..].parse().expect("digit checked by match");
                let named = NamedStyleType::from_heading_level(level).expect("level in 1..=6");
                out.push(self.read_paragraph(el, named, inherited)?);
            }
            "li" => out.push(self.read_list_item(el, inherited)?),
            "table" => out.push(self.read_table(el, inherited)?),
            "toc" => out.push(StructuralElement::TableOfContents(Default::default())),
            "pagebreak" => out.push(atom_paragraph(
                ParagraphElement::PageBreak(PageBreak {
                    text_style: inherited.text.clone(),
                    ..PageBreak::default()
                }),
                inherited,
            )),
            "hr" => out.push(atom_paragraph(
                ParagraphElement::HorizontalRule(HorizontalRule {
                    text_style: inherited.text.clone(),
                    ..HorizontalRule::default()
                }),
                inherited,
            )),
            "style" => {
                let class = el.attr("class").ok_or_else(|| XmlError::BadAttribute {
                    file: DOCUMENT_FILE.to_string(),
                    line: el.line,
                    attribute: "class".to_string(),
                    message: "style wrapper needs a class".to_string(),
                })?;
                let layered = self
                    .sheet
                    .apply_over(inherited, class, DOCUMENT_FILE, el.line)?;
                self.read_blocks(&el.children, &layered, out)?;
            }
            other => {
                return Err(XmlError::UnexpectedElement {
                    file: DOCUMENT_FILE.to_string(),
                    line: el.line,
                    element: other.to_string(),
                });
            }
        }
        Ok(())
    }

    fn read_list_item(&mut self, el: &XmlElement, inherited: &ResolvedStyle) -> Result<StructuralElement> {
        let mut block = self.read_paragraph(el, NamedStyleType::NormalText, inherited)?;
        let StructuralElement::Paragraph(p) = &mut block else {
            unreachable!()
        };
        let nesting_level = match el.attr("level") {
            Some(level) => level.parse::<usize>().map_err(|_| XmlError::BadAttribute {
                file: DOCUMENT_FILE.to_string(),
                line: el.line,
                attribute: "level".to_string(),
                message: format!("{level:?} is not a number"),
            })?,
            None => 0,
        };
        let preset = match el.attr("kind") {
            None | Some("disc") => BulletPreset::DiscCircleSquare,
            Some("number") => BulletPreset::NumberedDecimalAlphaRoman,
            Some(other) => {
                return Err(XmlError::BadAttribute {
                    file: DOCUMENT_FILE.to_string(),
                    line: el.line,
                    attribute: "kind".to_string(),
                    message: format!("unknown list kind {other:?}"),
                });
            }
        };
        p.bullet = Some(Bullet {
            list_id: String::new(), // assigned by list grouping
            nesting_level,
            preset: Some(preset),
            text_style: TextStyle::default(),
        });
        Ok(block)
    }

    fn read_paragraph(
        &mut self,
        el: &XmlElement,
        named: NamedStyleType,
        inherited: &ResolvedStyle,
    ) -> Result<StructuralElement> {
        let (effective, style_class) = match el.attr("class") {
            Some(class) => (
                self.sheet
                    .apply_over(inherited, class, DOCUMENT_FILE, el.line)?,
                Some(class.to_string()),
            ),
            None => (inherited.clone(), None),
        };
        let mut style = ParagraphStyle {
            named_style_type: Some(named),
            heading_id: el.attr("id").map(str::to_string),
            alignment: effective.align,
            ..ParagraphStyle::default()
        };
        self.read_paragraph_attrs(el, &mut style)?;

        let mut elements = Vec::new();
        self.read_inline(&el.children, &el.name, &effective.text, &mut elements)?;
        elements.push(ParagraphElement::TextRun(TextRun {
            text: "\n".to_string(),
            style: effective.text.clone(),
            ..TextRun::default()
        }));
        Ok(StructuralElement::Paragraph(Paragraph {
            style,
            style_class,
            bullet: None,
            elements,
            ..Paragraph::default()
        }))
    }

    fn read_paragraph_attrs(&self, el: &XmlElement, style: &mut ParagraphStyle) -> Result<()> {
        for (attr, value) in &el.attrs {
            match attr.as_str() {
                "class" | "id" | "level" | "kind" => {}
                "align" => {
                    style.alignment = Some(parse_align(value, DOCUMENT_FILE, el.line)?);
                }
                "dir" => {
                    style.direction = Some(match value.as_str() {
                        "ltr" => ContentDirection::LeftToRight,
                        "rtl" => ContentDirection::RightToLeft,
                        other => {
                            return Err(XmlError::BadAttribute {
                                file: DOCUMENT_FILE.to_string(),
                                line: el.line,
                                attribute: "dir".to_string(),
                                message: format!("unknown direction {other:?}"),
                            });
                        }
                    });
                }
                "spacing" => style.line_spacing = Some(parse_f64(value, el.line, attr)?),
                "space-above" => style.space_above = Some(parse_f64(value, el.line, attr)?),
                "space-below" => style.space_below = Some(parse_f64(value, el.line, attr)?),
                "indent-start" => style.indent_start = Some(parse_f64(value, el.line, attr)?),
                "indent-end" => style.indent_end = Some(parse_f64(value, el.line, attr)?),
                "indent-first" => {
                    style.indent_first_line = Some(parse_f64(value, el.line, attr)?);
                }
                other => {
                    return Err(XmlError::BadAttribute {
                        file: DOCUMENT_FILE.to_string(),
                        line: el.line,
                        attribute: other.to_string(),
                        message: "unknown paragraph attribute".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn read_inline(
        &mut self,
        children: &[XmlNode],
        parent_name: &str,
        style: &TextStyle,
        out: &mut Vec<ParagraphElement>,
    ) -> Result<()> {
        for node in children {
            match node {
                XmlNode::Text { text, line } => {
                    if text.contains('\n') {
                        return Err(XmlError::ContentNewline {
                            file: DOCUMENT_FILE.to_string(),
                            line: *line,
                            element: parent_name.to_string(),
                        });
                    }
                    if !text.is_empty() {
                        out.push(ParagraphElement::TextRun(TextRun {
                            text: text.clone(),
                            style: style.clone(),
                            ..TextRun::default()
                        }));
                    }
                }
                XmlNode::Element(el) => self.read_inline_element(el, style, out)?,
            }
        }
        Ok(())
    }

    fn read_inline_element(
        &mut self,
        el: &XmlElement,
        style: &TextStyle,
        out: &mut Vec<ParagraphElement>,
    ) -> Result<()> {
        let mut derived = style.clone();
        match el.name.as_str() {
            "b" => derived.bold = Some(true),
            "i" => derived.italic = Some(true),
            "u" => derived.underline = Some(true),
            "s" => derived.strikethrough = Some(true),
            "sup" => {
                derived.baseline_offset =
                    Some(extrasuite_docs_types::BaselineOffset::Superscript);
            }
            "sub" => {
                derived.baseline_offset = Some(extrasuite_docs_types::BaselineOffset::Subscript);
            }
            "a" => {
                let href = el.attr("href").ok_or_else(|| XmlError::BadAttribute {
                    file: DOCUMENT_FILE.to_string(),
                    line: el.line,
                    attribute: "href".to_string(),
                    message: "<a> needs an href".to_string(),
                })?;
                derived.link = Some(Link {
                    url: href.to_string(),
                });
            }
            "span" => {
                let class = el.attr("class").ok_or_else(|| XmlError::BadAttribute {
                    file: DOCUMENT_FILE.to_string(),
                    line: el.line,
                    attribute: "class".to_string(),
                    message: "<span> needs a class".to_string(),
                })?;
                let base = ResolvedStyle {
                    text: style.clone(),
                    align: None,
                };
                derived = self
                    .sheet
                    .apply_over(&base, class, DOCUMENT_FILE, el.line)?
                    .text;
            }
            _ => return self.read_inline_atom(el, style, out),
        }
        self.read_inline(&el.children, &el.name, &derived, out)
    }

    fn read_inline_atom(
        &mut self,
        el: &XmlElement,
        style: &TextStyle,
        out: &mut Vec<ParagraphElement>,
    ) -> Result<()> {
        let atom = match el.name.as_str() {
            "person" => ParagraphElement::Person(Person {
                email: el.attr("email").unwrap_or_default().to_string(),
                name: el.attr("name").map(str::to_string),
                text_style: style.clone(),
                ..Person::default()
            }),
            "date" => ParagraphElement::DateChip(DateChip {
                timestamp: parse_i64(el.attr("timestamp").unwrap_or("0"), el.line, "timestamp")?,
                date_format: el.attr("dateFormat").map(str::to_string),
                time_format: el.attr("timeFormat").map(str::to_string),
                time_zone_id: el.attr("timeZoneId").map(str::to_string),
                locale: el.attr("locale").map(str::to_string),
                text_style: style.clone(),
                ..DateChip::default()
            }),
            "richlink" => ParagraphElement::RichLink(RichLink {
                url: el.attr("url").unwrap_or_default().to_string(),
                title: el.attr("title").map(str::to_string),
                text_style: style.clone(),
                ..RichLink::default()
            }),
            "equation" => ParagraphElement::Equation(Equation {
                length: el
                    .attr("length")
                    .unwrap_or("1")
                    .parse()
                    .map_err(|_| XmlError::BadAttribute {
                        file: DOCUMENT_FILE.to_string(),
                        line: el.line,
                        attribute: "length".to_string(),
                        message: "expected a length in UTF-16 units".to_string(),
                    })?,
                ..Equation::default()
            }),
            "image" => ParagraphElement::InlineObject(InlineObjectElement {
                inline_object_id: el.attr("id").unwrap_or_default().to_string(),
                text_style: style.clone(),
                ..InlineObjectElement::default()
            }),
            "autotext" => ParagraphElement::AutoText(AutoText {
                auto_text_type: el.attr("type").unwrap_or("PAGE_NUMBER").to_string(),
                text_style: style.clone(),
                ..AutoText::default()
            }),
            "hr" => ParagraphElement::HorizontalRule(HorizontalRule {
                text_style: style.clone(),
                ..HorizontalRule::default()
            }),
            "pagebreak" => ParagraphElement::PageBreak(PageBreak {
                text_style: style.clone(),
                ..PageBreak::default()
            }),
            "columnbreak" => ParagraphElement::ColumnBreak(ColumnBreak {
                text_style: style.clone(),
                ..ColumnBreak::default()
            }),
            "footnote" => {
                let id = match el.attr("id") {
                    Some(id) => id.to_string(),
                    None => {
                        self.footnote_counter += 1;
                        format!("kix.newfn{}", self.footnote_counter)
                    }
                };
                let base = self.base.clone();
                let content = self.read_segment_content(&el.children, &base)?;
                self.footnotes.push((
                    id.clone(),
                    Segment {
                        id: SegmentId::Footnote(id.clone()),
                        content,
                    },
                ));
                ParagraphElement::FootnoteReference(FootnoteReference {
                    footnote_id: id,
                    text_style: style.clone(),
                    ..FootnoteReference::default()
                })
            }
            other => {
                return Err(XmlError::UnexpectedElement {
                    file: DOCUMENT_FILE.to_string(),
                    line: el.line,
                    element: other.to_string(),
                });
            }
        };
        out.push(atom);
        Ok(())
    }

    fn read_table(&mut self, el: &XmlElement, inherited: &ResolvedStyle) -> Result<StructuralElement> {
        use extrasuite_docs_types::{Table, TableRow};
        let mut rows: Vec<TableRow> = Vec::new();
        for node in &el.children {
            match node {
                XmlNode::Text { text, line } => reject_stray_text(text, *line, "table")?,
                XmlNode::Element(child) => match child.name.as_str() {
                    "col" => {} // column hints are not modeled
                    "tr" => {
                        let mut cells = Vec::new();
                        for cell_node in &child.children {
                            match cell_node {
                                XmlNode::Text { text, line } => {
                                    reject_stray_text(text, *line, "tr")?;
                                }
                                XmlNode::Element(td) if td.name == "td" => {
                                    cells.push(self.read_cell(td, inherited)?);
                                }
                                XmlNode::Element(other) => {
                                    return Err(XmlError::UnexpectedElement {
                                        file: DOCUMENT_FILE.to_string(),
                                        line: other.line,
                                        element: other.name.clone(),
                                    });
                                }
                            }
                        }
                        rows.push(TableRow {
                            start_index: 0,
                            end_index: 0,
                            cells,
                        });
                    }
                    other => {
                        return Err(XmlError::UnexpectedElement {
                            file: DOCUMENT_FILE.to_string(),
                            line: child.line,
                            element: other.to_string(),
                        });
                    }
                },
            }
        }
        let width = rows.first().map_or(0, |r| r.cells.len());
        if let Some(bad) = rows.iter().find(|r| r.cells.len() != width) {
            return Err(XmlError::TableShape {
                file: DOCUMENT_FILE.to_string(),
                line: el.line,
                message: format!(
                    "rows must all have {width} <td>s, found one with {}",
                    bad.cells.len()
                ),
            });
        }
        Ok(StructuralElement::Table(Table {
            start_index: 0,
            end_index: 0,
            rows,
        }))
    }

    fn read_cell(
        &mut self,
        td: &XmlElement,
        inherited: &ResolvedStyle,
    ) -> Result<extrasuite_docs_types::TableCell> {
        use extrasuite_docs_types::{TableCell, TableCellStyle};
        let mut style = TableCellStyle::default();
        for (attr, value) in &td.attrs {
            match attr.as_str() {
                "colspan" => {
                    style.column_span = value.parse().map_err(|_| XmlError::BadAttribute {
                        file: DOCUMENT_FILE.to_string(),
                        line: td.line,
                        attribute: attr.clone(),
                        message: format!("{value:?} is not a number"),
                    })?;
                }
                "rowspan" => {
                    style.row_span = value.parse().map_err(|_| XmlError::BadAttribute {
                        file: DOCUMENT_FILE.to_string(),
                        line: td.line,
                        attribute: attr.clone(),
                        message: format!("{value:?} is not a number"),
                    })?;
                }
                "background" => {
                    style.background_color =
                        Some(parse_color(value, DOCUMENT_FILE, td.line, attr)?);
                }
                other => {
                    return Err(XmlError::BadAttribute {
                        file: DOCUMENT_FILE.to_string(),
                        line: td.line,
                        attribute: other.to_string(),
                        message: "unknown cell attribute".to_string(),
                    });
                }
            }
        }
        let mut content = Vec::new();
        self.read_blocks(&td.children, inherited, &mut content)?;
        if !matches!(content.last(), Some(StructuralElement::Paragraph(_))) {
            return Err(XmlError::TableShape {
                file: DOCUMENT_FILE.to_string(),
                line: td.line,
                message: "every <td> must contain at least one <p>".to_string(),
            });
        }
        Ok(TableCell {
            start_index: 0,
            end_index: 0,
            style,
            content,
        })
    }
}

fn reject_stray_text(text: &str, line: usize, container: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    Err(XmlError::XmlMalformed {
        file: DOCUMENT_FILE.to_string(),
        line,
        message: format!("stray text inside <{container}>; wrap it in a content element"),
    })
}

/// Wrap a single block-level atom (page break, horizontal rule) in its own paragraph.
fn atom_paragraph(element: ParagraphElement, inherited: &ResolvedStyle) -> StructuralElement {
    StructuralElement::Paragraph(Paragraph {
        style: ParagraphStyle {
            named_style_type: Some(NamedStyleType::NormalText),
            alignment: inherited.align,
            ..ParagraphStyle::default()
        },
        elements: vec![
            element,
            ParagraphElement::TextRun(TextRun {
                text: "\n".to_string(),
                style: inherited.text.clone(),
                ..TextRun::default()
            }),
        ],
        ..Paragraph::default()
    })
}

/// The synthetic trailing paragraph every segment regains on read.
fn synthetic_paragraph(inherited: &ResolvedStyle) -> StructuralElement {
    StructuralElement::Paragraph(Paragraph {
        style: ParagraphStyle {
            named_style_type: Some(NamedStyleType::NormalText),
            alignment: inherited.align,
            ..ParagraphStyle::default()
        },
        elements: vec![ParagraphElement::TextRun(TextRun {
            text: "\n".to_string(),
            style: inherited.text.clone(),
            ..TextRun::default()
        })],
        ..Paragraph::default()
    })
}

/// Group consecutive bulleted paragraphs into lists, assigning one
/// fresh list id per group. Grouping is deterministic, so pristine and
/// desired folders agree on ids for unchanged lists.
fn assign_list_ids(elements: &mut [StructuralElement], counter: &mut usize) {
    let mut current: Option<(String, BulletPreset)> = None;
    for el in elements.iter_mut() {
        match el {
            StructuralElement::Paragraph(p) => match &mut p.bullet {
                Some(bullet) if bullet.list_id.is_empty() => {
                    let preset = bullet.preset.unwrap_or(BulletPreset::DiscCircleSquare);
                    let reuse = matches!(&current, Some((_, cp)) if *cp == preset);
                    if !reuse {
                        *counter += 1;
                        current = Some((format!("kix.list{counter}"), preset));
                    }
                    bullet.list_id = current.as_ref().expect("just set").0.clone();
                }
                _ => current = None,
            },
            StructuralElement::Table(t) => {
                current = None;
                for row in &mut t.rows {
                    for cell in &mut row.cells {
                        assign_list_ids(&mut cell.content, counter);
                    }
                }
            }
            _ => current = None,
        }
    }
}

fn parse_f64(value: &str, line: usize, attr: &str) -> Result<f64> {
    value.parse().map_err(|_| XmlError::BadAttribute {
        file: DOCUMENT_FILE.to_string(),
        line,
        attribute: attr.to_string(),
        message: format!("{value:?} is not a number"),
    })
}

fn parse_i64(value: &str, line: usize, attr: &str) -> Result<i64> {
    value.parse().map_err(|_| XmlError::BadAttribute {
        file: DOCUMENT_FILE.to_string(),
        line,
        attribute: attr.to_string(),
        message: format!("{value:?} is not a number"),
    })
}

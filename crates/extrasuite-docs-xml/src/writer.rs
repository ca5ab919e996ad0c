//! [`Tab`] → `document.xml` + `styles.xml`.
//!
//! The writer expresses run formatting as deviations from the resolved
//! document default: B/I/U/S, baseline, and links become inline tags;
//! anything else (fonts, sizes, colors, explicit "off" flags) becomes a
//! generated `<span class>` whose definition lands in `styles.xml`.
//! Transparent normalizations are applied on the way out: trailing
//! newline runs, the synthetic trailing paragraph, and default cell
//! attributes are all dropped.

use crate::classes::{BASE_CLASS, StyleClass, StyleSheet, align_name, class_attrs};
use crate::tree::{escape_attr, escape_text};
use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement};
use extrasuite_docs_types::style::{
    Alignment, BaselineOffset, BulletPreset, ContentDirection, NamedStyleType, StyleField,
    TextStyle,
};
use extrasuite_docs_types::{MaskField, Segment, StructuralElement, Tab};
use std::collections::HashMap;

pub(crate) struct DocWriter {
    base_text: TextStyle,
    base_align: Option<Alignment>,
    generated: Vec<StyleClass>,
    keys: HashMap<String, String>,
}

impl DocWriter {
    pub(crate) fn new(base: StyleClass) -> DocWriter {
        DocWriter {
            base_text: base.text.clone(),
            base_align: base.align,
            generated: vec![StyleClass {
                name: BASE_CLASS.to_string(),
                ..base
            }],
            keys: HashMap::new(),
        }
    }

    pub(crate) fn write_document(&mut self, tab: &Tab) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "<document id=\"{}\"{}>\n",
            escape_attr(&tab.tab_id),
            if tab.title.is_empty() {
                String::new()
            } else {
                format!(" title=\"{}\"", escape_attr(&tab.title))
            }
        ));
        self.write_segment_blocks(&tab.body, tab, &mut out, 1);
        for (id, segment) in &tab.headers {
            out.push_str(&format!("  <header id=\"{}\">\n", escape_attr(id)));
            self.write_segment_blocks(segment, tab, &mut out, 2);
            out.push_str("  </header>\n");
        }
        for (id, segment) in &tab.footers {
            out.push_str(&format!("  <footer id=\"{}\">\n", escape_attr(id)));
            self.write_segment_blocks(segment, tab, &mut out, 2);
            out.push_str("  </footer>\n");
        }
        out.push_str("</document>\n");
        out
    }

    pub(crate) fn styles_xml(&self) -> String {
        let mut sheet = StyleSheet::default();
        for class in &self.generated {
            sheet.push(class.clone());
        }
        crate::classes::write_styles(&sheet)
    }

    fn write_segment_blocks(&mut self, segment: &Segment, tab: &Tab, out: &mut String, depth: usize) {
        let elements = strip_synthetic_trailing(&segment.content);
        self.write_blocks(elements, tab, out, depth);
    }

    fn write_blocks(
        &mut self,
        elements: &[StructuralElement],
        tab: &Tab,
        out: &mut String,
        depth: usize,
    ) {
        for el in elements {
            match el {
                StructuralElement::SectionBreak(_) => {}
                StructuralElement::TableOfContents(_) => {
                    out.push_str(&indent(depth));
                    out.push_str("<toc/>\n");
                }
                StructuralElement::Paragraph(p) => self.write_paragraph(p, tab, out, depth),
                StructuralElement::Table(t) => self.write_table(t, tab, out, depth),
            }
        }
    }

    fn write_paragraph(&mut self, p: &Paragraph, tab: &Tab, out: &mut String, depth: usize) {
        out.push_str(&indent(depth));
        // A paragraph holding nothing but a rule or page break gets the
        // block form of its atom.
        if let [only, newline] = p.elements.as_slice()
            && newline
                .as_text_run()
                .is_some_and(|run| run.text == "\n")
        {
            match only {
                ParagraphElement::HorizontalRule(_) => {
                    out.push_str("<hr/>\n");
                    return;
                }
                ParagraphElement::PageBreak(_) => {
                    out.push_str("<pagebreak/>\n");
                    return;
                }
                _ => {}
            }
        }

        let (tag, id_attr) = self.paragraph_tag(p);
        let mut attrs = String::new();
        if let Some(id) = id_attr {
            attrs.push_str(&format!(" id=\"{}\"", escape_attr(&id)));
        }
        if let Some(bullet) = &p.bullet {
            if bullet.nesting_level > 0 {
                attrs.push_str(&format!(" level=\"{}\"", bullet.nesting_level));
            }
            if bullet.preset == Some(BulletPreset::NumberedDecimalAlphaRoman) {
                attrs.push_str(" kind=\"number\"");
            }
        }
        attrs.push_str(&self.paragraph_style_attrs(p));

        let mut body = String::new();
        self.write_inline_content(p, tab, &mut body);
        if body.is_empty() {
            out.push_str(&format!("<{tag}{attrs}/>\n"));
        } else {
            out.push_str(&format!("<{tag}{attrs}>{body}</{tag}>\n"));
        }
    }

    fn paragraph_tag(&self, p: &Paragraph) -> (&'static str, Option<String>) {
        if p.bullet.is_some() {
            return ("li", None);
        }
        match p.style.named_style_type {
            Some(NamedStyleType::Title) => ("title", None),
            Some(NamedStyleType::Subtitle) => ("subtitle", None),
            Some(named) if named.heading_level().is_some() => {
                let tag = match named.heading_level().expect("heading checked") {
                    1 => "h1",
                    2 => "h2",
                    3 => "h3",
                    4 => "h4",
                    5 => "h5",
                    _ => "h6",
                };
                (tag, p.style.heading_id.clone())
            }
            _ => ("p", None),
        }
    }

    fn paragraph_style_attrs(&self, p: &Paragraph) -> String {
        let mut out = String::new();
        if let Some(align) = p.style.alignment
            && self.base_align != Some(align)
        {
            out.push_str(&format!(" align=\"{}\"", align_name(align)));
        }
        if let Some(dir) = p.style.direction {
            let name = match dir {
                ContentDirection::LeftToRight => "ltr",
                ContentDirection::RightToLeft => "rtl",
            };
            out.push_str(&format!(" dir=\"{name}\""));
        }
        if let Some(v) = p.style.line_spacing {
            out.push_str(&format!(" spacing=\"{v}\""));
        }
        if let Some(v) = p.style.space_above {
            out.push_str(&format!(" space-above=\"{v}\""));
        }
        if let Some(v) = p.style.space_below {
            out.push_str(&format!(" space-below=\"{v}\""));
        }
        if let Some(v) = p.style.indent_start {
            out.push_str(&format!(" indent-start=\"{v}\""));
        }
        if let Some(v) = p.style.indent_end {
            out.push_str(&format!(" indent-end=\"{v}\""));
        }
        if let Some(v) = p.style.indent_first_line {
            out.push_str(&format!(" indent-first=\"{v}\""));
        }
        out
    }

    fn write_inline_content(&mut self, p: &Paragraph, tab: &Tab, out: &mut String) {
        let count = p.elements.len();
        for (i, el) in p.elements.iter().enumerate() {
            match el {
                ParagraphElement::TextRun(run) => {
                    let mut text = run.text.as_str();
                    // The trailing newline run is implicit in the markup.
                    if i + 1 == count {
                        text = text.strip_suffix('\n').unwrap_or(text);
                    }
                    if !text.is_empty() {
                        self.write_styled_text(text, &run.style, out);
                    }
                }
                atom => self.write_atom(atom, tab, out),
            }
        }
    }

    fn write_styled_text(&mut self, text: &str, style: &TextStyle, out: &mut String) {
        let mut open = Vec::new();
        let mut span_deviation = TextStyle::default();
        let mut needs_span = false;

        for &field in StyleField::ALL {
            let dev = deviation(style, &self.base_text, field);
            let Some(dev) = dev else { continue };
            match field {
                StyleField::Bold if dev.bold == Some(true) => open.push("b".to_string()),
                StyleField::Italic if dev.italic == Some(true) => open.push("i".to_string()),
                StyleField::Underline if dev.underline == Some(true) => open.push("u".to_string()),
                StyleField::Strikethrough if dev.strikethrough == Some(true) => {
                    open.push("s".to_string());
                }
                StyleField::BaselineOffset => match dev.baseline_offset {
                    Some(BaselineOffset::Superscript) => open.push("sup".to_string()),
                    Some(BaselineOffset::Subscript) => open.push("sub".to_string()),
                    _ => {}
                },
                StyleField::Link => {
                    if let Some(link) = &dev.link {
                        open.push(format!("a href=\"{}\"", escape_attr(&link.url)));
                    }
                }
                _ => {
                    span_deviation.copy_field(style, field);
                    needs_span = true;
                }
            }
        }

        let mut opened: Vec<String> = Vec::new();
        if needs_span {
            let class = self.span_class_for(&span_deviation);
            out.push_str(&format!("<span class=\"{}\">", escape_attr(&class)));
            opened.push("span".to_string());
        }
        for tag in &open {
            out.push_str(&format!("<{tag}>"));
            let name = tag.split(' ').next().unwrap_or(tag).to_string();
            opened.push(name);
        }
        out.push_str(&escape_text(text));
        for tag in opened.iter().rev() {
            out.push_str(&format!("</{tag}>"));
        }
    }

    fn span_class_for(&mut self, deviation: &TextStyle) -> String {
        let key = class_attrs(deviation, None);
        if let Some(name) = self.keys.get(&key) {
            return name.clone();
        }
        let name = format!("s{}", self.keys.len() + 1);
        self.generated.push(StyleClass {
            name: name.clone(),
            parent: None,
            text: deviation.clone(),
            align: None,
        });
        self.keys.insert(key, name.clone());
        name
    }

    fn write_atom(&mut self, atom: &ParagraphElement, tab: &Tab, out: &mut String) {
        match atom {
            ParagraphElement::Person(p) => {
                out.push_str(&format!("<person email=\"{}\"", escape_attr(&p.email)));
                if let Some(name) = &p.name {
                    out.push_str(&format!(" name=\"{}\"", escape_attr(name)));
                }
                out.push_str("/>");
            }
            ParagraphElement::DateChip(d) => {
                out.push_str(&format!("<date timestamp=\"{}\"", d.timestamp));
                for (attr, value) in [
                    ("dateFormat", &d.date_format),
                    ("timeFormat", &d.time_format),
                    ("timeZoneId", &d.time_zone_id),
                    ("locale", &d.locale),
                ] {
                    if let Some(value) = value {
                        out.push_str(&format!(" {attr}=\"{}\"", escape_attr(value)));
                    }
                }
                out.push_str("/>");
            }
            ParagraphElement::RichLink(r) => {
                out.push_str(&format!("<richlink url=\"{}\"", escape_attr(&r.url)));
                if let Some(title) = &r.title {
                    out.push_str(&format!(" title=\"{}\"", escape_attr(title)));
                }
                out.push_str("/>");
            }
            ParagraphElement::Equation(eq) => {
                out.push_str(&format!("<equation length=\"{}\"/>", eq.length));
            }
            ParagraphElement::InlineObject(obj) => {
                out.push_str(&format!(
                    "<image id=\"{}\"/>",
                    escape_attr(&obj.inline_object_id)
                ));
            }
            ParagraphElement::AutoText(at) => {
                out.push_str(&format!(
                    "<autotext type=\"{}\"/>",
                    escape_attr(&at.auto_text_type)
                ));
            }
            ParagraphElement::HorizontalRule(_) => out.push_str("<hr/>"),
            ParagraphElement::PageBreak(_) => out.push_str("<pagebreak/>"),
            ParagraphElement::ColumnBreak(_) => out.push_str("<columnbreak/>"),
            ParagraphElement::FootnoteReference(fr) => {
                match tab.footnotes.get(&fr.footnote_id) {
                    Some(segment) => {
                        out.push_str(&format!(
                            "<footnote id=\"{}\">",
                            escape_attr(&fr.footnote_id)
                        ));
                        let mut inner = String::new();
                        self.write_blocks(
                            strip_synthetic_trailing(&segment.content),
                            tab,
                            &mut inner,
                            0,
                        );
                        out.push_str(inner.trim_end_matches('\n'));
                        out.push_str("</footnote>");
                    }
                    None => {
                        out.push_str(&format!(
                            "<footnote id=\"{}\"/>",
                            escape_attr(&fr.footnote_id)
                        ));
                    }
                }
            }
            ParagraphElement::TextRun(_) => unreachable!("runs are written by the caller"),
        }
    }

    fn write_table(
        &mut self,
        t: &extrasuite_docs_types::Table,
        tab: &Tab,
        out: &mut String,
        depth: usize,
    ) {
        out.push_str(&indent(depth));
        out.push_str("<table>\n");
        for row in &t.rows {
            out.push_str(&indent(depth + 1));
            out.push_str("<tr>\n");
            for cell in &row.cells {
                out.push_str(&indent(depth + 2));
                out.push_str("<td");
                if cell.style.column_span != 1 {
                    out.push_str(&format!(" colspan=\"{}\"", cell.style.column_span));
                }
                if cell.style.row_span != 1 {
                    out.push_str(&format!(" rowspan=\"{}\"", cell.style.row_span));
                }
                if let Some(color) = cell.style.background_color {
                    out.push_str(&format!(" background=\"{}\"", color.to_hex()));
                }
                out.push_str(">\n");
                self.write_blocks(&cell.content, tab, out, depth + 3);
                out.push_str(&indent(depth + 2));
                out.push_str("</td>\n");
            }
            out.push_str(&indent(depth + 1));
            out.push_str("</tr>\n");
        }
        out.push_str(&indent(depth));
        out.push_str("</table>\n");
    }
}

/// Drop the synthetic trailing paragraph the reader adds back.
fn strip_synthetic_trailing(elements: &[StructuralElement]) -> &[StructuralElement] {
    if let Some(StructuralElement::Paragraph(p)) = elements.last()
        && p.bullet.is_none()
        && p.elements.len() == 1
        && p.plain_text() == "\n"
        && matches!(
            p.style.named_style_type,
            None | Some(NamedStyleType::NormalText)
        )
        && p.style.heading_id.is_none()
    {
        return &elements[..elements.len() - 1];
    }
    elements
}

/// Field-level deviation of `style` from `base`: `Some` with only that
/// field populated when the run visibly differs.
fn deviation(style: &TextStyle, base: &TextStyle, field: StyleField) -> Option<TextStyle> {
    let mut probe = TextStyle::default();
    probe.copy_field(style, field);
    if probe.same_formatting(&TextStyle::default()) {
        return None; // unset: inherits whatever the cascade says
    }
    let mut base_probe = TextStyle::default();
    base_probe.copy_field(base, field);
    if probe.same_formatting(&base_probe) {
        return None; // matches the document default
    }
    Some(probe)
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

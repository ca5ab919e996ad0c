//! `updateTextStyle` and `updateParagraphStyle`.

use crate::engine::IdGen;
use crate::error::{MockError, Result};
use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement, TextRun};
use extrasuite_docs_types::style::{
    FieldSet, ParagraphFieldSet, ParagraphStyle, StyleField, TextStyle,
};
use extrasuite_docs_types::utf16::utf16_slice;
use extrasuite_docs_types::{Segment, StructuralElement};

/// Apply `f` to every paragraph intersecting `[start, end)`, descending
/// through table cells. A collapsed range addresses the paragraph
/// containing `start`.
pub(crate) fn for_paragraphs_in_range<F>(
    elements: &mut Vec<StructuralElement>,
    start: usize,
    end: usize,
    f: &mut F,
) -> Result<()>
where
    F: FnMut(&mut Paragraph) -> Result<()>,
{
    let end = end.max(start + 1);
    for el in elements.iter_mut() {
        if el.end_index() <= start || el.start_index() >= end {
            continue;
        }
        match el {
            StructuralElement::Paragraph(p) => f(p)?,
            StructuralElement::Table(t) => {
                for row in &mut t.rows {
                    for cell in &mut row.cells {
                        if cell.end_index <= start || cell.start_index >= end {
                            continue;
                        }
                        for_paragraphs_in_range(&mut cell.content, start, end, f)?;
                    }
                }
            }
            StructuralElement::TableOfContents(_) => {
                return Err(MockError::invalid(
                    "updateStyle",
                    "cannot restyle a table of contents",
                ));
            }
            StructuralElement::SectionBreak(_) => {}
        }
    }
    Ok(())
}

pub(crate) fn update_text_style(
    segment: &mut Segment,
    start: usize,
    end: usize,
    style: &TextStyle,
    fields: FieldSet,
) -> Result<()> {
    const KIND: &str = "updateTextStyle";
    if start >= end {
        return Err(MockError::invalid(KIND, "range must not be empty"));
    }
    let seg_end = segment.end_index();
    if end > seg_end {
        return Err(MockError::IndexOutOfBounds {
            segment: segment.id.to_string(),
            index: end,
            end: seg_end,
        });
    }
    if fields.is_empty() {
        return Err(MockError::invalid(KIND, "fields mask must not be empty"));
    }
    for_paragraphs_in_range(&mut segment.content, start, end, &mut |p| {
        style_paragraph_range(p, start, end, style, fields)
    })
}

/// Restyle the covered span of one paragraph, splitting runs at the
/// range boundaries. Touched runs record the mask in `explicit`.
fn style_paragraph_range(
    p: &mut Paragraph,
    start: usize,
    end: usize,
    style: &TextStyle,
    fields: FieldSet,
) -> Result<()> {
    let old = std::mem::take(&mut p.elements);
    let mut out = Vec::with_capacity(old.len());
    for mut el in old {
        let (s, e) = (el.start_index(), el.end_index());
        if e <= start || s >= end {
            out.push(el);
            continue;
        }
        match el {
            ParagraphElement::TextRun(run) => {
                let a = start.max(s) - s;
                let b = end.min(e) - s;
                let len = e - s;
                let before = utf16_slice(&run.text, 0, a)
                    .ok_or(MockError::SurrogateSplit { index: s + a })?;
                let covered = utf16_slice(&run.text, a, b)
                    .ok_or(MockError::SurrogateSplit { index: s + b })?;
                let after = utf16_slice(&run.text, b, len)
                    .ok_or(MockError::SurrogateSplit { index: s + b })?;
                if !before.is_empty() {
                    out.push(ParagraphElement::TextRun(TextRun {
                        text: before.to_string(),
                        style: run.style.clone(),
                        ..TextRun::default()
                    }));
                }
                let mut styled = run.style.clone();
                apply_text_fields(&mut styled, style, fields);
                out.push(ParagraphElement::TextRun(TextRun {
                    text: covered.to_string(),
                    style: styled,
                    ..TextRun::default()
                }));
                if !after.is_empty() {
                    out.push(ParagraphElement::TextRun(TextRun {
                        text: after.to_string(),
                        style: run.style.clone(),
                        ..TextRun::default()
                    }));
                }
            }
            ref mut atom => {
                if let Some(ts) = atom.text_style_mut() {
                    apply_text_fields(ts, style, fields);
                }
                out.push(el);
            }
        }
    }
    p.elements = out;
    Ok(())
}

fn apply_text_fields(target: &mut TextStyle, source: &TextStyle, fields: FieldSet) {
    for f in fields.iter() {
        target.copy_field(source, f);
        target.explicit.insert(f);
    }
}

pub(crate) fn update_paragraph_style(
    segment: &mut Segment,
    start: usize,
    end: usize,
    style: &ParagraphStyle,
    fields: ParagraphFieldSet,
    ids: &mut IdGen,
) -> Result<()> {
    const KIND: &str = "updateParagraphStyle";
    let seg_end = segment.end_index();
    if start > seg_end || end > seg_end {
        return Err(MockError::IndexOutOfBounds {
            segment: segment.id.to_string(),
            index: end.max(start),
            end: seg_end,
        });
    }
    if fields.is_empty() {
        return Err(MockError::invalid(KIND, "fields mask must not be empty"));
    }
    use extrasuite_docs_types::style::ParagraphField;
    let sets_named_style = fields.contains(ParagraphField::NamedStyleType);
    for_paragraphs_in_range(&mut segment.content, start, end, &mut |p| {
        for f in fields.iter() {
            p.style.copy_field(style, f);
        }
        if sets_named_style {
            match p.style.named_style_type {
                Some(named) if named.is_heading() => {
                    if p.style.heading_id.is_none() {
                        p.style.heading_id = Some(ids.heading());
                    }
                    apply_heading_defaults(p);
                }
                _ => p.style.heading_id = None,
            }
        }
        Ok(())
    })
}

/// Heading promotion clears inherited character weight so the heading
/// defaults show through: bold unconditionally, italic and underline
/// only where no explicit update set them.
fn apply_heading_defaults(p: &mut Paragraph) {
    for el in &mut p.elements {
        if let Some(style) = el.text_style_mut() {
            style.bold = None;
            if !style.explicit.contains(StyleField::Italic) {
                style.italic = None;
            }
            if !style.explicit.contains(StyleField::Underline) {
                style.underline = None;
            }
        }
    }
}

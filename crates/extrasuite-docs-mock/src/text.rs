//! `insertText` and `deleteContentRange`.
//!
//! Handlers splice content and leave index recomputation, run
//! splitting, and paragraph merging to the normalize pass. They read
//! the indices assigned by the previous pass but never write any.

use crate::error::{MockError, Result};
use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement, TextRun};
use extrasuite_docs_types::style::{StyleField, TextStyle};
use extrasuite_docs_types::utf16::utf16_to_byte;
use extrasuite_docs_types::{Segment, SegmentId, StructuralElement};

/// Find the paragraph covering `index` (`start <= index < end`),
/// descending through table cells. Marker indices (table, row, cell,
/// section break) resolve to nothing.
pub(crate) fn paragraph_at_mut(
    elements: &mut [StructuralElement],
    index: usize,
) -> Option<&mut Paragraph> {
    let pos = elements
        .iter()
        .position(|el| el.start_index() <= index && index < el.end_index())?;
    match &mut elements[pos] {
        StructuralElement::Paragraph(p) => Some(p),
        StructuralElement::Table(t) => {
            for row in &mut t.rows {
                for cell in &mut row.cells {
                    if cell.start_index < index && index < cell.end_index {
                        return paragraph_at_mut(&mut cell.content, index);
                    }
                }
            }
            None
        }
        _ => None,
    }
}

/// The style inserted text takes at `index` inside `p`: a clone of the
/// donor run's style, with link auto-styling stripped when the donor is
/// link-styled. Explicitly-set properties survive the strip.
pub(crate) fn derive_insert_style(p: &Paragraph, index: usize) -> TextStyle {
    let donor = donor_style(p, index);
    let mut style = donor.clone();
    if style.link.is_some() {
        style.link = None;
        if !style.explicit.contains(StyleField::ForegroundColor) {
            style.foreground_color = None;
        }
    }
    style
}

/// The run whose style inherits to an insertion at `index`: the run
/// containing `index` as an interior point, else the run ending at
/// `index`, else the paragraph's first run.
fn donor_style(p: &Paragraph, index: usize) -> &TextStyle {
    let mut first: Option<&TextStyle> = None;
    for el in &p.elements {
        if let ParagraphElement::TextRun(run) = el {
            if first.is_none() {
                first = Some(&run.style);
            }
            if run.start_index < index && index <= run.end_index {
                return &run.style;
            }
        }
    }
    first.expect("paragraph always holds its newline run")
}

pub(crate) fn insert_text(segment: &mut Segment, index: usize, text: &str) -> Result<()> {
    const KIND: &str = "insertText";
    if text.is_empty() {
        return Err(MockError::invalid(KIND, "text must not be empty"));
    }
    check_insert_index(segment, index, KIND)?;
    let Some(p) = paragraph_at_mut(&mut segment.content, index) else {
        return Err(MockError::invalid(
            KIND,
            format!("index {index} does not address text content"),
        ));
    };
    splice_text(p, index, text)
}

pub(crate) fn check_insert_index(
    segment: &Segment,
    index: usize,
    kind: &'static str,
) -> Result<()> {
    let end = segment.end_index();
    if index >= end {
        return Err(MockError::IndexOutOfBounds {
            segment: segment.id.to_string(),
            index,
            end,
        });
    }
    if matches!(segment.id, SegmentId::Body) && index == 0 {
        return Err(MockError::invalid(
            kind,
            "cannot insert before the body's section break",
        ));
    }
    Ok(())
}

/// Splice `text` into `p` at the absolute index. Interior-of-run
/// insertions extend the run (keeping its style, links included);
/// boundary insertions become a fresh run with the derived donor style.
fn splice_text(p: &mut Paragraph, index: usize, text: &str) -> Result<()> {
    // Interior of an existing run: extend it in place.
    for el in &mut p.elements {
        if let ParagraphElement::TextRun(run) = el
            && run.start_index < index
            && index < run.end_index
        {
            let byte = utf16_to_byte(&run.text, index - run.start_index)
                .ok_or(MockError::SurrogateSplit { index })?;
            run.text.insert_str(byte, text);
            return Ok(());
        }
    }
    // Interior of an atom is not addressable.
    for el in &p.elements {
        if el.is_atom() && el.start_index() < index && index < el.end_index() {
            return Err(MockError::invalid(
                "insertText",
                format!("index {index} falls inside a {}", el.kind_name()),
            ));
        }
    }
    // Element boundary: new run with the donor-derived style.
    let style = derive_insert_style(p, index);
    let slot = p
        .elements
        .iter()
        .position(|el| el.start_index() >= index)
        .unwrap_or(p.elements.len());
    p.elements.insert(
        slot,
        ParagraphElement::TextRun(TextRun {
            text: text.to_string(),
            style,
            ..TextRun::default()
        }),
    );
    Ok(())
}

/// Insert an atom element (footnote reference) at `index`, splitting
/// the covering run when the index is interior to it.
pub(crate) fn insert_atom(
    p: &mut Paragraph,
    index: usize,
    atom: ParagraphElement,
) -> Result<()> {
    let mut slot = None;
    for (i, el) in p.elements.iter().enumerate() {
        if el.start_index() >= index {
            slot = Some(i);
            break;
        }
        if el.start_index() < index && index < el.end_index() {
            let ParagraphElement::TextRun(_) = el else {
                return Err(MockError::invalid(
                    "createFootnote",
                    format!("index {index} falls inside a {}", el.kind_name()),
                ));
            };
            slot = Some(i + 1);
            break;
        }
    }
    let slot = slot.unwrap_or(p.elements.len());
    // Split the covering run if the insertion point is interior to it.
    if slot > 0
        && let Some(run) = p.elements[slot - 1].as_text_run_mut()
        && index < run.end_index
    {
        let byte = utf16_to_byte(&run.text, index - run.start_index)
            .ok_or(MockError::SurrogateSplit { index })?;
        let tail_text = run.text.split_off(byte);
        let tail = TextRun {
            text: tail_text,
            style: run.style.clone(),
            ..TextRun::default()
        };
        p.elements.insert(slot, ParagraphElement::TextRun(tail));
    }
    p.elements.insert(slot, atom);
    Ok(())
}

pub(crate) fn delete_content_range(segment: &mut Segment, start: usize, end: usize) -> Result<()> {
    const KIND: &str = "deleteContentRange";
    if start >= end {
        return Err(MockError::invalid(KIND, "range must not be empty"));
    }
    let seg_end = segment.end_index();
    if end > seg_end.saturating_sub(1) {
        return Err(MockError::invalid(
            KIND,
            "range may not include the segment's final newline",
        ));
    }
    if matches!(segment.id, SegmentId::Body) && start == 0 {
        return Err(MockError::invalid(
            KIND,
            "cannot delete the body's section break",
        ));
    }
    delete_in_elements(&mut segment.content, start, end)
}

fn delete_in_elements(
    elements: &mut Vec<StructuralElement>,
    start: usize,
    end: usize,
) -> Result<()> {
    const KIND: &str = "deleteContentRange";
    let mut i = 0;
    while i < elements.len() {
        let (s, e) = (elements[i].start_index(), elements[i].end_index());
        if e <= start || s >= end {
            i += 1;
            continue;
        }
        if start <= s && e <= end {
            if matches!(elements[i], StructuralElement::SectionBreak(_)) {
                return Err(MockError::invalid(KIND, "cannot delete a section break"));
            }
            elements.remove(i);
            continue;
        }
        match &mut elements[i] {
            StructuralElement::Paragraph(p) => {
                delete_from_paragraph(p, start, end)?;
            }
            StructuralElement::Table(t) => {
                let mut handled = false;
                for row in &mut t.rows {
                    for cell in &mut row.cells {
                        // The whole range must sit inside this cell's
                        // content, and must spare the cell's final newline.
                        if cell.start_index < start && end <= cell.end_index {
                            if end > cell.end_index - 1 {
                                return Err(MockError::invalid(
                                    KIND,
                                    "range may not include a cell's final newline",
                                ));
                            }
                            delete_in_elements(&mut cell.content, start, end)?;
                            handled = true;
                            break;
                        }
                    }
                    if handled {
                        break;
                    }
                }
                if !handled {
                    return Err(MockError::invalid(
                        KIND,
                        "range partially covers a table; delete the whole table or stay inside one cell",
                    ));
                }
            }
            StructuralElement::TableOfContents(_) => {
                return Err(MockError::invalid(KIND, "cannot edit a table of contents"));
            }
            StructuralElement::SectionBreak(_) => {
                return Err(MockError::invalid(KIND, "cannot delete a section break"));
            }
        }
        i += 1;
    }
    // A paragraph that lost its newline merges into the next paragraph;
    // there is nothing to merge into before a table or at the list end.
    for (i, el) in elements.iter().enumerate() {
        if let StructuralElement::Paragraph(p) = el
            && !p.ends_with_newline()
            && !matches!(elements.get(i + 1), Some(StructuralElement::Paragraph(_)))
        {
            return Err(MockError::invalid(
                KIND,
                "cannot delete a paragraph's final newline here",
            ));
        }
    }
    Ok(())
}

fn delete_from_paragraph(p: &mut Paragraph, start: usize, end: usize) -> Result<()> {
    const KIND: &str = "deleteContentRange";
    let old = std::mem::take(&mut p.elements);
    let mut out = Vec::with_capacity(old.len());
    for el in old {
        let (s, e) = (el.start_index(), el.end_index());
        if e <= start || s >= end {
            out.push(el);
            continue;
        }
        if start <= s && e <= end {
            continue; // fully covered: atom or run removed outright
        }
        match el {
            ParagraphElement::TextRun(mut run) => {
                let a = start.max(s) - s;
                let b = end.min(e) - s;
                let byte_a = utf16_to_byte(&run.text, a)
                    .ok_or(MockError::SurrogateSplit { index: start.max(s) })?;
                let byte_b = utf16_to_byte(&run.text, b)
                    .ok_or(MockError::SurrogateSplit { index: end.min(e) })?;
                run.text.replace_range(byte_a..byte_b, "");
                if !run.text.is_empty() || out.is_empty() {
                    out.push(ParagraphElement::TextRun(run));
                }
            }
            other => {
                // Partially covered atom: only an equation can span more
                // than one unit, and it cannot be split.
                return Err(MockError::invalid(
                    KIND,
                    format!("range partially covers a {}", other.kind_name()),
                ));
            }
        }
    }
    p.elements = out;
    Ok(())
}


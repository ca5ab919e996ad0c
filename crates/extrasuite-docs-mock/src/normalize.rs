//! The centralized reindex-and-normalize pass.
//!
//! Request handlers only mutate content structure; they never touch
//! `startIndex`/`endIndex`. After every handler this pass restores the
//! canonical form:
//!
//! 1. split any run containing an interior `\n` at each `\n`
//! 2. split any paragraph whose `\n`-terminated run is not its last
//!    element (both halves keep the paragraph's style and bullet)
//! 3. merge any paragraph missing its trailing `\n` into its successor
//!    (the earlier paragraph's style wins)
//! 4. drop empty runs, then merge adjacent runs with equal formatting,
//!    unioning their `explicit` sets
//! 5. recompute every index from the actual UTF-16 content

use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement, TextRun};
use extrasuite_docs_types::{Segment, StructuralElement, Tab};

/// Normalize and reindex every segment of a tab. A footnote segment
/// whose reference was deleted goes with it, as on the real API.
pub fn normalize_tab(tab: &mut Tab) {
    for segment in tab.segments_mut() {
        normalize_segment(segment);
    }
    if !tab.footnotes.is_empty() {
        let mut referenced = rustc_hash::FxHashSet::default();
        collect_footnote_refs(&tab.body.content, &mut referenced);
        tab.footnotes.retain(|id, _| referenced.contains(id));
    }
}

fn collect_footnote_refs(
    elements: &[StructuralElement],
    out: &mut rustc_hash::FxHashSet<String>,
) {
    for el in elements {
        match el {
            StructuralElement::Paragraph(p) => {
                for pe in &p.elements {
                    if let ParagraphElement::FootnoteReference(fr) = pe {
                        out.insert(fr.footnote_id.clone());
                    }
                }
            }
            StructuralElement::Table(t) => {
                for row in &t.rows {
                    for cell in &row.cells {
                        collect_footnote_refs(&cell.content, out);
                    }
                }
            }
            StructuralElement::TableOfContents(toc) => collect_footnote_refs(&toc.content, out),
            StructuralElement::SectionBreak(_) => {}
        }
    }
}

pub fn normalize_segment(segment: &mut Segment) {
    normalize_elements(&mut segment.content);
    segment.reindex();
}

fn normalize_elements(elements: &mut Vec<StructuralElement>) {
    split_newlines(elements);
    merge_headless_paragraphs(elements);
    for el in elements.iter_mut() {
        match el {
            StructuralElement::Paragraph(p) => coalesce_runs(p),
            StructuralElement::Table(t) => {
                for row in &mut t.rows {
                    for cell in &mut row.cells {
                        normalize_elements(&mut cell.content);
                    }
                }
            }
            StructuralElement::TableOfContents(toc) => normalize_elements(&mut toc.content),
            StructuralElement::SectionBreak(_) => {}
        }
    }
}

/// Steps 1 and 2: split runs at interior newlines, then split
/// paragraphs after every non-final newline run.
fn split_newlines(elements: &mut Vec<StructuralElement>) {
    let mut i = 0;
    while i < elements.len() {
        if let StructuralElement::Paragraph(p) = &mut elements[i] {
            split_runs_at_newlines(p);
            if let Some(tail) = split_paragraph_once(p) {
                elements.insert(i + 1, StructuralElement::Paragraph(tail));
                // Re-visit i+1: the tail may itself need splitting.
            }
        }
        i += 1;
    }
}

fn split_runs_at_newlines(p: &mut Paragraph) {
    let mut out: Vec<ParagraphElement> = Vec::with_capacity(p.elements.len());
    for el in p.elements.drain(..) {
        match el {
            ParagraphElement::TextRun(run) => {
                let mut rest = run.text.as_str();
                while let Some(pos) = rest.find('\n') {
                    let (head, tail) = rest.split_at(pos + 1);
                    out.push(ParagraphElement::TextRun(TextRun {
                        text: head.to_string(),
                        style: run.style.clone(),
                        ..TextRun::default()
                    }));
                    rest = tail;
                }
                if !rest.is_empty() {
                    out.push(ParagraphElement::TextRun(TextRun {
                        text: rest.to_string(),
                        style: run.style.clone(),
                        ..TextRun::default()
                    }));
                }
                if run.text.is_empty() {
                    // Preserve empty runs for the coalescing pass to drop;
                    // dropping here would lose a paragraph's only element.
                    out.push(ParagraphElement::TextRun(run));
                }
            }
            other => out.push(other),
        }
    }
    p.elements = out;
}

/// If the paragraph has a newline run before its last element, split it
/// there and return the tail paragraph.
fn split_paragraph_once(p: &mut Paragraph) -> Option<Paragraph> {
    let split_after = p.elements.iter().position(|el| {
        matches!(el, ParagraphElement::TextRun(run) if run.text.ends_with('\n'))
    })?;
    if split_after + 1 == p.elements.len() {
        return None;
    }
    let tail_elements: Vec<ParagraphElement> = p.elements.drain(split_after + 1..).collect();
    Some(Paragraph {
        start_index: 0,
        end_index: 0,
        style: p.style.clone(),
        style_class: p.style_class.clone(),
        bullet: p.bullet.clone(),
        elements: tail_elements,
    })
}

/// Step 3: a paragraph that lost its trailing newline merges into the
/// following paragraph. The earlier paragraph's style and bullet win.
fn merge_headless_paragraphs(elements: &mut Vec<StructuralElement>) {
    let mut i = 0;
    while i < elements.len() {
        let needs_merge = matches!(
            &elements[i],
            StructuralElement::Paragraph(p) if !p.ends_with_newline()
        ) && matches!(
            elements.get(i + 1),
            Some(StructuralElement::Paragraph(_))
        );
        if needs_merge {
            let StructuralElement::Paragraph(next) = elements.remove(i + 1) else {
                unreachable!()
            };
            let StructuralElement::Paragraph(p) = &mut elements[i] else {
                unreachable!()
            };
            p.elements.extend(next.elements);
            // Stay on i: the merged paragraph may still lack a newline.
        } else {
            i += 1;
        }
    }
}

/// Step 4: drop empty runs, then merge adjacent runs whose formatting
/// is equal ignoring provenance. Merged runs union their `explicit`
/// sets so provenance survives splicing.
fn coalesce_runs(p: &mut Paragraph) {
    if p.elements.len() > 1 {
        p.elements.retain(|el| {
            !matches!(el, ParagraphElement::TextRun(run) if run.text.is_empty())
        });
    }
    let mut out: Vec<ParagraphElement> = Vec::with_capacity(p.elements.len());
    for el in p.elements.drain(..) {
        match (out.last_mut(), el) {
            (
                Some(ParagraphElement::TextRun(prev)),
                ParagraphElement::TextRun(run),
            ) if !prev.text.ends_with('\n') && prev.style.same_formatting(&run.style) => {
                prev.text.push_str(&run.text);
                prev.style.explicit.union_with(&run.style.explicit);
            }
            (_, el) => out.push(el),
        }
    }
    p.elements = out;
}

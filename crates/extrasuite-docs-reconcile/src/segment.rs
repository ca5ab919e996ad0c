//! The segment walk: sequence diff, block-sequential emission, and the
//! running net shift.
//!
//! Blocks are processed strictly in order. Within a block, deletes are
//! emitted in descending index order against the pre-block state (base
//! indices plus the running shift), then inserts in ascending order at
//! final-state indices, then bullet and style corrections. After each
//! block the shift advances by the block's net length change, so the
//! next block's deletes land where its content actually sits. Insert
//! and style indices never need the shift at all: because the end state
//! of the segment *is* the desired segment, the desired document's own
//! derived indices are the final-state indices.

use crate::emit::{Emitter, SegmentCtx};
use crate::error::{ReconcileError, Result};
use crate::fingerprint::element_fingerprint;
use crate::lcs::{Block, diff_blocks};
use crate::paragraphs::{
    diff_units, donor_text_style, emit_group_delete, emit_group_insert, emit_paragraph_fixes,
    emit_run_style_fixes, predict_paragraphs, units_of,
};
use crate::tables;
use extrasuite_docs_types::paragraph::Paragraph;
use extrasuite_docs_types::{Segment, StructuralElement};
use rustc_hash::FxHashSet;
use std::ops::Range;
use tracing::debug;

/// Cross-segment state for one tab's walk.
#[derive(Debug, Default)]
pub(crate) struct Walk {
    /// Footnote ids present in the base tab; a desired reference to one
    /// of these can never be recreated.
    pub base_footnote_ids: FxHashSet<String>,
    /// Placeholder ids of footnotes the script creates, in creation
    /// order. Their segments are populated after the body walk.
    pub new_footnotes: Vec<String>,
}

pub(crate) fn reconcile_segment(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    base: &Segment,
    desired: &Segment,
) -> Result<()> {
    reconcile_elements(em, walk, ctx, &base.content, &desired.content, 0)
}

pub(crate) fn reconcile_elements(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    base: &[StructuralElement],
    desired: &[StructuralElement],
    shift: isize,
) -> Result<()> {
    let base_fps: Vec<u64> = base.iter().map(element_fingerprint).collect();
    let desired_fps: Vec<u64> = desired.iter().map(element_fingerprint).collect();
    let blocks = diff_blocks(&base_fps, &desired_fps);
    debug!(blocks = blocks.len(), "segment diff");

    let mut styled: FxHashSet<usize> = FxHashSet::default();
    let mut shift = shift;
    for block in &blocks {
        match block {
            Block::Equal { b, d, len } => {
                em.stats.blocks_equal += 1;
                process_equal(em, walk, ctx, base, desired, *b, *d, *len, shift, &styled)?;
            }
            Block::Replace {
                base: br,
                desired: dr,
            } => {
                em.stats.blocks_replaced += 1;
                shift = process_span(
                    em,
                    walk,
                    ctx,
                    base,
                    desired,
                    br.clone(),
                    dr.clone(),
                    shift,
                    &mut styled,
                )?;
            }
            Block::Insert { at, desired: dr } => {
                em.stats.blocks_inserted += 1;
                shift = process_span(
                    em,
                    walk,
                    ctx,
                    base,
                    desired,
                    *at..*at,
                    dr.clone(),
                    shift,
                    &mut styled,
                )?;
            }
            Block::Delete { base: br, at } => {
                em.stats.blocks_deleted += 1;
                shift = process_span(
                    em,
                    walk,
                    ctx,
                    base,
                    desired,
                    br.clone(),
                    *at..*at,
                    shift,
                    &mut styled,
                )?;
            }
        }
    }
    Ok(())
}

fn span_len(elements: &[StructuralElement], range: &Range<usize>) -> usize {
    if range.is_empty() {
        0
    } else {
        elements[range.end - 1].end_index() - elements[range.start].start_index()
    }
}

/// Maximal single-kind runs of a span.
#[derive(Debug, Clone)]
enum Piece {
    Paras(Range<usize>),
    Table(usize),
    Toc(usize),
    Break(usize),
}

fn pieces(elements: &[StructuralElement], range: Range<usize>) -> Vec<Piece> {
    let mut out = Vec::new();
    let mut i = range.start;
    while i < range.end {
        match &elements[i] {
            StructuralElement::Paragraph(_) => {
                let start = i;
                while i < range.end && matches!(elements[i], StructuralElement::Paragraph(_)) {
                    i += 1;
                }
                out.push(Piece::Paras(start..i));
            }
            StructuralElement::Table(_) => {
                out.push(Piece::Table(i));
                i += 1;
            }
            StructuralElement::TableOfContents(_) => {
                out.push(Piece::Toc(i));
                i += 1;
            }
            StructuralElement::SectionBreak(_) => {
                out.push(Piece::Break(i));
                i += 1;
            }
        }
    }
    out
}

/// One unit of work inside a changed block.
enum Item<'a> {
    /// A paragraph group pair, possibly extended with a kept neighbor.
    Group(PreparedGroup<'a>),
    /// Whole-element deletion (a table or a table of contents).
    DeleteElement { current: Range<usize> },
    /// A base table paired with a desired table.
    TablePair { b: usize, d: usize },
    /// A desired table with no base counterpart.
    InsertTable { d: usize },
}

struct PreparedGroup<'a> {
    base_paras: Vec<&'a Paragraph>,
    desired_paras: Vec<&'a Paragraph>,
    base_current_start: usize,
}

fn paras_of<'a>(elements: &'a [StructuralElement], range: Range<usize>) -> Vec<&'a Paragraph> {
    range
        .map(|i| elements[i].as_paragraph().expect("piece holds paragraphs"))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn process_span(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    base: &[StructuralElement],
    desired: &[StructuralElement],
    base_range: Range<usize>,
    desired_range: Range<usize>,
    shift: isize,
    styled: &mut FxHashSet<usize>,
) -> Result<isize> {
    let base_len = span_len(base, &base_range);
    let desired_len = span_len(desired, &desired_range);
    let next_shift = shift + desired_len as isize - base_len as isize;

    let base_pieces = pieces(base, base_range.clone());
    let desired_pieces = pieces(desired, desired_range.clone());

    // Pair the pieces into work items.
    let mut items: Vec<Item<'_>> = Vec::new();
    let mut bi = 0;
    let mut di = 0;
    loop {
        match (base_pieces.get(bi), desired_pieces.get(di)) {
            (Some(Piece::Paras(bp)), Some(Piece::Paras(dp))) => {
                items.push(Item::Group(PreparedGroup {
                    base_paras: paras_of(base, bp.clone()),
                    desired_paras: paras_of(desired, dp.clone()),
                    base_current_start: shifted(base[bp.start].start_index(), shift),
                }));
                bi += 1;
                di += 1;
            }
            (Some(Piece::Table(b)), Some(Piece::Table(d))) => {
                items.push(Item::TablePair { b: *b, d: *d });
                bi += 1;
                di += 1;
            }
            (Some(Piece::Paras(bp)), Some(_)) | (Some(Piece::Paras(bp)), None) => {
                // The kept follower is only adjacent to this run in the
                // final state when no desired pieces remain.
                let follower_adjacent = di >= desired_pieces.len();
                items.push(delete_paragraphs_item(
                    base,
                    desired,
                    bp.clone(),
                    &base_range,
                    &desired_range,
                    shift,
                    follower_adjacent,
                    styled,
                )?);
                bi += 1;
            }
            (Some(Piece::Table(b)), _) => {
                let t = base[*b].as_table().expect("piece holds a table");
                items.push(Item::DeleteElement {
                    current: shifted(t.start_index, shift)..shifted(t.end_index, shift),
                });
                bi += 1;
            }
            (Some(Piece::Toc(b)), _) => {
                let toc = &base[*b];
                items.push(Item::DeleteElement {
                    current: shifted(toc.start_index(), shift)..shifted(toc.end_index(), shift),
                });
                bi += 1;
            }
            (Some(Piece::Break(_)), _) | (_, Some(Piece::Break(_))) => {
                return Err(ReconcileError::unsupported(
                    "section breaks cannot be added or removed",
                ));
            }
            (None, Some(Piece::Paras(dp))) => {
                items.push(insert_paragraphs_item(
                    base, desired, dp.clone(), &base_range, &desired_range, shift, styled,
                )?);
                di += 1;
            }
            (None, Some(Piece::Table(d))) => {
                if !matches!(
                    base.get(base_range.end),
                    Some(StructuralElement::Paragraph(_))
                ) {
                    return Err(ReconcileError::unsupported(
                        "a table must be inserted before an existing paragraph",
                    ));
                }
                items.push(Item::InsertTable { d: *d });
                di += 1;
            }
            (None, Some(Piece::Toc(_))) => {
                return Err(ReconcileError::unsupported(
                    "a table of contents cannot be created",
                ));
            }
            (None, None) => break,
        }
    }

    // Pass 1: deletes, highest index first.
    for item in items.iter().rev() {
        match item {
            Item::Group(group) => {
                let base_units = units_of(&group.base_paras);
                let desired_units = units_of(&group.desired_paras);
                let diff = diff_units(&base_units, &desired_units);
                emit_group_delete(em, ctx, &base_units, &diff, group.base_current_start)?;
            }
            Item::DeleteElement { current } => {
                em.delete_range(ctx, current.start, current.end);
            }
            Item::TablePair { .. } | Item::InsertTable { .. } => {}
        }
    }

    // Pass 2: inserts ascending, then per-item corrections.
    for item in &items {
        match item {
            Item::Group(group) => emit_group(em, walk, ctx, group)?,
            Item::TablePair { b, d } => {
                let bt = base[*b].as_table().expect("piece holds a table");
                let dt = desired[*d].as_table().expect("piece holds a table");
                tables::emit_table_pair(em, walk, ctx, bt, dt)?;
            }
            Item::InsertTable { d } => {
                let dt = desired[*d].as_table().expect("piece holds a table");
                tables::emit_table_insert(em, walk, ctx, dt)?;
            }
            Item::DeleteElement { .. } => {}
        }
    }

    Ok(next_shift)
}

fn shifted(index: usize, shift: isize) -> usize {
    (index as isize + shift) as usize
}

/// A deleted paragraph run, extended with a kept neighbor so the edit
/// never has to address the position past a final newline.
#[allow(clippy::too_many_arguments)]
fn delete_paragraphs_item<'a>(
    base: &'a [StructuralElement],
    desired: &'a [StructuralElement],
    bp: Range<usize>,
    base_range: &Range<usize>,
    desired_range: &Range<usize>,
    shift: isize,
    follower_adjacent: bool,
    styled: &mut FxHashSet<usize>,
) -> Result<Item<'a>> {
    let mut base_paras = paras_of(base, bp.clone());
    let base_current_start = shifted(base[bp.start].start_index(), shift);

    // Follower extension: the kept paragraph right after the span.
    if follower_adjacent
        && bp.end == base_range.end
        && let Some(StructuralElement::Paragraph(follower)) = base.get(base_range.end)
    {
        let d_idx = desired_range.end;
        let Some(StructuralElement::Paragraph(follower_desired)) = desired.get(d_idx) else {
            return Err(ReconcileError::unsupported(
                "paragraph deletion without a following paragraph",
            ));
        };
        base_paras.push(follower);
        styled.insert(d_idx);
        return Ok(Item::Group(PreparedGroup {
            base_paras,
            desired_paras: vec![follower_desired],
            base_current_start,
        }));
    }

    // Predecessor extension: the element before the span, already in
    // its desired (current) form. Only the span's first run borders it.
    if bp.start == base_range.start
        && let Some(StructuralElement::Paragraph(pred)) = desired_range
            .start
            .checked_sub(1)
            .and_then(|i| desired.get(i))
    {
        let mut extended = vec![pred];
        extended.extend(base_paras);
        return Ok(Item::Group(PreparedGroup {
            base_paras: extended,
            desired_paras: vec![pred],
            base_current_start: pred.start_index,
        }));
    }

    // A run buried in the middle of the span cannot touch the segment's
    // final newline; a plain range delete is safe.
    if bp.end != base_range.end || base_range.end < base.len() {
        let end = shifted(base[bp.end - 1].end_index(), shift);
        return Ok(Item::DeleteElement {
            current: base_current_start..end,
        });
    }
    Err(ReconcileError::unsupported(
        "paragraphs cannot be deleted without an adjacent paragraph",
    ))
}

/// An inserted paragraph run, extended with a kept neighbor that
/// anchors the insertion point and donates inherited styles.
fn insert_paragraphs_item<'a>(
    base: &'a [StructuralElement],
    desired: &'a [StructuralElement],
    dp: Range<usize>,
    base_range: &Range<usize>,
    desired_range: &Range<usize>,
    shift: isize,
    styled: &mut FxHashSet<usize>,
) -> Result<Item<'a>> {
    let mut desired_paras = paras_of(desired, dp.clone());

    // Follower extension, only when the run is the last piece of the
    // span so the kept follower is truly adjacent in the final state.
    if dp.end == desired_range.end
        && let Some(StructuralElement::Paragraph(follower)) = base.get(base_range.end)
    {
        let d_idx = desired_range.end;
        if let Some(StructuralElement::Paragraph(follower_desired)) = desired.get(d_idx) {
            desired_paras.push(follower_desired);
            styled.insert(d_idx);
            return Ok(Item::Group(PreparedGroup {
                base_paras: vec![follower],
                desired_paras,
                base_current_start: shifted(follower.start_index, shift),
            }));
        }
    }

    // Predecessor extension.
    if let Some(StructuralElement::Paragraph(pred)) = dp
        .start
        .checked_sub(1)
        .and_then(|i| desired.get(i))
    {
        let mut extended = vec![pred];
        extended.extend(desired_paras);
        return Ok(Item::Group(PreparedGroup {
            base_paras: vec![pred],
            desired_paras: extended,
            base_current_start: pred.start_index,
        }));
    }
    Err(ReconcileError::unsupported(
        "paragraphs cannot be inserted without an adjacent paragraph",
    ))
}

/// Emit a prepared group's inserts and corrections (deletes were done
/// in pass 1).
fn emit_group(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    group: &PreparedGroup<'_>,
) -> Result<()> {
    let base_units = units_of(&group.base_paras);
    let desired_units = units_of(&group.desired_paras);
    let diff = diff_units(&base_units, &desired_units);
    let group_final_start = group.desired_paras[0].start_index;

    if diff.desired_mid_u16 > 0 {
        let insert_at = group_final_start + diff.prefix_u16;
        emit_group_insert(em, ctx, walk, &desired_units, &diff, insert_at)?;
    }

    let predictions = predict_paragraphs(
        &group.base_paras,
        &group.desired_paras,
        base_units.len(),
        desired_units.len(),
        &diff,
    );
    emit_paragraph_fixes(em, ctx, &predictions);

    let donor = donor_text_style(&base_units, &diff);
    emit_run_style_fixes(
        em,
        ctx,
        &base_units,
        &desired_units,
        &diff,
        &donor,
        group_final_start,
    );
    Ok(())
}

/// Style-only recursion into an equal block.
#[allow(clippy::too_many_arguments)]
fn process_equal(
    em: &mut Emitter,
    walk: &mut Walk,
    ctx: SegmentCtx<'_>,
    base: &[StructuralElement],
    desired: &[StructuralElement],
    b0: usize,
    d0: usize,
    len: usize,
    shift: isize,
    styled: &FxHashSet<usize>,
) -> Result<()> {
    let mut i = 0;
    while i < len {
        match (&base[b0 + i], &desired[d0 + i]) {
            (StructuralElement::Paragraph(_), StructuralElement::Paragraph(_))
                if !styled.contains(&(d0 + i)) =>
            {
                let start = i;
                while i < len
                    && matches!(
                        (&base[b0 + i], &desired[d0 + i]),
                        (
                            StructuralElement::Paragraph(_),
                            StructuralElement::Paragraph(_)
                        )
                    )
                    && !styled.contains(&(d0 + i))
                {
                    i += 1;
                }
                let group = PreparedGroup {
                    base_paras: paras_of(base, b0 + start..b0 + i),
                    desired_paras: paras_of(desired, d0 + start..d0 + i),
                    base_current_start: shifted(base[b0 + start].start_index(), shift),
                };
                emit_group(em, walk, ctx, &group)?;
            }
            (StructuralElement::Table(bt), StructuralElement::Table(dt)) => {
                tables::equal_table(em, walk, ctx, bt, dt, shift)?;
                i += 1;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

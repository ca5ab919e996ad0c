//! Intra-paragraph diffing for paired paragraph groups.
//!
//! A group of consecutive paragraphs is flattened into *units* (one per
//! character, one per atom). Text changes are the gap between the
//! common prefix and suffix; style changes come from comparing each
//! desired unit's style with what the mock will produce — the surviving
//! base style in the prefix/suffix, the donor-derived style in the
//! middle. Predictions mirror the mock's contracts exactly: donor-run
//! inheritance, link stripping, earlier-paragraph-wins merges, and
//! split-copies-style.

use crate::emit::{Emitter, SegmentCtx};
use crate::error::{ReconcileError, Result};
use crate::fingerprint::atom_identity;
use crate::segment::Walk;
use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement};
use extrasuite_docs_types::style::{
    Bullet, ParagraphField, StyleField, TextStyle,
};
use extrasuite_docs_types::utf16::utf16_len;

/// One indivisible piece of paragraph content.
pub(crate) enum Unit<'a> {
    Char(char, &'a TextStyle),
    Atom(&'a ParagraphElement),
}

impl Unit<'_> {
    pub fn len_utf16(&self) -> usize {
        match self {
            Unit::Char(c, _) => c.len_utf16(),
            Unit::Atom(atom) => atom.len_utf16(),
        }
    }

    pub fn style(&self) -> Option<&TextStyle> {
        match self {
            Unit::Char(_, style) => Some(style),
            Unit::Atom(atom) => atom.text_style(),
        }
    }
}

pub(crate) fn units_equal(a: &Unit<'_>, b: &Unit<'_>) -> bool {
    match (a, b) {
        (Unit::Char(ca, _), Unit::Char(cb, _)) => ca == cb,
        (Unit::Atom(aa), Unit::Atom(ab)) => atom_identity(aa) == atom_identity(ab),
        _ => false,
    }
}

/// Flatten a run of paragraphs into units.
pub(crate) fn units_of<'a>(paras: &[&'a Paragraph]) -> Vec<Unit<'a>> {
    let mut out = Vec::new();
    for p in paras {
        for el in &p.elements {
            match el {
                ParagraphElement::TextRun(run) => {
                    out.extend(run.text.chars().map(|c| Unit::Char(c, &run.style)));
                }
                atom => out.push(Unit::Atom(atom)),
            }
        }
    }
    out
}

/// Prefix/suffix alignment of two unit sequences, in units and UTF-16
/// code units. Surrogate safety is free: a unit is never half a pair.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GroupDiff {
    pub prefix_units: usize,
    pub suffix_units: usize,
    pub prefix_u16: usize,
    pub base_mid_u16: usize,
    pub desired_mid_u16: usize,
}

pub(crate) fn diff_units(base: &[Unit<'_>], desired: &[Unit<'_>]) -> GroupDiff {
    let mut prefix = 0;
    while prefix < base.len()
        && prefix < desired.len()
        && units_equal(&base[prefix], &desired[prefix])
    {
        prefix += 1;
    }
    let limit = base.len().min(desired.len()) - prefix;
    let mut suffix = 0;
    while suffix < limit
        && units_equal(
            &base[base.len() - 1 - suffix],
            &desired[desired.len() - 1 - suffix],
        )
    {
        suffix += 1;
    }
    // A pure append or pure truncation at the group's end would address
    // the position after the final newline, which no request may touch.
    // Rotate one unit of prefix into the suffix so the edit lands
    // before the newline instead.
    if suffix == 0
        && prefix == base.len().min(desired.len())
        && base.len() != desired.len()
        && prefix > 0
    {
        prefix -= 1;
        suffix = 1;
    }
    let u16_of = |units: &[Unit<'_>]| units.iter().map(Unit::len_utf16).sum::<usize>();
    GroupDiff {
        prefix_units: prefix,
        suffix_units: suffix,
        prefix_u16: u16_of(&base[..prefix]),
        base_mid_u16: u16_of(&base[prefix..base.len() - suffix]),
        desired_mid_u16: u16_of(&desired[prefix..desired.len() - suffix]),
    }
}

/// The style the mock will give text inserted at the group's edit
/// point: the run ending there, or the first surviving run when the
/// point sits at a paragraph start, link auto-styling stripped.
pub(crate) fn donor_text_style(base: &[Unit<'_>], diff: &GroupDiff) -> TextStyle {
    let at_paragraph_start = diff.prefix_units == 0
        || matches!(base.get(diff.prefix_units - 1), Some(Unit::Char('\n', _)));
    let donor = if at_paragraph_start {
        base[base.len() - diff.suffix_units..]
            .iter()
            .chain(base.iter())
            .find_map(|u| match u {
                Unit::Char(_, style) => Some(*style),
                Unit::Atom(_) => None,
            })
    } else {
        base[..diff.prefix_units].iter().rev().find_map(|u| match u {
            Unit::Char(_, style) => Some(*style),
            Unit::Atom(_) => None,
        })
    };
    let mut style = donor.cloned().unwrap_or_default();
    if style.link.is_some() {
        style.link = None;
        if !style.explicit.contains(StyleField::ForegroundColor) {
            style.foreground_color = None;
        }
    }
    style
}

/// Delete the base middle, guarding the atoms no request can remove.
pub(crate) fn emit_group_delete(
    em: &mut Emitter,
    ctx: SegmentCtx<'_>,
    base: &[Unit<'_>],
    diff: &GroupDiff,
    base_start_shifted: usize,
) -> Result<()> {
    if diff.base_mid_u16 == 0 {
        return Ok(());
    }
    for unit in &base[diff.prefix_units..base.len() - diff.suffix_units] {
        if let Unit::Atom(atom) = unit
            && atom.is_immutable()
        {
            return Err(ReconcileError::unsupported(format!(
                "a {} cannot be removed",
                atom.kind_name()
            )));
        }
    }
    let start = base_start_shifted + diff.prefix_u16;
    em.delete_range(ctx, start, start + diff.base_mid_u16);
    Ok(())
}

/// Insert the desired middle: text via insertText, footnote references
/// via createFootnote. Any other atom cannot be created.
pub(crate) fn emit_group_insert(
    em: &mut Emitter,
    ctx: SegmentCtx<'_>,
    walk: &mut Walk,
    desired: &[Unit<'_>],
    diff: &GroupDiff,
    insert_at: usize,
) -> Result<()> {
    let mut pos = insert_at;
    let mut buffer = String::new();
    for unit in &desired[diff.prefix_units..desired.len() - diff.suffix_units] {
        match unit {
            Unit::Char(c, _) => buffer.push(*c),
            Unit::Atom(ParagraphElement::FootnoteReference(fr)) => {
                if walk.base_footnote_ids.contains(&fr.footnote_id) {
                    return Err(ReconcileError::unsupported(
                        "a footnote reference cannot be moved",
                    ));
                }
                if !buffer.is_empty() {
                    let len = utf16_len(&buffer);
                    em.insert_text(ctx, pos, std::mem::take(&mut buffer));
                    pos += len;
                }
                em.create_footnote(ctx, pos, &fr.footnote_id);
                walk.new_footnotes.push(fr.footnote_id.clone());
                pos += 1;
            }
            Unit::Atom(atom) => {
                return Err(ReconcileError::unsupported(format!(
                    "a {} cannot be created",
                    atom.kind_name()
                )));
            }
        }
    }
    if !buffer.is_empty() {
        em.insert_text(ctx, pos, buffer);
    }
    Ok(())
}

/// Per-desired-unit predicted style, mirroring the mock.
fn predicted_style<'a>(
    base: &'a [Unit<'a>],
    desired_len: usize,
    diff: &GroupDiff,
    donor: &'a TextStyle,
    k: usize,
) -> Option<&'a TextStyle> {
    if k < diff.prefix_units {
        base[k].style()
    } else if k >= desired_len - diff.suffix_units {
        base[base.len() - (desired_len - k)].style()
    } else {
        Some(donor)
    }
}

/// Emit the minimal `updateTextStyle` sequence turning the predicted
/// post-edit styles into the desired ones. Ranges are final-state.
pub(crate) fn emit_run_style_fixes(
    em: &mut Emitter,
    ctx: SegmentCtx<'_>,
    base: &[Unit<'_>],
    desired: &[Unit<'_>],
    diff: &GroupDiff,
    donor: &TextStyle,
    group_final_start: usize,
) {
    let mut pos = group_final_start;
    let mut k = 0;
    while k < desired.len() {
        let unit_len = desired[k].len_utf16();
        let (Some(pred), Some(want)) = (
            predicted_style(base, desired.len(), diff, donor, k),
            desired[k].style(),
        ) else {
            pos += unit_len;
            k += 1;
            continue;
        };
        let mask = pred.diff_fields(want);
        if mask.is_empty() {
            pos += unit_len;
            k += 1;
            continue;
        }
        let payload = want.restricted_to(mask);
        let start = pos;
        let mut end = pos + unit_len;
        k += 1;
        while k < desired.len() {
            let (Some(npred), Some(nwant)) = (
                predicted_style(base, desired.len(), diff, donor, k),
                desired[k].style(),
            ) else {
                break;
            };
            if npred.diff_fields(nwant) != mask || nwant.restricted_to(mask) != payload {
                break;
            }
            end += desired[k].len_utf16();
            k += 1;
        }
        em.update_text_style(ctx, start, end, payload, mask);
        pos = end;
    }
}

/// Predicted paragraph-level outcome for one desired paragraph.
pub(crate) struct ParaPrediction<'a> {
    pub desired: &'a Paragraph,
    pub final_start: usize,
    pub final_end: usize,
    pub style: &'a extrasuite_docs_types::ParagraphStyle,
    pub bullet: Option<&'a Bullet>,
    pub class: Option<&'a str>,
}

/// Map each desired paragraph to the base paragraph whose style the
/// mock will leave on it: its own counterpart when it lies wholly in
/// the prefix or suffix, the edit point's donor paragraph otherwise
/// (splits copy the donor's style, merges keep the earlier one).
pub(crate) fn predict_paragraphs<'a>(
    base_paras: &[&'a Paragraph],
    desired_paras: &[&'a Paragraph],
    base_units_len: usize,
    desired_units_len: usize,
    diff: &GroupDiff,
) -> Vec<ParaPrediction<'a>> {
    // Unit spans per paragraph on both sides.
    let spans = |paras: &[&'a Paragraph]| -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(paras.len());
        let mut at = 0;
        for p in paras {
            let count: usize = p
                .elements
                .iter()
                .map(|el| match el {
                    ParagraphElement::TextRun(run) => run.text.chars().count(),
                    _ => 1,
                })
                .sum();
            out.push((at, at + count));
            at += count;
        }
        out
    };
    let base_spans = spans(base_paras);
    let desired_spans = spans(desired_paras);

    let base_para_at = |unit: usize| -> &'a Paragraph {
        let unit = unit.min(base_units_len.saturating_sub(1));
        for (i, (s, e)) in base_spans.iter().enumerate() {
            if *s <= unit && unit < *e {
                return base_paras[i];
            }
        }
        base_paras[base_paras.len() - 1]
    };
    let donor_para = base_para_at(diff.prefix_units);

    desired_paras
        .iter()
        .zip(&desired_spans)
        .map(|(p, (s, e))| {
            let within_prefix = *e <= diff.prefix_units;
            let within_suffix = *s >= desired_units_len - diff.suffix_units;
            let source = if within_prefix {
                base_para_at(*s)
            } else if within_suffix {
                base_para_at(base_units_len - (desired_units_len - *s))
            } else {
                donor_para
            };
            ParaPrediction {
                desired: p,
                final_start: p.start_index,
                final_end: p.end_index,
                style: &source.style,
                bullet: source.bullet.as_ref(),
                class: source.style_class.as_deref(),
            }
        })
        .collect()
}

/// Emit bullet transitions (grouped per contiguous list block) and
/// paragraph-style corrections for a predicted group. Bullets go first
/// so the style ranges see the post-tab-consumption coordinates.
pub(crate) fn emit_paragraph_fixes(
    em: &mut Emitter,
    ctx: SegmentCtx<'_>,
    predictions: &[ParaPrediction<'_>],
) {
    emit_bullet_fixes(em, ctx, predictions);
    for p in predictions {
        let mut mask = p.style.diff_fields(&p.desired.style);
        if p.class != p.desired.style_class.as_deref() {
            // Applying or removing a named class installs the
            // paragraph's named style even when the resolved paragraph
            // properties happen to coincide.
            mask.insert(ParagraphField::NamedStyleType);
        }
        if !mask.is_empty() {
            em.update_paragraph_style(
                ctx,
                p.final_start,
                p.final_end,
                p.desired.style.restricted_to(mask),
                mask,
            );
        }
    }
}

enum BulletAction {
    Keep,
    Remove,
    Apply,
}

fn bullet_action(predicted: Option<&Bullet>, desired: Option<&Bullet>) -> BulletAction {
    match (predicted, desired) {
        (None, None) => BulletAction::Keep,
        (Some(_), None) => BulletAction::Remove,
        (None, Some(_)) => BulletAction::Apply,
        (Some(have), Some(want)) => {
            if have.preset == want.preset && have.nesting_level == want.nesting_level {
                BulletAction::Keep
            } else {
                BulletAction::Apply
            }
        }
    }
}

fn emit_bullet_fixes(em: &mut Emitter, ctx: SegmentCtx<'_>, predictions: &[ParaPrediction<'_>]) {
    let mut i = 0;
    while i < predictions.len() {
        let p = &predictions[i];
        match bullet_action(p.bullet, p.desired.bullet.as_ref()) {
            BulletAction::Keep => i += 1,
            BulletAction::Remove => {
                let start = p.final_start;
                let mut end = p.final_end;
                i += 1;
                while i < predictions.len()
                    && matches!(
                        bullet_action(
                            predictions[i].bullet,
                            predictions[i].desired.bullet.as_ref()
                        ),
                        BulletAction::Remove
                    )
                {
                    end = predictions[i].final_end;
                    i += 1;
                }
                em.delete_bullets(ctx, start, end);
            }
            BulletAction::Apply => {
                let preset = p
                    .desired
                    .bullet
                    .as_ref()
                    .and_then(|b| b.preset)
                    .unwrap_or(extrasuite_docs_types::BulletPreset::DiscCircleSquare);
                let start = p.final_start;
                let mut group_end = p.final_end;
                let mut members = vec![p];
                i += 1;
                while i < predictions.len() {
                    let next = &predictions[i];
                    let next_preset = next.desired.bullet.as_ref().and_then(|b| b.preset);
                    let applies = matches!(
                        bullet_action(next.bullet, next.desired.bullet.as_ref()),
                        BulletAction::Apply
                    ) && next_preset == Some(preset);
                    if !applies {
                        break;
                    }
                    group_end = next.final_end;
                    members.push(next);
                    i += 1;
                }
                // Nesting is expressed by leading tabs, consumed by the
                // bullet request itself.
                let mut tabs_inserted = 0;
                for member in &members {
                    let nesting = member
                        .desired
                        .bullet
                        .as_ref()
                        .map_or(0, |b| b.nesting_level);
                    if nesting > 0 {
                        em.insert_text(
                            ctx,
                            member.final_start + tabs_inserted,
                            "\t".repeat(nesting),
                        );
                        tabs_inserted += nesting;
                    }
                }
                em.create_bullets(ctx, start, group_end + tabs_inserted, preset);
            }
        }
    }
}

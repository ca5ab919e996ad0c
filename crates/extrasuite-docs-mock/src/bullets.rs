//! `createParagraphBullets` and `deleteParagraphBullets`.

use crate::engine::IdGen;
use crate::error::Result;
use crate::styles::for_paragraphs_in_range;
use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement};
use extrasuite_docs_types::style::{Bullet, BulletPreset, StyleField, TextStyle};
use extrasuite_docs_types::Segment;

/// Bullet every paragraph intersecting the range, assigning one list id
/// for the whole request. Leading tab characters are consumed as the
/// nesting level, one level per tab, matching the API.
pub(crate) fn create_paragraph_bullets(
    segment: &mut Segment,
    start: usize,
    end: usize,
    preset: BulletPreset,
    ids: &mut IdGen,
) -> Result<()> {
    let list_id = ids.list();
    for_paragraphs_in_range(&mut segment.content, start, end, &mut |p| {
        let nesting_level = consume_leading_tabs(p);
        p.bullet = Some(Bullet {
            list_id: list_id.clone(),
            nesting_level,
            preset: Some(preset),
            text_style: bullet_text_style(p),
        });
        Ok(())
    })
}

pub(crate) fn delete_paragraph_bullets(
    segment: &mut Segment,
    start: usize,
    end: usize,
) -> Result<()> {
    for_paragraphs_in_range(&mut segment.content, start, end, &mut |p| {
        p.bullet = None;
        Ok(())
    })
}

/// Strip leading tabs off the paragraph's text, counting one nesting
/// level per tab. Tabs may span several runs.
fn consume_leading_tabs(p: &mut Paragraph) -> usize {
    let mut level = 0;
    for el in &mut p.elements {
        let Some(run) = el.as_text_run_mut() else {
            break;
        };
        let tabs = run.text.chars().take_while(|c| *c == '\t').count();
        run.text.drain(..tabs);
        level += tabs;
        if !run.text.is_empty() {
            break;
        }
    }
    level
}

/// The bullet glyph's own text style. Italic mirrors the paragraph text
/// only where an explicit update set it; inherited italic stays off the
/// glyph, as the real API behaves.
fn bullet_text_style(p: &Paragraph) -> TextStyle {
    let mut style = TextStyle::default();
    if let Some(first_run) = p.elements.iter().find_map(ParagraphElement::as_text_run)
        && first_run.style.explicit.contains(StyleField::Italic)
    {
        style.italic = first_run.style.italic;
    }
    style
}

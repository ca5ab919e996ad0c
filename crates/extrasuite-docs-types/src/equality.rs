//! The document equality relation.
//!
//! Two documents are compared modulo (a) server-assigned ids, which are
//! normalized to their order of first appearance, (b) the `explicit`
//! provenance set, which no comparison here ever reads, and (c) an
//! optional tolerance for the known mock-vs-real divergences: B/I/U-only
//! style differences and run-boundary differences where the flattened
//! text and resolved styles agree.

use crate::document::{Document, Segment, StructuralElement, Tab};
use crate::paragraph::{Paragraph, ParagraphElement};
use crate::style::{Bullet, ParagraphStyle, StyleField, TextStyle};
use crate::table::Table;
use rustc_hash::FxHashMap;
use std::fmt;

/// Which divergences the comparison accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    /// Accept differences confined to bold/italic/underline on an
    /// otherwise-equal text style.
    pub ignore_biu: bool,
    /// Accept run-boundary differences when the flattened content and
    /// resolved styles agree.
    pub ignore_run_boundaries: bool,
}

impl Tolerance {
    /// Exact comparison (still modulo server ids and provenance).
    pub fn strict() -> Tolerance {
        Tolerance {
            ignore_biu: false,
            ignore_run_boundaries: false,
        }
    }

    /// The tolerance used when verifying the mock against the real API.
    pub fn verification() -> Tolerance {
        Tolerance {
            ignore_biu: true,
            ignore_run_boundaries: true,
        }
    }
}

/// One point of disagreement between two documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub path: String,
    pub detail: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.detail)
    }
}

/// Compare two documents under the given tolerance. An empty result
/// means the documents are equal under the relation.
pub fn compare_documents(a: &Document, b: &Document, tolerance: Tolerance) -> Vec<Mismatch> {
    let mut cmp = Comparer::new(tolerance);
    cmp.documents(a, b);
    cmp.mismatches
}

/// Convenience wrapper over [`compare_documents`].
pub fn documents_equivalent(a: &Document, b: &Document, tolerance: Tolerance) -> bool {
    compare_documents(a, b, tolerance).is_empty()
}

/// Maps server-assigned ids (`kix.*`, `h.*`, `t.*`, `cmt.*`) to their
/// order of first appearance so that two documents with different
/// assigned ids still compare equal.
#[derive(Default)]
struct IdNormalizer {
    map: FxHashMap<String, String>,
    counter: usize,
}

fn is_server_id(id: &str) -> bool {
    id.starts_with("kix.") || id.starts_with("h.") || id.starts_with("t.") || id.starts_with("cmt.")
}

impl IdNormalizer {
    fn canon(&mut self, id: &str) -> String {
        if id.is_empty() || !is_server_id(id) {
            return id.to_string();
        }
        if let Some(c) = self.map.get(id) {
            return c.clone();
        }
        let c = format!("#{}", self.counter);
        self.counter += 1;
        self.map.insert(id.to_string(), c.clone());
        c
    }
}

struct Comparer {
    tolerance: Tolerance,
    path: Vec<String>,
    mismatches: Vec<Mismatch>,
    ids_a: IdNormalizer,
    ids_b: IdNormalizer,
}

impl Comparer {
    fn new(tolerance: Tolerance) -> Comparer {
        Comparer {
            tolerance,
            path: Vec::new(),
            mismatches: Vec::new(),
            ids_a: IdNormalizer::default(),
            ids_b: IdNormalizer::default(),
        }
    }

    fn record(&mut self, detail: impl Into<String>) {
        self.mismatches.push(Mismatch {
            path: self.path.join("."),
            detail: detail.into(),
        });
    }

    fn scoped<F: FnOnce(&mut Self)>(&mut self, part: impl Into<String>, f: F) {
        self.path.push(part.into());
        f(self);
        self.path.pop();
    }

    fn ids_match(&mut self, a: &str, b: &str) -> bool {
        self.ids_a.canon(a) == self.ids_b.canon(b)
    }

    fn documents(&mut self, a: &Document, b: &Document) {
        if a.title != b.title {
            self.record(format!("title {:?} != {:?}", a.title, b.title));
        }
        if a.tabs.len() != b.tabs.len() {
            self.record(format!("tab count {} != {}", a.tabs.len(), b.tabs.len()));
            return;
        }
        for (i, (ta, tb)) in a.tabs.iter().zip(&b.tabs).enumerate() {
            self.scoped(format!("tab[{i}]"), |c| c.tab(ta, tb));
        }
    }

    fn tab(&mut self, a: &Tab, b: &Tab) {
        if !self.ids_match(&a.tab_id, &b.tab_id) {
            self.record(format!("tabId {:?} != {:?}", a.tab_id, b.tab_id));
        }
        if a.title != b.title {
            self.record(format!("title {:?} != {:?}", a.title, b.title));
        }
        self.scoped("body", |c| c.segment(&a.body, &b.body));
        for (name, sa, sb) in [
            ("headers", &a.headers, &b.headers),
            ("footers", &a.footers, &b.footers),
            ("footnotes", &a.footnotes, &b.footnotes),
        ] {
            if sa.len() != sb.len() {
                self.record(format!("{name} count {} != {}", sa.len(), sb.len()));
                continue;
            }
            for (i, ((ida, va), (idb, vb))) in sa.iter().zip(sb.iter()).enumerate() {
                if !self.ids_match(ida, idb) {
                    self.record(format!("{name}[{i}] id {ida:?} != {idb:?}"));
                }
                self.scoped(format!("{name}[{i}]"), |c| c.segment(va, vb));
            }
        }
        for (name, va, vb) in [
            ("documentStyle", &a.document_style, &b.document_style),
            ("namedStyles", &a.named_styles, &b.named_styles),
            ("inlineObjects", &a.inline_objects, &b.inline_objects),
            (
                "positionedObjects",
                &a.positioned_objects,
                &b.positioned_objects,
            ),
            ("namedRanges", &a.named_ranges, &b.named_ranges),
        ] {
            if va != vb {
                self.record(format!("{name} differs"));
            }
        }
        if a.comments != b.comments {
            self.record("comments differ");
        }
    }

    fn segment(&mut self, a: &Segment, b: &Segment) {
        self.elements(&a.content, &b.content);
    }

    fn elements(&mut self, a: &[StructuralElement], b: &[StructuralElement]) {
        if a.len() != b.len() {
            self.record(format!("element count {} != {}", a.len(), b.len()));
            return;
        }
        for (i, (ea, eb)) in a.iter().zip(b).enumerate() {
            self.scoped(format!("element[{i}]"), |c| c.element(ea, eb));
        }
    }

    fn element(&mut self, a: &StructuralElement, b: &StructuralElement) {
        match (a, b) {
            (StructuralElement::Paragraph(pa), StructuralElement::Paragraph(pb)) => {
                self.paragraph(pa, pb);
            }
            (StructuralElement::Table(ta), StructuralElement::Table(tb)) => self.table(ta, tb),
            (StructuralElement::SectionBreak(sa), StructuralElement::SectionBreak(sb)) => {
                if sa.section_style != sb.section_style {
                    self.record("sectionStyle differs");
                }
            }
            // TOC content is server-refreshed; presence is all that
            // reconciliation guarantees.
            (StructuralElement::TableOfContents(_), StructuralElement::TableOfContents(_)) => {}
            _ => {
                self.record(format!("kind {} != {}", a.kind_name(), b.kind_name()));
            }
        }
    }

    fn table(&mut self, a: &Table, b: &Table) {
        if a.rows.len() != b.rows.len() {
            self.record(format!("row count {} != {}", a.rows.len(), b.rows.len()));
            return;
        }
        for (r, (ra, rb)) in a.rows.iter().zip(&b.rows).enumerate() {
            if ra.cells.len() != rb.cells.len() {
                self.scoped(format!("row[{r}]"), |c| {
                    c.record(format!("cell count {} != {}", ra.cells.len(), rb.cells.len()));
                });
                continue;
            }
            for (cidx, (ca, cb)) in ra.cells.iter().zip(&rb.cells).enumerate() {
                self.scoped(format!("cell[{r}][{cidx}]"), |c| {
                    if ca.style != cb.style {
                        c.record("cellStyle differs");
                    }
                    c.elements(&ca.content, &cb.content);
                });
            }
        }
    }

    fn paragraph(&mut self, a: &Paragraph, b: &Paragraph) {
        self.paragraph_style(&a.style, &b.style);
        self.bullets(&a.bullet, &b.bullet);
        if self.tolerance.ignore_run_boundaries {
            self.flattened_content(a, b);
        } else {
            self.exact_content(a, b);
        }
    }

    // `headingId` is server-assigned and unknowable to a desired folder,
    // so it takes no part in the relation.
    fn paragraph_style(&mut self, a: &ParagraphStyle, b: &ParagraphStyle) {
        let diff = a.diff_fields(b);
        if !diff.is_empty() {
            self.record(format!("paragraphStyle differs on {}", diff.to_mask()));
        }
    }

    fn bullets(&mut self, a: &Option<Bullet>, b: &Option<Bullet>) {
        match (a, b) {
            (None, None) => {}
            (Some(ba), Some(bb)) => {
                // List ids are server-assigned and re-derived per side;
                // membership is compared via nesting and preset only.
                if ba.nesting_level != bb.nesting_level {
                    self.record(format!(
                        "bullet nesting {} != {}",
                        ba.nesting_level, bb.nesting_level
                    ));
                }
                if ba.preset != bb.preset {
                    self.record("bullet preset differs");
                }
                if !self.styles_match(&ba.text_style, &bb.text_style) {
                    self.record("bullet textStyle differs");
                }
            }
            _ => self.record("bullet presence differs"),
        }
    }

    fn styles_match(&self, a: &TextStyle, b: &TextStyle) -> bool {
        let mut diff = a.diff_fields(b);
        if self.tolerance.ignore_biu {
            diff.remove(StyleField::Bold);
            diff.remove(StyleField::Italic);
            diff.remove(StyleField::Underline);
        }
        diff.is_empty()
    }

    fn exact_content(&mut self, a: &Paragraph, b: &Paragraph) {
        if a.elements.len() != b.elements.len() {
            self.record(format!(
                "run count {} != {}",
                a.elements.len(),
                b.elements.len()
            ));
            return;
        }
        for (i, (ea, eb)) in a.elements.iter().zip(&b.elements).enumerate() {
            self.scoped(format!("run[{i}]"), |c| c.paragraph_element(ea, eb));
        }
    }

    fn paragraph_element(&mut self, a: &ParagraphElement, b: &ParagraphElement) {
        if a.kind_name() != b.kind_name() {
            self.record(format!("kind {} != {}", a.kind_name(), b.kind_name()));
            return;
        }
        if let (ParagraphElement::TextRun(ra), ParagraphElement::TextRun(rb)) = (a, b) {
            if ra.text != rb.text {
                self.record(format!("text {:?} != {:?}", ra.text, rb.text));
            }
            if !self.styles_match(&ra.style, &rb.style) {
                self.record(format!(
                    "textStyle differs on {}",
                    ra.style.diff_fields(&rb.style).to_mask()
                ));
            }
            return;
        }
        if !self.atoms_equal(a, b) {
            self.record("atom differs");
        }
        if let (Some(sa), Some(sb)) = (a.text_style(), b.text_style())
            && !self.styles_match(sa, sb)
        {
            self.record("atom textStyle differs");
        }
    }

    fn atoms_equal(&mut self, a: &ParagraphElement, b: &ParagraphElement) -> bool {
        match (a, b) {
            (ParagraphElement::InlineObject(x), ParagraphElement::InlineObject(y)) => {
                self.ids_match(&x.inline_object_id, &y.inline_object_id)
            }
            (ParagraphElement::Person(x), ParagraphElement::Person(y)) => x.email == y.email,
            (ParagraphElement::RichLink(x), ParagraphElement::RichLink(y)) => x.url == y.url,
            (ParagraphElement::DateChip(x), ParagraphElement::DateChip(y)) => {
                x.timestamp == y.timestamp
                    && x.date_format == y.date_format
                    && x.time_format == y.time_format
                    && x.time_zone_id == y.time_zone_id
                    && x.locale == y.locale
            }
            (ParagraphElement::Equation(x), ParagraphElement::Equation(y)) => {
                x.length == y.length
            }
            (ParagraphElement::FootnoteReference(x), ParagraphElement::FootnoteReference(y)) => {
                self.ids_match(&x.footnote_id, &y.footnote_id)
            }
            (ParagraphElement::PageBreak(_), ParagraphElement::PageBreak(_))
            | (ParagraphElement::ColumnBreak(_), ParagraphElement::ColumnBreak(_))
            | (ParagraphElement::HorizontalRule(_), ParagraphElement::HorizontalRule(_)) => true,
            (ParagraphElement::AutoText(x), ParagraphElement::AutoText(y)) => {
                x.auto_text_type == y.auto_text_type
            }
            _ => false,
        }
    }

    /// Compare paragraph content flattened to per-scalar (char, style)
    /// pairs so run boundaries cannot matter.
    fn flattened_content(&mut self, a: &Paragraph, b: &Paragraph) {
        let units_a = flatten(a);
        let units_b = flatten(b);
        if units_a.len() != units_b.len() {
            self.record(format!(
                "content length {} != {}",
                units_a.len(),
                units_b.len()
            ));
            return;
        }
        for (i, (ua, ub)) in units_a.iter().zip(&units_b).enumerate() {
            match (ua, ub) {
                (Unit::Char(ca, sa), Unit::Char(cb, sb)) => {
                    if ca != cb {
                        self.record(format!("char[{i}] {ca:?} != {cb:?}"));
                        return;
                    }
                    if !self.styles_match(sa, sb) {
                        self.record(format!(
                            "style at char[{i}] differs on {}",
                            sa.diff_fields(sb).to_mask()
                        ));
                        return;
                    }
                }
                (Unit::Atom(ea), Unit::Atom(eb)) => {
                    if !self.atoms_equal(ea, eb) {
                        self.record(format!("atom[{i}] differs"));
                        return;
                    }
                }
                _ => {
                    self.record(format!("unit[{i}] kind differs"));
                    return;
                }
            }
        }
    }
}

enum Unit<'a> {
    Char(char, &'a TextStyle),
    Atom(&'a ParagraphElement),
}

fn flatten(p: &Paragraph) -> Vec<Unit<'_>> {
    let mut out = Vec::new();
    for el in &p.elements {
        match el {
            ParagraphElement::TextRun(run) => {
                out.extend(run.text.chars().map(|c| Unit::Char(c, &run.style)));
            }
            atom => out.push(Unit::Atom(atom)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{SectionBreak, SegmentId};
    use crate::paragraph::TextRun;

    fn doc_with_runs(runs: Vec<(&str, TextStyle)>) -> Document {
        let mut doc = Document {
            document_id: "doc".to_string(),
            title: "t".to_string(),
            tabs: vec![Tab {
                tab_id: "t.0".to_string(),
                body: Segment {
                    id: SegmentId::Body,
                    content: vec![
                        StructuralElement::SectionBreak(SectionBreak::default()),
                        StructuralElement::Paragraph(Paragraph {
                            elements: runs
                                .into_iter()
                                .map(|(text, style)| {
                                    ParagraphElement::TextRun(TextRun {
                                        text: text.to_string(),
                                        style,
                                        ..TextRun::default()
                                    })
                                })
                                .collect(),
                            ..Paragraph::default()
                        }),
                    ],
                },
                ..Tab::default()
            }],
        };
        doc.reindex();
        doc
    }

    #[test]
    fn identical_documents_are_equal() {
        let a = doc_with_runs(vec![("Hello\n", TextStyle::default())]);
        let b = a.clone();
        assert!(documents_equivalent(&a, &b, Tolerance::strict()));
    }

    #[test]
    fn run_boundaries_tolerated_only_under_verification() {
        let a = doc_with_runs(vec![("Hello\n", TextStyle::default())]);
        let b = doc_with_runs(vec![
            ("Hel", TextStyle::default()),
            ("lo\n", TextStyle::default()),
        ]);
        assert!(!documents_equivalent(&a, &b, Tolerance::strict()));
        assert!(documents_equivalent(&a, &b, Tolerance::verification()));
    }

    #[test]
    fn biu_tolerated_only_under_verification() {
        let bold = TextStyle {
            bold: Some(true),
            ..TextStyle::default()
        };
        let a = doc_with_runs(vec![("Hello\n", bold)]);
        let b = doc_with_runs(vec![("Hello\n", TextStyle::default())]);
        assert!(!documents_equivalent(&a, &b, Tolerance::strict()));
        assert!(documents_equivalent(&a, &b, Tolerance::verification()));
    }

    #[test]
    fn font_changes_never_tolerated() {
        let styled = TextStyle {
            font_family: Some("Courier New".to_string()),
            ..TextStyle::default()
        };
        let a = doc_with_runs(vec![("Hello\n", styled)]);
        let b = doc_with_runs(vec![("Hello\n", TextStyle::default())]);
        assert!(!documents_equivalent(&a, &b, Tolerance::verification()));
    }

    #[test]
    fn server_ids_normalize_by_appearance_order() {
        let mut a = doc_with_runs(vec![("x\n", TextStyle::default())]);
        let mut b = doc_with_runs(vec![("x\n", TextStyle::default())]);
        a.tabs[0].tab_id = "t.abc".to_string();
        b.tabs[0].tab_id = "t.xyz".to_string();
        assert!(documents_equivalent(&a, &b, Tolerance::strict()));

        // A non-server id must still compare literally.
        a.tabs[0].tab_id = "custom".to_string();
        b.tabs[0].tab_id = "other".to_string();
        assert!(!documents_equivalent(&a, &b, Tolerance::strict()));
    }

    #[test]
    fn provenance_is_invisible_to_equality() {
        let mut with_prov = TextStyle {
            italic: Some(true),
            ..TextStyle::default()
        };
        with_prov.explicit.insert(StyleField::Italic);
        let without = TextStyle {
            italic: Some(true),
            ..TextStyle::default()
        };
        let a = doc_with_runs(vec![("Hello\n", with_prov)]);
        let b = doc_with_runs(vec![("Hello\n", without)]);
        assert!(documents_equivalent(&a, &b, Tolerance::strict()));
    }
}

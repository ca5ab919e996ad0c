//! Paragraphs and paragraph elements.

use crate::style::{Bullet, ParagraphStyle, TextStyle};
use crate::utf16::utf16_len;
use serde::{Deserialize, Serialize};

/// A paragraph: a paragraph style, optional list membership, and an
/// ordered sequence of elements. The final element is always a text run
/// whose last character is `\n`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paragraph {
    pub start_index: usize,
    pub end_index: usize,
    pub style: ParagraphStyle,
    /// Style class assigned by the XML layer. Serialization metadata:
    /// invisible to the wire shape and to document equality, but the
    /// reconciler reads it to detect class changes.
    #[serde(skip)]
    pub style_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullet: Option<Bullet>,
    pub elements: Vec<ParagraphElement>,
}

impl Paragraph {
    /// An empty paragraph: a single `"\n"` run with the given styles.
    pub fn empty(style: ParagraphStyle, text_style: TextStyle) -> Paragraph {
        Paragraph {
            style,
            elements: vec![ParagraphElement::TextRun(TextRun {
                start_index: 0,
                end_index: 0,
                text: "\n".to_string(),
                style: text_style,
            })],
            ..Paragraph::default()
        }
    }

    /// Concatenated text of the runs, including the trailing newline.
    /// Atom elements contribute nothing here; use [`Paragraph::units`]
    /// when atoms matter.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for el in &self.elements {
            if let ParagraphElement::TextRun(run) = el {
                out.push_str(&run.text);
            }
        }
        out
    }

    /// Length of the paragraph in UTF-16 code units, including atoms and
    /// the trailing newline.
    pub fn len_utf16(&self) -> usize {
        self.elements.iter().map(ParagraphElement::len_utf16).sum()
    }

    pub fn ends_with_newline(&self) -> bool {
        matches!(
            self.elements.last(),
            Some(ParagraphElement::TextRun(run)) if run.text.ends_with('\n')
        )
    }

    /// True if the paragraph contains no atom elements, only text runs.
    pub fn is_text_only(&self) -> bool {
        self.elements
            .iter()
            .all(|el| matches!(el, ParagraphElement::TextRun(_)))
    }
}

/// One element of a paragraph's content.
///
/// Every atom occupies exactly one UTF-16 code unit, except `Equation`,
/// which spans its own opaque length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParagraphElement {
    TextRun(TextRun),
    InlineObject(InlineObjectElement),
    Person(Person),
    RichLink(RichLink),
    DateChip(DateChip),
    Equation(Equation),
    FootnoteReference(FootnoteReference),
    PageBreak(PageBreak),
    ColumnBreak(ColumnBreak),
    HorizontalRule(HorizontalRule),
    AutoText(AutoText),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRun {
    pub start_index: usize,
    pub end_index: usize,
    #[serde(rename = "content")]
    pub text: String,
    #[serde(rename = "textStyle")]
    pub style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineObjectElement {
    pub start_index: usize,
    pub end_index: usize,
    pub inline_object_id: String,
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    pub start_index: usize,
    pub end_index: usize,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RichLink {
    pub start_index: usize,
    pub end_index: usize,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text_style: TextStyle,
}

/// A date smart chip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateChip {
    pub start_index: usize,
    pub end_index: usize,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub text_style: TextStyle,
}

/// An equation. Content is opaque; only its UTF-16 span length is
/// tracked so surrounding indices stay correct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Equation {
    pub start_index: usize,
    pub end_index: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FootnoteReference {
    pub start_index: usize,
    pub end_index: usize,
    pub footnote_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footnote_number: Option<String>,
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageBreak {
    pub start_index: usize,
    pub end_index: usize,
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnBreak {
    pub start_index: usize,
    pub end_index: usize,
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HorizontalRule {
    pub start_index: usize,
    pub end_index: usize,
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoText {
    pub start_index: usize,
    pub end_index: usize,
    #[serde(rename = "type")]
    pub auto_text_type: String,
    pub text_style: TextStyle,
}

impl ParagraphElement {
    pub fn start_index(&self) -> usize {
        match self {
            ParagraphElement::TextRun(e) => e.start_index,
            ParagraphElement::InlineObject(e) => e.start_index,
            ParagraphElement::Person(e) => e.start_index,
            ParagraphElement::RichLink(e) => e.start_index,
            ParagraphElement::DateChip(e) => e.start_index,
            ParagraphElement::Equation(e) => e.start_index,
            ParagraphElement::FootnoteReference(e) => e.start_index,
            ParagraphElement::PageBreak(e) => e.start_index,
            ParagraphElement::ColumnBreak(e) => e.start_index,
            ParagraphElement::HorizontalRule(e) => e.start_index,
            ParagraphElement::AutoText(e) => e.start_index,
        }
    }

    pub fn end_index(&self) -> usize {
        match self {
            ParagraphElement::TextRun(e) => e.end_index,
            ParagraphElement::InlineObject(e) => e.end_index,
            ParagraphElement::Person(e) => e.end_index,
            ParagraphElement::RichLink(e) => e.end_index,
            ParagraphElement::DateChip(e) => e.end_index,
            ParagraphElement::Equation(e) => e.end_index,
            ParagraphElement::FootnoteReference(e) => e.end_index,
            ParagraphElement::PageBreak(e) => e.end_index,
            ParagraphElement::ColumnBreak(e) => e.end_index,
            ParagraphElement::HorizontalRule(e) => e.end_index,
            ParagraphElement::AutoText(e) => e.end_index,
        }
    }

    pub fn set_indices(&mut self, start: usize, end: usize) {
        macro_rules! assign {
            ($e:expr) => {{
                $e.start_index = start;
                $e.end_index = end;
            }};
        }
        match self {
            ParagraphElement::TextRun(e) => assign!(e),
            ParagraphElement::InlineObject(e) => assign!(e),
            ParagraphElement::Person(e) => assign!(e),
            ParagraphElement::RichLink(e) => assign!(e),
            ParagraphElement::DateChip(e) => assign!(e),
            ParagraphElement::Equation(e) => assign!(e),
            ParagraphElement::FootnoteReference(e) => assign!(e),
            ParagraphElement::PageBreak(e) => assign!(e),
            ParagraphElement::ColumnBreak(e) => assign!(e),
            ParagraphElement::HorizontalRule(e) => assign!(e),
            ParagraphElement::AutoText(e) => assign!(e),
        }
    }

    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> usize {
        match self {
            ParagraphElement::TextRun(run) => utf16_len(&run.text),
            ParagraphElement::Equation(eq) => eq.length,
            _ => 1,
        }
    }

    pub fn text_style(&self) -> Option<&TextStyle> {
        match self {
            ParagraphElement::TextRun(e) => Some(&e.style),
            ParagraphElement::InlineObject(e) => Some(&e.text_style),
            ParagraphElement::Person(e) => Some(&e.text_style),
            ParagraphElement::RichLink(e) => Some(&e.text_style),
            ParagraphElement::DateChip(e) => Some(&e.text_style),
            ParagraphElement::FootnoteReference(e) => Some(&e.text_style),
            ParagraphElement::PageBreak(e) => Some(&e.text_style),
            ParagraphElement::ColumnBreak(e) => Some(&e.text_style),
            ParagraphElement::HorizontalRule(e) => Some(&e.text_style),
            ParagraphElement::AutoText(e) => Some(&e.text_style),
            ParagraphElement::Equation(_) => None,
        }
    }

    pub fn text_style_mut(&mut self) -> Option<&mut TextStyle> {
        match self {
            ParagraphElement::TextRun(e) => Some(&mut e.style),
            ParagraphElement::InlineObject(e) => Some(&mut e.text_style),
            ParagraphElement::Person(e) => Some(&mut e.text_style),
            ParagraphElement::RichLink(e) => Some(&mut e.text_style),
            ParagraphElement::DateChip(e) => Some(&mut e.text_style),
            ParagraphElement::FootnoteReference(e) => Some(&mut e.text_style),
            ParagraphElement::PageBreak(e) => Some(&mut e.text_style),
            ParagraphElement::ColumnBreak(e) => Some(&mut e.text_style),
            ParagraphElement::HorizontalRule(e) => Some(&mut e.text_style),
            ParagraphElement::AutoText(e) => Some(&mut e.text_style),
            ParagraphElement::Equation(_) => None,
        }
    }

    pub fn as_text_run(&self) -> Option<&TextRun> {
        match self {
            ParagraphElement::TextRun(run) => Some(run),
            _ => None,
        }
    }

    pub fn as_text_run_mut(&mut self) -> Option<&mut TextRun> {
        match self {
            ParagraphElement::TextRun(run) => Some(run),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ParagraphElement::TextRun(_) => "textRun",
            ParagraphElement::InlineObject(_) => "inlineObjectElement",
            ParagraphElement::Person(_) => "person",
            ParagraphElement::RichLink(_) => "richLink",
            ParagraphElement::DateChip(_) => "date",
            ParagraphElement::Equation(_) => "equation",
            ParagraphElement::FootnoteReference(_) => "footnoteReference",
            ParagraphElement::PageBreak(_) => "pageBreak",
            ParagraphElement::ColumnBreak(_) => "columnBreak",
            ParagraphElement::HorizontalRule(_) => "horizontalRule",
            ParagraphElement::AutoText(_) => "autoText",
        }
    }

    /// Non-text elements occupy their span as an opaque unit.
    pub fn is_atom(&self) -> bool {
        !matches!(self, ParagraphElement::TextRun(_))
    }

    /// Elements the API can neither insert nor delete: their count must
    /// match exactly between pristine and desired.
    pub fn is_immutable(&self) -> bool {
        matches!(
            self,
            ParagraphElement::HorizontalRule(_)
                | ParagraphElement::InlineObject(_)
                | ParagraphElement::AutoText(_)
                | ParagraphElement::ColumnBreak(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_length_counts_atoms_and_runs() {
        let para = Paragraph {
            elements: vec![
                ParagraphElement::TextRun(TextRun {
                    text: "hi ".to_string(),
                    ..TextRun::default()
                }),
                ParagraphElement::Person(Person {
                    email: "a@b.c".to_string(),
                    ..Person::default()
                }),
                ParagraphElement::TextRun(TextRun {
                    text: "\n".to_string(),
                    ..TextRun::default()
                }),
            ],
            ..Paragraph::default()
        };
        assert_eq!(para.len_utf16(), 5);
        assert_eq!(para.plain_text(), "hi \n");
        assert!(para.ends_with_newline());
        assert!(!para.is_text_only());
    }

    #[test]
    fn equation_spans_its_declared_length() {
        let eq = ParagraphElement::Equation(Equation {
            length: 7,
            ..Equation::default()
        });
        assert_eq!(eq.len_utf16(), 7);
        assert!(eq.is_atom());
        assert!(!eq.is_immutable());
    }
}

//! Tab-folder serialization for ExtraSuite Docs.
//!
//! Converts between a [`Tab`] value and the per-tab file set the agent
//! edits: `document.xml`, `styles.xml`, and the JSON sidecars. The
//! conversion is *consistent*, not lossless: pristine and desired
//! folders traverse the same path, so systematic drops cancel in the
//! diff. File I/O stays with the caller; this crate only maps names to
//! contents.

mod classes;
mod error;
mod reader;
mod sidecar;
mod tree;
mod validate;
mod writer;

pub use classes::{BASE_CLASS, ResolvedStyle, StyleClass, StyleSheet, parse_styles, write_styles};
pub use error::{Result, XmlError};
pub use sidecar::{parse_sidecar, write_sidecar};
pub use tree::{XmlElement, XmlNode, parse};
pub use validate::validate_immutable_elements;

use extrasuite_docs_types::style::{Alignment, RgbColor};
use extrasuite_docs_types::{Comment, Tab};
use std::collections::BTreeMap;

pub const DOCUMENT_XML: &str = "document.xml";
pub const STYLES_XML: &str = "styles.xml";
pub const DOCSTYLE_XML: &str = "docstyle.xml";
pub const NAMEDSTYLES_XML: &str = "namedstyles.xml";
pub const OBJECTS_XML: &str = "objects.xml";
pub const POSITIONED_OBJECTS_XML: &str = "positionedObjects.xml";
pub const NAMEDRANGES_XML: &str = "namedranges.xml";
pub const COMMENTS_XML: &str = "comments.xml";

/// One tab's on-disk file set, name → content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabFiles {
    files: BTreeMap<String, String>,
}

impl TabFiles {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: &str, content: String) {
        self.files.insert(name.to_string(), content);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Serialize one tab into its file set.
pub fn serialize_tab(tab: &Tab) -> TabFiles {
    tracing::debug!(tab = %tab.tab_id, "serializing tab folder");
    let mut writer = writer::DocWriter::new(derive_base_class(&tab.named_styles));
    let document = writer.write_document(tab);
    let mut files = TabFiles::default();
    files.insert(DOCUMENT_XML, document);
    files.insert(STYLES_XML, writer.styles_xml());
    for (name, value) in [
        (DOCSTYLE_XML, &tab.document_style),
        (NAMEDSTYLES_XML, &tab.named_styles),
        (OBJECTS_XML, &tab.inline_objects),
        (POSITIONED_OBJECTS_XML, &tab.positioned_objects),
        (NAMEDRANGES_XML, &tab.named_ranges),
    ] {
        if !value.is_null() {
            files.insert(name, sidecar::write_sidecar(value));
        }
    }
    if !tab.comments.is_empty() {
        let value = serde_json::to_value(&tab.comments).unwrap_or(serde_json::Value::Null);
        files.insert(COMMENTS_XML, sidecar::write_sidecar(&value));
    }
    files
}

/// Deserialize one tab from its file set.
pub fn deserialize_tab(files: &TabFiles) -> Result<Tab> {
    let sheet = match files.get(STYLES_XML) {
        Some(source) => parse_styles(source, STYLES_XML)?,
        None => StyleSheet::default(),
    };
    let document = files.get(DOCUMENT_XML).ok_or_else(|| XmlError::MissingFile {
        file: DOCUMENT_XML.to_string(),
    })?;
    let mut reader = reader::DocReader::new(&sheet)?;
    let mut tab = reader.read_document(document)?;
    tracing::debug!(tab = %tab.tab_id, "deserialized tab folder");

    for (name, slot) in [
        (DOCSTYLE_XML, &mut tab.document_style),
        (NAMEDSTYLES_XML, &mut tab.named_styles),
        (OBJECTS_XML, &mut tab.inline_objects),
        (POSITIONED_OBJECTS_XML, &mut tab.positioned_objects),
        (NAMEDRANGES_XML, &mut tab.named_ranges),
    ] {
        if let Some(source) = files.get(name) {
            *slot = sidecar::parse_sidecar(source, name)?;
        }
    }
    if let Some(source) = files.get(COMMENTS_XML) {
        let value = sidecar::parse_sidecar(source, COMMENTS_XML)?;
        tab.comments = serde_json::from_value::<Vec<Comment>>(value).map_err(|err| {
            XmlError::BadSidecar {
                file: COMMENTS_XML.to_string(),
                message: err.to_string(),
            }
        })?;
    }

    tab.check_invariants().map_err(|err| XmlError::XmlMalformed {
        file: DOCUMENT_XML.to_string(),
        line: 0,
        message: err.to_string(),
    })?;
    Ok(tab)
}

/// Derive the `_base` class from the tab's NORMAL_TEXT named style.
fn derive_base_class(named_styles: &serde_json::Value) -> StyleClass {
    let mut class = StyleClass {
        name: BASE_CLASS.to_string(),
        ..StyleClass::default()
    };
    let Some(styles) = named_styles.get("styles").and_then(|v| v.as_array()) else {
        return class;
    };
    let Some(normal) = styles
        .iter()
        .find(|s| s.get("namedStyleType").and_then(|v| v.as_str()) == Some("NORMAL_TEXT"))
    else {
        return class;
    };
    if let Some(ts) = normal.get("textStyle") {
        class.text.bold = ts.get("bold").and_then(|v| v.as_bool());
        class.text.italic = ts.get("italic").and_then(|v| v.as_bool());
        class.text.underline = ts.get("underline").and_then(|v| v.as_bool());
        class.text.strikethrough = ts.get("strikethrough").and_then(|v| v.as_bool());
        class.text.font_family = ts
            .pointer("/weightedFontFamily/fontFamily")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        class.text.font_size_pt = ts.pointer("/fontSize/magnitude").and_then(|v| v.as_f64());
        class.text.foreground_color = json_rgb(ts.pointer("/foregroundColor/color/rgbColor"));
        class.text.background_color = json_rgb(ts.pointer("/backgroundColor/color/rgbColor"));
    }
    class.align = normal
        .pointer("/paragraphStyle/alignment")
        .and_then(|v| v.as_str())
        .and_then(|name| match name {
            "START" => Some(Alignment::Start),
            "CENTER" => Some(Alignment::Center),
            "END" => Some(Alignment::End),
            "JUSTIFIED" => Some(Alignment::Justified),
            _ => None,
        });
    class
}

fn json_rgb(value: Option<&serde_json::Value>) -> Option<RgbColor> {
    let value = value?;
    Some(RgbColor {
        red: value.get("red").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
        green: value.get("green").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
        blue: value.get("blue").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use extrasuite_docs_types::paragraph::ParagraphElement;
    use extrasuite_docs_types::style::NamedStyleType;
    use extrasuite_docs_types::{StructuralElement, Tolerance, documents_equivalent};

    fn files_with(doc: &str) -> TabFiles {
        let mut files = TabFiles::default();
        files.insert(DOCUMENT_XML, doc.to_string());
        files
    }

    fn files_with_styles(doc: &str, styles: &str) -> TabFiles {
        let mut files = files_with(doc);
        files.insert(STYLES_XML, styles.to_string());
        files
    }

    #[test]
    fn reads_paragraphs_and_headings() {
        let tab = deserialize_tab(&files_with(
            "<document id=\"t.0\"><h1>Chapter One</h1><p>Hello <b>World</b></p></document>",
        ))
        .unwrap();
        let body = &tab.body.content;
        // section break + h1 + p + synthetic trailing paragraph
        assert_eq!(body.len(), 4);
        let h1 = body[1].as_paragraph().unwrap();
        assert_eq!(h1.style.named_style_type, Some(NamedStyleType::Heading1));
        assert_eq!(h1.plain_text(), "Chapter One\n");
        let p = body[2].as_paragraph().unwrap();
        assert_eq!(p.plain_text(), "Hello World\n");
        let world = p.elements[1].as_text_run().unwrap();
        assert_eq!(world.text, "World");
        assert_eq!(world.style.bold, Some(true));
        tab.check_invariants().unwrap();
    }

    #[test]
    fn newline_in_content_is_rejected_with_location() {
        let err = deserialize_tab(&files_with(
            "<document id=\"t.0\">\n<p>broken\ntext</p>\n</document>",
        ))
        .unwrap_err();
        let XmlError::ContentNewline { element, line, .. } = err else {
            panic!("expected ContentNewline, got {err:?}");
        };
        assert_eq!(element, "p");
        assert_eq!(line, 2);
    }

    #[test]
    fn ragged_table_is_rejected() {
        let err = deserialize_tab(&files_with(
            "<document id=\"t.0\"><table><tr><td><p>a</p></td><td><p>b</p></td></tr><tr><td><p>c</p></td></tr></table></document>",
        ))
        .unwrap_err();
        assert!(matches!(err, XmlError::TableShape { .. }));
    }

    #[test]
    fn cell_without_paragraph_is_rejected() {
        let err = deserialize_tab(&files_with(
            "<document id=\"t.0\"><table><tr><td></td></tr></table></document>",
        ))
        .unwrap_err();
        assert!(matches!(err, XmlError::TableShape { .. }));
    }

    #[test]
    fn class_cascade_inflates_runs() {
        let tab = deserialize_tab(&files_with_styles(
            "<document id=\"t.0\"><p class=\"warn\">careful</p></document>",
            "<styles><style class=\"_base\" font=\"Arial\" size=\"11\"/><style class=\"warn\" color=\"#FF8800\" bold=\"1\"/></styles>",
        ))
        .unwrap();
        let p = tab.body.content[1].as_paragraph().unwrap();
        assert_eq!(p.style_class.as_deref(), Some("warn"));
        let run = p.elements[0].as_text_run().unwrap();
        assert_eq!(run.style.font_family.as_deref(), Some("Arial"));
        assert_eq!(run.style.bold, Some(true));
        assert_eq!(
            run.style.foreground_color.map(|c| c.to_hex()),
            Some("#FF8800".to_string())
        );
    }

    #[test]
    fn unknown_class_is_rejected() {
        let err = deserialize_tab(&files_with(
            "<document id=\"t.0\"><p class=\"nope\">x</p></document>",
        ))
        .unwrap_err();
        assert!(matches!(err, XmlError::UnresolvedClass { .. }));
    }

    #[test]
    fn list_items_group_into_lists() {
        let tab = deserialize_tab(&files_with(
            "<document id=\"t.0\"><li>one</li><li level=\"1\">two</li><p>gap</p><li kind=\"number\">three</li></document>",
        ))
        .unwrap();
        let body = &tab.body.content;
        let b1 = body[1].as_paragraph().unwrap().bullet.clone().unwrap();
        let b2 = body[2].as_paragraph().unwrap().bullet.clone().unwrap();
        let b4 = body[4].as_paragraph().unwrap().bullet.clone().unwrap();
        assert_eq!(b1.list_id, b2.list_id);
        assert_eq!(b2.nesting_level, 1);
        assert_ne!(b1.list_id, b4.list_id);
        assert_eq!(
            b4.preset,
            Some(extrasuite_docs_types::BulletPreset::NumberedDecimalAlphaRoman)
        );
    }

    #[test]
    fn footnote_becomes_reference_and_segment() {
        let tab = deserialize_tab(&files_with(
            "<document id=\"t.0\"><p>text<footnote id=\"kix.fn9\"><p>the note</p></footnote></p></document>",
        ))
        .unwrap();
        assert_eq!(tab.footnotes.len(), 1);
        let p = tab.body.content[1].as_paragraph().unwrap();
        assert!(p.elements.iter().any(|el| matches!(
            el,
            ParagraphElement::FootnoteReference(fr) if fr.footnote_id == "kix.fn9"
        )));
        let note = tab.footnotes.get("kix.fn9").unwrap();
        assert_eq!(
            note.content[0].as_paragraph().unwrap().plain_text(),
            "the note\n"
        );
    }

    #[test]
    fn round_trip_is_consistent() {
        let source = "<document id=\"t.0\"><h1>Title</h1><p>Hello <b>World</b> and <i>more</i></p><li>item</li><table><tr><td><p>cell</p></td><td><p/></td></tr></table></document>";
        let tab1 = deserialize_tab(&files_with(source)).unwrap();
        let files2 = serialize_tab(&tab1);
        let tab2 = deserialize_tab(&files2).unwrap();
        let doc1 = extrasuite_docs_types::Document {
            tabs: vec![tab1],
            ..Default::default()
        };
        let doc2 = extrasuite_docs_types::Document {
            tabs: vec![tab2],
            ..Default::default()
        };
        assert!(
            documents_equivalent(&doc1, &doc2, Tolerance::strict()),
            "second round trip must be a fixed point: {:?}",
            extrasuite_docs_types::compare_documents(&doc1, &doc2, Tolerance::strict())
        );
        // And the serialized form itself is stable from then on.
        let files3 = serialize_tab(&doc2.tabs[0]);
        assert_eq!(files2, files3);
    }

    #[test]
    fn serialized_document_snapshot() {
        let tab = deserialize_tab(&files_with(
            "<document id=\"t.0\"><h1>Head</h1><p>Hi <b>there</b></p></document>",
        ))
        .unwrap();
        let files = serialize_tab(&tab);
        insta::assert_snapshot!(files.get(DOCUMENT_XML).unwrap(), @r###"
        <document id="t.0">
          <h1>Head</h1>
          <p>Hi <b>there</b></p>
        </document>
        "###);
        insta::assert_snapshot!(files.get(STYLES_XML).unwrap(), @r###"
        <styles>
          <style class="_base"/>
        </styles>
        "###);
    }

    #[test]
    fn synthetic_trailing_paragraph_restored_and_stripped() {
        let tab = deserialize_tab(&files_with("<document id=\"t.0\"><p>only</p></document>")).unwrap();
        // section break + <p> + synthetic
        assert_eq!(tab.body.content.len(), 3);
        let files = serialize_tab(&tab);
        let doc = files.get(DOCUMENT_XML).unwrap();
        assert_eq!(doc.matches("<p>").count(), 1);
    }

    #[test]
    fn empty_sidecars_are_omitted() {
        let tab = deserialize_tab(&files_with("<document id=\"t.0\"><p>x</p></document>")).unwrap();
        let files = serialize_tab(&tab);
        assert!(files.get(DOCSTYLE_XML).is_none());
        assert!(files.get(COMMENTS_XML).is_none());
    }

    #[test]
    fn sidecars_round_trip() {
        let mut files = files_with("<document id=\"t.0\"><p>x</p></document>");
        files.insert(
            DOCSTYLE_XML,
            write_sidecar(&serde_json::json!({"marginTop": {"magnitude": 72}})),
        );
        let tab = deserialize_tab(&files).unwrap();
        assert_eq!(
            tab.document_style.pointer("/marginTop/magnitude"),
            Some(&serde_json::json!(72))
        );
        let out = serialize_tab(&tab);
        assert!(out.get(DOCSTYLE_XML).is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        struct GenPara {
            text: String,
            bold_tail: bool,
            heading: bool,
        }

        fn arb_para() -> impl Strategy<Value = GenPara> {
            ("[a-z é&<]{0,8}", any::<bool>(), any::<bool>()).prop_map(
                |(text, bold_tail, heading)| GenPara {
                    text,
                    bold_tail,
                    heading,
                },
            )
        }

        fn document_xml(paras: &[GenPara]) -> String {
            let mut out = String::from("<document id=\"t.0\">");
            for p in paras {
                let tag = if p.heading { "h2" } else { "p" };
                out.push_str(&format!("<{tag}>{}", crate::tree::escape_text(&p.text)));
                if p.bold_tail {
                    out.push_str("<b>tail</b>");
                }
                out.push_str(&format!("</{tag}>"));
            }
            out.push_str("</document>");
            out
        }

        proptest! {
            /// A second round trip is a fixed point, both as documents
            /// and as serialized bytes.
            #[test]
            fn second_round_trip_is_a_fixed_point(paras in proptest::collection::vec(arb_para(), 0..5)) {
                let tab1 = deserialize_tab(&files_with(&document_xml(&paras))).unwrap();
                let files2 = serialize_tab(&tab1);
                let tab2 = deserialize_tab(&files2).unwrap();
                let doc1 = extrasuite_docs_types::Document {
                    tabs: vec![tab1],
                    ..Default::default()
                };
                let doc2 = extrasuite_docs_types::Document {
                    tabs: vec![tab2.clone()],
                    ..Default::default()
                };
                prop_assert!(
                    documents_equivalent(&doc1, &doc2, Tolerance::strict()),
                    "{:?}",
                    extrasuite_docs_types::compare_documents(&doc1, &doc2, Tolerance::strict())
                );
                prop_assert_eq!(serialize_tab(&tab2), files2);
            }
        }
    }

    #[test]
    fn base_class_derives_from_named_styles() {
        let named = serde_json::json!({
            "styles": [{
                "namedStyleType": "NORMAL_TEXT",
                "textStyle": {
                    "weightedFontFamily": {"fontFamily": "Courier New"},
                    "fontSize": {"magnitude": 12.0, "unit": "PT"}
                }
            }]
        });
        let base = derive_base_class(&named);
        assert_eq!(base.text.font_family.as_deref(), Some("Courier New"));
        assert_eq!(base.text.font_size_pt, Some(12.0));
    }

    #[test]
    fn explicit_false_flags_survive_via_generated_spans() {
        // A run that turns bold *off* against a bold document default.
        let styles = "<styles><style class=\"_base\" bold=\"1\"/><style class=\"off\" bold=\"0\"/></styles>";
        let doc = "<document id=\"t.0\"><p><span class=\"off\">quiet</span></p></document>";
        let tab = deserialize_tab(&files_with_styles(doc, styles)).unwrap();
        let run = tab.body.content[1].as_paragraph().unwrap().elements[0]
            .as_text_run()
            .unwrap();
        assert_eq!(run.style.bold, Some(false));
        assert!(run.style.explicit.is_empty());
    }
}

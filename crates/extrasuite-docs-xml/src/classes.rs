//! `styles.xml`: named style classes and the resolution cascade.
//!
//! A class only declares fields that deviate from its parent; `_base`
//! is the reserved root, derived from the tab's NORMAL_TEXT named style
//! at pull time. Resolution runs document default → segment class →
//! element class → inline formatting; the reader inflates the resolved
//! style onto every run.

use crate::error::{Result, XmlError};
use crate::tree::{XmlElement, escape_attr, parse};
use extrasuite_docs_types::style::{Alignment, RgbColor, StyleField, TextStyle};
use extrasuite_docs_types::MaskField;

pub const BASE_CLASS: &str = "_base";

/// One `<style class="…">` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleClass {
    pub name: String,
    pub parent: Option<String>,
    /// Declared text-style deviations (fields left `None` are inherited).
    pub text: TextStyle,
    pub align: Option<Alignment>,
}

/// The parsed contents of `styles.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSheet {
    classes: Vec<StyleClass>,
}

/// A fully-resolved cascade level: what a run inherits before inline
/// formatting applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedStyle {
    pub text: TextStyle,
    pub align: Option<Alignment>,
}

impl StyleSheet {
    pub fn get(&self, name: &str) -> Option<&StyleClass> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn push(&mut self, class: StyleClass) {
        self.classes.push(class);
    }

    pub fn classes(&self) -> &[StyleClass] {
        &self.classes
    }

    /// The document default: `_base` alone (empty when absent).
    pub fn base(&self) -> ResolvedStyle {
        let mut resolved = ResolvedStyle::default();
        if let Some(base) = self.get(BASE_CLASS) {
            overlay(&mut resolved, base);
        }
        resolved
    }

    /// The parent chain of a class, most-derived first, excluding the
    /// implicit `_base` root.
    fn chain(&self, name: &str, file: &str, line: usize) -> Result<Vec<&StyleClass>> {
        let mut chain: Vec<&StyleClass> = Vec::new();
        let mut current = name;
        while current != BASE_CLASS {
            let Some(class) = self.get(current) else {
                return Err(XmlError::UnresolvedClass {
                    file: file.to_string(),
                    line,
                    class: current.to_string(),
                });
            };
            if chain.iter().any(|c| c.name == current) {
                return Err(XmlError::UnresolvedClass {
                    file: file.to_string(),
                    line,
                    class: format!("{name} (parent cycle through {current})"),
                });
            }
            chain.push(class);
            current = class.parent.as_deref().unwrap_or(BASE_CLASS);
        }
        Ok(chain)
    }

    /// Resolve a class against the document default.
    pub fn resolve(&self, name: &str, file: &str, line: usize) -> Result<ResolvedStyle> {
        self.apply_over(&self.base(), name, file, line)
    }

    /// Layer a class's declarations (and its parents', up to but not
    /// including `_base`) over an already-resolved level. Fields the
    /// chain does not declare keep the values in `base`.
    pub fn apply_over(
        &self,
        base: &ResolvedStyle,
        name: &str,
        file: &str,
        line: usize,
    ) -> Result<ResolvedStyle> {
        let chain = self.chain(name, file, line)?;
        let mut out = base.clone();
        for class in chain.iter().rev() {
            overlay(&mut out, class);
        }
        Ok(out)
    }
}

fn overlay(resolved: &mut ResolvedStyle, class: &StyleClass) {
    for &f in StyleField::ALL {
        let mut probe = TextStyle::default();
        probe.copy_field(&class.text, f);
        if !probe.same_formatting(&TextStyle::default()) {
            resolved.text.copy_field(&class.text, f);
        }
    }
    if class.align.is_some() {
        resolved.align = class.align;
    }
}

pub fn parse_styles(source: &str, file: &str) -> Result<StyleSheet> {
    let root = parse(source, file)?;
    if root.name != "styles" {
        return Err(XmlError::UnexpectedElement {
            file: file.to_string(),
            line: root.line,
            element: root.name.clone(),
        });
    }
    let mut sheet = StyleSheet::default();
    for el in root.child_elements() {
        if el.name != "style" {
            return Err(XmlError::UnexpectedElement {
                file: file.to_string(),
                line: el.line,
                element: el.name.clone(),
            });
        }
        sheet.push(parse_class(el, file)?);
    }
    Ok(sheet)
}

fn parse_class(el: &XmlElement, file: &str) -> Result<StyleClass> {
    let name = el.attr("class").unwrap_or_default().to_string();
    if name.is_empty() {
        return Err(XmlError::BadAttribute {
            file: file.to_string(),
            line: el.line,
            attribute: "class".to_string(),
            message: "style entry needs a class name".to_string(),
        });
    }
    let mut class = StyleClass {
        name,
        parent: el.attr("parent").map(str::to_string),
        ..StyleClass::default()
    };
    for (attr, value) in &el.attrs {
        match attr.as_str() {
            "class" | "parent" => {}
            "bold" => class.text.bold = Some(parse_flag(value, file, el.line, attr)?),
            "italic" => class.text.italic = Some(parse_flag(value, file, el.line, attr)?),
            "underline" => class.text.underline = Some(parse_flag(value, file, el.line, attr)?),
            "strike" => class.text.strikethrough = Some(parse_flag(value, file, el.line, attr)?),
            "font" => class.text.font_family = Some(value.clone()),
            "size" => {
                class.text.font_size_pt =
                    Some(value.parse::<f64>().map_err(|_| XmlError::BadAttribute {
                        file: file.to_string(),
                        line: el.line,
                        attribute: attr.clone(),
                        message: format!("{value:?} is not a number"),
                    })?);
            }
            "color" => class.text.foreground_color = Some(parse_color(value, file, el.line, attr)?),
            "background" => {
                class.text.background_color = Some(parse_color(value, file, el.line, attr)?);
            }
            "align" => class.align = Some(parse_align(value, file, el.line)?),
            other => {
                return Err(XmlError::BadAttribute {
                    file: file.to_string(),
                    line: el.line,
                    attribute: other.to_string(),
                    message: "unknown style attribute".to_string(),
                });
            }
        }
    }
    Ok(class)
}

pub(crate) fn parse_flag(value: &str, file: &str, line: usize, attr: &str) -> Result<bool> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(XmlError::BadAttribute {
            file: file.to_string(),
            line,
            attribute: attr.to_string(),
            message: format!("expected \"0\" or \"1\", found {value:?}"),
        }),
    }
}

pub(crate) fn parse_color(value: &str, file: &str, line: usize, attr: &str) -> Result<RgbColor> {
    RgbColor::from_hex(value).ok_or_else(|| XmlError::BadAttribute {
        file: file.to_string(),
        line,
        attribute: attr.to_string(),
        message: format!("expected #RRGGBB, found {value:?}"),
    })
}

pub(crate) fn parse_align(value: &str, file: &str, line: usize) -> Result<Alignment> {
    match value {
        "start" => Ok(Alignment::Start),
        "center" => Ok(Alignment::Center),
        "end" => Ok(Alignment::End),
        "justified" => Ok(Alignment::Justified),
        _ => Err(XmlError::BadAttribute {
            file: file.to_string(),
            line,
            attribute: "align".to_string(),
            message: format!("unknown alignment {value:?}"),
        }),
    }
}

pub(crate) fn align_name(align: Alignment) -> &'static str {
    match align {
        Alignment::Start => "start",
        Alignment::Center => "center",
        Alignment::End => "end",
        Alignment::Justified => "justified",
    }
}

/// Render a stylesheet back to `styles.xml`.
pub fn write_styles(sheet: &StyleSheet) -> String {
    let mut out = String::from("<styles>\n");
    for class in sheet.classes() {
        out.push_str(&format!("  <style class=\"{}\"", escape_attr(&class.name)));
        if let Some(parent) = &class.parent {
            out.push_str(&format!(" parent=\"{}\"", escape_attr(parent)));
        }
        out.push_str(&class_attrs(&class.text, class.align));
        out.push_str("/>\n");
    }
    out.push_str("</styles>\n");
    out
}

/// Attribute rendering shared with generated span classes.
pub(crate) fn class_attrs(text: &TextStyle, align: Option<Alignment>) -> String {
    let mut out = String::new();
    let flag = |v: bool| if v { "1" } else { "0" };
    if let Some(b) = text.bold {
        out.push_str(&format!(" bold=\"{}\"", flag(b)));
    }
    if let Some(i) = text.italic {
        out.push_str(&format!(" italic=\"{}\"", flag(i)));
    }
    if let Some(u) = text.underline {
        out.push_str(&format!(" underline=\"{}\"", flag(u)));
    }
    if let Some(s) = text.strikethrough {
        out.push_str(&format!(" strike=\"{}\"", flag(s)));
    }
    if let Some(font) = &text.font_family {
        out.push_str(&format!(" font=\"{}\"", escape_attr(font)));
    }
    if let Some(size) = text.font_size_pt {
        out.push_str(&format!(" size=\"{size}\""));
    }
    if let Some(color) = text.foreground_color {
        out.push_str(&format!(" color=\"{}\"", color.to_hex()));
    }
    if let Some(color) = text.background_color {
        out.push_str(&format!(" background=\"{}\"", color.to_hex()));
    }
    if let Some(align) = align {
        out.push_str(&format!(" align=\"{}\"", align_name(align)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_through_parent_chain() {
        let xml = r##"<styles>
  <style class="_base" font="Arial" size="11"/>
  <style class="warn" color="#FF8800" bold="1"/>
  <style class="loud" parent="warn" size="14"/>
</styles>"##;
        let sheet = parse_styles(xml, "styles.xml").unwrap();
        let loud = sheet.resolve("loud", "styles.xml", 0).unwrap();
        assert_eq!(loud.text.font_family.as_deref(), Some("Arial"));
        assert_eq!(loud.text.font_size_pt, Some(14.0));
        assert_eq!(loud.text.bold, Some(true));
        assert_eq!(
            loud.text.foreground_color,
            RgbColor::from_hex("#FF8800")
        );
    }

    #[test]
    fn unknown_class_is_an_error() {
        let sheet = parse_styles("<styles/>", "styles.xml").unwrap();
        assert!(matches!(
            sheet.resolve("nope", "styles.xml", 3),
            Err(XmlError::UnresolvedClass { line: 3, .. })
        ));
    }

    #[test]
    fn base_may_be_absent() {
        let sheet = parse_styles(
            "<styles><style class=\"warn\" bold=\"1\"/></styles>",
            "styles.xml",
        )
        .unwrap();
        let resolved = sheet.resolve("warn", "styles.xml", 0).unwrap();
        assert_eq!(resolved.text.bold, Some(true));
        assert_eq!(resolved.text.font_family, None);
    }

    #[test]
    fn styles_round_trip() {
        let xml = "<styles>\n  <style class=\"_base\" font=\"Arial\" size=\"11\"/>\n  <style class=\"warn\" bold=\"1\" color=\"#FF8800\"/>\n</styles>\n";
        let sheet = parse_styles(xml, "styles.xml").unwrap();
        assert_eq!(write_styles(&sheet), xml);
    }

    #[test]
    fn rejects_bad_flag() {
        assert!(parse_styles(
            "<styles><style class=\"x\" bold=\"yes\"/></styles>",
            "styles.xml"
        )
        .is_err());
    }
}

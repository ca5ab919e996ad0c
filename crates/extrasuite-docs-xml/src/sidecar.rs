//! JSON-in-XML sidecar files.
//!
//! Style tables the agent never edits structurally (document style,
//! named styles, objects, named ranges, comments) are carried as
//! escaped JSON inside a `<json>` root, written only when non-empty.

use crate::error::{Result, XmlError};
use crate::tree::{escape_text, parse};

pub fn write_sidecar(value: &serde_json::Value) -> String {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    format!("<json>{}</json>\n", escape_text(&json))
}

pub fn parse_sidecar(source: &str, file: &str) -> Result<serde_json::Value> {
    let root = parse(source, file)?;
    if root.name != "json" {
        return Err(XmlError::UnexpectedElement {
            file: file.to_string(),
            line: root.line,
            element: root.name.clone(),
        });
    }
    serde_json::from_str(&root.text()).map_err(|err| XmlError::BadSidecar {
        file: file.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_round_trip() {
        let value = serde_json::json!({"background": {"color": "#FFFFFF"}, "marginTop": 72});
        let xml = write_sidecar(&value);
        assert_eq!(parse_sidecar(&xml, "docstyle.xml").unwrap(), value);
    }

    #[test]
    fn escapes_angle_brackets() {
        let value = serde_json::json!({"note": "a < b > c & d"});
        let xml = write_sidecar(&value);
        assert!(!xml.contains("a < b"));
        assert_eq!(parse_sidecar(&xml, "f").unwrap(), value);
    }
}

//! Externally fed constants.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A feed is either an XML document
//!
//! ```xml
//! <constants>
//!   <constant><name>brand</name><value>#336699</value></constant>
//! </constants>
//! ```
//!
//! or a flat JSON object (`{"brand": "#336699"}`). The format is chosen by
//! file extension; anything other than `.json` is read as XML.

use std::path::Path;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid XML: {0}")]
    Xml(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{0}` must be a string, number or boolean")]
    UnsupportedValue(String),
}

/// Load a feed file into ordered `(name, value)` pairs.
pub fn load_feed(path: &Path) -> Result<IndexMap<String, String>, FeedError> {
    let text = std::fs::read_to_string(path).map_err(|source| FeedError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json_feed(&text)
    } else {
        parse_xml_feed(&text)
    }
}

/// Parse a flat JSON object of constants.
pub fn parse_json_feed(text: &str) -> Result<IndexMap<String, String>, FeedError> {
    let raw: IndexMap<String, serde_json::Value> = serde_json::from_str(text)?;
    raw.into_iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => return Err(FeedError::UnsupportedValue(name)),
            };
            Ok((name, value))
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Name,
    Value,
}

/// Parse an XML constants document.
///
/// `<constant>` entries missing a `<name>` are skipped; a missing `<value>`
/// is read as the empty string.
pub fn parse_xml_feed(text: &str) -> Result<IndexMap<String, String>, FeedError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut constants = IndexMap::new();
    let mut field = Field::None;
    let mut name = String::new();
    let mut value = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                field = match e.name().as_ref() {
                    b"name" => Field::Name,
                    b"value" => Field::Value,
                    b"constant" => {
                        name.clear();
                        value.clear();
                        Field::None
                    }
                    _ => Field::None,
                };
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| FeedError::Xml(err.to_string()))?;
                match field {
                    Field::Name => name.push_str(&text),
                    Field::Value => value.push_str(&text),
                    Field::None => {}
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e);
                match field {
                    Field::Name => name.push_str(&text),
                    Field::Value => value.push_str(&text),
                    Field::None => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"constant" && !name.trim().is_empty() {
                    constants.insert(name.trim().to_string(), value.trim().to_string());
                }
                field = Field::None;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FeedError::Xml(format!(
                    "{} at byte {}",
                    e,
                    reader.error_position()
                )));
            }
        }
    }

    Ok(constants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xml_feed() {
        let xml = r#"<?xml version="1.0"?>
<constants>
  <constant>
    <name>brand</name>
    <value>#336699</value>
  </constant>
  <constant><name>font</name><value><![CDATA["Helvetica" & co]]></value></constant>
  <constant><value>orphan</value></constant>
  <constant><name>empty</name></constant>
</constants>"#;
        let feed = parse_xml_feed(xml).unwrap();
        assert_eq!(feed.len(), 3);
        assert_eq!(feed["brand"], "#336699");
        assert_eq!(feed["font"], "\"Helvetica\" & co");
        assert_eq!(feed["empty"], "");
    }

    #[test]
    fn test_parse_xml_feed_escapes() {
        let xml = "<constants><constant><name>a</name><value>x &amp; y</value></constant></constants>";
        assert_eq!(parse_xml_feed(xml).unwrap()["a"], "x & y");
    }

    #[test]
    fn test_parse_xml_feed_malformed() {
        let err = parse_xml_feed("<constants><constant></constants>").unwrap_err();
        assert!(matches!(err, FeedError::Xml(_)));
    }

    #[test]
    fn test_parse_json_feed() {
        let feed = parse_json_feed(r#"{"brand": "red", "width": 960, "wide": true}"#).unwrap();
        assert_eq!(
            feed.into_iter().collect::<Vec<_>>(),
            vec![
                ("brand".to_string(), "red".to_string()),
                ("width".to_string(), "960".to_string()),
                ("wide".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_json_feed_rejects_nested() {
        let err = parse_json_feed(r#"{"a": {"b": 1}}"#).unwrap_err();
        assert!(matches!(err, FeedError::UnsupportedValue(name) if name == "a"));
    }

    #[test]
    fn test_load_feed_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("feed.json");
        std::fs::write(&json, r#"{"a": "1"}"#).unwrap();
        let xml = dir.path().join("feed.xml");
        std::fs::write(
            &xml,
            "<constants><constant><name>b</name><value>2</value></constant></constants>",
        )
        .unwrap();

        assert_eq!(load_feed(&json).unwrap()["a"], "1");
        assert_eq!(load_feed(&xml).unwrap()["b"], "2");
    }
}

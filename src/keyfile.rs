//! Settings document model and its INI-like text format
//!
//! A document is an ordered mapping of section names to ordered key/value
//! pairs. The on-disk form is `[Section]` headers followed by `key=value`
//! lines; blank lines and `#` comments are skipped when parsing.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Characters skipped around keys and before values
const BLANKS: [char; 2] = [' ', '\t'];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyFileError {
    /// Parse failure with the 1-based line it occurred on
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("invalid section name '{0}'")]
    InvalidSection(String),

    #[error("invalid key name '{0}'")]
    InvalidKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

/// Ordered section -> key -> value document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section names in document order
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    /// Keys of `section` in document order
    pub fn keys<'a>(&'a self, section: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.section(section)
            .into_iter()
            .flat_map(|s| s.entries.iter().map(|(k, _)| k.as_str()))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, creating the section when needed. An existing key keeps
    /// its position.
    ///
    /// Names the text form cannot carry are rejected, so every document
    /// reads back unchanged after `to_data`.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) -> Result<(), KeyFileError> {
        if !is_section_name(section) {
            return Err(KeyFileError::InvalidSection(section.to_string()));
        }
        if !is_key_name(key) {
            return Err(KeyFileError::InvalidKey(key.to_string()));
        }

        let value = value.into();
        let section = self.section_mut_or_insert(section);
        match section.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => section.entries.push((key.to_string(), value)),
        }
        Ok(())
    }

    pub fn remove_key(&mut self, section: &str, key: &str) -> Option<String> {
        let section = self.sections.iter_mut().find(|s| s.name == section)?;
        let pos = section.entries.iter().position(|(k, _)| k == key)?;
        Some(section.entries.remove(pos).1)
    }

    pub fn remove_section(&mut self, section: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.name != section);
        self.sections.len() != before
    }

    /// Parse the text form. Repeated sections are merged and a repeated
    /// key keeps the last value.
    pub fn parse(text: &str) -> Result<Self, KeyFileError> {
        let mut document = Document::new();
        let mut current: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw).trim_start_matches(BLANKS);

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .trim_end_matches(BLANKS)
                    .strip_suffix(']')
                    .ok_or_else(|| syntax(line_no, format!("unterminated section header '{}'", line)))?;
                if !is_section_name(name) {
                    return Err(syntax(line_no, format!("invalid section name '{}'", name)));
                }
                document.section_mut_or_insert(name);
                current = Some(name.to_string());
                continue;
            }

            let section = current
                .as_deref()
                .ok_or_else(|| syntax(line_no, "key outside of any section".to_string()))?;

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| syntax(line_no, format!("expected key=value, found '{}'", line)))?;

            let key = key.trim_matches(BLANKS);
            document
                .set(section, key, unescape(value.trim_start_matches(BLANKS)))
                .map_err(|e| syntax(line_no, e.to_string()))?;
        }

        Ok(document)
    }

    /// Serialize to the text form
    pub fn to_data(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (key, value) in &section.entries {
                out.push_str(key);
                out.push('=');
                out.push_str(&escape(value));
                out.push('\n');
            }
        }
        out
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn section_mut_or_insert(&mut self, name: &str) -> &mut Section {
        let pos = match self.sections.iter().position(|s| s.name == name) {
            Some(pos) => pos,
            None => {
                self.sections.push(Section {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        &mut self.sections[pos]
    }
}

struct Entries<'a>(&'a [(String, String)]);

impl Serialize for Entries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(&section.name, &Entries(&section.entries))?;
        }
        map.end()
    }
}

fn syntax(line: usize, message: String) -> KeyFileError {
    KeyFileError::Syntax { line, message }
}

/// Section names go between brackets on a line of their own
fn is_section_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c == '[' || c == ']' || c.is_control())
}

/// Keys sit left of the first `=` and must not look like a comment or header
fn is_key_name(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with(['#', '['])
        && !key.starts_with(BLANKS)
        && !key.ends_with(BLANKS)
        && !key.chars().any(|c| c == '=' || c.is_control())
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            ' ' if i == 0 => out.push_str("\\s"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.set("wifi_abc_managed_psk", "Name", "Home Network").unwrap();
        doc.set("wifi_abc_managed_psk", "AutoConnect", "true").unwrap();
        doc.set("wifi_abc_managed_psk", "Passphrase", "s3cr=t").unwrap();
        doc.set("global", "OfflineMode", "false").unwrap();
        doc
    }

    #[test]
    fn test_parse_basic() {
        let text = "[global]\nOfflineMode=false\n\n# comment\n[wifi]\nName = Home\n";
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.sections().collect::<Vec<_>>(), vec!["global", "wifi"]);
        assert_eq!(doc.get("global", "OfflineMode"), Some("false"));
        assert_eq!(doc.get("wifi", "Name"), Some("Home"));
        assert_eq!(doc.get("wifi", "Missing"), None);
    }

    #[test]
    fn test_save_then_parse_preserves_order_and_values() {
        let doc = sample();
        let parsed = Document::parse(&doc.to_data()).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(
            parsed.keys("wifi_abc_managed_psk").collect::<Vec<_>>(),
            vec!["Name", "AutoConnect", "Passphrase"]
        );
    }

    #[test]
    fn test_special_characters_survive() {
        let mut doc = Document::new();
        doc.set("s", "multi", "line one\nline two").unwrap();
        doc.set("s", "leading", "  padded").unwrap();
        doc.set("s", "backslash", "C:\\path\\n").unwrap();
        doc.set("s", "tab", "a\tb").unwrap();
        let parsed = Document::parse(&doc.to_data()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_set_existing_key_keeps_position() {
        let mut doc = sample();
        doc.set("wifi_abc_managed_psk", "Name", "Office").unwrap();
        assert_eq!(doc.keys("wifi_abc_managed_psk").next(), Some("Name"));
        assert_eq!(doc.get("wifi_abc_managed_psk", "Name"), Some("Office"));
    }

    #[test]
    fn test_duplicate_sections_merge() {
        let doc = Document::parse("[a]\nx=1\n[b]\ny=2\n[a]\nx=3\nz=4\n").unwrap();
        assert_eq!(doc.sections().count(), 2);
        assert_eq!(doc.get("a", "x"), Some("3"));
        assert_eq!(doc.get("a", "z"), Some("4"));
    }

    #[test]
    fn test_remove() {
        let mut doc = sample();
        assert_eq!(doc.remove_key("global", "OfflineMode"), Some("false".to_string()));
        assert_eq!(doc.remove_key("global", "OfflineMode"), None);
        assert!(doc.remove_section("global"));
        assert!(!doc.has_section("global"));
        assert!(!doc.remove_section("global"));
    }

    #[test]
    fn test_parse_errors() {
        let err = Document::parse("Key=value\n").unwrap_err();
        assert!(matches!(err, KeyFileError::Syntax { line: 1, .. }));

        let err = Document::parse("[ok]\na=1\n[broken\n").unwrap_err();
        assert!(matches!(err, KeyFileError::Syntax { line: 3, .. }));

        let err = Document::parse("[ok]\njust text\n").unwrap_err();
        assert!(matches!(err, KeyFileError::Syntax { line: 2, .. }));

        let err = Document::parse("[ok]\n = value\n").unwrap_err();
        assert!(matches!(err, KeyFileError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_crlf_and_empty_input() {
        let doc = Document::parse("[a]\r\nk=v\r\n").unwrap();
        assert_eq!(doc.get("a", "k"), Some("v"));
        assert!(Document::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_json_serialization_keeps_sections() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["global"]["OfflineMode"], "false");
        assert_eq!(json["wifi_abc_managed_psk"]["AutoConnect"], "true");
    }

    #[test]
    fn test_leading_unicode_whitespace_survives() {
        let mut doc = Document::new();
        doc.set("s", "nbsp", "\u{a0}x").unwrap();
        doc.set("s", "ideographic", "\u{3000}y").unwrap();
        doc.set("s", "form_feed", "\u{c}z").unwrap();
        doc.set("s", "tab_then_space", "\t x").unwrap();

        let parsed = Document::parse(&doc.to_data()).unwrap();
        assert_eq!(parsed.get("s", "nbsp"), Some("\u{a0}x"));
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_unrepresentable_key_names_are_rejected() {
        let mut doc = Document::new();
        for key in ["", "#Key", "[Key", "a=b", " padded", "padded\t", "two\nlines"] {
            assert_eq!(
                doc.set("s", key, "v"),
                Err(KeyFileError::InvalidKey(key.to_string())),
                "{:?}",
                key
            );
        }
        assert!(doc.is_empty());
    }

    #[test]
    fn test_unrepresentable_section_names_are_rejected() {
        let mut doc = Document::new();
        for section in ["", "a]b", "[a", "two\nlines"] {
            assert_eq!(
                doc.set(section, "k", "v"),
                Err(KeyFileError::InvalidSection(section.to_string())),
                "{:?}",
                section
            );
        }
        assert!(doc.is_empty());
    }

    #[test]
    fn test_accepted_names_round_trip() {
        let mut doc = Document::new();
        doc.set("provider vpn #1", "IPv4.method", "dhcp").unwrap();
        doc.set("s", "Key#with[brackets]", "v").unwrap();
        doc.set("s", "Name\u{a0}", "trailing nbsp in key").unwrap();

        let parsed = Document::parse(&doc.to_data()).unwrap();
        assert_eq!(parsed, doc);
    }
}

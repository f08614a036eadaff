//! Roh-Attribute und Tags, wie sie in der OSM-Datei stehen.
//!
//! Werte werden im escapten Rohformat gespeichert, damit unbekannte Attribute
//! beim Zurückschreiben Byte für Byte erhalten bleiben.

use quick_xml::escape::{escape, unescape};

/// Geordnete Attributliste eines Elements (Schlüssel, escapter Rohwert).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Erstellt eine leere Attributliste
    pub fn new() -> Self {
        Self::default()
    }

    /// Hängt ein Attribut mit bereits escaptem Rohwert an (Parser-Pfad).
    pub fn push_raw(&mut self, key: impl Into<String>, raw_value: impl Into<String>) {
        self.entries.push((key.into(), raw_value.into()));
    }

    /// Escapter Rohwert eines Attributs
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Unescapter Wert eines Attributs
    pub fn get(&self, key: &str) -> Option<String> {
        let raw = self.get_raw(key)?;
        Some(
            unescape(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string()),
        )
    }

    /// Setzt einen Wert (wird escaped). Bestehende Attribute behalten ihre Position.
    pub fn set(&mut self, key: &str, value: &str) {
        let escaped = escape(value).into_owned();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = escaped;
        } else {
            self.entries.push((key.to_string(), escaped));
        }
    }

    /// Iterator über (Schlüssel, Rohwert) in Original-Reihenfolge.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ein `<tag k=".." v=".."/>`-Kindelement (Rohwerte).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Schlüssel (escaped)
    pub key: String,
    /// Wert (escaped)
    pub value: String,
}

impl Tag {
    /// Erstellt einen Tag aus unescapten Werten
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: escape(key).into_owned(),
            value: escape(value).into_owned(),
        }
    }

    /// Erstellt einen Tag aus bereits escapten Rohwerten (Parser-Pfad)
    pub fn from_raw(key: String, value: String) -> Self {
        Self { key, value }
    }

    /// Vergleicht Schlüssel und Wert gegen unescapte Angaben.
    pub fn matches(&self, key: &str, value: &str) -> bool {
        self.key == escape(key) && self.value == escape(value)
    }
}

/// Sucht den Wert eines Tags (unescaped).
pub fn tag_value(tags: &[Tag], key: &str) -> Option<String> {
    let escaped_key = escape(key);
    tags.iter().find(|t| t.key == escaped_key).map(|t| {
        unescape(&t.value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| t.value.clone())
    })
}

/// Setzt einen Tag-Wert; fehlt der Tag, wird er angehängt.
pub fn set_tag(tags: &mut Vec<Tag>, key: &str, value: &str) {
    let replacement = Tag::new(key, value);
    if let Some(tag) = tags.iter_mut().find(|t| t.key == replacement.key) {
        tag.value = replacement.value;
    } else {
        tags.push(replacement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_position_and_escapes() {
        let mut attrs = Attributes::new();
        attrs.push_raw("id", "1");
        attrs.push_raw("action", "modify");
        attrs.set("id", "10099");
        attrs.set("note", "a<b");

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["id", "action", "note"]);
        assert_eq!(attrs.get_raw("id"), Some("10099"));
        assert_eq!(attrs.get_raw("note"), Some("a&lt;b"));
        assert_eq!(attrs.get("note").as_deref(), Some("a<b"));
    }

    #[test]
    fn test_set_tag_replaces_or_appends() {
        let mut tags = vec![Tag::new("type", "line_thin"), Tag::new("subtype", "solid")];
        set_tag(&mut tags, "subtype", "dashed");
        set_tag(&mut tags, "color", "white");

        assert_eq!(tag_value(&tags, "subtype").as_deref(), Some("dashed"));
        assert_eq!(tags.len(), 3);
        assert!(tags[2].matches("color", "white"));
    }
}

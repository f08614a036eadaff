//! Dokument-Metadaten: geodätische Referenz, Root-Attribute und unbekannte Elemente.

use super::Attributes;
use regex::Regex;
use std::sync::OnceLock;

fn lat_0_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\+lat_0=(\S+)").expect("gueltiges Regex"))
}

fn lon_0_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\+lon_0=(\S+)").expect("gueltiges Regex"))
}

/// Inhalt von `<geoReference>` (PROJ-String) mit extrahiertem Ursprung.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    /// Rohtext zwischen den Tags (escaped)
    pub raw: String,
}

impl GeoReference {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Ursprungs-Breitengrad `+lat_0`
    pub fn lat_0(&self) -> Option<f64> {
        Self::capture(lat_0_pattern(), &self.raw)
    }

    /// Ursprungs-Längengrad `+lon_0`
    pub fn lon_0(&self) -> Option<f64> {
        Self::capture(lon_0_pattern(), &self.raw)
    }

    fn capture(pattern: &Regex, text: &str) -> Option<f64> {
        pattern.captures(text)?.get(1)?.as_str().parse().ok()
    }

    /// Verschiebt den Ursprung; fehlende Parameter bleiben unverändert.
    ///
    /// Gibt `true` zurück, wenn mindestens ein Parameter angepasst wurde.
    pub fn shift(&mut self, d_lat: f64, d_lon: f64) -> bool {
        let mut changed = false;
        if let Some(lat) = self.lat_0() {
            self.raw = replace_value(lat_0_pattern(), &self.raw, lat + d_lat);
            changed = true;
        }
        if let Some(lon) = self.lon_0() {
            self.raw = replace_value(lon_0_pattern(), &self.raw, lon + d_lon);
            changed = true;
        }
        changed
    }
}

fn replace_value(pattern: &Regex, text: &str, value: f64) -> String {
    let Some(group) = pattern.captures(text).and_then(|c| c.get(1)) else {
        return text.to_string();
    };
    let mut result = String::with_capacity(text.len() + 8);
    result.push_str(&text[..group.start()]);
    result.push_str(&value.to_string());
    result.push_str(&text[group.end()..]);
    result
}

/// Position eines Top-Level-Elements vor den Karten-Elementen.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentItem {
    /// Platzhalter für `<geoReference>` (Inhalt liegt in `LaneletMap::geo_reference`)
    GeoReference,
    /// Unbekanntes Element, roh übernommen
    Raw(String),
}

/// Alles aus der Datei, was nicht Punkt, Way oder Relation ist.
#[derive(Debug, Clone, Default)]
pub struct MapMeta {
    /// Attribute des `<osm>`-Root-Elements
    pub root_attributes: Attributes,
    /// Top-Level-Elemente vor dem ersten Punkt/Way/Relation (in Original-Reihenfolge)
    pub leading: Vec<DocumentItem>,
    /// Unbekannte Top-Level-Elemente nach den Karten-Elementen
    pub trailing: Vec<String>,
}

//! Ein Kartenpunkt (`<node>`) mit geodätischer Position.

use super::{Attributes, Tag};

/// Einzelner Punkt der Karte
#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    /// Eindeutige ID
    pub id: u64,
    /// Breitengrad in Grad
    pub lat: f64,
    /// Längengrad in Grad
    pub lon: f64,
    /// Alle Attribute in Original-Reihenfolge (inkl. id/lat/lon als Rohtext)
    pub attributes: Attributes,
    /// Optionale `<tag>`-Kindelemente
    pub tags: Vec<Tag>,
}

impl MapPoint {
    /// Erstellt einen neuen Punkt mit Standard-Attributen
    pub fn new(id: u64, lat: f64, lon: f64) -> Self {
        let mut attributes = Attributes::new();
        attributes.push_raw("id", id.to_string());
        attributes.push_raw("lat", lat.to_string());
        attributes.push_raw("lon", lon.to_string());
        Self {
            id,
            lat,
            lon,
            attributes,
            tags: Vec::new(),
        }
    }

    /// Schlüssel für exakten Koordinatenvergleich
    pub fn coordinate_key(&self) -> CoordinateKey {
        CoordinateKey::new(self.lat, self.lon)
    }
}

/// Hashbarer Schlüssel für exakt gleiche Koordinaten (Bit-Vergleich, -0.0 == 0.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lat_bits: u64,
    lon_bits: u64,
}

impl CoordinateKey {
    pub fn new(lat: f64, lon: f64) -> Self {
        // +0.0 addiert normalisiert -0.0 auf 0.0
        Self {
            lat_bits: (lat + 0.0).to_bits(),
            lon_bits: (lon + 0.0).to_bits(),
        }
    }
}

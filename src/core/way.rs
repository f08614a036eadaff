//! Ein Way (`<way>`): geordnete Punktfolge, deren Richtung Bedeutung trägt.

use super::{Attributes, Tag};

/// Linienzug aus Punkt-Referenzen
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// Eindeutige ID
    pub id: u64,
    /// Punkt-IDs in Fahrtrichtung (erster/letzter = Endpunkte)
    pub points: Vec<u64>,
    /// Alle Attribute in Original-Reihenfolge
    pub attributes: Attributes,
    /// `<tag>`-Kindelemente
    pub tags: Vec<Tag>,
    /// Anzahl Tags, die in der Datei vor den `<nd>`-Referenzen standen
    pub tags_before_points: usize,
}

impl Way {
    /// Erstellt einen neuen Way ohne Tags
    pub fn new(id: u64, points: Vec<u64>) -> Self {
        let mut attributes = Attributes::new();
        attributes.push_raw("id", id.to_string());
        Self {
            id,
            points,
            attributes,
            tags: Vec::new(),
            tags_before_points: 0,
        }
    }

    /// Kopie mit neuer ID und neuer Punktfolge; Attribute und Tags bleiben erhalten.
    pub fn derive(&self, id: u64, points: Vec<u64>) -> Self {
        let mut attributes = self.attributes.clone();
        attributes.set("id", &id.to_string());
        Self {
            id,
            points,
            attributes,
            tags: self.tags.clone(),
            tags_before_points: self.tags_before_points,
        }
    }

    /// Start- und Endpunkt, sofern der Way mindestens 2 Punkte hat
    pub fn endpoints(&self) -> Option<(u64, u64)> {
        if self.points.len() < 2 {
            return None;
        }
        Some((self.points[0], self.points[self.points.len() - 1]))
    }

    /// Die zwei Punkte um die Mitte (Index `(n-1)/2` und `(n-1)/2 + 1`)
    pub fn midpoint_pair(&self) -> Option<(u64, u64)> {
        if self.points.len() < 2 {
            return None;
        }
        let first = (self.points.len() - 1) / 2;
        Some((self.points[first], self.points[first + 1]))
    }

    /// Dreht die Punktreihenfolge um (ID bleibt gleich)
    pub fn reverse(&mut self) {
        self.points.reverse();
    }
}

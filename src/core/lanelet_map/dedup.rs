//! Duplikat-Erkennung und -Bereinigung für Punkte (gleiche Koordinate)
//! und Ways (gleiche Endpunkte).

use super::LaneletMap;
use crate::core::error::{malformed, not_found};
use crate::core::{CoordinateKey, EntityKind, MapError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

impl LaneletMap {
    /// Zählt duplizierte Punkte (exakt gleiche Koordinate) ohne sie zu entfernen.
    ///
    /// Gibt die Anzahl der Duplikat-Punkte und der betroffenen Positionen zurück.
    pub fn count_duplicate_points(&self) -> (u32, u32) {
        let mut dup_points = 0u32;
        let mut dup_groups = 0u32;
        for ids in self.index.points_by_coordinate.values() {
            if ids.len() > 1 {
                dup_points += ids.len() as u32 - 1;
                dup_groups += 1;
            }
        }
        (dup_points, dup_groups)
    }

    /// Erkennt und entfernt duplizierte Punkte.
    ///
    /// 1. Gruppiert Punkte nach exakter Koordinate in Einlese-Reihenfolge
    /// 2. Behält pro Gruppe den zuerst eingelesenen Punkt (= Original)
    /// 3. Leitet alle Referenzen der Duplikate auf die kanonische ID um
    /// 4. Löscht die Duplikate
    pub fn deduplicate_points(&mut self) -> DeduplicationResult {
        let mut canonical_by_key: HashMap<CoordinateKey, u64> = HashMap::new();
        let mut remap: Vec<(u64, u64)> = Vec::new();
        let mut groups: HashSet<u64> = HashSet::new();

        for point in self.points.values() {
            match canonical_by_key.get(&point.coordinate_key()) {
                Some(&canonical) => {
                    groups.insert(canonical);
                    remap.push((point.id, canonical));
                }
                None => {
                    canonical_by_key.insert(point.coordinate_key(), point.id);
                }
            }
        }

        let mut result = DeduplicationResult {
            duplicate_groups: groups.len() as u32,
            ..DeduplicationResult::default()
        };

        // Erst alle Referenzen umleiten, dann in einem Durchlauf löschen
        let mut merged = Vec::with_capacity(remap.len());
        for (duplicate, canonical) in remap {
            match self.rewrite_reference(EntityKind::Point, duplicate, canonical) {
                Ok(rewritten) => {
                    result.rewritten_references += rewritten as u32;
                    merged.push(duplicate);
                }
                Err(err) => {
                    log::warn!("Punkt {} nicht zusammengeführt: {}", duplicate, err);
                    result.skipped.push(err);
                }
            }
        }

        let (removed, failures) = self.remove_points_in_bulk(&merged);
        result.removed = removed as u32;
        for err in failures {
            log::warn!("Doppelter Punkt nicht gelöscht: {}", err);
            result.skipped.push(err);
        }

        log::info!(
            "{} doppelte Punkte in {} Gruppen entfernt, {} Referenzen umgeleitet",
            result.removed,
            result.duplicate_groups,
            result.rewritten_references
        );
        result
    }

    /// Erkennt und entfernt Ways mit identischem Start- und Endpunkt.
    ///
    /// Der Innenverlauf wird nicht verglichen. Der zuerst eingelesene Way bleibt,
    /// Relationen der Duplikate werden auf ihn umgeleitet.
    pub fn deduplicate_ways(&mut self) -> WayDeduplicationResult {
        let mut canonical_by_endpoints: HashMap<(u64, u64), u64> = HashMap::new();
        let mut remap: Vec<(u64, u64)> = Vec::new();
        let mut groups: HashSet<u64> = HashSet::new();
        let mut result = WayDeduplicationResult::default();

        for way in self.ways.values() {
            let Some(endpoints) = way.endpoints() else {
                result.skipped.push(malformed(
                    EntityKind::Way,
                    way.id,
                    "weniger als 2 Punkte, Endpunkte unbestimmt",
                ));
                continue;
            };
            // Schneller Ausschluss über den Endpunkt-Index
            if self
                .index
                .ways_by_endpoints
                .get(&endpoints)
                .map_or(true, |ids| ids.len() < 2)
            {
                continue;
            }
            match canonical_by_endpoints.get(&endpoints) {
                Some(&canonical) => {
                    groups.insert(canonical);
                    remap.push((way.id, canonical));
                }
                None => {
                    canonical_by_endpoints.insert(endpoints, way.id);
                }
            }
        }

        result.duplicate_groups = groups.len() as u32;

        let mut merged = Vec::with_capacity(remap.len());
        for (duplicate, canonical) in remap {
            match self.rewrite_reference(EntityKind::Way, duplicate, canonical) {
                Ok(rewritten) => {
                    result.rewritten_references += rewritten as u32;
                    merged.push(duplicate);
                }
                Err(err) => {
                    log::warn!("Way {} nicht zusammengeführt: {}", duplicate, err);
                    result.skipped.push(err);
                }
            }
        }

        let (removed, failures) = self.remove_ways_in_bulk(&merged);
        result.removed = removed as u32;
        for err in failures {
            log::warn!("Doppelter Way nicht gelöscht: {}", err);
            result.skipped.push(err);
        }

        log::info!(
            "{} doppelte Ways in {} Gruppen entfernt, {} Relation-Referenzen umgeleitet",
            result.removed,
            result.duplicate_groups,
            result.rewritten_references
        );
        result
    }

    /// Leitet alle Referenzen von `remove` auf `keep` um und löscht `remove`.
    ///
    /// Gibt die Anzahl umgeschriebener Referenzen zurück.
    pub fn merge_point(&mut self, keep: u64, remove: u64) -> Result<usize, MapError> {
        if !self.points.contains_key(&remove) {
            return Err(not_found(EntityKind::Point, remove));
        }
        if keep == remove {
            return Err(malformed(
                EntityKind::Point,
                remove,
                "kann nicht mit sich selbst zusammengeführt werden",
            ));
        }
        let rewritten = self.rewrite_reference(EntityKind::Point, remove, keep)?;
        self.remove_point(remove)?;
        Ok(rewritten)
    }
}

/// Ergebnis einer Punkt-Duplikat-Bereinigung.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeduplicationResult {
    /// Anzahl entfernter Duplikat-Punkte
    pub removed: u32,
    /// Anzahl umgeschriebener Referenzen (Way-Punktlisten und `node`-Member)
    pub rewritten_references: u32,
    /// Anzahl der Koordinaten-Gruppen mit Duplikaten
    pub duplicate_groups: u32,
    /// Nicht zusammengeführte Punkte
    pub skipped: Vec<MapError>,
}

impl DeduplicationResult {
    /// Prüft ob Duplikate gefunden und bereinigt wurden.
    pub fn had_duplicates(&self) -> bool {
        self.removed > 0
    }
}

/// Ergebnis einer Way-Duplikat-Bereinigung.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WayDeduplicationResult {
    /// Anzahl entfernter Duplikat-Ways
    pub removed: u32,
    /// Anzahl umgeschriebener `way`-Member
    pub rewritten_references: u32,
    /// Anzahl der Endpunkt-Gruppen mit Duplikaten
    pub duplicate_groups: u32,
    /// Übersprungene Ways (z.B. ohne bestimmbare Endpunkte)
    pub skipped: Vec<MapError>,
}

impl WayDeduplicationResult {
    /// Prüft ob Duplikate gefunden und bereinigt wurden.
    pub fn had_duplicates(&self) -> bool {
        self.removed > 0
    }
}

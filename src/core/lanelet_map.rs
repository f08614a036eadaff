//! Die zentrale LaneletMap-Datenstruktur mit Punkten, Ways, Relationen und Indizes.

use super::error::{not_found, malformed};
use super::{
    BoundarySide, EntityKind, GeoReference, MapError, MapMeta, MapPoint, Member, Relation, Tag,
    Way,
};
use indexmap::IndexMap;
use std::collections::HashSet;

mod dedup;
mod index;
mod lanelet_ops;
mod offset;
mod orphans;
mod split;
mod topology;

pub use dedup::{DeduplicationResult, WayDeduplicationResult};
pub use lanelet_ops::LaneletRemoval;
pub use offset::OffsetResult;
pub use split::{LaneletLength, SplitBatchResult, SplitResult, SplitSettings};
pub use topology::{DoubledBoundaryRecord, DoubledBoundaryReport, DoubledBoundaryResolution};

use index::ReferenceIndex;

/// Vollständige Lanelet2-Karte
///
/// Die Sammlungen behalten die Reihenfolge, in der die Elemente eingelesen
/// bzw. eingefügt wurden. Alle Mutationen laufen über Methoden, damit die
/// Rückwärts-Indizes konsistent bleiben.
#[derive(Debug, Clone, Default)]
pub struct LaneletMap {
    points: IndexMap<u64, MapPoint>,
    ways: IndexMap<u64, Way>,
    relations: IndexMap<u64, Relation>,
    /// Geodätische Referenz (`<geoReference>`), falls vorhanden
    pub geo_reference: Option<GeoReference>,
    /// Root-Attribute und unbekannte Top-Level-Elemente
    pub meta: MapMeta,
    index: ReferenceIndex,
    /// Höchste bisher gesehene ID (alle Elementarten)
    max_id: u64,
}

impl LaneletMap {
    /// Erstellt eine neue leere Karte
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lesezugriff ─────────────────────────────────────────────────

    pub fn point(&self, id: u64) -> Option<&MapPoint> {
        self.points.get(&id)
    }

    pub fn way(&self, id: u64) -> Option<&Way> {
        self.ways.get(&id)
    }

    pub fn relation(&self, id: u64) -> Option<&Relation> {
        self.relations.get(&id)
    }

    /// Alle Punkte in Einlese-Reihenfolge
    pub fn points(&self) -> impl Iterator<Item = &MapPoint> {
        self.points.values()
    }

    /// Alle Ways in Einlese-Reihenfolge
    pub fn ways(&self) -> impl Iterator<Item = &Way> {
        self.ways.values()
    }

    /// Alle Relationen in Einlese-Reihenfolge
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Alle Lanelets als (id, linker Rand, rechter Rand)
    pub fn lanelets(&self) -> impl Iterator<Item = (u64, u64, u64)> + '_ {
        self.relations
            .values()
            .filter_map(|r| r.boundaries().map(|(left, right)| (r.id, left, right)))
    }

    /// Prüft ob ein Element der angegebenen Art existiert
    pub fn contains(&self, kind: EntityKind, id: u64) -> bool {
        match kind {
            EntityKind::Point => self.points.contains_key(&id),
            EntityKind::Way => self.ways.contains_key(&id),
            EntityKind::Relation => self.relations.contains_key(&id),
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Anzahl der Lanelet-Relationen
    pub fn lanelet_count(&self) -> usize {
        self.relations.values().filter(|r| r.is_lanelet()).count()
    }

    /// Ways, die den Punkt referenzieren
    pub fn ways_using_point(&self, point_id: u64) -> Vec<u64> {
        self.index
            .point_refs
            .get(&point_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Relationen, die das Element als Member führen
    pub fn relations_referencing(&self, kind: EntityKind, id: u64) -> Vec<u64> {
        self.index
            .member_refs(kind, id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Lanelets, die den Way als Rand verwenden (mit Seite), in Einlese-Reihenfolge
    pub fn lanelets_using_way(&self, way_id: u64) -> Vec<(u64, BoundarySide)> {
        let mut result: Vec<(u64, BoundarySide)> = self
            .relations_referencing(EntityKind::Way, way_id)
            .into_iter()
            .filter_map(|rel_id| {
                let relation = self.relations.get(&rel_id)?;
                relation.boundaries()?;
                Some((rel_id, relation.side_of(way_id)?))
            })
            .collect();
        result.sort_by_key(|(rel_id, _)| self.relations.get_index_of(rel_id));
        result
    }

    /// Anzahl der Elemente, die noch auf das Element verweisen
    pub fn referrer_count(&self, kind: EntityKind, id: u64) -> usize {
        self.index.referrer_count(kind, id)
    }

    /// Breitengrad für die lokale Projektion: `lat_0` der GeoReference, sonst `fallback`.
    pub fn reference_latitude(&self, fallback: f64) -> f64 {
        self.geo_reference
            .as_ref()
            .and_then(GeoReference::lat_0)
            .unwrap_or(fallback)
    }

    // ── IDs ─────────────────────────────────────────────────────────

    /// Größte ID der Karte (inkl. IDs übersprungener Datensätze und Member-Referenzen)
    pub fn max_id(&self) -> u64 {
        self.max_id
    }

    /// Meldet eine ID an, damit neue Elemente sie nie wiederverwenden.
    pub fn reserve_id(&mut self, id: u64) {
        self.max_id = self.max_id.max(id);
    }

    /// Vergibt die nächste freie ID (streng größer als alle bisherigen)
    pub fn allocate_id(&mut self) -> u64 {
        self.max_id += 1;
        self.max_id
    }

    // ── Einfügen ────────────────────────────────────────────────────

    /// Fügt einen Punkt hinzu
    pub fn insert_point(&mut self, point: MapPoint) -> Result<(), MapError> {
        if self.points.contains_key(&point.id) {
            return Err(malformed(EntityKind::Point, point.id, "ID bereits vergeben"));
        }
        self.reserve_id(point.id);
        self.index.add_point(&point);
        self.points.insert(point.id, point);
        Ok(())
    }

    /// Fügt einen Way hinzu; alle Punkte müssen existieren.
    pub fn insert_way(&mut self, way: Way) -> Result<(), MapError> {
        if self.ways.contains_key(&way.id) {
            return Err(malformed(EntityKind::Way, way.id, "ID bereits vergeben"));
        }
        self.validate_way_points(way.id, &way.points)?;
        self.reserve_id(way.id);
        self.index.add_way(&way);
        self.ways.insert(way.id, way);
        Ok(())
    }

    /// Fügt eine Relation hinzu; alle Member müssen existieren.
    pub fn insert_relation(&mut self, relation: Relation) -> Result<(), MapError> {
        if self.relations.contains_key(&relation.id) {
            return Err(malformed(
                EntityKind::Relation,
                relation.id,
                "ID bereits vergeben",
            ));
        }
        self.validate_members(relation.id, &relation.members)?;
        self.reserve_id(relation.id);
        self.index.add_relation(&relation);
        self.relations.insert(relation.id, relation);
        Ok(())
    }

    /// Fügt eine Relation ein, deren Member der Aufrufer bereits aufgelöst hat
    /// (Vorwärtsreferenzen zwischen Relationen beim Einlesen).
    pub(crate) fn insert_relation_resolved(&mut self, relation: Relation) -> Result<(), MapError> {
        if self.relations.contains_key(&relation.id) {
            return Err(malformed(
                EntityKind::Relation,
                relation.id,
                "ID bereits vergeben",
            ));
        }
        self.reserve_id(relation.id);
        self.index.add_relation(&relation);
        self.relations.insert(relation.id, relation);
        Ok(())
    }

    fn validate_way_points(&self, way_id: u64, points: &[u64]) -> Result<(), MapError> {
        if points.len() < 2 {
            return Err(malformed(
                EntityKind::Way,
                way_id,
                format!("nur {} Punkt(e), mindestens 2 erforderlich", points.len()),
            ));
        }
        match points.iter().find(|id| !self.points.contains_key(*id)) {
            Some(&missing) => Err(not_found(EntityKind::Point, missing)),
            None => Ok(()),
        }
    }

    fn validate_members(&self, relation_id: u64, members: &[Member]) -> Result<(), MapError> {
        let missing = members.iter().find(|m| {
            let self_reference = m.kind == EntityKind::Relation && m.id == relation_id;
            !self_reference && !self.contains(m.kind, m.id)
        });
        match missing {
            Some(member) => Err(not_found(member.kind, member.id)),
            None => Ok(()),
        }
    }

    // ── Entfernen ───────────────────────────────────────────────────

    /// Entfernt einen Punkt, der von nichts mehr referenziert wird.
    pub fn remove_point(&mut self, id: u64) -> Result<MapPoint, MapError> {
        self.ensure_unreferenced(EntityKind::Point, id)?;
        let point = self
            .points
            .shift_remove(&id)
            .ok_or_else(|| not_found(EntityKind::Point, id))?;
        self.index.remove_point(&point);
        Ok(point)
    }

    /// Entfernt einen Way, der von keiner Relation mehr referenziert wird.
    pub fn remove_way(&mut self, id: u64) -> Result<Way, MapError> {
        self.ensure_unreferenced(EntityKind::Way, id)?;
        let way = self
            .ways
            .shift_remove(&id)
            .ok_or_else(|| not_found(EntityKind::Way, id))?;
        self.index.remove_way(&way);
        Ok(way)
    }

    /// Entfernt eine Relation, die von keiner anderen Relation mehr referenziert wird.
    pub fn remove_relation(&mut self, id: u64) -> Result<Relation, MapError> {
        self.ensure_unreferenced(EntityKind::Relation, id)?;
        let relation = self
            .relations
            .shift_remove(&id)
            .ok_or_else(|| not_found(EntityKind::Relation, id))?;
        self.index.remove_relation(&relation);
        Ok(relation)
    }

    /// Entfernt mehrere Punkte in einem Durchlauf über die Sammlung.
    ///
    /// Jeder Punkt wird einzeln wie bei [`remove_point`](Self::remove_point)
    /// geprüft; noch referenzierte oder fehlende Punkte bleiben stehen und
    /// landen in der Fehlerliste.
    pub(super) fn remove_points_in_bulk(&mut self, ids: &[u64]) -> (usize, Vec<MapError>) {
        let (doomed, failures) = self.partition_unreferenced(EntityKind::Point, ids);
        for id in &doomed {
            if let Some(point) = self.points.get(id) {
                self.index.remove_point(point);
            }
        }
        self.points.retain(|id, _| !doomed.contains(id));
        (doomed.len(), failures)
    }

    /// Gegenstück zu [`remove_points_in_bulk`](Self::remove_points_in_bulk) für Ways.
    pub(super) fn remove_ways_in_bulk(&mut self, ids: &[u64]) -> (usize, Vec<MapError>) {
        let (doomed, failures) = self.partition_unreferenced(EntityKind::Way, ids);
        for id in &doomed {
            if let Some(way) = self.ways.get(id) {
                self.index.remove_way(way);
            }
        }
        self.ways.retain(|id, _| !doomed.contains(id));
        (doomed.len(), failures)
    }

    fn partition_unreferenced(
        &self,
        kind: EntityKind,
        ids: &[u64],
    ) -> (HashSet<u64>, Vec<MapError>) {
        let mut doomed = HashSet::with_capacity(ids.len());
        let mut failures = Vec::new();
        for &id in ids {
            match self.ensure_unreferenced(kind, id) {
                Ok(()) => {
                    doomed.insert(id);
                }
                Err(err) => failures.push(err),
            }
        }
        (doomed, failures)
    }

    fn ensure_unreferenced(&self, kind: EntityKind, id: u64) -> Result<(), MapError> {
        if !self.contains(kind, id) {
            return Err(not_found(kind, id));
        }
        let mut referrers = self.index.referrer_count(kind, id);
        // Selbstreferenz einer Relation blockiert das Löschen nicht
        if kind == EntityKind::Relation
            && self
                .index
                .member_refs(kind, id)
                .is_some_and(|set| set.contains(&id))
        {
            referrers -= 1;
        }
        if referrers > 0 {
            return Err(MapError::ReferentialViolation {
                entity: kind,
                id,
                referrers,
            });
        }
        Ok(())
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Ersetzt jede Referenz auf `old_id` (der angegebenen Art) durch `new_id`.
    ///
    /// Punkte werden in Way-Punktlisten und `node`-Membern umgeschrieben, Ways in
    /// `way`-Membern, Relationen in `relation`-Membern. Gibt die Anzahl der
    /// umgeschriebenen Vorkommen zurück.
    pub fn rewrite_reference(
        &mut self,
        kind: EntityKind,
        old_id: u64,
        new_id: u64,
    ) -> Result<usize, MapError> {
        if !self.contains(kind, new_id) {
            return Err(not_found(kind, new_id));
        }
        if old_id == new_id {
            return Ok(0);
        }

        let mut rewritten = 0;

        if kind == EntityKind::Point {
            for way_id in self.ways_using_point(old_id) {
                let Some(way) = self.ways.get_mut(&way_id) else {
                    continue;
                };
                let endpoints_before = way.endpoints();
                for point_id in way.points.iter_mut().filter(|p| **p == old_id) {
                    *point_id = new_id;
                    rewritten += 1;
                }
                self.index.repoint_way(way, old_id, new_id, endpoints_before);
            }
        }

        for relation_id in self.relations_referencing(kind, old_id) {
            let Some(relation) = self.relations.get_mut(&relation_id) else {
                continue;
            };
            for member in relation
                .members
                .iter_mut()
                .filter(|m| m.kind == kind && m.id == old_id)
            {
                member.id = new_id;
                rewritten += 1;
            }
            self.index.repoint_member(kind, relation_id, old_id, new_id);
        }

        Ok(rewritten)
    }

    /// Ersetzt die Punktfolge eines Ways (mindestens 2 existierende Punkte).
    pub fn set_way_points(&mut self, way_id: u64, points: Vec<u64>) -> Result<(), MapError> {
        if !self.ways.contains_key(&way_id) {
            return Err(not_found(EntityKind::Way, way_id));
        }
        self.validate_way_points(way_id, &points)?;
        if let Some(way) = self.ways.get_mut(&way_id) {
            self.index.remove_way(way);
            way.points = points;
            self.index.add_way(way);
        }
        Ok(())
    }

    /// Ersetzt die Member einer Relation; alle Member müssen existieren.
    pub fn set_relation_members(
        &mut self,
        relation_id: u64,
        members: Vec<Member>,
    ) -> Result<(), MapError> {
        if !self.relations.contains_key(&relation_id) {
            return Err(not_found(EntityKind::Relation, relation_id));
        }
        self.validate_members(relation_id, &members)?;
        if let Some(relation) = self.relations.get_mut(&relation_id) {
            self.index.remove_relation(relation);
            relation.members = members;
            self.index.add_relation(relation);
        }
        Ok(())
    }

    /// Tags eines Ways (ohne Einfluss auf die Indizes)
    pub fn way_tags_mut(&mut self, way_id: u64) -> Option<&mut Vec<Tag>> {
        self.ways.get_mut(&way_id).map(|w| &mut w.tags)
    }

    /// Baut alle Indizes aus den aktuellen Sammlungen neu auf.
    pub fn rebuild_indices(&mut self) {
        self.index.clear();
        for point in self.points.values() {
            self.index.add_point(point);
        }
        for way in self.ways.values() {
            self.index.add_way(way);
        }
        for relation in self.relations.values() {
            self.index.add_relation(relation);
        }
    }
}

#[cfg(test)]
mod tests;

//! Bearbeitung ganzer Lanelets: Umkehren, Entfernen, Punkte löschen, Linien-Subtyp.

use super::LaneletMap;
use crate::core::attributes::set_tag;
use crate::core::error::{malformed, not_found};
use crate::core::{BatchReport, EntityKind, MapError, Member};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashSet;

/// Ergebnis beim Entfernen von Lanelets
#[derive(Debug, Clone, Default, Serialize)]
pub struct LaneletRemoval {
    /// Entfernte Lanelets
    pub removed_lanelets: Vec<u64>,
    /// Entfernte Rand-Ways
    pub removed_ways: Vec<u64>,
    /// Mit entfernte Relationen, die ohne Member zurückblieben
    pub removed_relations: Vec<u64>,
    /// Anzahl gelöschter verwaister Punkte
    pub removed_points: usize,
    /// Fehlgeschlagene Einzel-Löschungen (nur Batch)
    pub batch: BatchReport,
}

impl LaneletMap {
    /// Dreht beide Ränder eines Lanelets um (Punktreihenfolge, IDs bleiben).
    ///
    /// Gibt die umgedrehten Way-IDs zurück.
    pub fn reverse_lanelet(&mut self, lanelet_id: u64) -> Result<Vec<u64>, MapError> {
        let ways = self.boundary_ways(lanelet_id)?;
        for &way_id in &ways {
            self.reverse_way(way_id)?;
        }
        log::info!("Lanelet {} umgekehrt", lanelet_id);
        Ok(ways)
    }

    /// Dreht mehrere Lanelets um; gemeinsam genutzte Ways werden nur einmal umgedreht.
    pub fn reverse_lanelets(&mut self, lanelet_ids: &[u64]) -> BatchReport {
        let mut report = BatchReport::default();
        let mut reversed: HashSet<u64> = HashSet::new();

        for &lanelet_id in lanelet_ids {
            let outcome = self.boundary_ways(lanelet_id).and_then(|ways| {
                for way_id in ways {
                    if reversed.insert(way_id) {
                        self.reverse_way(way_id)?;
                    }
                }
                Ok(())
            });
            report.record(outcome);
        }

        log::info!(
            "{} Lanelets umgekehrt ({} Ways), {} übersprungen",
            report.succeeded,
            reversed.len(),
            report.skipped()
        );
        report
    }

    /// Dreht alle Lanelets der Karte um.
    pub fn reverse_all_lanelets(&mut self) -> BatchReport {
        let ids: Vec<u64> = self.lanelets().map(|(id, _, _)| id).collect();
        self.reverse_lanelets(&ids)
    }

    fn boundary_ways(&self, lanelet_id: u64) -> Result<Vec<u64>, MapError> {
        let relation = self
            .relations
            .get(&lanelet_id)
            .ok_or_else(|| not_found(EntityKind::Relation, lanelet_id))?;
        let (left, right) = relation.boundaries().ok_or_else(|| {
            malformed(
                EntityKind::Relation,
                lanelet_id,
                "kein Lanelet (linker/rechter Rand fehlt)",
            )
        })?;
        let ways: IndexSet<u64> = [left, right].into_iter().collect();
        if let Some(&missing) = ways.iter().find(|id| !self.ways.contains_key(*id)) {
            return Err(not_found(EntityKind::Way, missing));
        }
        Ok(ways.into_iter().collect())
    }

    fn reverse_way(&mut self, way_id: u64) -> Result<(), MapError> {
        let mut points = self
            .ways
            .get(&way_id)
            .map(|w| w.points.clone())
            .ok_or_else(|| not_found(EntityKind::Way, way_id))?;
        points.reverse();
        self.set_way_points(way_id, points)
    }

    /// Entfernt ein Lanelet samt seiner Rand-Ways.
    ///
    /// Verweise anderer Relationen auf das Lanelet werden entfernt; eine Relation,
    /// die dadurch keine Member mehr hat, wird mitgelöscht. Rand-Ways werden nur
    /// gelöscht, wenn sie nicht noch anderweitig verwendet werden.
    pub fn remove_lanelet(
        &mut self,
        lanelet_id: u64,
        prune_orphans: bool,
    ) -> Result<LaneletRemoval, MapError> {
        let ways = self.boundary_ways(lanelet_id)?;
        let mut removal = LaneletRemoval::default();

        for referrer in self.relations_referencing(EntityKind::Relation, lanelet_id) {
            if referrer == lanelet_id {
                continue;
            }
            let Some(members) = self.relations.get(&referrer).map(|r| {
                r.members
                    .iter()
                    .filter(|m| !(m.kind == EntityKind::Relation && m.id == lanelet_id))
                    .cloned()
                    .collect::<Vec<Member>>()
            }) else {
                continue;
            };
            let now_empty = members.is_empty();
            self.set_relation_members(referrer, members)?;
            if now_empty && self.referrer_count(EntityKind::Relation, referrer) == 0 {
                self.remove_relation(referrer)?;
                removal.removed_relations.push(referrer);
            }
        }

        let removed = self.remove_relation(lanelet_id)?;
        removal.removed_lanelets.push(lanelet_id);

        let mut candidate_points: HashSet<u64> = HashSet::new();
        for way_id in ways {
            if self.referrer_count(EntityKind::Way, way_id) == 0 {
                let way = self.remove_way(way_id)?;
                candidate_points.extend(way.points);
                removal.removed_ways.push(way_id);
            }
        }
        candidate_points.extend(removed.member_ids(EntityKind::Point));

        if prune_orphans {
            removal.removed_points = self.remove_unreferenced_points(&candidate_points);
        }

        log::info!(
            "Lanelet {} entfernt ({} Ways, {} Punkte)",
            lanelet_id,
            removal.removed_ways.len(),
            removal.removed_points
        );
        Ok(removal)
    }

    /// Entfernt alle Lanelets außer `keep` und anschließend verwaiste Punkte.
    pub fn remove_lanelets_except(&mut self, keep: &[u64]) -> LaneletRemoval {
        let keep: HashSet<u64> = keep.iter().copied().collect();
        let doomed: Vec<u64> = self
            .lanelets()
            .map(|(id, _, _)| id)
            .filter(|id| !keep.contains(id))
            .collect();

        log::info!(
            "{} Lanelets gesamt, {} werden behalten",
            self.lanelet_count(),
            self.lanelet_count() - doomed.len()
        );

        let mut total = LaneletRemoval::default();
        for lanelet_id in doomed {
            // Bereits als leere Relation mitgelöscht
            if !self.relations.contains_key(&lanelet_id) {
                continue;
            }
            if let Some(removal) = total.batch.record(self.remove_lanelet(lanelet_id, false)) {
                total.removed_lanelets.extend(removal.removed_lanelets);
                total.removed_ways.extend(removal.removed_ways);
                total.removed_relations.extend(removal.removed_relations);
            }
        }
        total.removed_points = self.remove_orphaned_points();
        total
    }

    /// Löscht Punkte und entfernt vorher ihre Referenzen aus Ways und Relationen.
    ///
    /// Fällt ein Way dadurch unter 2 Punkte, schlägt der Punkt mit
    /// `MalformedRecord` fehl und bleibt erhalten.
    pub fn remove_points(&mut self, point_ids: &[u64]) -> BatchReport {
        let mut report = BatchReport::default();
        for &point_id in point_ids {
            let outcome = self.strip_and_remove_point(point_id);
            report.record(outcome);
        }
        log::info!(
            "{} Punkte entfernt, {} übersprungen",
            report.succeeded,
            report.skipped()
        );
        report
    }

    fn strip_and_remove_point(&mut self, point_id: u64) -> Result<(), MapError> {
        if !self.points.contains_key(&point_id) {
            return Err(not_found(EntityKind::Point, point_id));
        }

        let mut way_updates: Vec<(u64, Vec<u64>)> = Vec::new();
        for way_id in self.ways_using_point(point_id) {
            let Some(way) = self.ways.get(&way_id) else {
                continue;
            };
            let remaining: Vec<u64> = way
                .points
                .iter()
                .copied()
                .filter(|&p| p != point_id)
                .collect();
            if remaining.len() < 2 {
                return Err(malformed(
                    EntityKind::Point,
                    point_id,
                    format!("Way {} hätte danach weniger als 2 Punkte", way_id),
                ));
            }
            way_updates.push((way_id, remaining));
        }

        for (way_id, points) in way_updates {
            self.set_way_points(way_id, points)?;
        }
        for relation_id in self.relations_referencing(EntityKind::Point, point_id) {
            let Some(members) = self.relations.get(&relation_id).map(|r| {
                r.members
                    .iter()
                    .filter(|m| !(m.kind == EntityKind::Point && m.id == point_id))
                    .cloned()
                    .collect::<Vec<Member>>()
            }) else {
                continue;
            };
            self.set_relation_members(relation_id, members)?;
        }
        self.remove_point(point_id)?;
        Ok(())
    }

    /// Setzt den `subtype`-Tag der Ways auf `subtype` (z.B. `dashed`).
    pub fn make_ways_dashed(&mut self, way_ids: &[u64], subtype: &str) -> BatchReport {
        let mut report = BatchReport::default();
        for &way_id in way_ids {
            let outcome = match self.way_tags_mut(way_id) {
                Some(tags) => {
                    set_tag(tags, "subtype", subtype);
                    Ok(())
                }
                None => Err(not_found(EntityKind::Way, way_id)),
            };
            report.record(outcome);
        }
        log::info!("{} Ways auf subtype={} gesetzt", report.succeeded, subtype);
        report
    }
}

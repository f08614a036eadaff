//! Erkennung und Reparatur doppelt genutzter Mittellinien.
//!
//! Ein Way, den zwei Lanelets als Rand verwenden, kann nur für eines der beiden
//! die richtige Richtung haben. Das Lanelet, dessen zweiter Rand stärker von der
//! Richtung des geteilten Ways abweicht, bekommt eine umgedrehte Kopie.

use super::LaneletMap;
use crate::core::error::{malformed, not_found};
use crate::core::{BatchReport, EntityKind, MapError, Member, Relation};
use crate::shared::geo_projection::{angle_difference, bearing};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

/// Ein von zwei Lanelets geteilter Rand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DoubledBoundaryRecord {
    /// Der geteilte Way
    pub doubled_way: u64,
    /// Erstes Lanelet (Einlese-Reihenfolge)
    pub lanelet1: u64,
    /// Der andere Rand von `lanelet1`
    pub lanelet1_other_boundary: u64,
    /// Zweites Lanelet
    pub lanelet2: u64,
    /// Der andere Rand von `lanelet2`
    pub lanelet2_other_boundary: u64,
}

/// Ergebnis einer einzelnen Reparatur
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoubledBoundaryResolution {
    pub record: DoubledBoundaryRecord,
    /// ID des neu erzeugten, umgedrehten Ways
    pub new_way: u64,
    /// Lanelet, das auf den neuen Way umgehängt wurde
    pub rewired_lanelet: u64,
    /// Lanelet, das den ursprünglichen Way behält
    pub kept_lanelet: u64,
    /// Winkelabweichung des umgehängten Lanelets (Radiant)
    pub rewired_deviation: f64,
    /// Winkelabweichung des behaltenen Lanelets (Radiant)
    pub kept_deviation: f64,
}

/// Ergebnis von [`LaneletMap::resolve_all_doubled_boundaries`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct DoubledBoundaryReport {
    pub resolutions: Vec<DoubledBoundaryResolution>,
    pub batch: BatchReport,
}

impl LaneletMap {
    /// Findet alle Ways, die von mehr als einem Lanelet als Rand verwendet werden.
    pub fn detect_doubled_boundaries(&self) -> Vec<DoubledBoundaryRecord> {
        let mut users: IndexMap<u64, Vec<(u64, u64)>> = IndexMap::new();

        for relation in self.relations.values() {
            let Some((left, right)) = relation.boundaries() else {
                continue;
            };
            for (boundary, other) in [(left, right), (right, left)] {
                let entry = users.entry(boundary).or_default();
                // Lanelet mit identischem linken und rechten Rand nur einmal zählen
                if entry.last().map(|(lanelet, _)| *lanelet) != Some(relation.id) {
                    entry.push((relation.id, other));
                }
            }
        }

        users
            .into_iter()
            .filter(|(_, lanelets)| lanelets.len() > 1)
            .map(|(doubled_way, lanelets)| DoubledBoundaryRecord {
                doubled_way,
                lanelet1: lanelets[0].0,
                lanelet1_other_boundary: lanelets[0].1,
                lanelet2: lanelets[1].0,
                lanelet2_other_boundary: lanelets[1].1,
            })
            .collect()
    }

    /// Hängt das falsch verdrahtete Lanelet eines Records auf eine umgedrehte Kopie um.
    ///
    /// Bei Fehlern bleibt die Karte unverändert.
    pub fn resolve_doubled_boundary(
        &mut self,
        record: &DoubledBoundaryRecord,
    ) -> Result<DoubledBoundaryResolution, MapError> {
        let lanelet1 = self.lanelet_using(record.lanelet1, record.doubled_way)?;
        let lanelet2 = self.lanelet_using(record.lanelet2, record.doubled_way)?;

        let doubled_bearing = self.midpoint_bearing(record.doubled_way)?;
        let deviation1 =
            angle_difference(doubled_bearing, self.midpoint_bearing(record.lanelet1_other_boundary)?);
        let deviation2 =
            angle_difference(doubled_bearing, self.midpoint_bearing(record.lanelet2_other_boundary)?);

        // Gleichstand: lanelet2 wird umgehängt
        let (rewired, kept, rewired_deviation, kept_deviation) = if deviation1 > deviation2 {
            (lanelet1, lanelet2, deviation1, deviation2)
        } else {
            (lanelet2, lanelet1, deviation2, deviation1)
        };

        let rewired_id = rewired.id;
        let kept_id = kept.id;
        let rewired_members = rewired.members.clone();
        let doubled = self
            .ways
            .get(&record.doubled_way)
            .cloned()
            .ok_or_else(|| not_found(EntityKind::Way, record.doubled_way))?;

        let new_way_id = self.reversed_way_id(record.doubled_way);
        let mut reversed_points = doubled.points.clone();
        reversed_points.reverse();
        let new_way = doubled.derive(new_way_id, reversed_points);

        let members: Vec<Member> = rewired_members
            .into_iter()
            .map(|mut m| {
                if m.id == record.doubled_way && m.boundary_side().is_some() {
                    m.id = new_way_id;
                }
                m
            })
            .collect();

        self.insert_way(new_way)?;
        self.set_relation_members(rewired_id, members)?;

        log::info!(
            "Doppelte Mittellinie {} repariert: Lanelet {} nutzt jetzt Way {}",
            record.doubled_way,
            rewired_id,
            new_way_id
        );

        Ok(DoubledBoundaryResolution {
            record: *record,
            new_way: new_way_id,
            rewired_lanelet: rewired_id,
            kept_lanelet: kept_id,
            rewired_deviation,
            kept_deviation,
        })
    }

    /// Erkennt und repariert alle doppelten Mittellinien.
    ///
    /// Teilen sich mehr als zwei Lanelets einen Way, wird wiederholt erkannt,
    /// bis kein Way mehr doppelt genutzt wird oder ein Durchlauf nichts ändert.
    pub fn resolve_all_doubled_boundaries(&mut self) -> DoubledBoundaryReport {
        let mut report = DoubledBoundaryReport::default();
        // Gescheiterte Datensätze werden in späteren Durchläufen nicht erneut versucht
        let mut failed: HashSet<DoubledBoundaryRecord> = HashSet::new();

        loop {
            let records: Vec<DoubledBoundaryRecord> = self
                .detect_doubled_boundaries()
                .into_iter()
                .filter(|record| !failed.contains(record))
                .collect();
            if records.is_empty() {
                break;
            }
            let mut progressed = false;
            for record in &records {
                let result = self.resolve_doubled_boundary(record);
                if result.is_err() {
                    failed.insert(*record);
                }
                if let Some(resolution) = report.batch.record(result) {
                    report.resolutions.push(resolution);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        log::info!(
            "{} doppelte Mittellinie(n) repariert, {} übersprungen",
            report.resolutions.len(),
            report.batch.skipped()
        );
        report
    }

    /// Lanelet, das `way_id` noch als Rand verwendet
    fn lanelet_using(&self, lanelet_id: u64, way_id: u64) -> Result<&Relation, MapError> {
        let relation = self
            .relations
            .get(&lanelet_id)
            .ok_or_else(|| not_found(EntityKind::Relation, lanelet_id))?;
        if !relation.is_lanelet() {
            return Err(malformed(
                EntityKind::Relation,
                lanelet_id,
                "kein Lanelet (linker/rechter Rand fehlt)",
            ));
        }
        if relation.side_of(way_id).is_none() {
            return Err(malformed(
                EntityKind::Relation,
                lanelet_id,
                format!("verwendet Way {} nicht als Rand", way_id),
            ));
        }
        Ok(relation)
    }

    /// Richtung eines Ways an den beiden Punkten um seine Mitte
    fn midpoint_bearing(&self, way_id: u64) -> Result<f64, MapError> {
        let way = self
            .ways
            .get(&way_id)
            .ok_or_else(|| not_found(EntityKind::Way, way_id))?;
        let (from_id, to_id) = way.midpoint_pair().ok_or_else(|| {
            malformed(EntityKind::Way, way_id, "weniger als 2 Punkte")
        })?;
        let from = self
            .points
            .get(&from_id)
            .ok_or_else(|| not_found(EntityKind::Point, from_id))?;
        let to = self
            .points
            .get(&to_id)
            .ok_or_else(|| not_found(EntityKind::Point, to_id))?;
        Ok(bearing(from.lat, from.lon, to.lat, to.lon))
    }

    /// ID für die umgedrehte Kopie: `<id>99`, falls frei und oberhalb der Höchst-ID.
    fn reversed_way_id(&mut self, way_id: u64) -> u64 {
        match way_id.checked_mul(100).and_then(|id| id.checked_add(99)) {
            Some(candidate) if candidate > self.max_id => {
                self.reserve_id(candidate);
                candidate
            }
            _ => self.allocate_id(),
        }
    }
}

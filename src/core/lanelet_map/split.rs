//! Längenmessung und Aufteilung überlanger Lanelets.

use super::LaneletMap;
use crate::core::error::{malformed, not_found};
use crate::core::{BatchReport, BoundarySide, EntityKind, MapError, Member, Relation, Way};
use crate::shared::geo_projection::{BoundaryProfile, LocalProjection};
use crate::shared::options::{
    FALLBACK_REFERENCE_LATITUDE, MIN_POINT_SPACING_M, SHORT_TAIL_FRACTION, SPLIT_DISTANCE_M,
};
use glam::DVec2;
use serde::Serialize;

/// Parameter für Längenmessung und Split
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitSettings {
    /// Ziel-Segmentlänge in Metern
    pub target_length_m: f64,
    /// Mindestabstand aufeinanderfolgender Punkte in Metern
    pub min_point_spacing_m: f64,
    /// Rest-Segmente unter `target * short_tail_fraction` werden zugeschlagen
    pub short_tail_fraction: f64,
    /// Breitengrad der lokalen Projektion
    pub reference_latitude: f64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            target_length_m: SPLIT_DISTANCE_M,
            min_point_spacing_m: MIN_POINT_SPACING_M,
            short_tail_fraction: SHORT_TAIL_FRACTION,
            reference_latitude: FALLBACK_REFERENCE_LATITUDE,
        }
    }
}

impl SplitSettings {
    /// Empfohlene Segmentanzahl für eine Länge (mindestens 1).
    pub fn segment_count(&self, length: f64) -> usize {
        if !(length > 0.0) || !(self.target_length_m > 0.0) {
            return 1;
        }
        let mut segments = ((length / self.target_length_m).ceil() as usize).max(1);
        let tail = length - (segments - 1) as f64 * self.target_length_m;
        if segments > 1 && tail < self.target_length_m * self.short_tail_fraction {
            segments -= 1;
        }
        segments
    }
}

/// Gemessene Länge eines Lanelets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneletLength {
    pub lanelet: u64,
    pub left_way: u64,
    pub right_way: u64,
    pub left_length_m: f64,
    pub right_length_m: f64,
    /// Mittelwert beider Ränder
    pub mean_length_m: f64,
    /// Empfohlene Segmentanzahl bei der eingestellten Ziellänge
    pub recommended_segments: usize,
    /// Punkte, die zu nah am vorherigen liegen
    pub too_close_points: Vec<u64>,
}

/// Ergebnis eines einzelnen Splits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitResult {
    /// Das ursprüngliche Lanelet
    pub original_lanelet: u64,
    /// Anzahl der Teilstücke (1 = nichts geändert)
    pub segments: usize,
    /// Neue Lanelets in Fahrtrichtung
    pub new_lanelets: Vec<u64>,
    /// Neue Rand-Ways (je Teilstück links, rechts)
    pub new_ways: Vec<u64>,
    /// Gelöschte ursprüngliche Rand-Ways
    pub removed_ways: Vec<u64>,
    pub mean_length_m: f64,
}

/// Ergebnis von [`LaneletMap::split_overlong_lanelets`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitBatchResult {
    pub splits: Vec<SplitResult>,
    pub batch: BatchReport,
}

/// Messdaten eines Randes
struct MeasuredBoundary {
    way: Way,
    profile: BoundaryProfile,
}

impl MeasuredBoundary {
    fn too_close_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.profile.too_close.iter().map(|&i| self.way.points[i])
    }
}

impl LaneletMap {
    fn measure_boundary(
        &self,
        way_id: u64,
        projection: &LocalProjection,
        min_spacing: f64,
    ) -> Result<MeasuredBoundary, MapError> {
        let way = self
            .ways
            .get(&way_id)
            .ok_or_else(|| not_found(EntityKind::Way, way_id))?;
        if way.points.len() < 2 {
            return Err(malformed(EntityKind::Way, way_id, "weniger als 2 Punkte"));
        }
        let positions = way
            .points
            .iter()
            .map(|id| {
                self.points
                    .get(id)
                    .map(|p| projection.to_local(p.lat, p.lon))
                    .ok_or_else(|| not_found(EntityKind::Point, *id))
            })
            .collect::<Result<Vec<DVec2>, MapError>>()?;

        Ok(MeasuredBoundary {
            way: way.clone(),
            profile: BoundaryProfile::measure(&positions, min_spacing),
        })
    }

    fn measure_lanelet(
        &self,
        lanelet_id: u64,
        settings: &SplitSettings,
    ) -> Result<(Relation, MeasuredBoundary, MeasuredBoundary), MapError> {
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
        let projection = LocalProjection::new(settings.reference_latitude);
        let left = self.measure_boundary(left, &projection, settings.min_point_spacing_m)?;
        let right = self.measure_boundary(right, &projection, settings.min_point_spacing_m)?;
        Ok((relation.clone(), left, right))
    }

    /// Misst die Länge eines einzelnen Lanelets.
    pub fn lanelet_length(
        &self,
        lanelet_id: u64,
        settings: &SplitSettings,
    ) -> Result<LaneletLength, MapError> {
        let (_, left, right) = self.measure_lanelet(lanelet_id, settings)?;
        let mean = (left.profile.length() + right.profile.length()) / 2.0;
        Ok(LaneletLength {
            lanelet: lanelet_id,
            left_way: left.way.id,
            right_way: right.way.id,
            left_length_m: left.profile.length(),
            right_length_m: right.profile.length(),
            mean_length_m: mean,
            recommended_segments: settings.segment_count(mean),
            too_close_points: left.too_close_ids().chain(right.too_close_ids()).collect(),
        })
    }

    /// Misst alle Lanelets der Karte.
    pub fn lanelet_lengths(&self, settings: &SplitSettings) -> Vec<LaneletLength> {
        let ids: Vec<u64> = self.lanelets().map(|(id, _, _)| id).collect();
        ids.into_iter()
            .filter_map(|id| match self.lanelet_length(id, settings) {
                Ok(length) => Some(length),
                Err(err) => {
                    log::warn!("Lanelet {} nicht messbar: {}", id, err);
                    None
                }
            })
            .collect()
    }

    /// Teilt ein Lanelet in Stücke von etwa `settings.target_length_m`.
    ///
    /// Beide Ränder werden an den Punkten geteilt, an denen ihre kumulierte Länge
    /// `k / N` der Gesamtlänge überschreitet; aufeinanderfolgende Stücke teilen
    /// sich den Split-Punkt. Relationen, die das Lanelet referenzieren, verweisen
    /// danach auf alle neuen Lanelets. Bei `N = 1` bleibt die Karte unverändert.
    pub fn split_lanelet_by_distance(
        &mut self,
        lanelet_id: u64,
        settings: &SplitSettings,
    ) -> Result<SplitResult, MapError> {
        let (relation, left, right) = self.measure_lanelet(lanelet_id, settings)?;
        let mean = (left.profile.length() + right.profile.length()) / 2.0;

        let segments = settings
            .segment_count(mean)
            .min(left.way.points.len() - 1)
            .min(right.way.points.len() - 1);

        let mut result = SplitResult {
            original_lanelet: lanelet_id,
            segments: 1,
            new_lanelets: Vec::new(),
            new_ways: Vec::new(),
            removed_ways: Vec::new(),
            mean_length_m: mean,
        };
        if segments <= 1 {
            return Ok(result);
        }
        result.segments = segments;

        let left_cuts = cut_indices(&left.profile, segments);
        let right_cuts = cut_indices(&right.profile, segments);

        let mut new_ways: Vec<Way> = Vec::with_capacity(segments * 2);
        let mut new_lanelets: Vec<Relation> = Vec::with_capacity(segments);
        for k in 0..segments {
            let left_piece = left.way.derive(
                self.allocate_id(),
                left.way.points[left_cuts[k]..=left_cuts[k + 1]].to_vec(),
            );
            let right_piece = right.way.derive(
                self.allocate_id(),
                right.way.points[right_cuts[k]..=right_cuts[k + 1]].to_vec(),
            );

            let mut lanelet = relation.derive(self.allocate_id());
            lanelet.members = relation
                .members
                .iter()
                .map(|m| match m.boundary_side() {
                    Some(BoundarySide::Left) if m.id == left.way.id => Member {
                        id: left_piece.id,
                        ..m.clone()
                    },
                    Some(BoundarySide::Right) if m.id == right.way.id => Member {
                        id: right_piece.id,
                        ..m.clone()
                    },
                    _ => m.clone(),
                })
                .collect();

            new_ways.push(left_piece);
            new_ways.push(right_piece);
            new_lanelets.push(lanelet);
        }

        result.new_ways = new_ways.iter().map(|w| w.id).collect();
        result.new_lanelets = new_lanelets.iter().map(|r| r.id).collect();

        for way in new_ways {
            self.insert_way(way)?;
        }
        for lanelet in new_lanelets {
            self.insert_relation(lanelet)?;
        }

        for referrer in self.relations_referencing(EntityKind::Relation, lanelet_id) {
            if referrer == lanelet_id {
                continue;
            }
            let Some(members) = self.relations.get(&referrer).map(|r| {
                r.members
                    .iter()
                    .flat_map(|m| {
                        if m.kind == EntityKind::Relation && m.id == lanelet_id {
                            result
                                .new_lanelets
                                .iter()
                                .map(|&id| Member { id, ..m.clone() })
                                .collect::<Vec<Member>>()
                        } else {
                            vec![m.clone()]
                        }
                    })
                    .collect::<Vec<Member>>()
            }) else {
                continue;
            };
            self.set_relation_members(referrer, members)?;
        }

        self.remove_relation(lanelet_id)?;
        for way_id in [left.way.id, right.way.id] {
            if self.ways.contains_key(&way_id)
                && self.referrer_count(EntityKind::Way, way_id) == 0
            {
                self.remove_way(way_id)?;
                result.removed_ways.push(way_id);
            }
        }

        log::info!(
            "Lanelet {} ({:.1} m) in {} Teile geteilt: {:?}",
            lanelet_id,
            mean,
            segments,
            result.new_lanelets
        );
        Ok(result)
    }

    /// Teilt alle Lanelets, deren empfohlene Segmentanzahl größer als 1 ist.
    pub fn split_overlong_lanelets(&mut self, settings: &SplitSettings) -> SplitBatchResult {
        let mut result = SplitBatchResult::default();
        let overlong: Vec<u64> = self
            .lanelet_lengths(settings)
            .into_iter()
            .filter(|l| l.recommended_segments > 1)
            .map(|l| l.lanelet)
            .collect();

        for lanelet_id in overlong {
            if let Some(split) = result
                .batch
                .record(self.split_lanelet_by_distance(lanelet_id, settings))
            {
                result.splits.push(split);
            }
        }

        log::info!(
            "{} überlange Lanelets geteilt, {} übersprungen",
            result.splits.len(),
            result.batch.skipped()
        );
        result
    }
}

/// Punkt-Indizes, an denen ein Rand in `segments` Stücke geteilt wird (inkl. 0 und n-1).
///
/// Indizes sind streng steigend, jedes Stück behält mindestens 2 Punkte.
fn cut_indices(profile: &BoundaryProfile, segments: usize) -> Vec<usize> {
    let last = profile.cumulative.len() - 1;
    let length = profile.length();
    let mut cuts = Vec::with_capacity(segments + 1);
    cuts.push(0);
    for k in 1..segments {
        let lo = cuts[k - 1] + 1;
        let hi = last - (segments - k);
        let threshold = k as f64 * length / segments as f64;
        cuts.push(profile.first_index_beyond(threshold, lo, hi));
    }
    cuts.push(last);
    cuts
}

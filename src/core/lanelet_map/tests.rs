use super::*;
use crate::core::{BatchReport, RelationKind};
use crate::shared::geo_projection::{polyline_length, LocalProjection};
use approx::assert_relative_eq;

/// Legt einen 2-Punkt-Way mit der angegebenen Richtung (Grad) an.
fn add_way_with_bearing(map: &mut LaneletMap, way_id: u64, first_point: u64, origin: (f64, f64), degrees: f64) {
    let (lat, lon) = origin;
    let rad = degrees.to_radians();
    map.insert_point(MapPoint::new(first_point, lat, lon)).unwrap();
    map.insert_point(MapPoint::new(
        first_point + 1,
        lat + 0.0001 * rad.sin(),
        lon + 0.0001 * rad.cos(),
    ))
    .unwrap();
    map.insert_way(Way::new(way_id, vec![first_point, first_point + 1]))
        .unwrap();
}

/// Zwei Lanelets, die sich Way 100 teilen (Richtungen 12°, 10°, 170°).
fn doubled_centerline_map() -> LaneletMap {
    let mut map = LaneletMap::new();
    add_way_with_bearing(&mut map, 100, 1, (28.1, -81.8), 12.0);
    add_way_with_bearing(&mut map, 101, 3, (28.1, -81.7999), 10.0);
    add_way_with_bearing(&mut map, 102, 5, (28.1, -81.8001), 170.0);
    map.insert_relation(Relation::lanelet(1000, 100, 101)).unwrap();
    map.insert_relation(Relation::lanelet(2000, 102, 100)).unwrap();
    map
}

/// Gerades Lanelet mit `n` Punkten je Rand im Abstand `spacing_m` nach Norden.
fn straight_lanelet_map(n: u64, spacing_m: f64) -> LaneletMap {
    let mut map = LaneletMap::new();
    let step = spacing_m / crate::shared::METERS_PER_DEGREE_LAT;
    for i in 0..n {
        map.insert_point(MapPoint::new(1 + i, 28.0 + i as f64 * step, -81.8))
            .unwrap();
        map.insert_point(MapPoint::new(1001 + i, 28.0 + i as f64 * step, -81.79997))
            .unwrap();
    }
    map.insert_way(Way::new(5000, (1..=n).collect())).unwrap();
    map.insert_way(Way::new(5001, (1001..1001 + n).collect()))
        .unwrap();
    map.insert_relation(Relation::lanelet(6000, 5000, 5001)).unwrap();
    map
}

fn way_length(map: &LaneletMap, way_id: u64, projection: &LocalProjection) -> f64 {
    let positions: Vec<_> = map
        .way(way_id)
        .unwrap()
        .points
        .iter()
        .map(|id| {
            let p = map.point(*id).unwrap();
            projection.to_local(p.lat, p.lon)
        })
        .collect();
    polyline_length(&positions)
}

// ── Modell ──────────────────────────────────────────────────────────

#[test]
fn test_insert_validates_references() {
    let mut map = LaneletMap::new();
    map.insert_point(MapPoint::new(1, 1.0, 2.0)).unwrap();

    assert_eq!(
        map.insert_way(Way::new(10, vec![1, 2])),
        Err(MapError::NotFound {
            entity: EntityKind::Point,
            id: 2
        })
    );
    assert!(matches!(
        map.insert_way(Way::new(11, vec![1])),
        Err(MapError::MalformedRecord { .. })
    ));
    assert!(matches!(
        map.insert_point(MapPoint::new(1, 0.0, 0.0)),
        Err(MapError::MalformedRecord { .. })
    ));
    assert_eq!(map.way_count(), 0);
}

#[test]
fn test_remove_requires_unreferenced() {
    let mut map = doubled_centerline_map();

    assert_eq!(
        map.remove_point(1).unwrap_err(),
        MapError::ReferentialViolation {
            entity: EntityKind::Point,
            id: 1,
            referrers: 1
        }
    );
    assert!(matches!(
        map.remove_way(100),
        Err(MapError::ReferentialViolation { referrers: 2, .. })
    ));
    assert!(matches!(
        map.remove_relation(9999),
        Err(MapError::NotFound { .. })
    ));

    map.remove_relation(1000).unwrap();
    map.remove_way(101).unwrap();
    map.remove_point(3).unwrap();
    assert_eq!(map.point_count(), 5);
}

#[test]
fn test_rewrite_reference_updates_indices() {
    let mut map = doubled_centerline_map();
    map.insert_point(MapPoint::new(50, 28.2, -81.8)).unwrap();

    assert_eq!(map.rewrite_reference(EntityKind::Point, 1, 50), Ok(1));
    assert_eq!(map.way(100).unwrap().points, vec![50, 2]);
    assert!(map.ways_using_point(1).is_empty());
    assert_eq!(map.ways_using_point(50), vec![100]);
    map.remove_point(1).unwrap();

    assert_eq!(
        map.rewrite_reference(EntityKind::Way, 100, 4242),
        Err(MapError::NotFound {
            entity: EntityKind::Way,
            id: 4242
        })
    );
    assert_eq!(map.rewrite_reference(EntityKind::Way, 100, 101), Ok(2));
    assert_eq!(map.referrer_count(EntityKind::Way, 100), 0);
    assert_eq!(map.referrer_count(EntityKind::Way, 101), 2);
}

#[test]
fn test_allocate_id_is_monotonic() {
    let mut map = doubled_centerline_map();
    assert_eq!(map.max_id(), 2000);
    assert_eq!(map.allocate_id(), 2001);
    map.reserve_id(500);
    assert_eq!(map.allocate_id(), 2002);
}

// ── Doppelte Mittellinien ───────────────────────────────────────────

#[test]
fn test_detect_doubled_boundary() {
    let map = doubled_centerline_map();
    let records = map.detect_doubled_boundaries();
    assert_eq!(
        records,
        vec![DoubledBoundaryRecord {
            doubled_way: 100,
            lanelet1: 1000,
            lanelet1_other_boundary: 101,
            lanelet2: 2000,
            lanelet2_other_boundary: 102,
        }]
    );
}

#[test]
fn test_resolve_rewires_deviating_lanelet() {
    let mut map = doubled_centerline_map();
    let record = map.detect_doubled_boundaries()[0];

    let resolution = map.resolve_doubled_boundary(&record).unwrap();

    assert_eq!(resolution.new_way, 10099);
    assert_eq!(resolution.rewired_lanelet, 2000);
    assert_eq!(resolution.kept_lanelet, 1000);
    assert_eq!(map.way(10099).unwrap().points, vec![2, 1]);
    assert_eq!(
        map.relation(2000).unwrap().kind(),
        RelationKind::Lanelet {
            left: 102,
            right: 10099
        }
    );
    assert_eq!(map.relation(1000).unwrap().boundary(BoundarySide::Left), Some(100));
    assert!(map.detect_doubled_boundaries().is_empty());
    assert_eq!(map.max_id(), 10099);
}

#[test]
fn test_resolve_uses_next_id_when_suffix_taken() {
    let mut map = doubled_centerline_map();
    map.reserve_id(20000);
    let record = map.detect_doubled_boundaries()[0];

    let resolution = map.resolve_doubled_boundary(&record).unwrap();
    assert_eq!(resolution.new_way, 20001);
}

#[test]
fn test_resolve_tie_prefers_second_lanelet() {
    let mut map = LaneletMap::new();
    add_way_with_bearing(&mut map, 100, 1, (28.1, -81.8), 0.0);
    add_way_with_bearing(&mut map, 101, 3, (28.1, -81.7999), 20.0);
    // Gleiche Geometrie, also exakt gleiche Abweichung
    map.insert_way(Way::new(102, vec![3, 4])).unwrap();
    map.insert_relation(Relation::lanelet(1000, 100, 101)).unwrap();
    map.insert_relation(Relation::lanelet(2000, 102, 100)).unwrap();

    let record = map.detect_doubled_boundaries()[0];
    let resolution = map.resolve_doubled_boundary(&record).unwrap();
    assert_relative_eq!(resolution.rewired_deviation, resolution.kept_deviation, epsilon = 1e-9);
    assert_eq!(resolution.rewired_lanelet, 2000);
}

#[test]
fn test_resolve_failure_leaves_map_unchanged() {
    let mut map = doubled_centerline_map();
    let record = DoubledBoundaryRecord {
        doubled_way: 100,
        lanelet1: 1000,
        lanelet1_other_boundary: 777,
        lanelet2: 2000,
        lanelet2_other_boundary: 102,
    };

    assert_eq!(
        map.resolve_doubled_boundary(&record).unwrap_err(),
        MapError::NotFound {
            entity: EntityKind::Way,
            id: 777
        }
    );
    assert_eq!(map.way_count(), 3);
    assert_eq!(map.detect_doubled_boundaries().len(), 1);
}

#[test]
fn test_resolve_all_handles_three_lanelets() {
    let mut map = doubled_centerline_map();
    add_way_with_bearing(&mut map, 103, 7, (28.1002, -81.8), 11.0);
    map.insert_relation(Relation::lanelet(3000, 100, 103)).unwrap();

    let report = map.resolve_all_doubled_boundaries();

    assert!(report.batch.is_clean());
    assert_eq!(report.resolutions.len(), 2);
    assert!(map.detect_doubled_boundaries().is_empty());
}

#[test]
fn test_resolve_all_reports_persistent_failure_once() {
    let mut map = doubled_centerline_map();
    add_way_with_bearing(&mut map, 103, 7, (28.1002, -81.8), 11.0);
    map.insert_relation(Relation::lanelet(3000, 100, 103)).unwrap();
    // Way 300 ist doppelt genutzt, Lanelet 4000 verweist aber auf fehlenden Way 888
    add_way_with_bearing(&mut map, 300, 9, (28.2, -81.8), 45.0);
    add_way_with_bearing(&mut map, 301, 11, (28.2, -81.7999), 45.0);
    map.insert_relation_resolved(Relation::lanelet(4000, 300, 888))
        .unwrap();
    map.insert_relation(Relation::lanelet(5000, 300, 301)).unwrap();

    let report = map.resolve_all_doubled_boundaries();

    assert_eq!(report.resolutions.len(), 2);
    assert_eq!(
        report.batch.failures,
        vec![MapError::NotFound {
            entity: EntityKind::Way,
            id: 888
        }]
    );
    assert_eq!(report.batch.succeeded, 2);
    assert_eq!(map.detect_doubled_boundaries().len(), 1);
}

// ── Duplikate & verwaiste Punkte ────────────────────────────────────

#[test]
fn test_deduplicate_points_rewrites_way() {
    let mut map = LaneletMap::new();
    map.insert_point(MapPoint::new(1, 1.0, 2.0)).unwrap();
    map.insert_point(MapPoint::new(2, 1.0, 2.0)).unwrap();
    map.insert_point(MapPoint::new(3, 1.5, 2.5)).unwrap();
    map.insert_way(Way::new(5, vec![2, 3])).unwrap();
    assert_eq!(map.count_duplicate_points(), (1, 1));

    let result = map.deduplicate_points();

    assert!(result.had_duplicates());
    assert_eq!(result.removed, 1);
    assert_eq!(result.rewritten_references, 1);
    assert_eq!(map.way(5).unwrap().points, vec![1, 3]);
    assert!(map.point(2).is_none());
    assert_eq!(map.count_duplicate_points(), (0, 0));
}

#[test]
fn test_deduplicate_ways_by_endpoints() {
    let mut map = LaneletMap::new();
    for (id, lat) in [(1, 1.0), (2, 1.1), (3, 1.2), (4, 1.3)] {
        map.insert_point(MapPoint::new(id, lat, 2.0)).unwrap();
    }
    map.insert_way(Way::new(10, vec![1, 2, 4])).unwrap();
    map.insert_way(Way::new(11, vec![1, 3, 4])).unwrap();
    map.insert_way(Way::new(12, vec![4, 1])).unwrap();
    map.insert_relation(Relation::lanelet(20, 11, 12)).unwrap();

    let result = map.deduplicate_ways();

    assert_eq!(result.removed, 1);
    assert_eq!(result.duplicate_groups, 1);
    assert!(map.way(11).is_none());
    assert_eq!(map.relation(20).unwrap().boundaries(), Some((10, 12)));
}

#[test]
fn test_deduplicate_points_keeps_first_seen_not_lowest_id() {
    let mut map = LaneletMap::new();
    map.insert_point(MapPoint::new(50, 1.0, 2.0)).unwrap();
    map.insert_point(MapPoint::new(7, 1.0, 2.0)).unwrap();
    map.insert_point(MapPoint::new(8, 1.5, 2.5)).unwrap();
    map.insert_way(Way::new(5, vec![7, 8])).unwrap();

    let result = map.deduplicate_points();

    assert_eq!(result.removed, 1);
    assert_eq!(map.way(5).unwrap().points, vec![50, 8]);
    assert!(map.point(7).is_none());
    assert!(map.point(50).is_some());
}

#[test]
fn test_deduplicate_ways_keeps_first_seen_not_lowest_id() {
    let mut map = LaneletMap::new();
    for (id, lat) in [(1, 1.0), (2, 1.1), (3, 1.2), (4, 1.3)] {
        map.insert_point(MapPoint::new(id, lat, 2.0)).unwrap();
    }
    map.insert_way(Way::new(90, vec![1, 2, 4])).unwrap();
    map.insert_way(Way::new(10, vec![1, 3, 4])).unwrap();
    map.insert_way(Way::new(11, vec![4, 1])).unwrap();
    map.insert_relation(Relation::lanelet(20, 10, 11)).unwrap();

    let result = map.deduplicate_ways();

    assert_eq!(result.removed, 1);
    assert!(map.way(10).is_none());
    assert!(map.way(90).is_some());
    assert_eq!(map.relation(20).unwrap().boundaries(), Some((90, 11)));
}

#[test]
fn test_deduplicate_points_in_one_long_way() {
    // Jeder zweite Punkt liegt auf seinem Vorgänger
    let n = 2_000u64;
    let mut map = LaneletMap::new();
    for id in 1..=n {
        let lat = 28.0 + ((id + 1) / 2) as f64 * 1e-5;
        map.insert_point(MapPoint::new(id, lat, -81.8)).unwrap();
    }
    map.insert_way(Way::new(n + 1, (1..=n).collect())).unwrap();

    let result = map.deduplicate_points();

    assert_eq!(result.removed as u64, n / 2);
    assert!(result.skipped.is_empty());
    assert_eq!(map.point_count() as u64, n / 2);
    let way = map.way(n + 1).unwrap();
    assert_eq!(way.points.len() as u64, n);
    assert!(way.points.iter().all(|id| map.point(*id).is_some()));
    assert_eq!(map.referrer_count(EntityKind::Point, 2), 0);
    assert_eq!(map.count_duplicate_points(), (0, 0));
    assert_eq!(map.ways_using_point(1), vec![n + 1]);
}

#[test]
fn test_merge_point_requires_distinct_ids() {
    let mut map = doubled_centerline_map();
    assert!(matches!(map.merge_point(1, 1), Err(MapError::MalformedRecord { .. })));
    assert!(matches!(map.merge_point(1, 99), Err(MapError::NotFound { .. })));
    assert_eq!(map.merge_point(1, 3), Ok(1));
    assert_eq!(map.way(101).unwrap().points, vec![1, 4]);
}

#[test]
fn test_remove_orphaned_points_is_idempotent() {
    let mut map = doubled_centerline_map();
    map.insert_point(MapPoint::new(90, 0.0, 0.0)).unwrap();
    map.insert_point(MapPoint::new(91, 0.0, 0.1)).unwrap();
    map.insert_point(MapPoint::new(92, 0.0, 0.2)).unwrap();
    map.insert_relation(Relation::new(
        93,
        vec![Member::new(EntityKind::Point, 92, "position")],
    ))
    .unwrap();

    assert_eq!(map.remove_orphaned_points(), 2);
    assert!(map.point(92).is_some());
    assert_eq!(map.remove_orphaned_points(), 0);
    assert_eq!(map.point_count(), 7);
}

// ── Split ───────────────────────────────────────────────────────────

#[test]
fn test_split_preserves_length_and_order() {
    let mut map = straight_lanelet_map(31, 10.0);
    let settings = SplitSettings::default();
    let projection = LocalProjection::new(settings.reference_latitude);
    let original_left = way_length(&map, 5000, &projection);
    let original_points = map.way(5000).unwrap().points.clone();

    let result = map.split_lanelet_by_distance(6000, &settings).unwrap();

    assert_eq!(result.segments, 2);
    assert_eq!(result.new_lanelets.len(), 2);
    assert_eq!(result.removed_ways, vec![5000, 5001]);
    assert!(map.relation(6000).is_none());

    let left_pieces: Vec<u64> = result
        .new_lanelets
        .iter()
        .map(|id| map.relation(*id).unwrap().boundary(BoundarySide::Left).unwrap())
        .collect();
    let total: f64 = left_pieces
        .iter()
        .map(|id| way_length(&map, *id, &projection))
        .sum();
    assert_relative_eq!(total, original_left, epsilon = 1e-6);

    let mut joined: Vec<u64> = Vec::new();
    for id in &left_pieces {
        let points = &map.way(*id).unwrap().points;
        if joined.last() == points.first() {
            joined.extend(&points[1..]);
        } else {
            joined.extend(points);
        }
    }
    assert_eq!(joined, original_points);
}

#[test]
fn test_split_expands_referring_relations() {
    let mut map = straight_lanelet_map(31, 10.0);
    map.insert_relation(Relation::regulatory_element(7000, &[6000]))
        .unwrap();

    let result = map
        .split_lanelet_by_distance(6000, &SplitSettings::default())
        .unwrap();

    let refers: Vec<u64> = map
        .relation(7000)
        .unwrap()
        .member_ids(EntityKind::Relation)
        .collect();
    assert_eq!(refers, result.new_lanelets);
}

#[test]
fn test_split_short_lanelet_is_noop() {
    let mut map = straight_lanelet_map(10, 10.0);
    let result = map
        .split_lanelet_by_distance(6000, &SplitSettings::default())
        .unwrap();
    assert_eq!(result.segments, 1);
    assert!(result.new_lanelets.is_empty());
    assert!(map.relation(6000).is_some());
    assert_eq!(map.way_count(), 2);
}

#[test]
fn test_split_rejects_non_lanelet() {
    let mut map = straight_lanelet_map(10, 10.0);
    map.insert_relation(Relation::regulatory_element(7000, &[6000]))
        .unwrap();
    assert!(matches!(
        map.split_lanelet_by_distance(7000, &SplitSettings::default()),
        Err(MapError::MalformedRecord { .. })
    ));
    assert!(matches!(
        map.split_lanelet_by_distance(1234, &SplitSettings::default()),
        Err(MapError::NotFound { .. })
    ));
}

#[test]
fn test_lanelet_lengths_recommend_segments() {
    let map = straight_lanelet_map(41, 10.0);
    let lengths = map.lanelet_lengths(&SplitSettings::default());

    assert_eq!(lengths.len(), 1);
    assert_relative_eq!(lengths[0].mean_length_m, 400.0, epsilon = 1e-6);
    assert_eq!(lengths[0].recommended_segments, 3);
    assert!(lengths[0].too_close_points.is_empty());
}

#[test]
fn test_split_overlong_lanelets() {
    let mut map = straight_lanelet_map(41, 10.0);
    let result = map.split_overlong_lanelets(&SplitSettings::default());

    assert!(result.batch.is_clean());
    assert_eq!(result.splits.len(), 1);
    assert_eq!(map.lanelet_count(), 3);
}

// ── Offset ──────────────────────────────────────────────────────────

#[test]
fn test_apply_offset_shifts_points_and_reference() {
    let mut map = doubled_centerline_map();
    map.geo_reference = Some(GeoReference::new(
        "+proj=tmerc +lat_0=28.1 +lon_0=-81.8 +k=1 +units=m +no_defs",
    ));
    let before = map.point(1).unwrap().clone();

    let result = map.apply_offset(0.001, -0.002);

    assert!(result.geo_reference_updated);
    assert_eq!(result.shifted_points, 6);
    let geo = map.geo_reference.as_ref().unwrap();
    assert_relative_eq!(geo.lat_0().unwrap(), 28.101, epsilon = 1e-9);
    assert_relative_eq!(geo.lon_0().unwrap(), -81.802, epsilon = 1e-9);

    let after = map.point(1).unwrap();
    assert_relative_eq!(after.lat, before.lat + 0.001);
    assert_relative_eq!(after.lon, before.lon - 0.002);
    assert_eq!(after.attributes.get_raw("lat"), Some(after.lat.to_string().as_str()));
    assert_eq!(map.way(100).unwrap().points, vec![1, 2]);
}

#[test]
fn test_apply_metric_offset() {
    let mut map = doubled_centerline_map();
    let before = map.point(1).unwrap().clone();

    let result = map.apply_metric_offset(-1.5, 1.5, 28.1185796);

    let projection = LocalProjection::new(28.1185796);
    let delta = projection.to_local(result.d_lat, result.d_lon);
    assert_relative_eq!(delta.x, -1.5, epsilon = 1e-9);
    assert_relative_eq!(delta.y, 1.5, epsilon = 1e-9);
    assert!(!result.geo_reference_updated);
    assert_relative_eq!(map.point(1).unwrap().lat, before.lat + result.d_lat);
}

// ── Lanelet-Bearbeitung ─────────────────────────────────────────────

#[test]
fn test_reverse_lanelets_reverses_shared_way_once() {
    let mut map = doubled_centerline_map();
    let report: BatchReport = map.reverse_lanelets(&[1000, 2000, 4242]);

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(map.way(100).unwrap().points, vec![2, 1]);
    assert_eq!(map.way(101).unwrap().points, vec![4, 3]);
    assert_eq!(map.way(102).unwrap().points, vec![6, 5]);
}

#[test]
fn test_reverse_lanelet_twice_restores() {
    let mut map = doubled_centerline_map();
    assert_eq!(map.reverse_lanelet(1000).unwrap(), vec![100, 101]);
    map.reverse_lanelet(1000).unwrap();
    assert_eq!(map.way(100).unwrap().points, vec![1, 2]);
}

#[test]
fn test_remove_lanelet_keeps_shared_way() {
    let mut map = doubled_centerline_map();
    map.insert_relation(Relation::regulatory_element(3000, &[2000]))
        .unwrap();

    let removal = map.remove_lanelet(2000, true).unwrap();

    assert_eq!(removal.removed_ways, vec![102]);
    assert_eq!(removal.removed_relations, vec![3000]);
    assert_eq!(removal.removed_points, 2);
    assert!(map.way(100).is_some());
    assert!(map.point(5).is_none());
    assert_eq!(map.relation_count(), 1);
}

#[test]
fn test_remove_lanelets_except() {
    let mut map = doubled_centerline_map();
    let removal = map.remove_lanelets_except(&[1000]);

    assert!(removal.batch.is_clean());
    assert_eq!(removal.removed_lanelets, vec![2000]);
    assert_eq!(removal.removed_points, 2);
    assert_eq!(map.lanelet_count(), 1);
    assert_eq!(map.way_count(), 2);
}

#[test]
fn test_remove_points_strips_way_refs() {
    let mut map = LaneletMap::new();
    for id in 1..=4 {
        map.insert_point(MapPoint::new(id, id as f64, 0.0)).unwrap();
    }
    map.insert_way(Way::new(10, vec![1, 2, 3])).unwrap();
    map.insert_way(Way::new(11, vec![3, 4])).unwrap();

    let report = map.remove_points(&[2, 4, 77]);

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped(), 2);
    assert_eq!(map.way(10).unwrap().points, vec![1, 3]);
    assert!(map.point(4).is_some());
    assert!(matches!(
        report.failures[0],
        MapError::MalformedRecord { id: 4, .. }
    ));
}

#[test]
fn test_make_ways_dashed() {
    let mut map = doubled_centerline_map();
    let report = map.make_ways_dashed(&[100, 555], "dashed");

    assert_eq!(report.succeeded, 1);
    assert_eq!(
        crate::core::attributes::tag_value(&map.way(100).unwrap().tags, "subtype").as_deref(),
        Some("dashed")
    );
}

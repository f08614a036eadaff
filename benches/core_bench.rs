use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lanelet_map_repair::core::SplitSettings;
use lanelet_map_repair::{parse_osm_map, write_osm_map, LaneletMap, MapPoint, Relation, Way};
use std::hint::black_box;

fn bench_xml_parsing(c: &mut Criterion) {
    let xml_content = include_str!("../tests/fixtures/small_lanelets.osm");

    c.bench_function("osm_parse_small_lanelets", |b| {
        b.iter(|| {
            let parsed = parse_osm_map(black_box(xml_content)).expect("OSM parse failed");
            black_box(parsed.map.point_count())
        })
    });
}

/// Reihe nebeneinanderliegender Lanelets; Nachbarn teilen sich jeweils einen Rand,
/// jeder Punkt hat ein Duplikat.
fn build_synthetic_map(lanelet_count: u64, points_per_way: u64) -> LaneletMap {
    let mut map = LaneletMap::new();
    let step = 10.0 / lanelet_map_repair::shared::METERS_PER_DEGREE_LAT;
    let mut next_id = 1;

    let mut boundaries = Vec::new();
    for column in 0..=lanelet_count {
        let lon = -81.8 + column as f64 * 0.00004;
        let mut points = Vec::new();
        for row in 0..points_per_way {
            let lat = 28.0 + row as f64 * step;
            for _ in 0..2 {
                map.insert_point(MapPoint::new(next_id, lat, lon))
                    .expect("Punkt einfügbar");
                next_id += 1;
            }
            points.push(next_id - 1);
        }
        let way_id = next_id;
        next_id += 1;
        map.insert_way(Way::new(way_id, points)).expect("Way einfügbar");
        boundaries.push(way_id);
    }

    for pair in boundaries.windows(2) {
        map.insert_relation(Relation::lanelet(next_id, pair[0], pair[1]))
            .expect("Lanelet einfügbar");
        next_id += 1;
    }
    map
}

fn bench_repairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("repairs");

    for &lanelet_count in &[100u64, 1_000u64] {
        let map = build_synthetic_map(lanelet_count, 40);

        group.bench_with_input(
            BenchmarkId::new("fix_doubled", lanelet_count),
            &map,
            |b, map| {
                b.iter(|| {
                    let mut map = map.clone();
                    black_box(map.resolve_all_doubled_boundaries().resolutions.len())
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("dedup_points", lanelet_count),
            &map,
            |b, map| {
                b.iter(|| {
                    let mut map = map.clone();
                    black_box(map.deduplicate_points().removed)
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("split_overlong", lanelet_count),
            &map,
            |b, map| {
                b.iter(|| {
                    let mut map = map.clone();
                    black_box(map.split_overlong_lanelets(&SplitSettings::default()).splits.len())
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("write_osm", lanelet_count),
            &map,
            |b, map| b.iter(|| black_box(write_osm_map(map).expect("Export").len())),
        );
    }

    group.finish();
}

criterion_group!(core_benches, bench_xml_parsing, bench_repairs);
criterion_main!(core_benches);

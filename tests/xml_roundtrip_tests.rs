use lanelet_map_repair::core::DocumentItem;
use lanelet_map_repair::{parse_osm_map, write_osm_map, LaneletMap};

const FIXTURE: &str = include_str!("fixtures/small_lanelets.osm");

fn topology(map: &LaneletMap) -> (Vec<u64>, Vec<(u64, Vec<u64>)>, Vec<(u64, Vec<(u64, String)>)>) {
    let points = map.points().map(|p| p.id).collect();
    let ways = map.ways().map(|w| (w.id, w.points.clone())).collect();
    let relations = map
        .relations()
        .map(|r| {
            (
                r.id,
                r.members.iter().map(|m| (m.id, m.role.clone())).collect(),
            )
        })
        .collect();
    (points, ways, relations)
}

#[test]
fn test_roundtrip_preserves_topology() {
    let parsed = parse_osm_map(FIXTURE).expect("Initiales Parsing fehlgeschlagen");
    assert!(parsed.skipped.is_empty());

    let written = write_osm_map(&parsed.map).expect("XML-Export fehlgeschlagen");
    let reparsed = parse_osm_map(&written).expect("Re-Parsing fehlgeschlagen");

    assert!(reparsed.skipped.is_empty());
    assert_eq!(topology(&parsed.map), topology(&reparsed.map));
    assert_eq!(parsed.map.max_id(), reparsed.map.max_id());
    assert_eq!(parsed.map.lanelet_count(), 2);
}

#[test]
fn test_second_roundtrip_is_byte_identical() {
    let first = write_osm_map(&parse_osm_map(FIXTURE).expect("Parsing").map).expect("Export");
    let second = write_osm_map(&parse_osm_map(&first).expect("Re-Parsing").map).expect("Export");
    assert_eq!(first, second);
}

#[test]
fn test_roundtrip_keeps_raw_text() {
    let parsed = parse_osm_map(FIXTURE).expect("Parsing fehlgeschlagen");
    let written = write_osm_map(&parsed.map).expect("XML-Export fehlgeschlagen");

    // Unbekannte Attribute und unveränderte Koordinaten bleiben wörtlich erhalten
    assert!(written.contains(
        "<node id=\"2\" action=\"modify\" visible=\"true\" version=\"2\" lat=\"28.10002\" lon=\"-81.79990\"/>"
    ));
    assert!(written.contains("<tag k=\"name\" v=\"Main &amp; 1st\"/>"));
    assert!(written.contains("<member type=\"node\" ref=\"30\" role=\"position\"/>"));
    assert!(written.contains("<osm version=\"0.6\" generator=\"JOSM\">"));
    assert!(written.contains("+lat_0=28.1 +lon_0=-81.8 +k=1"));
    assert!(written.contains("<!-- Export aus dem Kartenwerkzeug -->"));
    assert!(written.trim_end().ends_with("</changeset>\n</osm>"));

    let way = parsed.map.way(200).expect("Way 200 erwartet");
    assert_eq!(way.tags[0].value, "Main &amp; 1st");
    assert_eq!(way.tags_before_points, 1);
}

#[test]
fn test_tag_order_relative_to_children_survives() {
    let parsed = parse_osm_map(FIXTURE).expect("Parsing fehlgeschlagen");
    let written = write_osm_map(&parsed.map).expect("XML-Export fehlgeschlagen");

    let relation_start = written
        .find("<relation id=\"3000\"")
        .expect("Relation 3000 erwartet");
    let relation = &written[relation_start..];
    let tag_pos = relation.find("regulatory_element").expect("Tag erwartet");
    let member_pos = relation.find("<member").expect("Member erwartet");
    assert!(tag_pos < member_pos);
}

#[test]
fn test_leading_items_keep_order() {
    let parsed = parse_osm_map(FIXTURE).expect("Parsing fehlgeschlagen");
    let leading = &parsed.map.meta.leading;

    assert_eq!(leading.len(), 3);
    assert_eq!(leading[0], DocumentItem::GeoReference);
    assert!(matches!(&leading[1], DocumentItem::Raw(raw) if raw.starts_with("<bounds")));
    assert!(matches!(&leading[2], DocumentItem::Raw(raw) if raw.starts_with("<!--")));
    assert_eq!(parsed.map.meta.trailing.len(), 1);
}

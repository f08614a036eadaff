#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(parsed) = lanelet_map_repair::parse_osm_map(text) else {
        return;
    };

    // Was eingelesen wurde, muss sich schreiben und erneut einlesen lassen
    let written = lanelet_map_repair::write_osm_map(&parsed.map).expect("Export darf nicht scheitern");
    let reparsed = lanelet_map_repair::parse_osm_map(&written).expect("Re-Parsing darf nicht scheitern");
    assert_eq!(parsed.map.point_count(), reparsed.map.point_count());
    assert_eq!(parsed.map.way_count(), reparsed.map.way_count());
    assert_eq!(parsed.map.relation_count(), reparsed.map.relation_count());
});

//! Writer für Lanelet2-OSM-Dateien.

use crate::core::{Attributes, DocumentItem, LaneletMap, Member, Tag};
use anyhow::Result;

const INDENT: &str = "  ";

/// Schreibt eine LaneletMap als OSM-XML.
///
/// Attribute, Tags und Rollen werden im Rohformat übernommen, unbekannte
/// Top-Level-Elemente an ihrer ursprünglichen Position.
pub fn write_osm_map(map: &LaneletMap) -> Result<String> {
    let mut output = String::new();
    output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    output.push_str(&format!("<osm{}>\n", attribute_text(&map.meta.root_attributes)));

    let mut geo_reference_written = false;
    for item in &map.meta.leading {
        match item {
            DocumentItem::GeoReference => {
                if let Some(geo) = &map.geo_reference {
                    if !geo_reference_written {
                        output.push_str(&format!(
                            "{INDENT}<geoReference>{}</geoReference>\n",
                            geo.raw
                        ));
                        geo_reference_written = true;
                    }
                }
            }
            DocumentItem::Raw(raw) => output.push_str(&format!("{INDENT}{raw}\n")),
        }
    }
    // Programmatisch gesetzte GeoReference ohne Platzhalter
    if let (Some(geo), false) = (&map.geo_reference, geo_reference_written) {
        output.push_str(&format!("{INDENT}<geoReference>{}</geoReference>\n", geo.raw));
    }

    for point in map.points() {
        let attrs = attribute_text(&point.attributes);
        if point.tags.is_empty() {
            output.push_str(&format!("{INDENT}<node{attrs}/>\n"));
        } else {
            output.push_str(&format!("{INDENT}<node{attrs}>\n"));
            write_tags(&mut output, &point.tags);
            output.push_str(&format!("{INDENT}</node>\n"));
        }
    }

    for way in map.ways() {
        let split = way.tags_before_points.min(way.tags.len());
        output.push_str(&format!("{INDENT}<way{}>\n", attribute_text(&way.attributes)));
        write_tags(&mut output, &way.tags[..split]);
        for point_id in &way.points {
            output.push_str(&format!("{INDENT}{INDENT}<nd ref=\"{point_id}\"/>\n"));
        }
        write_tags(&mut output, &way.tags[split..]);
        output.push_str(&format!("{INDENT}</way>\n"));
    }

    for relation in map.relations() {
        let split = relation.tags_before_members.min(relation.tags.len());
        output.push_str(&format!(
            "{INDENT}<relation{}>\n",
            attribute_text(&relation.attributes)
        ));
        write_tags(&mut output, &relation.tags[..split]);
        for member in &relation.members {
            write_member(&mut output, member);
        }
        write_tags(&mut output, &relation.tags[split..]);
        output.push_str(&format!("{INDENT}</relation>\n"));
    }

    for raw in &map.meta.trailing {
        output.push_str(&format!("{INDENT}{raw}\n"));
    }

    output.push_str("</osm>\n");
    Ok(output)
}

fn write_tags(output: &mut String, tags: &[Tag]) {
    for tag in tags {
        output.push_str(&format!(
            "{INDENT}{INDENT}<tag k={} v={}/>\n",
            quote(&tag.key),
            quote(&tag.value)
        ));
    }
}

fn write_member(output: &mut String, member: &Member) {
    output.push_str(&format!(
        "{INDENT}{INDENT}<member type=\"{}\" ref=\"{}\" role={}/>\n",
        member.kind.member_type(),
        member.id,
        quote(&member.role)
    ));
}

/// ` key="value"` für alle Attribute in Original-Reihenfolge
fn attribute_text(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!(" {}={}", key, quote(value)))
        .collect()
}

/// Setzt einen escapten Rohwert in Anführungszeichen; enthält er `"`, in einfache.
fn quote(raw: &str) -> String {
    if raw.contains('"') {
        format!("'{}'", raw)
    } else {
        format!("\"{}\"", raw)
    }
}

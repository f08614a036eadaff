//! Parser für Lanelet2-OSM-Dateien.

mod records;

use crate::core::error::not_found;
use crate::core::{
    DocumentItem, EntityKind, GeoReference, LaneletMap, MapError, Relation, Way,
};
use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use records::{raw_attributes, PendingRecord};
use std::collections::HashSet;

/// Ergebnis des Einlesens: die Karte und alle übersprungenen Datensätze.
#[derive(Debug, Clone)]
pub struct ParsedMap {
    pub map: LaneletMap,
    /// Datensätze, die wegen fehlender/ungültiger Angaben oder offener
    /// Referenzen nicht übernommen wurden
    pub skipped: Vec<MapError>,
}

/// Roh eingelesene Elemente vor dem Einfügen in die Karte
#[derive(Default)]
struct Collected {
    ways: Vec<Way>,
    relations: Vec<Relation>,
    entity_seen: bool,
}

/// Parsed eine Lanelet2-Karte aus einem OSM-XML-String.
///
/// XML-Syntaxfehler brechen ab; fehlerhafte Einzel-Datensätze werden
/// übersprungen und in [`ParsedMap::skipped`] gemeldet.
pub fn parse_osm_map(xml_content: &str) -> Result<ParsedMap> {
    let mut reader = Reader::from_str(xml_content);
    reader.config_mut().trim_text(true);

    let mut buffer = Vec::new();
    let mut map = LaneletMap::new();
    let mut skipped: Vec<MapError> = Vec::new();
    let mut collected = Collected::default();
    let mut current: Option<PendingRecord> = None;
    let mut root_seen = false;

    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                let tag = reader.decoder().decode(name.as_ref())?.into_owned();

                if !root_seen {
                    if tag != "osm" {
                        anyhow::bail!("Root-Element <osm> erwartet, gefunden: <{}>", tag);
                    }
                    map.meta.root_attributes = raw_attributes(&reader, e)?;
                    root_seen = true;
                } else if let Some(record) = current.as_mut() {
                    // Verschachtelte Kindelemente mit Inhalt werden nicht unterstützt
                    let attributes = raw_attributes(&reader, e)?;
                    record.add_child(&tag, &attributes);
                    reader
                        .read_to_end_into(name, &mut Vec::new())
                        .with_context(|| format!("Element <{}> nicht abgeschlossen", tag))?;
                } else if tag == "geoReference" {
                    let raw = reader
                        .read_text(name)
                        .context("<geoReference> nicht abgeschlossen")?;
                    map.geo_reference = Some(GeoReference::new(raw.into_owned()));
                    map.meta.leading.push(DocumentItem::GeoReference);
                } else if let Some(record) = PendingRecord::begin(&tag, raw_attributes(&reader, e)?) {
                    current = Some(record);
                    collected.entity_seen = true;
                } else {
                    let span = reader
                        .read_to_end(name)
                        .with_context(|| format!("Element <{}> nicht abgeschlossen", tag))?;
                    let inner = &xml_content[span.start as usize..span.end as usize];
                    let raw = format!("<{}>{}</{}>", start_text(&reader, e)?, inner, tag);
                    push_unknown(&mut map, &collected, raw);
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let tag = reader.decoder().decode(name.as_ref())?.into_owned();

                if !root_seen {
                    // Leere Karte: <osm .../>
                    if tag != "osm" {
                        anyhow::bail!("Root-Element <osm> erwartet, gefunden: <{}/>", tag);
                    }
                    map.meta.root_attributes = raw_attributes(&reader, e)?;
                    root_seen = true;
                } else if let Some(record) = current.as_mut() {
                    record.add_child(&tag, &raw_attributes(&reader, e)?);
                } else if tag == "geoReference" {
                    map.geo_reference = Some(GeoReference::new(""));
                    map.meta.leading.push(DocumentItem::GeoReference);
                } else if let Some(record) = PendingRecord::begin(&tag, raw_attributes(&reader, e)?) {
                    collected.entity_seen = true;
                    finish_record(record, &mut map, &mut collected, &mut skipped);
                } else {
                    let raw = format!("<{}/>", start_text(&reader, e)?);
                    push_unknown(&mut map, &collected, raw);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let tag = reader.decoder().decode(name.as_ref())?;
                if matches!(tag.as_ref(), "node" | "way" | "relation") {
                    if let Some(record) = current.take() {
                        finish_record(record, &mut map, &mut collected, &mut skipped);
                    }
                }
            }
            Ok(Event::Comment(ref e)) => {
                if root_seen && current.is_none() {
                    let text = reader.decoder().decode(e.as_ref())?;
                    let raw = format!("<!--{}-->", text);
                    push_unknown(&mut map, &collected, raw);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err).context("Fehler beim Parsen des XML"),
            _ => {}
        }

        buffer.clear();
    }

    if !root_seen {
        anyhow::bail!("Kein <osm>-Element gefunden");
    }

    insert_ways(&mut map, collected.ways, &mut skipped);
    insert_relations(&mut map, collected.relations, &mut skipped);

    log::info!(
        "Karte eingelesen: {} Punkte, {} Ways, {} Relationen ({} Lanelets), {} Datensätze übersprungen",
        map.point_count(),
        map.way_count(),
        map.relation_count(),
        map.lanelet_count(),
        skipped.len()
    );

    Ok(ParsedMap { map, skipped })
}

/// Rohtext eines Start-Tags ohne spitze Klammern (`name attr="..."`)
fn start_text(reader: &Reader<&[u8]>, e: &BytesStart) -> Result<String> {
    Ok(reader.decoder().decode(e.as_ref())?.into_owned())
}

fn push_unknown(map: &mut LaneletMap, collected: &Collected, raw: String) {
    if collected.entity_seen {
        map.meta.trailing.push(raw);
    } else {
        map.meta.leading.push(DocumentItem::Raw(raw));
    }
}

/// Schließt einen Datensatz ab. Punkte werden sofort eingefügt,
/// Ways und Relationen erst, wenn alle Punkte bekannt sind.
fn finish_record(
    record: PendingRecord,
    map: &mut LaneletMap,
    collected: &mut Collected,
    skipped: &mut Vec<MapError>,
) {
    match record {
        PendingRecord::Point(pending) => {
            let id = pending.point.id;
            if let Err(err) = map.insert_point(pending.point) {
                skip(skipped, err);
            }
            map.reserve_id(id);
        }
        PendingRecord::Way(pending) => {
            map.reserve_id(pending.way.id);
            match pending.error {
                Some(err) => skip(skipped, err),
                None => collected.ways.push(pending.way),
            }
        }
        PendingRecord::Relation(pending) => {
            map.reserve_id(pending.relation.id);
            for member in &pending.relation.members {
                map.reserve_id(member.id);
            }
            match pending.error {
                Some(err) => skip(skipped, err),
                None => collected.relations.push(pending.relation),
            }
        }
        PendingRecord::Broken(err) => skip(skipped, err),
    }
}

fn skip(skipped: &mut Vec<MapError>, err: MapError) {
    log::warn!("Datensatz übersprungen: {}", err);
    skipped.push(err);
}

fn insert_ways(map: &mut LaneletMap, ways: Vec<Way>, skipped: &mut Vec<MapError>) {
    for way in ways {
        if let Err(err) = map.insert_way(way) {
            skip(skipped, err);
        }
    }
}

/// Fügt Relationen ein. Relationen dürfen auf später definierte Relationen
/// verweisen; wer (auch indirekt) auf Fehlendes verweist, wird übersprungen.
fn insert_relations(map: &mut LaneletMap, relations: Vec<Relation>, skipped: &mut Vec<MapError>) {
    let mut valid: HashSet<u64> = relations.iter().map(|r| r.id).collect();

    loop {
        let before = valid.len();
        for relation in &relations {
            if valid.contains(&relation.id) && unresolved_member(map, &valid, relation).is_some() {
                valid.remove(&relation.id);
            }
        }
        if valid.len() == before {
            break;
        }
    }

    for relation in relations {
        let outcome = match unresolved_member(map, &valid, &relation) {
            Some(err) => Err(err),
            None if valid.contains(&relation.id) => map.insert_relation_resolved(relation),
            None => Err(not_found(EntityKind::Relation, relation.id)),
        };
        if let Err(err) = outcome {
            skip(skipped, err);
        }
    }
}

fn unresolved_member(map: &LaneletMap, valid: &HashSet<u64>, relation: &Relation) -> Option<MapError> {
    relation
        .members
        .iter()
        .find(|m| match m.kind {
            EntityKind::Relation => !valid.contains(&m.id),
            kind => !map.contains(kind, m.id),
        })
        .map(|m| not_found(m.kind, m.id))
}

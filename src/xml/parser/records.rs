//! Aufbau einzelner Datensätze (`node`, `way`, `relation`) aus XML-Attributen.

use crate::core::error::malformed;
use crate::core::{Attributes, EntityKind, MapError, MapPoint, Member, Relation, Tag, Way};
use anyhow::Result;
use quick_xml::events::BytesStart;
use quick_xml::Reader;

/// Liest alle Attribute eines Elements als (Schlüssel, escapter Rohwert).
pub(super) fn raw_attributes(reader: &Reader<&[u8]>, e: &BytesStart) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = reader.decoder().decode(attr.key.as_ref())?;
        let value = reader.decoder().decode(&attr.value)?;
        attributes.push_raw(key.into_owned(), value.into_owned());
    }
    Ok(attributes)
}

fn parse_number<T: std::str::FromStr>(
    attributes: &Attributes,
    key: &str,
    entity: EntityKind,
    id: u64,
) -> Result<T, MapError> {
    let raw = attributes
        .get(key)
        .ok_or_else(|| malformed(entity, id, format!("Attribut '{}' fehlt", key)))?;
    raw.trim()
        .parse()
        .map_err(|_| malformed(entity, id, format!("Attribut '{}' ungültig: '{}'", key, raw)))
}

fn parse_id(attributes: &Attributes, entity: EntityKind) -> Result<u64, MapError> {
    parse_number(attributes, "id", entity, 0)
}

/// Ein Datensatz, dessen Kindelemente noch gelesen werden.
#[derive(Debug)]
pub(super) enum PendingRecord {
    Point(PendingPoint),
    Way(PendingWay),
    Relation(PendingRelation),
    /// Fehlerhafter Datensatz; Kindelemente werden bis zum End-Tag übersprungen
    Broken(MapError),
}

#[derive(Debug)]
pub(super) struct PendingPoint {
    pub point: MapPoint,
}

#[derive(Debug)]
pub(super) struct PendingWay {
    pub way: Way,
    /// Erster Fehler eines `<nd>`-Eintrags
    pub error: Option<MapError>,
}

#[derive(Debug)]
pub(super) struct PendingRelation {
    pub relation: Relation,
    pub error: Option<MapError>,
}

impl PendingRecord {
    /// Beginnt einen Datensatz für das Element `tag`; `None` für unbekannte Elemente.
    pub fn begin(tag: &str, attributes: Attributes) -> Option<Self> {
        let record = match tag {
            "node" => Self::begin_point(attributes),
            "way" => parse_id(&attributes, EntityKind::Way).map(|id| {
                PendingRecord::Way(PendingWay {
                    way: Way {
                        id,
                        points: Vec::new(),
                        attributes,
                        tags: Vec::new(),
                        tags_before_points: 0,
                    },
                    error: None,
                })
            }),
            "relation" => parse_id(&attributes, EntityKind::Relation).map(|id| {
                PendingRecord::Relation(PendingRelation {
                    relation: Relation {
                        id,
                        members: Vec::new(),
                        attributes,
                        tags: Vec::new(),
                        tags_before_members: 0,
                    },
                    error: None,
                })
            }),
            _ => return None,
        };
        Some(record.unwrap_or_else(PendingRecord::Broken))
    }

    fn begin_point(attributes: Attributes) -> Result<Self, MapError> {
        let id = parse_id(&attributes, EntityKind::Point)?;
        let lat: f64 = parse_number(&attributes, "lat", EntityKind::Point, id)?;
        let lon: f64 = parse_number(&attributes, "lon", EntityKind::Point, id)?;
        Ok(PendingRecord::Point(PendingPoint {
            point: MapPoint {
                id,
                lat,
                lon,
                attributes,
                tags: Vec::new(),
            },
        }))
    }

    /// Verarbeitet ein Kindelement (`tag`, `nd`, `member`).
    pub fn add_child(&mut self, tag: &str, attributes: &Attributes) {
        match (self, tag) {
            (PendingRecord::Point(p), "tag") => p.point.tags.push(raw_tag(attributes)),
            (PendingRecord::Way(w), "tag") => {
                if w.way.points.is_empty() {
                    w.way.tags_before_points += 1;
                }
                w.way.tags.push(raw_tag(attributes));
            }
            (PendingRecord::Way(w), "nd") => {
                match parse_number::<u64>(attributes, "ref", EntityKind::Way, w.way.id) {
                    Ok(point_id) => w.way.points.push(point_id),
                    Err(err) => {
                        w.error.get_or_insert(err);
                    }
                }
            }
            (PendingRecord::Relation(r), "tag") => {
                if r.relation.members.is_empty() {
                    r.relation.tags_before_members += 1;
                }
                r.relation.tags.push(raw_tag(attributes));
            }
            (PendingRecord::Relation(r), "member") => {
                match parse_member(attributes, r.relation.id) {
                    Ok(member) => r.relation.members.push(member),
                    Err(err) => {
                        r.error.get_or_insert(err);
                    }
                }
            }
            (record, other) => {
                log::debug!("Unbekanntes Kindelement <{}> in {:?} ignoriert", other, record.kind());
            }
        }
    }

    fn kind(&self) -> Option<EntityKind> {
        match self {
            PendingRecord::Point(_) => Some(EntityKind::Point),
            PendingRecord::Way(_) => Some(EntityKind::Way),
            PendingRecord::Relation(_) => Some(EntityKind::Relation),
            PendingRecord::Broken(_) => None,
        }
    }
}

fn raw_tag(attributes: &Attributes) -> Tag {
    Tag::from_raw(
        attributes.get_raw("k").unwrap_or_default().to_string(),
        attributes.get_raw("v").unwrap_or_default().to_string(),
    )
}

fn parse_member(attributes: &Attributes, relation_id: u64) -> Result<Member, MapError> {
    let member_type = attributes.get("type").unwrap_or_default();
    let kind = EntityKind::from_member_type(&member_type).ok_or_else(|| {
        malformed(
            EntityKind::Relation,
            relation_id,
            format!("unbekannter Member-Typ '{}'", member_type),
        )
    })?;
    let id = parse_number(attributes, "ref", EntityKind::Relation, relation_id)?;
    Ok(Member {
        kind,
        id,
        role: attributes.get_raw("role").unwrap_or_default().to_string(),
    })
}

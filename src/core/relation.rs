//! Relationen (`<relation>`): Lanelets, Regulatory Elements und sonstige.

use super::attributes::tag_value;
use super::{Attributes, EntityKind, Tag};

/// Rolle des linken Randes eines Lanelets
pub const ROLE_LEFT: &str = "left";
/// Rolle des rechten Randes eines Lanelets
pub const ROLE_RIGHT: &str = "right";
/// Rolle, mit der Regulatory Elements auf Lanelets verweisen
pub const ROLE_REFERS: &str = "refers";

/// Seite eines Lanelet-Randes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySide {
    Left,
    Right,
}

impl BoundarySide {
    pub fn role(self) -> &'static str {
        match self {
            BoundarySide::Left => ROLE_LEFT,
            BoundarySide::Right => ROLE_RIGHT,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            BoundarySide::Left => BoundarySide::Right,
            BoundarySide::Right => BoundarySide::Left,
        }
    }
}

/// Ein `<member type=".." ref=".." role=".."/>`-Eintrag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Art des referenzierten Elements
    pub kind: EntityKind,
    /// ID des referenzierten Elements
    pub id: u64,
    /// Rolle (escapter Rohwert)
    pub role: String,
}

impl Member {
    pub fn new(kind: EntityKind, id: u64, role: &str) -> Self {
        Self {
            kind,
            id,
            role: role.to_string(),
        }
    }

    /// Ist dies eine Rand-Referenz (`way` mit Rolle left/right)?
    pub fn boundary_side(&self) -> Option<BoundarySide> {
        if self.kind != EntityKind::Way {
            return None;
        }
        match self.role.as_str() {
            ROLE_LEFT => Some(BoundarySide::Left),
            ROLE_RIGHT => Some(BoundarySide::Right),
            _ => None,
        }
    }
}

/// Fachliche Einordnung einer Relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Fahrstreifen mit genau einem linken und einem rechten Rand
    Lanelet { left: u64, right: u64 },
    /// `type=regulatory_element`
    RegulatoryElement,
    /// Alles andere (wird unverändert durchgereicht)
    Other,
}

/// Eine Relation der Karte
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Eindeutige ID
    pub id: u64,
    /// Mitglieder in Original-Reihenfolge
    pub members: Vec<Member>,
    /// Alle Attribute in Original-Reihenfolge
    pub attributes: Attributes,
    /// `<tag>`-Kindelemente
    pub tags: Vec<Tag>,
    /// Anzahl Tags, die in der Datei vor den Mitgliedern standen
    pub tags_before_members: usize,
}

impl Relation {
    /// Erstellt eine Relation ohne Tags
    pub fn new(id: u64, members: Vec<Member>) -> Self {
        let mut attributes = Attributes::new();
        attributes.push_raw("id", id.to_string());
        Self {
            id,
            members,
            attributes,
            tags: Vec::new(),
            tags_before_members: 0,
        }
    }

    /// Erstellt ein Lanelet aus zwei Rändern
    pub fn lanelet(id: u64, left: u64, right: u64) -> Self {
        let mut relation = Self::new(
            id,
            vec![
                Member::new(EntityKind::Way, left, ROLE_LEFT),
                Member::new(EntityKind::Way, right, ROLE_RIGHT),
            ],
        );
        relation.tags.push(Tag::new("type", "lanelet"));
        relation
    }

    /// Erstellt ein Regulatory Element, das auf die angegebenen Lanelets verweist
    pub fn regulatory_element(id: u64, refers: &[u64]) -> Self {
        let members = refers
            .iter()
            .map(|&r| Member::new(EntityKind::Relation, r, ROLE_REFERS))
            .collect();
        let mut relation = Self::new(id, members);
        relation.tags.push(Tag::new("type", "regulatory_element"));
        relation.tags_before_members = 1;
        relation
    }

    /// Ordnet die Relation fachlich ein.
    pub fn kind(&self) -> RelationKind {
        if tag_value(&self.tags, "type").as_deref() == Some("regulatory_element") {
            return RelationKind::RegulatoryElement;
        }

        let mut left = None;
        let mut right = None;
        for member in &self.members {
            match member.boundary_side() {
                Some(BoundarySide::Left) => {
                    if left.replace(member.id).is_some() {
                        return RelationKind::Other;
                    }
                }
                Some(BoundarySide::Right) => {
                    if right.replace(member.id).is_some() {
                        return RelationKind::Other;
                    }
                }
                None => {}
            }
        }

        match (left, right) {
            (Some(left), Some(right)) => RelationKind::Lanelet { left, right },
            _ => RelationKind::Other,
        }
    }

    /// Linker und rechter Rand, falls die Relation ein Lanelet ist
    pub fn boundaries(&self) -> Option<(u64, u64)> {
        match self.kind() {
            RelationKind::Lanelet { left, right } => Some((left, right)),
            _ => None,
        }
    }

    pub fn is_lanelet(&self) -> bool {
        matches!(self.kind(), RelationKind::Lanelet { .. })
    }

    /// Rand einer Seite
    pub fn boundary(&self, side: BoundarySide) -> Option<u64> {
        let (left, right) = self.boundaries()?;
        Some(match side {
            BoundarySide::Left => left,
            BoundarySide::Right => right,
        })
    }

    /// Auf welcher Seite `way_id` als Rand verwendet wird
    pub fn side_of(&self, way_id: u64) -> Option<BoundarySide> {
        self.members
            .iter()
            .filter(|m| m.id == way_id)
            .find_map(Member::boundary_side)
    }

    /// Kopie mit neuer ID; Attribute, Tags und Mitglieder bleiben erhalten.
    pub fn derive(&self, id: u64) -> Self {
        let mut copy = self.clone();
        copy.id = id;
        copy.attributes.set("id", &id.to_string());
        copy
    }

    /// Alle referenzierten IDs einer Art
    pub fn member_ids(&self, kind: EntityKind) -> impl Iterator<Item = u64> + '_ {
        self.members
            .iter()
            .filter(move |m| m.kind == kind)
            .map(|m| m.id)
    }
}

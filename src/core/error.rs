//! Fehlerarten der Karten-Operationen.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Art eines Karten-Elements (für Fehlermeldungen und Referenz-Umschreibung).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// `<node>`
    Point,
    /// `<way>`
    Way,
    /// `<relation>`
    Relation,
}

impl EntityKind {
    /// Member-Typ in der OSM-Syntax (`node`, `way`, `relation`).
    pub fn member_type(self) -> &'static str {
        match self {
            EntityKind::Point => "node",
            EntityKind::Way => "way",
            EntityKind::Relation => "relation",
        }
    }

    /// Umkehrung von [`EntityKind::member_type`].
    pub fn from_member_type(value: &str) -> Option<Self> {
        match value {
            "node" => Some(EntityKind::Point),
            "way" => Some(EntityKind::Way),
            "relation" => Some(EntityKind::Relation),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Point => "Punkt",
            EntityKind::Way => "Way",
            EntityKind::Relation => "Relation",
        };
        f.write_str(label)
    }
}

/// Fehler einer einzelnen Karten-Operation.
///
/// Einzeloperationen brechen mit diesem Fehler ab und lassen die Karte unverändert.
/// Batch-Operationen sammeln ihn pro Datensatz in einem [`BatchReport`].
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapError {
    /// Referenziertes Element existiert nicht
    #[error("{entity} {id} nicht gefunden")]
    NotFound { entity: EntityKind, id: u64 },

    /// Strukturell unvollständiger Datensatz (z.B. Way mit weniger als 2 Punkten)
    #[error("Fehlerhafter Datensatz {entity} {id}: {reason}")]
    MalformedRecord {
        entity: EntityKind,
        id: u64,
        reason: String,
    },

    /// Löschversuch eines noch referenzierten Elements
    #[error("{entity} {id} wird noch von {referrers} Element(en) referenziert")]
    ReferentialViolation {
        entity: EntityKind,
        id: u64,
        referrers: usize,
    },
}

pub(crate) fn not_found(entity: EntityKind, id: u64) -> MapError {
    MapError::NotFound { entity, id }
}

pub(crate) fn malformed(entity: EntityKind, id: u64, reason: impl Into<String>) -> MapError {
    MapError::MalformedRecord {
        entity,
        id,
        reason: reason.into(),
    }
}

/// Ergebnis einer Batch-Operation, die bei Einzelfehlern weiterläuft.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Anzahl erfolgreich verarbeiteter Datensätze
    pub succeeded: u32,
    /// Übersprungene Datensätze mit Grund
    pub failures: Vec<MapError>,
}

impl BatchReport {
    /// Verbucht das Ergebnis eines Datensatzes.
    pub fn record<T>(&mut self, result: Result<T, MapError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.succeeded += 1;
                Some(value)
            }
            Err(err) => {
                log::warn!("Datensatz übersprungen: {}", err);
                self.failures.push(err);
                None
            }
        }
    }

    /// Anzahl übersprungener Datensätze.
    pub fn skipped(&self) -> usize {
        self.failures.len()
    }

    /// Prüft ob alle Datensätze verarbeitet wurden.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

//! Core-Domänentypen: Punkte, Ways, Relationen und die LaneletMap.

pub mod attributes;
pub mod error;
/// Core-Datenmodell für Lanelet2-Karten
///
/// Dieses Modul definiert die Haupt-Datenstrukturen:
/// - LaneletMap: Container für alle Punkte, Ways und Relationen samt Indizes
/// - MapPoint: Einzelner Punkt mit geodätischer Position
/// - Way: Gerichteter Linienzug aus Punkt-Referenzen
/// - Relation: Lanelet, Regulatory Element oder sonstige Relation
pub mod lanelet_map;
pub mod meta;
pub mod point;
pub mod relation;
pub mod way;

pub use attributes::{Attributes, Tag};
pub use error::{BatchReport, EntityKind, MapError};
pub use lanelet_map::{
    DeduplicationResult, DoubledBoundaryRecord, DoubledBoundaryReport, DoubledBoundaryResolution,
    LaneletLength, LaneletMap, LaneletRemoval, OffsetResult, SplitBatchResult, SplitResult,
    SplitSettings, WayDeduplicationResult,
};
pub use meta::{DocumentItem, GeoReference, MapMeta};
pub use point::{CoordinateKey, MapPoint};
pub use relation::{BoundarySide, Member, Relation, RelationKind};
pub use way::Way;

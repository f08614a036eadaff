//! Lanelet Map Repair Library.
//! Core-Funktionalität als Library exportiert für Tests und Wiederverwendung.

pub mod app;
pub mod core;
pub mod shared;
pub mod xml;

pub use app::{CommandOutcome, JobFile, MapCommand, MapSession};
pub use core::{
    BatchReport, BoundarySide, EntityKind, GeoReference, LaneletMap, MapError, MapPoint, Member,
    Relation, RelationKind, Way,
};
pub use shared::{LocalProjection, RepairOptions};
pub use xml::{parse_osm_map, write_osm_map, ParsedMap};

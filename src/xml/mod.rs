//! XML Import/Export für Lanelet2-Karten im OSM-Format.
//!
//! Punkte (`<node>`), Ways (`<way>`) und Relationen (`<relation>`) werden in eine
//! [`LaneletMap`](crate::core::LaneletMap) gelesen und zurückgeschrieben.
//! Unbekannte Attribute, Tags und Elemente bleiben im Rohformat erhalten.

pub mod parser;
pub mod writer;

pub use parser::{parse_osm_map, ParsedMap};
pub use writer::write_osm_map;

//! Geteilte, layer-neutrale Bausteine.
//!
//! Enthält Geometrie und Optionen, die zwischen `core`, `app` und der
//! Kommandozeile geteilt werden, um direkte Abhängigkeiten zu vermeiden.

pub mod geo_projection;
pub mod options;

pub use geo_projection::{BoundaryProfile, LocalProjection, METERS_PER_DEGREE_LAT};
pub use options::RepairOptions;

//! Befehle, die eine [`MapSession`](super::MapSession) auf der Karte ausführt.
//!
//! Jeder Befehl ist (de)serialisierbar, damit Job-Dateien eine geordnete
//! Liste von Schritten als TOML beschreiben können:
//!
//! ```toml
//! [[steps]]
//! op = "fix_doubled"
//!
//! [[steps]]
//! op = "split"
//! lanelet = 6000
//! distance = 120.0
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ein einzelner Reparatur- oder Transformationsschritt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MapCommand {
    /// Doppelte Mittellinien erkennen und reparieren
    FixDoubled,
    /// Punkte mit identischer Koordinate zusammenführen
    DedupPoints,
    /// Ways mit identischen Endpunkten zusammenführen
    DedupWays,
    /// Unreferenzierte Punkte löschen
    RemoveOrphans,
    /// Ein Lanelet nach Distanz teilen
    Split {
        lanelet: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance: Option<f64>,
    },
    /// Alle Lanelets über der Ziellänge teilen
    SplitOverlong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance: Option<f64>,
    },
    /// Längen aller Lanelets messen (ohne Änderung)
    Lengths,
    /// Verschiebung in Grad
    Offset { d_lat: f64, d_lon: f64 },
    /// Verschiebung in Metern (Ost/Nord)
    OffsetMeters {
        east: f64,
        north: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference_lat: Option<f64>,
    },
    /// Lanelets umkehren (leere Liste = alle)
    Reverse {
        #[serde(default)]
        lanelets: Vec<u64>,
    },
    /// Ein einzelnes Lanelet samt Rand-Ways entfernen
    RemoveLanelet { lanelet: u64 },
    /// Alle Lanelets außer den angegebenen entfernen
    RemoveLanelets { keep: Vec<u64> },
    /// Punkte löschen und aus Ways austragen
    RemovePoints { points: Vec<u64> },
    /// Einen Punkt in einen anderen überführen
    MergePoint { keep: u64, remove: u64 },
    /// `subtype` der Ways auf gestrichelt setzen
    Dashed { ways: Vec<u64> },
}

impl MapCommand {
    /// Kurzname für Log-Ausgaben (entspricht dem `op`-Feld)
    pub fn name(&self) -> &'static str {
        match self {
            Self::FixDoubled => "fix_doubled",
            Self::DedupPoints => "dedup_points",
            Self::DedupWays => "dedup_ways",
            Self::RemoveOrphans => "remove_orphans",
            Self::Split { .. } => "split",
            Self::SplitOverlong { .. } => "split_overlong",
            Self::Lengths => "lengths",
            Self::Offset { .. } => "offset",
            Self::OffsetMeters { .. } => "offset_meters",
            Self::Reverse { .. } => "reverse",
            Self::RemoveLanelet { .. } => "remove_lanelet",
            Self::RemoveLanelets { .. } => "remove_lanelets",
            Self::RemovePoints { .. } => "remove_points",
            Self::MergePoint { .. } => "merge_point",
            Self::Dashed { .. } => "dashed",
        }
    }

    /// Ob der Befehl die Karte verändern kann
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Lengths)
    }
}

/// Job-Datei: geordnete Liste von Befehlen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub steps: Vec<MapCommand>,
}

impl JobFile {
    /// Parsed eine Job-Datei aus TOML-Text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Job-Datei ist kein gültiges TOML")
    }

    /// Lädt eine Job-Datei von der Platte.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Job-Datei nicht lesbar: {}", path.display()))?;
        let job = Self::from_toml(&content)
            .with_context(|| format!("Job-Datei fehlerhaft: {}", path.display()))?;
        log::info!("Job geladen: {} Schritte aus {}", job.steps.len(), path.display());
        Ok(job)
    }
}

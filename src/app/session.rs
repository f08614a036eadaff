//! Eine Bearbeitungssitzung: Karte einmal laden, Befehle ausführen, einmal speichern.

use super::command_log::CommandLog;
use super::file_io;
use super::MapCommand;
use crate::core::{
    BatchReport, DeduplicationResult, DoubledBoundaryReport, LaneletLength, LaneletMap,
    LaneletRemoval, MapError, OffsetResult, SplitBatchResult, SplitResult, SplitSettings,
    WayDeduplicationResult,
};
use crate::shared::RepairOptions;
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Ergebnis eines einzelnen Befehls (für den JSON-Report)
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    DoubledBoundaries(DoubledBoundaryReport),
    PointDedup(DeduplicationResult),
    WayDedup(WayDeduplicationResult),
    OrphansRemoved { removed: usize },
    Split(SplitResult),
    SplitBatch(SplitBatchResult),
    Lengths { lanelets: Vec<LaneletLength> },
    Offset(OffsetResult),
    Removal(LaneletRemoval),
    Merged { rewritten: usize },
    Batch(BatchReport),
}

/// Zusammenfassung einer Sitzung
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport<'a> {
    pub source: Option<&'a Path>,
    /// Beim Einlesen übersprungene Datensätze
    pub skipped_on_load: &'a [MapError],
    pub steps: &'a [super::command_log::ExecutedCommand],
    pub points: usize,
    pub ways: usize,
    pub relations: usize,
    pub lanelets: usize,
}

/// Geladene Karte samt Optionen und Befehlsprotokoll
#[derive(Debug)]
pub struct MapSession {
    map: LaneletMap,
    source: Option<PathBuf>,
    skipped_on_load: Vec<MapError>,
    options: RepairOptions,
    command_log: CommandLog,
}

impl MapSession {
    /// Startet eine Sitzung mit einer bereits vorhandenen Karte.
    pub fn new(map: LaneletMap, options: RepairOptions) -> Self {
        Self {
            map,
            source: None,
            skipped_on_load: Vec::new(),
            options,
            command_log: CommandLog::new(),
        }
    }

    /// Lädt eine OSM-Datei und startet eine Sitzung darauf.
    pub fn open(path: &Path, options: RepairOptions) -> anyhow::Result<Self> {
        let parsed = file_io::load_map(path)?;
        if !parsed.skipped.is_empty() {
            log::warn!(
                "{} Datensätze beim Einlesen übersprungen",
                parsed.skipped.len()
            );
        }
        Ok(Self {
            map: parsed.map,
            source: Some(path.to_path_buf()),
            skipped_on_load: parsed.skipped,
            options,
            command_log: CommandLog::new(),
        })
    }

    pub fn map(&self) -> &LaneletMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut LaneletMap {
        &mut self.map
    }

    pub fn options(&self) -> &RepairOptions {
        &self.options
    }

    pub fn command_log(&self) -> &CommandLog {
        &self.command_log
    }

    pub fn skipped_on_load(&self) -> &[MapError] {
        &self.skipped_on_load
    }

    /// Split-Parameter aus den Optionen; Referenz-Breitengrad aus der GeoReference.
    pub fn split_settings(&self, distance: Option<f64>) -> SplitSettings {
        SplitSettings {
            target_length_m: distance.unwrap_or(self.options.split_distance_m),
            min_point_spacing_m: self.options.min_point_spacing_m,
            short_tail_fraction: self.options.short_tail_fraction,
            reference_latitude: self.reference_latitude(),
        }
    }

    fn reference_latitude(&self) -> f64 {
        self.map
            .reference_latitude(self.options.fallback_reference_latitude)
    }

    /// Führt einen Befehl aus und protokolliert ihn.
    ///
    /// Batch-Befehle scheitern nie an einzelnen Datensätzen; Einzelbefehle
    /// (`split`, `remove_lanelet`, `merge_point`) liefern ihren Fehler zurück
    /// und lassen die Karte unverändert.
    pub fn execute(&mut self, command: MapCommand) -> anyhow::Result<&CommandOutcome> {
        log::info!("Befehl: {}", command.name());

        let outcome = match &command {
            MapCommand::FixDoubled => {
                CommandOutcome::DoubledBoundaries(self.map.resolve_all_doubled_boundaries())
            }
            MapCommand::DedupPoints => CommandOutcome::PointDedup(self.map.deduplicate_points()),
            MapCommand::DedupWays => CommandOutcome::WayDedup(self.map.deduplicate_ways()),
            MapCommand::RemoveOrphans => CommandOutcome::OrphansRemoved {
                removed: self.map.remove_orphaned_points(),
            },
            MapCommand::Split { lanelet, distance } => {
                let settings = self.split_settings(*distance);
                let result = self
                    .map
                    .split_lanelet_by_distance(*lanelet, &settings)
                    .with_context(|| format!("Lanelet {} nicht teilbar", lanelet))?;
                CommandOutcome::Split(result)
            }
            MapCommand::SplitOverlong { distance } => {
                let settings = self.split_settings(*distance);
                CommandOutcome::SplitBatch(self.map.split_overlong_lanelets(&settings))
            }
            MapCommand::Lengths => {
                let settings = self.split_settings(None);
                let lanelets = self.map.lanelet_lengths(&settings);
                for length in &lanelets {
                    log::info!(
                        "Lanelet {}: {:.1} m (links {:.1} m, rechts {:.1} m), empfohlen {} Teil(e), {} zu nahe Punkte",
                        length.lanelet,
                        length.mean_length_m,
                        length.left_length_m,
                        length.right_length_m,
                        length.recommended_segments,
                        length.too_close_points.len()
                    );
                }
                CommandOutcome::Lengths { lanelets }
            }
            MapCommand::Offset { d_lat, d_lon } => {
                CommandOutcome::Offset(self.map.apply_offset(*d_lat, *d_lon))
            }
            MapCommand::OffsetMeters {
                east,
                north,
                reference_lat,
            } => {
                let reference_lat = reference_lat.unwrap_or_else(|| self.reference_latitude());
                CommandOutcome::Offset(self.map.apply_metric_offset(*east, *north, reference_lat))
            }
            MapCommand::Reverse { lanelets } if lanelets.is_empty() => {
                CommandOutcome::Batch(self.map.reverse_all_lanelets())
            }
            MapCommand::Reverse { lanelets } => {
                CommandOutcome::Batch(self.map.reverse_lanelets(lanelets))
            }
            MapCommand::RemoveLanelet { lanelet } => {
                let removal = self
                    .map
                    .remove_lanelet(*lanelet, self.options.prune_orphans_on_remove)
                    .with_context(|| format!("Lanelet {} nicht entfernbar", lanelet))?;
                CommandOutcome::Removal(removal)
            }
            MapCommand::RemoveLanelets { keep } => {
                CommandOutcome::Removal(self.map.remove_lanelets_except(keep))
            }
            MapCommand::RemovePoints { points } => {
                CommandOutcome::Batch(self.map.remove_points(points))
            }
            MapCommand::MergePoint { keep, remove } => {
                let rewritten = self
                    .map
                    .merge_point(*keep, *remove)
                    .with_context(|| format!("Punkt {} nicht in {} überführbar", remove, keep))?;
                CommandOutcome::Merged { rewritten }
            }
            MapCommand::Dashed { ways } => {
                let subtype = self.options.dashed_subtype.clone();
                CommandOutcome::Batch(self.map.make_ways_dashed(ways, &subtype))
            }
        };

        self.command_log.record(command, outcome);
        self.command_log
            .entries()
            .last()
            .map(|entry| &entry.outcome)
            .context("Command-Log leer nach dem Protokollieren")
    }

    /// Führt alle Befehle in Reihenfolge aus; bricht beim ersten Fehler ab.
    pub fn execute_all(&mut self, commands: Vec<MapCommand>) -> anyhow::Result<()> {
        let total = commands.len();
        for (index, command) in commands.into_iter().enumerate() {
            let name = command.name();
            self.execute(command)
                .with_context(|| format!("Schritt {}/{} ({}) fehlgeschlagen", index + 1, total, name))?;
        }
        Ok(())
    }

    /// Speichert die Karte atomar unter `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        file_io::save_map(&self.map, path)
    }

    /// Report über Ladevorgang und alle ausgeführten Befehle
    pub fn report(&self) -> SessionReport<'_> {
        SessionReport {
            source: self.source.as_deref(),
            skipped_on_load: &self.skipped_on_load,
            steps: self.command_log.entries(),
            points: self.map.point_count(),
            ways: self.map.way_count(),
            relations: self.map.relation_count(),
            lanelets: self.map.lanelet_count(),
        }
    }
}

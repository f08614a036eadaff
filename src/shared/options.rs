//! Zentrale Konfiguration für das Lanelet-Reparaturwerkzeug.
//!
//! `RepairOptions` enthält alle zur Laufzeit änderbaren Werte.
//! Die `const`-Werte bleiben als Fallback/Default erhalten.

use serde::{Deserialize, Serialize};

// ── Split ───────────────────────────────────────────────────────────

/// Ziel-Segmentlänge beim Aufteilen überlanger Lanelets (Meter).
pub const SPLIT_DISTANCE_M: f64 = 150.0;
/// Punkte näher als dieser Abstand zählen nicht zur Länge (Meter).
pub const MIN_POINT_SPACING_M: f64 = 2.0;
/// Ein Rest-Segment unter diesem Anteil der Ziellänge wird dem vorherigen zugeschlagen.
pub const SHORT_TAIL_FRACTION: f64 = 1.0 / 3.0;

// ── Geo ─────────────────────────────────────────────────────────────

/// Referenz-Breitengrad, falls die Karte keine `+lat_0` enthält.
pub const FALLBACK_REFERENCE_LATITUDE: f64 = 28.1185796;

// ── Editing ─────────────────────────────────────────────────────────

/// Wert für `subtype` beim Markieren gestrichelter Linien.
pub const DASHED_SUBTYPE: &str = "dashed";

/// Dateiname der Optionen-Datei neben der Binary.
const OPTIONS_FILE_NAME: &str = "lanelet_map_repair.toml";

// ── Laufzeit-Optionen (serialisierbar) ─────────────────────────────

/// Alle zur Laufzeit änderbaren Reparatur-Optionen.
/// Wird als `lanelet_map_repair.toml` neben der Binary gesucht.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepairOptions {
    /// Ziel-Segmentlänge für `split` und `split-overlong` (Meter)
    pub split_distance_m: f64,
    /// Mindestabstand zwischen Punkten bei der Längenmessung (Meter)
    pub min_point_spacing_m: f64,
    /// Anteil der Ziellänge, unter dem ein Rest-Segment verworfen wird
    pub short_tail_fraction: f64,
    /// Referenz-Breitengrad ohne GeoReference
    pub fallback_reference_latitude: f64,
    /// `subtype`-Wert für gestrichelte Ways
    pub dashed_subtype: String,
    /// Verwaiste Punkte nach dem Entfernen eines Lanelets direkt löschen
    pub prune_orphans_on_remove: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            split_distance_m: SPLIT_DISTANCE_M,
            min_point_spacing_m: MIN_POINT_SPACING_M,
            short_tail_fraction: SHORT_TAIL_FRACTION,
            fallback_reference_latitude: FALLBACK_REFERENCE_LATITUDE,
            dashed_subtype: DASHED_SUBTYPE.to_string(),
            prune_orphans_on_remove: true,
        }
    }
}

impl RepairOptions {
    /// Lädt Optionen aus einer TOML-Datei. Bei Fehler: Standardwerte.
    pub fn load_from_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(opts) => {
                    log::info!("Optionen geladen aus: {}", path.display());
                    opts
                }
                Err(e) => {
                    log::warn!("Optionen-Datei fehlerhaft, verwende Standardwerte: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Keine Optionen-Datei gefunden, verwende Standardwerte");
                Self::default()
            }
        }
    }

    /// Speichert Optionen als TOML-Datei.
    pub fn save_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Optionen gespeichert nach: {}", path.display());
        Ok(())
    }

    /// Ermittelt den Pfad zur Optionen-Datei neben der Binary.
    pub fn config_path() -> std::path::PathBuf {
        std::env::current_exe()
            .unwrap_or_else(|_| std::path::PathBuf::from("lanelet-map-repair"))
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join(OPTIONS_FILE_NAME)
    }
}

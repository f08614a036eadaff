//! Protokoll der in einer Sitzung ausgeführten Befehle.

use super::{CommandOutcome, MapCommand};
use serde::Serialize;

/// Ein ausgeführter Befehl mit seinem Ergebnis
#[derive(Debug, Clone, Serialize)]
pub struct ExecutedCommand {
    pub command: MapCommand,
    pub outcome: CommandOutcome,
}

/// Speichert ausgeführte Commands in Reihenfolge.
#[derive(Debug, Default)]
pub struct CommandLog {
    entries: Vec<ExecutedCommand>,
}

impl CommandLog {
    const MAX_ENTRIES: usize = 1000;
}

impl CommandLog {
    /// Erstellt ein leeres Command-Log.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Fügt einen ausgeführten Command hinzu.
    /// Begrenzt auf MAX_ENTRIES, ältere Einträge werden verworfen.
    pub fn record(&mut self, command: MapCommand, outcome: CommandOutcome) {
        if self.entries.len() >= Self::MAX_ENTRIES {
            self.entries.drain(..Self::MAX_ENTRIES / 2);
        }
        self.entries.push(ExecutedCommand { command, outcome });
    }

    /// Gibt die Anzahl der geloggten Commands zurück.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Gibt `true` zurück, wenn keine Commands vorhanden sind.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Liefert eine read-only Sicht auf alle Einträge.
    pub fn entries(&self) -> &[ExecutedCommand] {
        &self.entries
    }

    /// Ob mindestens ein Befehl die Karte verändern konnte
    pub fn has_mutations(&self) -> bool {
        self.entries.iter().any(|e| e.command.is_mutating())
    }
}

//! Dateisystem-Operationen: Karte lesen und atomar schreiben.

use crate::core::LaneletMap;
use crate::xml::{parse_osm_map, write_osm_map, ParsedMap};
use anyhow::Context;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Liest und parsed eine OSM-Datei.
pub fn load_map(path: &Path) -> anyhow::Result<ParsedMap> {
    let xml_content = std::fs::read_to_string(path)
        .with_context(|| format!("Datei nicht lesbar: {}", path.display()))?;
    let parsed = parse_osm_map(&xml_content)
        .with_context(|| format!("Karte nicht einlesbar: {}", path.display()))?;
    log::info!("Karte geladen: {}", path.display());
    Ok(parsed)
}

/// Schreibt die Karte über eine temporäre Nachbardatei und benennt sie danach um.
///
/// Die temporäre Datei wird vor dem Umbenennen auf die Platte synchronisiert.
/// Schlägt Schreiben oder Umbenennen fehl, bleibt eine vorhandene Zieldatei
/// unverändert und die temporäre Datei wird entfernt.
pub fn save_map(map: &LaneletMap, path: &Path) -> anyhow::Result<()> {
    let xml_content = write_osm_map(map).context("Karte nicht serialisierbar")?;
    let temp_path = temp_sibling(path);

    if let Err(err) = write_synced(&temp_path, xml_content.as_bytes()) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err)
            .with_context(|| format!("Temporäre Datei nicht schreibbar: {}", temp_path.display()));
    }
    if let Err(err) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err).with_context(|| {
            format!(
                "Umbenennen von {} nach {} fehlgeschlagen",
                temp_path.display(),
                path.display()
            )
        });
    }

    log::info!("Karte gespeichert: {}", path.display());
    Ok(())
}

fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

/// `<datei>.tmp` im selben Verzeichnis wie `path`
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "lanelet_map".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_sibling_stays_in_directory() {
        assert_eq!(
            temp_sibling(Path::new("/data/maps/town.osm")),
            PathBuf::from("/data/maps/town.osm.tmp")
        );
        assert_eq!(temp_sibling(Path::new("town.osm")), PathBuf::from("town.osm.tmp"));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        // Ziel ist ein nicht-leeres Verzeichnis, Umbenennen muss scheitern
        let target = std::env::temp_dir().join(format!(
            "lanelet_map_repair_rename_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(target.join("inhalt")).expect("Verzeichnis erwartet");

        let err = save_map(&LaneletMap::new(), &target)
            .expect_err("Umbenennen auf Verzeichnis sollte fehlschlagen");

        assert!(format!("{err:#}").contains("Umbenennen"));
        assert!(!temp_sibling(&target).exists());
        assert!(target.join("inhalt").is_dir());
        let _ = std::fs::remove_dir_all(&target);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = load_map(Path::new("/nonexistent/lanelet_map_repair/none.osm"))
            .expect_err("fehlende Datei sollte fehlschlagen");
        assert!(format!("{err:#}").contains("Datei nicht lesbar"));
    }
}

//! Entfernen verwaister Punkte.

use super::LaneletMap;
use crate::core::EntityKind;
use std::collections::HashSet;

impl LaneletMap {
    /// Löscht alle Punkte, die weder von einem Way noch als `node`-Member
    /// einer Relation referenziert werden. Gibt die Anzahl gelöschter Punkte zurück.
    pub fn remove_orphaned_points(&mut self) -> usize {
        let orphans: HashSet<u64> = self
            .points
            .keys()
            .copied()
            .filter(|&id| self.index.referrer_count(EntityKind::Point, id) == 0)
            .collect();

        self.remove_unreferenced_points(&orphans)
    }

    /// Löscht die übergebenen Punkte, sofern sie unreferenziert sind.
    pub(super) fn remove_unreferenced_points(&mut self, candidates: &HashSet<u64>) -> usize {
        let doomed: HashSet<u64> = candidates
            .iter()
            .copied()
            .filter(|&id| {
                self.points.contains_key(&id)
                    && self.index.referrer_count(EntityKind::Point, id) == 0
            })
            .collect();
        if doomed.is_empty() {
            return 0;
        }

        for id in &doomed {
            if let Some(point) = self.points.get(id) {
                self.index.remove_point(point);
            }
        }
        self.points.retain(|id, _| !doomed.contains(id));

        log::info!("{} verwaiste Punkte entfernt", doomed.len());
        doomed.len()
    }
}

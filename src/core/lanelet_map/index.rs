//! Rückwärts-Indizes: wer referenziert wen, welche Punkte liegen übereinander.

use crate::core::{CoordinateKey, EntityKind, MapPoint, Relation, Way};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::hash::Hash;

type RefMap<K> = HashMap<K, IndexSet<u64>>;

fn link<K: Hash + Eq>(map: &mut RefMap<K>, key: K, referrer: u64) {
    map.entry(key).or_default().insert(referrer);
}

fn unlink<K: Hash + Eq>(map: &mut RefMap<K>, key: K, referrer: u64) {
    if let Some(set) = map.get_mut(&key) {
        set.shift_remove(&referrer);
        if set.is_empty() {
            map.remove(&key);
        }
    }
}

/// Inkrementell gepflegte Indizes der LaneletMap.
///
/// Jede Referenzmenge behält die Einfüge-Reihenfolge der Referenzierer.
#[derive(Debug, Clone, Default)]
pub(super) struct ReferenceIndex {
    /// Punkt → Ways mit `<nd ref>` auf den Punkt
    pub point_refs: RefMap<u64>,
    /// Punkt → Relationen mit `node`-Member
    pub point_member_refs: RefMap<u64>,
    /// Way → Relationen mit `way`-Member
    pub way_refs: RefMap<u64>,
    /// Relation → Relationen mit `relation`-Member
    pub relation_refs: RefMap<u64>,
    /// Exakte Koordinate → Punkte
    pub points_by_coordinate: RefMap<CoordinateKey>,
    /// (erster, letzter Punkt) → Ways
    pub ways_by_endpoints: RefMap<(u64, u64)>,
}

impl ReferenceIndex {
    pub fn add_point(&mut self, point: &MapPoint) {
        link(
            &mut self.points_by_coordinate,
            point.coordinate_key(),
            point.id,
        );
    }

    pub fn remove_point(&mut self, point: &MapPoint) {
        unlink(
            &mut self.points_by_coordinate,
            point.coordinate_key(),
            point.id,
        );
        self.point_refs.remove(&point.id);
        self.point_member_refs.remove(&point.id);
    }

    pub fn add_way(&mut self, way: &Way) {
        for &point_id in &way.points {
            link(&mut self.point_refs, point_id, way.id);
        }
        if let Some(endpoints) = way.endpoints() {
            link(&mut self.ways_by_endpoints, endpoints, way.id);
        }
    }

    pub fn remove_way(&mut self, way: &Way) {
        for &point_id in &way.points {
            unlink(&mut self.point_refs, point_id, way.id);
        }
        if let Some(endpoints) = way.endpoints() {
            unlink(&mut self.ways_by_endpoints, endpoints, way.id);
        }
    }

    pub fn add_relation(&mut self, relation: &Relation) {
        for member in &relation.members {
            link(self.member_refs_mut(member.kind), member.id, relation.id);
        }
    }

    pub fn remove_relation(&mut self, relation: &Relation) {
        for member in &relation.members {
            unlink(self.member_refs_mut(member.kind), member.id, relation.id);
        }
    }

    /// Nachführen nach dem Umschreiben von `old_id` auf `new_id` in einem Way.
    ///
    /// Kostet nur die betroffenen Einträge statt des ganzen Ways.
    pub fn repoint_way(
        &mut self,
        way: &Way,
        old_id: u64,
        new_id: u64,
        endpoints_before: Option<(u64, u64)>,
    ) {
        unlink(&mut self.point_refs, old_id, way.id);
        link(&mut self.point_refs, new_id, way.id);
        let endpoints_after = way.endpoints();
        if endpoints_before != endpoints_after {
            if let Some(endpoints) = endpoints_before {
                unlink(&mut self.ways_by_endpoints, endpoints, way.id);
            }
            if let Some(endpoints) = endpoints_after {
                link(&mut self.ways_by_endpoints, endpoints, way.id);
            }
        }
    }

    /// Nachführen nach dem Umschreiben eines Members einer Relation.
    pub fn repoint_member(
        &mut self,
        kind: EntityKind,
        relation_id: u64,
        old_id: u64,
        new_id: u64,
    ) {
        let refs = self.member_refs_mut(kind);
        unlink(refs, old_id, relation_id);
        link(refs, new_id, relation_id);
    }

    fn member_refs_mut(&mut self, kind: EntityKind) -> &mut RefMap<u64> {
        match kind {
            EntityKind::Point => &mut self.point_member_refs,
            EntityKind::Way => &mut self.way_refs,
            EntityKind::Relation => &mut self.relation_refs,
        }
    }

    /// Relationen, die das Element als Member führen
    pub fn member_refs(&self, kind: EntityKind, id: u64) -> Option<&IndexSet<u64>> {
        match kind {
            EntityKind::Point => self.point_member_refs.get(&id),
            EntityKind::Way => self.way_refs.get(&id),
            EntityKind::Relation => self.relation_refs.get(&id),
        }
    }

    /// Anzahl aller Elemente (Ways und Relationen), die auf das Element verweisen
    pub fn referrer_count(&self, kind: EntityKind, id: u64) -> usize {
        let ways = match kind {
            EntityKind::Point => self.point_refs.get(&id).map_or(0, IndexSet::len),
            _ => 0,
        };
        ways + self.member_refs(kind, id).map_or(0, IndexSet::len)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

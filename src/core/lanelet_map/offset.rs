//! Globale Verschiebung aller Koordinaten samt GeoReference.

use super::LaneletMap;
use crate::shared::geo_projection::LocalProjection;
use serde::Serialize;

/// Ergebnis einer Koordinaten-Verschiebung
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OffsetResult {
    /// Verschiebung in Grad (Breite)
    pub d_lat: f64,
    /// Verschiebung in Grad (Länge)
    pub d_lon: f64,
    /// Anzahl verschobener Punkte
    pub shifted_points: usize,
    /// Ob `+lat_0`/`+lon_0` der GeoReference angepasst wurden
    pub geo_reference_updated: bool,
}

impl LaneletMap {
    /// Addiert `d_lat`/`d_lon` (Grad) auf alle Punkte und den Ursprung der GeoReference.
    ///
    /// Die Topologie bleibt unverändert.
    pub fn apply_offset(&mut self, d_lat: f64, d_lon: f64) -> OffsetResult {
        for point in self.points.values_mut() {
            point.lat += d_lat;
            point.lon += d_lon;
            point.attributes.set("lat", &point.lat.to_string());
            point.attributes.set("lon", &point.lon.to_string());
        }

        let geo_reference_updated = self
            .geo_reference
            .as_mut()
            .is_some_and(|geo| geo.shift(d_lat, d_lon));

        // Koordinaten-Index hängt an den verschobenen Positionen
        self.rebuild_indices();

        log::info!(
            "{} Punkte um ({}, {}) Grad verschoben",
            self.points.len(),
            d_lat,
            d_lon
        );

        OffsetResult {
            d_lat,
            d_lon,
            shifted_points: self.points.len(),
            geo_reference_updated,
        }
    }

    /// Verschiebt die Karte um einen metrischen Versatz (Ost/Nord in Metern).
    pub fn apply_metric_offset(
        &mut self,
        east_m: f64,
        north_m: f64,
        reference_latitude: f64,
    ) -> OffsetResult {
        let (d_lat, d_lon) =
            LocalProjection::new(reference_latitude).meters_to_degrees(east_m, north_m);
        self.apply_offset(d_lat, d_lon)
    }
}

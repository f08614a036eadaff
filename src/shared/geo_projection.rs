//! Äquirektanguläre Näherung für Distanzen und Richtungen auf kurzen Strecken.
//!
//! Layer-neutral: wird von `core` (Längen, Split, Offset) und `app` genutzt.

use glam::DVec2;
use std::f64::consts::{PI, TAU};

/// Meter pro Breitengrad (Erdumfang vereinfacht: 10 000 km auf 90°).
pub const METERS_PER_DEGREE_LAT: f64 = 10_000_000.0 / 90.0;

/// Meter pro Längengrad auf dem angegebenen Breitengrad (in Grad).
pub fn meters_per_degree_lon(reference_latitude: f64) -> f64 {
    METERS_PER_DEGREE_LAT * reference_latitude.to_radians().cos()
}

/// Lokale metrische Projektion um einen Referenz-Breitengrad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    lon_scale: f64,
}

impl LocalProjection {
    pub fn new(reference_latitude: f64) -> Self {
        Self {
            lon_scale: meters_per_degree_lon(reference_latitude),
        }
    }

    /// Projiziert (lat, lon) in Meter: x = Ost, y = Nord.
    pub fn to_local(&self, lat: f64, lon: f64) -> DVec2 {
        DVec2::new(lon * self.lon_scale, lat * METERS_PER_DEGREE_LAT)
    }

    /// Rechnet einen metrischen Versatz (Ost, Nord) in Grad um: (d_lat, d_lon).
    pub fn meters_to_degrees(&self, east_m: f64, north_m: f64) -> (f64, f64) {
        (north_m / METERS_PER_DEGREE_LAT, east_m / self.lon_scale)
    }
}

/// Planare Richtung `atan2(Δlat, Δlon)` in Radiant.
pub fn bearing(from_lat: f64, from_lon: f64, to_lat: f64, to_lon: f64) -> f64 {
    (to_lat - from_lat).atan2(to_lon - from_lon)
}

/// Absoluter Winkelunterschied, auf `[0, π]` gefaltet.
///
/// Anders als ein ungefaltetes `|a - b|` liegen Richtungen beiderseits von ±180°
/// nah beieinander: 179° gegen -179° ergibt 2°, nicht 358°.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % TAU;
    if diff > PI {
        TAU - diff
    } else {
        diff
    }
}

/// Länge einer Polyline in Metern.
pub fn polyline_length(points: &[DVec2]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Streckenlängen eines Ways, symmetrisch von beiden Enden zur Mitte gemessen.
///
/// Punkte, die näher als `min_spacing` am zuletzt akzeptierten Punkt liegen,
/// tragen nicht zur Länge bei. Der mittlere Punkt wird immer akzeptiert,
/// damit sich beide Hälften treffen.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryProfile {
    /// Kumulierte Länge bis zu jedem Punkt-Index (in Fahrtrichtung)
    pub cumulative: Vec<f64>,
    /// Indizes der zu nah beieinander liegenden Punkte
    pub too_close: Vec<usize>,
}

impl BoundaryProfile {
    pub fn measure(positions: &[DVec2], min_spacing: f64) -> Self {
        let n = positions.len();
        let mut increments = vec![0.0; n];
        let mut too_close = Vec::new();

        if n >= 2 {
            let middle = n / 2;

            let mut last = 0;
            for i in 1..=middle {
                let step = positions[last].distance(positions[i]);
                if i < middle && step < min_spacing {
                    too_close.push(i);
                    continue;
                }
                increments[i] = step;
                last = i;
            }

            // Rückwärts: Strecke i→last wird dem späteren Punkt `last` zugerechnet
            let mut last = n - 1;
            for i in (middle..n - 1).rev() {
                let step = positions[i].distance(positions[last]);
                if i > middle && step < min_spacing {
                    too_close.push(i);
                    continue;
                }
                increments[last] = step;
                last = i;
            }
        }

        too_close.sort_unstable();
        let cumulative = increments
            .iter()
            .scan(0.0, |sum, step| {
                *sum += step;
                Some(*sum)
            })
            .collect();

        Self {
            cumulative,
            too_close,
        }
    }

    /// Gesamtlänge
    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Erster Index in `lo..=hi`, dessen kumulierte Länge `threshold` überschreitet (sonst `hi`).
    pub fn first_index_beyond(&self, threshold: f64, lo: usize, hi: usize) -> usize {
        (lo..=hi)
            .find(|&i| self.cumulative[i] > threshold)
            .unwrap_or(hi)
    }
}

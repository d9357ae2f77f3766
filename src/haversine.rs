//! Haversine travel-time estimator (fallback when OSRM unavailable).
//!
//! Uses great-circle distance, stretched by a detour factor, to estimate
//! travel time. Less accurate than OSRM (ignores roads) but always available.

use crate::stop::Location;
use crate::traits::TravelTimeEstimator;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Ratio of road distance to straight-line distance.
const DEFAULT_DISTANCE_FACTOR: f64 = 1.3;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate haversine distance between two (lat, lng) points in kilometers.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Haversine-based travel-time estimator.
///
/// Ignores departure time and budget: the estimate is static.
#[derive(Debug, Clone)]
pub struct HaversineEstimator {
    /// Multiplier from straight-line to road distance.
    pub distance_factor: f64,
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineEstimator {
    fn default() -> Self {
        Self {
            distance_factor: DEFAULT_DISTANCE_FACTOR,
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineEstimator {
    pub fn new(distance_factor: f64, speed_kmh: f64) -> Self {
        Self {
            distance_factor,
            speed_kmh,
        }
    }

    /// Convert road distance in km to travel time in seconds.
    fn km_to_seconds(&self, km: f64) -> f64 {
        km / self.speed_kmh * 3600.0
    }
}

impl TravelTimeEstimator for HaversineEstimator {
    fn estimate_travel_time(
        &self,
        from: &Location,
        to: &Location,
        _departure_time: f64,
        _time_budget: f64,
    ) -> f64 {
        if from == to {
            return 0.0;
        }

        let km = haversine_km(from.coord, to.coord) * self.distance_factor;
        self.km_to_seconds(km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_km((36.1, -115.1), (36.1, -115.1));
        assert!(dist < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Las Vegas (36.17, -115.14) to Los Angeles (34.05, -118.24)
        // Actual distance ~370 km
        let dist = haversine_km((36.17, -115.14), (34.05, -118.24));
        assert!(dist > 350.0 && dist < 400.0, "LV to LA should be ~370km, got {}", dist);
    }

    #[test]
    fn test_same_location_is_free() {
        let estimator = HaversineEstimator::default();
        let strip = Location::new(7, 36.1147, -115.1728);
        let moved = Location::new(7, 36.2, -115.2);

        assert_eq!(estimator.estimate_travel_time(&strip, &moved, 0.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_estimate_is_symmetric() {
        let estimator = HaversineEstimator::default();
        let a = Location::new(1, 36.1, -115.1);
        let b = Location::new(2, 36.2, -115.2);

        let there = estimator.estimate_travel_time(&a, &b, 0.0, f64::INFINITY);
        let back = estimator.estimate_travel_time(&b, &a, 3600.0, f64::INFINITY);
        assert!((there - back).abs() < 1e-9, "Estimate should be symmetric");
    }

    #[test]
    fn test_reasonable_travel_time() {
        let estimator = HaversineEstimator::new(1.0, 40.0); // 40 km/h
        // 10 km at 40 km/h = 0.25 hours = 900 seconds
        assert!((estimator.km_to_seconds(10.0) - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_factor_stretches_time() {
        let straight = HaversineEstimator::new(1.0, 40.0);
        let detour = HaversineEstimator::new(1.3, 40.0);
        let a = Location::new(1, 36.1, -115.1);
        let b = Location::new(2, 36.2, -115.2);

        let ratio = detour.estimate_travel_time(&a, &b, 0.0, f64::INFINITY)
            / straight.estimate_travel_time(&a, &b, 0.0, f64::INFINITY);
        assert!((ratio - 1.3).abs() < 1e-9);
    }
}

//! OSRM HTTP adapter for point-to-point travel times.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::haversine::HaversineEstimator;
use crate::stop::Location;
use crate::traits::TravelTimeEstimator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedTravelTime {
    travel_time: f64,
    cached_at: f64,
}

/// Travel times from the OSRM `route` service, cached per location pair.
///
/// Entries are reused while the departure time is less than the cache
/// lifetime past the moment they were fetched. Failed queries fall back to
/// the haversine estimate if one is configured, and are infinite otherwise.
#[derive(Debug)]
pub struct OsrmEstimator {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
    cache_lifetime: f64,
    fallback: Option<HaversineEstimator>,
    cache: Mutex<HashMap<(u64, u64), CachedTravelTime>>,
}

impl OsrmEstimator {
    pub fn new(config: OsrmConfig, cache_lifetime: f64) -> Result<Self, DispatchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            cache_lifetime,
            fallback: None,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Answers with `fallback` whenever OSRM cannot be queried.
    pub fn with_fallback(mut self, fallback: HaversineEstimator) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn query(&self, from: &Location, to: &Location) -> Result<f64, reqwest::Error> {
        let url = format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=false",
            self.config.base_url,
            self.config.profile,
            from.coord.1,
            from.coord.0,
            to.coord.1,
            to.coord.0
        );

        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>())?;

        Ok(body.duration().unwrap_or(f64::INFINITY))
    }
}

impl TravelTimeEstimator for OsrmEstimator {
    fn estimate_travel_time(
        &self,
        from: &Location,
        to: &Location,
        departure_time: f64,
        time_budget: f64,
    ) -> f64 {
        if from == to {
            return 0.0;
        }

        let key = (from.id, to.id);

        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            let fresh = cache
                .get(&key)
                .filter(|entry| departure_time - entry.cached_at < self.cache_lifetime);

            if let Some(entry) = fresh {
                return entry.travel_time;
            }
        }

        match self.query(from, to) {
            Ok(travel_time) => {
                let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
                cache.insert(
                    key,
                    CachedTravelTime {
                        travel_time,
                        cached_at: departure_time,
                    },
                );
                travel_time
            }
            Err(err) => {
                tracing::debug!("OSRM route query failed: {}", err);

                match &self.fallback {
                    Some(fallback) => {
                        fallback.estimate_travel_time(from, to, departure_time, time_budget)
                    }
                    None => f64::INFINITY,
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    duration: f64,
}

impl OsrmRouteResponse {
    fn duration(&self) -> Option<f64> {
        if self.code != "Ok" {
            return None;
        }

        self.routes.first().map(|route| route.duration)
    }
}

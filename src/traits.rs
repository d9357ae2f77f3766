//! Collaborator traits for the dispatcher.
//!
//! These are intentionally minimal. Hosts implement them for their own
//! network and schedule models; the crate ships a haversine and an OSRM
//! travel-time estimator.

use crate::request::{Request, RequestId};
use crate::stop::Location;
use crate::vehicle::Vehicle;

/// Travel-time oracle.
pub trait TravelTimeEstimator: Send + Sync {
    /// Travel time in seconds, 0 for identical locations.
    ///
    /// `time_budget` is the latest arrival that is still useful to the
    /// caller; estimators may give up early once it cannot be met.
    fn estimate_travel_time(
        &self,
        from: &Location,
        to: &Location,
        departure_time: f64,
        time_budget: f64,
    ) -> f64;
}

/// Passenger boarding and alighting durations.
///
/// `vehicle` is absent for virtual vehicles used in shareability probes.
pub trait StopDurationProvider: Send + Sync {
    fn pickup_duration(&self, vehicle: Option<&Vehicle>, request: &Request) -> f64;

    fn dropoff_duration(&self, vehicle: Option<&Vehicle>, request: &Request) -> f64;
}

/// Pairwise index of requests that could ride together.
pub trait ShareabilityIndex: Sync {
    fn are_shareable(&self, first: RequestId, second: RequestId) -> bool;
}

/// Constant pickup and dropoff durations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticStopDuration {
    pub pickup: f64,
    pub dropoff: f64,
}

impl StaticStopDuration {
    pub fn of(pickup: f64, dropoff: f64) -> Self {
        Self { pickup, dropoff }
    }
}

impl StopDurationProvider for StaticStopDuration {
    fn pickup_duration(&self, _vehicle: Option<&Vehicle>, _request: &Request) -> f64 {
        self.pickup
    }

    fn dropoff_duration(&self, _vehicle: Option<&Vehicle>, _request: &Request) -> f64 {
        self.dropoff
    }
}

//! Locations and stops along a vehicle route.

use std::hash::{Hash, Hasher};

use crate::request::{Request, RequestId};

/// A routable place. Two locations are the same place when their ids match;
/// the coordinates only feed geometric estimates.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub id: u64,
    /// (lat, lng)
    pub coord: (f64, f64),
}

impl Location {
    pub fn new(id: u64, lat: f64, lng: f64) -> Self {
        Self { id, coord: (lat, lng) }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopKind {
    Pickup,
    Dropoff,
    Relocation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    pub kind: StopKind,
    pub location: Location,
    /// Absent for relocation stops.
    pub request: Option<RequestId>,
    /// Passenger pickup/dropoff time (arrival for relocations), once computed.
    pub time: Option<f64>,
}

impl Stop {
    pub fn pickup(request: &Request) -> Self {
        Self {
            kind: StopKind::Pickup,
            location: request.pickup_location(),
            request: Some(request.id()),
            time: None,
        }
    }

    pub fn dropoff(request: &Request) -> Self {
        Self {
            kind: StopKind::Dropoff,
            location: request.dropoff_location(),
            request: Some(request.id()),
            time: None,
        }
    }

    pub fn relocation(location: Location) -> Self {
        Self {
            kind: StopKind::Relocation,
            location,
            request: None,
            time: None,
        }
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    /// Same task at the same place, ignoring the computed time.
    pub fn same_task(&self, other: &Stop) -> bool {
        self.kind == other.kind && self.location == other.location && self.request == other.request
    }
}

//! Fleet vehicles as seen by the dispatcher in one cycle.
//!
//! The host rebuilds these snapshots every cycle from its live schedules;
//! the dispatcher only reads them.

use crate::request::RequestId;
use crate::stop::{Location, Stop, StopKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

/// Where and when the vehicle can next be redirected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diversion {
    pub location: Location,
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveKind {
    /// Driving towards a pickup or dropoff.
    Service,
    Relocation,
    /// Any other drive task; switching away from it costs a short stop.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleActivity {
    /// Waiting or serving a stop.
    Stationary,
    Driving(DriveKind),
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub capacity: u32,
    pub service_end_time: f64,
    /// Picked up, not yet dropped off.
    pub onboard: Vec<RequestId>,
    /// Committed future stops with their projected times.
    pub route: Vec<Stop>,
    pub diversion: Diversion,
    pub activity: VehicleActivity,
}

impl Vehicle {
    /// An idle vehicle with an empty schedule.
    pub fn new(id: VehicleId, capacity: u32, location: Location, time: f64) -> Self {
        Self {
            id,
            capacity,
            service_end_time: f64::INFINITY,
            onboard: Vec::new(),
            route: Vec::new(),
            diversion: Diversion { location, time },
            activity: VehicleActivity::Stationary,
        }
    }

    pub fn is_driving(&self) -> bool {
        matches!(self.activity, VehicleActivity::Driving(_))
    }

    /// Driving on something other than a service drive, so diverting it means
    /// switching the drive mode first.
    pub fn needs_drive_mode_switch(&self) -> bool {
        matches!(
            self.activity,
            VehicleActivity::Driving(DriveKind::Relocation) | VehicleActivity::Driving(DriveKind::Other)
        )
    }

    pub fn is_relocating(&self) -> bool {
        self.activity == VehicleActivity::Driving(DriveKind::Relocation)
    }

    /// Requests with a pickup still ahead in the route.
    pub fn assigned_requests(&self) -> Vec<RequestId> {
        self.route
            .iter()
            .filter(|stop| stop.kind == StopKind::Pickup)
            .filter_map(|stop| stop.request)
            .collect()
    }

    /// No passengers on board and no pickups or dropoffs ahead.
    pub fn is_idle(&self) -> bool {
        self.onboard.is_empty()
            && self
                .route
                .iter()
                .all(|stop| stop.kind == StopKind::Relocation)
    }
}

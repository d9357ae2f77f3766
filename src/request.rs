//! Ride requests and the arena that owns them.
//!
//! Requests are created once at submission and live in a [`RequestPool`]
//! until they are dropped off or rejected. Everything else refers to them by
//! [`RequestId`], including the back-reference to the assigned vehicle.

use std::ops::Index;

use crate::stop::Location;
use crate::vehicle::VehicleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub usize);

/// Immutable demand data of a request as submitted.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub pickup: Location,
    pub dropoff: Location,
    pub earliest_pickup_time: f64,
    pub latest_pickup_time: f64,
    pub latest_dropoff_time: f64,
    /// Number of passengers (or items) travelling together.
    pub load: u32,
    /// Unshared travel time from pickup to dropoff.
    pub direct_travel_time: f64,
    /// Unshared travel distance from pickup to dropoff.
    pub direct_distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Planned,
    Started,
    Performed,
}

/// Opaque reference into the host schedule for a pickup or dropoff task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    pub task: u64,
    pub status: TaskStatus,
}

impl TaskHandle {
    pub fn planned(task: u64) -> Self {
        Self {
            task,
            status: TaskStatus::Planned,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    spec: RequestSpec,
    latest_assignment_time: f64,
    vehicle: Option<VehicleId>,
    planned_pickup_time: Option<f64>,
    pickup_task: Option<TaskHandle>,
    dropoff_task: Option<TaskHandle>,
    rejected: bool,
}

impl Request {
    pub fn new(id: RequestId, spec: RequestSpec, maximum_queue_time: f64) -> Self {
        let latest_assignment_time = spec
            .latest_pickup_time
            .min(spec.earliest_pickup_time + maximum_queue_time);

        Self {
            id,
            spec,
            latest_assignment_time,
            vehicle: None,
            planned_pickup_time: None,
            pickup_task: None,
            dropoff_task: None,
            rejected: false,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn pickup_location(&self) -> Location {
        self.spec.pickup
    }

    pub fn dropoff_location(&self) -> Location {
        self.spec.dropoff
    }

    pub fn earliest_pickup_time(&self) -> f64 {
        self.spec.earliest_pickup_time
    }

    pub fn latest_pickup_time(&self) -> f64 {
        self.spec.latest_pickup_time
    }

    pub fn latest_dropoff_time(&self) -> f64 {
        self.spec.latest_dropoff_time
    }

    pub fn load(&self) -> u32 {
        self.spec.load
    }

    pub fn direct_distance(&self) -> f64 {
        self.spec.direct_distance
    }

    /// Arrival time of an unshared ride departing at the earliest pickup.
    pub fn direct_arrival_time(&self) -> f64 {
        self.spec.earliest_pickup_time + self.spec.direct_travel_time
    }

    pub fn latest_assignment_time(&self) -> f64 {
        self.latest_assignment_time
    }

    /// The promised pickup time, or the latest pickup time while nothing has
    /// been promised yet.
    pub fn planned_pickup_time(&self) -> f64 {
        self.planned_pickup_time
            .unwrap_or(self.spec.latest_pickup_time)
    }

    pub fn has_planned_pickup_time(&self) -> bool {
        self.planned_pickup_time.is_some()
    }

    /// Commits the planned pickup time. Only the first call has an effect;
    /// returns whether the value was taken.
    pub fn set_planned_pickup_time(&mut self, time: f64) -> bool {
        if self.planned_pickup_time.is_some() {
            return false;
        }

        self.planned_pickup_time = Some(time);
        true
    }

    /// Marks the request as accepted by the fleet, promising the latest
    /// pickup time.
    pub fn accept(&mut self) {
        let latest_pickup_time = self.spec.latest_pickup_time;
        self.set_planned_pickup_time(latest_pickup_time);
    }

    pub fn vehicle(&self) -> Option<VehicleId> {
        self.vehicle
    }

    pub fn is_assigned(&self) -> bool {
        self.vehicle.is_some()
    }

    pub fn assign(&mut self, vehicle: VehicleId) {
        assert!(!self.rejected, "cannot assign rejected request {:?}", self.id);

        if self.vehicle != Some(vehicle) {
            assert!(
                !self.is_picked_up(),
                "cannot reassign picked up request {:?}",
                self.id
            );
        }

        self.vehicle = Some(vehicle);
    }

    pub fn set_pickup_task(&mut self, vehicle: VehicleId, task: TaskHandle) {
        assert!(!self.is_picked_up(), "request {:?} is already picked up", self.id);
        assert!(!self.is_dropped_off(), "request {:?} is already dropped off", self.id);

        self.pickup_task = Some(task);
        self.vehicle = Some(vehicle);
    }

    pub fn set_dropoff_task(&mut self, vehicle: VehicleId, task: TaskHandle) {
        assert!(!self.is_dropped_off(), "request {:?} is already dropped off", self.id);
        assert_eq!(self.vehicle, Some(vehicle), "dropoff vehicle differs from pickup vehicle");

        self.dropoff_task = Some(task);
    }

    pub fn set_pickup_status(&mut self, status: TaskStatus) {
        let id = self.id;
        match self.pickup_task.as_mut() {
            Some(task) => task.status = status,
            None => panic!("request {:?} has no pickup task", id),
        }
    }

    pub fn set_dropoff_status(&mut self, status: TaskStatus) {
        let id = self.id;
        match self.dropoff_task.as_mut() {
            Some(task) => task.status = status,
            None => panic!("request {:?} has no dropoff task", id),
        }
    }

    pub fn pickup_task(&self) -> Option<&TaskHandle> {
        self.pickup_task.as_ref()
    }

    pub fn dropoff_task(&self) -> Option<&TaskHandle> {
        self.dropoff_task.as_ref()
    }

    pub fn unassign(&mut self) {
        assert!(!self.is_picked_up(), "cannot unassign picked up request {:?}", self.id);

        self.pickup_task = None;
        self.dropoff_task = None;
        self.vehicle = None;
    }

    pub fn is_picked_up(&self) -> bool {
        self.pickup_task
            .is_some_and(|task| task.status != TaskStatus::Planned)
    }

    pub fn is_dropped_off(&self) -> bool {
        self.dropoff_task
            .is_some_and(|task| task.status != TaskStatus::Planned)
    }

    pub fn reject(&mut self) {
        assert!(!self.is_assigned(), "cannot reject assigned request {:?}", self.id);
        self.rejected = true;
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    /// Still waiting for service or on its way.
    pub fn is_active(&self) -> bool {
        !self.rejected && !self.is_dropped_off()
    }

    /// Deterministic ordering: load first, then id.
    pub fn ordering_key(&self) -> (u32, RequestId) {
        (self.spec.load, self.id)
    }
}

/// Owning collection of all requests, indexed by [`RequestId`].
#[derive(Debug, Clone, Default)]
pub struct RequestPool {
    requests: Vec<Request>,
}

impl RequestPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, spec: RequestSpec, maximum_queue_time: f64) -> RequestId {
        let id = RequestId(self.requests.len());
        self.requests.push(Request::new(id, spec, maximum_queue_time));
        id
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(id.0)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.requests.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.requests.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &Request> {
        self.requests.iter().filter(|request| request.is_active())
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Sorts ids by (load, id).
    pub fn sort(&self, ids: &mut [RequestId]) {
        ids.sort_by_key(|id| self[*id].ordering_key());
    }

    /// Summed load of the given requests.
    pub fn total_load(&self, ids: &[RequestId]) -> u32 {
        ids.iter().map(|id| self[*id].load()).sum()
    }
}

impl Index<RequestId> for RequestPool {
    type Output = Request;

    fn index(&self, id: RequestId) -> &Self::Output {
        &self.requests[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RequestSpec {
        RequestSpec {
            pickup: Location::new(1, 0.0, 0.0),
            dropoff: Location::new(2, 0.0, 0.01),
            earliest_pickup_time: 100.0,
            latest_pickup_time: 400.0,
            latest_dropoff_time: 1000.0,
            load: 1,
            direct_travel_time: 300.0,
            direct_distance: 1100.0,
        }
    }

    #[test]
    fn test_latest_assignment_time_capped_by_queue_time() {
        let request = Request::new(RequestId(0), spec(), 60.0);
        assert_eq!(request.latest_assignment_time(), 160.0);

        let request = Request::new(RequestId(0), spec(), 3600.0);
        assert_eq!(request.latest_assignment_time(), 400.0);
    }

    #[test]
    fn test_planned_pickup_time_set_once() {
        let mut request = Request::new(RequestId(0), spec(), 0.0);
        assert_eq!(request.planned_pickup_time(), 400.0);
        assert!(!request.has_planned_pickup_time());

        assert!(request.set_planned_pickup_time(250.0));
        assert!(!request.set_planned_pickup_time(300.0));
        assert_eq!(request.planned_pickup_time(), 250.0);

        request.accept();
        assert_eq!(request.planned_pickup_time(), 250.0);
    }

    #[test]
    fn test_direct_arrival_time() {
        let request = Request::new(RequestId(0), spec(), 0.0);
        assert_eq!(request.direct_arrival_time(), 400.0);
    }

    #[test]
    fn test_task_status_drives_pickup_state() {
        let mut request = Request::new(RequestId(0), spec(), 0.0);
        let vehicle = VehicleId(3);

        request.set_pickup_task(vehicle, TaskHandle::planned(10));
        request.set_dropoff_task(vehicle, TaskHandle::planned(11));
        assert!(request.is_assigned());
        assert!(!request.is_picked_up());

        request.set_pickup_status(TaskStatus::Started);
        assert!(request.is_picked_up());
        assert!(!request.is_dropped_off());

        request.set_dropoff_status(TaskStatus::Performed);
        assert!(request.is_dropped_off());
        assert!(!request.is_active());
    }

    #[test]
    #[should_panic(expected = "cannot unassign picked up request")]
    fn test_unassign_after_pickup_panics() {
        let mut request = Request::new(RequestId(0), spec(), 0.0);
        request.set_pickup_task(VehicleId(0), TaskHandle::planned(1));
        request.set_pickup_status(TaskStatus::Performed);
        request.unassign();
    }

    #[test]
    #[should_panic(expected = "already picked up")]
    fn test_double_pickup_task_panics() {
        let mut request = Request::new(RequestId(0), spec(), 0.0);
        request.set_pickup_task(VehicleId(0), TaskHandle::planned(1));
        request.set_pickup_status(TaskStatus::Performed);
        request.set_pickup_task(VehicleId(0), TaskHandle::planned(2));
    }

    #[test]
    fn test_pool_orders_by_load_then_id() {
        let mut pool = RequestPool::new();
        let heavy = pool.submit(RequestSpec { load: 3, ..spec() }, 0.0);
        let light_a = pool.submit(spec(), 0.0);
        let light_b = pool.submit(spec(), 0.0);

        let mut ids = vec![heavy, light_b, light_a];
        pool.sort(&mut ids);

        assert_eq!(ids, vec![light_a, light_b, heavy]);
        assert_eq!(pool.total_load(&ids), 5);
    }
}

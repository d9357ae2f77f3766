use crate::haversine::haversine_km;
use crate::request::Request;
use crate::stop::{Location, Stop};

use super::{SequenceGenerator, Slot, build_slots};

/// Builds one sequence greedily, always heading for the geometrically closest
/// stop that may come next. Not exhaustive; rejecting any prefix ends the
/// search.
#[derive(Debug, Clone)]
pub struct EuclideanSequenceGenerator {
    slots: Vec<Slot>,
    used: Vec<bool>,
    picked_up: Vec<bool>,
    prefix: Vec<Stop>,
    origin: Option<Location>,
    finished: bool,
}

impl EuclideanSequenceGenerator {
    pub fn new(onboard: &[&Request], requests: &[&Request], origin: Option<Location>) -> Self {
        let slots = build_slots(onboard, requests);

        let mut picked_up = vec![false; onboard.len() + requests.len()];
        picked_up[..onboard.len()].fill(true);

        let mut generator = Self {
            used: vec![false; slots.len()],
            prefix: Vec::with_capacity(slots.len()),
            slots,
            picked_up,
            origin,
            finished: false,
        };

        generator.extend();
        generator
    }

    fn extend(&mut self) {
        let from = self.prefix.last().map(|stop| stop.location).or(self.origin);

        let distance = |slot: &Slot| match from {
            Some(from) => haversine_km(from.coord, slot.stop.location.coord),
            None => 0.0,
        };

        let nearest = self
            .slots
            .iter()
            .enumerate()
            .filter(|(index, slot)| {
                !self.used[*index] && (slot.is_pickup() || self.picked_up[slot.request])
            })
            .min_by(|(_, a), (_, b)| distance(a).total_cmp(&distance(b)))
            .map(|(index, _)| index);

        let Some(index) = nearest else {
            return;
        };

        let slot = self.slots[index];
        self.used[index] = true;
        if slot.is_pickup() {
            self.picked_up[slot.request] = true;
        }
        self.prefix.push(slot.stop);
    }
}

impl SequenceGenerator for EuclideanSequenceGenerator {
    fn has_next(&self) -> bool {
        !self.finished
    }

    fn current(&self) -> &[Stop] {
        &self.prefix
    }

    fn is_complete(&self) -> bool {
        self.prefix.len() == self.slots.len()
    }

    fn advance(&mut self) {
        if self.is_complete() {
            self.finished = true;
        } else {
            self.extend();
        }
    }

    fn abort(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestPool, RequestSpec};
    use crate::sequence::testing::count_sequences;

    fn submit(pool: &mut RequestPool, id: u64, pickup: (f64, f64), dropoff: (f64, f64)) {
        pool.submit(
            RequestSpec {
                pickup: Location::new(2 * id, pickup.0, pickup.1),
                dropoff: Location::new(2 * id + 1, dropoff.0, dropoff.1),
                earliest_pickup_time: 0.0,
                latest_pickup_time: 0.0,
                latest_dropoff_time: 0.0,
                load: 1,
                direct_travel_time: 0.0,
                direct_distance: 0.0,
            },
            0.0,
        );
    }

    #[test]
    fn test_empty_sequence_is_trivially_complete() {
        let mut generator = EuclideanSequenceGenerator::new(&[], &[], None);
        assert!(generator.has_next());
        assert!(generator.is_complete());
        assert!(generator.current().is_empty());

        generator.advance();
        assert!(!generator.has_next());
    }

    #[test]
    fn test_single_linear_walk() {
        let mut pool = RequestPool::new();
        submit(&mut pool, 0, (36.10, -115.17), (36.20, -115.17));
        submit(&mut pool, 1, (36.11, -115.17), (36.15, -115.17));
        let requests: Vec<&Request> = pool.iter().collect();

        let origin = Location::new(100, 36.09, -115.17);
        let mut generator = EuclideanSequenceGenerator::new(&[], &requests, Some(origin));

        assert_eq!(count_sequences(&mut generator), (4, 1));
    }

    #[test]
    fn test_visits_nearest_stop_first() {
        let mut pool = RequestPool::new();
        submit(&mut pool, 0, (36.10, -115.17), (36.20, -115.17));
        submit(&mut pool, 1, (36.11, -115.17), (36.15, -115.17));
        let requests: Vec<&Request> = pool.iter().collect();

        let origin = Location::new(100, 36.09, -115.17);
        let mut generator = EuclideanSequenceGenerator::new(&[], &requests, Some(origin));
        while !generator.is_complete() {
            generator.advance();
        }

        let expected = vec![
            Stop::pickup(requests[0]),
            Stop::pickup(requests[1]),
            Stop::dropoff(requests[1]),
            Stop::dropoff(requests[0]),
        ];
        assert_eq!(generator.current(), expected.as_slice());
    }

    #[test]
    fn test_abort_ends_search() {
        let mut pool = RequestPool::new();
        submit(&mut pool, 0, (36.10, -115.17), (36.20, -115.17));
        let requests: Vec<&Request> = pool.iter().collect();

        let mut generator = EuclideanSequenceGenerator::new(&[], &requests, None);
        assert_eq!(generator.current().len(), 1);

        generator.abort();
        assert!(!generator.has_next());
    }
}

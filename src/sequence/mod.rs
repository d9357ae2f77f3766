//! Stop sequence generators.
//!
//! A generator walks the orderings of pickups and dropoffs for one vehicle
//! depth first. The caller inspects every prefix and either accepts it
//! ([`SequenceGenerator::advance`], extend further) or rejects it
//! ([`SequenceGenerator::abort`], skip everything below it). Precedence is
//! enforced here: no dropoff before its pickup, no stop twice, and onboard
//! requests only contribute their dropoff.

mod combined;
mod euclidean;
mod extensive;
mod insertive;

pub use combined::CombinedSequenceGenerator;
pub use euclidean::EuclideanSequenceGenerator;
pub use extensive::ExtensiveSequenceGenerator;
pub use insertive::InsertiveSequenceGenerator;

use serde::{Deserialize, Serialize};

use crate::request::Request;
use crate::stop::{Stop, StopKind};
use crate::vehicle::Vehicle;

pub trait SequenceGenerator {
    /// More prefixes remain to be explored.
    fn has_next(&self) -> bool;

    /// The prefix currently exposed.
    fn current(&self) -> &[Stop];

    /// The current prefix contains every stop.
    fn is_complete(&self) -> bool;

    /// Accepts the current prefix and moves on to its first extension.
    fn advance(&mut self);

    /// Rejects the current prefix and everything that extends it.
    fn abort(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceGeneratorKind {
    Extensive,
    Insertive,
    Combined,
    EuclideanBestResponse,
}

/// Creates the configured generator for each route evaluation.
#[derive(Debug, Clone, Copy)]
pub struct SequenceGeneratorFactory {
    pub kind: SequenceGeneratorKind,
    /// Load from which the combined generator switches to insertion.
    pub insertion_start_occupancy: u32,
}

impl Default for SequenceGeneratorFactory {
    fn default() -> Self {
        Self {
            kind: SequenceGeneratorKind::Combined,
            insertion_start_occupancy: 5,
        }
    }
}

impl SequenceGeneratorFactory {
    pub fn new(kind: SequenceGeneratorKind, insertion_start_occupancy: u32) -> Self {
        Self {
            kind,
            insertion_start_occupancy,
        }
    }

    pub fn create(
        &self,
        vehicle: &Vehicle,
        onboard: &[&Request],
        requests: &[&Request],
    ) -> Box<dyn SequenceGenerator> {
        match self.kind {
            SequenceGeneratorKind::Extensive => {
                Box::new(ExtensiveSequenceGenerator::new(onboard, requests))
            }
            SequenceGeneratorKind::Insertive => Box::new(InsertiveSequenceGenerator::new(
                onboard,
                requests,
                &vehicle.route,
            )),
            SequenceGeneratorKind::Combined => Box::new(CombinedSequenceGenerator::new(
                onboard,
                requests,
                &vehicle.route,
                self.insertion_start_occupancy,
            )),
            SequenceGeneratorKind::EuclideanBestResponse => Box::new(
                EuclideanSequenceGenerator::new(onboard, requests, Some(vehicle.diversion.location)),
            ),
        }
    }
}

/// One stop that still has to be placed somewhere in the sequence.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub stop: Stop,
    /// Local request index; onboard requests come first.
    pub request: usize,
    /// Position in the committed route, for stops that keep their order.
    pub rank: Option<usize>,
}

impl Slot {
    fn is_pickup(&self) -> bool {
        self.stop.kind == StopKind::Pickup
    }
}

/// Onboard requests yield a dropoff slot, new requests a pickup and a
/// dropoff slot.
pub(crate) fn build_slots(onboard: &[&Request], requests: &[&Request]) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(onboard.len() + 2 * requests.len());

    for (index, request) in onboard.iter().enumerate() {
        slots.push(Slot {
            stop: Stop::dropoff(request),
            request: index,
            rank: None,
        });
    }

    for (offset, request) in requests.iter().enumerate() {
        let index = onboard.len() + offset;
        slots.push(Slot {
            stop: Stop::pickup(request),
            request: index,
            rank: None,
        });
        slots.push(Slot {
            stop: Stop::dropoff(request),
            request: index,
            rank: None,
        });
    }

    slots
}

/// Depth-first search over slot permutations with an explicit stack of the
/// slot chosen at each depth.
#[derive(Debug, Clone)]
pub(crate) struct SlotSearch {
    slots: Vec<Slot>,
    stack: Vec<usize>,
    used: Vec<bool>,
    picked_up: Vec<bool>,
    prefix: Vec<Stop>,
    /// The top of the stack broke the committed order and may not be extended.
    dead_end: bool,
    finished: bool,
}

impl SlotSearch {
    pub fn new(slots: Vec<Slot>, onboard: usize) -> Self {
        let requests = slots
            .iter()
            .map(|slot| slot.request + 1)
            .max()
            .unwrap_or(0)
            .max(onboard);

        let mut picked_up = vec![false; requests];
        picked_up[..onboard].fill(true);

        let mut search = Self {
            used: vec![false; slots.len()],
            stack: Vec::with_capacity(slots.len()),
            prefix: Vec::with_capacity(slots.len()),
            slots,
            picked_up,
            dead_end: false,
            finished: false,
        };

        if let Some(first) = search.next_candidate(0) {
            search.push(first);
        }

        search
    }

    fn is_candidate(&self, index: usize) -> bool {
        let slot = &self.slots[index];
        !self.used[index] && (slot.is_pickup() || self.picked_up[slot.request])
    }

    fn next_candidate(&self, from: usize) -> Option<usize> {
        (from..self.slots.len()).find(|&index| self.is_candidate(index))
    }

    fn breaks_order(&self, index: usize) -> bool {
        let Some(rank) = self.slots[index].rank else {
            return false;
        };

        self.slots
            .iter()
            .enumerate()
            .any(|(other, slot)| !self.used[other] && slot.rank.is_some_and(|r| r < rank))
    }

    fn push(&mut self, index: usize) {
        self.dead_end = self.breaks_order(index);

        let slot = self.slots[index];
        self.used[index] = true;
        if slot.is_pickup() {
            self.picked_up[slot.request] = true;
        }

        self.stack.push(index);
        self.prefix.push(slot.stop);
    }

    fn pop(&mut self) -> Option<usize> {
        let index = self.stack.pop()?;
        let slot = self.slots[index];

        self.used[index] = false;
        if slot.is_pickup() {
            self.picked_up[slot.request] = false;
        }

        self.prefix.pop();
        self.dead_end = false;
        Some(index)
    }

    /// Replaces the deepest position that still has an untried alternative.
    fn next_sibling(&mut self) {
        while let Some(index) = self.pop() {
            if let Some(next) = self.next_candidate(index + 1) {
                self.push(next);
                return;
            }
        }

        self.finished = true;
    }

    pub fn has_next(&self) -> bool {
        !self.finished
    }

    pub fn current(&self) -> &[Stop] {
        &self.prefix
    }

    pub fn is_complete(&self) -> bool {
        self.stack.len() == self.slots.len()
    }

    pub fn advance(&mut self) {
        if self.finished {
            return;
        }

        if self.dead_end || self.is_complete() {
            self.next_sibling();
            return;
        }

        match self.next_candidate(0) {
            Some(next) => self.push(next),
            None => self.next_sibling(),
        }
    }

    pub fn abort(&mut self) {
        if !self.finished {
            self.next_sibling();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::SequenceGenerator;

    /// Walks a generator accepting every prefix; returns (prefixes, complete).
    pub fn count_sequences(generator: &mut dyn SequenceGenerator) -> (usize, usize) {
        let mut partial = 0;
        let mut complete = 0;

        while generator.has_next() {
            partial += 1;

            if generator.is_complete() {
                complete += 1;
            }

            generator.advance();
        }

        (partial, complete)
    }
}

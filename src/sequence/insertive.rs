//! Insertion of new requests into an already committed route.

use crate::request::Request;
use crate::stop::Stop;

use super::{SequenceGenerator, SlotSearch, build_slots};

/// Keeps the stops of the committed route in their current order and only
/// explores where the remaining stops go in between.
///
/// A prefix that places a committed stop ahead of an earlier committed stop
/// is still exposed once, but it can only be rejected; advancing from it
/// behaves like [`SequenceGenerator::abort`].
#[derive(Debug, Clone)]
pub struct InsertiveSequenceGenerator {
    search: SlotSearch,
}

impl InsertiveSequenceGenerator {
    pub fn new(onboard: &[&Request], requests: &[&Request], route: &[Stop]) -> Self {
        let mut slots = build_slots(onboard, requests);

        for slot in &mut slots {
            slot.rank = route.iter().position(|stop| {
                stop.kind == slot.stop.kind && stop.request == slot.stop.request
            });
        }

        Self {
            search: SlotSearch::new(slots, onboard.len()),
        }
    }
}

impl SequenceGenerator for InsertiveSequenceGenerator {
    fn has_next(&self) -> bool {
        self.search.has_next()
    }

    fn current(&self) -> &[Stop] {
        self.search.current()
    }

    fn is_complete(&self) -> bool {
        self.search.is_complete()
    }

    fn advance(&mut self) {
        self.search.advance();
    }

    fn abort(&mut self) {
        self.search.abort();
    }
}

//! Exhaustive enumeration of all valid pickup/dropoff orderings.

use crate::request::Request;
use crate::stop::Stop;

use super::{SequenceGenerator, SlotSearch, build_slots};

/// Tries every arrangement of the stops. Grows factorially, so it is meant
/// for small request sets.
#[derive(Debug, Clone)]
pub struct ExtensiveSequenceGenerator {
    search: SlotSearch,
}

impl ExtensiveSequenceGenerator {
    pub fn new(onboard: &[&Request], requests: &[&Request]) -> Self {
        Self {
            search: SlotSearch::new(build_slots(onboard, requests), onboard.len()),
        }
    }
}

impl SequenceGenerator for ExtensiveSequenceGenerator {
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

use crate::request::Request;
use crate::stop::Stop;

use super::{ExtensiveSequenceGenerator, InsertiveSequenceGenerator, SequenceGenerator};

/// Exhaustive search for small loads, insertion into the committed route
/// once the summed load of onboard and new requests reaches the threshold.
#[derive(Debug, Clone)]
pub enum CombinedSequenceGenerator {
    Extensive(ExtensiveSequenceGenerator),
    Insertive(InsertiveSequenceGenerator),
}

impl CombinedSequenceGenerator {
    pub fn new(
        onboard: &[&Request],
        requests: &[&Request],
        route: &[Stop],
        insertion_start_occupancy: u32,
    ) -> Self {
        let load: u32 = onboard
            .iter()
            .chain(requests)
            .map(|request| request.load())
            .sum();

        if load >= insertion_start_occupancy {
            Self::Insertive(InsertiveSequenceGenerator::new(onboard, requests, route))
        } else {
            Self::Extensive(ExtensiveSequenceGenerator::new(onboard, requests))
        }
    }

    fn inner(&self) -> &dyn SequenceGenerator {
        match self {
            Self::Extensive(generator) => generator,
            Self::Insertive(generator) => generator,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SequenceGenerator {
        match self {
            Self::Extensive(generator) => generator,
            Self::Insertive(generator) => generator,
        }
    }
}

impl SequenceGenerator for CombinedSequenceGenerator {
    fn has_next(&self) -> bool {
        self.inner().has_next()
    }

    fn current(&self) -> &[Stop] {
        self.inner().current()
    }

    fn is_complete(&self) -> bool {
        self.inner().is_complete()
    }

    fn advance(&mut self) {
        self.inner_mut().advance();
    }

    fn abort(&mut self) {
        self.inner_mut().abort();
    }
}

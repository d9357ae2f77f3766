//! ride-pool-dispatch core
//!
//! Trip-vehicle assignment for pooled ride fleets: stop sequence search,
//! route evaluation, trip graphs, and assignment and relocation solvers.

pub mod assignment;
pub mod cbc;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod function;
pub mod graph;
pub mod haversine;
pub mod osrm;
pub mod relocation;
pub mod request;
pub mod sequence;
pub mod stop;
pub mod tracker;
pub mod traits;
pub mod trip;
pub mod vehicle;

pub use config::DispatchConfig;
pub use dispatcher::{Dispatcher, DispatchOutcome};
pub use error::DispatchError;

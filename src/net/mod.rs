//! Network helpers

mod probe;

pub use probe::{Connectivity, NetworkProbe};

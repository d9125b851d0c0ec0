// src/selector/mod.rs
mod round_robin;

pub use round_robin::RoundRobin;

use crate::registry::Backend;
use std::sync::Arc;

/// Picks one backend out of the already-filtered eligible sequence.
///
/// Selection is synchronous and bounded-time: it never waits on I/O or on
/// another operation. Any timeout semantics belong to the actual network
/// call to the chosen backend, which is not this crate's job.
pub trait SelectionAlgorithm: Send + Sync {
    fn select(&self, eligible: &[Arc<Backend>]) -> Option<Arc<Backend>>;

    fn name(&self) -> &'static str;
}

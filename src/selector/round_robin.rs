// src/selector/round_robin.rs
use super::SelectionAlgorithm;
use crate::registry::Backend;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Round-robin over the eligible sequence.
///
/// The cursor indexes the *eligible* list handed to `select`, not the raw
/// registry order, so ineligible backends never consume rotation slots.
/// When the eligible set changes between calls the cursor still advances by
/// one position in whatever the current ordering is: fairness is exact while
/// the set is stable and approximate under churn. Exact fairness under a
/// changing set would need a stronger protocol (weighted or
/// least-connections), which this router does not attempt.
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionAlgorithm for RoundRobin {
    fn select(&self, eligible: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if eligible.is_empty() {
            return None;
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % eligible.len();
        Some(eligible[index].clone())
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Address;

    fn backends(n: usize) -> Vec<Arc<Backend>> {
        (0..n)
            .map(|i| Arc::new(Backend::new(Address::new("host", 8000 + i as u16))))
            .collect()
    }

    #[test]
    fn empty_sequence_yields_none() {
        assert!(RoundRobin::new().select(&[]).is_none());
    }

    #[test]
    fn stable_set_rotates_through_every_backend_once() {
        let pool = backends(3);
        let selector = RoundRobin::new();

        for round in 0..2 {
            for expected in &pool {
                let picked = selector.select(&pool).unwrap();
                assert_eq!(picked.id, expected.id, "round {round}");
            }
        }
    }

    #[test]
    fn cursor_wraps_when_set_shrinks() {
        let pool = backends(3);
        let selector = RoundRobin::new();
        selector.select(&pool).unwrap();
        selector.select(&pool).unwrap();

        // Only one backend left; every subsequent pick must return it.
        let survivor = vec![pool[2].clone()];
        for _ in 0..4 {
            assert_eq!(selector.select(&survivor).unwrap().id, pool[2].id);
        }
    }
}

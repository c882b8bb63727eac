//! Endpoint ordering port for multi-endpoint services.
//!
//! The scheduler probes a multi-endpoint service sequentially and stops at
//! the first `down` result, so the order decides which endpoints are probed.
//! Keeping the ordering behind a trait lets tests fix it.

use crate::monitor::domain::Endpoint;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::{Mutex, PoisonError};

/// Decides the probing order of a service's endpoints for one cycle.
pub trait EndpointOrdering: Send + Sync {
    /// Reorders `endpoints` in place.
    fn order(&self, endpoints: &mut [Endpoint]);
}

/// Uniform random permutation, drawn fresh on every call.
#[derive(Debug)]
pub struct RandomOrdering {
    rng: Mutex<StdRng>,
}

impl RandomOrdering {
    /// Creates an ordering seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a reproducible ordering from a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomOrdering {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl EndpointOrdering for RandomOrdering {
    fn order(&self, endpoints: &mut [Endpoint]) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        endpoints.shuffle(&mut *rng);
    }
}

/// Leaves endpoints in catalog order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogOrdering;

impl EndpointOrdering for CatalogOrdering {
    fn order(&self, _endpoints: &mut [Endpoint]) {}
}

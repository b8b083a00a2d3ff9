//! Priority-ordered endpoint buckets for a single route or event,
//! ported from `internal/dispatcher/event.go`'s four-bucket
//! `VisitEndpoints` iteration.

use super::endpoint::Endpoint;
use rand::prelude::IndexedRandom;

/// Four priority tiers of `(instance_id, endpoint)` pairs. Lower-numbered
/// buckets are preferred; a rebuild replaces the whole set atomically so
/// a `visit` in progress never observes a half-built bucket.
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    pub b1: Vec<Endpoint>,
    pub b2: Vec<Endpoint>,
    pub b3: Vec<Endpoint>,
    pub b4: Vec<Endpoint>,
}

impl Buckets {
    pub fn is_empty(&self) -> bool {
        self.b1.is_empty() && self.b2.is_empty() && self.b3.is_empty() && self.b4.is_empty()
    }

    pub fn len(&self) -> usize {
        self.b1.len() + self.b2.len() + self.b3.len() + self.b4.len()
    }

    /// Visit every endpoint in priority order, stopping as soon as `f`
    /// returns `false`.
    pub fn visit(&self, mut f: impl FnMut(&Endpoint) -> bool) {
        for tier in [&self.b1, &self.b2, &self.b3, &self.b4] {
            for ep in tier {
                if !f(ep) {
                    return;
                }
            }
        }
    }

    /// Visit every endpoint across all four buckets unconditionally, used
    /// for event fan-out where every subscriber must be reached.
    pub fn visit_all(&self, mut f: impl FnMut(&Endpoint)) {
        for tier in [&self.b1, &self.b2, &self.b3, &self.b4] {
            for ep in tier {
                f(ep);
            }
        }
    }

    /// Weighted-random pick within the first non-empty bucket, matching
    /// the teacher's loadbalancer weighted-choice pattern.
    pub fn pick_weighted(&self) -> Option<&Endpoint> {
        for tier in [&self.b1, &self.b2, &self.b3, &self.b4] {
            if tier.is_empty() {
                continue;
            }
            let mut rng = rand::rng();
            return tier.choose_weighted(&mut rng, |ep| ep.weight as f64).ok();
        }
        None
    }
}

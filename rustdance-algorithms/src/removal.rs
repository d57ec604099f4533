//! Random crystal removal diagnostic.
//!
//! For stage `k`, `k` distinct crystals of an accepted composite event are
//! dropped at random and the reduced event is recorded. Removals accumulate
//! across stages of the same event: stage `k + 1` drops the crystals of
//! stage `k` plus one more. Sampling is a partial Fisher-Yates shuffle, so
//! no index is ever drawn twice.

use crate::spectra;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustdance_core::{CompositeEvent, DistributionSink, RemovalConfig};

/// Seeded sampler for the removal diagnostic.
#[derive(Debug, Clone)]
pub struct RemovalSampler {
    rng: StdRng,
    max_removed: usize,
    order: Vec<usize>,
}

impl RemovalSampler {
    /// Creates a sampler from its configuration.
    #[must_use]
    pub fn new(config: &RemovalConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            max_removed: config.max_removed,
            order: Vec::new(),
        }
    }

    /// Draws the removal order for an event of `mult` crystals, up to `stages` removals.
    ///
    /// The first `k` entries of the returned slice are the hits removed at stage `k`.
    pub fn draw(&mut self, mult: usize, stages: usize) -> &[usize] {
        self.order.clear();
        self.order.extend(0..mult);
        let draws = stages.min(mult);
        for i in 0..draws {
            let j = self.rng.gen_range(i..mult);
            self.order.swap(i, j);
        }
        &self.order[..draws]
    }

    /// Records the reduced-event distributions for every stage `k` with `Mcr > k`.
    #[allow(clippy::cast_precision_loss)]
    pub fn record<S: DistributionSink + ?Sized>(&mut self, event: &CompositeEvent, sink: &mut S) {
        let mult = event.crystal_mult();
        let stages = self.max_removed.saturating_sub(1).min(mult.saturating_sub(1));
        if stages == 0 {
            return;
        }
        let (Some(&tof_corr), Some(&en_corr)) = (event.tof_corr.first(), event.en_corr.first()) else {
            return;
        };

        let removed_order = self.draw(mult, stages).to_vec();
        let mut removed = vec![false; mult];
        for (k, &hit) in removed_order.iter().enumerate() {
            removed[hit] = true;
            let stage = k + 1;
            let esum: f64 = event
                .energy
                .iter()
                .zip(&removed)
                .filter(|&(_, &gone)| !gone)
                .map(|(&e, _)| e)
                .sum();
            let remaining = (mult - stage) as f64;
            sink.record(&spectra::tof_esum_mcr_removed(stage), &[tof_corr, esum, remaining]);
            sink.record(&spectra::en_esum_mcr_removed(stage), &[en_corr, esum, remaining]);
        }
    }
}

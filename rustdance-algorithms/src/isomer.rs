//! Prompt/delayed isomer bookkeeping.
//!
//! Composite events matching a prompt or delayed window push their lead
//! corrected TOF onto a per-definition buffer. At every marker the buffers
//! are crossed into delayed-minus-prompt time differences and cleared.

use crate::spectra;
use rustdance_core::{DistributionSink, IsomerDefinition};

/// Buffers of one isomer definition.
#[derive(Debug, Clone, Default)]
struct IsomerBuffers {
    prompt: Vec<f64>,
    delayed: Vec<f64>,
}

/// Tracks prompt and delayed candidates between markers.
#[derive(Debug, Clone, Default)]
pub struct IsomerTracker {
    definitions: Vec<IsomerDefinition>,
    buffers: Vec<IsomerBuffers>,
}

impl IsomerTracker {
    /// Creates a tracker for `definitions`.
    #[must_use]
    pub fn new(definitions: Vec<IsomerDefinition>) -> Self {
        let buffers = vec![IsomerBuffers::default(); definitions.len()];
        Self {
            definitions,
            buffers,
        }
    }

    /// Number of definitions tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if no definitions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Checks one accepted composite event against every definition.
    pub fn observe<S: DistributionSink + ?Sized>(
        &mut self,
        tof_corr: f64,
        cluster_mult: usize,
        esum: f64,
        sink: &mut S,
    ) {
        for (index, (definition, buffers)) in self
            .definitions
            .iter()
            .zip(self.buffers.iter_mut())
            .enumerate()
        {
            if definition.prompt.matches(tof_corr, cluster_mult, esum) {
                buffers.prompt.push(tof_corr);
                sink.record(&spectra::isomer_prompt(index), &[tof_corr]);
            }
            if definition.delayed.matches(tof_corr, cluster_mult, esum) {
                buffers.delayed.push(tof_corr);
                sink.record(&spectra::isomer_delayed(index), &[tof_corr]);
            }
        }
    }

    /// Records every delayed-minus-prompt pair and clears all buffers.
    ///
    /// Returns the number of time differences recorded.
    pub fn flush<S: DistributionSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let mut recorded = 0;
        for (index, buffers) in self.buffers.iter_mut().enumerate() {
            if buffers.prompt.is_empty() || buffers.delayed.is_empty() {
                buffers.prompt.clear();
                buffers.delayed.clear();
                continue;
            }
            let name = spectra::isomer_tdiff(index);
            for &prompt in &buffers.prompt {
                for &delayed in &buffers.delayed {
                    sink.record(&name, &[delayed - prompt]);
                    recorded += 1;
                }
            }
            buffers.prompt.clear();
            buffers.delayed.clear();
        }
        recorded
    }

    /// Buffered (prompt, delayed) counts of definition `index`.
    #[must_use]
    pub fn pending(&self, index: usize) -> Option<(usize, usize)> {
        self.buffers
            .get(index)
            .map(|b| (b.prompt.len(), b.delayed.len()))
    }
}

//! Grouping of a time-ordered hit stream into bursts.
//!
//! A burst opens with its first hit and closes when a later hit falls at or
//! beyond the coincidence window from that first hit, or when a marker
//! arrives. The closing hit opens the next burst, so every marker leads the
//! burst it belongs to.

use rustdance_core::{ChannelId, RawHit};

/// Incremental burst builder.
#[derive(Debug, Clone)]
pub struct BurstBuilder {
    window_ns: f64,
    marker: ChannelId,
    current: Vec<RawHit>,
    out_of_order: u64,
}

impl BurstBuilder {
    /// Creates a builder closing bursts after `window_ns` or at a `marker` hit.
    #[must_use]
    pub fn new(window_ns: f64, marker: ChannelId) -> Self {
        Self {
            window_ns,
            marker,
            current: Vec::new(),
            out_of_order: 0,
        }
    }

    /// Adds a hit; returns the burst it closed, if any.
    pub fn push(&mut self, hit: RawHit) -> Option<Vec<RawHit>> {
        let closes = match (self.current.first(), self.current.last()) {
            (Some(first), Some(last)) => {
                if hit.timestamp < last.timestamp {
                    self.out_of_order += 1;
                    log::debug!(
                        "hit on channel {} at {} ns precedes {} ns",
                        hit.channel,
                        hit.timestamp,
                        last.timestamp
                    );
                }
                hit.channel == self.marker || hit.timestamp - first.timestamp >= self.window_ns
            }
            _ => false,
        };
        let closed = closes.then(|| std::mem::take(&mut self.current));
        self.current.push(hit);
        closed
    }

    /// Returns the burst still being built.
    pub fn finish(&mut self) -> Option<Vec<RawHit>> {
        (!self.current.is_empty()).then(|| std::mem::take(&mut self.current))
    }

    /// Hits held by the open burst.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.current.len()
    }

    /// Hits seen earlier than their predecessor.
    #[must_use]
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }
}

/// Iterator over the bursts of a hit stream.
pub struct Bursts<I> {
    hits: I,
    builder: BurstBuilder,
}

impl<I: Iterator<Item = RawHit>> Iterator for Bursts<I> {
    type Item = Vec<RawHit>;

    fn next(&mut self) -> Option<Self::Item> {
        for hit in self.hits.by_ref() {
            if let Some(burst) = self.builder.push(hit) {
                return Some(burst);
            }
        }
        self.builder.finish()
    }
}

/// Splits `hits` into bursts.
pub fn bursts<I: IntoIterator<Item = RawHit>>(hits: I, window_ns: f64, marker: ChannelId) -> Bursts<I::IntoIter> {
    Bursts {
        hits: hits.into_iter(),
        builder: BurstBuilder::new(window_ns, marker),
    }
}

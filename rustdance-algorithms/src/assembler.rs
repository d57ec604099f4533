//! Burst walking and composite event assembly.
//!
//! The assembler owns the state that must stay burst-sequential: the last
//! timestamp seen on every channel, the marker-period counters, and the
//! dead-time clock of accepted composite events.

use crate::isomer::IsomerTracker;
use crate::spectra::{self, MonitorSpectra};
use rustdance_core::{
    ChannelId, ChannelMap, CompositeEvent, DistributionSink, MonitorEvent, MonitorKind, RawHit,
    RunCounters, TimingPairTable, CHANNEL_SLOTS,
};

/// Per-burst output of [`EventAssembler::assemble`] besides the composite event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledBurst {
    /// Last readout of each monitor, indexed by [`MonitorKind::index`].
    pub monitors: [Option<MonitorEvent>; 4],
    /// Valid gamma hits dropped because the event was full.
    pub dropped_hits: usize,
    /// TOF of the last hit minus TOF of the first.
    pub tof_span: f64,
    /// Isomer time differences recorded at markers in this burst.
    pub isomer_pairs: usize,
}

/// Outcome of the dead-time check for a composite event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Accepted; `gap` is the time since the previous accepted event, if any.
    Accepted { gap: Option<f64> },
    /// No marker has been seen yet this run.
    NoMarker,
    /// Inside the dead time of the previous accepted event.
    Blocked { gap: f64 },
}

/// Walks bursts and keeps the cross-burst timing state.
#[derive(Debug, Clone)]
pub struct EventAssembler {
    channels: ChannelMap,
    reference: ChannelId,
    last_timestamp: Vec<Option<f64>>,
    marker_count: u64,
    entries_per_marker: u64,
    events_per_marker: u64,
    last_accepted: Option<f64>,
    last_event: Option<f64>,
}

impl EventAssembler {
    /// Creates an assembler for the given channel assignments.
    #[must_use]
    pub fn new(channels: ChannelMap) -> Self {
        Self {
            channels,
            reference: channels.reference,
            last_timestamp: vec![None; CHANNEL_SLOTS],
            marker_count: 0,
            entries_per_marker: 0,
            events_per_marker: 0,
            last_accepted: None,
            last_event: None,
        }
    }

    /// Returns true once a marker has been seen.
    #[must_use]
    pub fn marker_seen(&self) -> bool {
        self.last_seen(self.channels.t0).is_some()
    }

    /// Number of markers seen.
    #[must_use]
    pub fn marker_count(&self) -> u64 {
        self.marker_count
    }

    /// Timestamp of the most recent hit on `channel`.
    #[must_use]
    pub fn last_seen(&self, channel: ChannelId) -> Option<f64> {
        self.last_timestamp.get(channel.index()).copied().flatten()
    }

    /// Lead timestamp of the most recent composite event, accepted or not.
    #[must_use]
    pub fn last_event_timestamp(&self) -> Option<f64> {
        self.last_event
    }

    /// Walks one burst: records coincidence diagnostics, fills `event` with
    /// the valid gamma hits, closes marker periods and collects monitors.
    pub fn assemble<S: DistributionSink + ?Sized>(
        &mut self,
        burst: &[RawHit],
        timing: &TimingPairTable,
        event: &mut CompositeEvent,
        isomers: &mut IsomerTracker,
        counters: &mut RunCounters,
        sink: &mut S,
    ) -> AssembledBurst {
        event.clear();
        let mut out = AssembledBurst::default();
        let (Some(first), Some(last)) = (burst.first(), burst.last()) else {
            return out;
        };

        #[allow(clippy::cast_precision_loss)]
        let size = burst.len() as f64;
        let span = last.timestamp - first.timestamp;
        sink.record(spectra::BURST_LENGTH, &[span]);
        sink.record(spectra::BURST_LENGTH_SIZE, &[span, size]);
        out.tof_span = last.tof - first.tof;

        for (i, hit) in burst.iter().enumerate() {
            let channel = hit.channel;

            if channel.is_crystal() {
                self.record_coincidences(hit, &burst[i + 1..], timing, sink);

                if hit.is_valid_gamma() {
                    if event.push(hit) {
                        self.entries_per_marker += 1;
                        counters.dance_entries_analyzed += 1;
                    } else {
                        out.dropped_hits += 1;
                    }
                }
            }

            if channel == self.channels.t0 {
                out.isomer_pairs += self.close_marker_period(hit.timestamp, isomers, counters, sink);
            }

            if let Some(kind) = self.channels.monitor_kind(channel) {
                counters.monitor_entries_analyzed[kind.index()] += 1;
                out.monitors[kind.index()] = Some(MonitorEvent::from_hit(kind, hit));
                if let Some(previous) = self.last_seen(channel) {
                    sink.record(&MonitorSpectra::of(kind).time_between, &[hit.timestamp - previous]);
                }
            }

            counters.entries_analyzed += 1;
            if let Some(slot) = self.last_timestamp.get_mut(channel.index()) {
                *slot = Some(hit.timestamp);
            }
        }

        out
    }

    /// Coincidence, reference and neighbour time differences of `hit` against later crystal hits.
    fn record_coincidences<S: DistributionSink + ?Sized>(
        &self,
        hit: &RawHit,
        later: &[RawHit],
        timing: &TimingPairTable,
        sink: &mut S,
    ) {
        let a = hit.channel;
        for other in later.iter().filter(|h| h.channel.is_crystal()) {
            let b = other.channel;
            let dt = other.timestamp - hit.timestamp;

            sink.record(spectra::COINCIDENCE, &[a.as_f64(), b.as_f64()]);
            sink.record(spectra::COINCIDENCE, &[b.as_f64(), a.as_f64()]);

            if a == self.reference {
                sink.record(spectra::TIME_DEV_REL_REF, &[-dt, b.as_f64()]);
            }
            if b == self.reference {
                sink.record(spectra::TIME_DEV_REL_REF, &[dt, a.as_f64()]);
            }

            // Coordinate is t_left - t_right, filed under the right channel,
            // which identifies the pair.
            if timing.pair_row(a, b).is_some() {
                sink.record(spectra::TIME_DEV, &[-dt, b.as_f64()]);
            }
            if timing.pair_row(b, a).is_some() {
                sink.record(spectra::TIME_DEV, &[dt, a.as_f64()]);
            }
        }
    }

    fn close_marker_period<S: DistributionSink + ?Sized>(
        &mut self,
        timestamp: f64,
        isomers: &mut IsomerTracker,
        counters: &mut RunCounters,
        sink: &mut S,
    ) -> usize {
        counters.events_analyzed += 1;
        counters.t0_events_analyzed += 1;
        counters.t0_entries_analyzed += 1;

        let pairs = isomers.flush(sink);

        if let Some(previous) = self.last_seen(self.channels.t0) {
            sink.record(spectra::TIME_BETWEEN_T0, &[timestamp - previous]);
        }

        #[allow(clippy::cast_precision_loss)]
        let (period, entries, events) = (
            self.marker_count as f64,
            self.entries_per_marker as f64,
            self.events_per_marker as f64,
        );
        sink.record_weighted(spectra::ENTRIES_PER_T0, &[period], entries);
        sink.record_weighted(spectra::EVENTS_PER_T0, &[period], events);

        self.entries_per_marker = 0;
        self.events_per_marker = 0;
        self.marker_count += 1;
        pairs
    }

    /// Applies the marker requirement and the non-paralyzable dead time to a
    /// composite event led at `lead`.
    ///
    /// Blocked events do not move the dead-time clock.
    pub fn admit<S: DistributionSink + ?Sized>(
        &mut self,
        lead: f64,
        blocking_time: f64,
        sink: &mut S,
    ) -> Admission {
        if !self.marker_seen() {
            return Admission::NoMarker;
        }
        self.events_per_marker += 1;
        self.last_event = Some(lead);

        match self.last_accepted {
            Some(previous) if lead - previous < blocking_time => Admission::Blocked {
                gap: lead - previous,
            },
            previous => {
                let gap = previous.map(|p| lead - p);
                if let Some(gap) = gap {
                    sink.record(spectra::TIME_BETWEEN_EVENTS, &[gap]);
                }
                self.last_accepted = Some(lead);
                Admission::Accepted { gap }
            }
        }
    }
}

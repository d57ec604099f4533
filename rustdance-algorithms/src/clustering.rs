//! Adjacency clustering of crystal hits.
//!
//! Connected components over the hit list of one composite event, where two
//! hits are connected when their crystals are listed as neighbours in the
//! adjacency table. Labels are committed monotonically: a hit that already
//! carries a label not greater than the current one is never relabelled.

use rustdance_core::{AdjacencyTable, ChannelId, CompositeEvent};

/// Reusable scratch space for [`AdjacencyClustering`].
#[derive(Debug, Default)]
pub struct ClusterState {
    worklist: Vec<ChannelId>,
}

impl ClusterState {
    /// Creates state sized for `capacity` hits.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            worklist: Vec::with_capacity(capacity),
        }
    }
}

/// Table-driven connected-components clustering.
#[derive(Debug, Clone, Copy)]
pub struct AdjacencyClustering<'a> {
    table: &'a AdjacencyTable,
}

impl<'a> AdjacencyClustering<'a> {
    /// Creates a clustering engine over `table`.
    #[must_use]
    pub fn new(table: &'a AdjacencyTable) -> Self {
        Self { table }
    }

    /// Labels every hit of `event` and fills its per-cluster energies.
    ///
    /// Expects the provisional labels set by [`CompositeEvent::push`]
    /// (hit `i` carries `i + 1`). Returns the cluster multiplicity.
    pub fn cluster(&self, event: &mut CompositeEvent, state: &mut ClusterState) -> usize {
        let mult = event.crystal_mult();
        event.cluster_energy.clear();

        if mult == 0 {
            event.cluster_mult = 0;
            return 0;
        }

        let mut label = 0usize;
        for seed in 0..mult {
            if seed != 0 && event.cluster_id[seed] <= label {
                continue;
            }
            label += 1;
            event.cluster_id[seed] = label;

            state.worklist.clear();
            state.worklist.push(event.crystal_id[seed]);

            let mut cursor = 0;
            while cursor < state.worklist.len() {
                let current = state.worklist[cursor];
                cursor += 1;

                for jj in 0..mult {
                    let candidate = event.crystal_id[jj];
                    if candidate == current || event.cluster_id[jj] <= label {
                        continue;
                    }
                    if self.table.is_neighbor(current, candidate) {
                        event.cluster_id[jj] = label;
                        state.worklist.push(candidate);
                    }
                }
            }
        }

        event.cluster_mult = label;
        event.cluster_energy.resize(label, 0.0);
        for (&id, &energy) in event.cluster_id.iter().zip(&event.energy) {
            event.cluster_energy[id - 1] += energy;
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rustdance_core::RawHit;

    fn table() -> AdjacencyTable {
        // 1-2-3 form a chain, 10 is isolated, 20-21 are a pair.
        let mut neighbors: Vec<Vec<u16>> = vec![Vec::new(); 30];
        neighbors[1] = vec![2];
        neighbors[2] = vec![1, 3];
        neighbors[3] = vec![2];
        neighbors[20] = vec![21];
        let refs: Vec<&[u16]> = neighbors.iter().map(Vec::as_slice).collect();
        AdjacencyTable::from_neighbors(&refs).unwrap()
    }

    fn event(hits: &[(u16, f64)]) -> CompositeEvent {
        let mut event = CompositeEvent::default();
        for (i, &(ch, e)) in hits.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            event.push(&RawHit::gamma(ch, i as f64, e));
        }
        event
    }

    #[test]
    fn test_single_hit() {
        let table = table();
        let mut ev = event(&[(10, 2.0)]);
        let n = AdjacencyClustering::new(&table).cluster(&mut ev, &mut ClusterState::default());
        assert_eq!(n, 1);
        assert_eq!(ev.cluster_id, vec![1]);
        assert_relative_eq!(ev.cluster_energy[0], 2.0);
    }

    #[test]
    fn test_transitive_chain() {
        let table = table();
        // 1 and 3 are not direct neighbours but share 2.
        let mut ev = event(&[(1, 1.0), (3, 3.0), (2, 2.0)]);
        let n = AdjacencyClustering::new(&table).cluster(&mut ev, &mut ClusterState::default());
        assert_eq!(n, 1);
        assert_eq!(ev.cluster_id, vec![1, 1, 1]);
        assert_relative_eq!(ev.cluster_energy[0], 6.0);
    }

    #[test]
    fn test_separate_clusters() {
        let table = table();
        let mut ev = event(&[(20, 1.0), (10, 0.5), (21, 1.5), (1, 2.0)]);
        let n = AdjacencyClustering::new(&table).cluster(&mut ev, &mut ClusterState::default());
        assert_eq!(n, 3);
        assert_eq!(ev.cluster_id, vec![1, 2, 1, 3]);
        assert_relative_eq!(ev.cluster_energy[0], 2.5);
        assert_relative_eq!(ev.cluster_energy[1], 0.5);
        assert_relative_eq!(ev.cluster_energy[2], 2.0);
    }

    #[test]
    fn test_state_reuse() {
        let table = table();
        let engine = AdjacencyClustering::new(&table);
        let mut state = ClusterState::with_capacity(8);
        let mut a = event(&[(1, 1.0), (2, 1.0)]);
        let mut b = event(&[(10, 1.0), (20, 1.0)]);
        assert_eq!(engine.cluster(&mut a, &mut state), 1);
        assert_eq!(engine.cluster(&mut b, &mut state), 2);
    }
}

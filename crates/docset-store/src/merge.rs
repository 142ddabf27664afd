//! Key batching and k-way merge for multi-key sorted-set ranges.
//!
//! Range queries over many keys are split into batches of at most
//! `batch_key_limit` keys. Each batch comes back ordered by rank, and the
//! batches are merged back into one globally ordered sequence. Equal ranks
//! fall back to insertion order, the same tie order a single query returns.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use docset_types::SortDirection;

use crate::sorted_set::RankedMember;

/// Even batch size for `total` keys with at most `limit` keys per batch:
/// `ceil(total / ceil(total / limit))`.
pub fn batch_size(total: usize, limit: usize) -> usize {
    if total == 0 || limit == 0 {
        return total;
    }
    let batches = total.div_ceil(limit);
    total.div_ceil(batches)
}

/// Split `keys` into consecutive chunks of `size`.
pub fn chunk_keys<S: Clone>(keys: &[S], size: usize) -> Vec<Vec<S>> {
    if size == 0 {
        return vec![keys.to_vec()];
    }
    keys.chunks(size).map(<[S]>::to_vec).collect()
}

/// A batch member tagged with its insertion sequence (the stored `_id`).
#[derive(Clone, Debug, PartialEq)]
pub struct BatchMember {
    pub member: RankedMember,
    pub seq: u64,
}

impl BatchMember {
    pub fn new(member: RankedMember, seq: u64) -> Self {
        Self { member, seq }
    }
}

struct Head {
    rank: f64,
    seq: u64,
    batch: usize,
    pos: usize,
    direction: SortDirection,
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest, so the wanted-first head must compare
        // greatest. Equal ranks go in insertion order in either direction.
        self.direction
            .apply(self.rank.total_cmp(&other.rank))
            .then_with(|| self.seq.cmp(&other.seq))
            .then_with(|| self.batch.cmp(&other.batch))
            .reverse()
    }
}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head {}

/// Merge batches that are each ordered by rank in `direction` (then by
/// sequence), keeping at most `limit` members.
pub fn merge_batch_sets(
    batches: Vec<Vec<BatchMember>>,
    direction: SortDirection,
    limit: Option<usize>,
) -> Vec<RankedMember> {
    let total: usize = batches.iter().map(Vec::len).sum();
    let cap = limit.map_or(total, |l| l.min(total));
    let mut heap = BinaryHeap::with_capacity(batches.len());
    for (batch, members) in batches.iter().enumerate() {
        if let Some(first) = members.first() {
            heap.push(Head {
                rank: first.member.rank,
                seq: first.seq,
                batch,
                pos: 0,
                direction,
            });
        }
    }

    let mut out = Vec::with_capacity(cap);
    while out.len() < cap {
        let Some(head) = heap.pop() else { break };
        out.push(batches[head.batch][head.pos].member.clone());
        if let Some(next) = batches[head.batch].get(head.pos + 1) {
            heap.push(Head {
                rank: next.member.rank,
                seq: next.seq,
                batch: head.batch,
                pos: head.pos + 1,
                direction,
            });
        }
    }
    out
}

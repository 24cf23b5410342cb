/*!
The repetition node kind.
*/

use crate::{
    graph::{Graph, NodeId},
    util::{
        bits::{BitLen, BitSpan, LenRange},
        count::{Cardinality, CountRange},
        rng::Rng,
        search::{Hit, Mode},
    },
};

/// When sampling, unbounded repeat counts are capped at this many counts
/// above the required minimum.
const SAMPLE_COUNT_SLACK: u64 = 8;

/// Repeats one sub-node a number of times drawn from an inclusive count
/// interval.
///
/// The greedy flag is a matching policy, not a structural property: a
/// greedy repetition prefers the largest feasible count, a non-greedy one
/// the smallest. Sequences honor the same preference when they backtrack
/// over a repetition's count to let a following sibling match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Repeat {
    pub(crate) sub: NodeId,
    pub(crate) counts: CountRange,
    pub(crate) greedy: bool,
}

/// The cumulative end offsets reachable by matching the sub-node zero or
/// more times, anchored back to back from `at`.
///
/// `offsets[k]` is the position after `k` full sub-matches. The walk stops
/// at the count cap, at the first failing sub-match, or at the first
/// zero-width sub-match (further repetitions consume nothing and are
/// indistinguishable); the second return value reports the zero-width
/// case, in which any remaining required count is trivially satisfied.
fn end_offsets(
    g: &Graph,
    rep: &Repeat,
    hay: &[u8],
    at: BitLen,
    end: BitLen,
    mode: Mode,
) -> (Vec<BitLen>, bool) {
    let mode = mode.anchored(true);
    let mut offsets = vec![at];
    let mut at = at;
    loop {
        if let Some(max) = rep.counts.max {
            if offsets.len() as u64 > max {
                break;
            }
        }
        let hit = g.match_where(rep.sub, hay, BitSpan::new(at, end), mode);
        if !hit.is_full() {
            break;
        }
        if hit.len().is_zero() {
            return (offsets, true);
        }
        at = hit.end();
        offsets.push(at);
    }
    (offsets, false)
}

/// The end positions of every full match of this repetition anchored at
/// `at`, in ascending count order. Empty when even the required count
/// cannot be reached.
pub(crate) fn candidate_ends(
    g: &Graph,
    rep: &Repeat,
    hay: &[u8],
    at: BitLen,
    end: BitLen,
    mode: Mode,
) -> Vec<BitLen> {
    let (offsets, zero_width) = end_offsets(g, rep, hay, at, end, mode);
    let achieved = (offsets.len() - 1) as u64;
    if achieved >= rep.counts.min {
        offsets[rep.counts.min as usize..].to_vec()
    } else if zero_width {
        // The sub-node matches without consuming; the missing required
        // repetitions all land on the same offset.
        vec![offsets[achieved as usize]]
    } else {
        Vec::new()
    }
}

/// Match this repetition anchored at the region start.
pub(crate) fn match_repeat(
    g: &Graph,
    rep: &Repeat,
    hay: &[u8],
    span: BitSpan,
    mode: Mode,
) -> Hit {
    let (offsets, zero_width) = end_offsets(g, rep, hay, span.start, span.end, mode);
    let achieved = (offsets.len() - 1) as u64;
    if achieved < rep.counts.min && !zero_width {
        // Ran out before the required count: a partial hit carrying what
        // the completed repetitions consumed.
        let consumed = offsets[achieved as usize].saturating_sub(span.start);
        return Hit::full(span.start, consumed).into_partial();
    }
    let count = if achieved < rep.counts.min {
        achieved
    } else if rep.greedy {
        achieved
    } else {
        rep.counts.min
    };
    let end = offsets[count as usize];
    Hit::full(span.start, end.saturating_sub(span.start))
}

/// The number of distinct instances across the permitted counts,
/// additionally clamped by `bound`.
pub(crate) fn cardinality(
    g: &Graph,
    rep: &Repeat,
    bound: CountRange,
) -> Cardinality {
    let counts = rep.counts.intersect(bound);
    if counts.is_empty() {
        return Cardinality::ZERO;
    }
    let sub = g.cardinality_within(rep.sub, bound);
    let sub_zero_width = g.len_range(rep.sub).max.is_zero();
    if sub == Cardinality::ZERO {
        // Only the empty instance remains, and only if zero counts are
        // permitted.
        return if counts.min == 0 {
            Cardinality::ONE
        } else {
            Cardinality::ZERO
        };
    }
    if sub == Cardinality::ONE {
        if sub_zero_width {
            return Cardinality::ONE;
        }
        // One instance per count, each of a distinct length.
        return match counts.max {
            None => Cardinality::MANY,
            Some(max) => {
                Cardinality::new((max - counts.min).saturating_add(1))
            }
        };
    }
    match counts.max {
        None => Cardinality::MANY,
        Some(max) => {
            let mut total = Cardinality::ZERO;
            for k in counts.min..=max {
                total = total.saturating_add(sub.saturating_pow(k));
                if total.is_saturated() {
                    break;
                }
            }
            total
        }
    }
}

/// One arbitrary instance: a count drawn from the interval (unbounded
/// intervals are capped using the caller's length budget), then that many
/// sub-instances back to back.
pub(crate) fn sample(
    g: &Graph,
    rep: &Repeat,
    lens: LenRange,
    rng: &mut Rng,
) -> Vec<u8> {
    let min = rep.counts.min;
    let cap = match rep.counts.max {
        Some(max) => max.min(min.saturating_add(SAMPLE_COUNT_SLACK)),
        None => {
            let sub_min = g.len_range(rep.sub).min;
            let budget = if lens.max.is_unbounded() || sub_min.is_zero() {
                min.saturating_add(SAMPLE_COUNT_SLACK)
            } else {
                (lens.max.get() / sub_min.get()).max(min)
            };
            budget.min(min.saturating_add(SAMPLE_COUNT_SLACK))
        }
    };
    let count = rng.in_range(min, cap.max(min));
    let mut out = Vec::new();
    for _ in 0..count {
        out.extend(g.sample_within(rep.sub, lens, rng));
    }
    out
}

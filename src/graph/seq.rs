/*!
The sequence node kind: ordered concatenation of sub-nodes.
*/

use crate::{
    graph::{Graph, Kind, NodeId},
    util::{
        bits::{BitLen, BitSpan},
        search::{Hit, Mode},
    },
};

/// An ordered concatenation of sub-nodes.
///
/// Matching walks the subs in order, each anchored at the position the
/// previous one stopped. Finalization compiles the sub list into a step
/// plan in which adjacent constant sub-nodes are merged into single byte
/// runs, so a run of literals costs one comparison instead of one per
/// node. The plan is a cache: any edit to the sub list discards it.
#[derive(Clone, Debug)]
pub(crate) struct Seq {
    pub(crate) subs: Vec<NodeId>,
    /// The compiled step plan. Empty until finalization.
    pub(crate) plan: Vec<Step>,
}

/// One step of a compiled sequence plan.
#[derive(Clone, Debug)]
pub(crate) enum Step {
    /// A merged run of constant bytes.
    Bytes(Box<[u8]>),
    /// A sub-node matched by recursion.
    Sub(NodeId),
}

impl Seq {
    pub(crate) fn new(subs: Vec<NodeId>) -> Seq {
        Seq { subs, plan: Vec::new() }
    }
}

/// Compile the sub list into a step plan, merging adjacent constants.
///
/// `constant_of` reports a sub-node's constant value, if it denotes
/// exactly one byte string.
pub(crate) fn build_plan(
    subs: &[NodeId],
    constant_of: impl Fn(NodeId) -> Option<Vec<u8>>,
) -> Vec<Step> {
    let mut plan = Vec::with_capacity(subs.len());
    let mut run: Vec<u8> = Vec::new();
    let mut in_run = false;
    for &sub in subs {
        match constant_of(sub) {
            Some(bytes) => {
                run.extend_from_slice(&bytes);
                in_run = true;
            }
            None => {
                if in_run {
                    let bytes = core::mem::take(&mut run);
                    plan.push(Step::Bytes(bytes.into_boxed_slice()));
                    in_run = false;
                }
                plan.push(Step::Sub(sub));
            }
        }
    }
    if in_run {
        plan.push(Step::Bytes(run.into_boxed_slice()));
    }
    plan
}

/// Match this sequence anchored at the region start.
///
/// A full match is searched for with repeat-count backtracking: when a
/// direct sub-node is a repetition, its feasible counts are tried in the
/// order its greediness prefers until the rest of the sequence matches.
/// When no combination matches in full, the straight-line walk of the
/// plan provides the partial hit: the concatenation of the sub-hits
/// obtained before the first failure.
pub(crate) fn match_seq(
    g: &Graph,
    seq: &Seq,
    hay: &[u8],
    span: BitSpan,
    mode: Mode,
) -> Hit {
    let mode = mode.anchored(true);
    if let Some(end) = full_walk(g, &seq.plan, hay, span.start, span.end, mode) {
        return Hit::full(span.start, end.saturating_sub(span.start));
    }
    straight_walk(g, &seq.plan, hay, span, mode)
}

/// Recursively match the remaining steps, returning the end offset of a
/// full match if one exists.
fn full_walk(
    g: &Graph,
    steps: &[Step],
    hay: &[u8],
    at: BitLen,
    end: BitLen,
    mode: Mode,
) -> Option<BitLen> {
    let (first, rest) = match steps.split_first() {
        None => return Some(at),
        Some(x) => x,
    };
    match first {
        Step::Bytes(bytes) => {
            let next = match_bytes_step(hay, bytes, at, end, mode)?;
            full_walk(g, rest, hay, next, end, mode)
        }
        Step::Sub(id) => {
            if let Kind::Repeat(rep) = g.kind(*id) {
                let mut ends =
                    crate::graph::repeat::candidate_ends(g, rep, hay, at, end, mode);
                if rep.greedy {
                    ends.reverse();
                }
                for sub_end in ends {
                    if let Some(fin) =
                        full_walk(g, rest, hay, sub_end, end, mode)
                    {
                        return Some(fin);
                    }
                }
                None
            } else {
                let hit = g.match_where(*id, hay, BitSpan::new(at, end), mode);
                if !hit.is_full() {
                    return None;
                }
                full_walk(g, rest, hay, hit.end(), end, mode)
            }
        }
    }
}

/// The non-backtracking walk: sub-hits accumulate until the first
/// failure, whose partial consumption is not included.
fn straight_walk(
    g: &Graph,
    steps: &[Step],
    hay: &[u8],
    span: BitSpan,
    mode: Mode,
) -> Hit {
    let mut hit = Hit::zero_width(span.start);
    let mut at = span.start;
    for step in steps {
        match step {
            Step::Bytes(bytes) => {
                match match_bytes_step(hay, bytes, at, span.end, mode) {
                    Some(next) => {
                        hit.extend(&Hit::full(at, next.saturating_sub(at)));
                        at = next;
                    }
                    None => return hit.into_partial(),
                }
            }
            Step::Sub(id) => {
                let sub =
                    g.match_where(*id, hay, BitSpan::new(at, span.end), mode);
                if !sub.is_full() {
                    return hit.into_partial();
                }
                hit.extend(&sub);
                at = sub.end();
            }
        }
    }
    hit
}

/// Compare a merged byte run at bit offset `at`, returning the offset
/// past it on success. Byte runs require byte alignment.
fn match_bytes_step(
    hay: &[u8],
    bytes: &[u8],
    at: BitLen,
    end: BitLen,
    mode: Mode,
) -> Option<BitLen> {
    if bytes.is_empty() {
        return Some(at);
    }
    let width = BitLen::from_bytes(bytes.len());
    let stop = at.saturating_add(width);
    if stop > end {
        return None;
    }
    let at_byte = match at.to_byte() {
        Some(b) => b,
        None => {
            debug_assert!(false, "literal run at unaligned bit offset {:?}", at);
            return None;
        }
    };
    let within = at_byte.checked_add(bytes.len())?;
    if within > hay.len() {
        return None;
    }
    let ok = if mode.is_precise() {
        &hay[at_byte..within] == bytes
    } else {
        bytes
            .iter()
            .zip(&hay[at_byte..within])
            .all(|(&a, &b)| mode.byte_eq(a, b))
    };
    if ok {
        Some(stop)
    } else {
        None
    }
}

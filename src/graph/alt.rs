/*!
The alternation node kind: an unordered set of sub-nodes.
*/

use std::collections::HashMap;

use crate::{
    graph::{error::BuildError, Graph, NodeId},
    util::{
        bits::{BitLen, BitSpan, LenRange},
        rng::Rng,
        search::{Hit, Mode},
    },
};

/// How many candidate buffers a complement sample draws before giving up.
const COMPLEMENT_SAMPLE_TRIES: usize = 1024;

/// An unordered set of alternative sub-nodes, optionally complemented.
///
/// When every alternative denotes a single constant byte string,
/// finalization builds a dispatch table mapping content to alternative, and
/// matching becomes hash lookups instead of per-alternative attempts. The
/// table is a cache: any edit to the alternative set or the complement
/// flag discards it.
#[derive(Clone, Debug)]
pub(crate) struct Alt {
    pub(crate) subs: Vec<NodeId>,
    /// Match the complement of the alternative set, like `[^a]`.
    pub(crate) complement: bool,
    /// The literal dispatch table. `None` until finalization, or when some
    /// alternative is not a literal constant.
    pub(crate) table: Option<LitTable>,
}

impl Alt {
    pub(crate) fn new(subs: Vec<NodeId>, complement: bool) -> Alt {
        Alt { subs, complement, table: None }
    }
}

/// A dispatch table over literal-constant alternatives.
#[derive(Clone, Debug)]
pub(crate) struct LitTable {
    map: HashMap<Box<[u8]>, NodeId>,
    /// The distinct key lengths present, in descending order, so lookups
    /// prefer the longest alternative at each offset.
    key_lens: Vec<usize>,
}

impl LitTable {
    /// Build a table from `(content, alternative)` pairs. Duplicate
    /// content is rejected: an implicit overwrite would silently change
    /// which alternative a dispatch hit reports.
    pub(crate) fn build(
        entries: Vec<(Vec<u8>, NodeId)>,
    ) -> Result<LitTable, BuildError> {
        let mut map = HashMap::with_capacity(entries.len());
        let mut key_lens: Vec<usize> = Vec::new();
        for (content, sub) in entries {
            let len = content.len();
            if map.insert(content.clone().into_boxed_slice(), sub).is_some() {
                return Err(BuildError::duplicate_alternative(&content));
            }
            if !key_lens.contains(&len) {
                key_lens.push(len);
            }
        }
        key_lens.sort_unstable_by(|a, b| b.cmp(a));
        Ok(LitTable { map, key_lens })
    }

    #[inline]
    fn lookup(&self, bytes: &[u8]) -> Option<NodeId> {
        self.map.get(bytes).copied()
    }
}

/// Match this alternation, honoring the complement flag.
pub(crate) fn match_alt(
    g: &Graph,
    alt: &Alt,
    lens: LenRange,
    hay: &[u8],
    span: BitSpan,
    mode: Mode,
) -> Hit {
    let inner = match_alt_inner(g, alt, hay, span, mode);
    if !alt.complement {
        return inner;
    }
    // Complement inverts the outcome. A hit consumes the alternation's
    // minimum sample length, which finalization guarantees is defined.
    if inner.is_full() {
        return Hit::miss(span.start);
    }
    let need = lens.min;
    if span.len() >= need {
        Hit::full(span.start, need)
    } else {
        Hit::miss(span.start)
    }
}

/// The direct (non-complemented) alternation match: dispatch-table scan
/// first, then the linear fallback over the alternatives.
pub(crate) fn match_alt_inner(
    g: &Graph,
    alt: &Alt,
    hay: &[u8],
    span: BitSpan,
    mode: Mode,
) -> Hit {
    if mode.is_precise() {
        if let Some(table) = &alt.table {
            if let Some(hit) = table_scan(table, hay, span, mode) {
                return hit;
            }
        }
    }
    // Linear fallback: first full alternative wins, in unspecified order.
    for &sub in &alt.subs {
        let hit = g.match_where(sub, hay, span, mode);
        if hit.is_full() {
            return hit;
        }
    }
    Hit::miss(span.start)
}

/// Walk candidate offsets forward from the region start (just the start
/// when anchored), trying each key length that still fits.
fn table_scan(
    table: &LitTable,
    hay: &[u8],
    span: BitSpan,
    mode: Mode,
) -> Option<Hit> {
    let start = span.start.to_byte()?;
    let limit = ((span.end.get() / 8) as usize).min(hay.len());
    if start > limit {
        return None;
    }
    let last = if mode.is_anchored() { start } else { limit };
    for off in start..=last {
        for &klen in &table.key_lens {
            let end = match off.checked_add(klen) {
                None => continue,
                Some(end) => end,
            };
            if end > limit {
                continue;
            }
            if table.lookup(&hay[off..end]).is_some() {
                return Some(Hit::full(
                    BitLen::from_bytes(off),
                    BitLen::from_bytes(klen),
                ));
            }
        }
    }
    None
}

/// Detect whether every alternative is a single-byte constant and the
/// values form one contiguous inclusive run. The fold into a range node is
/// left to an explicit builder call.
pub(crate) fn detect_byte_run(
    alt: &Alt,
    constant_of: impl Fn(NodeId) -> Option<Vec<u8>>,
) -> Option<(u8, u8)> {
    if alt.subs.is_empty() || alt.complement {
        return None;
    }
    let mut values: Vec<u8> = Vec::with_capacity(alt.subs.len());
    for &sub in &alt.subs {
        let bytes = constant_of(sub)?;
        if bytes.len() != 1 {
            return None;
        }
        values.push(bytes[0]);
    }
    values.sort_unstable();
    for pair in values.windows(2) {
        if u16::from(pair[1]) != u16::from(pair[0]) + 1 {
            return None;
        }
    }
    Some((values[0], values[values.len() - 1]))
}

/// One arbitrary instance: a random alternative's instance, or for a
/// complement, a rejection-sampled byte string of the minimum length that
/// the alternative set does not match.
pub(crate) fn sample(
    g: &Graph,
    alt: &Alt,
    lens: LenRange,
    self_lens: LenRange,
    rng: &mut Rng,
) -> Vec<u8> {
    if alt.complement {
        let nbytes = self_lens.min.to_padded_bytes();
        let mut buf = vec![0; nbytes];
        for _ in 0..COMPLEMENT_SAMPLE_TRIES {
            rng.fill(&mut buf);
            let span = BitSpan::full().clamp(BitLen::from_bytes(buf.len()));
            let probe = Mode::new().anchored(true);
            if !match_alt_inner(g, alt, &buf, span, probe).is_full() {
                return buf;
            }
        }
        debug!(
            "complement sampling exhausted {} tries",
            COMPLEMENT_SAMPLE_TRIES
        );
        return buf;
    }
    if alt.subs.is_empty() {
        return Vec::new();
    }
    let pick = rng.below(alt.subs.len() as u64) as usize;
    g.sample_within(alt.subs[pick], lens, rng)
}

/*!
The pattern graph: node kinds, the arena they live in and the operations
over them.

A grammar is a directed acyclic graph of nodes. Nodes are stored in one
arena (a plain vector) and addressed by [`NodeId`]; sub-node links and
parent back-links are index lists, so sharing a sub-node between many
parents is free and safe. Construction happens through
[`Builder`]; [`Builder::finalize`] computes every derived value
(length envelopes, skip sets, dispatch tables, merged literal runs) eagerly
and returns an immutable [`Graph`] that may be matched from any number of
threads.

```
use pattern_graph::{graph::Builder, Mode};

let mut b = Builder::new();
let magic = b.literal(b"\x7fELF")?;
let root = b.seq(&[magic])?;
let g = b.grammar("elf", root)?;
let graph = b.finalize()?;

let hit = graph.grammar_match(g, b"\x7fELF\x02", Mode::new().anchored(true));
assert!(hit.is_full());
# Ok::<(), pattern_graph::BuildError>(())
```
*/

use std::collections::HashMap;

use crate::util::{
    bits::{BitLen, BitSpan, LenRange},
    count::{Cardinality, CountRange},
    rng::Rng,
    search::{Hit, Mode},
    skip::SkipSet,
};

pub use self::{
    build::Builder,
    error::BuildError,
    look::{Boundary, Lang},
};

pub(crate) mod alt;
mod build;
mod error;
pub(crate) mod literal;
mod look;
pub(crate) mod range;
pub(crate) mod repeat;
pub(crate) mod seq;
pub(crate) mod wildcard;

/// How large a merged constant a sequence plan or dispatch table will
/// materialize. Constants beyond this stay as ordinary sub-nodes.
const MAX_CONSTANT_LEN: usize = 1 << 16;

/// The identifier of a node within its graph.
///
/// Identifiers are indices into the graph's arena. They are only
/// meaningful for the graph (or builder) that issued them.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The maximum number of nodes a single graph supports.
    pub const LIMIT: usize = u32::MAX as usize;

    pub(crate) fn new(index: usize) -> Result<NodeId, BuildError> {
        if index >= NodeId::LIMIT {
            Err(BuildError::too_many_nodes(NodeId::LIMIT))
        } else {
            Ok(NodeId(index as u32))
        }
    }

    /// This identifier as an arena index.
    #[inline]
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// The identifier of a registered grammar.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct GrammarId(u32);

impl GrammarId {
    pub(crate) fn new(index: usize) -> GrammarId {
        debug_assert!(index < u32::MAX as usize);
        GrammarId(index as u32)
    }

    /// This identifier as a registry index.
    #[inline]
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Byte order for the numeric literal constructors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endian {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

/// One node of the graph.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) name: Option<Box<str>>,
    pub(crate) format: Option<Box<str>>,
    /// Nodes that have this node as a direct sub-node. Maintained by the
    /// builder and used to propagate cache invalidation upward.
    pub(crate) parents: Vec<NodeId>,
    pub(crate) kind: Kind,
    /// Cached matched-length envelope. `None` until computed.
    pub(crate) lens: Option<LenRange>,
    /// Cached leading-byte set for the precise mode. `None` until
    /// computed.
    pub(crate) leading: Option<SkipSet>,
}

impl Node {
    pub(crate) fn new(kind: Kind) -> Node {
        Node {
            name: None,
            format: None,
            parents: Vec::new(),
            kind,
            lens: None,
            leading: None,
        }
    }
}

/// The kinds of node a graph composes.
#[derive(Clone, Debug)]
pub(crate) enum Kind {
    Literal(literal::Literal),
    Wildcard(wildcard::Wildcard),
    Assert(look::Assert),
    Seq(seq::Seq),
    Alt(alt::Alt),
    Range(range::ByteRange),
    Repeat(repeat::Repeat),
}

/// The direct sub-nodes of a kind, in order.
pub(crate) fn kind_subs(kind: &Kind) -> Vec<NodeId> {
    match kind {
        Kind::Literal(_)
        | Kind::Wildcard(_)
        | Kind::Assert(_)
        | Kind::Range(_) => Vec::new(),
        Kind::Seq(s) => s.subs.clone(),
        Kind::Alt(a) => a.subs.clone(),
        Kind::Repeat(r) => vec![r.sub],
    }
}

/// The kind's name, for diagnostics.
pub(crate) fn kind_name(kind: &Kind) -> &'static str {
    match kind {
        Kind::Literal(_) => "literal",
        Kind::Wildcard(_) => "wildcard",
        Kind::Assert(_) => "assertion",
        Kind::Seq(_) => "sequence",
        Kind::Alt(_) => "alternation",
        Kind::Range(_) => "range",
        Kind::Repeat(_) => "repetition",
    }
}

pub(crate) fn cached_lens(nodes: &[Node], id: NodeId) -> LenRange {
    nodes[id.as_usize()].lens.unwrap_or(LenRange::UNDEFINED)
}

/// The matched-length envelope of a kind, from its children's cached
/// envelopes. Children must have been computed first.
pub(crate) fn lens_of_kind(nodes: &[Node], kind: &Kind) -> LenRange {
    match kind {
        Kind::Literal(lit) => {
            LenRange::exact(BitLen::from_bytes(lit.byte_len()))
        }
        Kind::Wildcard(w) => LenRange::exact(w.width),
        Kind::Assert(_) => LenRange::ZERO,
        Kind::Range(r) => {
            LenRange::exact(BitLen::from_bytes(usize::from(r.width)))
        }
        Kind::Seq(s) => s
            .subs
            .iter()
            .fold(LenRange::ZERO, |acc, &sub| {
                acc.concat(cached_lens(nodes, sub))
            }),
        Kind::Alt(a) => {
            let mut acc = LenRange::UNDEFINED;
            for &sub in &a.subs {
                acc = acc.union(cached_lens(nodes, sub));
            }
            if a.complement && !acc.is_undefined() {
                // A complement hit always consumes the minimum length.
                LenRange::exact(acc.min)
            } else {
                acc
            }
        }
        Kind::Repeat(rep) => cached_lens(nodes, rep.sub).repeat(rep.counts),
    }
}

/// The single byte string a node denotes, if it denotes exactly one.
///
/// Assertions are never constant: their zero-width value depends on where
/// they are tested. Oversized constants (see [`MAX_CONSTANT_LEN`]) report
/// `None` rather than materializing.
pub(crate) fn constant_value(nodes: &[Node], id: NodeId) -> Option<Vec<u8>> {
    match &nodes[id.as_usize()].kind {
        Kind::Literal(lit) => Some(lit.as_bytes().to_vec()),
        Kind::Wildcard(w) => {
            if w.width.is_zero() {
                Some(Vec::new())
            } else {
                None
            }
        }
        Kind::Assert(_) => None,
        Kind::Range(r) => r.constant_value(),
        Kind::Seq(s) => {
            let mut out = Vec::new();
            for &sub in &s.subs {
                out.extend(constant_value(nodes, sub)?);
                if out.len() > MAX_CONSTANT_LEN {
                    return None;
                }
            }
            Some(out)
        }
        Kind::Alt(a) => {
            if !a.complement && a.subs.len() == 1 {
                constant_value(nodes, a.subs[0])
            } else {
                None
            }
        }
        Kind::Repeat(rep) => {
            if !rep.counts.is_exact() {
                return None;
            }
            let n = rep.counts.min as usize;
            let unit = constant_value(nodes, rep.sub)?;
            if unit.len().saturating_mul(n) > MAX_CONSTANT_LEN {
                return None;
            }
            Some(unit.repeat(n))
        }
    }
}

/// The set of bytes a match of this node could start with.
///
/// The set errs toward inclusion: a byte in the set may still fail, a byte
/// outside it never matches. Consults the per-node cache for the precise
/// mode; other modes recompute.
pub(crate) fn leading_bytes(
    nodes: &[Node],
    id: NodeId,
    mode: Mode,
) -> SkipSet {
    let node = &nodes[id.as_usize()];
    if mode.is_precise() {
        if let Some(cached) = node.leading {
            return cached;
        }
    }
    match &node.kind {
        Kind::Literal(lit) => {
            let mut set = SkipSet::empty();
            lit.leading(&mut set, mode);
            set
        }
        // A wildcard starts with anything; an assertion constrains the
        // position, not the byte.
        Kind::Wildcard(_) | Kind::Assert(_) => SkipSet::all(),
        Kind::Range(r) => {
            let mut set = SkipSet::empty();
            r.leading(&mut set, mode);
            set
        }
        Kind::Seq(s) => {
            let mut set = SkipSet::empty();
            for &sub in &s.subs {
                let sub_lens = cached_lens(nodes, sub);
                if sub_lens.max.is_zero() {
                    // Zero-width: transparent to the leading byte.
                    continue;
                }
                set.union(&leading_bytes(nodes, sub, mode));
                if set.is_all() {
                    return set;
                }
                if !sub_lens.min.is_zero() {
                    return set;
                }
            }
            // Every sub is optional: the sequence can match emptily at
            // any position, so no byte can be rejected.
            SkipSet::all()
        }
        Kind::Alt(a) => {
            if a.complement {
                return SkipSet::all();
            }
            let mut set = SkipSet::empty();
            for &sub in &a.subs {
                set.union(&leading_bytes(nodes, sub, mode));
                if set.is_all() {
                    break;
                }
            }
            set
        }
        Kind::Repeat(rep) => {
            if rep.counts.min == 0 {
                SkipSet::all()
            } else {
                leading_bytes(nodes, rep.sub, mode)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct GrammarEntry {
    pub(crate) name: Box<str>,
    pub(crate) format: Option<Box<str>>,
    pub(crate) root: NodeId,
}

/// A finalized, immutable pattern graph with its registered grammars.
///
/// Everything derived (length envelopes, skip sets, dispatch tables,
/// merged literal runs) was computed by [`Builder::finalize`], so
/// matching is a read-only traversal and the graph may be shared freely
/// across threads.
#[derive(Clone, Debug)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) grammars: Vec<GrammarEntry>,
    pub(crate) by_name: HashMap<Box<str>, GrammarId>,
}

impl Graph {
    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.as_usize()]
    }

    #[inline]
    pub(crate) fn kind(&self, id: NodeId) -> &Kind {
        &self.node(id).kind
    }

    /// The number of nodes in this graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// A node's name, if one was set.
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name.as_deref()
    }

    /// A node's format tag, if one was set.
    pub fn node_format(&self, id: NodeId) -> Option<&str> {
        self.node(id).format.as_deref()
    }

    /// Match a node against `hay`, constrained to the given bit region.
    ///
    /// The region's end may be `BitSpan::full()`'s unbounded sentinel,
    /// meaning the end of the buffer. Any other region extending past the
    /// buffer is a caller bug: a debug assertion in development, a miss in
    /// release builds, since this path runs on untrusted file content.
    pub fn match_in(
        &self,
        id: NodeId,
        hay: &[u8],
        span: BitSpan,
        mode: Mode,
    ) -> Hit {
        let bits = BitLen::from_bytes(hay.len());
        let span =
            if span.end.is_unbounded() { span.clamp(bits) } else { span };
        if span.end > bits || span.start > span.end {
            debug_assert!(
                false,
                "region {:?} exceeds buffer of {:?} bits",
                span, bits,
            );
            return Hit::miss(span.start);
        }
        self.match_where(id, hay, span, mode)
    }

    /// Match a node against the whole of `hay`.
    pub fn match_bytes(&self, id: NodeId, hay: &[u8], mode: Mode) -> Hit {
        self.match_in(id, hay, BitSpan::full(), mode)
    }

    /// Match with a validated, clamped region.
    pub(crate) fn match_where(
        &self,
        id: NodeId,
        hay: &[u8],
        span: BitSpan,
        mode: Mode,
    ) -> Hit {
        match self.kind(id) {
            Kind::Literal(lit) => self.match_literal(lit, hay, span, mode),
            Kind::Alt(a) => {
                alt::match_alt(self, a, self.len_range(id), hay, span, mode)
            }
            _ => {
                let start = if mode.is_anchored() {
                    span.start
                } else {
                    match self.scan_start(id, hay, span, mode) {
                        None => return Hit::miss(span.start),
                        Some(start) => start,
                    }
                };
                self.match_leaf_or_composite(
                    id,
                    hay,
                    BitSpan::new(start, span.end),
                    mode.anchored(true),
                )
            }
        }
    }

    fn match_leaf_or_composite(
        &self,
        id: NodeId,
        hay: &[u8],
        span: BitSpan,
        mode: Mode,
    ) -> Hit {
        match self.kind(id) {
            Kind::Wildcard(w) => {
                if span.start.saturating_add(w.width) <= span.end {
                    Hit::full(span.start, w.width)
                } else {
                    Hit::miss(span.start)
                }
            }
            Kind::Assert(a) => match span.start.to_byte() {
                Some(at) if a.matches(hay, at) => Hit::zero_width(span.start),
                Some(_) => Hit::miss(span.start),
                None => {
                    debug_assert!(
                        false,
                        "assertion at unaligned bit offset {:?}",
                        span.start,
                    );
                    Hit::miss(span.start)
                }
            },
            Kind::Range(r) => {
                let width = BitLen::from_bytes(usize::from(r.width));
                if span.start.saturating_add(width) > span.end {
                    return Hit::miss(span.start);
                }
                match span.start.to_byte() {
                    Some(at) if r.matches_at(hay, at) => {
                        Hit::full(span.start, width)
                    }
                    Some(_) => Hit::miss(span.start),
                    None => {
                        debug_assert!(
                            false,
                            "range at unaligned bit offset {:?}",
                            span.start,
                        );
                        Hit::miss(span.start)
                    }
                }
            }
            Kind::Seq(s) => seq::match_seq(self, s, hay, span, mode),
            Kind::Repeat(rep) => {
                repeat::match_repeat(self, rep, hay, span, mode)
            }
            Kind::Literal(_) | Kind::Alt(_) => {
                // Routed through match_where.
                debug_assert!(false, "dispatch must not reach here");
                Hit::miss(span.start)
            }
        }
    }

    fn match_literal(
        &self,
        lit: &literal::Literal,
        hay: &[u8],
        span: BitSpan,
        mode: Mode,
    ) -> Hit {
        let width = BitLen::from_bytes(lit.byte_len());
        if span.start.saturating_add(width) > span.end {
            return Hit::miss(span.start);
        }
        let from = match span.start.to_byte() {
            Some(b) => b,
            None => {
                debug_assert!(
                    false,
                    "literal at unaligned bit offset {:?}",
                    span.start,
                );
                return Hit::miss(span.start);
            }
        };
        if mode.is_anchored() {
            if lit.eq_at(hay, from, mode) {
                Hit::full(span.start, width)
            } else {
                Hit::miss(span.start)
            }
        } else {
            let cap = ((span.end.get() / 8) as usize).min(hay.len());
            match lit.find_in(hay, from, cap, mode) {
                Some(at) => Hit::full(BitLen::from_bytes(at), width),
                None => Hit::miss(span.start),
            }
        }
    }

    /// Find the first scan position whose byte could begin a match, using
    /// the node's leading-byte set.
    fn scan_start(
        &self,
        id: NodeId,
        hay: &[u8],
        span: BitSpan,
        mode: Mode,
    ) -> Option<BitLen> {
        let set = self.leading_bytes(id, mode);
        if set.is_all() {
            return Some(span.start);
        }
        if set.is_empty() {
            return None;
        }
        let from = match span.start.to_byte() {
            Some(b) => b,
            // An unaligned start cannot be byte-scanned; attempt in place.
            None => return Some(span.start),
        };
        let to = ((span.end.get() / 8) as usize).min(hay.len());
        if from >= to {
            return None;
        }
        let window = &hay[from..to];
        let found = if set.len() <= 3 {
            let bytes: Vec<u8> = set.iter().collect();
            match bytes.as_slice() {
                &[a] => memchr::memchr(a, window),
                &[a, b] => memchr::memchr2(a, b, window),
                &[a, b, c] => memchr::memchr3(a, b, c, window),
                _ => unreachable!(),
            }
        } else {
            window.iter().position(|&b| set.contains(b))
        };
        found.map(|i| BitLen::from_bytes(from + i))
    }

    /// The envelope of lengths a match of this node can consume.
    pub fn len_range(&self, id: NodeId) -> LenRange {
        // Finalization fills every cache; the fallback keeps this total.
        self.node(id).lens.unwrap_or(LenRange::UNDEFINED)
    }

    /// The number of distinct byte strings this node can match,
    /// saturating.
    ///
    /// A complemented alternation reports the cardinality of its
    /// underlying alternative set, as the engine has always done.
    pub fn cardinality(&self, id: NodeId) -> Cardinality {
        self.cardinality_within(id, CountRange::FULL)
    }

    /// Like [`Graph::cardinality`], but clamping every repetition's count
    /// interval to `bound`.
    pub fn cardinality_within(
        &self,
        id: NodeId,
        bound: CountRange,
    ) -> Cardinality {
        match self.kind(id) {
            Kind::Literal(_) | Kind::Assert(_) => Cardinality::ONE,
            Kind::Wildcard(w) => w.cardinality(),
            Kind::Range(r) => r.cardinality(),
            Kind::Seq(s) => s.subs.iter().fold(Cardinality::ONE, |acc, &sub| {
                acc.saturating_mul(self.cardinality_within(sub, bound))
            }),
            Kind::Alt(a) => {
                a.subs.iter().fold(Cardinality::ZERO, |acc, &sub| {
                    acc.saturating_add(self.cardinality_within(sub, bound))
                })
            }
            Kind::Repeat(rep) => repeat::cardinality(self, rep, bound),
        }
    }

    /// The single byte string this node denotes, if it denotes exactly
    /// one.
    pub fn constant_value(&self, id: NodeId) -> Option<Vec<u8>> {
        constant_value(&self.nodes, id)
    }

    /// Narrow a caller-supplied skip set to the bytes a match of this node
    /// could start with.
    pub fn intersect_skip_set(
        &self,
        id: NodeId,
        mut set: SkipSet,
        mode: Mode,
    ) -> SkipSet {
        set.intersect(&self.leading_bytes(id, mode));
        set
    }

    /// The set of bytes a match of this node could start with.
    pub fn leading_bytes(&self, id: NodeId, mode: Mode) -> SkipSet {
        leading_bytes(&self.nodes, id, mode)
    }

    /// Generate one byte string this node matches.
    pub fn sample(&self, id: NodeId, rng: &mut Rng) -> Vec<u8> {
        self.sample_within(id, LenRange::any(), rng)
    }

    /// Like [`Graph::sample`], with a length budget used to bound
    /// unbounded repetitions.
    pub fn sample_within(
        &self,
        id: NodeId,
        lens: LenRange,
        rng: &mut Rng,
    ) -> Vec<u8> {
        match self.kind(id) {
            Kind::Literal(lit) => lit.as_bytes().to_vec(),
            Kind::Wildcard(w) => w.sample(rng),
            Kind::Assert(_) => Vec::new(),
            Kind::Range(r) => r.sample(rng),
            Kind::Seq(s) => {
                let mut out = Vec::new();
                for &sub in &s.subs {
                    out.extend(self.sample_within(sub, lens, rng));
                }
                out
            }
            Kind::Alt(a) => {
                alt::sample(self, a, lens, self.len_range(id), rng)
            }
            Kind::Repeat(rep) => repeat::sample(self, rep, lens, rng),
        }
    }

    /// Generate `n` instances of this node and verify each round-trips
    /// through an anchored match. Returns false on the first instance the
    /// node fails to re-match.
    pub fn self_check(&self, id: NodeId, n: usize, rng: &mut Rng) -> bool {
        let mode = Mode::new().anchored(true);
        for _i in 0..n {
            let instance = self.sample(id, rng);
            let hit = self.match_bytes(id, &instance, mode);
            if !hit.is_full() {
                debug!(
                    "node {:?} failed to match its own instance {} of {}",
                    id,
                    _i + 1,
                    n,
                );
                return false;
            }
        }
        true
    }

    /// Look up a registered grammar by name.
    pub fn grammar(&self, name: &str) -> Option<GrammarId> {
        self.by_name.get(name).copied()
    }

    /// The number of registered grammars.
    pub fn grammar_count(&self) -> usize {
        self.grammars.len()
    }

    /// Iterate over all registered grammars.
    pub fn grammars(&self) -> GrammarIter {
        GrammarIter { next: 0, len: self.grammars.len() as u32 }
    }

    /// A grammar's registered name.
    pub fn grammar_name(&self, id: GrammarId) -> &str {
        &self.grammars[id.as_usize()].name
    }

    /// A grammar's format tag, if one was attached.
    pub fn grammar_format(&self, id: GrammarId) -> Option<&str> {
        self.grammars[id.as_usize()].format.as_deref()
    }

    /// A grammar's root node.
    pub fn grammar_root(&self, id: GrammarId) -> NodeId {
        self.grammars[id.as_usize()].root
    }

    /// Match a grammar's root against the whole of `hay`.
    pub fn grammar_match(
        &self,
        id: GrammarId,
        hay: &[u8],
        mode: Mode,
    ) -> Hit {
        self.match_bytes(self.grammar_root(id), hay, mode)
    }
}

/// An iterator over the registered grammars of a [`Graph`].
#[derive(Clone, Debug)]
pub struct GrammarIter {
    next: u32,
    len: u32,
}

impl Iterator for GrammarIter {
    type Item = GrammarId;

    fn next(&mut self) -> Option<GrammarId> {
        if self.next >= self.len {
            return None;
        }
        let id = GrammarId::new(self.next as usize);
        self.next += 1;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored() -> Mode {
        Mode::new().anchored(true)
    }

    #[test]
    fn literal_through_graph() {
        let mut b = Builder::new();
        let lit = b.literal(b"int").unwrap();
        let g = b.finalize().unwrap();

        assert!(g.match_bytes(lit, b"int", anchored()).is_full());
        assert!(!g.match_bytes(lit, b"in", anchored()).is_full());
        // Unanchored literals substring-search the region.
        let hit = g.match_bytes(lit, b"uint32", Mode::new());
        assert!(hit.is_full());
        assert_eq!(hit.start(), BitLen::from_bytes(1));
        assert_eq!(hit.len(), BitLen::from_bytes(3));
    }

    #[test]
    fn interning_shares_nodes() {
        let mut b = Builder::new();
        let a = b.intern_literal(b"0").unwrap();
        let c = b.intern_literal(b"0").unwrap();
        assert_eq!(a, c);
        let d = b.intern_literal(b"1").unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn sequence_of_literals_merges_and_matches() {
        let mut b = Builder::new();
        let hello = b.literal(b"hello").unwrap();
        let comma = b.literal(b", ").unwrap();
        let world = b.literal(b"world").unwrap();
        let seq = b.seq(&[hello, comma, world]).unwrap();
        let g = b.finalize().unwrap();

        // The plan collapses the run into a single byte step.
        match g.kind(seq) {
            Kind::Seq(s) => {
                assert_eq!(s.plan.len(), 1);
                match &s.plan[0] {
                    seq::Step::Bytes(bytes) => {
                        assert_eq!(&bytes[..], b"hello, world")
                    }
                    step => panic!("expected a merged run, got {:?}", step),
                }
            }
            kind => panic!("expected a sequence, got {:?}", kind),
        }
        assert!(g.match_bytes(seq, b"hello, world", anchored()).is_full());
        assert!(!g.match_bytes(seq, b"hello, worl?", anchored()).is_full());
    }

    #[test]
    fn sequence_partial_hit_reports_progress() {
        let mut b = Builder::new();
        let ab = b.literal(b"ab").unwrap();
        let digit = b.byte_range(b'0', b'9').unwrap();
        let seq = b.seq(&[ab, digit]).unwrap();
        let g = b.finalize().unwrap();

        let hit = g.match_bytes(seq, b"abX", anchored());
        assert!(!hit.is_full());
        assert_eq!(hit.len(), BitLen::from_bytes(2));
    }

    #[test]
    fn greedy_repeat_backs_off_for_sibling() {
        let mut b = Builder::new();
        let a = b.literal(b"a").unwrap();
        let reps = b.repeat_greedy(a, CountRange::bounded(1, 10)).unwrap();
        let tail = b.literal(b"ab").unwrap();
        let seq = b.seq(&[reps, tail]).unwrap();
        let g = b.finalize().unwrap();

        // The repetition would happily eat every 'a'; it must leave one
        // for the tail.
        let hit = g.match_bytes(seq, b"aaaab", anchored());
        assert!(hit.is_full());
        assert_eq!(hit.len(), BitLen::from_bytes(5));
    }

    #[test]
    fn lazy_repeat_stops_at_required_count() {
        let mut b = Builder::new();
        let a = b.literal(b"a").unwrap();
        let reps = b.repeat(a, CountRange::bounded(2, 10)).unwrap();
        let g = b.finalize().unwrap();

        let hit = g.match_bytes(reps, b"aaaa", anchored());
        assert!(hit.is_full());
        assert_eq!(hit.len(), BitLen::from_bytes(2));

        let greedy = {
            let mut b = Builder::new();
            let a = b.literal(b"a").unwrap();
            let reps =
                b.repeat_greedy(a, CountRange::bounded(2, 10)).unwrap();
            let g = b.finalize().unwrap();
            g.match_bytes(reps, b"aaaa", anchored())
        };
        assert_eq!(greedy.len(), BitLen::from_bytes(4));
    }

    #[test]
    fn alternation_builds_dispatch_table() {
        let mut b = Builder::new();
        let alt = b
            .literal_alt(&[b"cat", b"dog", b"bird"])
            .unwrap();
        let g = b.finalize().unwrap();

        match g.kind(alt) {
            Kind::Alt(a) => assert!(a.table.is_some()),
            kind => panic!("expected an alternation, got {:?}", kind),
        }
        assert!(g.match_bytes(alt, b"dog", anchored()).is_full());
        assert!(!g.match_bytes(alt, b"cow", anchored()).is_full());
    }

    #[test]
    fn duplicate_alternatives_rejected() {
        let mut b = Builder::new();
        b.literal_alt(&[b"dup", b"other", b"dup"]).unwrap();
        assert!(b.finalize().is_err());
    }

    #[test]
    fn complement_matches_everything_else() {
        let mut b = Builder::new();
        let vowels =
            b.literal_alt(&[b"a", b"e", b"i", b"o", b"u"]).unwrap();
        b.set_complement(vowels, true).unwrap();
        let g = b.finalize().unwrap();

        let hit = g.match_bytes(vowels, b"x", anchored());
        assert!(hit.is_full());
        assert_eq!(hit.len(), BitLen::from_bytes(1));
        assert!(!g.match_bytes(vowels, b"e", anchored()).is_full());
    }

    #[test]
    fn complement_of_empty_alternation_rejected() {
        let mut b = Builder::new();
        b.alt_complement(&[]).unwrap();
        assert!(b.finalize().is_err());
    }

    #[test]
    fn fold_byte_run_specializes_in_place() {
        let mut b = Builder::new();
        let digits: Vec<NodeId> = (b'0'..=b'9')
            .map(|d| b.literal(&[d]).unwrap())
            .collect();
        let alt = b.alt(&digits).unwrap();
        assert!(b.fold_byte_run(alt).unwrap());
        let g = b.finalize().unwrap();

        assert!(matches!(g.kind(alt), Kind::Range(_)));
        for d in b'0'..=b'9' {
            assert!(g.match_bytes(alt, &[d], anchored()).is_full());
        }
        assert!(!g.match_bytes(alt, b"x", anchored()).is_full());
    }

    #[test]
    fn fold_byte_run_requires_contiguity() {
        let mut b = Builder::new();
        let alt = b.literal_alt(&[b"a", b"c"]).unwrap();
        assert!(!b.fold_byte_run(alt).unwrap());
    }

    #[test]
    fn push_at_fills_gaps_with_wildcards() {
        let mut b = Builder::new();
        let magic = b.literal(b"\x7fELF").unwrap();
        let class = b.literal(&[2]).unwrap();
        let seq = b.seq(&[]).unwrap();
        b.push_at(seq, magic, BitLen::ZERO).unwrap();
        b.push_at(seq, class, BitLen::from_bytes(4)).unwrap();
        // Anchoring behind the accumulated length is a construction bug.
        let overlap = b.literal(&[1]).unwrap();
        assert!(b.push_at(seq, overlap, BitLen::from_bytes(2)).is_err());
        let g = b.finalize().unwrap();

        assert!(g
            .match_bytes(seq, &[0x7f, b'E', b'L', b'F', 2], anchored())
            .is_full());
        assert!(!g
            .match_bytes(seq, &[0x7f, b'E', b'L', b'F', 1], anchored())
            .is_full());
    }

    #[test]
    fn push_at_pads_over_ignored_fields() {
        let mut b = Builder::new();
        let magic = b.literal(b"MZ").unwrap();
        let tail = b.literal(b"PE").unwrap();
        let seq = b.seq(&[]).unwrap();
        b.push_at(seq, magic, BitLen::ZERO).unwrap();
        b.push_at(seq, tail, BitLen::from_bytes(6)).unwrap();
        let g = b.finalize().unwrap();

        assert!(g.match_bytes(seq, b"MZxxxxPE", anchored()).is_full());
        assert!(!g.match_bytes(seq, b"MZxxxxQE", anchored()).is_full());
        assert_eq!(
            g.len_range(seq),
            LenRange::exact(BitLen::from_bytes(8))
        );
    }

    #[test]
    fn skip_sets_narrow_scans() {
        let mut b = Builder::new();
        let kw = b.literal_alt(&[b"int", b"short", b"float"]).unwrap();
        let g = b.finalize().unwrap();

        let set = g.leading_bytes(kw, Mode::new());
        assert_eq!(
            set.iter().collect::<Vec<u8>>(),
            vec![b'f', b'i', b's']
        );
        let narrowed =
            g.intersect_skip_set(kw, SkipSet::all(), Mode::new());
        assert_eq!(narrowed, set);

        // The scan actually finds a hit past unrelated bytes.
        let hit = g.match_bytes(kw, b"unsigned short", Mode::new());
        assert!(hit.is_full());
        assert_eq!(hit.start(), BitLen::from_bytes(9));
    }

    #[test]
    fn cyclic_edits_rejected() {
        let mut b = Builder::new();
        let lit = b.literal(b"x").unwrap();
        let inner = b.seq(&[lit]).unwrap();
        let outer = b.seq(&[inner]).unwrap();
        assert!(b.push_sub(inner, outer).is_err());
        assert!(b.push_sub(inner, inner).is_err());
    }

    #[test]
    fn edit_invalidates_parent_caches() {
        let mut b = Builder::new();
        let a = b.literal(b"aa").unwrap();
        let seq = b.seq(&[a]).unwrap();
        assert_eq!(b.len_range(seq), LenRange::exact(BitLen::from_bytes(2)));
        let c = b.literal(b"c").unwrap();
        b.push_sub(seq, c).unwrap();
        assert_eq!(b.len_range(seq), LenRange::exact(BitLen::from_bytes(3)));
    }

    #[test]
    fn grammar_registry_round_trip() {
        let mut b = Builder::new();
        let root = b.exact(b"#!/bin/sh").unwrap();
        let id = b.grammar_with_format("shebang", root, "text/x-script").unwrap();
        assert!(b.grammar("shebang", root).is_err());
        let g = b.finalize().unwrap();

        assert_eq!(g.grammar("shebang"), Some(id));
        assert_eq!(g.grammar("unknown"), None);
        assert_eq!(g.grammar_name(id), "shebang");
        assert_eq!(g.grammar_format(id), Some("text/x-script"));
        assert_eq!(g.grammars().collect::<Vec<GrammarId>>(), vec![id]);
        assert!(g.grammar_match(id, b"#!/bin/sh", anchored()).is_full());
        assert!(!g.grammar_match(id, b"#!/bin/shx", anchored()).is_full());
    }

    #[test]
    fn out_of_bounds_region_degrades_to_miss() {
        let mut b = Builder::new();
        let lit = b.literal(b"x").unwrap();
        let g = b.finalize().unwrap();
        let bad = BitSpan::new(BitLen::ZERO, BitLen::from_bytes(100));
        // Release builds degrade; debug builds assert. Only exercise the
        // degraded path when assertions are off.
        if !cfg!(debug_assertions) {
            assert!(!g.match_in(lit, b"x", bad, anchored()).is_full());
        }
    }

    #[test]
    fn self_check_round_trips_every_kind() {
        let mut b = Builder::new();
        let kw = b.keyword(b"return").unwrap();
        let digit = b.byte_range(b'0', b'9').unwrap();
        let digits = b.repeat_greedy(digit, CountRange::bounded(1, 6)).unwrap();
        // Neither separator is a symbol byte, so the keyword's closing
        // boundary assertion holds over generated instances.
        let sep = b.literal_alt(&[b" ", b"-"]).unwrap();
        let pad = b.wildcard_bytes(2).unwrap();
        let root = b.seq(&[kw, sep, digits, pad]).unwrap();
        let g = b.finalize().unwrap();

        let mut rng = Rng::new(0xC0FFEE);
        assert!(g.self_check(root, 64, &mut rng));
    }

    #[test]
    fn constant_value_composes() {
        let mut b = Builder::new();
        let ab = b.literal(b"ab").unwrap();
        let c = b.range(&[b'c'], &[b'c']).unwrap();
        let two = b.repeat(ab, CountRange::exact(2)).unwrap();
        let seq = b.seq(&[two, c]).unwrap();
        let wild = b.wildcard_bytes(1).unwrap();
        let open = b.seq(&[ab, wild]).unwrap();
        let g = b.finalize().unwrap();

        assert_eq!(g.constant_value(seq), Some(b"ababc".to_vec()));
        assert_eq!(g.constant_value(open), None);
    }
}

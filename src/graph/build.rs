/*!
Graph construction.
*/

use std::collections::HashMap;

use crate::{
    graph::{
        alt::{self, Alt, LitTable},
        cached_lens, constant_value,
        error::BuildError,
        kind_name, kind_subs, leading_bytes, lens_of_kind,
        literal::Literal,
        look::{Assert, Boundary, Lang},
        range::{ByteRange, Classified},
        repeat::Repeat,
        seq::{self, Seq},
        wildcard::Wildcard,
        Endian, Graph, GrammarEntry, GrammarId, Kind, Node, NodeId,
    },
    util::{
        bits::{BitLen, LenRange},
        count::CountRange,
        search::Mode,
    },
};

/// Builds a pattern graph, then finalizes it into an immutable [`Graph`].
///
/// Construction is a single-threaded, one-time phase. Derived values
/// needed during construction (notably the length envelope consulted by
/// [`Builder::push_at`]) are computed lazily and cached per node; any
/// structural edit invalidates the edited node's caches and propagates the
/// invalidation through parent links, so a shared sub-node may be edited
/// after it has been placed under many parents. [`Builder::finalize`]
/// recomputes everything eagerly, after which nothing is lazy and nothing
/// is mutated again.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    nodes: Vec<Node>,
    grammars: Vec<GrammarEntry>,
    by_name: HashMap<Box<str>, GrammarId>,
    interned: HashMap<Box<[u8]>, NodeId>,
}

impl Builder {
    /// Create an empty builder.
    pub fn new() -> Builder {
        Builder::default()
    }

    /// The number of nodes added so far.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn push_node(&mut self, kind: Kind) -> Result<NodeId, BuildError> {
        let id = NodeId::new(self.nodes.len())?;
        let subs = kind_subs(&kind);
        self.nodes.push(Node::new(kind));
        for sub in subs {
            self.nodes[sub.as_usize()].parents.push(id);
        }
        Ok(id)
    }

    /// Add an exact byte pattern.
    ///
    /// A zero-length literal is degraded to a node that always matches
    /// while consuming nothing, and logged; a grammar author mistake here
    /// should not abort the whole grammar load.
    pub fn literal(&mut self, bytes: &[u8]) -> Result<NodeId, BuildError> {
        if bytes.is_empty() {
            warn_log!("zero-length literal degrades to a no-op node");
        }
        self.push_node(Kind::Literal(Literal::new(bytes)))
    }

    /// Add a two-byte numeric literal in the given byte order.
    pub fn literal_u16(
        &mut self,
        value: u16,
        endian: Endian,
    ) -> Result<NodeId, BuildError> {
        let bytes = match endian {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        };
        self.literal(&bytes)
    }

    /// Add a four-byte numeric literal in the given byte order.
    pub fn literal_u32(
        &mut self,
        value: u32,
        endian: Endian,
    ) -> Result<NodeId, BuildError> {
        let bytes = match endian {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        };
        self.literal(&bytes)
    }

    /// Add a literal, or return the node previously created for identical
    /// content. This is how widely shared leaves ("decimal digit", common
    /// keywords) end up with one node and many parents.
    pub fn intern_literal(
        &mut self,
        bytes: &[u8],
    ) -> Result<NodeId, BuildError> {
        if let Some(&id) = self.interned.get(bytes) {
            return Ok(id);
        }
        let id = self.literal(bytes)?;
        self.interned.insert(bytes.into(), id);
        Ok(id)
    }

    /// Tag a literal as a lexical token. Has no effect on matching.
    pub fn tokenize(&mut self, id: NodeId) -> Result<(), BuildError> {
        match &mut self.nodes[id.as_usize()].kind {
            Kind::Literal(lit) => {
                lit.token = true;
                Ok(())
            }
            kind => Err(BuildError::expected_kind("literal", kind_name(kind))),
        }
    }

    /// Add a wildcard of exactly `width` bits.
    pub fn wildcard(&mut self, width: BitLen) -> Result<NodeId, BuildError> {
        if width.is_unbounded() {
            return Err(BuildError::unbounded_wildcard());
        }
        self.push_node(Kind::Wildcard(Wildcard::new(width)))
    }

    /// Add a wildcard of exactly `n` bytes.
    pub fn wildcard_bytes(&mut self, n: usize) -> Result<NodeId, BuildError> {
        self.wildcard(BitLen::from_bytes(n))
    }

    /// Add a zero-width assertion with language-neutral classification.
    pub fn assertion(
        &mut self,
        boundary: Boundary,
    ) -> Result<NodeId, BuildError> {
        self.assertion_in(boundary, Lang::Any)
    }

    /// Add a zero-width assertion classified under the given language.
    pub fn assertion_in(
        &mut self,
        boundary: Boundary,
        lang: Lang,
    ) -> Result<NodeId, BuildError> {
        self.push_node(Kind::Assert(Assert { boundary, lang }))
    }

    /// Add a sequence over the given sub-nodes, in order.
    pub fn seq(&mut self, subs: &[NodeId]) -> Result<NodeId, BuildError> {
        self.push_node(Kind::Seq(Seq::new(subs.to_vec())))
    }

    /// Add an alternation over the given sub-nodes.
    pub fn alt(&mut self, subs: &[NodeId]) -> Result<NodeId, BuildError> {
        self.push_node(Kind::Alt(Alt::new(subs.to_vec(), false)))
    }

    /// Add a complemented alternation: it matches where none of the
    /// sub-nodes do, consuming the set's minimum length.
    pub fn alt_complement(
        &mut self,
        subs: &[NodeId],
    ) -> Result<NodeId, BuildError> {
        self.push_node(Kind::Alt(Alt::new(subs.to_vec(), true)))
    }

    /// Add an alternation of fresh literal nodes, one per entry.
    pub fn literal_alt(
        &mut self,
        entries: &[&[u8]],
    ) -> Result<NodeId, BuildError> {
        let mut subs = Vec::with_capacity(entries.len());
        for bytes in entries {
            subs.push(self.literal(bytes)?);
        }
        self.alt(&subs)
    }

    /// Append a sub-node to a sequence.
    pub fn push_sub(
        &mut self,
        seq: NodeId,
        sub: NodeId,
    ) -> Result<(), BuildError> {
        if self.reaches(sub, seq) {
            return Err(BuildError::cyclic(seq));
        }
        match &mut self.nodes[seq.as_usize()].kind {
            Kind::Seq(s) => s.subs.push(sub),
            kind => {
                return Err(BuildError::expected_kind(
                    "sequence",
                    kind_name(kind),
                ))
            }
        }
        self.nodes[sub.as_usize()].parents.push(seq);
        self.invalidate(seq);
        Ok(())
    }

    /// Append a sub-node anchored at an absolute bit offset from the
    /// beginning of the sequence.
    ///
    /// An empty sequence first gains a begin-of-buffer assertion. A gap
    /// between the sequence's accumulated length and `offset` is filled
    /// with a wildcard of exactly the gap width; an exact fit appends
    /// directly; an offset the sequence has already grown past is a
    /// construction error.
    pub fn push_at(
        &mut self,
        seq: NodeId,
        sub: NodeId,
        offset: BitLen,
    ) -> Result<(), BuildError> {
        let is_empty = match &self.nodes[seq.as_usize()].kind {
            Kind::Seq(s) => s.subs.is_empty(),
            kind => {
                return Err(BuildError::expected_kind(
                    "sequence",
                    kind_name(kind),
                ))
            }
        };
        if is_empty {
            let start = self.assertion(Boundary::Start)?;
            self.push_sub(seq, start)?;
            if !offset.is_zero() {
                let pad = self.wildcard(offset)?;
                self.push_sub(seq, pad)?;
            }
            return self.push_sub(seq, sub);
        }
        let have = self.len_range(seq);
        if have.is_undefined() || have.max.is_unbounded() || have.max > offset
        {
            return Err(BuildError::invalid_anchor(have, offset));
        }
        if have.max < offset {
            let pad = self.wildcard(offset.saturating_sub(have.max))?;
            self.push_sub(seq, pad)?;
        }
        self.push_sub(seq, sub)
    }

    /// Add a sub-node to an alternation.
    pub fn add_alternative(
        &mut self,
        alt: NodeId,
        sub: NodeId,
    ) -> Result<(), BuildError> {
        if self.reaches(sub, alt) {
            return Err(BuildError::cyclic(alt));
        }
        match &mut self.nodes[alt.as_usize()].kind {
            Kind::Alt(a) => a.subs.push(sub),
            kind => {
                return Err(BuildError::expected_kind(
                    "alternation",
                    kind_name(kind),
                ))
            }
        }
        self.nodes[sub.as_usize()].parents.push(alt);
        self.invalidate(alt);
        Ok(())
    }

    /// Set or clear an alternation's complement flag.
    pub fn set_complement(
        &mut self,
        alt: NodeId,
        yes: bool,
    ) -> Result<(), BuildError> {
        let changed = match &mut self.nodes[alt.as_usize()].kind {
            Kind::Alt(a) => {
                let changed = a.complement != yes;
                a.complement = yes;
                changed
            }
            kind => {
                return Err(BuildError::expected_kind(
                    "alternation",
                    kind_name(kind),
                ))
            }
        };
        if changed {
            self.invalidate(alt);
        }
        Ok(())
    }

    /// Add an inclusive numeric range between two same-width big-endian
    /// endpoints of 1 to 8 bytes.
    ///
    /// A range spanning every value of a 1, 2, 4 or 8 byte width is
    /// canonicalized into a wildcard of the same width.
    pub fn range(
        &mut self,
        lo: &[u8],
        hi: &[u8],
    ) -> Result<NodeId, BuildError> {
        if lo.len() != hi.len() {
            return Err(BuildError::range_width_mismatch(lo.len(), hi.len()));
        }
        let width = lo.len();
        if width == 0 || width > 8 {
            return Err(BuildError::range_width_unsupported(width));
        }
        let decode = |bytes: &[u8]| {
            bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
        };
        let (lo_v, hi_v) = (decode(lo), decode(hi));
        if lo_v > hi_v {
            return Err(BuildError::range_inverted());
        }
        match ByteRange::classify(width as u8, lo_v, hi_v) {
            Classified::FullWidth => {
                debug!(
                    "full {}-byte range canonicalized to a wildcard",
                    width,
                );
                self.wildcard(BitLen::from_bytes(width))
            }
            Classified::Range(r) => self.push_node(Kind::Range(r)),
        }
    }

    /// Add an inclusive single-byte range.
    pub fn byte_range(
        &mut self,
        lo: u8,
        hi: u8,
    ) -> Result<NodeId, BuildError> {
        self.range(&[lo], &[hi])
    }

    /// Add a repetition of `sub` with counts drawn from `counts`,
    /// preferring the smallest feasible count.
    ///
    /// A fixed-count repetition over a wildcard is canonicalized into one
    /// wider wildcard.
    pub fn repeat(
        &mut self,
        sub: NodeId,
        counts: CountRange,
    ) -> Result<NodeId, BuildError> {
        self.repeat_inner(sub, counts, false)
    }

    /// Like [`Builder::repeat`], preferring the largest feasible count.
    pub fn repeat_greedy(
        &mut self,
        sub: NodeId,
        counts: CountRange,
    ) -> Result<NodeId, BuildError> {
        self.repeat_inner(sub, counts, true)
    }

    fn repeat_inner(
        &mut self,
        sub: NodeId,
        counts: CountRange,
        greedy: bool,
    ) -> Result<NodeId, BuildError> {
        if counts.is_empty() {
            return Err(BuildError::empty_counts());
        }
        if counts.is_exact() {
            if let Kind::Wildcard(w) = &self.nodes[sub.as_usize()].kind {
                let width = w.width.saturating_mul(counts.min);
                debug!(
                    "fixed repetition over a wildcard canonicalized to a \
                     {:?}-bit wildcard",
                    width,
                );
                return self.wildcard(width);
            }
        }
        self.push_node(Kind::Repeat(Repeat { sub, counts, greedy }))
    }

    /// Set or clear a repetition's greedy flag.
    pub fn set_greedy(
        &mut self,
        rep: NodeId,
        yes: bool,
    ) -> Result<(), BuildError> {
        match &mut self.nodes[rep.as_usize()].kind {
            Kind::Repeat(r) => {
                r.greedy = yes;
                Ok(())
            }
            kind => {
                Err(BuildError::expected_kind("repetition", kind_name(kind)))
            }
        }
    }

    /// Fold an alternation whose alternatives form one contiguous run of
    /// single-byte constants into an equivalent range node, in place.
    ///
    /// Returns true if the fold happened. The node keeps its identity, so
    /// parents referencing it are unaffected; the detached alternatives
    /// stay in the arena for their other parents, if any.
    pub fn fold_byte_run(
        &mut self,
        alt: NodeId,
    ) -> Result<bool, BuildError> {
        let detected = match &self.nodes[alt.as_usize()].kind {
            Kind::Alt(a) => {
                let nodes = &self.nodes;
                alt::detect_byte_run(a, |id| constant_value(nodes, id))
                    .map(|run| (a.subs.clone(), run))
            }
            kind => {
                return Err(BuildError::expected_kind(
                    "alternation",
                    kind_name(kind),
                ))
            }
        };
        let (subs, (lo, hi)) = match detected {
            None => return Ok(false),
            Some(x) => x,
        };
        for sub in subs {
            self.nodes[sub.as_usize()].parents.retain(|&p| p != alt);
        }
        self.nodes[alt.as_usize()].kind =
            match ByteRange::classify(1, u64::from(lo), u64::from(hi)) {
                Classified::FullWidth => {
                    Kind::Wildcard(Wildcard::new(BitLen::from_bytes(1)))
                }
                Classified::Range(r) => Kind::Range(r),
            };
        self.invalidate(alt);
        debug!(
            "alternation {:?} folded into the byte range {}..={}",
            alt, lo, hi,
        );
        Ok(true)
    }

    /// Add a symbol-delimited keyword: a begin-of-symbol assertion, the
    /// tokenized literal, an end-of-symbol assertion.
    pub fn keyword(&mut self, bytes: &[u8]) -> Result<NodeId, BuildError> {
        let start = self.assertion(Boundary::StartSymbol)?;
        let lit = self.literal(bytes)?;
        self.tokenize(lit)?;
        let end = self.assertion(Boundary::EndSymbol)?;
        self.seq(&[start, lit, end])
    }

    /// Add a whole-buffer match: a begin-of-buffer assertion, the literal,
    /// an end-of-buffer assertion.
    pub fn exact(&mut self, bytes: &[u8]) -> Result<NodeId, BuildError> {
        let start = self.assertion(Boundary::Start)?;
        let lit = self.literal(bytes)?;
        let end = self.assertion(Boundary::End)?;
        self.seq(&[start, lit, end])
    }

    /// Set a node's human-readable name.
    pub fn set_name(&mut self, id: NodeId, name: &str) {
        self.nodes[id.as_usize()].name = Some(name.into());
    }

    /// Set a node's format tag.
    pub fn set_format(&mut self, id: NodeId, format: &str) {
        self.nodes[id.as_usize()].format = Some(format.into());
    }

    /// Register `root` as a complete grammar under `name`.
    pub fn grammar(
        &mut self,
        name: &str,
        root: NodeId,
    ) -> Result<GrammarId, BuildError> {
        self.register(name, root, None)
    }

    /// Register a grammar with a format tag for the crawler to report.
    pub fn grammar_with_format(
        &mut self,
        name: &str,
        root: NodeId,
        format: &str,
    ) -> Result<GrammarId, BuildError> {
        self.register(name, root, Some(format.into()))
    }

    fn register(
        &mut self,
        name: &str,
        root: NodeId,
        format: Option<Box<str>>,
    ) -> Result<GrammarId, BuildError> {
        if self.by_name.contains_key(name) {
            return Err(BuildError::duplicate_grammar(name));
        }
        let id = GrammarId::new(self.grammars.len());
        self.grammars.push(GrammarEntry { name: name.into(), format, root });
        self.by_name.insert(name.into(), id);
        Ok(id)
    }

    /// The envelope of lengths a match of this node can consume, computed
    /// on demand and cached.
    pub fn len_range(&mut self, id: NodeId) -> LenRange {
        self.fill_lens(id);
        cached_lens(&self.nodes, id)
    }

    /// Returns true if `target` is reachable from `from` through sub-node
    /// links, including `from == target`.
    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if seen[id.as_usize()] {
                continue;
            }
            seen[id.as_usize()] = true;
            stack.extend(kind_subs(&self.nodes[id.as_usize()].kind));
        }
        false
    }

    /// Discard the caches of `id` and of everything that transitively
    /// contains it.
    fn invalidate(&mut self, id: NodeId) {
        let mut stack = vec![id];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(id) = stack.pop() {
            let i = id.as_usize();
            if seen[i] {
                continue;
            }
            seen[i] = true;
            let node = &mut self.nodes[i];
            node.lens = None;
            node.leading = None;
            match &mut node.kind {
                Kind::Seq(s) => s.plan.clear(),
                Kind::Alt(a) => a.table = None,
                _ => {}
            }
            stack.extend(node.parents.iter().copied());
        }
    }

    fn fill_lens(&mut self, id: NodeId) {
        if self.nodes[id.as_usize()].lens.is_some() {
            return;
        }
        for sub in kind_subs(&self.nodes[id.as_usize()].kind) {
            self.fill_lens(sub);
        }
        let lens = lens_of_kind(&self.nodes, &self.nodes[id.as_usize()].kind);
        self.nodes[id.as_usize()].lens = Some(lens);
    }

    fn fill_leading(&mut self, id: NodeId) {
        if self.nodes[id.as_usize()].leading.is_some() {
            return;
        }
        for sub in kind_subs(&self.nodes[id.as_usize()].kind) {
            self.fill_leading(sub);
        }
        let set = leading_bytes(&self.nodes, id, Mode::new());
        self.nodes[id.as_usize()].leading = Some(set);
    }

    /// Compute every derived value eagerly and return the immutable graph.
    ///
    /// This is the point where alternation dispatch tables are built
    /// (rejecting duplicate literal alternatives), sequence literal runs
    /// are merged, complement consumption is validated and every envelope
    /// and skip set is cached. After it returns, matching requires no
    /// synchronization.
    pub fn finalize(mut self) -> Result<Graph, BuildError> {
        for i in 0..self.nodes.len() {
            // In-range by construction.
            let id = NodeId::new(i)?;
            self.fill_lens(id);
        }
        for i in 0..self.nodes.len() {
            let id = NodeId::new(i)?;
            self.finalize_alt(id)?;
            self.finalize_seq(id);
        }
        for i in 0..self.nodes.len() {
            let id = NodeId::new(i)?;
            self.fill_leading(id);
        }
        debug!(
            "graph finalized: {} nodes, {} grammars",
            self.nodes.len(),
            self.grammars.len(),
        );
        Ok(Graph {
            nodes: self.nodes,
            grammars: self.grammars,
            by_name: self.by_name,
        })
    }

    fn finalize_alt(&mut self, id: NodeId) -> Result<(), BuildError> {
        let i = id.as_usize();
        let (subs, complement) = match &self.nodes[i].kind {
            Kind::Alt(a) => (a.subs.clone(), a.complement),
            _ => return Ok(()),
        };
        if complement && cached_lens(&self.nodes, id).is_undefined() {
            return Err(BuildError::unsatisfiable_complement(id));
        }
        let mut entries = Vec::with_capacity(subs.len());
        let mut all_constant = !subs.is_empty();
        for &sub in &subs {
            match constant_value(&self.nodes, sub) {
                Some(bytes) if !bytes.is_empty() => {
                    entries.push((bytes, sub));
                }
                _ => {
                    all_constant = false;
                    break;
                }
            }
        }
        if all_constant {
            let _n = entries.len();
            let table = LitTable::build(entries)?;
            debug!(
                "alternation {:?}: dispatch table over {} literals",
                id, _n,
            );
            if let Kind::Alt(a) = &mut self.nodes[i].kind {
                a.table = Some(table);
            }
        }
        // Detection only; folding stays an explicit builder call.
        let run = match &self.nodes[i].kind {
            Kind::Alt(a) => {
                let nodes = &self.nodes;
                alt::detect_byte_run(a, |sub| constant_value(nodes, sub))
            }
            _ => None,
        };
        if let Some((_lo, _hi)) = run {
            debug!(
                "alternation {:?} covers the contiguous byte run \
                 0x{:02X}..=0x{:02X}; fold_byte_run would specialize it",
                id, _lo, _hi,
            );
        }
        Ok(())
    }

    fn finalize_seq(&mut self, id: NodeId) {
        let i = id.as_usize();
        let subs = match &self.nodes[i].kind {
            Kind::Seq(s) => s.subs.clone(),
            _ => return,
        };
        let plan = {
            let nodes = &self.nodes;
            seq::build_plan(&subs, |sub| constant_value(nodes, sub))
        };
        if let Kind::Seq(s) = &mut self.nodes[i].kind {
            s.plan = plan;
        }
    }
}

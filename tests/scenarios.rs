//! Scenario tests for the documented engine guarantees: fixed-offset
//! layouts, boundary assertions, dispatch equivalence, envelope and
//! cardinality algebra.

use pattern_graph::{
    graph::Builder, BitLen, BitSpan, Boundary, CountRange, LenRange, Mode,
    Rng,
};

fn anchored() -> Mode {
    Mode::new().anchored(true)
}

#[test]
fn elf_header_layout() {
    let mut b = Builder::new();
    let magic = b.literal(b"\x7fELF").unwrap();
    let class = b.literal(&[2]).unwrap();
    let header = b.seq(&[]).unwrap();
    b.push_at(header, magic, BitLen::ZERO).unwrap();
    b.push_at(header, class, BitLen::from_bytes(4)).unwrap();
    let g = b.finalize().unwrap();

    let elf64 = [0x7f, b'E', b'L', b'F', 2];
    assert!(g.match_bytes(header, &elf64, anchored()).is_full());

    for (i, &good) in elf64.iter().enumerate() {
        let mut bad = elf64;
        bad[i] = good.wrapping_add(1);
        assert!(
            !g.match_bytes(header, &bad, anchored()).is_full(),
            "perturbed byte {} still matched",
            i,
        );
    }
}

#[test]
fn word_boundaries_in_foo_bar() {
    let mut b = Builder::new();
    let bow = b.assertion(Boundary::StartWord).unwrap();
    let eow = b.assertion(Boundary::EndWord).unwrap();
    let g = b.finalize().unwrap();

    let hay = b"foo bar";
    let at = |i: usize| {
        BitSpan::new(BitLen::from_bytes(i), BitLen::from_bytes(hay.len()))
    };
    let starts: Vec<usize> = (0..=hay.len())
        .filter(|&i| g.match_in(bow, hay, at(i), anchored()).is_full())
        .collect();
    let ends: Vec<usize> = (0..=hay.len())
        .filter(|&i| g.match_in(eow, hay, at(i), anchored()).is_full())
        .collect();
    assert_eq!(starts, vec![0, 4]);
    assert_eq!(ends, vec![3, 7]);
}

#[test]
fn hash_and_linear_dispatch_agree() {
    let mut b = Builder::new();
    let animals = b.literal_alt(&[b"cat", b"dog", b"bird"]).unwrap();
    let g = b.finalize().unwrap();

    let hay = b"bluebird";
    let from4 =
        BitSpan::new(BitLen::from_bytes(4), BitLen::from_bytes(hay.len()));

    // The precise mode drives the hash table; an insensitive mode takes
    // the linear fallback. Both must report the same full 4-byte hit.
    for mode in [anchored(), anchored().separator_insensitive(true)] {
        let hit = g.match_in(animals, hay, from4, mode);
        assert!(hit.is_full(), "mode {:?} missed", mode);
        assert_eq!(hit.start(), BitLen::from_bytes(4));
        assert_eq!(hit.len(), BitLen::from_bytes(4));
    }

    // Unanchored, the scan walks forward to offset 4 on its own.
    for mode in [Mode::new(), Mode::new().separator_insensitive(true)] {
        let hit = g.match_bytes(animals, hay, mode);
        assert!(hit.is_full());
        assert_eq!(hit.start(), BitLen::from_bytes(4));
        assert_eq!(hit.len(), BitLen::from_bytes(4));
    }
}

#[test]
fn full_byte_range_equals_wildcard() {
    let mut b = Builder::new();
    let range = b.byte_range(0, 255).unwrap();
    let wild = b.wildcard_bytes(1).unwrap();
    let g = b.finalize().unwrap();

    for byte in 0u8..=255 {
        let buf = [byte];
        let from_range = g.match_bytes(range, &buf, anchored());
        let from_wild = g.match_bytes(wild, &buf, anchored());
        assert_eq!(from_range, from_wild, "byte {}", byte);
        assert!(from_range.is_full());
        assert_eq!(from_range.len(), BitLen::from_bytes(1));
    }
}

#[test]
fn literal_storage_boundary() {
    let mut b = Builder::new();
    let short = b.literal(b"abcd").unwrap();
    let long = b.literal(b"abcde").unwrap();
    let g = b.finalize().unwrap();

    assert!(g.match_bytes(short, b"abcd", anchored()).is_full());
    assert!(!g.match_bytes(short, b"abcx", anchored()).is_full());
    assert!(!g.match_bytes(short, b"abc", anchored()).is_full());

    assert!(g.match_bytes(long, b"abcde", anchored()).is_full());
    assert!(!g.match_bytes(long, b"abcdx", anchored()).is_full());
    assert!(!g.match_bytes(long, b"abcd", anchored()).is_full());
}

#[test]
fn sequence_envelope_is_additive() {
    let mut b = Builder::new();
    let lit = b.literal(b"head").unwrap();
    let wild = b.wildcard_bytes(2).unwrap();
    let digit = b.byte_range(b'0', b'9').unwrap();
    let reps = b.repeat(digit, CountRange::bounded(1, 3)).unwrap();

    let pairs = [(lit, wild), (lit, reps), (wild, reps)];
    let seqs: Vec<_> = pairs
        .iter()
        .map(|&(a, c)| b.seq(&[a, c]).unwrap())
        .collect();
    let g = b.finalize().unwrap();

    for (&(a, c), &s) in pairs.iter().zip(&seqs) {
        assert_eq!(
            g.len_range(s),
            g.len_range(a).concat(g.len_range(c)),
        );
    }
    // Concretely: "head" then 1..=3 digits spans 5..=7 bytes.
    let lit_reps = seqs[1];
    assert_eq!(
        g.len_range(lit_reps),
        LenRange::new(BitLen::from_bytes(5), BitLen::from_bytes(7)),
    );
}

#[test]
fn alternation_envelope_covers_both_arms() {
    let mut b = Builder::new();
    let short = b.literal(b"if").unwrap();
    let long = b.literal(b"unsigned").unwrap();
    let either = b.alt(&[short, long]).unwrap();
    let g = b.finalize().unwrap();

    let envelope = g.len_range(either);
    for id in [short, long] {
        let arm = g.len_range(id);
        assert!(envelope.min <= arm.min && arm.max <= envelope.max);
        assert!(envelope.contains(arm.min));
    }
    assert_eq!(
        envelope,
        LenRange::new(BitLen::from_bytes(2), BitLen::from_bytes(8)),
    );
}

#[test]
fn cardinality_laws() {
    let mut b = Builder::new();
    let vowels = b.literal_alt(&[b"a", b"e", b"i"]).unwrap();
    let digit = b.byte_range(b'0', b'9').unwrap();
    let pair = b.seq(&[vowels, digit]).unwrap();
    let either = b.alt(&[vowels, digit]).unwrap();
    let g = b.finalize().unwrap();

    assert_eq!(g.cardinality(vowels).get(), 3);
    assert_eq!(g.cardinality(digit).get(), 10);
    assert_eq!(
        g.cardinality(pair),
        g.cardinality(vowels).saturating_mul(g.cardinality(digit)),
    );
    assert_eq!(g.cardinality(pair).get(), 30);
    assert_eq!(
        g.cardinality(either),
        g.cardinality(vowels).saturating_add(g.cardinality(digit)),
    );
    assert_eq!(g.cardinality(either).get(), 13);

    // Wildcards saturate rather than overflow.
    let mut b = Builder::new();
    let wide = b.wildcard_bytes(16).unwrap();
    let g = b.finalize().unwrap();
    assert!(g.cardinality(wide).is_saturated());
}

#[test]
fn keyword_matches_whole_symbols_only() {
    let mut b = Builder::new();
    let ret = b.keyword(b"return").unwrap();
    let g = b.finalize().unwrap();

    let at = |hay: &[u8], i: usize| {
        BitSpan::new(BitLen::from_bytes(i), BitLen::from_bytes(hay.len()))
    };
    assert!(g.match_bytes(ret, b"return", anchored()).is_full());
    assert!(g
        .match_in(ret, b"return 0;", at(b"return 0;", 0), anchored())
        .is_full());
    // Inside a longer identifier, either boundary fails.
    assert!(!g.match_bytes(ret, b"returns", anchored()).is_full());
    let hay = b"no_return";
    assert!(!g.match_in(ret, hay, at(hay, 3), anchored()).is_full());
}

#[test]
fn round_trip_nested_composites() {
    let mut b = Builder::new();
    let lparen = b.literal(b"(").unwrap();
    let rparen = b.literal(b")").unwrap();
    let digit = b.byte_range(b'0', b'9').unwrap();
    let digits = b.repeat_greedy(digit, CountRange::bounded(1, 4)).unwrap();
    let sign = b.literal_alt(&[b"+", b"-"]).unwrap();
    let signed = b.seq(&[sign, digits]).unwrap();
    let bare = b.seq(&[digits]).unwrap();
    let number = b.alt(&[signed, bare]).unwrap();
    let root = b.seq(&[lparen, number, rparen]).unwrap();
    let g = b.finalize().unwrap();

    let mut rng = Rng::new(0xDEADBEEF);
    assert!(g.self_check(root, 128, &mut rng));

    assert!(g.match_bytes(root, b"(+631)", anchored()).is_full());
    assert!(g.match_bytes(root, b"(9)", anchored()).is_full());
    assert!(!g.match_bytes(root, b"()", anchored()).is_full());
    assert!(!g.match_bytes(root, b"(+)", anchored()).is_full());
}

#[test]
fn vcs_directory_names() {
    // The shape the crawler uses for version-control directory detection:
    // a handful of exact names behind one dispatch table.
    let mut b = Builder::new();
    let mut names = Vec::new();
    for name in [&b".git"[..], &b".hg"[..], &b".svn"[..], &b".bzr"[..]] {
        names.push(b.exact(name).unwrap());
    }
    let vcs = b.alt(&names).unwrap();
    b.grammar_with_format("vcs-dir", vcs, "vcs").unwrap();
    let g = b.finalize().unwrap();

    let id = g.grammar("vcs-dir").unwrap();
    assert_eq!(g.grammar_format(id), Some("vcs"));
    assert!(g.grammar_match(id, b".git", anchored()).is_full());
    assert!(g.grammar_match(id, b".svn", anchored()).is_full());
    assert!(!g.grammar_match(id, b".gitignore", anchored()).is_full());
    assert!(!g.grammar_match(id, b"git", anchored()).is_full());
}

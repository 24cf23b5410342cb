/*!
The wildcard node kind: a fixed number of bits with any content.
*/

use crate::util::{
    bits::BitLen,
    count::Cardinality,
    rng::Rng,
};

/// Matches any content of exactly `width` bits.
///
/// Wildcards are how sequences express padding between anchored fields,
/// and what full-width ranges canonicalize into. A width of zero is legal
/// and matches everywhere without consuming anything.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Wildcard {
    pub(crate) width: BitLen,
}

impl Wildcard {
    pub(crate) fn new(width: BitLen) -> Wildcard {
        debug_assert!(!width.is_unbounded());
        Wildcard { width }
    }

    /// The number of distinct instances: `2^width`, saturating.
    pub(crate) fn cardinality(&self) -> Cardinality {
        let bits = self.width.get();
        if bits >= 64 {
            Cardinality::MANY
        } else {
            Cardinality::new(1u64 << bits)
        }
    }

    /// One arbitrary instance: random bytes padded out to whole bytes,
    /// with unused trailing bits cleared.
    pub(crate) fn sample(&self, rng: &mut Rng) -> Vec<u8> {
        let nbytes = self.width.to_padded_bytes();
        let mut out = vec![0; nbytes];
        rng.fill(&mut out);
        let rem = (self.width.get() % 8) as u8;
        if rem != 0 {
            if let Some(last) = out.last_mut() {
                *last &= (1u8 << rem).wrapping_sub(1);
            }
        }
        out
    }
}

/*!
A small deterministic generator for instance sampling.

Instance generation only needs reproducible, well-mixed bits, not
cryptographic quality, so this is a plain xorshift64* with a fixed
scrambling multiplier. Seeding is explicit: the same seed always yields
the same instances, which is exactly what tests want.
*/

/// A seedable xorshift64* pseudo-random generator.
#[derive(Clone, Debug)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Create a generator from the given seed. A zero seed is remapped,
    /// since xorshift has an all-zeroes fixed point.
    #[inline]
    pub fn new(seed: u64) -> Rng {
        Rng { state: if seed == 0 { 0x9E3779B97F4A7C15 } else { seed } }
    }

    /// The next 64 pseudo-random bits.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// A pseudo-random value in `0..limit`. `limit` must be non-zero.
    #[inline]
    pub fn below(&mut self, limit: u64) -> u64 {
        debug_assert!(limit > 0, "Rng::below requires a non-zero limit");
        self.next_u64() % limit.max(1)
    }

    /// A pseudo-random value in the inclusive range `lo..=hi`.
    #[inline]
    pub fn in_range(&mut self, lo: u64, hi: u64) -> u64 {
        debug_assert!(lo <= hi);
        if lo >= hi {
            return lo;
        }
        let width = hi - lo;
        if width == u64::MAX {
            self.next_u64()
        } else {
            lo + self.below(width + 1)
        }
    }

    /// Fill `buf` with pseudo-random bytes.
    pub fn fill(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(8) {
            let bits = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bits[..chunk.len()]);
        }
    }
}

/*!
The literal node kind: a fixed exact byte pattern.
*/

use core::fmt;

use memchr::memmem;

use crate::util::{search::Mode, skip::SkipSet};

/// A fixed-length exact byte pattern.
///
/// Literals up to four bytes are stored inline; anything longer is boxed.
/// The four byte boundary matches the point where an unrolled comparison
/// stops paying for itself, so the storage split and the comparison split
/// coincide.
#[derive(Clone, Eq, Hash, PartialEq)]
pub(crate) struct Literal {
    bytes: Bytes,
    /// Marks this literal as a lexical token for grammar authoring. Has no
    /// effect on matching.
    pub(crate) token: bool,
}

#[derive(Clone, Eq, Hash, PartialEq)]
enum Bytes {
    Inline { len: u8, data: [u8; 4] },
    Heap(Box<[u8]>),
}

impl Literal {
    /// Create a literal from the given bytes. A zero-length literal is
    /// permitted but degenerate: it always matches while consuming
    /// nothing. The builder logs a warning when one is created.
    pub(crate) fn new(bytes: &[u8]) -> Literal {
        let bytes = if bytes.len() <= 4 {
            let mut data = [0; 4];
            data[..bytes.len()].copy_from_slice(bytes);
            Bytes::Inline { len: bytes.len() as u8, data }
        } else {
            Bytes::Heap(bytes.into())
        };
        Literal { bytes, token: false }
    }

    /// The literal's bytes.
    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self.bytes {
            Bytes::Inline { len, ref data } => &data[..usize::from(len)],
            Bytes::Heap(ref data) => data,
        }
    }

    /// The literal's length in bytes.
    #[inline]
    pub(crate) fn byte_len(&self) -> usize {
        match self.bytes {
            Bytes::Inline { len, .. } => usize::from(len),
            Bytes::Heap(ref data) => data.len(),
        }
    }

    /// Returns true for the degenerate zero-length literal.
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }

    /// Test whether the buffer equals this literal at byte offset `at`.
    ///
    /// The comparison is unrolled for the inline lengths and a slice
    /// compare otherwise. Callers guarantee `at <= hay.len()`; running off
    /// the end of the buffer is a miss, not a panic.
    pub(crate) fn eq_at(&self, hay: &[u8], at: usize, mode: Mode) -> bool {
        let lit = self.as_bytes();
        let end = match at.checked_add(lit.len()) {
            None => return false,
            Some(end) => end,
        };
        if end > hay.len() {
            return false;
        }
        if mode.is_precise() {
            match lit.len() {
                0 => true,
                1 => hay[at] == lit[0],
                2 => hay[at] == lit[0] && hay[at + 1] == lit[1],
                3 => {
                    hay[at] == lit[0]
                        && hay[at + 1] == lit[1]
                        && hay[at + 2] == lit[2]
                }
                4 => {
                    hay[at] == lit[0]
                        && hay[at + 1] == lit[1]
                        && hay[at + 2] == lit[2]
                        && hay[at + 3] == lit[3]
                }
                _ => &hay[at..end] == lit,
            }
        } else {
            lit.iter()
                .zip(&hay[at..end])
                .all(|(&a, &b)| mode.byte_eq(a, b))
        }
    }

    /// Find the first byte offset in `hay[from..to]` where this literal
    /// matches. This is the unanchored search path for literals.
    pub(crate) fn find_in(
        &self,
        hay: &[u8],
        from: usize,
        to: usize,
        mode: Mode,
    ) -> Option<usize> {
        let to = to.min(hay.len());
        if from > to {
            return None;
        }
        if self.is_empty() {
            return Some(from);
        }
        if mode.is_precise() {
            return memmem::find(&hay[from..to], self.as_bytes())
                .map(|i| from + i);
        }
        let last = to.checked_sub(self.byte_len())?;
        (from..=last).find(|&at| self.eq_at(hay, at, mode))
    }

    /// Add the bytes a match of this literal can start with to `set`:
    /// the first byte, its case-folded twin under case-insensitive modes,
    /// and the sibling separator under separator-insensitive modes.
    pub(crate) fn leading(&self, set: &mut SkipSet, mode: Mode) {
        let first = match self.as_bytes().first() {
            // The empty literal starts with anything (by matching nothing).
            None => {
                set.union(&SkipSet::all());
                return;
            }
            Some(&first) => first,
        };
        set.add(first);
        if mode.is_case_insensitive() && first.is_ascii_alphabetic() {
            set.add(first.to_ascii_lowercase());
            set.add(first.to_ascii_uppercase());
        }
        if mode.is_separator_insensitive() {
            if first == b'-' {
                set.add(b'_');
            }
            if first == b'_' {
                set.add(b'-');
            }
        }
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Literal({:?})", DebugBytes(self.as_bytes()))?;
        if self.token {
            write!(f, " token")?;
        }
        Ok(())
    }
}

/// Formats a byte slice with printable ASCII shown as characters and
/// everything else escaped, so grammar dumps stay readable.
pub(crate) struct DebugBytes<'a>(pub(crate) &'a [u8]);

impl<'a> fmt::Debug for DebugBytes<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"")?;
        for &b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", char::from(b))?;
            } else {
                write!(f, "\\x{:02X}", b)?;
            }
        }
        write!(f, "\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_and_heap_agree() {
        // Lengths 4 and 5 straddle the inline/heap storage boundary and
        // must behave identically.
        let short = Literal::new(b"abcd");
        let long = Literal::new(b"abcde");
        let mode = Mode::new();

        assert!(short.eq_at(b"abcd", 0, mode));
        assert!(!short.eq_at(b"abcx", 0, mode));
        assert!(!short.eq_at(b"abc", 0, mode));
        assert!(long.eq_at(b"abcde", 0, mode));
        assert!(!long.eq_at(b"abcdx", 0, mode));
        assert!(!long.eq_at(b"abcd", 0, mode));
    }

    #[test]
    fn eq_at_modes() {
        let lit = Literal::new(b"big-endian");
        assert!(!lit.eq_at(b"BIG-ENDIAN", 0, Mode::new()));
        assert!(lit.eq_at(b"BIG-ENDIAN", 0, Mode::new().case_insensitive(true)));
        assert!(lit.eq_at(
            b"big_endian",
            0,
            Mode::new().separator_insensitive(true)
        ));
    }

    #[test]
    fn find_in_scans() {
        let lit = Literal::new(b"bird");
        assert_eq!(lit.find_in(b"bluebird", 0, 8, Mode::new()), Some(4));
        assert_eq!(lit.find_in(b"bluebird", 5, 8, Mode::new()), None);
        assert_eq!(
            lit.find_in(b"blueBIRD", 0, 8, Mode::new().case_insensitive(true)),
            Some(4)
        );
    }

    #[test]
    fn leading_bytes() {
        let lit = Literal::new(b"int");
        let mut set = SkipSet::empty();
        lit.leading(&mut set, Mode::new());
        assert_eq!(set.iter().collect::<Vec<u8>>(), vec![b'i']);

        let mut folded = SkipSet::empty();
        lit.leading(&mut folded, Mode::new().case_insensitive(true));
        assert!(folded.contains(b'i') && folded.contains(b'I'));
    }
}

/*!
Match outcomes and match-mode configuration.
*/

use core::fmt;

use crate::util::bits::{BitLen, BitSpan};

/// The outcome of one match attempt.
///
/// A hit records where the attempt started, how many bits it consumed and
/// whether the node matched in full. A partial hit is not an error: it is
/// the ordinary "no match" (or "matched a prefix") outcome, and for
/// sequences it carries the bits consumed by the sub-nodes that did match
/// before the failing one.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Hit {
    start: BitLen,
    len: BitLen,
    full: bool,
}

impl Hit {
    /// A full hit at `start` consuming `len` bits.
    #[inline]
    pub fn full(start: BitLen, len: BitLen) -> Hit {
        Hit { start, len, full: true }
    }

    /// A full hit at `start` consuming nothing. This is what zero-width
    /// assertions report when their condition holds.
    #[inline]
    pub fn zero_width(start: BitLen) -> Hit {
        Hit { start, len: BitLen::ZERO, full: true }
    }

    /// A miss at `start`: nothing consumed, not a full match.
    #[inline]
    pub fn miss(start: BitLen) -> Hit {
        Hit { start, len: BitLen::ZERO, full: false }
    }

    /// Where this match attempt started, in bits.
    #[inline]
    pub fn start(&self) -> BitLen {
        self.start
    }

    /// How many bits this attempt consumed.
    #[inline]
    pub fn len(&self) -> BitLen {
        self.len
    }

    /// One past the last consumed bit.
    #[inline]
    pub fn end(&self) -> BitLen {
        self.start.saturating_add(self.len)
    }

    /// The consumed extent as a region.
    #[inline]
    pub fn span(&self) -> BitSpan {
        BitSpan::new(self.start, self.end())
    }

    /// Returns true if the node matched in full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Append another hit's consumption to this one. Sequences use this to
    /// accumulate sub-hits; the result is full only if both were.
    #[inline]
    pub fn extend(&mut self, other: &Hit) {
        self.len = self.len.saturating_add(other.len);
        self.full = self.full && other.full;
    }

    /// This hit, demoted to a partial one.
    #[inline]
    pub fn into_partial(mut self) -> Hit {
        self.full = false;
        self
    }
}

impl fmt::Debug for Hit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Hit({:?}, len={:?}, {})",
            self.start,
            self.len,
            if self.full { "full" } else { "partial" }
        )
    }
}

/// The flags governing one match attempt.
///
/// The default mode is unanchored (the engine may scan forward within the
/// region for a place the node can start) and precise (bytes compare
/// exactly). This mirrors a search; anchored mode is a test at exactly the
/// region start, which is what sequences use internally for their
/// sub-nodes.
///
/// # Example
///
/// ```
/// use pattern_graph::Mode;
///
/// let mode = Mode::new().anchored(true).case_insensitive(true);
/// assert!(mode.is_anchored());
/// assert!(!mode.is_precise());
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Mode {
    anchored: bool,
    case_insensitive: bool,
    separator_insensitive: bool,
}

impl Mode {
    /// A new mode: unanchored, case sensitive, separator sensitive.
    #[inline]
    pub fn new() -> Mode {
        Mode::default()
    }

    /// Whether matching is pinned to the region start ("exact") instead of
    /// scanning forward ("partial").
    #[inline]
    pub fn anchored(mut self, yes: bool) -> Mode {
        self.anchored = yes;
        self
    }

    /// Whether ASCII letters compare equal regardless of case.
    #[inline]
    pub fn case_insensitive(mut self, yes: bool) -> Mode {
        self.case_insensitive = yes;
        self
    }

    /// Whether `-` and `_` compare equal. Useful when matching file names
    /// against keyword grammars.
    #[inline]
    pub fn separator_insensitive(mut self, yes: bool) -> Mode {
        self.separator_insensitive = yes;
        self
    }

    /// Returns true if matching is pinned to the region start.
    #[inline]
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Returns true if ASCII case is ignored.
    #[inline]
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Returns true if `-` and `_` are treated as equal.
    #[inline]
    pub fn is_separator_insensitive(&self) -> bool {
        self.separator_insensitive
    }

    /// Returns true if bytes compare exactly under this mode.
    #[inline]
    pub fn is_precise(&self) -> bool {
        !self.case_insensitive && !self.separator_insensitive
    }

    /// Compare two bytes under this mode's equivalences.
    #[inline]
    pub fn byte_eq(&self, a: u8, b: u8) -> bool {
        if a == b {
            return true;
        }
        if self.case_insensitive && a.eq_ignore_ascii_case(&b) {
            return true;
        }
        if self.separator_insensitive {
            let sep = |x: u8| x == b'-' || x == b'_';
            if sep(a) && sep(b) {
                return true;
            }
        }
        false
    }
}

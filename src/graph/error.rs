use crate::{
    graph::NodeId,
    util::bits::{BitLen, LenRange},
};

/// An error that can occur while building or finalizing a pattern graph.
///
/// Build errors always indicate a bug in the grammar under construction,
/// never malformed input: matching itself is infallible and reports misses
/// through [`Hit`](crate::Hit) instead.
#[derive(Clone, Debug)]
pub struct BuildError {
    kind: ErrorKind,
}

#[derive(Clone, Debug)]
enum ErrorKind {
    /// Too many nodes were added to a single graph.
    TooManyNodes {
        /// The maximum number of nodes a graph supports.
        limit: usize,
    },
    /// An edit would have made a node reachable from itself.
    Cyclic {
        /// The node the edit was applied to.
        id: NodeId,
    },
    /// A builder operation was applied to the wrong kind of node, e.g.
    /// pushing a sub-node onto a literal.
    ExpectedKind {
        /// The kind the operation requires.
        expected: &'static str,
        /// The kind actually found.
        got: &'static str,
    },
    /// An anchored sub-node was placed at an offset the sequence has
    /// already grown past, or the sequence's accumulated length is not
    /// fixed enough to anchor against.
    InvalidAnchor {
        /// The sequence's accumulated length envelope.
        have: LenRange,
        /// The requested absolute offset.
        want: BitLen,
    },
    /// Range endpoints of different byte widths.
    RangeWidthMismatch {
        /// Width of the low endpoint in bytes.
        lo: usize,
        /// Width of the high endpoint in bytes.
        hi: usize,
    },
    /// A range width outside the supported 1..=8 bytes.
    RangeWidthUnsupported {
        /// The offending width in bytes.
        width: usize,
    },
    /// A range whose low endpoint exceeds its high endpoint.
    RangeInverted,
    /// Two alternatives of one alternation have identical literal content,
    /// which would make dispatch-table hits ambiguous.
    DuplicateAlternative {
        /// The duplicated literal content.
        content: Box<[u8]>,
    },
    /// A grammar name was registered twice.
    DuplicateGrammar {
        /// The offending name.
        name: Box<str>,
    },
    /// A complemented alternation with no defined minimum length; such a
    /// node has no well-defined consumption on a hit.
    UnsatisfiableComplement {
        /// The alternation in question.
        id: NodeId,
    },
    /// A repetition whose count interval permits no count at all.
    EmptyCounts,
    /// A wildcard of unbounded width.
    UnboundedWildcard,
}

impl BuildError {
    fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn too_many_nodes(limit: usize) -> BuildError {
        BuildError { kind: ErrorKind::TooManyNodes { limit } }
    }

    pub(crate) fn cyclic(id: NodeId) -> BuildError {
        BuildError { kind: ErrorKind::Cyclic { id } }
    }

    pub(crate) fn expected_kind(
        expected: &'static str,
        got: &'static str,
    ) -> BuildError {
        BuildError { kind: ErrorKind::ExpectedKind { expected, got } }
    }

    pub(crate) fn invalid_anchor(have: LenRange, want: BitLen) -> BuildError {
        BuildError { kind: ErrorKind::InvalidAnchor { have, want } }
    }

    pub(crate) fn range_width_mismatch(lo: usize, hi: usize) -> BuildError {
        BuildError { kind: ErrorKind::RangeWidthMismatch { lo, hi } }
    }

    pub(crate) fn range_width_unsupported(width: usize) -> BuildError {
        BuildError { kind: ErrorKind::RangeWidthUnsupported { width } }
    }

    pub(crate) fn range_inverted() -> BuildError {
        BuildError { kind: ErrorKind::RangeInverted }
    }

    pub(crate) fn duplicate_alternative(content: &[u8]) -> BuildError {
        BuildError {
            kind: ErrorKind::DuplicateAlternative { content: content.into() },
        }
    }

    pub(crate) fn duplicate_grammar(name: &str) -> BuildError {
        BuildError { kind: ErrorKind::DuplicateGrammar { name: name.into() } }
    }

    pub(crate) fn unsatisfiable_complement(id: NodeId) -> BuildError {
        BuildError { kind: ErrorKind::UnsatisfiableComplement { id } }
    }

    pub(crate) fn empty_counts() -> BuildError {
        BuildError { kind: ErrorKind::EmptyCounts }
    }

    pub(crate) fn unbounded_wildcard() -> BuildError {
        BuildError { kind: ErrorKind::UnboundedWildcard }
    }
}

impl std::error::Error for BuildError {}

impl core::fmt::Display for BuildError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self.kind() {
            ErrorKind::TooManyNodes { limit } => write!(
                f,
                "graph exceeds the maximum of {} nodes",
                limit,
            ),
            ErrorKind::Cyclic { id } => write!(
                f,
                "edit would make node {:?} reachable from itself",
                id,
            ),
            ErrorKind::ExpectedKind { expected, got } => write!(
                f,
                "operation requires a {} node but was given a {} node",
                expected, got,
            ),
            ErrorKind::InvalidAnchor { have, want } => write!(
                f,
                "cannot anchor a sub-node at bit offset {:?} in a sequence \
                 whose accumulated length is {:?}",
                want, have,
            ),
            ErrorKind::RangeWidthMismatch { lo, hi } => write!(
                f,
                "range endpoints differ in width: {} vs {} bytes",
                lo, hi,
            ),
            ErrorKind::RangeWidthUnsupported { width } => write!(
                f,
                "range width of {} bytes is outside the supported 1..=8",
                width,
            ),
            ErrorKind::RangeInverted => {
                write!(f, "range low endpoint exceeds its high endpoint")
            }
            ErrorKind::DuplicateAlternative { content } => write!(
                f,
                "alternation contains duplicate literal content {:?}",
                crate::graph::literal::DebugBytes(content),
            ),
            ErrorKind::DuplicateGrammar { name } => {
                write!(f, "grammar name {:?} registered twice", name)
            }
            ErrorKind::UnsatisfiableComplement { id } => write!(
                f,
                "complemented alternation {:?} has no defined minimum \
                 length to consume",
                id,
            ),
            ErrorKind::EmptyCounts => {
                write!(f, "repetition count interval permits no count")
            }
            ErrorKind::UnboundedWildcard => {
                write!(f, "wildcard width must be a concrete bit count")
            }
        }
    }
}

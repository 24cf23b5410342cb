/*!
Composable byte-pattern grammars with bit-precise matching.

This crate is the pattern engine of a file classifier: a small algebra of
node kinds (literals, sequences, alternations, numeric ranges,
repetitions, zero-width assertions, wildcards) that compose into directed
acyclic graphs representing grammars such as keyword sets, file magic
tables and name conventions, together with the algorithms over those
graphs:

* bit-precise matching of a node against a byte buffer, constrained to a
  region of interest, with case- and separator-insensitive modes;
* cardinality estimation (how many distinct byte strings a node matches,
  saturating);
* random instance generation, for self-checking grammars and synthesizing
  test inputs;
* leading-byte skip sets, for rejecting scan positions without touching
  the graph;
* hash dispatch over literal-only alternations, so a thousand keywords
  cost one lookup instead of a thousand comparisons.

Grammars are built once through [`graph::Builder`], finalized into an
immutable [`Graph`], and then matched concurrently without
synchronization. See the [`graph`] module for a worked example.

This is a library with a purely in-process boundary: the filesystem
crawler that feeds it buffers and consumes its format tags lives
elsewhere, as do the grammar data sets themselves.
*/

#![deny(missing_docs)]

#[macro_use]
mod macros;

pub mod graph;
pub mod util;

pub use crate::{
    graph::{
        Boundary, BuildError, Endian, Graph, GrammarId, Lang, NodeId,
    },
    util::{
        bits::{BitLen, BitSpan, LenRange},
        count::{Cardinality, CountRange},
        rng::Rng,
        search::{Hit, Mode},
        skip::SkipSet,
    },
};

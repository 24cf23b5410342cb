/*!
Support types shared by the node kinds: bit-granular lengths and regions,
repeat counts, saturating cardinalities, match outcomes and modes, skip
sets and the sampling generator.
*/

pub mod bits;
pub mod count;
pub mod rng;
pub mod search;
pub mod skip;

//! Reflection metadata for the ridl interface compiler
//!
//! Every interface gets a compact, self-delimiting string encoding of
//! its reflected shape. The string is embedded as a literal constant in
//! each generated artifact and decoded at run time by the dispatch
//! layer, so its byte layout is a wire-format contract: name tokens are
//! length-prefixed decimal + raw characters, everything else is a
//! single tag character.
//!
//! [`synth`] produces the strings and the per-member selector hashes;
//! [`reflect`] is the consumer-side cursor used to decode them again.

pub mod hash;
pub mod reflect;
pub mod synth;
pub mod tags;

pub use hash::one_at_a_time;
pub use synth::{synthesize, MetaOptions, MetaTables, SymbolEntry};

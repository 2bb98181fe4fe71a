//! # lmq-dsa
//!
//! Storage primitives for quantized n-gram weights: bit-packed field access,
//! the page-backed float slab that holds codebooks, and a flat packed entry
//! array matching how a trie level lays out its nodes.

extern crate alloc;

pub mod bitarr;
pub mod entries;
pub mod slab;

pub use bitarr::{field_shift, required_bits, split_offsets, BitAddress, BitMask, NARROW_MAX_BITS, WIDE_MAX_BITS};
pub use entries::PackedEntries;
pub use slab::FloatSlab;

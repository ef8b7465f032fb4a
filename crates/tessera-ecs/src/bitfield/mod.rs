//! Bitfield primitives: a fixed 256-bit [`BitfieldBlock`] and a growable,
//! small-object-optimized [`BitfieldArray`] built from them.

mod array;
mod block;

pub use array::{BitfieldArray, SetBits};
pub use block::{BitfieldBlock, BITS_PER_BLOCK};

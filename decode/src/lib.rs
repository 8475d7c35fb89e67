//! Scene container decoder.
//!
//! The container is a stream of 4-byte-tagged chunks behind an `.EAR`
//! signature. Primitive chunks (`flt4`, `int4`, `str `, `vec3`, `tri `)
//! carry their payload directly; block chunks carry a little-endian `u32`
//! payload length followed by child chunks.

#[macro_use]
extern crate log;

mod parser;
mod reader;

pub use parser::{decode, decode_file, Decoded};
pub use reader::Reader;

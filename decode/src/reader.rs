//! Tagged-chunk primitives.

use aural_core::error::{EngineError, Result};
use aural_core::geometry::{Point3f, Vector3f};
use byteorder::{ByteOrder, LittleEndian};

/// A 4-byte chunk tag.
pub type Tag = [u8; 4];

pub const TAG_FLT4: Tag = *b"flt4";
pub const TAG_INT4: Tag = *b"int4";
pub const TAG_STR: Tag = *b"str ";
pub const TAG_VEC3: Tag = *b"vec3";
pub const TAG_TRI: Tag = *b"tri ";

/// Sequential reader over a chunk stream or a block payload.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

fn tag_str(tag: &Tag) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

fn malformed(what: &str) -> EngineError {
    EngineError::Decode(format!("malformed chunk: {what}"))
}

impl<'a> Reader<'a> {
    /// Creates a reader over a byte stream.
    ///
    /// * `buf` - The bytes.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(malformed("unexpected end of input"));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// The tag of the next chunk without consuming it, or `None` at the end
    /// of the stream.
    pub fn peek_tag(&self) -> Option<Tag> {
        if self.remaining() < 4 {
            return None;
        }
        let mut tag = [0; 4];
        tag.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        Some(tag)
    }

    /// Reads the next chunk tag.
    pub fn read_tag(&mut self) -> Result<Tag> {
        let bytes = self.take(4)?;
        let mut tag = [0; 4];
        tag.copy_from_slice(bytes);
        Ok(tag)
    }

    /// Reads the next chunk tag, failing when it differs from the expected
    /// one.
    ///
    /// * `expected` - The expected tag.
    pub fn expect_tag(&mut self, expected: Tag) -> Result<()> {
        let tag = self.read_tag()?;
        if tag != expected {
            return Err(EngineError::Decode(format!(
                "found '{}' while expecting '{}'",
                tag_str(&tag),
                tag_str(&expected)
            )));
        }
        Ok(())
    }

    fn read_raw_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Reads a block header: the expected tag plus the payload length.
    ///
    /// * `expected` - The expected block tag.
    pub fn block_header(&mut self, expected: Tag) -> Result<usize> {
        self.expect_tag(expected)?;
        Ok(self.read_raw_u32()? as usize)
    }

    /// Reads a block header for an already peeked tag and returns a reader
    /// bounded to its payload, consuming the whole block.
    ///
    /// * `expected` - The expected block tag.
    pub fn block(&mut self, expected: Tag) -> Result<Reader<'a>> {
        let len = self.block_header(expected)?;
        Ok(Reader::new(self.take(len)?))
    }

    /// Skips a block of an unknown or uninteresting tag.
    pub fn skip_block(&mut self) -> Result<Tag> {
        let tag = self.read_tag()?;
        let len = self.read_raw_u32()? as usize;
        self.take(len)?;
        Ok(tag)
    }

    /// Reads a `flt4` chunk.
    pub fn read_f32(&mut self) -> Result<f32> {
        self.expect_tag(TAG_FLT4)?;
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Reads an `int4` chunk.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.expect_tag(TAG_INT4)?;
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    /// Reads a `str ` chunk: a NUL-terminated string padded to a multiple
    /// of four bytes.
    pub fn read_str(&mut self) -> Result<String> {
        self.expect_tag(TAG_STR)?;
        let rest = &self.buf[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed("unterminated string"))?;
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.take(len + (4 - len % 4))?;
        Ok(s)
    }

    /// Reads a `vec3` chunk: three `flt4` children.
    pub fn read_vec3(&mut self) -> Result<Vector3f> {
        self.expect_tag(TAG_VEC3)?;
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Vector3f::new(x, y, z))
    }

    /// Reads a `vec3` chunk as a point.
    pub fn read_point3(&mut self) -> Result<Point3f> {
        let v = self.read_vec3()?;
        Ok(Point3f::new(v.x, v.y, v.z))
    }

    /// Reads a `tri ` chunk: three `vec3` children.
    pub fn read_tri(&mut self) -> Result<[Point3f; 3]> {
        self.expect_tag(TAG_TRI)?;
        Ok([self.read_point3()?, self.read_point3()?, self.read_point3()?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_chunks() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"flt4");
        buf.extend_from_slice(&1.5f32.to_le_bytes());
        buf.extend_from_slice(b"int4");
        buf.extend_from_slice(&42i32.to_le_bytes());
        buf.extend_from_slice(b"str ");
        buf.extend_from_slice(b"abc\0");

        let mut r = Reader::new(&buf);
        assert_eq!(r.peek_tag(), Some(TAG_FLT4));
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_i32().unwrap(), 42);
        assert_eq!(r.read_str().unwrap(), "abc");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn string_padding_lands_on_four_byte_boundary() {
        // A 4-character string pads with a NUL plus three filler bytes.
        let mut buf = Vec::new();
        buf.extend_from_slice(b"str ");
        buf.extend_from_slice(b"abcd\0\0\0\0");
        buf.extend_from_slice(b"int4");
        buf.extend_from_slice(&7i32.to_le_bytes());

        let mut r = Reader::new(&buf);
        assert_eq!(r.read_str().unwrap(), "abcd");
        assert_eq!(r.read_i32().unwrap(), 7);
    }

    #[test]
    fn blocks_bound_their_children() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"KEYS");
        buf.extend_from_slice(&16u32.to_le_bytes());
        for f in [0.0f32, 1.0] {
            buf.extend_from_slice(b"flt4");
            buf.extend_from_slice(&f.to_le_bytes());
        }
        buf.extend_from_slice(b"int4");
        buf.extend_from_slice(&9i32.to_le_bytes());

        let mut r = Reader::new(&buf);
        let mut block = r.block(*b"KEYS").unwrap();
        assert_eq!(block.read_f32().unwrap(), 0.0);
        assert_eq!(block.read_f32().unwrap(), 1.0);
        assert_eq!(block.remaining(), 0);
        // The outer reader continues after the block payload.
        assert_eq!(r.read_i32().unwrap(), 9);
    }

    #[test]
    fn unexpected_tag_is_a_decode_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"int4");
        buf.extend_from_slice(&1i32.to_le_bytes());
        let mut r = Reader::new(&buf);
        assert!(r.read_f32().is_err());
    }
}

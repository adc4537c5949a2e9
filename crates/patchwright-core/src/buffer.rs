//! Byte-buffer primitives shared by every codec in the crate.
//!
//! The layout is the conventional little-endian binary-writer format spoken
//! by every process that exchanges override payloads:
//!
//! - `i32` / `f32`: 4 bytes, little-endian.
//! - `bool`: 1 byte, `0` or `1` (any non-zero byte reads as `true`).
//! - string: byte length as a 7-bit variable-length integer, then UTF-8.
//!
//! Writers never fail. Readers return [`CodecError`] on truncation or
//! corruption and never panic on hostile input.

use crate::CodecError;

// ---------------------------------------------------------------------------
// PackageWriter
// ---------------------------------------------------------------------------

/// Append-only writer over a growable byte vector.
#[derive(Debug, Default, Clone)]
pub struct PackageWriter {
    buf: Vec<u8>,
}

impl PackageWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create an empty writer with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Write a little-endian `i32`.
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian IEEE-754 `f32`.
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a single-byte boolean.
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// Write a 7-bit length-prefixed UTF-8 string.
    pub fn write_str(&mut self, s: &str) {
        self.write_7bit_len(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_7bit_len(&mut self, mut v: u32) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, returning the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// PackageReader
// ---------------------------------------------------------------------------

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct PackageReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackageReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian IEEE-754 `f32`.
    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Read a single-byte boolean.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.take_array::<1>()?[0] != 0)
    }

    /// Read a 7-bit length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let start = self.pos;
        let len = self.read_7bit_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { offset: start })
    }

    /// Read a list element count written as `i32`.
    ///
    /// The count is validated against the bytes left in the buffer, assuming
    /// each element occupies at least `min_element_size` bytes, so a corrupt
    /// count cannot trigger a huge allocation.
    pub fn read_count(&mut self, min_element_size: usize) -> Result<usize, CodecError> {
        let offset = self.pos;
        let count = self.read_i32()?;
        if count < 0 {
            return Err(CodecError::NegativeCount { count });
        }
        let count = count as usize;
        let needed = count.saturating_mul(min_element_size.max(1));
        if needed > self.remaining() {
            return Err(CodecError::Truncated {
                offset,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(count)
    }

    fn read_7bit_len(&mut self) -> Result<usize, CodecError> {
        let offset = self.pos;
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.take_array::<1>()?[0];
            value |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                // The fifth byte may only carry three bits, keeping the length within i32.
                if shift == 28 && byte > 0x07 {
                    return Err(CodecError::InvalidLength { offset });
                }
                return Ok(value as usize);
            }
        }
        Err(CodecError::InvalidLength { offset })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

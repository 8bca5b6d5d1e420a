//! Order-preserving binary primitives shared by every codec in this crate.
//!
//! Writers append to a `Vec<u8>`; readers walk a [`Reader`] cursor and fail
//! with [`DfiError::TruncatedInput`] instead of reading past the end.

use crate::error::DfiError;

/// A value that serializes itself into consensus bytes.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// A value that can be parsed back from consensus bytes.
pub trait Decode: Sized {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, DfiError>;

    /// Decode a value that must span the whole buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DfiError> {
        let mut reader = Reader::new(bytes);
        let value = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }

    fn from_hex(hex_str: &str) -> Result<Self, DfiError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| DfiError::Format(format!("invalid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// Number of bytes the compact varint encoding of `n` occupies.
pub fn varint_len(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Append the minimal compact varint encoding of `n`.
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Append `data` prefixed with its varint length.
pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Append a varint count followed by every item.
pub fn write_vec<T: Encode>(buf: &mut Vec<u8>, items: &[T]) {
    write_varint(buf, items.len() as u64);
    for item in items {
        item.encode(buf);
    }
}

/// Append a UTF-8 string as var-bytes.
pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_var_bytes(buf, s.as_bytes());
}

/// Forward-only cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), DfiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DfiError::Format(format!(
                "{} trailing bytes after decode",
                self.remaining()
            )))
        }
    }

    /// Look at the next `n` bytes without consuming them.
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos + n)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DfiError> {
        if n > self.remaining() {
            return Err(DfiError::TruncatedInput {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DfiError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DfiError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DfiError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DfiError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, DfiError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64, DfiError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read a compact varint, rejecting any non-minimal encoding.
    pub fn read_varint(&mut self) -> Result<u64, DfiError> {
        let value = match self.read_u8()? {
            n @ 0x00..=0xfc => return Ok(n as u64),
            0xfd => {
                let v = self.read_u16_le()? as u64;
                if v < 0xfd {
                    return Err(DfiError::InvalidVarInt(v));
                }
                v
            }
            0xfe => {
                let v = self.read_u32_le()? as u64;
                if v < 0x1_0000 {
                    return Err(DfiError::InvalidVarInt(v));
                }
                v
            }
            0xff => {
                let v = self.read_u64_le()?;
                if v < 0x1_0000_0000 {
                    return Err(DfiError::InvalidVarInt(v));
                }
                v
            }
        };
        Ok(value)
    }

    /// Read a varint used as a length or count, bounded by the bytes left.
    pub fn read_len(&mut self) -> Result<usize, DfiError> {
        let n = self.read_varint()?;
        if n > self.remaining() as u64 {
            return Err(DfiError::TruncatedInput {
                needed: usize::try_from(n).unwrap_or(usize::MAX),
                remaining: self.remaining(),
            });
        }
        Ok(n as usize)
    }

    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], DfiError> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    /// Read a varint count followed by that many items.
    pub fn read_vec<T: Decode>(&mut self) -> Result<Vec<T>, DfiError> {
        // Every item occupies at least one byte, so the count is bounded too.
        let count = self.read_len()?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }

    pub fn read_string(&mut self) -> Result<String, DfiError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| DfiError::Format(format!("invalid utf-8 string: {e}")))
    }
}

//! The DER subset used on the wire: context-specific tags, definite
//! lengths, unsigned integers and named bit strings.

use std::fmt;

use crate::error::DecodeError;

const CONTEXT: u8 = 0x80;
const CONSTRUCTED: u8 = 0x20;
const SEQUENCE: u8 = 0x30;
const HIGH_TAG: u8 = 0x1f;

/// Largest long-form length we accept: four length octets.
const MAX_LENGTH_OCTETS: usize = 4;

/// A context-specific tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub const fn primitive(number: u32) -> Self {
        Self {
            constructed: false,
            number,
        }
    }

    pub const fn constructed(number: u32) -> Self {
        Self {
            constructed: true,
            number,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constructed {
            write!(f, "[{}] (constructed)", self.number)
        } else {
            write!(f, "[{}]", self.number)
        }
    }
}

pub(crate) fn write_tag(out: &mut Vec<u8>, tag: Tag) {
    let class = CONTEXT | if tag.constructed { CONSTRUCTED } else { 0 };
    if tag.number < u32::from(HIGH_TAG) {
        out.push(class | tag.number as u8);
        return;
    }
    out.push(class | HIGH_TAG);
    let mut groups = Vec::with_capacity(5);
    let mut n = tag.number;
    loop {
        groups.push((n & 0x7f) as u8);
        n >>= 7;
        if n == 0 {
            break;
        }
    }
    let last = groups.len() - 1;
    for (i, group) in groups.iter().rev().enumerate() {
        out.push(if i == last { *group } else { group | 0x80 });
    }
}

pub(crate) fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = (len as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Appends a complete tag-length-value triple.
pub(crate) fn write_tlv(out: &mut Vec<u8>, tag: Tag, content: &[u8]) {
    write_tag(out, tag);
    write_length(out, content.len());
    out.extend_from_slice(content);
}

/// Wraps `content` in a universal SEQUENCE.
pub(crate) fn sequence(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(SEQUENCE);
    write_length(&mut out, content.len());
    out.extend_from_slice(content);
    out
}

/// Minimal big-endian encoding of an unsigned INTEGER.
pub(crate) fn encode_uint(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes
        .iter()
        .take_while(|b| **b == 0)
        .count()
        .min(bytes.len() - 1);
    let mut out = Vec::with_capacity(9);
    if bytes[skip] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[skip..]);
    out
}

pub(crate) fn decode_uint(bytes: &[u8]) -> Result<u64, DecodeError> {
    let (first, rest) = bytes.split_first().ok_or(DecodeError::Integer)?;
    if first & 0x80 != 0 {
        return Err(DecodeError::Integer);
    }
    let digits = if *first == 0 && !rest.is_empty() {
        if rest[0] & 0x80 == 0 {
            return Err(DecodeError::Integer);
        }
        rest
    } else {
        bytes
    };
    if digits.len() > 8 {
        return Err(DecodeError::Integer);
    }
    Ok(digits
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Named-bit BIT STRING: bit `n` is counted from the most significant
/// bit of the first data octet, trailing zero octets are trimmed.
pub(crate) fn encode_bits(mask: u32) -> Vec<u8> {
    if mask == 0 {
        return vec![0];
    }
    let highest = 31 - mask.leading_zeros() as usize;
    let octets = highest / 8 + 1;
    let mut out = vec![0u8; octets + 1];
    out[0] = (7 - highest % 8) as u8;
    for bit in 0..=highest {
        if mask & (1 << bit) != 0 {
            out[1 + bit / 8] |= 0x80 >> (bit % 8);
        }
    }
    out
}

pub(crate) fn decode_bits(bytes: &[u8]) -> Result<u32, DecodeError> {
    let (unused, data) = bytes.split_first().ok_or(DecodeError::BitString)?;
    if *unused > 7 || data.len() > 4 || (data.is_empty() && *unused != 0) {
        return Err(DecodeError::BitString);
    }
    if let Some(last) = data.last() {
        if last & ((1u8 << unused) - 1) != 0 {
            return Err(DecodeError::BitString);
        }
    }
    let mut mask = 0u32;
    for (i, octet) in data.iter().enumerate() {
        for j in 0..8 {
            if octet & (0x80 >> j) != 0 {
                mask |= 1 << (i * 8 + j);
            }
        }
    }
    Ok(mask)
}

/// Bounds-checked cursor over untrusted input.
///
/// Every length read is checked against what is left of the slice, so a
/// declared length can never make the reader look past the buffer.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let (first, rest) = self.buf.split_first().ok_or(DecodeError::Truncated)?;
        self.buf = rest;
        Ok(*first)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.buf.len() {
            return Err(DecodeError::LengthOverrun {
                declared: len,
                remaining: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn read_tag(&mut self) -> Result<Tag, DecodeError> {
        let first = self.read_byte()?;
        if first & 0xc0 != CONTEXT {
            return Err(DecodeError::UnexpectedClass(first & 0xc0));
        }
        let constructed = first & CONSTRUCTED != 0;
        let low = first & HIGH_TAG;
        if low != HIGH_TAG {
            return Ok(Tag {
                constructed,
                number: u32::from(low),
            });
        }
        let mut number = 0u32;
        for i in 0..5 {
            let octet = self.read_byte()?;
            if i == 0 && octet == 0x80 {
                return Err(DecodeError::UnexpectedClass(first));
            }
            number = number
                .checked_mul(128)
                .ok_or(DecodeError::UnexpectedClass(first))?
                | u32::from(octet & 0x7f);
            if octet & 0x80 == 0 {
                if number < u32::from(HIGH_TAG) {
                    return Err(DecodeError::UnexpectedClass(first));
                }
                return Ok(Tag {
                    constructed,
                    number,
                });
            }
        }
        Err(DecodeError::UnexpectedClass(first))
    }

    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(usize::from(first));
        }
        let octets = usize::from(first & 0x7f);
        if octets == 0 || octets > MAX_LENGTH_OCTETS {
            return Err(DecodeError::UnsupportedLength);
        }
        let raw = self.take(octets).map_err(|_| DecodeError::Truncated)?;
        if raw[0] == 0 {
            return Err(DecodeError::NonMinimalLength);
        }
        let len = raw
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        if len < 0x80 {
            return Err(DecodeError::NonMinimalLength);
        }
        Ok(len)
    }

    /// Reads one tag-length-value triple, returning the tag and content.
    pub fn read_tlv(&mut self) -> Result<(Tag, &'a [u8]), DecodeError> {
        let tag = self.read_tag()?;
        let len = self.read_length()?;
        Ok((tag, self.take(len)?))
    }

    /// Reads a triple and insists on its tag.
    pub fn expect(&mut self, expected: Tag) -> Result<&'a [u8], DecodeError> {
        let (found, content) = self.read_tlv()?;
        if found != expected {
            return Err(DecodeError::UnexpectedTag { expected, found });
        }
        Ok(content)
    }

    /// Reads a triple only when the next tag is `expected`.
    pub fn optional(&mut self, expected: Tag) -> Result<Option<&'a [u8]>, DecodeError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let mut probe = Reader { buf: self.buf };
        if probe.read_tag()? != expected {
            return Ok(None);
        }
        self.expect(expected).map(Some)
    }

    /// Reads a primitive field that must be exactly `N` bytes.
    pub fn expect_array<const N: usize>(
        &mut self,
        tag: Tag,
        field: &'static str,
    ) -> Result<[u8; N], DecodeError> {
        let content = self.expect(tag)?;
        fixed(content, field)
    }

    pub fn finish(self) -> Result<(), DecodeError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes(self.buf.len()))
        }
    }
}

pub(crate) fn fixed<const N: usize>(
    content: &[u8],
    field: &'static str,
) -> Result<[u8; N], DecodeError> {
    <[u8; N]>::try_from(content).map_err(|_| DecodeError::FieldLength {
        field,
        expected: N,
        actual: content.len(),
    })
}

//! Binary encoding of conditions, fulfillments and partial fulfillments.
//!
//! Every encoded form is bounded by [`MAX_BINARY_CC_SIZE`]. The decoders
//! never trust a declared length beyond what the remaining input can
//! supply, so memory use and recursion depth are bounded by the input
//! length alone.

use tracing::debug;

use crate::condition::{
    Anon, Condition, Ed25519, Eval, Falcon512, Preimage, Prefix, Secp256k1, Threshold,
};
use crate::der::{self, Reader, Tag};
use crate::error::{DecodeError, Error};
use crate::registry::{self, TypeId};
use crate::Result;

/// Hard ceiling on any single encoded condition or fulfillment.
pub const MAX_BINARY_CC_SIZE: usize = 3072;

/// Which proof material a fulfillment encoding must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Every required proof present; thresholds reduced to their cheapest
    /// fulfilled branches.
    Full,
    /// Signatures optional, thresholds keep every branch and carry the
    /// threshold explicitly.
    Partial,
}

/// Appends a triple to `out`, refusing to grow past the ceiling.
pub(crate) fn write_bounded(out: &mut Vec<u8>, tag: Tag, content: &[u8]) -> Result<()> {
    if content.len() > MAX_BINARY_CC_SIZE {
        return Err(Error::SizeExceeded(content.len()));
    }
    der::write_tlv(out, tag, content);
    if out.len() > MAX_BINARY_CC_SIZE {
        return Err(Error::SizeExceeded(out.len()));
    }
    Ok(())
}

/// Reads one fulfillment, dispatching on its type tag.
pub(crate) fn read_fulfillment(
    r: &mut Reader<'_>,
    mode: Mode,
) -> std::result::Result<Condition, DecodeError> {
    let (tag, content) = r.read_tlv()?;
    let cond_type =
        registry::lookup(tag.number).map_err(|_| DecodeError::UnknownType(tag.number))?;
    if !tag.constructed {
        return Err(DecodeError::UnexpectedTag {
            expected: Tag::constructed(tag.number),
            found: tag,
        });
    }
    let node = match cond_type.id {
        TypeId::Preimage => Condition::Preimage(Preimage::read_fulfillment(content)?),
        TypeId::Prefix => Condition::Prefix(Prefix::read_fulfillment(content, mode)?),
        TypeId::Threshold => Condition::Threshold(Threshold::read_fulfillment(content, mode)?),
        TypeId::Ed25519 => Condition::Ed25519(Ed25519::read_fulfillment(content, mode)?),
        TypeId::Secp256k1 => Condition::Secp256k1(Secp256k1::read_fulfillment(content, mode)?),
        TypeId::Eval => Condition::Eval(Eval::read_fulfillment(content)?),
        TypeId::Falcon512 => Condition::Falcon512(Falcon512::read_fulfillment(content, mode)?),
    };
    Ok(node)
}

/// Runs a top-level decoder over the whole of `bytes`.
fn decode_top<T>(
    bytes: &[u8],
    what: &'static str,
    read: impl FnOnce(&mut Reader<'_>) -> std::result::Result<T, DecodeError>,
) -> Result<T> {
    let decoded = if bytes.len() > MAX_BINARY_CC_SIZE {
        Err(DecodeError::TooLarge(bytes.len()))
    } else {
        let mut r = Reader::new(bytes);
        read(&mut r).and_then(|value| r.finish().map(|_| value))
    };
    decoded.map_err(|e| {
        debug!(error = %e, len = bytes.len(), "rejected {what} encoding");
        Error::MalformedEncoding(e)
    })
}

impl Condition {
    /// Condition form: the node compressed to its fingerprint, cost and
    /// subtypes.
    pub fn encode_condition(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(48);
        self.to_anon()?.write_condition(&mut out)?;
        Ok(out)
    }

    /// Full fulfillment form.
    ///
    /// # Errors
    ///
    /// [`Error::NotFulfilled`] when required proof material is missing,
    /// [`Error::SizeExceeded`] past the size ceiling, and
    /// [`Error::InvalidStructure`] for broken invariants.
    pub fn encode_fulfillment(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut out = Vec::new();
        self.write_fulfillment(&mut out, Mode::Full)?;
        Ok(out)
    }

    /// Partial fulfillment form: missing signatures are allowed and
    /// anonymous threshold branches are kept as conditions.
    pub fn encode_partial_fulfillment(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut out = Vec::new();
        self.write_fulfillment(&mut out, Mode::Partial)?;
        Ok(out)
    }

    pub fn decode_condition(bytes: &[u8]) -> Result<Self> {
        decode_top(bytes, "condition", |r| {
            Anon::read_condition(r).map(Condition::Anon)
        })
    }

    pub fn decode_fulfillment(bytes: &[u8]) -> Result<Self> {
        decode_top(bytes, "fulfillment", |r| read_fulfillment(r, Mode::Full))
    }

    pub fn decode_partial_fulfillment(bytes: &[u8]) -> Result<Self> {
        decode_top(bytes, "partial fulfillment", |r| {
            read_fulfillment(r, Mode::Partial)
        })
    }

    pub(crate) fn write_fulfillment(&self, out: &mut Vec<u8>, mode: Mode) -> Result<()> {
        match self {
            Self::Preimage(preimage) => preimage.write_fulfillment(out),
            Self::Prefix(prefix) => prefix.write_fulfillment(out, mode),
            Self::Threshold(threshold) => threshold.write_fulfillment(out, mode),
            Self::Ed25519(ed25519) => ed25519.write_fulfillment(out, mode),
            Self::Secp256k1(secp256k1) => secp256k1.write_fulfillment(out, mode),
            Self::Eval(eval) => eval.write_fulfillment(out),
            Self::Falcon512(falcon) => falcon.write_fulfillment(out, mode),
            Self::Anon(anon) => Err(Error::NotFulfilled(anon.condition_type.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};

    use super::*;

    #[test]
    fn preimage_condition_bytes() {
        let cond = Condition::preimage(b"abc".to_vec());
        let encoded = cond.encode_condition().unwrap();

        let mut expected = vec![0xa0, 0x25, 0x80, 0x20];
        expected.extend_from_slice(&Sha256::digest(b"abc"));
        expected.extend_from_slice(&[0x81, 0x01, 0x03]);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn preimage_fulfillment_bytes() {
        let cond = Condition::preimage(b"abc".to_vec());
        assert_eq!(
            cond.encode_fulfillment().unwrap(),
            vec![0xa0, 0x05, 0x80, 0x03, b'a', b'b', b'c']
        );
    }

    #[test]
    fn compound_condition_carries_subtypes() {
        let cond = Condition::threshold(1, vec![Condition::ed25519([1; 32])]);
        let encoded = cond.encode_condition().unwrap();
        assert_eq!(encoded[0], 0xa2);
        // [2] subtypes: one unused bit count octet, ed25519 is bit 4
        assert_eq!(&encoded[encoded.len() - 4..], &[0x82, 0x02, 0x03, 0x08]);
    }

    #[test]
    fn anon_root_is_not_a_fulfillment() {
        let cond = Condition::decode_condition(
            &Condition::preimage(b"abc".to_vec())
                .encode_condition()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(
            cond.encode_fulfillment(),
            Err(Error::NotFulfilled(TypeId::Preimage))
        );
        assert_eq!(
            cond.encode_partial_fulfillment(),
            Err(Error::NotFulfilled(TypeId::Preimage))
        );
    }

    #[test]
    fn encode_refuses_oversized() {
        let cond = Condition::preimage(vec![0; MAX_BINARY_CC_SIZE]);
        assert!(matches!(
            cond.encode_fulfillment(),
            Err(Error::SizeExceeded(_))
        ));
        // the condition stays small no matter the preimage
        assert!(cond.encode_condition().is_ok());
    }

    #[test]
    fn decode_rejects_oversized_input() {
        let bytes = vec![0u8; MAX_BINARY_CC_SIZE + 1];
        assert_eq!(
            Condition::decode_fulfillment(&bytes),
            Err(Error::MalformedEncoding(DecodeError::TooLarge(
                MAX_BINARY_CC_SIZE + 1
            )))
        );
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = Condition::preimage(b"abc".to_vec())
            .encode_fulfillment()
            .unwrap();
        bytes.push(0);
        assert_eq!(
            Condition::decode_fulfillment(&bytes),
            Err(Error::MalformedEncoding(DecodeError::TrailingBytes(1)))
        );
    }

    #[test]
    fn decode_rejects_unknown_type() {
        // rsa-sha-256 is not registered
        let bytes = [0xa3, 0x02, 0x80, 0x00];
        assert_eq!(
            Condition::decode_fulfillment(&bytes),
            Err(Error::MalformedEncoding(DecodeError::UnknownType(3)))
        );
    }

    #[test]
    fn decode_rejects_wrong_key_length() {
        let mut bytes = vec![0xa4, 0x63, 0x80, 0x1f];
        bytes.extend_from_slice(&[1; 31]);
        bytes.extend_from_slice(&[0x81, 0x40]);
        bytes.extend_from_slice(&[2; 64]);
        bytes[1] = (bytes.len() - 2) as u8;
        assert!(matches!(
            Condition::decode_fulfillment(&bytes),
            Err(Error::MalformedEncoding(DecodeError::FieldLength { .. }))
        ));
    }

    #[test]
    fn nested_length_overrun() {
        // prefix whose inner subfulfillment claims more than is left
        let bytes = [0xa1, 0x08, 0x80, 0x00, 0x81, 0x01, 0x00, 0xa2, 0x7f, 0x00];
        assert!(matches!(
            Condition::decode_fulfillment(&bytes),
            Err(Error::MalformedEncoding(DecodeError::LengthOverrun { .. }))
        ));
    }
}

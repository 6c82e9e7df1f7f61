//! Field codecs for the on-page record format.
//!
//! All integers are written **big-endian**, so an encoded INT or LONG is also
//! a valid fixed-width index key. Strings are written as a 2-byte big-endian
//! length followed by the raw UTF-8 bytes, with no terminator. Every codec is
//! self-delimiting, so a record can be decoded by replaying its schema.
//!
//! ```text
//! INT      [b3 b2 b1 b0]                       4 bytes, i32 BE
//! LONG     [b7 .. b0]                          8 bytes, i64 BE
//! VARCHAR  [len_hi len_lo][utf8 bytes ...]     2 + len bytes
//! ```

use tblload_result::{Error, Result};

/// A codec for a single logical field type.
///
/// `encode_at` writes into a caller-sized slice; callers check capacity with
/// [`Codec::encoded_len`] first. `decode` reports how many bytes it consumed so
/// fields can be walked back to back.
pub trait Codec {
    type Borrowed<'a>: Copy
    where
        Self: 'a;
    type Owned;

    fn encoded_len(v: Self::Borrowed<'_>) -> usize;

    fn encode_at(dst: &mut [u8], v: Self::Borrowed<'_>) -> Result<usize>;

    fn decode(src: &[u8]) -> Result<(Self::Owned, usize)>;
}

/// Marker for codecs whose encoding always has the same width.
pub trait FixedSizeCodec: Codec {
    const ENCODED_SIZE: usize;
}

/// Width of the VARCHAR length prefix.
pub const STR_LEN_PREFIX: usize = 2;

#[inline]
fn short_write(needed: usize, got: usize) -> Error {
    Error::Internal(format!(
        "codec destination too small: need {needed} bytes, have {got}"
    ))
}

#[inline]
fn short_read(what: &str, needed: usize, got: usize) -> Error {
    Error::Corrupt(format!(
        "truncated {what}: need {needed} bytes, have {got}"
    ))
}

/// Big-endian i32 codec (the INT column type).
pub struct BeI32;

impl Codec for BeI32 {
    type Borrowed<'a> = i32;
    type Owned = i32;

    #[inline]
    fn encoded_len(_: i32) -> usize {
        Self::ENCODED_SIZE
    }

    #[inline]
    fn encode_at(dst: &mut [u8], v: i32) -> Result<usize> {
        let have = dst.len();
        let out = dst
            .get_mut(..Self::ENCODED_SIZE)
            .ok_or_else(|| short_write(Self::ENCODED_SIZE, have))?;
        out.copy_from_slice(&v.to_be_bytes());
        Ok(Self::ENCODED_SIZE)
    }

    #[inline]
    fn decode(src: &[u8]) -> Result<(i32, usize)> {
        let bytes: [u8; 4] = src
            .get(..Self::ENCODED_SIZE)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| short_read("INT", Self::ENCODED_SIZE, src.len()))?;
        Ok((i32::from_be_bytes(bytes), Self::ENCODED_SIZE))
    }
}

impl FixedSizeCodec for BeI32 {
    const ENCODED_SIZE: usize = 4;
}

/// Big-endian i64 codec (the LONG column type).
pub struct BeI64;

impl Codec for BeI64 {
    type Borrowed<'a> = i64;
    type Owned = i64;

    #[inline]
    fn encoded_len(_: i64) -> usize {
        Self::ENCODED_SIZE
    }

    #[inline]
    fn encode_at(dst: &mut [u8], v: i64) -> Result<usize> {
        let have = dst.len();
        let out = dst
            .get_mut(..Self::ENCODED_SIZE)
            .ok_or_else(|| short_write(Self::ENCODED_SIZE, have))?;
        out.copy_from_slice(&v.to_be_bytes());
        Ok(Self::ENCODED_SIZE)
    }

    #[inline]
    fn decode(src: &[u8]) -> Result<(i64, usize)> {
        let bytes: [u8; 8] = src
            .get(..Self::ENCODED_SIZE)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| short_read("LONG", Self::ENCODED_SIZE, src.len()))?;
        Ok((i64::from_be_bytes(bytes), Self::ENCODED_SIZE))
    }
}

impl FixedSizeCodec for BeI64 {
    const ENCODED_SIZE: usize = 8;
}

/// Length-prefixed UTF-8 string codec (the VARCHAR column type).
pub struct LenPrefixedStr;

impl Codec for LenPrefixedStr {
    type Borrowed<'a> = &'a str;
    type Owned = String;

    #[inline]
    fn encoded_len(v: &str) -> usize {
        STR_LEN_PREFIX + v.len()
    }

    fn encode_at(dst: &mut [u8], v: &str) -> Result<usize> {
        let len = u16::try_from(v.len()).map_err(|_| {
            Error::InvalidArgumentError(format!(
                "string of {} bytes exceeds the VARCHAR length prefix",
                v.len()
            ))
        })?;
        let needed = Self::encoded_len(v);
        let have = dst.len();
        let out = dst
            .get_mut(..needed)
            .ok_or_else(|| short_write(needed, have))?;
        out[..STR_LEN_PREFIX].copy_from_slice(&len.to_be_bytes());
        out[STR_LEN_PREFIX..].copy_from_slice(v.as_bytes());
        Ok(needed)
    }

    fn decode(src: &[u8]) -> Result<(String, usize)> {
        let prefix: [u8; 2] = src
            .get(..STR_LEN_PREFIX)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| short_read("VARCHAR length", STR_LEN_PREFIX, src.len()))?;
        let len = u16::from_be_bytes(prefix) as usize;
        let end = STR_LEN_PREFIX + len;
        let body = src
            .get(STR_LEN_PREFIX..end)
            .ok_or_else(|| short_read("VARCHAR body", end, src.len()))?;
        let text = std::str::from_utf8(body)
            .map_err(|e| Error::Corrupt(format!("VARCHAR is not UTF-8: {e}")))?;
        Ok((text.to_string(), end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_i32_layout_and_order() {
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        BeI32::encode_at(&mut a, 12).unwrap();
        BeI32::encode_at(&mut b, 30_000).unwrap();

        assert_eq!(a, [0, 0, 0, 12]);
        assert_eq!(b, [0, 0, 0x75, 0x30]);
        // Non-negative values sort bytewise.
        assert!(a < b);

        assert_eq!(BeI32::decode(&a).unwrap(), (12, 4));
        assert_eq!(BeI32::decode(&b).unwrap(), (30_000, 4));
    }

    #[test]
    fn be_i64_extremes() {
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let mut buf = [0u8; 8];
            assert_eq!(BeI64::encode_at(&mut buf, v).unwrap(), 8);
            assert_eq!(BeI64::decode(&buf).unwrap(), (v, 8));
        }
    }

    #[test]
    fn str_prefix_and_empty() {
        let mut buf = [0u8; 16];
        let n = LenPrefixedStr::encode_at(&mut buf, "abc").unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf[..5], &[0, 3, b'a', b'b', b'c']);

        let n = LenPrefixedStr::encode_at(&mut buf, "").unwrap();
        assert_eq!(n, 2);
        assert_eq!(LenPrefixedStr::decode(&buf[..2]).unwrap(), (String::new(), 2));
    }

    #[test]
    fn short_destination_is_rejected() {
        let mut buf = [0u8; 3];
        match BeI32::encode_at(&mut buf, 1) {
            Err(Error::Internal(msg)) => assert!(msg.contains("need 4 bytes, have 3"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
        match BeI64::encode_at(&mut buf, 1) {
            Err(Error::Internal(msg)) => assert!(msg.contains("need 8 bytes, have 3"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
        match LenPrefixedStr::encode_at(&mut buf, "abcd") {
            Err(Error::Internal(msg)) => assert!(msg.contains("need 6 bytes, have 3"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(buf, [0u8; 3]);
    }

    #[test]
    fn truncated_source_is_corrupt() {
        assert!(matches!(BeI64::decode(&[0, 1, 2]), Err(Error::Corrupt(_))));
        // Prefix claims 10 bytes, only 2 follow.
        assert!(matches!(
            LenPrefixedStr::decode(&[0, 10, b'h', b'i']),
            Err(Error::Corrupt(_))
        ));
    }
}

//! Length-delimited framing.
//!
//! A delimited message is the encoded record prefixed with its length:
//!
//! ```text
//! +----------------+-------------------------+
//! | length (varint)| record bytes            |
//! +----------------+-------------------------+
//! ```
//!
//! This lets several messages share one continuous byte stream.

use crate::codec::{decode_from, encode_to, encoded_len};
use crate::descriptor::MessageSchema;
use crate::error::{CodecError, WireError};
use crate::value::Record;
use crate::verify::verify;
use crate::wire::{put_varint, varint_len, WireReader};
use crate::MAX_MESSAGE_SIZE;
use bytes::{Bytes, BytesMut};

/// Verifies a record and encodes it with a length prefix.
pub fn encode_delimited(record: &Record) -> Result<BytesMut, CodecError> {
    verify(record)?;
    let len = encoded_len(record);
    if len > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge {
            size: len as u64,
            max: MAX_MESSAGE_SIZE,
        }
        .into());
    }

    let mut buf = BytesMut::with_capacity(varint_len(len as u64) + len);
    put_varint(&mut buf, len as u64);
    encode_to(record, &mut buf)?;
    Ok(buf)
}

/// Decodes one length-prefixed record from the front of `buf`.
///
/// Returns the record and the number of bytes consumed, prefix included.
/// Bytes after the message are left alone.
pub fn decode_delimited(
    schema: &'static MessageSchema,
    buf: &[u8],
) -> Result<(Record, usize), CodecError> {
    let mut reader = WireReader::new(buf);
    check_size(peek_size(&reader)?, MAX_MESSAGE_SIZE)?;
    let payload = reader.read_nested()?;
    let record = decode_from(schema, payload)?;
    Ok((record, reader.position()))
}

/// Strips the length prefix from a buffer holding exactly one delimited message.
pub fn unframe(buf: &[u8]) -> Result<&[u8], WireError> {
    let mut reader = WireReader::new(buf);
    let payload = reader.read_length_delimited()?;
    if !reader.is_empty() {
        return Err(WireError::TrailingBytes {
            offset: reader.offset(),
            count: reader.remaining(),
        });
    }
    Ok(payload)
}

fn peek_size(reader: &WireReader<'_>) -> Result<u64, WireError> {
    reader.clone().read_varint()
}

fn check_size(size: u64, max: usize) -> Result<(), WireError> {
    if size > max as u64 {
        return Err(WireError::MessageTooLarge { size, max });
    }
    Ok(())
}

/// One complete delimited message cut from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedFrame {
    /// Length of the varint prefix.
    pub header_len: usize,
    /// Prefix and payload, as received.
    pub raw: Bytes,
}

impl DelimitedFrame {
    /// The message bytes without the prefix.
    pub fn payload(&self) -> Bytes {
        self.raw.slice(self.header_len..)
    }

    /// Decodes the payload as a record of `schema`.
    pub fn decode(&self, schema: &'static MessageSchema) -> Result<Record, CodecError> {
        decode_from(schema, WireReader::with_base(&self.raw[self.header_len..], self.header_len))
    }
}

/// Incremental decoder that cuts delimited messages out of a byte stream.
pub struct DelimitedDecoder {
    buffer: BytesMut,
    max_message_size: usize,
}

impl DelimitedDecoder {
    pub fn new() -> Self {
        Self::with_max_message_size(MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            max_message_size,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to cut the next complete message from the buffer.
    ///
    /// Returns `Ok(None)` until a whole message is buffered. An oversized
    /// length prefix fails as soon as the prefix itself is readable.
    pub fn decode_frame(&mut self) -> Result<Option<DelimitedFrame>, WireError> {
        let mut reader = WireReader::new(&self.buffer);
        let size = match reader.read_varint() {
            Ok(size) => size,
            Err(WireError::Truncated { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        check_size(size, self.max_message_size)?;

        let header_len = reader.position();
        let total = usize::try_from(size)
            .ok()
            .and_then(|size| header_len.checked_add(size))
            .ok_or(WireError::MessageTooLarge {
                size,
                max: self.max_message_size,
            })?;
        if self.buffer.len() < total {
            return Ok(None);
        }

        let raw = self.buffer.split_to(total).freeze();
        Ok(Some(DelimitedFrame { header_len, raw }))
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for DelimitedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{SAMPLE, STRICT};
    use crate::value::Value;

    fn sample(id: u64) -> Record {
        Record::new(&SAMPLE).with("id", id).unwrap()
    }

    #[test]
    fn test_delimited_roundtrip() {
        let record = sample(300).with("nick_name", "n").unwrap();
        let encoded = encode_delimited(&record).unwrap();
        let body = crate::codec::encode(&record).unwrap();
        assert_eq!(encoded[0] as usize, body.len());
        assert_eq!(&encoded[1..], &body[..]);

        let (decoded, consumed) = decode_delimited(&SAMPLE, &encoded).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn test_empty_record_is_single_zero_byte() {
        let encoded = encode_delimited(&Record::new(&SAMPLE)).unwrap();
        assert_eq!(&encoded[..], &[0x00]);
    }

    #[test]
    fn test_decode_delimited_leaves_rest() {
        let mut stream = encode_delimited(&sample(1)).unwrap();
        stream.extend_from_slice(&encode_delimited(&sample(2)).unwrap());

        let (first, used) = decode_delimited(&SAMPLE, &stream).unwrap();
        let (second, _) = decode_delimited(&SAMPLE, &stream[used..]).unwrap();
        assert_eq!(first.get_u64("id"), Some(1));
        assert_eq!(second.get_u64("id"), Some(2));
    }

    #[test]
    fn test_decode_delimited_short_buffer() {
        let encoded = encode_delimited(&sample(5)).unwrap();
        assert!(matches!(
            decode_delimited(&SAMPLE, &encoded[..encoded.len() - 1]),
            Err(CodecError::Malformed(WireError::InvalidLength { .. }))
        ));
    }

    #[test]
    fn test_decode_delimited_offsets_are_absolute() {
        // prefix 2, then id with a truncated varint value
        let buf = [0x02, 0x08, 0x80];
        assert_eq!(
            decode_delimited(&SAMPLE, &buf),
            Err(CodecError::Malformed(WireError::Truncated {
                offset: 2,
                needed: 1
            }))
        );
    }

    #[test]
    fn test_oversized_prefix_rejected() {
        let mut buf = Vec::new();
        put_varint(&mut buf, MAX_MESSAGE_SIZE as u64 + 1);
        assert!(matches!(
            decode_delimited(&SAMPLE, &buf),
            Err(CodecError::Malformed(WireError::MessageTooLarge { .. }))
        ));
    }

    #[test]
    fn test_encode_delimited_verifies() {
        assert!(matches!(
            encode_delimited(&Record::new(&STRICT)),
            Err(CodecError::Schema(_))
        ));
    }

    #[test]
    fn test_unframe() {
        let encoded = encode_delimited(&sample(9)).unwrap();
        assert_eq!(unframe(&encoded).unwrap(), &encoded[1..]);

        let mut padded = encoded.to_vec();
        padded.push(0x00);
        assert_eq!(
            unframe(&padded),
            Err(WireError::TrailingBytes {
                offset: encoded.len(),
                count: 1
            })
        );

        assert!(matches!(
            unframe(&encoded[..encoded.len() - 1]),
            Err(WireError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_decoder_partial_frames() {
        let encoded = encode_delimited(&sample(12345)).unwrap();
        let mut decoder = DelimitedDecoder::new();

        decoder.extend(&encoded[..2]);
        assert!(decoder.decode_frame().unwrap().is_none());
        assert_eq!(decoder.buffered(), 2);

        decoder.extend(&encoded[2..]);
        let frame = decoder.decode_frame().unwrap().unwrap();
        assert_eq!(frame.header_len, 1);
        assert_eq!(&frame.raw[..], &encoded[..]);
        assert_eq!(frame.decode(&SAMPLE).unwrap().get_u64("id"), Some(12345));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_multiple_frames_in_buffer() {
        let mut decoder = DelimitedDecoder::default();
        for id in 1..=3u64 {
            decoder.extend(&encode_delimited(&sample(id)).unwrap());
        }
        let ids: Vec<_> = std::iter::from_fn(|| decoder.decode_frame().unwrap())
            .map(|frame| frame.decode(&SAMPLE).unwrap().get_u64("id").unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_decoder_empty_message() {
        let mut decoder = DelimitedDecoder::new();
        decoder.extend(&[0x00]);
        let frame = decoder.decode_frame().unwrap().unwrap();
        assert!(frame.payload().is_empty());
        assert!(frame.decode(&SAMPLE).unwrap().is_empty());
    }

    #[test]
    fn test_decoder_size_limit() {
        let record = sample(1).with("blobs", Value::list([vec![0u8; 64]])).unwrap();
        let encoded = encode_delimited(&record).unwrap();

        let mut decoder = DelimitedDecoder::with_max_message_size(16);
        // The prefix alone is enough to reject.
        decoder.extend(&encoded[..1]);
        assert!(matches!(
            decoder.decode_frame(),
            Err(WireError::MessageTooLarge { max: 16, .. })
        ));

        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_malformed_prefix() {
        let mut decoder = DelimitedDecoder::new();
        decoder.extend(&[0xff; 11]);
        assert!(matches!(
            decoder.decode_frame(),
            Err(WireError::MalformedVarint { offset: 0 })
        ));
    }

    #[test]
    fn test_decoder_unbounded_limit_rejects_huge_prefix() {
        let mut decoder = DelimitedDecoder::with_max_message_size(usize::MAX);
        let mut prefix = Vec::new();
        put_varint(&mut prefix, u64::MAX);
        decoder.extend(&prefix);
        decoder.extend(b"abc");

        assert!(matches!(
            decoder.decode_frame(),
            Err(WireError::MessageTooLarge { size: u64::MAX, .. })
        ));
    }
}

//! Binary wire codec: the protobuf subset spoken on every endpoint
//!
//! Tags are `(field_number << 3) | wire_type` and only two wire types exist
//! on this protocol: varint (0) and length-delimited (2). Anything else is a
//! malformed frame. Varints are unsigned only; signed callers pre-bias via
//! [`put_int32_field`] and reinterpret with [`to_signed_i32`].

use crate::core::error::{CodecError, CodecResult};

/// Varint decode aborts once the shift reaches 70 bits (10 encoded bytes).
const MAX_VARINT_SHIFT: u32 = 70;

const WIRE_TYPE_VARINT: u64 = 0;
const WIRE_TYPE_LEN: u64 = 2;

/// Append a base-128 varint with little-endian continuation bytes.
pub fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Encode a single varint into a fresh buffer.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    put_varint(&mut buf, value);
    buf
}

/// Decode a varint starting at `offset`, returning the value and the number
/// of bytes consumed.
pub fn decode_varint(buf: &[u8], offset: usize) -> CodecResult<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut pos = offset;

    loop {
        if shift >= MAX_VARINT_SHIFT {
            return Err(CodecError::VarintOverflow);
        }
        let byte = *buf.get(pos).ok_or(CodecError::TruncatedVarint)?;
        value |= u64::from(byte & 0x7f) << shift;
        pos += 1;
        if byte & 0x80 == 0 {
            return Ok((value, pos - offset));
        }
        shift += 7;
    }
}

/// Append a varint field with the given field number.
pub fn put_varint_field(buf: &mut Vec<u8>, field: u32, value: u64) {
    put_varint(buf, (u64::from(field) << 3) | WIRE_TYPE_VARINT);
    put_varint(buf, value);
}

/// Append an `i32` as a varint of its two's-complement low 32 bits.
///
/// This is how the device encodes RSSI: the unsigned varint of a negative
/// int32 bit pattern.
pub fn put_int32_field(buf: &mut Vec<u8>, field: u32, value: i32) {
    put_varint_field(buf, field, u64::from(value as u32));
}

/// Append a length-delimited field.
pub fn put_bytes_field(buf: &mut Vec<u8>, field: u32, data: &[u8]) {
    put_varint(buf, (u64::from(field) << 3) | WIRE_TYPE_LEN);
    put_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Append an encoded inner message; framing is identical to bytes.
pub fn put_message_field(buf: &mut Vec<u8>, field: u32, inner: &[u8]) {
    put_bytes_field(buf, field, inner);
}

/// Reinterpret the low 32 bits of a decoded varint as two's-complement.
pub fn to_signed_i32(value: u64) -> i32 {
    value as u32 as i32
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Varint(u64),
    Bytes(Vec<u8>),
}

/// An ordered list of decoded `(field_number, value)` pairs.
///
/// Repeated field numbers accumulate in encounter order; accessors return
/// the first match by index and `None` on absence, so presence validation is
/// the caller's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    fields: Vec<(u32, Value)>,
}

impl RawMessage {
    /// Decode a complete message from `buf`, failing fast on any
    /// structurally invalid input.
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        let mut fields = Vec::new();
        let mut pos = 0;

        while pos < buf.len() {
            let (tag, consumed) = decode_varint(buf, pos)?;
            pos += consumed;
            let field = (tag >> 3) as u32;

            match tag & 0x7 {
                WIRE_TYPE_VARINT => {
                    let (value, consumed) = decode_varint(buf, pos)?;
                    pos += consumed;
                    fields.push((field, Value::Varint(value)));
                }
                WIRE_TYPE_LEN => {
                    let (declared, consumed) = decode_varint(buf, pos)?;
                    pos += consumed;
                    let remaining = buf.len() - pos;
                    if declared > remaining as u64 {
                        return Err(CodecError::TruncatedField {
                            declared,
                            remaining,
                        });
                    }
                    let len = declared as usize;
                    fields.push((field, Value::Bytes(buf[pos..pos + len].to_vec())));
                    pos += len;
                }
                other => return Err(CodecError::UnsupportedWireType(other as u8)),
            }
        }

        Ok(Self { fields })
    }

    /// First varint occurrence of `field`.
    pub fn varint_field(&self, field: u32) -> Option<u64> {
        self.varint_field_at(field, 0)
    }

    /// `index`-th varint occurrence of `field`.
    pub fn varint_field_at(&self, field: u32, index: usize) -> Option<u64> {
        self.fields
            .iter()
            .filter_map(|(f, v)| match v {
                Value::Varint(value) if *f == field => Some(*value),
                _ => None,
            })
            .nth(index)
    }

    /// First length-delimited occurrence of `field`.
    pub fn bytes_field(&self, field: u32) -> Option<&[u8]> {
        self.bytes_field_at(field, 0)
    }

    /// `index`-th length-delimited occurrence of `field`.
    pub fn bytes_field_at(&self, field: u32, index: usize) -> Option<&[u8]> {
        self.bytes_fields(field).nth(index)
    }

    /// All length-delimited occurrences of `field` in encounter order.
    pub fn bytes_fields(&self, field: u32) -> impl Iterator<Item = &[u8]> + '_ {
        self.fields.iter().filter_map(move |(f, v)| match v {
            Value::Bytes(data) if *f == field => Some(data.as_slice()),
            _ => None,
        })
    }
}

// Minimal BER codec for SNMP v1/v2c GetRequest / Response messages.
// Only the types a counter GET can produce are understood; anything else decodes as VarValue::Other.

use bytes::{BufMut, Bytes, BytesMut};

use crate::models::Oid;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_NULL: u8 = 0x05;
const TAG_OBJECT_ID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_COUNTER32: u8 = 0x41;
const TAG_GAUGE32: u8 = 0x42;
const TAG_TIMETICKS: u8 = 0x43;
const TAG_COUNTER64: u8 = 0x46;
const TAG_NO_SUCH_OBJECT: u8 = 0x80;
const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
const TAG_END_OF_MIB_VIEW: u8 = 0x82;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BerError {
    #[error("message truncated")]
    Truncated,
    #[error("unsupported length encoding")]
    InvalidLength,
    #[error("expected tag 0x{expected:02x}, found 0x{found:02x}")]
    UnexpectedTag { expected: u8, found: u8 },
    #[error("unknown PDU tag 0x{0:02x}")]
    UnknownPdu(u8),
    #[error("integer does not fit in 64 bits")]
    IntegerOverflow,
    #[error("invalid object identifier: {0}")]
    InvalidOid(String),
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduKind {
    GetRequest,
    Response,
}

impl PduKind {
    fn tag(self) -> u8 {
        match self {
            PduKind::GetRequest => 0xA0,
            PduKind::Response => 0xA2,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, BerError> {
        match tag {
            0xA0 => Ok(PduKind::GetRequest),
            0xA2 => Ok(PduKind::Response),
            other => Err(BerError::UnknownPdu(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarValue {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectId(Oid),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    Other(u8, Vec<u8>),
}

impl VarValue {
    /// Unsigned counter value, if this is a numeric type a counter can be read from.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            VarValue::Counter32(v) | VarValue::Gauge32(v) | VarValue::TimeTicks(v) => {
                Some(*v as u64)
            }
            VarValue::Counter64(v) => Some(*v),
            VarValue::Integer(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// True for the v2c exception values that mean "no such counter".
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            VarValue::NoSuchObject | VarValue::NoSuchInstance | VarValue::EndOfMibView
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: VarValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub kind: PduKind,
    pub request_id: i32,
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<VarBind>,
}

/// Community-based SNMP message (v1 = 0, v2c = 1 on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: i64,
    pub community: Vec<u8>,
    pub pdu: Pdu,
}

impl Message {
    pub fn get_request(version: i64, community: &str, request_id: i32, oid: Oid) -> Self {
        Self {
            version,
            community: community.as_bytes().to_vec(),
            pdu: Pdu {
                kind: PduKind::GetRequest,
                request_id,
                error_status: 0,
                error_index: 0,
                varbinds: vec![VarBind {
                    oid,
                    value: VarValue::Null,
                }],
            },
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut varbinds = BytesMut::new();
        for vb in &self.pdu.varbinds {
            let mut body = BytesMut::new();
            put_tlv(&mut body, TAG_OBJECT_ID, &encode_oid(&vb.oid));
            put_value(&mut body, &vb.value);
            put_tlv(&mut varbinds, TAG_SEQUENCE, &body);
        }

        let mut pdu = BytesMut::new();
        put_tlv(&mut pdu, TAG_INTEGER, &encode_integer(self.pdu.request_id as i64));
        put_tlv(&mut pdu, TAG_INTEGER, &encode_integer(self.pdu.error_status));
        put_tlv(&mut pdu, TAG_INTEGER, &encode_integer(self.pdu.error_index));
        put_tlv(&mut pdu, TAG_SEQUENCE, &varbinds);

        let mut msg = BytesMut::new();
        put_tlv(&mut msg, TAG_INTEGER, &encode_integer(self.version));
        put_tlv(&mut msg, TAG_OCTET_STRING, &self.community);
        put_tlv(&mut msg, self.pdu.kind.tag(), &pdu);

        let mut out = BytesMut::with_capacity(msg.len() + 4);
        put_tlv(&mut out, TAG_SEQUENCE, &msg);
        out.freeze()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, BerError> {
        let mut outer = Reader::new(buf);
        let mut msg = Reader::new(outer.expect(TAG_SEQUENCE)?);
        if !outer.is_empty() {
            return Err(BerError::TrailingBytes(outer.remaining()));
        }

        let version = decode_integer(msg.expect(TAG_INTEGER)?)?;
        let community = msg.expect(TAG_OCTET_STRING)?.to_vec();
        let (pdu_tag, pdu_body) = msg.read_tlv()?;
        let kind = PduKind::from_tag(pdu_tag)?;

        let mut pdu = Reader::new(pdu_body);
        let request_id = decode_integer(pdu.expect(TAG_INTEGER)?)?;
        let request_id = i32::try_from(request_id).map_err(|_| BerError::IntegerOverflow)?;
        let error_status = decode_integer(pdu.expect(TAG_INTEGER)?)?;
        let error_index = decode_integer(pdu.expect(TAG_INTEGER)?)?;

        let mut list = Reader::new(pdu.expect(TAG_SEQUENCE)?);
        let mut varbinds = Vec::new();
        while !list.is_empty() {
            let mut vb = Reader::new(list.expect(TAG_SEQUENCE)?);
            let oid = decode_oid(vb.expect(TAG_OBJECT_ID)?)?;
            let (tag, body) = vb.read_tlv()?;
            varbinds.push(VarBind {
                oid,
                value: decode_value(tag, body)?,
            });
        }

        Ok(Message {
            version,
            community,
            pdu: Pdu {
                kind,
                request_id,
                error_status,
                error_index,
                varbinds,
            },
        })
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn byte(&mut self) -> Result<u8, BerError> {
        let b = *self.buf.get(self.pos).ok_or(BerError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), BerError> {
        let tag = self.byte()?;
        let first = self.byte()?;
        let len = if first & 0x80 == 0 {
            first as usize
        } else {
            let n = (first & 0x7f) as usize;
            // 0x80 is the indefinite form, never valid in SNMP.
            if n == 0 || n > 4 {
                return Err(BerError::InvalidLength);
            }
            let mut len = 0usize;
            for _ in 0..n {
                len = (len << 8) | self.byte()? as usize;
            }
            len
        };
        let end = self.pos.checked_add(len).ok_or(BerError::InvalidLength)?;
        let body = self.buf.get(self.pos..end).ok_or(BerError::Truncated)?;
        self.pos = end;
        Ok((tag, body))
    }

    fn expect(&mut self, expected: u8) -> Result<&'a [u8], BerError> {
        let (found, body) = self.read_tlv()?;
        if found != expected {
            return Err(BerError::UnexpectedTag { expected, found });
        }
        Ok(body)
    }
}

fn put_length(buf: &mut BytesMut, len: usize) {
    if len < 0x80 {
        buf.put_u8(len as u8);
        return;
    }
    let bytes = (len as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    buf.put_u8(0x80 | (bytes.len() - skip) as u8);
    buf.put_slice(&bytes[skip..]);
}

fn put_tlv(buf: &mut BytesMut, tag: u8, body: &[u8]) {
    buf.put_u8(tag);
    put_length(buf, body.len());
    buf.put_slice(body);
}

fn put_value(buf: &mut BytesMut, value: &VarValue) {
    match value {
        VarValue::Integer(v) => put_tlv(buf, TAG_INTEGER, &encode_integer(*v)),
        VarValue::OctetString(s) => put_tlv(buf, TAG_OCTET_STRING, s),
        VarValue::Null => put_tlv(buf, TAG_NULL, &[]),
        VarValue::ObjectId(oid) => put_tlv(buf, TAG_OBJECT_ID, &encode_oid(oid)),
        VarValue::Counter32(v) => put_tlv(buf, TAG_COUNTER32, &encode_unsigned(*v as u64)),
        VarValue::Gauge32(v) => put_tlv(buf, TAG_GAUGE32, &encode_unsigned(*v as u64)),
        VarValue::TimeTicks(v) => put_tlv(buf, TAG_TIMETICKS, &encode_unsigned(*v as u64)),
        VarValue::Counter64(v) => put_tlv(buf, TAG_COUNTER64, &encode_unsigned(*v)),
        VarValue::NoSuchObject => put_tlv(buf, TAG_NO_SUCH_OBJECT, &[]),
        VarValue::NoSuchInstance => put_tlv(buf, TAG_NO_SUCH_INSTANCE, &[]),
        VarValue::EndOfMibView => put_tlv(buf, TAG_END_OF_MIB_VIEW, &[]),
        VarValue::Other(tag, body) => put_tlv(buf, *tag, body),
    }
}

fn decode_value(tag: u8, body: &[u8]) -> Result<VarValue, BerError> {
    let value = match tag {
        TAG_INTEGER => VarValue::Integer(decode_integer(body)?),
        TAG_OCTET_STRING => VarValue::OctetString(body.to_vec()),
        TAG_NULL => VarValue::Null,
        TAG_OBJECT_ID => VarValue::ObjectId(decode_oid(body)?),
        TAG_COUNTER32 => VarValue::Counter32(decode_u32(body)?),
        TAG_GAUGE32 => VarValue::Gauge32(decode_u32(body)?),
        TAG_TIMETICKS => VarValue::TimeTicks(decode_u32(body)?),
        TAG_COUNTER64 => VarValue::Counter64(decode_unsigned(body)?),
        TAG_NO_SUCH_OBJECT => VarValue::NoSuchObject,
        TAG_NO_SUCH_INSTANCE => VarValue::NoSuchInstance,
        TAG_END_OF_MIB_VIEW => VarValue::EndOfMibView,
        other => VarValue::Other(other, body.to_vec()),
    };
    Ok(value)
}

fn encode_integer(v: i64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn encode_unsigned(v: u64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
    let mut out = Vec::with_capacity(9);
    if bytes[skip] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[skip..]);
    out
}

fn decode_integer(body: &[u8]) -> Result<i64, BerError> {
    if body.is_empty() {
        return Err(BerError::Truncated);
    }
    if body.len() > 8 {
        return Err(BerError::IntegerOverflow);
    }
    let mut v: i64 = if body[0] & 0x80 != 0 { -1 } else { 0 };
    for b in body {
        v = (v << 8) | *b as i64;
    }
    Ok(v)
}

/// Application counters are unsigned; some agents skip the leading zero byte, so the sign bit is ignored.
fn decode_unsigned(body: &[u8]) -> Result<u64, BerError> {
    if body.is_empty() {
        return Err(BerError::Truncated);
    }
    let significant = match body {
        [0, rest @ ..] if !rest.is_empty() => rest,
        _ => body,
    };
    if significant.len() > 8 {
        return Err(BerError::IntegerOverflow);
    }
    Ok(significant
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

fn decode_u32(body: &[u8]) -> Result<u32, BerError> {
    u32::try_from(decode_unsigned(body)?).map_err(|_| BerError::IntegerOverflow)
}

fn put_base128(out: &mut Vec<u8>, mut v: u64) {
    let mut tmp = [0u8; 10];
    let mut i = tmp.len();
    loop {
        i -= 1;
        tmp[i] = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    let last = tmp.len() - 1;
    for (idx, b) in tmp.iter().enumerate().skip(i) {
        out.push(if idx == last { *b } else { *b | 0x80 });
    }
}

fn encode_oid(oid: &Oid) -> Vec<u8> {
    let arcs = oid.arcs();
    let mut out = Vec::with_capacity(arcs.len() + 2);
    put_base128(&mut out, arcs[0] as u64 * 40 + arcs[1] as u64);
    for arc in &arcs[2..] {
        put_base128(&mut out, *arc as u64);
    }
    out
}

fn decode_oid(body: &[u8]) -> Result<Oid, BerError> {
    let mut subids = Vec::new();
    let mut acc: u64 = 0;
    let mut pending = false;
    for b in body {
        acc = (acc << 7) | (*b & 0x7f) as u64;
        if acc > u32::MAX as u64 * 40 + 80 {
            return Err(BerError::InvalidOid("sub-identifier too large".into()));
        }
        pending = *b & 0x80 != 0;
        if !pending {
            subids.push(acc);
            acc = 0;
        }
    }
    if pending || subids.is_empty() {
        return Err(BerError::InvalidOid("truncated sub-identifier".into()));
    }

    let first = subids[0];
    let (a, b) = match first {
        0..40 => (0, first),
        40..80 => (1, first - 40),
        _ => (2, first - 80),
    };
    let mut arcs = Vec::with_capacity(subids.len() + 1);
    arcs.push(a as u32);
    arcs.push(u32::try_from(b).map_err(|_| BerError::InvalidOid("arc out of range".into()))?);
    for s in &subids[1..] {
        arcs.push(u32::try_from(*s).map_err(|_| BerError::InvalidOid("arc out of range".into()))?);
    }
    Oid::new(arcs).map_err(BerError::InvalidOid)
}

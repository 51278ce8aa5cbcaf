//! Canonical object codec
//!
//! Every persistent object kind has exactly one canonical byte encoding, and
//! its content address is the digest of those bytes. Determinism rules:
//!
//! - tree entries are emitted in ascending name order (enforced by [`Tree`](crate::objects::tree::Tree));
//! - timestamps are epoch-millisecond integers;
//! - variable-length fields carry explicit length prefixes, so absence
//!   (zero-length hash, empty tag) is encoded, never implied;
//! - all integers are little-endian.
//!
//! The object kind itself travels out-of-band: `decode` is told which kind the
//! bytes claim to be, and fails with `MalformedObject` when they do not
//! conform.

use crate::error::{EngineError, Result};
use crate::objects::hash::{Hash, HashKind, Hasher};
use crate::objects::kind::ObjectKind;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::Read;

/// Serialize an object into its canonical bytes
pub trait EncodeObject {
    fn kind(&self) -> ObjectKind;

    fn encode(&self) -> Result<Bytes>;

    /// Content address: pure function of the canonical encoding
    fn hash_of(&self, hash_kind: HashKind) -> Result<Hash> {
        let bytes = self.encode()?;
        let mut hasher = Hasher::new(hash_kind);
        hasher.update(&bytes);
        Ok(hasher.finalize())
    }
}

/// Deserialize an object from canonical bytes
pub trait DecodeObject: Sized {
    fn decode(bytes: &[u8]) -> Result<Self>;
}

// Field-level primitives shared by the per-kind codecs. Writers are
// infallible over Vec but kept fallible to match the reader shapes.

pub(crate) fn write_str(out: &mut Vec<u8>, value: &str) -> Result<()> {
    out.write_u32::<LittleEndian>(value.len() as u32)
        .map_err(anyhow::Error::from)?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

pub(crate) fn read_str(reader: &mut impl Read, kind: ObjectKind) -> Result<String> {
    let len = reader
        .read_u32::<LittleEndian>()
        .map_err(|_| EngineError::malformed(kind, "truncated string length"))?;
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .map_err(|_| EngineError::malformed(kind, "truncated string"))?;
    String::from_utf8(buf).map_err(|_| EngineError::malformed(kind, "string is not utf-8"))
}

pub(crate) fn write_hash(out: &mut Vec<u8>, hash: &Hash) -> Result<()> {
    out.write_u8(hash.len() as u8).map_err(anyhow::Error::from)?;
    out.extend_from_slice(hash.as_bytes());
    Ok(())
}

pub(crate) fn read_hash(reader: &mut impl Read, kind: ObjectKind) -> Result<Hash> {
    let len = reader
        .read_u8()
        .map_err(|_| EngineError::malformed(kind, "truncated hash length"))?;
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .map_err(|_| EngineError::malformed(kind, "truncated hash"))?;
    Ok(Hash::new(buf))
}

pub(crate) fn write_millis(out: &mut Vec<u8>, when: &DateTime<Utc>) -> Result<()> {
    out.write_i64::<LittleEndian>(when.timestamp_millis())
        .map_err(anyhow::Error::from)?;
    Ok(())
}

pub(crate) fn read_millis(reader: &mut impl Read, kind: ObjectKind) -> Result<DateTime<Utc>> {
    let millis = reader
        .read_i64::<LittleEndian>()
        .map_err(|_| EngineError::malformed(kind, "truncated timestamp"))?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| EngineError::malformed(kind, format!("timestamp {millis} out of range")))
}

/// Reject bytes left over after a decode; every encoding is exact
pub(crate) fn expect_end(reader: &mut impl Read, kind: ObjectKind) -> Result<()> {
    let mut probe = [0u8; 1];
    match reader.read(&mut probe) {
        Ok(0) => Ok(()),
        Ok(_) => Err(EngineError::malformed(kind, "trailing bytes")),
        Err(_) => Err(EngineError::malformed(kind, "unreadable trailing bytes")),
    }
}

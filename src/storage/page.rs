use super::{Candidate, Version};
use crate::options::CompressionType;
use crate::util::crc32;
use crate::util::varint::{drain_prefixed_slice, drain_uvarint, put_prefixed_slice, put_uvarint};
use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use snap::raw::max_compress_len;
use std::convert::TryInto;

/// 1-byte compression type + 32-bit masked crc
pub const IMAGE_TRAILER_SIZE: usize = 5;

const VERSION_TOMBSTONE: u8 = 0;
const VERSION_PUT: u8 = 1;

pub enum PageState {
    Resident(Vec<Candidate>),
    /// A checksummed, possibly compressed image of the entries.
    Evicted(Bytes),
}

/// A run of adjacent entries. `first` is the smallest key the page may hold
/// and stays valid while the page is evicted.
pub struct Page {
    pub first: Bytes,
    pub state: PageState,
}

impl Page {
    pub fn new(first: Bytes, entries: Vec<Candidate>) -> Self {
        Self {
            first,
            state: PageState::Resident(entries),
        }
    }

    #[inline]
    pub fn is_resident(&self) -> bool {
        matches!(self.state, PageState::Resident(_))
    }

    pub fn entries(&self) -> Option<&[Candidate]> {
        match &self.state {
            PageState::Resident(entries) => Some(entries),
            PageState::Evicted(_) => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut Vec<Candidate>> {
        match &mut self.state {
            PageState::Resident(entries) => Some(entries),
            PageState::Evicted(_) => None,
        }
    }

    /// Replaces the in-memory entries with an image. Returns false if the
    /// page was already evicted.
    pub fn evict(&mut self, compression: CompressionType) -> Result<bool> {
        let image = match &self.state {
            PageState::Resident(entries) => encode_image(entries, compression)?,
            PageState::Evicted(_) => return Ok(false),
        };
        self.state = PageState::Evicted(image);
        Ok(true)
    }

    /// Rebuilds the entries from the image. Returns false if the page was
    /// resident. On error the page stays evicted.
    pub fn reload(&mut self, verify_checksums: bool) -> Result<bool> {
        let entries = match &self.state {
            PageState::Evicted(image) => decode_image(image, verify_checksums)?,
            PageState::Resident(_) => return Ok(false),
        };
        self.state = PageState::Resident(entries);
        Ok(true)
    }
}

fn encode_image(entries: &[Candidate], compression: CompressionType) -> Result<Bytes> {
    let mut raw = BytesMut::new();
    put_uvarint(&mut raw, entries.len() as u64);
    for entry in entries {
        put_prefixed_slice(&mut raw, &entry.key);
        put_uvarint(&mut raw, entry.versions.len() as u64);
        for v in &entry.versions {
            put_uvarint(&mut raw, v.txn_id);
            match &v.value {
                Some(value) => {
                    raw.put_u8(VERSION_PUT);
                    put_prefixed_slice(&mut raw, value);
                }
                None => raw.put_u8(VERSION_TOMBSTONE),
            }
        }
    }

    let mut image = match compression {
        CompressionType::SnappyCompression => {
            let mut enc = snap::raw::Encoder::new();
            let mut buffer = vec![0; max_compress_len(raw.len())];
            let size = enc.compress(&raw, buffer.as_mut_slice())?;
            buffer.truncate(size);
            buffer
        }
        CompressionType::NoCompression => raw.to_vec(),
    };
    let tag = compression as u8;
    let crc = crc32::masked_checksum(&image, tag);
    image.push(tag);
    image.extend_from_slice(&crc.to_le_bytes());
    Ok(Bytes::from(image))
}

fn decode_image(image: &[u8], verify_checksums: bool) -> Result<Vec<Candidate>> {
    if image.len() < IMAGE_TRAILER_SIZE {
        return Err(Error::Corruption("page image too short".to_owned()));
    }
    let n = image.len() - IMAGE_TRAILER_SIZE;
    let (data, trailer) = image.split_at(n);
    let tag = trailer[0];
    if verify_checksums {
        let stored = trailer[1..]
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| Error::Corruption("page image trailer".to_owned()))?;
        if !crc32::verify(data, tag, stored) {
            return Err(Error::Corruption("page image checksum mismatch".to_owned()));
        }
    }
    let raw = match CompressionType::from_tag(tag) {
        Some(CompressionType::NoCompression) => data.to_vec(),
        Some(CompressionType::SnappyCompression) => {
            let len = snap::raw::decompress_len(data)?;
            let mut decompressed = vec![0u8; len];
            let mut dec = snap::raw::Decoder::new();
            dec.decompress(data, decompressed.as_mut_slice())?;
            decompressed
        }
        None => return Err(Error::Corruption("bad page compression type".to_owned())),
    };
    parse_entries(&raw).ok_or_else(|| Error::Corruption("malformed page image".to_owned()))
}

fn parse_entries(mut src: &[u8]) -> Option<Vec<Candidate>> {
    let count = drain_uvarint(&mut src)? as usize;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let key = Bytes::copy_from_slice(drain_prefixed_slice(&mut src)?);
        let n = drain_uvarint(&mut src)? as usize;
        let mut versions = Vec::with_capacity(n);
        for _ in 0..n {
            let txn_id = drain_uvarint(&mut src)?;
            let (&flag, rest) = src.split_first()?;
            src = rest;
            versions.push(match flag {
                VERSION_PUT => {
                    Version::put(txn_id, Bytes::copy_from_slice(drain_prefixed_slice(&mut src)?))
                }
                VERSION_TOMBSTONE => Version::tombstone(txn_id),
                _ => return None,
            });
        }
        entries.push(Candidate { key, versions });
    }
    if src.is_empty() {
        Some(entries)
    } else {
        None
    }
}

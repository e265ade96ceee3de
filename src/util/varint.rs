use bytes::BufMut;

pub const MAX_VARINT_LEN_U64: usize = 10;

/// Encodes `n` as a little endian base-128 varint into `dst` and returns the
/// number of bytes written.
/// See Varint in https://developers.google.com/protocol-buffers/docs/encoding#varints
pub fn put_uvarint<B: BufMut>(dst: &mut B, mut n: u64) -> usize {
    let mut i = 0;
    while n >= 0b1000_0000 {
        dst.put_u8((n as u8) | 0b1000_0000);
        n >>= 7;
        i += 1;
    }
    dst.put_u8(n as u8);
    i + 1
}

/// Decodes a varint from the front of `src` and returns the value and the
/// number of bytes read. Returns `None` on truncated input or overflow.
pub fn read_uvarint(src: &[u8]) -> Option<(u64, usize)> {
    let mut n: u64 = 0;
    let mut shift: u32 = 0;
    for (i, &b) in src.iter().take(MAX_VARINT_LEN_U64).enumerate() {
        let low = u64::from(b & 0b0111_1111);
        if shift == 63 && low > 1 {
            return None;
        }
        n |= low << shift;
        if b < 0b1000_0000 {
            return Some((n, i + 1));
        }
        shift += 7;
    }
    None
}

/// Decodes a varint and advances `src` past it.
pub fn drain_uvarint(src: &mut &[u8]) -> Option<u64> {
    let (v, n) = read_uvarint(src)?;
    let rest: &[u8] = *src;
    *src = &rest[n..];
    Some(v)
}

/// Decodes a varint length prefixed slice and advances `src` past it.
pub fn drain_prefixed_slice<'a>(src: &mut &'a [u8]) -> Option<&'a [u8]> {
    let len = drain_uvarint(src)? as usize;
    let rest: &'a [u8] = *src;
    if len > rest.len() {
        return None;
    }
    let (head, tail) = rest.split_at(len);
    *src = tail;
    Some(head)
}

/// Appends `data` prefixed with its varint encoded length.
pub fn put_prefixed_slice<B: BufMut>(dst: &mut B, data: &[u8]) {
    put_uvarint(dst, data.len() as u64);
    dst.put_slice(data);
}

use crc32fast::Hasher;

const MASK_DELTA: u32 = 0xa282_ead8;

/// Returns the masked crc of `data` followed by the one byte `tag`.
///
/// Page images carry their compression tag inside the checksum so a flipped
/// tag is caught the same way as a flipped payload byte.
pub fn masked_checksum(data: &[u8], tag: u8) -> u32 {
    let mut h = Hasher::new();
    h.update(data);
    h.update(&[tag]);
    mask(h.finalize())
}

/// Checks `stored` (as written by `masked_checksum`) against `data` and `tag`.
pub fn verify(data: &[u8], tag: u8, stored: u32) -> bool {
    let mut h = Hasher::new();
    h.update(data);
    h.update(&[tag]);
    h.finalize() == unmask(stored)
}

/// Return a masked representation of crc.
///
/// It is problematic to compute the CRC of a string that contains embedded
/// CRCs, so stored CRCs are masked.
pub fn mask(crc: u32) -> u32 {
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Return the crc whose masked representation is `masked`.
pub fn unmask(masked: u32) -> u32 {
    let rot = masked.wrapping_sub(MASK_DELTA);
    (rot >> 17) | (rot << 15)
}

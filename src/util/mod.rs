pub mod collections;
pub mod comparator;
pub mod crc32;
pub mod varint;

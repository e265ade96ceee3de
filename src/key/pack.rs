use super::{FieldType, Key};
use crate::util::varint::{drain_prefixed_slice, drain_uvarint, put_prefixed_slice, put_uvarint};
use bytes::BufMut;
use std::convert::TryInto;

const INT_LEN: usize = std::mem::size_of::<i64>();

/// A single decoded field of a packed key, borrowing from the packed bytes.
///
/// Two fields of the same `FieldType` always decode to the same variant, so
/// the derived ordering is the per-type ordering: bytewise for strings, raw
/// and fixed-width records, numeric for integers and record numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field<'a> {
    Bytes(&'a [u8]),
    Int(i64),
    Recno(u64),
}

/// Reads fields one by one from a packed key.
pub struct FieldReader<'a> {
    src: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self { src }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Decodes the next field as `ty`. Returns `None` once the input is
    /// exhausted or when the remaining bytes are not a valid `ty` field.
    pub fn read(&mut self, ty: FieldType) -> Option<Field<'a>> {
        if self.src.is_empty() {
            return None;
        }
        match ty {
            FieldType::Str | FieldType::Raw => {
                drain_prefixed_slice(&mut self.src).map(Field::Bytes)
            }
            FieldType::Recno => drain_uvarint(&mut self.src).map(Field::Recno),
            FieldType::Int => {
                if self.src.len() < INT_LEN {
                    return None;
                }
                let (head, tail) = self.src.split_at(INT_LEN);
                self.src = tail;
                head.try_into().ok().map(|b| Field::Int(i64::from_be_bytes(b)))
            }
            FieldType::Fixed(width) => {
                if self.src.len() < width {
                    return None;
                }
                let (head, tail) = self.src.split_at(width);
                self.src = tail;
                Some(Field::Bytes(head))
            }
        }
    }
}

/// Appends one scalar key field. The caller has already checked `key`
/// against the field type, so tuples never reach here.
pub fn put_field<B: BufMut>(dst: &mut B, key: &Key) {
    match key {
        Key::Str(s) => put_prefixed_slice(dst, s.as_bytes()),
        Key::Raw(b) => put_prefixed_slice(dst, b),
        Key::Int(i) => dst.put_i64(*i),
        Key::Recno(r) => {
            put_uvarint(dst, *r);
        }
        Key::Fixed(b) => dst.put_slice(b),
        Key::Tuple(fields) => {
            for f in fields {
                put_field(dst, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_each_field_type() {
        let mut buf = vec![];
        put_field(&mut buf, &Key::Int(-7));
        put_field(&mut buf, &Key::Str("abc".to_owned()));
        put_field(&mut buf, &Key::Recno(300));
        put_field(&mut buf, &Key::Fixed(b"xy".to_vec()));
        put_field(&mut buf, &Key::Raw(vec![0, 255]));

        let mut r = FieldReader::new(&buf);
        assert_eq!(Some(Field::Int(-7)), r.read(FieldType::Int));
        assert_eq!(Some(Field::Bytes(b"abc")), r.read(FieldType::Str));
        assert_eq!(Some(Field::Recno(300)), r.read(FieldType::Recno));
        assert_eq!(Some(Field::Bytes(b"xy")), r.read(FieldType::Fixed(2)));
        assert_eq!(Some(Field::Bytes(&[0, 255])), r.read(FieldType::Raw));
        assert!(r.is_empty());
        assert_eq!(None, r.read(FieldType::Int));
    }

    #[test]
    fn test_short_input() {
        let mut r = FieldReader::new(&[1, 2, 3]);
        assert_eq!(None, r.read(FieldType::Int));
        let mut r = FieldReader::new(&[1, 2, 3]);
        assert_eq!(None, r.read(FieldType::Fixed(4)));
    }

    #[test]
    fn test_field_ordering() {
        assert!(Field::Int(-1) < Field::Int(0));
        assert!(Field::Recno(2) < Field::Recno(10));
        assert!(Field::Bytes(b"ab") < Field::Bytes(b"abc"));
        assert!(Field::Bytes(b"b") > Field::Bytes(b"abc"));
    }
}

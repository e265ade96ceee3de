pub mod pack;

use self::pack::{put_field, Field, FieldReader};
use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::str::FromStr;

/// The type of one key field, spelled in key format strings as:
///
/// * `S` string, compared byte-lexicographically
/// * `q` or `i` signed 64-bit integer
/// * `r` record number
/// * `<n>s` fixed-length byte record of width `n` (bare `s` is width 1)
/// * `u` raw bytes, compared byte-lexicographically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Recno,
    Fixed(usize),
    Raw,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            FieldType::Str => "string",
            FieldType::Int => "int",
            FieldType::Recno => "recno",
            FieldType::Fixed(_) => "fixed",
            FieldType::Raw => "raw",
        }
    }
}

/// A typed key. Tables with a multi-field format take `Key::Tuple`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(String),
    Int(i64),
    Recno(u64),
    Fixed(Vec<u8>),
    Raw(Vec<u8>),
    Tuple(Vec<Key>),
}

impl Key {
    fn type_name(&self) -> &'static str {
        match self {
            Key::Str(_) => "string",
            Key::Int(_) => "int",
            Key::Recno(_) => "recno",
            Key::Fixed(_) => "fixed",
            Key::Raw(_) => "raw",
            Key::Tuple(_) => "tuple",
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => write!(f, "{:?}", s),
            Key::Int(i) => write!(f, "{}", i),
            Key::Recno(r) => write!(f, "#{}", r),
            Key::Fixed(b) | Key::Raw(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Key::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The declared key format of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFormat {
    fields: Vec<FieldType>,
}

impl FromStr for KeyFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |msg: &str| Error::InvalidArgument(format!("key format {:?}: {}", s, msg));
        let mut fields = vec![];
        let mut width: Option<usize> = None;
        for c in s.chars() {
            if let Some(d) = c.to_digit(10) {
                let w = width.unwrap_or(0);
                width = Some(
                    w.checked_mul(10)
                        .and_then(|w| w.checked_add(d as usize))
                        .ok_or_else(|| invalid("field width overflows"))?,
                );
                continue;
            }
            if c == 's' {
                match width.take().unwrap_or(1) {
                    0 => return Err(invalid("fixed-length field of width 0")),
                    w => fields.push(FieldType::Fixed(w)),
                }
                continue;
            }
            if width.is_some() {
                return Err(invalid("a width is only allowed before 's'"));
            }
            fields.push(match c {
                'S' => FieldType::Str,
                'q' | 'i' => FieldType::Int,
                'r' => FieldType::Recno,
                'u' => FieldType::Raw,
                other => return Err(invalid(&format!("unknown field type '{}'", other))),
            });
        }
        if width.is_some() {
            return Err(invalid("dangling field width"));
        }
        if fields.is_empty() {
            return Err(invalid("no fields"));
        }
        Ok(Self { fields })
    }
}

impl KeyFormat {
    #[inline]
    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    #[inline]
    pub fn is_tuple(&self) -> bool {
        self.fields.len() > 1
    }

    /// Checks that `key` has this format's shape: the right field types and,
    /// for tuple formats, exactly as many fields.
    pub fn check(&self, key: &Key) -> Result<()> {
        match (self.fields.as_slice(), key) {
            ([ty], key) => check_field(*ty, key),
            (fields, Key::Tuple(values)) => {
                if values.len() != fields.len() {
                    return Err(Error::FormatMismatch(format!(
                        "expected {} key fields, got {}",
                        fields.len(),
                        values.len()
                    )));
                }
                fields
                    .iter()
                    .zip(values)
                    .try_for_each(|(ty, value)| check_field(*ty, value))
            }
            (fields, other) => Err(Error::FormatMismatch(format!(
                "expected a tuple of {} fields, got a {} key",
                fields.len(),
                other.type_name()
            ))),
        }
    }

    /// Checks `key` and packs it into the stored representation.
    pub fn pack(&self, key: &Key) -> Result<Bytes> {
        self.check(key)?;
        let mut buf = BytesMut::new();
        put_field(&mut buf, key);
        Ok(buf.freeze())
    }

    /// Decodes a packed key back into a typed key.
    pub fn unpack(&self, packed: &[u8]) -> Result<Key> {
        let mut reader = FieldReader::new(packed);
        let mut values = Vec::with_capacity(self.fields.len());
        for ty in &self.fields {
            let field = reader
                .read(*ty)
                .ok_or_else(|| Error::Corruption(format!("truncated {} key field", ty.name())))?;
            values.push(to_key(*ty, field)?);
        }
        if !reader.is_empty() {
            return Err(Error::Corruption("trailing bytes after packed key".to_owned()));
        }
        if values.len() == 1 {
            Ok(values.remove(0))
        } else {
            Ok(Key::Tuple(values))
        }
    }

    /// Human readable form of a packed key for messages.
    pub fn describe(&self, packed: &[u8]) -> String {
        match self.unpack(packed) {
            Ok(key) => key.to_string(),
            Err(_) => format!("{:?}", packed),
        }
    }

    /// The field bytes of a packed key when the format is a single string or
    /// raw field, the formats prefix matching is defined for.
    pub fn prefix_field<'a>(&self, packed: &'a [u8]) -> Option<&'a [u8]> {
        match self.fields.as_slice() {
            [ty @ FieldType::Str] | [ty @ FieldType::Raw] => {
                match FieldReader::new(packed).read(*ty) {
                    Some(Field::Bytes(b)) => Some(b),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn check_field(ty: FieldType, key: &Key) -> Result<()> {
    let ok = match (ty, key) {
        (FieldType::Str, Key::Str(_))
        | (FieldType::Int, Key::Int(_))
        | (FieldType::Recno, Key::Recno(_))
        | (FieldType::Raw, Key::Raw(_)) => true,
        (FieldType::Fixed(width), Key::Fixed(b)) => {
            if b.len() != width {
                return Err(Error::FormatMismatch(format!(
                    "fixed-length field expects {} bytes, got {}",
                    width,
                    b.len()
                )));
            }
            true
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::FormatMismatch(format!(
            "expected a {} field, got a {} key",
            ty.name(),
            key.type_name()
        )))
    }
}

fn to_key(ty: FieldType, field: Field<'_>) -> Result<Key> {
    match (ty, field) {
        (FieldType::Str, Field::Bytes(b)) => String::from_utf8(b.to_vec())
            .map(Key::Str)
            .map_err(|_| Error::Corruption("string key field is not utf-8".to_owned())),
        (FieldType::Raw, Field::Bytes(b)) => Ok(Key::Raw(b.to_vec())),
        (FieldType::Fixed(_), Field::Bytes(b)) => Ok(Key::Fixed(b.to_vec())),
        (FieldType::Int, Field::Int(i)) => Ok(Key::Int(i)),
        (FieldType::Recno, Field::Recno(r)) => Ok(Key::Recno(r)),
        _ => Err(Error::Corruption(format!("bad {} key field", ty.name()))),
    }
}

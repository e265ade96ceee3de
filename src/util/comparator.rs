use crate::key::pack::FieldReader;
use crate::key::{FieldType, KeyFormat};
use std::cmp::Ordering;
use std::sync::Arc;

pub trait Comparator: Send + Sync + Clone {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
    fn name(&self) -> &str;
}

#[derive(Default, Clone, Copy)]
pub struct BytewiseComparator {}

impl Comparator for BytewiseComparator {
    #[inline]
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    #[inline]
    fn name(&self) -> &str {
        "boundkv.BytewiseComparator"
    }
}

/// Orders packed keys of one key format.
///
/// Resolved once from the table's format when the table opens; comparing two
/// keys decodes their fields in place and never allocates.
#[derive(Debug, Clone)]
pub enum KeyComparator {
    Str,
    Int,
    Recno,
    Fixed(usize),
    Raw,
    /// Field-wise, left to right. A strict prefix sorts before its extensions.
    Tuple(Arc<[FieldType]>),
}

impl KeyComparator {
    pub fn resolve(format: &KeyFormat) -> Self {
        match format.fields() {
            [FieldType::Str] => KeyComparator::Str,
            [FieldType::Int] => KeyComparator::Int,
            [FieldType::Recno] => KeyComparator::Recno,
            [FieldType::Fixed(width)] => KeyComparator::Fixed(*width),
            [FieldType::Raw] => KeyComparator::Raw,
            fields => KeyComparator::Tuple(fields.into()),
        }
    }

    #[inline]
    fn scalar(ty: FieldType, a: &[u8], b: &[u8]) -> Ordering {
        FieldReader::new(a).read(ty).cmp(&FieldReader::new(b).read(ty))
    }
}

impl Comparator for KeyComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            KeyComparator::Str => Self::scalar(FieldType::Str, a, b),
            KeyComparator::Int => Self::scalar(FieldType::Int, a, b),
            KeyComparator::Recno => Self::scalar(FieldType::Recno, a, b),
            KeyComparator::Fixed(width) => Self::scalar(FieldType::Fixed(*width), a, b),
            KeyComparator::Raw => Self::scalar(FieldType::Raw, a, b),
            KeyComparator::Tuple(fields) => {
                let (mut ra, mut rb) = (FieldReader::new(a), FieldReader::new(b));
                for ty in fields.iter() {
                    match (ra.read(*ty), rb.read(*ty)) {
                        (None, None) => return Ordering::Equal,
                        (None, Some(_)) => return Ordering::Less,
                        (Some(_), None) => return Ordering::Greater,
                        (Some(x), Some(y)) => match x.cmp(&y) {
                            Ordering::Equal => {}
                            unequal => return unequal,
                        },
                    }
                }
                Ordering::Equal
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            KeyComparator::Str => "boundkv.StringComparator",
            KeyComparator::Int => "boundkv.IntComparator",
            KeyComparator::Recno => "boundkv.RecnoComparator",
            KeyComparator::Fixed(_) => "boundkv.FixedComparator",
            KeyComparator::Raw => "boundkv.RawComparator",
            KeyComparator::Tuple(_) => "boundkv.TupleComparator",
        }
    }
}

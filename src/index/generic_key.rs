use std::cmp::Ordering;
use std::fmt;

/// Fixed-width index key. `N` is the serialized width in bytes; the
/// usual instantiations are 4, 8, 16, 32 and 64. Interpretation of the
/// bytes is entirely the comparator's business.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GenericKey<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> GenericKey<N> {
    pub fn zeroed() -> Self {
        Self { data: [0u8; N] }
    }

    /// Builds a key from a little-endian integer written into the key
    /// prefix. Panics when the key is narrower than four bytes.
    pub fn from_integer(value: u32) -> Self {
        let mut key = Self::zeroed();
        key.data[..4].copy_from_slice(&value.to_le_bytes());
        key
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() <= N, "key wider than {N} bytes");
        let mut key = Self::zeroed();
        key.data[..bytes.len()].copy_from_slice(bytes);
        key
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Integer readback for keys built with `from_integer`.
    pub fn to_integer(&self) -> u32 {
        u32::from_le_bytes(self.data[..4].try_into().unwrap())
    }
}

impl<const N: usize> fmt::Debug for GenericKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericKey<{N}>({})", self.to_integer())
    }
}

/// Total order over serialized keys. Implementations must be
/// consistent: the tree's sortedness invariants are only as good as
/// the comparator.
pub trait KeyComparator: Send + Sync {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

/// Orders keys by the little-endian u32 in their prefix, the encoding
/// `GenericKey::from_integer` produces.
pub struct IntegerComparator;

impl KeyComparator for IntegerComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let a_val = u32::from_le_bytes(a[..4].try_into().unwrap());
        let b_val = u32::from_le_bytes(b[..4].try_into().unwrap());
        a_val.cmp(&b_val)
    }
}

/// Orders keys as raw byte strings; correct for big-endian encoded or
/// text keys.
pub struct BytewiseComparator;

impl KeyComparator for BytewiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_comparator() {
        let cmp = IntegerComparator;
        let a = GenericKey::<8>::from_integer(5);
        let b = GenericKey::<8>::from_integer(300);
        assert_eq!(cmp.compare(a.as_bytes(), b.as_bytes()), Ordering::Less);
        assert_eq!(cmp.compare(b.as_bytes(), a.as_bytes()), Ordering::Greater);
        assert_eq!(cmp.compare(a.as_bytes(), a.as_bytes()), Ordering::Equal);
    }

    #[test]
    fn test_bytewise_comparator() {
        let cmp = BytewiseComparator;
        assert_eq!(cmp.compare(b"abc", b"abd"), Ordering::Less);
        assert_eq!(cmp.compare(b"b", b"aaaa"), Ordering::Greater);
    }

    #[test]
    fn test_key_integer_round_trip() {
        let key = GenericKey::<16>::from_integer(12345);
        assert_eq!(key.to_integer(), 12345);
        assert_eq!(key.as_bytes().len(), 16);
    }
}

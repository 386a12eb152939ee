//! The module buffer format.
//!
//! A flat little-endian buffer laid out like a FlatBuffer: a `u32` offset to the root table at
//! position 0, an optional 4-byte [`Identifier`] at position 4, and offset-addressed tables,
//! vectors and strings after that. Fields are read in place; nothing is parsed up front.
//!
//! Accessors in this module trust the buffer. Untrusted bytes go through the [`Verifier`] first;
//! reading an unverified, malformed buffer panics on an out-of-bounds slice but never reads
//! outside of it.

use std::{fmt, marker::PhantomData};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use builder::{Builder, FinishedBuffer, TableBuilder};
pub use verifier::{TableVerifier, Verifier, VerifierOptions, VerifyError};

mod builder;
mod verifier;

pub const SIZE_UOFFSET: usize = size_of::<u32>();
pub const SIZE_SOFFSET: usize = size_of::<i32>();
pub const SIZE_VOFFSET: usize = size_of::<u16>();
/// Byte position of the identifier within a buffer.
pub const IDENTIFIER_POSITION: usize = SIZE_UOFFSET;
pub const IDENTIFIER_SIZE: usize = 4;

/// A schema tag stored right after the root offset.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Identifier(pub [u8; IDENTIFIER_SIZE]);

impl Identifier {
    #[inline]
    pub const fn new(tag: &[u8; IDENTIFIER_SIZE]) -> Self {
        Self(*tag)
    }

    /// Reads the identifier slot of `buf`, if the buffer is long enough to have one.
    pub fn read(buf: &[u8]) -> Option<Self> {
        let bytes = buf.get(IDENTIFIER_POSITION..IDENTIFIER_POSITION + IDENTIFIER_SIZE)?;
        let mut tag = [0; IDENTIFIER_SIZE];
        tag.copy_from_slice(bytes);
        Some(Self(tag))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier(\"{self}\")")
    }
}

/// A fixed-size little-endian value that can live inline in a table or vector.
pub trait Primitive: Copy + 'static {
    const SIZE: usize;

    fn read_le(bytes: &[u8]) -> Self;
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_primitive {
    ($($ty:ty),+) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = size_of::<$ty>();

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0; size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..size_of::<$ty>()]);
                    <$ty>::from_le_bytes(buf)
                }

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )+
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Primitive for bool {
    const SIZE: usize = 1;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn write_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }
}

#[inline]
pub(crate) fn read<T: Primitive>(buf: &[u8], pos: usize) -> T {
    T::read_le(&buf[pos..pos + T::SIZE])
}

/// A typed view constructed from a table position.
pub trait Follow<'a> {
    fn follow(table: Table<'a>) -> Self;
}

/// A table inside a buffer.
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Follow<'a> for Table<'a> {
    #[inline]
    fn follow(table: Table<'a>) -> Self {
        table
    }
}

impl<'a> Table<'a> {
    #[inline]
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn vtable(&self) -> usize {
        let soffset: i32 = read(self.buf, self.pos);
        (self.pos as i64 - soffset as i64) as usize
    }

    /// Absolute position of the field in `slot`, or `None` if the field is absent.
    pub fn field_position(&self, slot: u16) -> Option<usize> {
        let vtable = self.vtable();
        let size: u16 = read(self.buf, vtable);
        let entry = 2 * SIZE_VOFFSET + slot as usize * SIZE_VOFFSET;
        if entry + SIZE_VOFFSET > size as usize {
            return None;
        }
        match read::<u16>(self.buf, vtable + entry) {
            0 => None,
            offset => Some(self.pos + offset as usize),
        }
    }

    #[inline]
    pub fn get<T: Primitive>(&self, slot: u16, default: T) -> T {
        self.field_position(slot)
            .map_or(default, |pos| read(self.buf, pos))
    }

    #[inline]
    fn indirect(&self, slot: u16) -> Option<usize> {
        let pos = self.field_position(slot)?;
        Some(pos + read::<u32>(self.buf, pos) as usize)
    }

    #[inline]
    pub fn get_table<V: Follow<'a>>(&self, slot: u16) -> Option<V> {
        self.indirect(slot)
            .map(|pos| V::follow(Table::new(self.buf, pos)))
    }

    pub fn get_str(&self, slot: u16) -> Option<&'a str> {
        let pos = self.indirect(slot)?;
        let len: u32 = read(self.buf, pos);
        let start = pos + SIZE_UOFFSET;
        std::str::from_utf8(&self.buf[start..start + len as usize]).ok()
    }

    #[inline]
    pub fn get_vector<T: Primitive>(&self, slot: u16) -> Option<Vector<'a, T>> {
        self.indirect(slot).map(|pos| Vector::new(self.buf, pos))
    }

    #[inline]
    pub fn get_tables<V: Follow<'a>>(&self, slot: u16) -> Option<TableVector<'a, V>> {
        self.indirect(slot).map(|pos| TableVector::new(self.buf, pos))
    }
}

/// A vector of inline values.
#[derive(Debug, Clone, Copy)]
pub struct Vector<'a, T> {
    buf: &'a [u8],
    pos: usize,
    len: usize,
    phantom: PhantomData<T>,
}

impl<'a, T: Primitive> Vector<'a, T> {
    #[inline]
    fn new(buf: &'a [u8], pos: usize) -> Self {
        let len = read::<u32>(buf, pos) as usize;
        let pos = pos + SIZE_UOFFSET;
        let phantom = PhantomData;
        Self {
            buf,
            pos,
            len,
            phantom,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        (index < self.len).then(|| read(self.buf, self.pos + index * T::SIZE))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + use<'a, T> {
        let Self { buf, pos, len, .. } = *self;
        (0..len).map(move |index| read(buf, pos + index * T::SIZE))
    }
}

impl<'a> Vector<'a, u8> {
    /// The raw bytes of the vector.
    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        &self.buf[self.pos..self.pos + self.len]
    }
}

/// A vector of offsets to tables.
#[derive(Debug, Clone, Copy)]
pub struct TableVector<'a, V> {
    buf: &'a [u8],
    pos: usize,
    len: usize,
    phantom: PhantomData<V>,
}

impl<'a, V: Follow<'a>> TableVector<'a, V> {
    #[inline]
    fn new(buf: &'a [u8], pos: usize) -> Self {
        let len = read::<u32>(buf, pos) as usize;
        let pos = pos + SIZE_UOFFSET;
        let phantom = PhantomData;
        Self {
            buf,
            pos,
            len,
            phantom,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<V> {
        (index < self.len).then(|| {
            let pos = self.pos + index * SIZE_UOFFSET;
            let pos = pos + read::<u32>(self.buf, pos) as usize;
            V::follow(Table::new(self.buf, pos))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = V> + use<'a, V> {
        let (buf, pos, len) = (self.buf, self.pos, self.len);
        (0..len).map(move |index| {
            let pos = pos + index * SIZE_UOFFSET;
            let pos = pos + read::<u32>(buf, pos) as usize;
            V::follow(Table::new(buf, pos))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Builder, Identifier, Table, TableBuilder, Vector};

    #[test]
    fn test_identifier() {
        let id = Identifier::new(b"TEST");
        assert_eq!(id.to_string(), "TEST");
        assert_eq!(Identifier::read(b"\x08\0\0\0TEST"), Some(id));
        assert_eq!(Identifier::read(b"\x08\0\0\0TE"), None);
        assert_eq!(Identifier::new(b"\0\x01AB").to_string(), "\\x00\\x01AB");
    }

    #[test]
    fn test_read_table() {
        let inner = TableBuilder::new().scalar(0, 7u8);
        let table = TableBuilder::new()
            .scalar(0, 0x0102_0304u32)
            .scalar(2, -5i64)
            .string(3, "hello")
            .vector(4, &[1.5f32, 2.5, 3.5])
            .table(5, inner.clone())
            .tables(6, [inner.clone(), inner.scalar(1, true)]);
        let buffer = Builder::finish::<()>(table, None);
        let bytes = buffer.as_ref();

        let root = Table::new(bytes, buffer.root());
        assert_eq!(root.get(0, 0u32), 0x0102_0304);
        assert_eq!(root.get(1, 42u16), 42);
        assert_eq!(root.get(2, 0i64), -5);
        assert_eq!(root.get(9, 1u8), 1);
        assert_eq!(root.get_str(3), Some("hello"));

        let vector: Vector<f32> = root.get_vector(4).unwrap();
        assert_eq!(vector.iter().collect::<Vec<_>>(), vec![1.5, 2.5, 3.5]);
        assert_eq!(vector.get(3), None);

        let inner: Table = root.get_table(5).unwrap();
        assert_eq!(inner.get(0, 0u8), 7);

        let tables = root.get_tables::<Table>(6).unwrap();
        assert_eq!(tables.len(), 2);
        assert!(!tables.iter().next().unwrap().get(1, false));
        assert!(tables.get(1).unwrap().get(1, false));
        assert!(tables.get(2).is_none());
    }
}

use thiserror::Error;

use super::{Identifier, Primitive, SIZE_SOFFSET, SIZE_UOFFSET, SIZE_VOFFSET, read};
use crate::error::ErrorKind;

/// Resource limits applied while verifying a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerifierOptions {
    /// Maximum nesting of tables.
    pub max_depth: usize,
    /// Maximum number of tables visited.
    pub max_tables: usize,
    /// Maximum number of bytes covered by all visited objects, counting overlaps.
    pub max_apparent_size: usize,
    /// Whether scalars must sit at positions that are multiples of their size.
    pub check_alignment: bool,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_tables: 1_000_000,
            max_apparent_size: 1 << 31,
            check_alignment: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("buffer of {0} bytes is too small to hold a header")]
    TooSmall(usize),
    #[error("identifier mismatch: expected `{expected}`, found `{found}`")]
    Identifier {
        expected: Identifier,
        found: Identifier,
    },
    #[error("range {start}..{end} is out of bounds of a {len}-byte buffer")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("{name} at position {position} is not aligned to {align} bytes")]
    Unaligned {
        name: &'static str,
        position: usize,
        align: usize,
    },
    #[error("signed offset at position {0} points outside the buffer")]
    SignedOffset(usize),
    #[error("vtable at position {0} is malformed")]
    Vtable(usize),
    #[error("field `{field}` of the table at position {position} lies outside the table")]
    FieldOutOfTable { field: &'static str, position: usize },
    #[error("required field `{0}` is missing")]
    MissingRequiredField(&'static str),
    #[error("string at position {0} is missing its null terminator")]
    NullTerminator(usize),
    #[error("string at position {0} is not valid UTF-8")]
    Utf8(usize),
    #[error("table nesting exceeds depth {0}")]
    Depth(usize),
    #[error("buffer holds more than {0} tables")]
    Tables(usize),
    #[error("apparent size exceeds {0} bytes")]
    ApparentSize(usize),
}

impl VerifyError {
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Verification
    }
}

/// Walks a buffer and proves every offset, length and field the schema reaches stays in bounds.
#[derive(Debug)]
pub struct Verifier<'a> {
    buf: &'a [u8],
    options: VerifierOptions,
    depth: usize,
    tables: usize,
    apparent_size: usize,
}

impl<'a> Verifier<'a> {
    pub fn new(buf: &'a [u8], options: VerifierOptions) -> Self {
        Self {
            buf,
            options,
            depth: 0,
            tables: 0,
            apparent_size: 0,
        }
    }

    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Checks the header and returns the position of the root table.
    pub fn header(&mut self, identifier: Option<Identifier>) -> Result<usize, VerifyError> {
        let len = self.buf.len();
        let header = match identifier {
            Some(_) => SIZE_UOFFSET + super::IDENTIFIER_SIZE,
            None => SIZE_UOFFSET,
        };
        if len < header {
            return Err(VerifyError::TooSmall(len));
        }
        if let Some(expected) = identifier {
            let found = Identifier::read(self.buf).ok_or(VerifyError::TooSmall(len))?;
            if found != expected {
                return Err(VerifyError::Identifier { expected, found });
            }
        }
        self.offset(0)
    }

    fn is_aligned(
        &self,
        name: &'static str,
        position: usize,
        align: usize,
    ) -> Result<(), VerifyError> {
        match self.options.check_alignment && position % align != 0 {
            true => Err(VerifyError::Unaligned {
                name,
                position,
                align,
            }),
            false => Ok(()),
        }
    }

    /// Checks that `start..start + size` lies in the buffer and charges it to the apparent size.
    fn range(&mut self, start: usize, size: usize) -> Result<(), VerifyError> {
        let len = self.buf.len();
        let end = start.checked_add(size).ok_or(VerifyError::OutOfBounds {
            start,
            end: usize::MAX,
            len,
        })?;
        if end > len {
            return Err(VerifyError::OutOfBounds { start, end, len });
        }
        self.apparent_size = self.apparent_size.saturating_add(size);
        match self.apparent_size > self.options.max_apparent_size {
            true => Err(VerifyError::ApparentSize(self.options.max_apparent_size)),
            false => Ok(()),
        }
    }

    fn scalar<T: Primitive>(
        &mut self,
        name: &'static str,
        position: usize,
    ) -> Result<T, VerifyError> {
        self.is_aligned(name, position, T::SIZE)?;
        self.range(position, T::SIZE)?;
        Ok(read(self.buf, position))
    }

    /// Follows the unsigned offset stored at `position` and returns its target.
    fn offset(&mut self, position: usize) -> Result<usize, VerifyError> {
        let offset: u32 = self.scalar("offset", position)?;
        let target = position.checked_add(offset as usize);
        match target {
            Some(target) if target < self.buf.len() => Ok(target),
            _ => Err(VerifyError::OutOfBounds {
                start: position,
                end: target.unwrap_or(usize::MAX),
                len: self.buf.len(),
            }),
        }
    }

    /// Begins verifying the table at `position`. Fields are checked through the returned
    /// [`TableVerifier`], which must be closed with [`TableVerifier::finish`].
    pub fn table(&mut self, position: usize) -> Result<TableVerifier<'_, 'a>, VerifyError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(VerifyError::Depth(self.options.max_depth));
        }
        self.tables += 1;
        if self.tables > self.options.max_tables {
            return Err(VerifyError::Tables(self.options.max_tables));
        }

        let soffset: i32 = self.scalar("table", position)?;
        let vtable = (position as i64)
            .checked_sub(soffset as i64)
            .filter(|&vtable| vtable >= 0 && (vtable as usize) < self.buf.len())
            .ok_or(VerifyError::SignedOffset(position))? as usize;

        let vtable_size: u16 = self.scalar("vtable", vtable)?;
        let table_size: u16 = self.scalar("vtable", vtable + SIZE_VOFFSET)?;
        let vtable_size = vtable_size as usize;
        let table_size = table_size as usize;
        if vtable_size < 2 * SIZE_VOFFSET || vtable_size % SIZE_VOFFSET != 0 {
            return Err(VerifyError::Vtable(vtable));
        }
        if table_size < SIZE_SOFFSET {
            return Err(VerifyError::Vtable(vtable));
        }
        self.range(vtable, vtable_size)?;
        self.range(position, table_size)?;

        Ok(TableVerifier {
            verifier: self,
            position,
            vtable,
            vtable_size,
            table_size,
        })
    }

    /// Verifies the vector of `T` at `position` and returns its length.
    pub fn vector<T: Primitive>(&mut self, position: usize) -> Result<usize, VerifyError> {
        let len: u32 = self.scalar("vector", position)?;
        let len = len as usize;
        let start = position + SIZE_UOFFSET;
        self.is_aligned("vector element", start, T::SIZE)?;
        let size = len.checked_mul(T::SIZE).ok_or(VerifyError::OutOfBounds {
            start,
            end: usize::MAX,
            len: self.buf.len(),
        })?;
        self.range(start, size)?;
        Ok(len)
    }

    pub fn string(&mut self, position: usize) -> Result<(), VerifyError> {
        let len = self.vector::<u8>(position)?;
        let start = position + SIZE_UOFFSET;
        self.range(start + len, 1)?;
        if self.buf[start + len] != 0 {
            return Err(VerifyError::NullTerminator(position));
        }
        match std::str::from_utf8(&self.buf[start..start + len]) {
            Ok(_) => Ok(()),
            Err(_) => Err(VerifyError::Utf8(position)),
        }
    }

    /// Verifies a vector of table offsets, running `verify` on every element.
    pub fn tables<F>(&mut self, position: usize, mut verify: F) -> Result<(), VerifyError>
    where
        F: FnMut(&mut Verifier<'a>, usize) -> Result<(), VerifyError>,
    {
        let len = self.vector::<u32>(position)?;
        let start = position + SIZE_UOFFSET;
        for index in 0..len {
            let target = self.offset(start + index * SIZE_UOFFSET)?;
            verify(&mut *self, target)?;
        }
        Ok(())
    }
}

/// Field-by-field verification of a single table.
#[derive(Debug)]
pub struct TableVerifier<'v, 'a> {
    verifier: &'v mut Verifier<'a>,
    position: usize,
    vtable: usize,
    vtable_size: usize,
    table_size: usize,
}

impl<'a> TableVerifier<'_, 'a> {
    /// Position of the field in `slot` and checks it fits in the table, or `None` if absent.
    fn field(
        &mut self,
        slot: u16,
        name: &'static str,
        size: usize,
        required: bool,
    ) -> Result<Option<usize>, VerifyError> {
        let entry = 2 * SIZE_VOFFSET + slot as usize * SIZE_VOFFSET;
        let offset = match entry + SIZE_VOFFSET <= self.vtable_size {
            true => read::<u16>(self.verifier.buf, self.vtable + entry) as usize,
            false => 0,
        };
        match offset {
            0 if required => Err(VerifyError::MissingRequiredField(name)),
            0 => Ok(None),
            offset if offset < SIZE_SOFFSET || offset + size > self.table_size => {
                Err(VerifyError::FieldOutOfTable {
                    field: name,
                    position: self.position,
                })
            }
            offset => {
                let position = self.position + offset;
                self.verifier.is_aligned(name, position, size)?;
                self.verifier.range(position, size)?;
                Ok(Some(position))
            }
        }
    }

    pub fn scalar<T: Primitive>(
        mut self,
        slot: u16,
        name: &'static str,
        required: bool,
    ) -> Result<Self, VerifyError> {
        self.field(slot, name, T::SIZE, required)?;
        Ok(self)
    }

    pub fn string(
        mut self,
        slot: u16,
        name: &'static str,
        required: bool,
    ) -> Result<Self, VerifyError> {
        if let Some(position) = self.field(slot, name, SIZE_UOFFSET, required)? {
            let target = self.verifier.offset(position)?;
            self.verifier.string(target)?;
        }
        Ok(self)
    }

    pub fn vector<T: Primitive>(
        mut self,
        slot: u16,
        name: &'static str,
        required: bool,
    ) -> Result<Self, VerifyError> {
        if let Some(position) = self.field(slot, name, SIZE_UOFFSET, required)? {
            let target = self.verifier.offset(position)?;
            self.verifier.vector::<T>(target)?;
        }
        Ok(self)
    }

    pub fn table<F>(
        mut self,
        slot: u16,
        name: &'static str,
        required: bool,
        verify: F,
    ) -> Result<Self, VerifyError>
    where
        F: FnOnce(&mut Verifier<'a>, usize) -> Result<(), VerifyError>,
    {
        if let Some(position) = self.field(slot, name, SIZE_UOFFSET, required)? {
            let target = self.verifier.offset(position)?;
            verify(&mut *self.verifier, target)?;
        }
        Ok(self)
    }

    pub fn tables<F>(
        mut self,
        slot: u16,
        name: &'static str,
        required: bool,
        verify: F,
    ) -> Result<Self, VerifyError>
    where
        F: FnMut(&mut Verifier<'a>, usize) -> Result<(), VerifyError>,
    {
        if let Some(position) = self.field(slot, name, SIZE_UOFFSET, required)? {
            let target = self.verifier.offset(position)?;
            self.verifier.tables(target, verify)?;
        }
        Ok(self)
    }

    pub fn finish(self) -> Result<(), VerifyError> {
        self.verifier.depth -= 1;
        Ok(())
    }
}

use std::marker::PhantomData;

use super::{Identifier, Primitive, SIZE_SOFFSET, SIZE_UOFFSET, SIZE_VOFFSET};

#[derive(Debug, Clone)]
enum Field {
    Scalar { bytes: Vec<u8>, align: usize },
    String(String),
    Vector { bytes: Vec<u8>, align: usize, len: usize },
    Table(TableBuilder),
    Tables(Vec<TableBuilder>),
}

impl Field {
    /// Size and alignment of the field's inline value.
    #[inline]
    fn inline(&self) -> (usize, usize) {
        match self {
            Field::Scalar { bytes, align } => (bytes.len(), *align),
            _ => (SIZE_UOFFSET, SIZE_UOFFSET),
        }
    }
}

/// Describes a table to be serialized. Fields are addressed by vtable slot.
#[derive(Debug, Default, Clone)]
pub struct TableBuilder {
    fields: Vec<(u16, Field)>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(mut self, slot: u16, field: Field) -> Self {
        self.fields.retain(|(index, _)| *index != slot);
        self.fields.push((slot, field));
        self
    }

    pub fn scalar<T: Primitive>(self, slot: u16, value: T) -> Self {
        let mut bytes = Vec::with_capacity(T::SIZE);
        value.write_le(&mut bytes);
        let align = T::SIZE;
        self.insert(slot, Field::Scalar { bytes, align })
    }

    pub fn string(self, slot: u16, value: impl Into<String>) -> Self {
        self.insert(slot, Field::String(value.into()))
    }

    pub fn vector<T: Primitive>(self, slot: u16, values: &[T]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * T::SIZE);
        values.iter().for_each(|value| value.write_le(&mut bytes));
        let align = T::SIZE;
        let len = values.len();
        self.insert(slot, Field::Vector { bytes, align, len })
    }

    pub fn table(self, slot: u16, table: TableBuilder) -> Self {
        self.insert(slot, Field::Table(table))
    }

    pub fn tables(self, slot: u16, tables: impl IntoIterator<Item = TableBuilder>) -> Self {
        self.insert(slot, Field::Tables(tables.into_iter().collect()))
    }
}

/// A serialized buffer whose root table is meant to be of schema `T`.
///
/// The tag is not checked when the buffer is built; consumers verify the bytes against `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedBuffer<T> {
    bytes: Vec<u8>,
    root: usize,
    phantom: PhantomData<fn() -> T>,
}

impl<T> FinishedBuffer<T> {
    #[inline]
    pub fn root(&self) -> usize {
        self.root
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl<T> AsRef<[u8]> for FinishedBuffer<T> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Serializes [`TableBuilder`] trees front to back: every object is written before the objects it
/// points to, so all offsets are forward and unsigned.
#[derive(Debug, Default)]
pub struct Builder {
    buf: Vec<u8>,
}

impl Builder {
    pub fn finish<T>(root: TableBuilder, identifier: Option<Identifier>) -> FinishedBuffer<T> {
        let mut builder = Self::default();
        builder.buf.extend_from_slice(&[0; SIZE_UOFFSET]);
        if let Some(identifier) = identifier {
            builder.buf.extend_from_slice(&identifier.0);
        }
        let root = builder.write_table(&root);
        builder.patch(0, root);

        FinishedBuffer {
            bytes: builder.buf,
            root,
            phantom: PhantomData,
        }
    }

    #[inline]
    fn pad(&mut self, align: usize) {
        while self.buf.len() % align != 0 {
            self.buf.push(0);
        }
    }

    /// Points the offset at `position` to `target`.
    #[inline]
    fn patch(&mut self, position: usize, target: usize) {
        let offset = (target - position) as u32;
        self.buf[position..position + SIZE_UOFFSET].copy_from_slice(&offset.to_le_bytes());
    }

    fn write_table(&mut self, table: &TableBuilder) -> usize {
        // larger fields first to keep padding small
        let mut fields = table.fields.iter().collect::<Vec<_>>();
        fields.sort_by_key(|(_, field)| std::cmp::Reverse(field.inline().1));

        let mut offsets = Vec::with_capacity(fields.len());
        let mut size = SIZE_SOFFSET;
        let mut align = SIZE_SOFFSET;
        for (slot, field) in &fields {
            let (field_size, field_align) = field.inline();
            size = size.next_multiple_of(field_align);
            offsets.push((*slot, size));
            size += field_size;
            align = align.max(field_align);
        }

        let slots = fields.iter().map(|(slot, _)| *slot as usize + 1).max().unwrap_or(0);
        let mut vtable = vec![0u16; 2 + slots];
        vtable[0] = ((2 + slots) * SIZE_VOFFSET) as u16;
        vtable[1] = size as u16;
        for &(slot, offset) in &offsets {
            vtable[2 + slot as usize] = offset as u16;
        }

        self.pad(SIZE_VOFFSET);
        let vtable_position = self.buf.len();
        vtable.iter().for_each(|entry| entry.write_le(&mut self.buf));

        self.pad(align);
        let position = self.buf.len();
        ((position - vtable_position) as i32).write_le(&mut self.buf);
        self.buf.resize(position + size, 0);

        for ((_, field), &(_, offset)) in fields.iter().zip(&offsets) {
            let field_position = position + offset;
            let target = match field {
                Field::Scalar { bytes, .. } => {
                    self.buf[field_position..field_position + bytes.len()].copy_from_slice(bytes);
                    continue;
                }
                Field::String(value) => self.write_string(value),
                Field::Vector { bytes, align, len } => self.write_vector(bytes, *align, *len),
                Field::Table(table) => self.write_table(table),
                Field::Tables(tables) => self.write_tables(tables),
            };
            self.patch(field_position, target);
        }

        position
    }

    fn write_string(&mut self, value: &str) -> usize {
        self.pad(SIZE_UOFFSET);
        let position = self.buf.len();
        (value.len() as u32).write_le(&mut self.buf);
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        position
    }

    fn write_vector(&mut self, bytes: &[u8], align: usize, len: usize) -> usize {
        while self.buf.len() % SIZE_UOFFSET != 0 || (self.buf.len() + SIZE_UOFFSET) % align != 0 {
            self.buf.push(0);
        }
        let position = self.buf.len();
        (len as u32).write_le(&mut self.buf);
        self.buf.extend_from_slice(bytes);
        position
    }

    fn write_tables(&mut self, tables: &[TableBuilder]) -> usize {
        self.pad(SIZE_UOFFSET);
        let position = self.buf.len();
        (tables.len() as u32).write_le(&mut self.buf);
        self.buf.resize(position + SIZE_UOFFSET * (tables.len() + 1), 0);
        for (index, table) in tables.iter().enumerate() {
            let target = self.write_table(table);
            self.patch(position + SIZE_UOFFSET * (index + 1), target);
        }
        position
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{Builder, TableBuilder};
    use crate::fbs::{Identifier, Table, Verifier, VerifierOptions};

    #[test]
    fn test_layout() -> Result<(), Box<dyn Error>> {
        let id = Identifier::new(b"LYT0");
        let table = TableBuilder::new().scalar(0, 1u8).scalar(1, 2u64).vector(2, &[3u64]);
        let buffer = Builder::finish::<()>(table, Some(id));
        let bytes = buffer.as_ref();

        assert_eq!(Identifier::read(bytes), Some(id));
        let root = u32::from_le_bytes(bytes[..4].try_into()?) as usize;
        assert_eq!(root, buffer.root());
        assert_eq!(root % 8, 0);

        let table = Table::new(bytes, root);
        let field = table.field_position(1).ok_or("missing field")?;
        assert_eq!(field % 8, 0);
        assert_eq!(table.get(0, 0u8), 1);
        assert_eq!(table.get(1, 0u64), 2);
        assert_eq!(table.get_vector::<u64>(2).ok_or("missing vector")?.get(0), Some(3));

        let mut verifier = Verifier::new(bytes, VerifierOptions::default());
        let root = verifier.header(Some(id))?;
        verifier
            .table(root)?
            .scalar::<u8>(0, "a", true)?
            .scalar::<u64>(1, "b", true)?
            .vector::<u64>(2, "c", true)?
            .finish()?;
        Ok(())
    }

    #[test]
    fn test_overwrite_slot() {
        let table = TableBuilder::new().scalar(0, 1u32).scalar(0, 2u32);
        let buffer = Builder::finish::<()>(table, None);
        let table = Table::new(buffer.as_ref(), buffer.root());
        assert_eq!(table.get(0, 0u32), 2);
    }

    #[test]
    fn test_empty() {
        let buffer = Builder::finish::<()>(TableBuilder::new(), None);
        let table = Table::new(buffer.as_ref(), buffer.root());
        assert_eq!(table.get(0, 9u32), 9);
        assert!(table.get_str(1).is_none());
    }
}

use std::{fmt, str::FromStr};

use derive_more::From;
use half::f16;
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::ErrorKind,
    hal::cpu::{self, KernelError, check_len, element_count},
    loom::{
        num::{DataType, DataTypeError, Scalar, Zero},
        shape::Shape,
    },
};

/// Runs `$body` with `$t` aliased to the element type named by `$data_type`.
macro_rules! with_any_type {
    ($data_type:expr, $t:ident => $body:expr) => {
        match $data_type {
            $crate::loom::num::DataType::I8 => {
                type $t = i8;
                $body
            }
            $crate::loom::num::DataType::I16 => {
                type $t = i16;
                $body
            }
            $crate::loom::num::DataType::I32 => {
                type $t = i32;
                $body
            }
            $crate::loom::num::DataType::I64 => {
                type $t = i64;
                $body
            }
            $crate::loom::num::DataType::U8 => {
                type $t = u8;
                $body
            }
            $crate::loom::num::DataType::U16 => {
                type $t = u16;
                $body
            }
            $crate::loom::num::DataType::U32 => {
                type $t = u32;
                $body
            }
            $crate::loom::num::DataType::U64 => {
                type $t = u64;
                $body
            }
            $crate::loom::num::DataType::F16 => {
                type $t = ::half::f16;
                $body
            }
            $crate::loom::num::DataType::F32 => {
                type $t = f32;
                $body
            }
            $crate::loom::num::DataType::F64 => {
                type $t = f64;
                $body
            }
        }
    };
}

/// Like [`with_any_type`], restricted to integer types; evaluates `$err` for the others.
macro_rules! with_integer_type {
    ($data_type:expr, $t:ident => $body:expr, $err:expr) => {
        match $data_type {
            $crate::loom::num::DataType::I8 => {
                type $t = i8;
                $body
            }
            $crate::loom::num::DataType::I16 => {
                type $t = i16;
                $body
            }
            $crate::loom::num::DataType::I32 => {
                type $t = i32;
                $body
            }
            $crate::loom::num::DataType::I64 => {
                type $t = i64;
                $body
            }
            $crate::loom::num::DataType::U8 => {
                type $t = u8;
                $body
            }
            $crate::loom::num::DataType::U16 => {
                type $t = u16;
                $body
            }
            $crate::loom::num::DataType::U32 => {
                type $t = u32;
                $body
            }
            $crate::loom::num::DataType::U64 => {
                type $t = u64;
                $body
            }
            _ => $err,
        }
    };
}

/// Like [`with_any_type`], restricted to floating point types; evaluates `$err` for the others.
macro_rules! with_float_type {
    ($data_type:expr, $t:ident => $body:expr, $err:expr) => {
        match $data_type {
            $crate::loom::num::DataType::F16 => {
                type $t = ::half::f16;
                $body
            }
            $crate::loom::num::DataType::F32 => {
                type $t = f32;
                $body
            }
            $crate::loom::num::DataType::F64 => {
                type $t = f64;
                $body
            }
            _ => $err,
        }
    };
}

/// Runs `$body` with `$data` bound to the typed vector inside `$buffer`.
macro_rules! with_buffer {
    ($buffer:expr, $data:ident => $body:expr) => {
        match $buffer {
            Buffer::I8($data) => $body,
            Buffer::I16($data) => $body,
            Buffer::I32($data) => $body,
            Buffer::I64($data) => $body,
            Buffer::U8($data) => $body,
            Buffer::U16($data) => $body,
            Buffer::U32($data) => $body,
            Buffer::U64($data) => $body,
            Buffer::F16($data) => $body,
            Buffer::F32($data) => $body,
            Buffer::F64($data) => $body,
        }
    };
}

pub(crate) use with_any_type;
pub(crate) use with_float_type;
pub(crate) use with_integer_type;

/// Host storage of one element type.
#[derive(Debug, Clone, PartialEq, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Buffer {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Buffer {
    pub fn zeros(data_type: DataType, len: usize) -> Self {
        with_any_type!(data_type, T => Buffer::from(vec![T::zero(); len]))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Buffer::I8(_) => DataType::I8,
            Buffer::I16(_) => DataType::I16,
            Buffer::I32(_) => DataType::I32,
            Buffer::I64(_) => DataType::I64,
            Buffer::U8(_) => DataType::U8,
            Buffer::U16(_) => DataType::U16,
            Buffer::U32(_) => DataType::U32,
            Buffer::U64(_) => DataType::U64,
            Buffer::F16(_) => DataType::F16,
            Buffer::F32(_) => DataType::F32,
            Buffer::F64(_) => DataType::F64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        with_buffer!(self, data => data.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        with_buffer!(self, data => bytemuck::cast_slice(&data[..]))
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        with_buffer!(self, data => bytemuck::cast_slice_mut(&mut data[..]))
    }

    fn type_error<T: Scalar>(&self) -> KernelError {
        KernelError::Type {
            expected: T::DATA_TYPE,
            found: self.data_type(),
        }
    }

    pub fn as_slice<T: Scalar>(&self) -> Result<&[T], KernelError> {
        match self.data_type() == T::DATA_TYPE {
            true => bytemuck::try_cast_slice(self.as_bytes()).map_err(|_| self.type_error::<T>()),
            false => Err(self.type_error::<T>()),
        }
    }

    pub fn as_mut_slice<T: Scalar>(&mut self) -> Result<&mut [T], KernelError> {
        let err = self.type_error::<T>();
        match self.data_type() == T::DATA_TYPE {
            true => bytemuck::try_cast_slice_mut(self.as_bytes_mut()).map_err(|_| err),
            false => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("buffer view `{0}` has no `=` between shape and values")]
    Format(String),
    #[error("invalid dimension `{0}`")]
    Dim(String),
    #[error(transparent)]
    DataType(#[from] DataTypeError),
    #[error("invalid {data_type} value `{value}`")]
    Value { data_type: DataType, value: String },
    #[error("shape needs {expected} values, found {found}")]
    Count { expected: usize, found: usize },
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// A shaped, typed host buffer.
///
/// Its text form is `AxBx...xTYPE=v0,v1,...`, for example `2x2xi32=1,2,3,4`, or `TYPE=v` for a
/// scalar. Values may be separated by commas or whitespace; a single value fills the whole shape.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferView {
    shape: Shape,
    buffer: Buffer,
}

impl BufferView {
    pub fn new(shape: impl Into<Shape>, buffer: impl Into<Buffer>) -> Result<Self, KernelError> {
        let shape = shape.into();
        let buffer = buffer.into();
        check_len(element_count(&shape)?, buffer.len())?;
        Ok(Self { shape, buffer })
    }

    pub fn zeros(shape: impl Into<Shape>, data_type: DataType) -> Result<Self, KernelError> {
        let shape = shape.into();
        let buffer = Buffer::zeros(data_type, element_count(&shape)?);
        Ok(Self { shape, buffer })
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.buffer.data_type()
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    #[inline]
    pub fn into_buffer(self) -> Buffer {
        self.buffer
    }

    #[inline]
    pub fn as_slice<T: Scalar>(&self) -> Result<&[T], KernelError> {
        self.buffer.as_slice()
    }

    #[inline]
    pub fn as_mut_slice<T: Scalar>(&mut self) -> Result<&mut [T], KernelError> {
        self.buffer.as_mut_slice()
    }
}

impl fmt::Display for BufferView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dim in self.shape.iter() {
            write!(f, "{dim}x")?;
        }
        write!(f, "{}=", self.data_type())?;
        with_buffer!(&self.buffer, data => write!(f, "{}", data.iter().format(",")))
    }
}

fn parse_values<T>(
    values: &[&str],
    data_type: DataType,
    size: usize,
) -> Result<Buffer, ParseError>
where
    T: Scalar + FromStr,
    Buffer: From<Vec<T>>,
{
    let values = values
        .iter()
        .map(|&value| {
            value.parse::<T>().map_err(|_| ParseError::Value {
                data_type,
                value: value.to_owned(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.len() {
        len if len == size => Ok(values.into()),
        1 => {
            let mut data = vec![T::zero(); size];
            cpu::broadcast(&values, &mut data)?;
            Ok(data.into())
        }
        found => Err(ParseError::Count {
            expected: size,
            found,
        }),
    }
}

impl FromStr for BufferView {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, values) = s.split_once('=').ok_or_else(|| ParseError::Format(s.to_owned()))?;
        let mut parts = head.trim().split('x').collect_vec();
        let data_type: DataType = parts.pop().unwrap_or_default().trim().parse()?;
        let dims = parts
            .into_iter()
            .map(|dim| {
                let dim = dim.trim();
                dim.parse::<usize>().map_err(|_| ParseError::Dim(dim.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let shape = Shape::from(dims);

        let values = values
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|value| !value.is_empty())
            .collect_vec();
        let size = element_count(&shape)?;
        let buffer = with_any_type!(data_type, T => parse_values::<T>(&values, data_type, size)?);
        Ok(Self { shape, buffer })
    }
}

use std::fmt;

use derive_more::{From, Into};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A four-character code naming the format of an executable's contents.
///
/// Packed big-endian: the first character lands in the most significant byte.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExecutableFormat(u32);

impl ExecutableFormat {
    /// Four spaces: no format specified.
    pub const UNSPECIFIED: Self = Self::from_four_cc(*b"    ");
    pub const MLIR: Self = Self::from_four_cc(*b"MLIR");
    /// Bytecode for this crate's VM. Its encoding is not shared with other runtimes' bytecode, so
    /// it carries its own code rather than theirs.
    pub const BYTECODE: Self = Self::from_four_cc(*b"VMBC");
    pub const SPIRV: Self = Self::from_four_cc(*b"SPVE");

    #[inline]
    pub const fn from_four_cc(code: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(code))
    }

    #[inline]
    pub const fn four_cc(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ExecutableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.four_cc();
        match code.iter().all(|c| c.is_ascii_graphic() || *c == b' ') {
            true => write!(f, "{}", code.escape_ascii()),
            false => write!(f, "{:#010x}", self.0),
        }
    }
}

impl fmt::Debug for ExecutableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecutableFormat(\"{self}\")")
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutableFormat;

    #[test]
    fn test_four_cc() {
        let mlir = ExecutableFormat::MLIR;
        assert_eq!(u32::from(mlir), 0x4d4c_4952);
        assert_eq!(mlir.four_cc(), *b"MLIR");
        assert_eq!(mlir.to_string(), "MLIR");
        assert_eq!(ExecutableFormat::UNSPECIFIED.to_string(), "    ");
        assert_eq!(ExecutableFormat::BYTECODE.four_cc(), *b"VMBC");
        assert_eq!(ExecutableFormat::from(0x0102_0304).to_string(), "0x01020304");
        assert_ne!(ExecutableFormat::default(), ExecutableFormat::UNSPECIFIED);
    }
}

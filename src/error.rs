use derive_more::Display;
use thiserror::Error;

use crate::{
    fbs::VerifyError,
    hal::{cpu::KernelError, view::ParseError},
    module::LoadError,
};

/// Coarse classification shared by every error the crate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// A malformed request: bad shapes, spans, axes, element types or text.
    InvalidArgument,
    /// A buffer failed structural verification.
    Verification,
    /// The backing resource could not be obtained.
    Resource,
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Verify(err) => err.kind(),
            Error::Load(err) => err.kind(),
            Error::Kernel(err) => err.kind(),
            Error::Parse(err) => err.kind(),
            Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

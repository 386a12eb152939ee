//! Handles over serialized modules.
//!
//! A [`ModuleFile`] pairs a byte buffer with the position of its root table and an optional
//! release action. Bytes arriving from outside are verified once, at construction; after that,
//! reads through [`ModuleFile::root`] are zero-copy and never leave the buffer.
//!
//! Backing storage may be borrowed, owned, memory-mapped, or shared with the other members of a
//! share group. Whatever the backing, the release action runs exactly once, when the last handle
//! referencing the buffer is dropped.

use std::{
    fmt,
    fs::File,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Arc,
};

use derive_more::{Deref, Display};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backing::{Owner, ReleaseAction};
pub use schema::{
    ExecutableDef, ExecutableDefArgs, FunctionDef, FunctionDefArgs, Module, ModuleDef,
    ModuleDefArgs,
};

use self::backing::Backing;
use crate::{
    error::ErrorKind,
    fbs::{FinishedBuffer, Follow, Identifier, Table, Verifier, VerifierOptions, VerifyError},
};

mod backing;
mod schema;

/// A schema whose root table can be verified and viewed.
pub trait Root {
    /// Read-only accessor over the root table.
    type View<'a>: Follow<'a>;

    /// Verifies the root table at `position` and everything reachable from it.
    fn verify(verifier: &mut Verifier<'_>, position: usize) -> Result<(), VerifyError>;
}

#[derive(Debug, Default, Display, Clone, Copy, PartialEq, Eq, Hash, Deref)]
pub struct BufferId(uid::Id<BufferId>);

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("module verification failed: {0}")]
    Verify(#[from] VerifyError),
    #[error("failed to read module file `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Verify(_) => ErrorKind::Verification,
            LoadError::Io { .. } => ErrorKind::Resource,
        }
    }
}

/// A handle over a serialized module whose root table is of schema `T`.
pub struct ModuleFile<'a, T> {
    id: BufferId,
    backing: Backing<'a>,
    root: usize,
    release: Option<ReleaseAction<'a>>,
    phantom: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for ModuleFile<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleFile")
            .field("id", &self.id)
            .field("backing", &self.backing)
            .field("root", &self.root)
            .field("release", &self.release.is_some())
            .finish()
    }
}

impl<T> Drop for ModuleFile<'_, T> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            log::trace!("release module buffer {}", self.id);
            release();
        }
    }
}

impl<T> AsRef<[u8]> for ModuleFile<'_, T> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.backing.bytes()
    }
}

impl<'a, T> ModuleFile<'a, T> {
    fn from_parts(backing: Backing<'a>, root: usize, release: Option<ReleaseAction<'a>>) -> Self {
        Self {
            id: BufferId(uid::Id::new()),
            backing,
            root,
            release,
            phantom: PhantomData,
        }
    }

    /// Identity of the underlying buffer. All members of a share group report the same id.
    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    #[inline]
    pub fn root_position(&self) -> usize {
        self.root
    }
}

/// Root position of a buffer accepted without verification. Only the header offset is checked.
fn trusted_root(bytes: &[u8]) -> Result<usize, VerifyError> {
    Verifier::new(bytes, VerifierOptions::default()).header(None)
}

impl<'a, T: Root> ModuleFile<'a, T> {
    #[inline]
    pub fn root(&self) -> T::View<'_> {
        Follow::follow(Table::new(self.bytes(), self.root))
    }

    /// Wraps trusted `bytes` and runs `release` when the handle is dropped.
    ///
    /// Nothing but the root offset is checked. On failure `release` is dropped without running.
    pub fn create(
        bytes: &'a [u8],
        release: impl FnOnce() + Send + Sync + 'a,
    ) -> Result<Self, LoadError> {
        let root = trusted_root(bytes)?;
        Ok(Self::from_parts(Backing::Borrowed(bytes), root, Some(Box::new(release))))
    }

    /// Wraps trusted `bytes` the caller keeps alive.
    pub fn wrap(bytes: &'a [u8]) -> Result<Self, LoadError> {
        let root = trusted_root(bytes)?;
        Ok(Self::from_parts(Backing::Borrowed(bytes), root, None))
    }

    /// Takes ownership of a buffer produced by the [`Builder`](crate::fbs::Builder).
    ///
    /// The builder accepts any table for any schema tag, so the bytes are verified against `T`
    /// like any other buffer.
    pub fn with_backing_buffer(buffer: FinishedBuffer<T>) -> Result<Self, LoadError> {
        let root = Loader::default().verify::<T>(buffer.as_ref())?;
        let bytes = buffer.into_bytes();
        Ok(Self::from_parts(Backing::Owned(Box::new(bytes)), root, None))
    }

    /// Verifies external `bytes` and runs `release` when the handle is dropped.
    /// On failure `release` is dropped without running.
    pub fn wrap_external(
        identifier: Option<Identifier>,
        bytes: &'a [u8],
        release: impl FnOnce() + Send + Sync + 'a,
    ) -> Result<Self, LoadError> {
        Loader::new(identifier).wrap_external(bytes, release)
    }

    /// Verifies `bytes` the caller keeps alive.
    pub fn wrap_buffer(identifier: Option<Identifier>, bytes: &'a [u8]) -> Result<Self, LoadError> {
        Loader::new(identifier).wrap_buffer(bytes)
    }

    /// Verifies the bytes of `owner` and keeps it alive for as long as the handle.
    pub fn from_owned(
        identifier: Option<Identifier>,
        owner: impl AsRef<[u8]> + Send + Sync + 'a,
    ) -> Result<Self, LoadError> {
        Loader::new(identifier).from_owned(owner)
    }

    /// Splits the handle into `count` handles over the same buffer.
    ///
    /// The release action of `self` runs once, after the last member is dropped. With a `count`
    /// of zero it runs immediately.
    pub fn share_group(self, count: usize) -> Vec<Self>
    where
        T: 'a,
    {
        let id = self.id;
        let root = self.root;
        log::debug!("share module buffer {id} across {count} handles");

        let shared: Arc<Owner<'a>> = Arc::new(self);
        (0..count)
            .map(|_| Self {
                id,
                backing: Backing::Shared(shared.clone()),
                root,
                release: None,
                phantom: PhantomData,
            })
            .collect()
    }
}

impl<T: Root> ModuleFile<'static, T> {
    pub fn from_vec(identifier: Option<Identifier>, bytes: Vec<u8>) -> Result<Self, LoadError> {
        Loader::new(identifier).from_vec(bytes)
    }

    pub fn from_string(identifier: Option<Identifier>, string: String) -> Result<Self, LoadError> {
        Loader::new(identifier).from_string(string)
    }

    pub fn load_file(
        identifier: Option<Identifier>,
        path: impl AsRef<Path>,
    ) -> Result<Self, LoadError> {
        Loader::new(identifier).load_file(path)
    }
}

/// Verification settings shared by every constructor that accepts untrusted bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Loader {
    /// Identifier the buffer must carry, if any.
    pub identifier: Option<Identifier>,
    pub options: VerifierOptions,
}

impl Loader {
    pub fn new(identifier: Option<Identifier>) -> Self {
        Self {
            identifier,
            options: Default::default(),
        }
    }

    pub fn with_options(self, options: VerifierOptions) -> Self {
        Self { options, ..self }
    }

    /// Verifies `bytes` against schema `T` and returns the root position.
    pub fn verify<T: Root>(&self, bytes: &[u8]) -> Result<usize, VerifyError> {
        let mut verifier = Verifier::new(bytes, self.options);
        let root = verifier.header(self.identifier)?;
        T::verify(&mut verifier, root)?;
        Ok(root)
    }

    pub fn wrap_external<'a, T: Root>(
        &self,
        bytes: &'a [u8],
        release: impl FnOnce() + Send + Sync + 'a,
    ) -> Result<ModuleFile<'a, T>, LoadError> {
        let root = self.verify::<T>(bytes)?;
        let release: ReleaseAction<'a> = Box::new(release);
        Ok(ModuleFile::from_parts(Backing::Borrowed(bytes), root, Some(release)))
    }

    pub fn wrap_buffer<'a, T: Root>(
        &self,
        bytes: &'a [u8],
    ) -> Result<ModuleFile<'a, T>, LoadError> {
        let root = self.verify::<T>(bytes)?;
        Ok(ModuleFile::from_parts(Backing::Borrowed(bytes), root, None))
    }

    pub fn from_owned<'a, T: Root>(
        &self,
        owner: impl AsRef<[u8]> + Send + Sync + 'a,
    ) -> Result<ModuleFile<'a, T>, LoadError> {
        let root = self.verify::<T>(owner.as_ref())?;
        Ok(ModuleFile::from_parts(Backing::Owned(Box::new(owner)), root, None))
    }

    pub fn from_vec<T: Root>(&self, bytes: Vec<u8>) -> Result<ModuleFile<'static, T>, LoadError> {
        self.from_owned(bytes)
    }

    pub fn from_string<T: Root>(
        &self,
        string: String,
    ) -> Result<ModuleFile<'static, T>, LoadError> {
        self.from_owned(string)
    }

    /// Loads a module file, memory-mapping it when the `mmap` feature is enabled.
    #[cfg_attr(feature = "trace", tracing::instrument(level = "trace", skip_all))]
    pub fn load_file<T: Root>(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ModuleFile<'static, T>, LoadError> {
        let path = path.as_ref();
        let io = |source| LoadError::Io {
            path: path.to_owned(),
            source,
        };

        let file = File::open(path).map_err(io)?;
        let len = file.metadata().map_err(io)?.len();
        if len == 0 {
            log::warn!("module file `{}` is empty", path.display());
            return Err(VerifyError::TooSmall(0).into());
        }

        #[cfg(feature = "mmap")]
        let backing = {
            // SAFETY: the mapping is read-only and lives inside the handle; the file must not be
            // truncated or rewritten while the handle exists.
            let map = unsafe { memmap2::Mmap::map(&file) }.map_err(io)?;
            Backing::Mapped(map)
        };
        #[cfg(not(feature = "mmap"))]
        let backing = {
            use std::io::Read;
            let mut file = file;
            let mut bytes = Vec::with_capacity(len as usize);
            file.read_to_end(&mut bytes).map_err(io)?;
            Backing::Owned(Box::new(bytes))
        };

        let root = match self.verify::<T>(backing.bytes()) {
            Ok(root) => root,
            Err(err) => {
                log::warn!("module file `{}` failed verification: {err}", path.display());
                return Err(err.into());
            }
        };
        log::debug!("loaded module file `{}` ({len} bytes)", path.display());
        Ok(ModuleFile::from_parts(backing, root, None))
    }
}

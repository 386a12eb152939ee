use std::{fmt, sync::Arc};

/// Work run exactly once when the last handle over a buffer goes away.
pub type ReleaseAction<'a> = Box<dyn FnOnce() + Send + Sync + 'a>;

/// Anything that owns a contiguous run of bytes and can be moved across threads.
pub type Owner<'a> = dyn AsRef<[u8]> + Send + Sync + 'a;

/// Storage a module handle reads its bytes from.
pub(crate) enum Backing<'a> {
    /// Memory kept alive by the caller.
    Borrowed(&'a [u8]),
    /// A container the handle owns and drops after its release action.
    Owned(Box<Owner<'a>>),
    /// A read-only file mapping.
    #[cfg(feature = "mmap")]
    Mapped(memmap2::Mmap),
    /// A handle of a share group, keeping the original alive.
    Shared(Arc<Owner<'a>>),
}

impl Backing<'_> {
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Backing::Borrowed(bytes) => bytes,
            Backing::Owned(owner) => (**owner).as_ref(),
            #[cfg(feature = "mmap")]
            Backing::Mapped(map) => &map[..],
            Backing::Shared(owner) => (**owner).as_ref(),
        }
    }
}

impl fmt::Debug for Backing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Backing::Borrowed(_) => "Borrowed",
            Backing::Owned(_) => "Owned",
            #[cfg(feature = "mmap")]
            Backing::Mapped(_) => "Mapped",
            Backing::Shared(_) => "Shared",
        };
        f.debug_struct(kind).field("len", &self.bytes().len()).finish()
    }
}

//! Storage substrates an [`super::AtomicBuffer`] can be built over.
//!
//! Modeled as an enum rather than an inheritance chain: the same
//! ordered-accessor surface works whether the bytes live on the heap, in a
//! caller-owned slice, or in a memory-mapped file.

use std::cell::UnsafeCell;
use std::marker::PhantomData;

#[cfg(feature = "mmap")]
use std::fs::File;
#[cfg(feature = "mmap")]
use std::os::unix::io::AsRawFd;

/// The storage a buffer view is built over.
///
/// `'a` binds the lifetime of a [`Backing::Borrowed`] view to the caller's
/// slice; owning variants (`Heap`, `Mapped`) are unconstrained by it.
pub(crate) enum Backing<'a> {
    /// Heap-allocated, owned by this buffer. Wrapped in `UnsafeCell` because
    /// typed accessors cast into it through atomic pointers under `&self`,
    /// never materializing a conflicting `&mut [u8]`.
    Heap(UnsafeCell<Box<[u8]>>),
    /// A non-owning view over caller-managed memory (on-heap or off-heap).
    /// The caller is responsible for keeping the memory alive and exclusive
    /// of conflicting access for `'a`; `wrap` is documented as not
    /// thread-safe for this reason.
    Borrowed {
        ptr: *mut u8,
        len: usize,
        _marker: PhantomData<&'a mut [u8]>,
    },
    /// A memory-mapped file region, used by [`crate::markfile::MarkFile`] and
    /// any caller wanting cross-process shared memory.
    #[cfg(feature = "mmap")]
    Mapped(MappedRegion),
}

impl<'a> Backing<'a> {
    pub(crate) fn from_heap(bytes: Box<[u8]>) -> Self {
        Backing::Heap(UnsafeCell::new(bytes))
    }

    /// # Safety
    /// The caller must ensure `ptr` is valid for reads/writes of `len` bytes
    /// for at least `'a`, and that no other code mutates it for `'a` except
    /// through the returned buffer's own ordered accessors.
    pub(crate) unsafe fn from_raw(ptr: *mut u8, len: usize) -> Self {
        Backing::Borrowed {
            ptr,
            len,
            _marker: PhantomData,
        }
    }

    pub(crate) fn base_ptr(&self) -> *mut u8 {
        match self {
            Backing::Heap(cell) => {
                // SAFETY: `get` only returns the raw pointer; no aliasing
                // reference is created here. Callers cast it into atomic
                // pointers themselves.
                unsafe { (*cell.get()).as_mut_ptr() }
            }
            Backing::Borrowed { ptr, .. } => *ptr,
            #[cfg(feature = "mmap")]
            Backing::Mapped(region) => region.ptr,
        }
    }

    pub(crate) fn underlying_len(&self) -> usize {
        match self {
            Backing::Heap(cell) => {
                // SAFETY: reading `len()` of the boxed slice does not alias
                // any concurrent byte access; slice length is fixed at
                // construction.
                unsafe { (*cell.get()).len() }
            }
            Backing::Borrowed { len, .. } => *len,
            #[cfg(feature = "mmap")]
            Backing::Mapped(region) => region.len,
        }
    }

    /// Whether this backing is an on-heap `Box<[u8]>`/borrowed array, as
    /// opposed to off-heap/mapped memory. Strict alignment mode refuses
    /// ordered access to heap-array backings.
    pub(crate) fn is_heap_array(&self) -> bool {
        matches!(self, Backing::Heap(_) | Backing::Borrowed { .. })
    }
}

#[cfg(feature = "mmap")]
pub(crate) struct MappedRegion {
    ptr: *mut u8,
    len: usize,
    _file: File,
}

#[cfg(feature = "mmap")]
impl MappedRegion {
    pub(crate) fn map(file: File, len: usize) -> std::io::Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(std::io::Error::last_os_error());
        }
        Ok(Self {
            ptr: ptr.cast::<u8>(),
            len,
            _file: file,
        })
    }
}

#[cfg(feature = "mmap")]
impl Drop for MappedRegion {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` describe exactly the mapping created in `map`.
        unsafe {
            libc::munmap(self.ptr.cast::<libc::c_void>(), self.len);
        }
    }
}

// SAFETY: the pointer is only ever dereferenced through the atomic/raw
// accessors on `AtomicBuffer`, which are themselves `Send + Sync` for the
// same reason any `Arc<AtomicU64>`-style type is: concurrent access is via
// atomic instructions or is documented as the caller's responsibility.
unsafe impl Send for Backing<'_> {}
unsafe impl Sync for Backing<'_> {}

//! # Float slab
//!
//! One anonymous, zero-filled mapping holding every codebook center of a
//! quantizer. The mapping is released exactly once, on drop.

use core::ffi::c_void;
use core::ptr::NonNull;

use nix::sys::mman::{mprotect, ProtFlags};

/// A zero-filled, page-aligned block of `f32`s.
///
/// Can be sealed read-only once its contents are final; the hardware then
/// traps any stray write into trained tables.
pub struct FloatSlab {
    base: NonNull<f32>,
    len: usize,
    sealed: bool,
}

impl FloatSlab {
    /// Maps `len` zeroed floats.
    ///
    /// ## Panics
    /// Allocation failure is fatal: panics if the mapping cannot be created.
    pub fn zeroed(len: usize) -> Self {
        if len == 0 {
            return Self {
                base: NonNull::dangling(),
                len: 0,
                sealed: false,
            };
        }

        let total_len = len * core::mem::size_of::<f32>();
        // # Safety: A fresh private anonymous mapping aliases nothing.
        // The kernel hands it back zero-filled and page-aligned.
        let addr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                total_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if addr == libc::MAP_FAILED {
            panic!("FloatSlab: mmap of {} bytes failed", total_len);
        }

        let Some(base) = NonNull::new(addr as *mut f32) else {
            panic!("FloatSlab: mmap returned null");
        };
        tracing::debug!(bytes = total_len, "FloatSlab: mapped");

        Self {
            base,
            len,
            sealed: false,
        }
    }

    /// Number of floats in the slab.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len * core::mem::size_of::<f32>()
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    #[inline]
    pub fn as_floats(&self) -> &[f32] {
        // # Safety: `base` is either dangling with `len == 0` or a live
        // mapping of exactly `len` floats owned by `self`.
        unsafe { core::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    /// ## Panics
    /// Panics once the slab is sealed.
    #[inline]
    pub fn as_floats_mut(&mut self) -> &mut [f32] {
        assert!(!self.sealed, "FloatSlab: write to a sealed slab");
        // # Safety: as in `as_floats`; `&mut self` guarantees exclusivity.
        unsafe { core::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        // # Safety: every bit pattern of an f32 is a valid byte sequence.
        unsafe { core::slice::from_raw_parts(self.base.as_ptr() as *const u8, self.byte_len()) }
    }

    /// ## Panics
    /// Panics once the slab is sealed.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        assert!(!self.sealed, "FloatSlab: write to a sealed slab");
        // # Safety: every byte sequence is a valid f32 bit pattern.
        unsafe { core::slice::from_raw_parts_mut(self.base.as_ptr() as *mut u8, self.byte_len()) }
    }

    /// Drops write access to the mapping. Idempotent.
    pub fn seal(&mut self) {
        if self.sealed {
            return;
        }
        self.sealed = true;
        if self.len == 0 {
            return;
        }
        // # Safety: the range is exactly the live mapping created in `zeroed`,
        // and no `&mut` view can outlive the `&mut self` borrow taken here.
        let res = unsafe {
            mprotect(
                self.base.cast::<c_void>(),
                self.byte_len(),
                ProtFlags::PROT_READ,
            )
        };
        if let Err(e) = res {
            // The slab is still logically read-only; only the hardware trap is lost.
            tracing::warn!(error = %e, "FloatSlab: mprotect seal failed");
        }
    }
}

impl Drop for FloatSlab {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        // # Safety: base and byte_len describe the mapping owned by this struct.
        unsafe {
            libc::munmap(self.base.as_ptr() as *mut c_void, self.byte_len());
        }
    }
}

impl core::fmt::Debug for FloatSlab {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FloatSlab")
            .field("len", &self.len)
            .field("sealed", &self.sealed)
            .finish()
    }
}

// # Safety: the slab owns its mapping outright; shared access is read-only.
unsafe impl Send for FloatSlab {}
unsafe impl Sync for FloatSlab {}

static_assertions::assert_impl_all!(FloatSlab: Send, Sync);

//! The memory region every pass walks over.

use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::geometry::Geometry;

/// Size of one word of the region, the unit chain entries are made of.
pub const WORD: usize = std::mem::size_of::<u64>();

/// Hands out the region for a run.
pub trait Provision {
    fn provision(&self, geometry: &Geometry) -> Result<Region>;
}

/// Anonymous private mapping, zero filled and page aligned.
#[derive(Clone, Copy, Debug, Default)]
pub struct MmapProvisioner;

impl Provision for MmapProvisioner {
    fn provision(&self, geometry: &Geometry) -> Result<Region> {
        let bytes = geometry.validate()?;

        let ptr = unsafe {
            rustix::mm::mmap_anonymous(
                std::ptr::null_mut(),
                bytes,
                rustix::mm::ProtFlags::READ | rustix::mm::ProtFlags::WRITE,
                rustix::mm::MapFlags::PRIVATE,
            )
        }
        .map_err(|errno| Error::Allocation {
            bytes,
            source: errno.into(),
        })?;

        let ptr = NonNull::new(ptr as *mut u8).ok_or_else(|| Error::Allocation {
            bytes,
            source: std::io::Error::from(std::io::ErrorKind::OutOfMemory),
        })?;

        log::debug!("mapped {} bytes at {:?}", bytes, ptr);
        Ok(Region {
            ptr,
            len: bytes,
            line_size: geometry.line_size,
        })
    }
}

/// A mapped buffer, owned for the whole run and unmapped on drop.
#[derive(Debug)]
pub struct Region {
    ptr: NonNull<u8>,
    len: usize,
    line_size: usize,
}

impl Region {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn line_size(&self) -> usize {
        self.line_size
    }

    pub fn lines(&self) -> usize {
        self.len / self.line_size
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// The region as 64 bit words. Page alignment and a line size of at
    /// least 32 bytes keep this exact.
    pub fn words_mut(&mut self) -> &mut [u64] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr() as *mut u64, self.len / WORD) }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        let unmapped = unsafe { rustix::mm::munmap(self.ptr.as_ptr().cast(), self.len) };
        if let Err(e) = unmapped {
            log::warn!("unable to unmap {} bytes at {:?}: {}", self.len, self.ptr, e);
        }
    }
}

//! Checked reads from memory the overlay does not own.
//!
//! Every address handed to the overlay comes from the host process and may be
//! unmapped, freed or relocated between two frames. Nothing outside this module
//! dereferences such an address: callers go through a [`MemorySource`], which
//! probes the range first and reports [`MemoryError::Unreadable`] instead of
//! faulting.

use bytemuck::Pod;
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory at {address:#x} ({len} bytes) is not readable")]
    Unreadable { address: usize, len: usize },
}

/// Readable view of some address space
pub trait MemorySource: Send + Sync {
    /// Fill `buf` with the bytes at `[address, address + buf.len())`, or fail
    /// without touching the range if any part of it is not readable.
    fn try_read(&self, address: usize, buf: &mut [u8]) -> Result<(), MemoryError>;
}

/// Read any plain-old-data value
pub fn read<T: Pod>(source: &(impl MemorySource + ?Sized), address: usize) -> Result<T, MemoryError> {
    let mut value = T::zeroed();
    source.try_read(address, bytemuck::bytes_of_mut(&mut value))?;
    Ok(value)
}

/// Read one float
pub fn read_f32(source: &(impl MemorySource + ?Sized), address: usize) -> Result<f32, MemoryError> {
    read::<f32>(source, address)
}

/// Read `N` floats spaced `stride` elements apart, starting at `address`.
/// A stride of 0 is treated as tightly packed.
pub fn read_strided<const N: usize>(
    source: &(impl MemorySource + ?Sized),
    address: usize,
    stride: u32,
) -> Result<[f32; N], MemoryError> {
    let step = (stride.max(1) as usize)
        .checked_mul(std::mem::size_of::<f32>())
        .ok_or(MemoryError::Unreadable { address, len: 0 })?;

    let mut values = [0.0f32; N];
    for (i, value) in values.iter_mut().enumerate() {
        let element = i
            .checked_mul(step)
            .and_then(|offset| address.checked_add(offset))
            .ok_or_else(|| MemoryError::Unreadable { address, len: step.saturating_mul(N) })?;
        *value = read_f32(source, element)?;
    }
    Ok(values)
}

/// End of the range, rejecting null and overflowing ranges
fn checked_end(address: usize, len: usize) -> Result<usize, MemoryError> {
    let unreadable = MemoryError::Unreadable { address, len };
    if address == 0 {
        return Err(unreadable);
    }
    address.checked_add(len).ok_or(unreadable)
}

// ============================================================================
// Current process
// ============================================================================

/// The address space of the process the overlay is loaded into
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessMemory;

impl ProcessMemory {
    pub fn new() -> Self {
        Self
    }
}

impl MemorySource for ProcessMemory {
    fn try_read(&self, address: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
        let end = checked_end(address, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        platform::read(address, end, buf)
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::MemoryError;

    /// Let the kernel validate and copy the range in one step. If the syscall
    /// is filtered out, fall back to the protection bits in `/proc/self/maps`.
    pub(super) fn read(address: usize, end: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
        let unreadable = MemoryError::Unreadable { address, len: buf.len() };

        let local = libc::iovec {
            iov_base: buf.as_mut_ptr().cast(),
            iov_len: buf.len(),
        };
        let remote = libc::iovec {
            iov_base: address as *mut libc::c_void,
            iov_len: buf.len(),
        };

        // SAFETY: the kernel performs the remote read and reports EFAULT for
        // unmapped pages; `local` covers exactly `buf`.
        let copied = unsafe { libc::process_vm_readv(libc::getpid(), &local, 1, &remote, 1, 0) };
        if copied >= 0 {
            return if copied as usize == buf.len() { Ok(()) } else { Err(unreadable) };
        }

        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::ENOSYS) | Some(libc::EPERM) => {
                let maps = std::fs::read_to_string("/proc/self/maps").map_err(|_| unreadable)?;
                if !super::maps_range_readable(&maps, address, end) {
                    return Err(unreadable);
                }
                // SAFETY: every page of the range is mapped with read permission.
                unsafe {
                    std::ptr::copy_nonoverlapping(address as *const u8, buf.as_mut_ptr(), buf.len());
                }
                Ok(())
            }
            _ => Err(unreadable),
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::MemoryError;
    use winapi::um::memoryapi::VirtualQuery;
    use winapi::um::winnt::{
        MEMORY_BASIC_INFORMATION, MEM_COMMIT, PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE,
        PAGE_EXECUTE_WRITECOPY, PAGE_GUARD, PAGE_NOACCESS, PAGE_READONLY, PAGE_READWRITE,
        PAGE_WRITECOPY,
    };

    const READABLE: u32 = PAGE_READONLY
        | PAGE_READWRITE
        | PAGE_WRITECOPY
        | PAGE_EXECUTE_READ
        | PAGE_EXECUTE_READWRITE
        | PAGE_EXECUTE_WRITECOPY;

    fn range_readable(address: usize, end: usize) -> bool {
        let mut cursor = address;
        while cursor < end {
            // SAFETY: MEMORY_BASIC_INFORMATION is plain data; VirtualQuery
            // only writes into it.
            let mut info: MEMORY_BASIC_INFORMATION = unsafe { std::mem::zeroed() };
            let written = unsafe {
                VirtualQuery(
                    cursor as *const _,
                    &mut info,
                    std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if written == 0 || info.State != MEM_COMMIT {
                return false;
            }
            if info.Protect & (PAGE_GUARD | PAGE_NOACCESS) != 0 || info.Protect & READABLE == 0 {
                return false;
            }
            let region_end = (info.BaseAddress as usize).saturating_add(info.RegionSize);
            if region_end <= cursor {
                return false;
            }
            cursor = region_end;
        }
        true
    }

    pub(super) fn read(address: usize, end: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
        if !range_readable(address, end) {
            return Err(MemoryError::Unreadable { address, len: buf.len() });
        }
        // SAFETY: every region in the range is committed and readable.
        unsafe {
            std::ptr::copy_nonoverlapping(address as *const u8, buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
mod platform {
    use super::MemoryError;

    pub(super) fn read(address: usize, _end: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
        Err(MemoryError::Unreadable { address, len: buf.len() })
    }
}

/// Whether `[address, end)` is covered by contiguous readable mappings in a
/// `/proc/<pid>/maps` listing
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn maps_range_readable(maps: &str, address: usize, end: usize) -> bool {
    let mut cursor = address;

    for line in maps.lines() {
        let mut fields = line.split_whitespace();
        let (Some(range), Some(perms)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Some((start, stop)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(stop)) = (usize::from_str_radix(start, 16), usize::from_str_radix(stop, 16)) else {
            continue;
        };

        if stop <= cursor || start > cursor {
            continue;
        }
        if !perms.starts_with('r') {
            return false;
        }
        cursor = stop;
        if cursor >= end {
            return true;
        }
    }
    false
}

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Debug, Clone)]
struct Region {
    base: usize,
    bytes: Vec<u8>,
}

impl Region {
    fn slice(&self, address: usize, len: usize) -> Option<&[u8]> {
        let offset = address.checked_sub(self.base)?;
        self.bytes.get(offset..offset.checked_add(len)?)
    }

    fn slice_mut(&mut self, address: usize, len: usize) -> Option<&mut [u8]> {
        let offset = address.checked_sub(self.base)?;
        self.bytes.get_mut(offset..offset.checked_add(len)?)
    }
}

/// Owned byte regions at synthetic addresses.
///
/// Stands in for a foreign process: regions can be mapped, rewritten and
/// unmapped from any thread while an engine reads from it.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    regions: RwLock<Vec<Region>>,
}

impl MemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `bytes` at `base`, replacing any region already mapped there
    pub fn map(&self, base: usize, bytes: Vec<u8>) {
        let mut regions = self.regions.write();
        regions.retain(|region| region.base != base);
        regions.push(Region { base, bytes });
    }

    pub fn map_f32s(&self, base: usize, values: &[f32]) {
        self.map(base, bytemuck::cast_slice(values).to_vec());
    }

    /// Remove the region at `base`; false if none was mapped there
    pub fn unmap(&self, base: usize) -> bool {
        let mut regions = self.regions.write();
        let before = regions.len();
        regions.retain(|region| region.base != base);
        regions.len() != before
    }

    /// Overwrite bytes inside an existing region
    pub fn write(&self, address: usize, bytes: &[u8]) -> Result<(), MemoryError> {
        let mut regions = self.regions.write();
        let target = regions
            .iter_mut()
            .find_map(|region| region.slice_mut(address, bytes.len()))
            .ok_or(MemoryError::Unreadable { address, len: bytes.len() })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_f32s(&self, address: usize, values: &[f32]) -> Result<(), MemoryError> {
        self.write(address, bytemuck::cast_slice(values))
    }
}

impl MemorySource for MemorySnapshot {
    fn try_read(&self, address: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
        checked_end(address, buf.len())?;
        let regions = self.regions.read();
        let source = regions
            .iter()
            .find_map(|region| region.slice(address, buf.len()))
            .ok_or(MemoryError::Unreadable { address, len: buf.len() })?;
        buf.copy_from_slice(source);
        Ok(())
    }
}

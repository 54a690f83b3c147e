//! Typed reads from another process's address space.

use crate::error::{Error, Result};
use crate::memory::{ProcessHandle, ProcessProvider};

/// Read access to a remote address space.
///
/// Every read copies bytes out by value; a short read is an error, never a
/// truncated buffer. Typed helpers decode little-endian.
pub trait ReadMemory {
    /// Base address of the target's main module.
    fn base_address(&self) -> u64;

    /// Size of the target's main module image.
    fn module_size(&self) -> u64;

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>>;

    fn read_i32(&self, address: u64) -> Result<i32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64_at(&bytes, 0))
    }

    fn read_f32(&self, address: u64) -> Result<f32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Reader over an open process handle.
///
/// Reads go through the provider so the OS boundary stays mockable; the
/// reader itself holds no buffer between calls.
pub struct MemoryReader<'a, P: ProcessProvider + ?Sized> {
    provider: &'a P,
    process: &'a ProcessHandle,
}

impl<'a, P: ProcessProvider + ?Sized> MemoryReader<'a, P> {
    pub fn new(provider: &'a P, process: &'a ProcessHandle) -> Self {
        Self { provider, process }
    }
}

impl<P: ProcessProvider + ?Sized> ReadMemory for MemoryReader<'_, P> {
    fn base_address(&self) -> u64 {
        self.process.base_address
    }

    fn module_size(&self) -> u64 {
        self.process.module_size
    }

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        if address == 0 {
            return Err(Error::MemoryReadFailed {
                address,
                message: "null address".to_string(),
            });
        }
        self.provider.read_bytes(self.process, address, len)
    }
}

/// Decode a little-endian u32 from a copied record.
///
/// Callers read whole fixed-size records, so `offset` is in range by
/// construction.
pub fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

pub fn i32_at(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

pub fn u64_at(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

pub fn f32_at(buf: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

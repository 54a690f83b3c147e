//! Scripted test doubles for the OS boundary.
//!
//! `MockMemoryReader` serves reads from an in-process byte image;
//! `MockProcessProvider` scripts enumeration, attach, liveness and window
//! geometry while counting calls.

use std::cell::{Cell, RefCell};

use crate::error::{Error, Result};
use crate::memory::{ProcessHandle, ProcessInfo, ProcessProvider, ReadMemory, WindowId};

/// In-process stand-in for a target module image.
#[derive(Debug, Clone, Default)]
pub struct MockMemoryReader {
    base: u64,
    image: Vec<u8>,
    fail_ranges: Vec<(u64, u64)>,
}

impl MockMemoryReader {
    fn contains(&self, address: u64, len: usize) -> bool {
        address >= self.base && address + len as u64 <= self.base + self.image.len() as u64
    }

    /// Overwrite bytes in the image, e.g. to simulate the target mutating
    /// a structure between frames.
    pub fn poke(&mut self, address: u64, bytes: &[u8]) {
        let start = (address - self.base) as usize;
        self.image[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn poke_u32(&mut self, address: u64, value: u32) {
        self.poke(address, &value.to_le_bytes());
    }
}

impl ReadMemory for MockMemoryReader {
    fn base_address(&self) -> u64 {
        self.base
    }

    fn module_size(&self) -> u64 {
        self.image.len() as u64
    }

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        for &(start, flen) in &self.fail_ranges {
            if address < start + flen && address + len as u64 > start {
                return Err(Error::MemoryReadFailed {
                    address,
                    message: "scripted failure".to_string(),
                });
            }
        }
        if !self.contains(address, len) {
            return Err(Error::MemoryReadFailed {
                address,
                message: "outside mock image".to_string(),
            });
        }
        let start = (address - self.base) as usize;
        Ok(self.image[start..start + len].to_vec())
    }
}

/// Builder for [`MockMemoryReader`].
#[derive(Debug, Default)]
pub struct MockMemoryBuilder {
    base: u64,
    image: Vec<u8>,
    fail_ranges: Vec<(u64, u64)>,
}

impl MockMemoryBuilder {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            image: Vec::new(),
            fail_ranges: Vec::new(),
        }
    }

    /// Grow the image to at least `size` bytes of zeroes.
    pub fn pad_to(mut self, size: usize) -> Self {
        if self.image.len() < size {
            self.image.resize(size, 0);
        }
        self
    }

    pub fn write_bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        let start = (address - self.base) as usize;
        let end = start + bytes.len();
        if self.image.len() < end {
            self.image.resize(end, 0);
        }
        self.image[start..end].copy_from_slice(bytes);
        self
    }

    pub fn write_u32(self, address: u64, value: u32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_i32(self, address: u64, value: i32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u64(self, address: u64, value: u64) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_f32(self, address: u64, value: f32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Make every read overlapping the range fail.
    pub fn fail_range(mut self, address: u64, len: u64) -> Self {
        self.fail_ranges.push((address, len));
        self
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            base: self.base,
            image: self.image,
            fail_ranges: self.fail_ranges,
        }
    }
}

/// Scripted [`ProcessProvider`] with call counters.
#[derive(Debug, Default)]
pub struct MockProcessProvider {
    processes: RefCell<Vec<ProcessInfo>>,
    memory: RefCell<MockMemoryReader>,
    pub enumerate_calls: Cell<usize>,
    pub open_calls: Cell<usize>,
    open_denied: Cell<bool>,
    exited: Cell<bool>,
    foreground: Cell<WindowId>,
    rect: Cell<(i32, i32)>,
    origin: Cell<(i32, i32)>,
    geometry_fails: Cell<bool>,
}

impl MockProcessProvider {
    pub fn new() -> Self {
        let provider = Self::default();
        provider.rect.set((800, 600));
        provider
    }

    pub fn with_memory(self, memory: MockMemoryReader) -> Self {
        *self.memory.borrow_mut() = memory;
        self
    }

    pub fn info(pid: u32, name: &str, window_title: &str, window: WindowId) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: name.to_string(),
            window_title: window_title.to_string(),
            window,
        }
    }

    pub fn set_processes(&self, processes: Vec<ProcessInfo>) {
        *self.processes.borrow_mut() = processes;
    }

    pub fn set_open_denied(&self, denied: bool) {
        self.open_denied.set(denied);
    }

    pub fn set_exited(&self, exited: bool) {
        self.exited.set(exited);
    }

    pub fn set_foreground(&self, window: WindowId) {
        self.foreground.set(window);
    }

    pub fn set_rect(&self, width: i32, height: i32) {
        self.rect.set((width, height));
    }

    pub fn set_origin(&self, x: i32, y: i32) {
        self.origin.set((x, y));
    }

    pub fn set_geometry_fails(&self, fails: bool) {
        self.geometry_fails.set(fails);
    }

    pub fn poke_u32(&self, address: u64, value: u32) {
        self.memory.borrow_mut().poke_u32(address, value);
    }
}

impl ProcessProvider for MockProcessProvider {
    fn processes(&self) -> Vec<ProcessInfo> {
        self.enumerate_calls.set(self.enumerate_calls.get() + 1);
        self.processes.borrow().clone()
    }

    fn open(&self, info: &ProcessInfo) -> Result<ProcessHandle> {
        self.open_calls.set(self.open_calls.get() + 1);
        if self.open_denied.get() {
            return Err(Error::ProcessOpenFailed(format!("pid {}: denied", info.pid)));
        }
        let memory = self.memory.borrow();
        Ok(ProcessHandle::stub(
            info.pid,
            memory.base_address(),
            memory.module_size(),
            info.window,
        ))
    }

    fn has_exited(&self, _handle: &ProcessHandle) -> bool {
        self.exited.get()
    }

    fn read_bytes(&self, _handle: &ProcessHandle, address: u64, len: usize) -> Result<Vec<u8>> {
        self.memory.borrow().read_bytes(address, len)
    }

    fn foreground_window(&self) -> WindowId {
        self.foreground.get()
    }

    fn client_rect(&self, _window: WindowId) -> Result<(i32, i32)> {
        if self.geometry_fails.get() {
            return Err(Error::ProcessNotFound("scripted geometry failure".to_string()));
        }
        Ok(self.rect.get())
    }

    fn client_origin(&self, _window: WindowId) -> Result<(i32, i32)> {
        if self.geometry_fails.get() {
            return Err(Error::ProcessNotFound("scripted geometry failure".to_string()));
        }
        Ok(self.origin.get())
    }
}

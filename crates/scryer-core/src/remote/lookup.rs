use crate::error::Result;
use crate::memory::ReadMemory;
use crate::remote::RemoteNode;

/// A fixed-length byte table the target keeps at a static address.
///
/// Length is chosen at construction and never changes; reset zeroes the
/// entries but keeps the length.
#[derive(Debug)]
pub struct LookupTable {
    address: u64,
    entries: Vec<u8>,
}

impl LookupTable {
    pub fn new(length: usize) -> Self {
        Self {
            address: 0,
            entries: vec![0; length],
        }
    }

    pub fn entries(&self) -> &[u8] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RemoteNode for LookupTable {
    fn address(&self) -> u64 {
        self.address
    }

    fn set_address(&mut self, address: u64) {
        self.address = address;
    }

    fn refresh<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        _address_changed: bool,
    ) -> Result<()> {
        let data = reader.read_bytes(self.address, self.entries.len())?;
        self.entries.copy_from_slice(&data);
        Ok(())
    }

    fn reset(&mut self) {
        self.address = 0;
        self.entries.fill(0);
    }
}
